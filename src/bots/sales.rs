use std::fmt::Write;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::info;

use super::digest::{
    bucket_by_due, post_digest, today_in, Buckets, DUE_SOON_HEADING, OVERDUE_HEADING,
};
use super::parser::{ItemParser, Permalinks};
use super::summary::render_status_distribution;
use super::UserDirectory;
use crate::config::{required, AppConfig};
use crate::model::schema::SALES;
use crate::model::task::TaskRecord;
use crate::slack::{fetch_list_items, SlackApi};

pub const ACTIONABLE_STATUSES: &[&str] = &["ToDo", "Meeting", "Workshop"];
pub const SECTION_LIMIT: usize = 20;

pub const HEADER: &str = "📞💓♠️ Sales Chan - Daily Update ♠️💓📞";
pub const ALL_CLEAR: &str = "✨ No urgent items today! Great job team! ✨";

/// Split actionable items into overdue and due-soon buckets.
pub fn categorize(items: &[TaskRecord], today: NaiveDate) -> Buckets {
    bucket_by_due(
        items
            .iter()
            .filter(|item| ACTIONABLE_STATUSES.contains(&item.status.as_str())),
        today,
    )
}

fn push_section(
    lines: &mut Vec<String>,
    heading: &str,
    marker: &str,
    items: &[TaskRecord],
    users: &UserDirectory,
) {
    if items.is_empty() {
        return;
    }
    lines.push(heading.to_string());
    for item in items.iter().take(SECTION_LIMIT) {
        let name = users.name_or_id(item.assignee_id.as_deref());
        lines.push(format!(
            "• {marker} {name} [{}]({}) | {}",
            item.title,
            item.permalink.as_deref().unwrap_or_default(),
            item.priority
        ));
    }
    lines.push(String::new());
}

pub fn format_digest(buckets: &Buckets, users: &UserDirectory) -> String {
    let mut lines = vec![HEADER.to_string(), String::new()];
    push_section(&mut lines, OVERDUE_HEADING, "❤️", &buckets.overdue, users);
    push_section(&mut lines, DUE_SOON_HEADING, "🧡", &buckets.due_soon, users);
    if buckets.is_empty() {
        lines.push(ALL_CLEAR.to_string());
    }
    lines.join("\n")
}

pub struct Digest {
    pub parsed: Vec<TaskRecord>,
    pub buckets: Buckets,
    pub message: String,
}

impl Digest {
    /// Console summary printed ahead of the message preview.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        if self.parsed.is_empty() {
            out.push_str("No items found!\n");
            return out;
        }
        let _ = writeln!(out, "Found {} total items\n", self.parsed.len());
        render_status_distribution(&mut out, &self.parsed);
        out.push('\n');
        let _ = writeln!(out, "Overdue items: {}", self.buckets.overdue.len());
        let _ = writeln!(out, "Due soon (next 2 days): {}", self.buckets.due_soon.len());
        out
    }
}

pub struct SalesBot<'a> {
    slack: &'a dyn SlackApi,
    list_id: &'a str,
    timezone: &'a str,
    permalinks: Permalinks,
    users: UserDirectory<'a>,
}

impl<'a> SalesBot<'a> {
    pub fn from_config(slack: &'a dyn SlackApi, config: &'a AppConfig) -> Result<Self> {
        let sales = &config.sales;
        let list_id = required(&sales.list_id, "SALES_LIST_ID")?;
        let workspace_url = required(&config.slack.workspace_url, "SLACK_WORKSPACE_URL")
            .context("Sales digest links need the workspace URL")?;
        let team_id = required(&config.slack.team_id, "SLACK_TEAM_ID")
            .context("Sales digest links need the team id")?;

        Ok(Self {
            slack,
            list_id,
            timezone: &sales.timezone,
            permalinks: Permalinks::new(workspace_url, team_id, list_id),
            users: UserDirectory::new(&sales.users),
        })
    }

    pub async fn build_digest(&self) -> Digest {
        self.build_digest_for(today_in(self.timezone)).await
    }

    /// Fetch, parse, categorize and render relative to `today`.
    pub async fn build_digest_for(&self, today: NaiveDate) -> Digest {
        let raw = fetch_list_items(self.slack, self.list_id).await;
        let parsed = ItemParser::new(&SALES)
            .with_permalinks(self.permalinks.clone())
            .parse_all(&raw);
        let buckets = categorize(&parsed, today);
        info!(
            total = parsed.len(),
            overdue = buckets.overdue.len(),
            due_soon = buckets.due_soon.len(),
            %today,
            "categorized sales items"
        );

        let message = format_digest(&buckets, &self.users);
        Digest {
            parsed,
            buckets,
            message,
        }
    }

    pub async fn post(&self, channel: &str, message: &str) -> String {
        post_digest(self.slack, channel, message).await
    }
}
