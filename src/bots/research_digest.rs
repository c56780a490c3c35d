use std::collections::HashMap;
use std::fmt::Write;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{debug, info};

use super::digest::{
    bucket_by_due, due_date, post_digest, today_in, Buckets, DUE_SOON_HEADING, OVERDUE_HEADING,
};
use super::parser::{ItemParser, Permalinks};
use super::research::RELEVANT_STATUSES;
use crate::config::{required, AppConfig};
use crate::model::schema::RESEARCH;
use crate::model::task::{Priority, TaskRecord};
use crate::slack::{fetch_list_items, SlackApi};

pub const HEADER: &str = "💚🧪✨ Research Chan - Daily Update ✨🧪💚";
pub const TOP_PRIORITIES_HEADING: &str = "📋 Top Priorities for the Day";
pub const NOTHING_LEFT: &str = "No items left To Do";
pub const EMPTY_LIST_NOTICE: &str = "No items found in the priority list today.";

const DIGEST_PRIORITIES: [Priority; 4] = [Priority::P0, Priority::P1, Priority::P2, Priority::P3];

/// Open work with a real priority: ToDo or In Progress, P0 through P3.
pub fn is_digest_item(item: &TaskRecord) -> bool {
    RELEVANT_STATUSES.contains(&item.status.as_str()) && DIGEST_PRIORITIES.contains(&item.priority)
}

/// A person in the "Top Priorities" block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAssignee {
    /// As configured: a Slack user id or an email.
    pub entry: String,
    pub user_id: Option<String>,
}

impl KeyAssignee {
    pub fn resolved(user_id: &str) -> Self {
        Self {
            entry: user_id.to_string(),
            user_id: Some(user_id.to_string()),
        }
    }

    /// `<@id>` when resolved, otherwise `@` plus the email's local part.
    pub fn mention(&self) -> String {
        match &self.user_id {
            Some(id) => format!("<@{id}>"),
            None => format!("@{}", self.entry.split('@').next().unwrap_or_default()),
        }
    }
}

/// Resolve configured entries to Slack ids. Entries without an `@` are taken
/// as ids. Emails go through `users.lookupByEmail` and fall back to the
/// configured map when the lookup fails.
pub async fn resolve_key_assignees(
    slack: &dyn SlackApi,
    entries: &[String],
    fallback: &HashMap<String, String>,
) -> Vec<KeyAssignee> {
    let mut resolved = Vec::with_capacity(entries.len());
    for entry in entries {
        if !entry.contains('@') {
            resolved.push(KeyAssignee::resolved(entry));
            continue;
        }
        let user_id = match slack.lookup_user_by_email(entry).await {
            Ok(id) => Some(id),
            Err(e) => {
                debug!(email = %entry, error = %e, "user lookup failed");
                fallback.get(entry).cloned()
            }
        };
        resolved.push(KeyAssignee {
            entry: entry.clone(),
            user_id,
        });
    }
    resolved
}

/// Assignees of `items` in first-seen order; used when no key assignees are
/// configured.
pub fn assignees_in_order(items: &[TaskRecord]) -> Vec<KeyAssignee> {
    let mut seen: Vec<KeyAssignee> = Vec::new();
    for id in items.iter().filter_map(|i| i.assignee_id.as_deref()) {
        if !seen.iter().any(|k| k.user_id.as_deref() == Some(id)) {
            seen.push(KeyAssignee::resolved(id));
        }
    }
    seen
}

/// Most urgent item assigned to `user_id`; ties go to the earlier item.
pub fn top_item<'a>(items: &'a [TaskRecord], user_id: &str) -> Option<&'a TaskRecord> {
    items
        .iter()
        .filter(|i| i.assignee_id.as_deref() == Some(user_id))
        .min_by_key(|i| i.priority.rank())
}

fn mention(user_id: Option<&str>) -> String {
    user_id.map_or_else(|| "Unassigned".to_string(), |id| format!("<@{id}>"))
}

fn link(item: &TaskRecord) -> String {
    match &item.permalink {
        Some(url) => format!("<{url}|{}>", item.title),
        None => item.title.clone(),
    }
}

/// Slack mrkdwn digest over `items`, which are already limited to digest
/// items.
pub fn format_research_digest(
    items: &[TaskRecord],
    buckets: &Buckets,
    today: NaiveDate,
    key_assignees: &[KeyAssignee],
    focus_user: Option<&KeyAssignee>,
) -> String {
    let mut lines = vec![HEADER.to_string(), String::new()];

    if !buckets.overdue.is_empty() {
        lines.push(OVERDUE_HEADING.to_string());
        for item in &buckets.overdue {
            lines.push(format!(
                "• ❤️ {} {} | {}",
                mention(item.assignee_id.as_deref()),
                link(item),
                item.priority
            ));
        }
        lines.push(String::new());
    }

    if !buckets.due_soon.is_empty() {
        lines.push(DUE_SOON_HEADING.to_string());
        for item in &buckets.due_soon {
            let when = if due_date(item) == Some(today) {
                "Due today"
            } else {
                "Due tomorrow"
            };
            lines.push(format!(
                "• 🧡 {} {} | {} ({when})",
                mention(item.assignee_id.as_deref()),
                link(item),
                item.priority
            ));
        }
        lines.push(String::new());
    }

    lines.push(TOP_PRIORITIES_HEADING.to_string());
    for person in key_assignees {
        let top = person.user_id.as_deref().and_then(|id| top_item(items, id));
        let line = match top {
            Some(item) => format!("✅ Top Priority: {} | {}", link(item), item.priority),
            None => NOTHING_LEFT.to_string(),
        };
        lines.push(format!("{}:\n{line}", person.mention()));
    }

    if let Some(id) = focus_user.and_then(|f| f.user_id.as_deref()) {
        lines.push(String::new());
        lines.push(format!("<@{id}> -chan ~ what is the big focus for today? 😘"));
    }

    lines.join("\n")
}

pub struct ResearchDigest {
    pub parsed: Vec<TaskRecord>,
    pub items: Vec<TaskRecord>,
    pub buckets: Buckets,
    pub message: String,
}

impl ResearchDigest {
    pub fn summary(&self) -> String {
        let mut out = String::new();
        if self.parsed.is_empty() {
            out.push_str("No items found!\n");
            return out;
        }
        let _ = writeln!(out, "Found {} total items", self.parsed.len());
        let _ = writeln!(out, "Priority items (ToDo/In Progress, P0-P3): {}", self.items.len());
        let _ = writeln!(out, "Overdue items: {}", self.buckets.overdue.len());
        let _ = writeln!(out, "Due soon (next 2 days): {}", self.buckets.due_soon.len());
        out
    }
}

pub struct ResearchDigestBot<'a> {
    slack: &'a dyn SlackApi,
    list_id: &'a str,
    timezone: &'a str,
    permalinks: Permalinks,
    key_assignees: &'a [String],
    email_to_slack_id: &'a HashMap<String, String>,
    focus_user: Option<&'a str>,
}

impl<'a> ResearchDigestBot<'a> {
    pub fn from_config(slack: &'a dyn SlackApi, config: &'a AppConfig) -> Result<Self> {
        let research = &config.research;
        let list_id = required(&research.list_id, "RESEARCH_LIST_ID")?;
        let workspace_url = required(&config.slack.workspace_url, "SLACK_WORKSPACE_URL")
            .context("Research digest links need the workspace URL")?;
        let team_id = required(&config.slack.team_id, "SLACK_TEAM_ID")
            .context("Research digest links need the team id")?;

        Ok(Self {
            slack,
            list_id,
            timezone: &research.timezone,
            permalinks: Permalinks::new(workspace_url, team_id, list_id),
            key_assignees: &research.key_assignees,
            email_to_slack_id: &research.email_to_slack_id,
            focus_user: research.focus_user.as_deref(),
        })
    }

    pub async fn build_digest(&self) -> ResearchDigest {
        self.build_digest_for(today_in(self.timezone)).await
    }

    pub async fn build_digest_for(&self, today: NaiveDate) -> ResearchDigest {
        let raw = fetch_list_items(self.slack, self.list_id).await;
        if raw.is_empty() {
            return ResearchDigest {
                parsed: Vec::new(),
                items: Vec::new(),
                buckets: Buckets::default(),
                message: EMPTY_LIST_NOTICE.to_string(),
            };
        }

        let parsed = ItemParser::new(&RESEARCH)
            .with_permalinks(self.permalinks.clone())
            .parse_all(&raw);
        let items: Vec<TaskRecord> = parsed.iter().filter(|i| is_digest_item(i)).cloned().collect();
        let buckets = bucket_by_due(&items, today);
        info!(
            total = parsed.len(),
            priority_items = items.len(),
            overdue = buckets.overdue.len(),
            due_soon = buckets.due_soon.len(),
            %today,
            "categorized research items"
        );

        let key_assignees = if self.key_assignees.is_empty() {
            assignees_in_order(&items)
        } else {
            resolve_key_assignees(self.slack, self.key_assignees, self.email_to_slack_id).await
        };
        let focus = match self.focus_user {
            Some(entry) => {
                resolve_key_assignees(self.slack, &[entry.to_string()], self.email_to_slack_id)
                    .await
                    .pop()
            }
            None => None,
        };

        let message =
            format_research_digest(&items, &buckets, today, &key_assignees, focus.as_ref());
        ResearchDigest {
            parsed,
            items,
            buckets,
            message,
        }
    }

    pub async fn post(&self, channel: &str, message: &str) -> String {
        post_digest(self.slack, channel, message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::list_item::{RawField, RawListItem};
    use crate::slack::tests::MockSlack;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn task(id: &str, status: &str, priority: Priority, assignee: Option<&str>) -> TaskRecord {
        TaskRecord {
            id: id.into(),
            title: format!("Task {id}"),
            assignee_id: assignee.map(String::from),
            due: None,
            status: status.into(),
            priority,
            notes: None,
            permalink: Some(format!("https://r.slack.com/lists/T/F?record_id={id}")),
        }
    }

    fn raw(id: &str, title: &str, assignee: &str, due: &str, priority_code: &str) -> RawListItem {
        RawListItem::new(
            id,
            vec![
                RawField::text("name", title),
                RawField::users("todo_assignee", &[assignee]),
                RawField::value("todo_due_date", due),
                RawField::value("Col093T8A25LG", "OptHSJVP60E"),
                RawField::value("Col08V4T02P5Y", priority_code),
            ],
        )
    }

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.research.list_id = Some("F_RES".into());
        config.slack.workspace_url = Some("https://lab.slack.com".into());
        config.slack.team_id = Some("T9".into());
        config
    }

    #[test]
    fn digest_items_need_status_and_priority() {
        let keep = task("a", "In Progress", Priority::P3, None);
        assert!(is_digest_item(&keep));
        assert!(!is_digest_item(&task("b", "ToDo", Priority::P4, None)));
        assert!(!is_digest_item(&task("c", "ToDo", Priority::Unset, None)));
        assert!(!is_digest_item(&task("d", "Backlog", Priority::P0, None)));
    }

    #[test]
    fn top_item_prefers_urgency_then_order() {
        let items = vec![
            task("a", "ToDo", Priority::P2, Some("U1")),
            task("b", "ToDo", Priority::P1, Some("U1")),
            task("c", "ToDo", Priority::P1, Some("U1")),
            task("d", "ToDo", Priority::P0, Some("U2")),
        ];
        assert_eq!(top_item(&items, "U1").map(|t| t.id.as_str()), Some("b"));
        assert_eq!(top_item(&items, "U3"), None);
    }

    #[test]
    fn mention_falls_back_to_email_local_part() {
        let unresolved = KeyAssignee {
            entry: "ryo@example.com".into(),
            user_id: None,
        };
        assert_eq!(unresolved.mention(), "@ryo");
        assert_eq!(KeyAssignee::resolved("U1").mention(), "<@U1>");
    }

    #[test]
    fn due_soon_lines_say_when() {
        let today = date("2024-01-10");
        let mut a = task("a", "ToDo", Priority::P1, Some("U1"));
        a.due = Some("2024-01-10".into());
        let mut b = task("b", "ToDo", Priority::P2, None);
        b.due = Some("2024-01-11".into());
        let items = vec![a, b];
        let buckets = bucket_by_due(&items, today);

        let message = format_research_digest(&items, &buckets, today, &[], None);
        assert!(message.contains(
            "• 🧡 <@U1> <https://r.slack.com/lists/T/F?record_id=a|Task a> | P1 (Due today)"
        ));
        assert!(message.contains(
            "• 🧡 Unassigned <https://r.slack.com/lists/T/F?record_id=b|Task b> | P2 (Due tomorrow)"
        ));
        assert!(!message.contains(OVERDUE_HEADING));
        assert!(message.ends_with(TOP_PRIORITIES_HEADING));
    }

    #[tokio::test]
    async fn emails_resolve_through_lookup_then_fallback() {
        let slack = MockSlack::new(vec![]).with_user("ada@example.com", "U_ADA");
        let fallback = HashMap::from([
            ("ada@example.com".to_string(), "U_OLD".to_string()),
            ("ryo@example.com".to_string(), "U_RYO".to_string()),
        ]);
        let entries = vec![
            "ada@example.com".to_string(),
            "ryo@example.com".to_string(),
            "joao@example.com".to_string(),
            "U7".to_string(),
        ];
        let resolved = resolve_key_assignees(&slack, &entries, &fallback).await;
        let ids: Vec<Option<&str>> = resolved.iter().map(|k| k.user_id.as_deref()).collect();
        assert_eq!(ids, vec![Some("U_ADA"), Some("U_RYO"), None, Some("U7")]);
    }

    #[tokio::test]
    async fn end_to_end_digest() {
        let slack = MockSlack::new(vec![
            raw("r1", "Fix eval drift", "U1", "2024-01-08", "Opt4GBWBKZB"),
            raw("r2", "P0: Ship dataset", "U2", "2024-01-10", "OptGESIX7LE"),
            raw("r3", "Write report", "U1", "2024-02-01", "Opt0183CXDH"),
            raw("r4", "Someday", "U1", "2024-01-08", "OptBOGUS"),
        ])
        .with_user("ada@example.com", "U1");
        let mut config = config();
        config.research.key_assignees = vec![
            "ada@example.com".into(),
            "U2".into(),
            "ghost@example.com".into(),
        ];
        config.research.focus_user = Some("ada@example.com".into());
        let bot = ResearchDigestBot::from_config(&slack, &config).unwrap();

        let digest = bot.build_digest_for(date("2024-01-10")).await;
        assert_eq!(digest.parsed.len(), 4);
        assert_eq!(digest.items.len(), 3);

        let link = |id: &str, title: &str| {
            format!("<https://lab.slack.com/lists/T9/F_RES?record_id={id}|{title}>")
        };
        let expected = [
            HEADER.to_string(),
            String::new(),
            OVERDUE_HEADING.to_string(),
            format!("• ❤️ <@U1> {} | P1", link("r1", "Fix eval drift")),
            String::new(),
            DUE_SOON_HEADING.to_string(),
            format!("• 🧡 <@U2> {} | P0 (Due today)", link("r2", "Ship dataset")),
            String::new(),
            TOP_PRIORITIES_HEADING.to_string(),
            format!("<@U1>:\n✅ Top Priority: {} | P0", link("r3", "Write report")),
            format!("<@U2>:\n✅ Top Priority: {} | P0", link("r2", "Ship dataset")),
            format!("@ghost:\n{NOTHING_LEFT}"),
            String::new(),
            "<@U1> -chan ~ what is the big focus for today? 😘".to_string(),
        ]
        .join("\n");
        assert_eq!(digest.message, expected);
        assert!(digest.summary().contains("Priority items (ToDo/In Progress, P0-P3): 3"));
    }

    #[tokio::test]
    async fn unconfigured_assignees_come_from_items() {
        let slack = MockSlack::new(vec![
            raw("r1", "Label data", "U5", "2024-03-01", "OptGESIX7LE"),
            raw("r2", "Tune model", "U6", "2024-03-01", "Opt24AKKH4V"),
        ]);
        let config = config();
        let bot = ResearchDigestBot::from_config(&slack, &config).unwrap();

        let digest = bot.build_digest_for(date("2024-01-10")).await;
        assert!(digest.buckets.is_empty());
        assert!(digest.message.contains("<@U5>:\n✅ Top Priority:"));
        assert!(digest.message.contains("<@U6>:\n✅ Top Priority:"));
        assert!(!digest.message.contains("big focus"));
    }

    #[tokio::test]
    async fn empty_list_posts_notice() {
        let slack = MockSlack::new(vec![]);
        let config = config();
        let bot = ResearchDigestBot::from_config(&slack, &config).unwrap();

        let digest = bot.build_digest_for(date("2024-01-10")).await;
        assert_eq!(digest.message, EMPTY_LIST_NOTICE);
        assert_eq!(digest.summary(), "No items found!\n");

        assert_eq!(bot.post("C_RES", &digest.message).await, "✅ Posted to Slack!");
        assert_eq!(
            slack.posted.lock().unwrap().as_slice(),
            &[("C_RES".to_string(), EMPTY_LIST_NOTICE.to_string())]
        );
    }

    #[test]
    fn permalink_settings_are_required() {
        let slack = MockSlack::new(vec![]);
        let mut config = config();
        config.slack.workspace_url = None;
        let err = ResearchDigestBot::from_config(&slack, &config).err().unwrap();
        assert!(format!("{err:#}").contains("SLACK_WORKSPACE_URL"));
    }
}
