use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{error, info, warn};

use crate::config::DEFAULT_TIMEZONE;
use crate::model::task::{sort_by_priority, TaskRecord};
use crate::slack::SlackApi;

pub const OVERDUE_HEADING: &str = "💢 OVERDUE ITEMS REQUIRING IMMEDIATE ATTENTION 💢";
pub const DUE_SOON_HEADING: &str = "⏰ Items Due Soon (Next 2 Days)";

#[derive(Debug, Default)]
pub struct Buckets {
    pub overdue: Vec<TaskRecord>,
    pub due_soon: Vec<TaskRecord>,
}

impl Buckets {
    pub fn is_empty(&self) -> bool {
        self.overdue.is_empty() && self.due_soon.is_empty()
    }
}

/// The item's due date, if it parses as `YYYY-MM-DD`.
pub fn due_date(item: &TaskRecord) -> Option<NaiveDate> {
    item.due
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

/// Overdue is before `today`; due soon is today or tomorrow. Undated items
/// and later dates fall out. Both buckets are sorted by priority.
pub fn bucket_by_due<'a>(items: impl IntoIterator<Item = &'a TaskRecord>, today: NaiveDate) -> Buckets {
    let tomorrow = today.succ_opt().unwrap_or(today);
    let mut buckets = Buckets::default();

    for item in items {
        let Some(due) = due_date(item) else {
            continue;
        };
        if due < today {
            buckets.overdue.push(item.clone());
        } else if due <= tomorrow {
            buckets.due_soon.push(item.clone());
        }
    }

    sort_by_priority(&mut buckets.overdue);
    sort_by_priority(&mut buckets.due_soon);
    buckets
}

/// Calendar date in `timezone`, falling back to the default zone when the
/// name doesn't parse.
pub fn today_in(timezone: &str) -> NaiveDate {
    let tz: Tz = timezone.parse().unwrap_or_else(|_| {
        warn!(timezone, fallback = DEFAULT_TIMEZONE, "unknown timezone");
        chrono_tz::Asia::Tokyo
    });
    Utc::now().with_timezone(&tz).date_naive()
}

/// Post a digest and describe the outcome for the console.
pub async fn post_digest(slack: &dyn SlackApi, channel: &str, message: &str) -> String {
    match slack.post_message(channel, message).await {
        Ok(()) => {
            info!(channel, "posted digest");
            "✅ Posted to Slack!".into()
        }
        Err(e) => {
            error!(channel, error = %e, "failed to post digest");
            format!("❌ Error posting to Slack: {e}")
        }
    }
}
