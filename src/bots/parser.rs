use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::model::list_item::RawListItem;
use crate::model::schema::{ListSchema, ASSIGNEE_KEY, DUE_DATE_KEY, TITLE_KEYS};
use crate::model::task::{Priority, TaskRecord, STATUS_UNKNOWN, UNTITLED};
use crate::util::text::collapse_whitespace;

fn re_priority_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[Pp]([0-4])\b").unwrap())
}

fn re_leading_priority() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*[Pp][0-4]\b\s*:?\s*").unwrap())
}

/// Pull a `P0`..`P4` token out of a title.
///
/// The token may appear anywhere to set the priority, but only a leading one
/// (with its colon and trailing space) is removed from the title.
pub fn split_priority_token(title: &str) -> (Option<Priority>, String) {
    let priority = re_priority_token()
        .captures(title)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().chars().next())
        .and_then(Priority::from_digit);

    match priority {
        Some(p) => (
            Some(p),
            re_leading_priority().replace(title, "").into_owned(),
        ),
        None => (None, title.to_string()),
    }
}

/// Builds record links of the form `{workspace}/lists/{team}/{list}?record_id={id}`.
#[derive(Debug, Clone)]
pub struct Permalinks {
    workspace_url: String,
    team_id: String,
    list_id: String,
}

impl Permalinks {
    pub fn new(workspace_url: &str, team_id: &str, list_id: &str) -> Self {
        Self {
            workspace_url: workspace_url.trim_end_matches('/').to_string(),
            team_id: team_id.to_string(),
            list_id: list_id.to_string(),
        }
    }

    pub fn record_url(&self, record_id: &str) -> String {
        format!(
            "{}/lists/{}/{}?record_id={}",
            self.workspace_url, self.team_id, self.list_id, record_id
        )
    }
}

/// Turns raw list rows into [`TaskRecord`]s using one bot's schema.
pub struct ItemParser<'a> {
    schema: &'a ListSchema,
    permalinks: Option<Permalinks>,
}

impl<'a> ItemParser<'a> {
    pub fn new(schema: &'a ListSchema) -> Self {
        Self {
            schema,
            permalinks: None,
        }
    }

    pub fn with_permalinks(mut self, permalinks: Permalinks) -> Self {
        self.permalinks = Some(permalinks);
        self
    }

    /// Total: unknown keys and codes are skipped, missing values keep their
    /// defaults. When a key repeats, the later field wins.
    pub fn parse(&self, raw: &RawListItem) -> TaskRecord {
        let schema = self.schema;
        let mut title = UNTITLED.to_string();
        let mut assignee_id = None;
        let mut due = None;
        let mut status = STATUS_UNKNOWN;
        let mut priority = Priority::Unset;
        let mut notes = None;

        for field in &raw.fields {
            let key = field.key.as_str();

            if TITLE_KEYS.contains(&key) {
                if let Some(text) = field.non_empty_text() {
                    title = text.to_string();
                }
            } else if key == ASSIGNEE_KEY {
                if let Some(first) = field.users.first() {
                    assignee_id = Some(first.clone());
                }
            } else if key == DUE_DATE_KEY {
                if let Some(value) = field.non_empty_value() {
                    due = Some(value.to_string());
                }
            } else if key == schema.status_column {
                if let Some(label) = field.non_empty_value().and_then(|c| schema.status_label(c)) {
                    status = label;
                }
            } else if key == schema.priority_column {
                if let Some(p) = field.non_empty_value().and_then(|c| schema.priority_for(c)) {
                    priority = p;
                }
            } else if Some(key) == schema.notes_column {
                if let Some(text) = field.non_empty_text() {
                    notes = Some(collapse_whitespace(text)).filter(|n| !n.is_empty());
                }
            }
        }

        let (title_priority, title) = split_priority_token(&title);
        if let Some(p) = title_priority {
            priority = p;
        }

        TaskRecord {
            permalink: self.permalinks.as_ref().map(|p| p.record_url(&raw.id)),
            id: raw.id.clone(),
            title,
            assignee_id,
            due,
            status: status.to_string(),
            priority,
            notes,
        }
    }

    pub fn parse_all(&self, raw: &[RawListItem]) -> Vec<TaskRecord> {
        let records: Vec<TaskRecord> = raw.iter().map(|item| self.parse(item)).collect();
        debug!(schema = self.schema.name, count = records.len(), "parsed list items");
        records
    }
}
