pub mod web;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info};

use crate::model::list_item::RawListItem;

/// Upper bound on items requested per fetch.
pub const FETCH_LIMIT: u32 = 200;

#[derive(Debug, Error)]
pub enum SlackError {
    #[error("Slack request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Slack returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Slack API error: {0}")]
    Api(String),
    #[error("unexpected Slack response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The Slack Web API calls the bots make.
#[async_trait]
pub trait SlackApi: Send + Sync {
    /// `slackLists.items.list`
    async fn list_items(&self, list_id: &str, limit: u32) -> Result<Vec<RawListItem>, SlackError>;
    /// `slackLists.get`, returned as-is.
    async fn list_schema(&self, list_id: &str) -> Result<serde_json::Value, SlackError>;
    /// `chat.postMessage`
    async fn post_message(&self, channel: &str, text: &str) -> Result<(), SlackError>;
    /// `users.lookupByEmail`, returning the user id.
    async fn lookup_user_by_email(&self, email: &str) -> Result<String, SlackError>;
}

/// Fetch up to [`FETCH_LIMIT`] items in source order.
///
/// Failures are logged and yield an empty list so the pipeline carries on
/// with zero items.
pub async fn fetch_list_items(api: &dyn SlackApi, list_id: &str) -> Vec<RawListItem> {
    match api.list_items(list_id, FETCH_LIMIT).await {
        Ok(mut items) => {
            items.truncate(FETCH_LIMIT as usize);
            info!(list_id, count = items.len(), "fetched list items");
            items
        }
        Err(e) => {
            error!(list_id, error = %e, "failed to fetch list items");
            Vec::new()
        }
    }
}
