use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{SlackApi, SlackError};
use crate::model::list_item::{items_from_values, RawListItem};

pub struct SlackClient {
    token: String,
    api_base: String,
    client: reqwest::Client,
}

impl SlackClient {
    pub fn new(token: String, api_base: String) -> Self {
        Self {
            token,
            api_base: api_base.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn call(&self, method: &str, payload: &Value) -> Result<Value, SlackError> {
        let url = format!("{}/{method}", self.api_base);
        debug!(method, "calling Slack");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header("Content-Type", "application/json; charset=utf-8")
            .json(payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SlackError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = resp.json().await?;
        if body.get("ok").and_then(Value::as_bool) != Some(true) {
            let error = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error");
            return Err(SlackError::Api(error.to_string()));
        }
        Ok(body)
    }
}

#[derive(Deserialize)]
struct ItemsResponse {
    #[serde(default)]
    items: Vec<Value>,
}

#[async_trait]
impl SlackApi for SlackClient {
    async fn list_items(&self, list_id: &str, limit: u32) -> Result<Vec<RawListItem>, SlackError> {
        let body = self
            .call(
                "slackLists.items.list",
                &json!({ "list_id": list_id, "limit": limit }),
            )
            .await?;
        let resp: ItemsResponse = serde_json::from_value(body)?;
        let (items, skipped) = items_from_values(resp.items);
        if skipped > 0 {
            warn!(list_id, skipped, "skipped malformed list items");
        }
        Ok(items)
    }

    async fn list_schema(&self, list_id: &str) -> Result<Value, SlackError> {
        self.call("slackLists.get", &json!({ "list_id": list_id }))
            .await
    }

    async fn post_message(&self, channel: &str, text: &str) -> Result<(), SlackError> {
        self.call("chat.postMessage", &json!({ "channel": channel, "text": text }))
            .await?;
        Ok(())
    }

    async fn lookup_user_by_email(&self, email: &str) -> Result<String, SlackError> {
        let body = self
            .call("users.lookupByEmail", &json!({ "email": email }))
            .await?;
        body.pointer("/user/id")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| SlackError::Api("user_id_missing".into()))
    }
}
