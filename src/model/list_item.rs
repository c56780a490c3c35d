use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A row of a Slack List as returned by `slackLists.items.list`.
///
/// Every member is optional on the wire, so deserialization never rejects an
/// item for a missing or oddly typed field. Members we don't read are kept in
/// `extra` so the debug and export views can show the record as Slack sent it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawListItem {
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::fields")]
    pub fields: Vec<RawField>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawField {
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub key: String,
    /// Free text (title, rich text columns), kept as sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Value>,
    /// Select option code or date string for the columns we read, but
    /// checkboxes send booleans and number columns send numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(
        default,
        rename = "user",
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "lenient::users"
    )]
    pub users: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
impl RawField {
    pub fn text(key: &str, text: &str) -> Self {
        Self {
            key: key.to_string(),
            text: Some(Value::String(text.to_string())),
            ..Self::default()
        }
    }

    pub fn value(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: Some(Value::String(value.to_string())),
            ..Self::default()
        }
    }

    pub fn users(key: &str, users: &[&str]) -> Self {
        Self {
            key: key.to_string(),
            users: users.iter().map(|u| u.to_string()).collect(),
            ..Self::default()
        }
    }
}

impl RawField {
    /// Non-empty string text, if any.
    pub fn non_empty_text(&self) -> Option<&str> {
        non_empty_str(self.text.as_ref())
    }

    /// Non-empty string value, if any. Booleans and numbers yield `None`.
    pub fn non_empty_value(&self) -> Option<&str> {
        non_empty_str(self.value.as_ref())
    }
}

fn non_empty_str(member: Option<&Value>) -> Option<&str> {
    member.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Decode each entry of a `slackLists.items.list` `items` array on its own.
///
/// Entries that aren't objects are dropped; the count of dropped entries is
/// returned alongside the items.
pub fn items_from_values(values: Vec<Value>) -> (Vec<RawListItem>, usize) {
    let total = values.len();
    let items: Vec<RawListItem> = values
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect();
    let skipped = total - items.len();
    (items, skipped)
}

#[cfg(test)]
impl RawListItem {
    pub fn new(id: &str, fields: Vec<RawField>) -> Self {
        Self {
            id: id.to_string(),
            fields,
            extra: Map::new(),
        }
    }
}

mod lenient {
    use super::*;

    pub fn string<'de, D>(de: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(de)? {
            Value::String(s) => Some(s),
            _ => None,
        })
    }

    pub fn string_or_empty<'de, D>(de: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(string(de)?.unwrap_or_default())
    }

    /// Slack sends `user` as an array of ids; anything else is treated as empty.
    pub fn users<'de, D>(de: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(de)? {
            Value::Array(values) => values
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        })
    }

    pub fn fields<'de, D>(de: D) -> Result<Vec<RawField>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(de)? {
            Value::Array(values) => values
                .into_iter()
                .filter_map(|v| serde_json::from_value(v).ok())
                .collect(),
            _ => Vec::new(),
        })
    }
}
