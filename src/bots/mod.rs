pub mod digest;
pub mod export;
pub mod parser;
pub mod research;
pub mod research_digest;
pub mod sales;
pub mod summary;

use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotKind {
    Research,
    Sales,
}

impl BotKind {
    pub const ALL: [BotKind; 2] = [BotKind::Research, BotKind::Sales];

    pub fn as_str(&self) -> &'static str {
        match self {
            BotKind::Research => "research",
            BotKind::Sales => "sales",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BotKind::Research => "Research Chan",
            BotKind::Sales => "Sales Chan",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for BotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Slack user id -> display name, as configured per bot.
pub struct UserDirectory<'a> {
    names: &'a HashMap<String, String>,
}

impl<'a> UserDirectory<'a> {
    pub fn new(names: &'a HashMap<String, String>) -> Self {
        Self { names }
    }

    pub fn lookup(&self, user_id: &str) -> Option<&'a str> {
        self.names.get(user_id).map(String::as_str)
    }

    /// Known name, else a `<@id>` mention, else `Unassigned`.
    pub fn name_or_mention(&self, user_id: Option<&str>) -> String {
        match user_id {
            Some(id) => self
                .lookup(id)
                .map(String::from)
                .unwrap_or_else(|| format!("<@{id}>")),
            None => "Unassigned".into(),
        }
    }

    /// Known name, else the raw id, else `Unassigned`.
    pub fn name_or_id(&self, user_id: Option<&str>) -> String {
        match user_id {
            Some(id) => self.lookup(id).unwrap_or(id).to_string(),
            None => "Unassigned".into(),
        }
    }
}
