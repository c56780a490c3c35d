use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_TIMEZONE: &str = "Asia/Tokyo";
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub slack: SlackConfig,
    pub llm: LlmConfig,
    pub research: ResearchConfig,
    pub sales: SalesConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    pub api_base: String,
    /// e.g. `https://acme.slack.com`; used for list record permalinks.
    pub workspace_url: Option<String>,
    pub team_id: Option<String>,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            api_base: "https://slack.com/api".into(),
            workspace_url: None,
            team_id: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.into(),
            base_url: "https://generativelanguage.googleapis.com".into(),
            temperature: 0.4,
            max_output_tokens: 600,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    pub bot_token: Option<String>,
    pub list_id: Option<String>,
    /// Where the daily digest is posted.
    pub channel_id: Option<String>,
    pub timezone: String,
    pub system_prompt: Option<String>,
    /// Overrides `llm.model` for this bot.
    pub model: Option<String>,
    pub max_context_items: usize,
    /// Slack user id -> display name.
    pub users: HashMap<String, String>,
    /// People listed under "Top Priorities" in the daily digest, as Slack
    /// user ids or emails.
    pub key_assignees: Vec<String>,
    /// Email -> Slack user id, tried before `users.lookupByEmail`.
    pub email_to_slack_id: HashMap<String, String>,
    /// Asked for the day's focus at the end of the digest (id or email).
    pub focus_user: Option<String>,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            list_id: None,
            channel_id: None,
            timezone: DEFAULT_TIMEZONE.into(),
            system_prompt: None,
            model: None,
            max_context_items: 80,
            users: HashMap::new(),
            key_assignees: Vec::new(),
            email_to_slack_id: HashMap::new(),
            focus_user: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SalesConfig {
    pub bot_token: Option<String>,
    pub list_id: Option<String>,
    pub channel_id: Option<String>,
    pub timezone: String,
    pub users: HashMap<String, String>,
}

impl Default for SalesConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            list_id: None,
            channel_id: None,
            timezone: DEFAULT_TIMEZONE.into(),
            users: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
        }
    }
}

impl AppConfig {
    /// Overlay environment variables on top of file values.
    ///
    /// Takes a lookup function rather than reading the process environment
    /// directly so tests don't have to mutate global state.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("SLACK_API_BASE_URL") {
            self.slack.api_base = v;
        }
        if let Some(v) = var("SLACK_WORKSPACE_URL") {
            self.slack.workspace_url = Some(v);
        }
        if let Some(v) = var("SLACK_TEAM_ID") {
            self.slack.team_id = Some(v);
        }

        if let Some(v) = var("GOOGLE_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = var("GOOGLE_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = var("GOOGLE_API_BASE_URL") {
            self.llm.base_url = v;
        }

        if let Some(v) = var("RESEARCH_BOT_TOKEN") {
            self.research.bot_token = Some(v);
        }
        if let Some(v) = var("RESEARCH_LIST_ID") {
            self.research.list_id = Some(v);
        }
        if let Some(v) = var("RESEARCH_CHANNEL_ID") {
            self.research.channel_id = Some(v);
        }
        if let Some(v) = var("RESEARCH_TIMEZONE").or_else(|| var("TIMEZONE")) {
            self.research.timezone = v;
        }
        if let Some(v) = var("RESEARCH_KEY_ASSIGNEES") {
            self.research.key_assignees = split_list(&v);
        }
        if let Some(v) = var("RESEARCH_FOCUS_USER") {
            self.research.focus_user = Some(v);
        }
        if let Some(v) = var("RESEARCH_SYSTEM_PROMPT") {
            self.research.system_prompt = Some(v);
        }
        if let Some(v) = var("RESEARCH_GOOGLE_MODEL") {
            self.research.model = Some(v);
        }

        if let Some(v) = var("SALES_BOT_TOKEN") {
            self.sales.bot_token = Some(v);
        }
        if let Some(v) = var("SALES_LIST_ID") {
            self.sales.list_id = Some(v);
        }
        if let Some(v) = var("SALES_CHANNEL_ID") {
            self.sales.channel_id = Some(v);
        }
        if let Some(v) = var("SALES_TIMEZONE").or_else(|| var("TIMEZONE")) {
            self.sales.timezone = v;
        }

        if let Some(v) = var("CHANBOT_LOG") {
            self.logging.level = v;
        }
    }

    pub fn research_model(&self) -> &str {
        self.research.model.as_deref().unwrap_or(&self.llm.model)
    }
}

/// Comma-separated list with blanks dropped.
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Borrow a required setting or explain which variable to set.
pub fn required<'a>(value: &'a Option<String>, env_name: &str) -> Result<&'a str> {
    value
        .as_deref()
        .with_context(|| format!("{env_name} is not set (environment, .env, or config.toml)"))
}

fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".chanbot")
        .join("config.toml")
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig =
        toml::from_str(&contents).with_context(|| "Failed to parse config.toml")?;
    Ok(config)
}

/// File config, then `.env`, then the process environment.
pub fn load_config() -> Result<AppConfig> {
    dotenvy::dotenv().ok();
    let mut config = load_config_from(&config_path())?;
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}
