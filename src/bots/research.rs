use std::fmt::Write;

use anyhow::Result;
use tracing::{error, info};

use super::parser::ItemParser;
use super::summary::{render_priority_distribution, render_status_distribution};
use super::UserDirectory;
use crate::config::{required, AppConfig};
use crate::llm::{GenerationConfig, LlmClient};
use crate::model::list_item::RawListItem;
use crate::model::schema::RESEARCH;
use crate::model::task::{sort_by_priority, TaskRecord};
use crate::slack::{fetch_list_items, SlackApi};
use crate::util::text::{preview, truncate_with_ellipsis};

pub const RELEVANT_STATUSES: &[&str] = &["ToDo", "In Progress"];
pub const NOTES_MAX_CHARS: usize = 200;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Research Chan, a friendly, concise R&D teammate. \
    Be upbeat but efficient, answer in 3–6 sentences max, suggest concrete next steps, and use \
    Slack-friendly formatting (bullets, short lines). Keep answers grounded in the conversation context.";

/// Keep only items someone is expected to act on.
pub fn filter_relevant(items: Vec<TaskRecord>) -> Vec<TaskRecord> {
    items
        .into_iter()
        .filter(|item| RELEVANT_STATUSES.contains(&item.status.as_str()))
        .collect()
}

/// One line per task, most urgent first, for injection into the system prompt.
pub fn build_tasks_context(items: &[TaskRecord], max_items: usize, users: &UserDirectory) -> String {
    let mut sorted = items.to_vec();
    sort_by_priority(&mut sorted);

    sorted
        .iter()
        .take(max_items)
        .map(|item| {
            let assignee = users.name_or_mention(item.assignee_id.as_deref());
            let due = item.due.as_deref().unwrap_or("no due date");
            let tag = if item.priority.is_set() {
                format!("[{}] ", item.priority)
            } else {
                String::new()
            };
            let details = item
                .notes
                .as_deref()
                .filter(|n| !n.is_empty())
                .map(|n| format!("\n   Details: {}", truncate_with_ellipsis(n, NOTES_MAX_CHARS)))
                .unwrap_or_default();
            format!("- {tag}{assignee} • {} (Due: {due}){details}", item.title)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_system_prompt(base: &str, tasks_context: &str) -> String {
    if tasks_context.is_empty() {
        base.to_string()
    } else {
        format!("{base}\n\nCurrent tasks (ToDo/In Progress):\n{tasks_context}")
    }
}

pub fn build_prompt(system_prompt: &str, user_message: &str) -> String {
    format!("{system_prompt}\n\nUser: {user_message}\n\nAssistant:")
}

/// Ask the model; failures come back as the reply text.
pub async fn respond(llm: &dyn LlmClient, prompt: &str, config: GenerationConfig) -> String {
    match llm.generate(prompt, config).await {
        Ok(text) => text,
        Err(e) => {
            error!(error = %e, "completion failed");
            format!("LLM Error: {e}")
        }
    }
}

pub struct Snapshot {
    pub raw: Vec<RawListItem>,
    pub parsed: Vec<TaskRecord>,
    pub relevant: Vec<TaskRecord>,
}

pub struct ResearchBot<'a> {
    slack: &'a dyn SlackApi,
    llm: &'a dyn LlmClient,
    list_id: &'a str,
    system_prompt: &'a str,
    max_context_items: usize,
    users: UserDirectory<'a>,
    generation: GenerationConfig,
}

impl<'a> ResearchBot<'a> {
    pub fn from_config(
        slack: &'a dyn SlackApi,
        llm: &'a dyn LlmClient,
        config: &'a AppConfig,
    ) -> Result<Self> {
        let research = &config.research;
        Ok(Self {
            slack,
            llm,
            list_id: required(&research.list_id, "RESEARCH_LIST_ID")?,
            system_prompt: research
                .system_prompt
                .as_deref()
                .unwrap_or(DEFAULT_SYSTEM_PROMPT),
            max_context_items: research.max_context_items,
            users: UserDirectory::new(&research.users),
            generation: GenerationConfig {
                temperature: config.llm.temperature,
                max_output_tokens: config.llm.max_output_tokens,
            },
        })
    }

    pub async fn load(&self) -> Snapshot {
        let raw = fetch_list_items(self.slack, self.list_id).await;
        let parsed = ItemParser::new(&RESEARCH).parse_all(&raw);
        let relevant = filter_relevant(parsed.clone());
        Snapshot {
            raw,
            parsed,
            relevant,
        }
    }

    pub fn tasks_context(&self, relevant: &[TaskRecord]) -> String {
        info!(relevant = relevant.len(), "building task context");
        build_tasks_context(relevant, self.max_context_items, &self.users)
    }

    pub async fn reply(&self, tasks_context: &str, user_message: &str) -> String {
        let system = build_system_prompt(self.system_prompt, tasks_context);
        respond(self.llm, &build_prompt(&system, user_message), self.generation).await
    }
}

/// Raw first item plus parsed statistics, for checking column mappings.
pub fn render_debug_report(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let Some(first) = snapshot.raw.first() else {
        out.push_str("No items found!\n");
        return out;
    };

    let _ = writeln!(out, "Found {} total items\n", snapshot.raw.len());
    let _ = writeln!(out, "=== FIRST ITEM (RAW) ===");
    let raw_json = serde_json::to_string_pretty(first).unwrap_or_else(|e| format!("<{e}>"));
    let _ = writeln!(out, "{raw_json}");

    let _ = writeln!(out, "\n=== PARSED SUMMARY ===");
    let _ = writeln!(out, "Total items: {}", snapshot.parsed.len());
    let _ = writeln!(out, "Relevant (ToDo/In Progress): {}\n", snapshot.relevant.len());
    render_status_distribution(&mut out, &snapshot.parsed);
    out.push('\n');
    render_priority_distribution(
        &mut out,
        "Priority distribution (relevant items):",
        &snapshot.relevant,
    );

    let _ = writeln!(out, "\n=== FIRST 3 RELEVANT ITEMS (PARSED) ===");
    for item in snapshot.relevant.iter().take(3) {
        let _ = writeln!(out, "\nTitle: {}", item.title);
        let _ = writeln!(out, "Status: {}", item.status);
        let _ = writeln!(out, "Priority: {}", item.priority);
        let _ = writeln!(out, "Assignee: {}", item.assignee_id.as_deref().unwrap_or("None"));
        let _ = writeln!(out, "Due: {}", item.due.as_deref().unwrap_or("None"));
        if let Some(notes) = item.notes.as_deref() {
            let _ = writeln!(out, "Notes: {}...", preview(notes, 100));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::llm::LlmError;
    use crate::model::list_item::RawField;
    use crate::model::task::Priority;
    use crate::slack::tests::MockSlack;

    struct MockLlm {
        reply: Option<String>,
        prompts: Arc<Mutex<Vec<(String, GenerationConfig)>>>,
    }

    impl MockLlm {
        fn replying(text: &str) -> Self {
            Self {
                reply: Some(text.into()),
                prompts: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                prompts: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl LlmClient for MockLlm {
        async fn generate(&self, prompt: &str, config: GenerationConfig) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push((prompt.to_string(), config));
            self.reply.clone().ok_or(LlmError::EmptyReply)
        }
    }

    fn task(id: &str, status: &str, priority: Priority) -> TaskRecord {
        TaskRecord {
            id: id.into(),
            title: format!("Task {id}"),
            assignee_id: None,
            due: None,
            status: status.into(),
            priority,
            notes: None,
            permalink: None,
        }
    }

    fn raw(id: &str, title: &str, status_code: &str) -> RawListItem {
        RawListItem::new(
            id,
            vec![
                RawField::text("name", title),
                RawField::value("Col093T8A25LG", status_code),
            ],
        )
    }

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.research.list_id = Some("F_RESEARCH".into());
        config
    }

    #[test]
    fn filter_keeps_actionable_statuses_in_order() {
        let items = vec![
            task("a", "Complete", Priority::P0),
            task("b", "ToDo", Priority::P3),
            task("c", "Backlog", Priority::P1),
            task("d", "In Progress", Priority::P2),
            task("e", "Unknown", Priority::P0),
        ];
        let ids: Vec<String> = filter_relevant(items).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["b", "d"]);
    }

    #[test]
    fn context_lines_are_sorted_and_formatted() {
        let names = HashMap::from([("U1".to_string(), "Ada".to_string())]);
        let users = UserDirectory::new(&names);
        let mut a = task("a", "ToDo", Priority::Unset);
        a.assignee_id = Some("U9".into());
        let mut b = task("b", "ToDo", Priority::P1);
        b.assignee_id = Some("U1".into());
        b.due = Some("2024-01-10".into());

        let context = build_tasks_context(&[a, b], 80, &users);
        assert_eq!(
            context,
            "- [P1] Ada • Task b (Due: 2024-01-10)\n- <@U9> • Task a (Due: no due date)"
        );
    }

    #[test]
    fn context_truncates_to_max_items() {
        let names = HashMap::new();
        let items: Vec<TaskRecord> = (0..5)
            .map(|i| task(&i.to_string(), "ToDo", Priority::P2))
            .collect();
        let context = build_tasks_context(&items, 3, &UserDirectory::new(&names));
        assert_eq!(context.lines().count(), 3);
        assert!(context.starts_with("- [P2] Unassigned • Task 0"));
    }

    #[test]
    fn long_notes_are_truncated() {
        let names = HashMap::new();
        let mut long = task("a", "ToDo", Priority::P0);
        long.notes = Some("n".repeat(250));
        let mut short = task("b", "ToDo", Priority::P1);
        short.notes = Some("s".repeat(50));

        let context = build_tasks_context(&[long, short], 80, &UserDirectory::new(&names));
        let details: Vec<&str> = context
            .lines()
            .filter_map(|l| l.strip_prefix("   Details: "))
            .collect();
        assert_eq!(details, vec![format!("{}...", "n".repeat(200)), "s".repeat(50)]);
    }

    #[test]
    fn empty_context_leaves_prompt_bare() {
        assert_eq!(build_system_prompt("Base", ""), "Base");
        assert_eq!(
            build_system_prompt("Base", "- x"),
            "Base\n\nCurrent tasks (ToDo/In Progress):\n- x"
        );
        assert_eq!(build_prompt("Sys", "hi"), "Sys\n\nUser: hi\n\nAssistant:");
    }

    #[tokio::test]
    async fn respond_substitutes_error_text() {
        let reply = respond(&MockLlm::failing(), "p", GenerationConfig::default()).await;
        assert_eq!(reply, "LLM Error: model returned no text");
    }

    #[tokio::test]
    async fn reply_sends_context_and_message() {
        let slack = MockSlack::new(vec![
            raw("r1", "P1: Ship eval harness", "Opt2AUH34OG"),
            raw("r2", "Old idea", "Opt38B8RWRR"),
        ]);
        let llm = MockLlm::replying("On it!");
        let config = config();
        let bot = ResearchBot::from_config(&slack, &llm, &config).unwrap();

        let snapshot = bot.load().await;
        assert_eq!(snapshot.raw.len(), 2);
        assert_eq!(snapshot.relevant.len(), 1);
        let tasks_context = bot.tasks_context(&snapshot.relevant);
        assert_eq!(
            tasks_context,
            "- [P1] Unassigned • Ship eval harness (Due: no due date)"
        );
        assert_eq!(bot.reply(&tasks_context, "What's next?").await, "On it!");

        let prompts = llm.prompts.lock().unwrap();
        let (prompt, generation) = &prompts[0];
        assert!(prompt.starts_with(DEFAULT_SYSTEM_PROMPT));
        assert!(prompt.contains("Current tasks (ToDo/In Progress):\n- [P1]"));
        assert!(prompt.ends_with("User: What's next?\n\nAssistant:"));
        assert_eq!(generation.max_output_tokens, 600);
    }

    #[tokio::test]
    async fn empty_fetch_still_answers() {
        let slack = MockSlack::new(vec![]).with_fetch_failure();
        let llm = MockLlm::replying("Nothing on the board.");
        let config = config();
        let bot = ResearchBot::from_config(&slack, &llm, &config).unwrap();

        let snapshot = bot.load().await;
        assert!(snapshot.relevant.is_empty());
        let tasks_context = bot.tasks_context(&snapshot.relevant);
        assert!(tasks_context.is_empty());
        assert_eq!(bot.reply(&tasks_context, "Status?").await, "Nothing on the board.");
        assert!(!llm.prompts.lock().unwrap()[0].0.contains("Current tasks"));
    }

    #[test]
    fn missing_list_id_is_rejected() {
        let slack = MockSlack::new(vec![]);
        let llm = MockLlm::replying("x");
        let config = AppConfig::default();
        let err = ResearchBot::from_config(&slack, &llm, &config).err().unwrap();
        assert!(err.to_string().contains("RESEARCH_LIST_ID"));
    }

    #[tokio::test]
    async fn debug_report_summarizes_items() {
        let mut with_notes = raw("r1", "Label data", "OptHSJVP60E");
        with_notes
            .fields
            .push(RawField::text("Col08V5C24K1S", "Use the new labeling guide"));
        let slack = MockSlack::new(vec![
            with_notes,
            raw("r2", "p0 Fix crash", "Opt62NHHN5C"),
            raw("r3", "Archive", "Opt38B8RWRR"),
        ]);
        let llm = MockLlm::replying("x");
        let config = config();
        let bot = ResearchBot::from_config(&slack, &llm, &config).unwrap();

        let report = render_debug_report(&bot.load().await);
        assert!(report.starts_with("Found 3 total items"));
        assert!(report.contains("\"id\": \"r1\""));
        assert!(report.contains("Relevant (ToDo/In Progress): 2"));
        assert!(report.contains("  Complete: 1\n  In Progress: 1\n  ToDo: 1\n"));
        assert!(report.contains("Priority distribution (relevant items):\n  P0: 1\n  None: 1\n"));
        assert!(report.contains("Title: Fix crash"));
        assert!(report.contains("Notes: Use the new labeling guide..."));
    }

    #[test]
    fn debug_report_for_empty_list() {
        let snapshot = Snapshot {
            raw: vec![],
            parsed: vec![],
            relevant: vec![],
        };
        assert_eq!(render_debug_report(&snapshot), "No items found!\n");
    }
}
