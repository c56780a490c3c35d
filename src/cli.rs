use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Result};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::bots::export::export_list;
use crate::bots::research::{render_debug_report, ResearchBot};
use crate::bots::research_digest::ResearchDigestBot;
use crate::bots::sales::SalesBot;
use crate::bots::BotKind;
use crate::config::{required, AppConfig};
use crate::llm::gemini::GeminiClient;
use crate::slack::web::SlackClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ResearchChat,
    ResearchDebug,
    ResearchDigest { post: bool },
    Sales { post: bool },
    Export { bot: BotKind, out_dir: PathBuf },
    Help,
}

/// Parse arguments (without the program name) into a [`Command`].
///
/// Supported forms:
///   chanbot research
///   chanbot research debug
///   chanbot research digest [--post]
///   chanbot sales [--post]
///   chanbot export <research|sales> [--out DIR]
pub fn parse_args(args: &[String]) -> Result<Command> {
    let Some((first, rest)) = args.split_first() else {
        return Ok(Command::Help);
    };

    match first.as_str() {
        "help" | "-h" | "--help" => Ok(Command::Help),
        "research" => match rest {
            [] => Ok(Command::ResearchChat),
            [mode] if mode == "debug" => Ok(Command::ResearchDebug),
            [mode, opts @ ..] if mode == "digest" => Ok(Command::ResearchDigest {
                post: parse_post_flag("research digest", opts)?,
            }),
            _ => bail!("Usage: chanbot research [debug | digest [--post]]"),
        },
        "sales" => Ok(Command::Sales {
            post: parse_post_flag("sales", rest)?,
        }),
        "export" => parse_export_args(rest),
        other => bail!("Unknown command: {other}\n\nRun `chanbot help` for usage."),
    }
}

fn parse_post_flag(command: &str, args: &[String]) -> Result<bool> {
    let mut post = false;
    for arg in args {
        match arg.as_str() {
            "--post" => post = true,
            other => bail!("Unknown {command} option: {other}"),
        }
    }
    Ok(post)
}

fn parse_export_args(args: &[String]) -> Result<Command> {
    let mut bot = None;
    let mut out_dir = PathBuf::from("data");
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "-o" | "--out" => {
                i += 1;
                match args.get(i) {
                    Some(dir) => out_dir = PathBuf::from(dir),
                    None => bail!("Missing value for --out flag"),
                }
            }
            name => match BotKind::from_name(name) {
                Some(kind) if bot.is_none() => bot = Some(kind),
                Some(_) => bail!("Only one list can be exported at a time"),
                None => bail!("Unknown bot: {name} (expected research or sales)"),
            },
        }
        i += 1;
    }

    match bot {
        Some(bot) => Ok(Command::Export { bot, out_dir }),
        None => bail!("Usage: chanbot export <research|sales> [--out DIR]"),
    }
}

pub fn print_help() {
    println!("chanbot — local harness for the Research Chan and Sales Chan Slack bots\n");
    println!("USAGE:");
    println!("  chanbot research                  Chat with Research Chan using live list context");
    println!("  chanbot research debug            Show raw list data and parsed statistics");
    println!("  chanbot research digest [--post]  Preview the Research Chan daily digest");
    println!("  chanbot sales [--post]            Preview the Sales Chan daily digest");
    println!("  chanbot export <research|sales>   Save list schema, raw items and a field CSV");
    println!();
    println!("OPTIONS:");
    println!("  --post             Post the digest without asking");
    println!("  -o, --out <dir>    Export directory (default: ./data)");
    println!();
    println!("Settings come from ~/.chanbot/config.toml, .env, and the environment");
    println!("(RESEARCH_BOT_TOKEN, RESEARCH_LIST_ID, RESEARCH_CHANNEL_ID, SALES_BOT_TOKEN, SALES_LIST_ID,");
    println!(" SALES_CHANNEL_ID, SLACK_WORKSPACE_URL, SLACK_TEAM_ID, GOOGLE_API_KEY, ...).");
}

fn is_yes(answer: Option<&str>) -> bool {
    matches!(answer, Some(a) if a.eq_ignore_ascii_case("y"))
}

/// Line-oriented prompts on stdin.
struct Console {
    lines: Lines<BufReader<Stdin>>,
}

impl Console {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Print `prompt` and read one trimmed line; `None` on end of input.
    async fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        print!("{prompt}");
        std::io::stdout().flush()?;
        Ok(self.lines.next_line().await?.map(|l| l.trim().to_string()))
    }
}

fn slack_client(config: &AppConfig, token: &Option<String>, env_name: &str) -> Result<SlackClient> {
    Ok(SlackClient::new(
        required(token, env_name)?.to_string(),
        config.slack.api_base.clone(),
    ))
}

fn research_llm(config: &AppConfig) -> GeminiClient {
    GeminiClient::new(
        config.llm.api_key.clone(),
        config.research_model().to_string(),
        config.llm.base_url.clone(),
    )
}

pub async fn run(command: Command, config: &AppConfig) -> Result<()> {
    match command {
        Command::ResearchChat => handle_research_chat(config).await,
        Command::ResearchDebug => handle_research_debug(config).await,
        Command::ResearchDigest { post } => handle_research_digest(config, post).await,
        Command::Sales { post } => handle_sales(config, post).await,
        Command::Export { bot, out_dir } => handle_export(config, bot, out_dir).await,
        Command::Help => {
            print_help();
            Ok(())
        }
    }
}

async fn handle_research_debug(config: &AppConfig) -> Result<()> {
    let slack = slack_client(config, &config.research.bot_token, "RESEARCH_BOT_TOKEN")?;
    let llm = research_llm(config);
    let bot = ResearchBot::from_config(&slack, &llm, config)?;

    write_debug_report(&mut std::io::stdout(), &bot).await
}

/// Header first, then fetch, then the report.
async fn write_debug_report(out: &mut impl Write, bot: &ResearchBot<'_>) -> Result<()> {
    writeln!(out, "\n=== FETCHING RAW LIST DATA ===\n")?;
    out.flush()?;
    let snapshot = bot.load().await;
    write!(out, "{}", render_debug_report(&snapshot))?;
    Ok(())
}

async fn handle_research_chat(config: &AppConfig) -> Result<()> {
    let slack = slack_client(config, &config.research.bot_token, "RESEARCH_BOT_TOKEN")?;
    let llm = research_llm(config);
    let bot = ResearchBot::from_config(&slack, &llm, config)?;
    let mut console = Console::new();

    println!("\n=== RESEARCH CHAN LOCAL TESTER ===");
    println!("Type 'debug' to see raw data, 'quit' to exit\n");

    loop {
        let Some(input) = console.ask("\nYou: ").await? else {
            break;
        };
        match input.to_lowercase().as_str() {
            "quit" => break,
            "debug" => {
                write_debug_report(&mut std::io::stdout(), &bot).await?;
                continue;
            }
            "" => continue,
            _ => {}
        }

        println!("\n[Fetching list items...]");
        let snapshot = bot.load().await;
        println!("[Found {} relevant tasks]", snapshot.relevant.len());
        let tasks_context = bot.tasks_context(&snapshot.relevant);

        println!("[Getting LLM response...]");
        let reply = bot.reply(&tasks_context, &input).await;
        println!("\nResearch Chan: {reply}");

        let show = console.ask("\nShow task context? (y/n): ").await?;
        if is_yes(show.as_deref()) {
            println!("\n=== TASK CONTEXT SENT TO LLM ===");
            println!("{tasks_context}");
        }
    }
    Ok(())
}

async fn handle_sales(config: &AppConfig, post: bool) -> Result<()> {
    let slack = slack_client(config, &config.sales.bot_token, "SALES_BOT_TOKEN")?;
    let bot = SalesBot::from_config(&slack, config)?;

    println!("=== SALES CHAN DAILY UPDATE TEST ===\n");
    println!("Fetching items from Slack List...");
    let digest = bot.build_digest().await;
    println!("{}", digest.summary());

    println!("=== MESSAGE PREVIEW ===");
    println!("{}", digest.message);
    println!("=== END PREVIEW ===");

    let channel = config.sales.channel_id.as_deref();
    if let Some(channel) = confirm_post(channel, "SALES_CHANNEL_ID", post).await? {
        println!("{}", bot.post(channel, &digest.message).await);
    }
    Ok(())
}

async fn handle_research_digest(config: &AppConfig, post: bool) -> Result<()> {
    let slack = slack_client(config, &config.research.bot_token, "RESEARCH_BOT_TOKEN")?;
    let bot = ResearchDigestBot::from_config(&slack, config)?;

    println!("=== RESEARCH CHAN DAILY UPDATE TEST ===\n");
    println!("Fetching items from Slack List...");
    let digest = bot.build_digest().await;
    println!("{}", digest.summary());

    println!("=== MESSAGE PREVIEW ===");
    println!("{}", digest.message);
    println!("=== END PREVIEW ===");

    let channel = config.research.channel_id.as_deref();
    if let Some(channel) = confirm_post(channel, "RESEARCH_CHANNEL_ID", post).await? {
        println!("{}", bot.post(channel, &digest.message).await);
    }
    Ok(())
}

/// The channel to post to, if posting was requested or confirmed. Asking only
/// happens when a channel is configured; `--post` without one is an error.
async fn confirm_post<'c>(
    channel: Option<&'c str>,
    channel_env: &str,
    post: bool,
) -> Result<Option<&'c str>> {
    let Some(channel) = channel else {
        if post {
            bail!("{channel_env} is not set; nowhere to post the digest");
        }
        return Ok(None);
    };
    let confirmed = post || {
        let mut console = Console::new();
        is_yes(console.ask("\nPost to Slack channel? (y/n): ").await?.as_deref())
    };
    Ok(confirmed.then_some(channel))
}

async fn handle_export(config: &AppConfig, bot: BotKind, out_dir: PathBuf) -> Result<()> {
    let (token, token_env, list_id, list_env) = match bot {
        BotKind::Research => (
            &config.research.bot_token,
            "RESEARCH_BOT_TOKEN",
            &config.research.list_id,
            "RESEARCH_LIST_ID",
        ),
        BotKind::Sales => (
            &config.sales.bot_token,
            "SALES_BOT_TOKEN",
            &config.sales.list_id,
            "SALES_LIST_ID",
        ),
    };
    let slack = slack_client(config, token, token_env)?;
    let list_id = required(list_id, list_env)?;

    println!("Exporting {} list {list_id}...", bot.display_name());
    for path in export_list(&slack, bot, list_id, &out_dir).await? {
        println!("Saved: {}", path.display());
    }
    Ok(())
}
