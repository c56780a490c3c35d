mod bots;
mod cli;
mod config;
mod llm;
mod model;
mod slack;
mod util;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use cli::Command;

/// `RUST_LOG` wins over the configured level. Logs go to stderr so the
/// harness output on stdout stays readable.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = cli::parse_args(&args)?;
    if command == Command::Help {
        cli::print_help();
        return Ok(());
    }

    let config = config::load_config()?;
    init_logging(&config.logging.level);

    cli::run(command, &config).await
}
