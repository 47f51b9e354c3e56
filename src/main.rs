//! research-agent binary entry point.

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use research_agent::cli::session::{
    build_agent, progress_sink, run_index, run_interactive, run_once,
};
use research_agent::cli::{Cli, Mode};
use research_agent::config::AgentConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.log_filter());

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> research_agent::Result<()> {
    let mut config = AgentConfig::load(cli.global.config.as_deref())?;
    cli.global.apply(&mut config);
    config.validate()?;

    let mut stdout = std::io::stdout();
    match cli.mode() {
        Mode::Help => {
            Cli::command().print_help()?;
            Ok(())
        }
        Mode::Index { targets, recursive } => {
            run_index(&config, targets, recursive, &mut stdout).await
        }
        Mode::Interactive => {
            let agent = build_agent(&config)?.with_event_sink(progress_sink());
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            run_interactive(&agent, stdin, &mut stdout).await
        }
        Mode::Ask { query, files } => {
            let agent = build_agent(&config)?.with_event_sink(progress_sink());
            eprintln!("Thinking...");
            run_once(&agent, &query, &files, &mut stdout).await
        }
    }
}
