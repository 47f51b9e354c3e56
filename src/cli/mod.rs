//! Command-line interface for the research agent.

pub mod session;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::config::AgentConfig;

/// Multi-modal research agent: ask questions, attach PDFs/images, get researched answers.
#[derive(Parser, Debug)]
#[command(name = "research-agent", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Your research question or instruction
    pub query: Option<String>,

    /// Paths to PDF, image, or text files to include
    #[arg(short = 'f', long = "files", value_name = "FILE", num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// Run in interactive mode (prompt for queries)
    #[arg(short, long)]
    pub interactive: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Options accepted before or after any subcommand.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct GlobalArgs {
    /// Config file (TOML)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the knowledge-base index
    #[arg(long, value_name = "DIR", global = true)]
    pub index_dir: Option<PathBuf>,

    /// Model identifier
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Override the system prompt
    #[arg(long, global = true)]
    pub system: Option<String>,

    /// Maximum tool-call rounds per query
    #[arg(long, global = true)]
    pub max_iterations: Option<usize>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl GlobalArgs {
    /// Apply flag overrides on top of file and environment configuration.
    pub fn apply(&self, config: &mut AgentConfig) {
        if let Some(dir) = &self.index_dir {
            config.index_dir = dir.clone();
        }
        if let Some(model) = &self.model {
            config.model.model = model.clone();
        }
        if let Some(system) = &self.system {
            config.agent.system_prompt = Some(system.clone());
        }
        if let Some(n) = self.max_iterations {
            config.agent.max_iterations = n;
        }
    }

    /// Default tracing filter for the verbosity level.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index PDF and text files into the local knowledge base
    Index(IndexArgs),
}

/// Arguments for `research-agent index`.
#[derive(clap::Args, Debug, Clone)]
pub struct IndexArgs {
    /// File or directory to index
    pub path: PathBuf,

    /// Additional files or directories
    #[arg(short = 'f', long = "files", value_name = "PATH", num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,
}

impl IndexArgs {
    /// Every target, primary path first.
    pub fn targets(&self) -> Vec<PathBuf> {
        std::iter::once(self.path.clone())
            .chain(self.files.iter().cloned())
            .collect()
    }
}

/// What the invocation asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Ask { query: String, files: Vec<PathBuf> },
    Interactive,
    Index { targets: Vec<PathBuf>, recursive: bool },
    /// No query and no mode flag.
    Help,
}

impl Cli {
    pub fn mode(&self) -> Mode {
        if let Some(Commands::Index(args)) = &self.command {
            return Mode::Index {
                targets: args.targets(),
                recursive: args.recursive,
            };
        }
        if self.interactive {
            return Mode::Interactive;
        }
        match self.query.as_deref().map(str::trim) {
            Some(query) if !query.is_empty() => Mode::Ask {
                query: query.to_string(),
                files: self.files.clone(),
            },
            _ => Mode::Help,
        }
    }
}
