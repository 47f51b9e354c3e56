//! research-agent: a tool-calling research assistant.
//!
//! A user query plus optional attachments (PDF, text, images) is normalized
//! into a conversation, then an [`AgentLoop`](agent_loop::AgentLoop) alternates
//! requests to an OpenAI-compatible chat model with dispatches of the tools the
//! model asks for (document loading, summarization, web and academic search,
//! knowledge-base retrieval) until the model answers.
//!
//! # Quick Start
//!
//! ```no_run
//! use research_agent::prelude::*;
//!
//! # async fn example() -> research_agent::Result<()> {
//! let config = AgentConfig::load(None)?;
//! let agent = research_agent::cli::session::build_agent(&config)?;
//! let outcome = agent.run("What is retrieval-augmented generation?", &[]).await?;
//! println!("{}", outcome.answer);
//! # Ok(())
//! # }
//! ```

pub mod agent_loop;
pub mod config;
pub mod error;
pub mod index;
pub mod input;
pub mod prelude;
pub mod provider;
pub mod tools;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{ResearchError, Result};
