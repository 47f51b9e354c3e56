//! Utility modules: retry, text truncation.

pub mod retry;
pub mod text;
