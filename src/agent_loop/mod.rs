//! Agent loop: the state machine driving model turns and tool dispatch.

pub mod events;
pub mod runner;
pub mod types;

pub use events::*;
pub use runner::*;
pub use types::*;
