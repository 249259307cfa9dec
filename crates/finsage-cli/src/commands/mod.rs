//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `ledger` - Shared ledger loading and output helpers
//! - `engine` - Engine commands (budget, detect, recommend, advise, summary)
//! - `ai` - AI backend diagnostics
//! - `prompts` - Prompt library management commands
//! - `serve` - Web server command

pub mod ai;
pub mod engine;
pub mod ledger;
pub mod prompts;
pub mod serve;

// Re-export command functions for main.rs
pub use ai::*;
pub use engine::*;
pub use ledger::*;
pub use prompts::*;
pub use serve::*;
