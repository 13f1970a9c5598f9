//! Root of the `kritikos-core` library.

// Prevent accidental direct writes to stdout/stderr in library code. All
// user-visible output goes through the CLI or the tracing stack.
#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod actions;
pub mod config;
mod error;
pub mod input;
mod models;
pub mod prompts;
pub mod render;
pub mod response_parser;
pub mod state;

pub use actions::refine_text;
pub use actions::run_audit;
pub use error::ActionError;
pub use error::ConfigError;
pub use error::InputError;
pub use input::AuditInput;
pub use models::AuditResult;
pub use models::RewriteResult;
pub use models::SeverityCounts;
pub use prompts::RewriteMode;
pub use prompts::Tone;
pub use state::InputField;
pub use state::SessionState;
pub use state::Slot;
pub use state::SlotValue;
