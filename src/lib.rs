// Library surface for headless/integration tests and reuse.
// The terminal UI lives in the binary (main.rs, ui/).
pub mod app_dirs;
pub mod assistant;
pub mod catalog;
pub mod celebration;
pub mod clock;
pub mod coach;
pub mod commands;
pub mod error;
pub mod history;
pub mod instructions;
pub mod ledger;
pub mod logging;
pub mod pain;
pub mod runtime;
pub mod sequencer;
pub mod session;
pub mod settings;
pub mod speech;
pub mod util;

pub use error::{LimberError, Result};
