pub mod cancel;
pub mod commands;
pub mod probe;
pub mod serve;
pub mod status;
pub mod trigger;
pub mod validate;

pub use commands::{Cli, Commands};

/// Default address of the control API for client subcommands.
pub const DEFAULT_SERVER: &str = "http://localhost:8080";
