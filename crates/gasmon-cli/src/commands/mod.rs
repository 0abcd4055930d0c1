//! Command implementations for the CLI.

mod history;
mod send;
mod watch;

pub use history::cmd_history;
pub use send::cmd_send;
pub use watch::cmd_watch;
