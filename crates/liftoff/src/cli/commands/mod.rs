//! CLI commands

mod actions;
mod appetize;
mod completions;
mod gym;
mod init;

pub use actions::ActionsCommand;
pub use appetize::AppetizeCommand;
pub use completions::CompletionsCommand;
pub use gym::GymCommand;
pub use init::InitCommand;
