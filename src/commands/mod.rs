mod auth;
mod config_cmd;
mod recipe;
mod sync_cmd;

pub use auth::{LoginCommand, StatusCommand};
pub use config_cmd::ConfigCommand;
pub use recipe::{AddCommand, DeleteCommand, EditCommand, ListCommand, ShowCommand};
pub use sync_cmd::SyncCommand;

use clap::ValueEnum;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
