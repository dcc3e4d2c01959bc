//! Command handlers, one module per top-level subcommand.

pub mod config_cmd;
pub mod history;
pub mod pump;
pub mod status;
pub mod util;
pub mod watch;

use binasa_core::Controller;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a device command to its handler.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(controller, global).await,
        Command::Watch(args) => watch::handle(args, controller, global).await,
        Command::Pump(args) => pump::handle(args, controller, global).await,
        Command::History(args) => history::handle(args, controller, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "command does not need a device connection".into(),
        )),
    }
}
