//! Command dispatch for the keylint CLI.

use anyhow::Result;

use super::{
    args::{Arguments, Command},
    commands::CommandResult,
    commands::{check::check, init::init, keys::keys},
};

pub fn run(Arguments { command }: Arguments) -> Result<CommandResult> {
    match command {
        Some(Command::Check(cmd)) => check(cmd),
        Some(Command::Keys(cmd)) => keys(cmd),
        Some(Command::Init) => init(),
        None => {
            anyhow::bail!("No command provided. Use --help to see available commands.")
        }
    }
}
