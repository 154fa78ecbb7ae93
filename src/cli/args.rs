//! CLI argument definitions using clap.
//!
//! ## Commands
//!
//! - `check`: Validate message keys against compiled classes
//! - `keys`: List keys extracted from compiled classes
//! - `init`: Initialize the keylint configuration file

use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Arguments {
    /// Check if a command was provided, otherwise print help and return None.
    pub fn with_command_or_help(self) -> Option<Self> {
        if self.command.is_none() {
            Self::command().print_help().ok();
            None
        } else {
            Some(self)
        }
    }

    /// Get the verbose flag from the command's common args.
    pub fn verbose(&self) -> bool {
        match &self.command {
            Some(Command::Check(cmd)) => cmd.common.verbose,
            Some(Command::Keys(cmd)) => cmd.common.verbose,
            Some(Command::Init) | None => false,
        }
    }
}

/// Common arguments shared by the scanning commands.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Message files to load (overrides config file)
    #[arg(long = "messages")]
    pub messages: Vec<PathBuf>,

    /// Class file roots to scan (overrides config file)
    #[arg(long = "classes")]
    pub classes: Vec<PathBuf>,

    /// Required key prefix (overrides config file)
    #[arg(long)]
    pub key_prefix: Option<String>,

    /// Treat unused keys as errors (overrides config file)
    #[arg(long, conflicts_with = "lenient")]
    pub strict: bool,

    /// Treat unused keys as warnings only (overrides config file)
    #[arg(long)]
    pub lenient: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Args)]
pub struct CheckCommand {
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Args)]
pub struct KeysCommand {
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate message keys: missing keys fail, unused keys fail in strict mode
    Check(CheckCommand),
    /// List the keys statically extracted from compiled classes
    Keys(KeysCommand),
    /// Initialize a new .keylintrc.json configuration file
    Init,
}
