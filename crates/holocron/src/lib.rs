//! Holocron - tools for Sith engine game data
//!
//! On top of the archive and content crates, this crate provides an asset store with per kind
//! caches, a builder turning levels into meshes, model instances and placed things, and a
//! command line utility for browsing game installs.

use clap::{Parser, Subcommand};
use commands::{extract::ExtractCommand, level::LevelCommand, list::ListCommand};
use holocron_utils::{ok, AnyResult};

pub mod assets;
pub mod commands;
pub mod config;
pub mod world;

#[cfg(test)]
pub(crate) mod testing;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Prints debug logs, twice for trace logs
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand)]
pub enum CliCommand {
    /// Lists the records of every mounted container
    List(ListCommand),
    /// Copies records out of the mounted containers
    Extract(ExtractCommand),
    /// Builds a level and prints what it's made of
    Level(LevelCommand),
}

pub trait Command {
    fn run(self) -> AnyResult;
}

/// Runs `holocron` as if it was ran from the command line.
pub fn run(cli: Cli) -> AnyResult {
    match cli.command {
        CliCommand::List(c) => c.run()?,
        CliCommand::Extract(c) => c.run()?,
        CliCommand::Level(c) => c.run()?,
    }
    ok()
}
