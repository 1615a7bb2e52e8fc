//! Command-line interface for studentcard.
//!
//! This module provides the CLI structure for the `stucard` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::Verbosity;

pub use commands::{
    ConfigCommand, DecodeCommand, ExportCommand, ResetCommand, ShowCommand, StatusCommand,
    SubmitCommand, TokenCommand,
};

/// stucard - Student ID cards with scannable QR codes
///
/// Records one student's details, keeps the submitted card on disk, and
/// prints the compact QR token the card carries.
#[derive(Debug, Parser)]
#[command(name = "stucard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fill in and submit the student card
    Submit(SubmitCommand),

    /// Show the submitted card
    Show(ShowCommand),

    /// Print the QR token of the submitted card
    Token(TokenCommand),

    /// Decode a token scanned from a card
    Decode(DecodeCommand),

    /// Save the submitted card as a PNG image
    Export(ExportCommand),

    /// Delete the submitted card
    Reset(ResetCommand),

    /// Show card and storage status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
