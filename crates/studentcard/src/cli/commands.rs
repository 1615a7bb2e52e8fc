//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::projection::ErrorCorrection;
use crate::record::{Allergy, BusRoute, ClassDivision};

/// Submit command arguments.
#[derive(Debug, Args)]
pub struct SubmitCommand {
    /// Student name
    #[arg(short, long)]
    pub name: String,

    /// Roll number
    #[arg(short, long)]
    pub roll: String,

    /// Class division (A, B or C)
    #[arg(long, default_value_t = ClassDivision::A)]
    pub class: ClassDivision,

    /// Allergy; repeat for several (Peanuts, Gluten, Dairy, Dust)
    #[arg(short, long = "allergy", value_name = "ALLERGY")]
    pub allergies: Vec<Allergy>,

    /// Photo file (PNG, JPEG, GIF, WebP, ...)
    #[arg(short, long, value_name = "FILE")]
    pub photo: Option<PathBuf>,

    /// Rack number
    #[arg(long, default_value = "")]
    pub rack: String,

    /// Bus route (1, 2 or 3)
    #[arg(short, long, default_value_t = BusRoute::Route1)]
    pub bus: BusRoute,

    /// Replace an already submitted card
    #[arg(long)]
    pub replace: bool,
}

/// Show command arguments.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Token command arguments.
#[derive(Debug, Args)]
pub struct TokenCommand {
    /// Error-correction level to check capacity against
    #[arg(short, long)]
    pub level: Option<ErrorCorrection>,

    /// Draw the QR symbol instead of printing the token text
    #[arg(long)]
    pub render: bool,
}

/// Export command arguments.
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// Directory to write `<name>_id_card.png` into
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub out: PathBuf,
}

/// Decode command arguments.
#[derive(Debug, Args)]
pub struct DecodeCommand {
    /// Token read from a card's QR code
    pub token: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Reset command arguments.
#[derive(Debug, Args)]
pub struct ResetCommand {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
