//! Shared types for the pilltrack application.
//!
//! Holds the crate-wide `Result` alias, the dose summary shown in the screen
//! header and the CLI subcommands.
use serde::Serialize;

use clap::Subcommand;

use crate::PillError;

/// A specialized Result type for pilltrack operations.
pub type Result<T> = std::result::Result<T, PillError>;

/// Counts shown above the list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DoseSummary {
    pub total: usize,
    pub taken: usize,
    pub pending: usize,
}

/// Available subcommands for the pilltrack application
#[derive(Subcommand)]
pub enum Commands {
    /// Show today's doses ordered by scheduled time
    List {
        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Add a medication
    Add {
        /// Medication name
        #[clap(short, long)]
        name: String,

        /// Pills per dose, a positive whole number
        #[clap(short, long, allow_hyphen_values = true)]
        quantity: String,

        /// When to take it, e.g. "08:00" or "morning"
        #[clap(short, long)]
        time: String,
    },

    /// Edit a medication, keeping fields that are not given
    Edit {
        /// ID of the medication to edit
        id: String,

        /// New name
        #[clap(short, long)]
        name: Option<String>,

        /// New pills per dose
        #[clap(short, long, allow_hyphen_values = true)]
        quantity: Option<String>,

        /// New scheduled time
        #[clap(short, long)]
        time: Option<String>,
    },

    /// Mark a medication as taken, or back to pending if it already was
    Take {
        /// ID of the medication
        id: String,
    },

    /// Delete a medication by ID
    Delete {
        /// ID of the medication to delete
        id: String,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Show taken and pending counts
    Summary,

    /// Interactive session on a single screen
    Shell,

    /// Configuration management
    Config {
        /// Show current configuration
        #[clap(short = 'S', long)]
        show: bool,

        /// Update a configuration setting (key=value)
        #[clap(short, long)]
        set: Option<String>,

        /// Reset configuration to defaults
        #[clap(short, long)]
        reset: bool,
    },
}
