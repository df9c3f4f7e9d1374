use std::path::PathBuf;

use clap::Parser;

use crate::Commands;

/// Main CLI application arguments and command structure
#[derive(Parser)]
#[clap(
    name = "pilltrack",
    version,
    about = "Track daily medication doses; taken flags reset every calendar day"
)]
pub struct Cli {
    /// Path to the configuration file
    #[clap(short = 'c', long, value_parser)]
    pub config: Option<PathBuf>,

    /// Directory holding the medication data
    #[clap(long, value_parser)]
    pub data_dir: Option<PathBuf>,

    /// Verbose output mode
    #[clap(short, long)]
    pub verbose: bool,

    /// Subcommands for the pilltrack application
    #[clap(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_quantity_reaches_validation() {
        let cli = Cli::try_parse_from([
            "pilltrack", "add", "--name", "Aspirin", "--quantity", "-1", "--time", "08:00",
        ])
        .unwrap();

        match cli.command {
            Commands::Add { quantity, .. } => assert_eq!(quantity, "-1"),
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn global_flags_parse() {
        let cli = Cli::try_parse_from(["pilltrack", "--data-dir", "/tmp/p", "-v", "list", "--json"])
            .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/p")));
        assert!(matches!(cli.command, Commands::List { json: true }));
    }
}
