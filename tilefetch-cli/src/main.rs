//! tilefetch CLI - Command-line interface
//!
//! This binary provides a command-line interface to the tilefetch library.

mod commands;
mod error;
mod progress;
mod runner;

use clap::{Parser, Subcommand};

use commands::download::DownloadArgs;

#[derive(Parser)]
#[command(name = "tilefetch")]
#[command(version = tilefetch::VERSION)]
#[command(about = "Download raster map tiles for a region", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download tiles directly
    Download(DownloadArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Download(args) => commands::download::run(args).await,
    };

    if let Err(e) = result {
        e.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_download_subcommand_parses() {
        let cli = Cli::try_parse_from([
            "tilefetch",
            "download",
            "--url",
            "https://tile.test/{z}/{x}/{y}.png",
            "--output-dir",
            "world",
            "--min-zoom",
            "0",
            "--max-zoom",
            "2",
            "--bounds=-180,-85,180,85",
            "-v",
        ])
        .unwrap();

        let Commands::Download(args) = cli.command;
        assert!(args.verbose);
        assert_eq!(args.max_zoom, 2);
        assert!(!args.dry_run);
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["tilefetch"]).is_err());
    }
}
