use clap::{Parser, Subcommand, ValueEnum};

use crate::commands;
use crate::constants::DEFAULT_TICKERS;

#[derive(Parser)]
#[command(name = "monthly-variations")]
#[command(about = "Monthly return heatmaps per ticker", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for the `matrix` command
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned text table
    Table,
    /// CSV with a `Year` column
    Csv,
    /// Same JSON as GET /matrix
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server
    Serve {
        /// Port to listen on (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Build the combined matrix once and print it
    Matrix {
        /// Comma-separated tickers, e.g. GGAL.BA,YPFD.BA
        #[arg(short, long, default_value = DEFAULT_TICKERS)]
        tickers: String,

        /// Months to keep, e.g. 9,10 (all months when omitted)
        #[arg(short, long, value_delimiter = ',')]
        months: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

pub async fn run() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            commands::serve::run(port).await;
        }
        Commands::Matrix { tickers, months, format } => {
            commands::matrix::run(&tickers, &months, format).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_defaults() {
        let cli = Cli::try_parse_from(["monthly-variations", "matrix"]).unwrap();
        match cli.command {
            Commands::Matrix { tickers, months, format } => {
                assert_eq!(tickers, DEFAULT_TICKERS);
                assert!(months.is_empty());
                assert_eq!(format, OutputFormat::Table);
            }
            _ => panic!("expected matrix command"),
        }
    }

    #[test]
    fn test_matrix_months_are_comma_split() {
        let cli = Cli::try_parse_from([
            "monthly-variations",
            "matrix",
            "--tickers",
            "AAPL",
            "--months",
            "9,10",
            "--format",
            "csv",
        ])
        .unwrap();
        match cli.command {
            Commands::Matrix { tickers, months, format } => {
                assert_eq!(tickers, "AAPL");
                assert_eq!(months, vec!["9", "10"]);
                assert_eq!(format, OutputFormat::Csv);
            }
            _ => panic!("expected matrix command"),
        }
    }

    #[test]
    fn test_serve_port() {
        let cli = Cli::try_parse_from(["monthly-variations", "serve", "--port", "8080"]).unwrap();
        assert!(matches!(cli.command, Commands::Serve { port: Some(8080) }));
    }
}
