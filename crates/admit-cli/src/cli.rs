use std::net::SocketAddr;
use std::path::PathBuf;

use admit_engine::HeaderRule;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "admit",
    about = "Admit: single-use entry pass lifecycle",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML config file (same format as the server's)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Write-ahead log holding the pass records
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Import codes from a file, one per line
    Import(ImportArgs),
    /// Activate a pass (guest side)
    Activate(CodeArgs),
    /// Show the current status of a pass
    Verify(CodeArgs),
    /// Confirm entry for an active pass (door side)
    Confirm(CodeArgs),
    /// Print random alphanumeric codes
    Generate(GenerateArgs),
    /// Show record counts
    Stats(StatsArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args)]
pub struct ImportArgs {
    pub file: PathBuf,
    /// Header rule for the first line: numeric, alphanumeric or none
    #[arg(long)]
    pub header: Option<HeaderRule>,
}

#[derive(Args)]
pub struct CodeArgs {
    pub code: String,
}

#[derive(Args)]
pub struct GenerateArgs {
    #[arg(short = 'n', long, default_value = "10")]
    pub count: usize,
    #[arg(long, default_value = "12")]
    pub length: usize,
}

#[derive(Args)]
pub struct StatsArgs {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serve() {
        let cli = Cli::try_parse_from(["admit", "serve", "--bind", "0.0.0.0:8080"]).unwrap();
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.bind, Some("0.0.0.0:8080".parse().unwrap()));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_serve_rejects_bad_addr() {
        assert!(Cli::try_parse_from(["admit", "serve", "--bind", "nowhere"]).is_err());
    }

    #[test]
    fn parse_import_with_header_rule() {
        let cli = Cli::try_parse_from(["admit", "import", "codes.csv", "--header", "alphanumeric"]).unwrap();
        if let Command::Import(args) = cli.command {
            assert_eq!(args.file, PathBuf::from("codes.csv"));
            assert_eq!(args.header, Some(HeaderRule::Alphanumeric));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_import_rejects_unknown_rule() {
        assert!(Cli::try_parse_from(["admit", "import", "codes.csv", "--header", "csv"]).is_err());
    }

    #[test]
    fn parse_activate() {
        let cli = Cli::try_parse_from(["admit", "activate", "abc123"]).unwrap();
        if let Command::Activate(args) = cli.command {
            assert_eq!(args.code, "abc123");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_confirm_with_data() {
        let cli = Cli::try_parse_from(["admit", "confirm", "abc123", "--data", "/tmp/a.wal"]).unwrap();
        assert_eq!(cli.data, Some(PathBuf::from("/tmp/a.wal")));
        assert!(matches!(cli.command, Command::Confirm(_)));
    }

    #[test]
    fn parse_generate_defaults() {
        let cli = Cli::try_parse_from(["admit", "generate"]).unwrap();
        if let Command::Generate(args) = cli.command {
            assert_eq!(args.count, 10);
            assert_eq!(args.length, 12);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["admit", "--verbose", "stats"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["admit", "--format", "json", "verify", "x"]).unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
    }
}
