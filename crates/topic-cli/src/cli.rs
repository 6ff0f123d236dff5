use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "topic",
    about = "Topic Ledger: deadline-gated wagering topics",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate a scenario file without running it
    Check(CheckArgs),
    /// Run a scenario's deposits against a simulated chain
    Simulate(SimulateArgs),
    /// Verify a snapshot's receipt journal
    Verify(VerifyArgs),
    /// Show a participant's balances from a snapshot
    Balance(BalanceArgs),
    /// Show outcome standings from a snapshot
    Summary(SummaryArgs),
}

#[derive(Args)]
pub struct CheckArgs {
    pub scenario: PathBuf,
}

#[derive(Args)]
pub struct SimulateArgs {
    pub scenario: PathBuf,
    /// Write the resulting topic snapshot (JSON) to this path
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
}

#[derive(Args)]
pub struct VerifyArgs {
    pub snapshot: PathBuf,
}

#[derive(Args)]
pub struct BalanceArgs {
    pub snapshot: PathBuf,
    /// Participant alias, or a `pt:` prefixed identity
    #[arg(short, long)]
    pub participant: String,
    #[arg(short, long)]
    pub outcome: Option<usize>,
}

#[derive(Args)]
pub struct SummaryArgs {
    pub snapshot: PathBuf,
    /// Height to evaluate the deposit window at; defaults to the last receipt's
    #[arg(long)]
    pub height: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_check() {
        let cli = Cli::try_parse_from(["topic", "check", "s.toml"]).unwrap();
        if let Command::Check(args) = cli.command {
            assert_eq!(args.scenario, PathBuf::from("s.toml"));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_simulate_with_snapshot() {
        let cli = Cli::try_parse_from(["topic", "simulate", "s.toml", "--snapshot", "out.json"]).unwrap();
        if let Command::Simulate(args) = cli.command {
            assert_eq!(args.snapshot, Some(PathBuf::from("out.json")));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_verify() {
        let cli = Cli::try_parse_from(["topic", "verify", "out.json"]).unwrap();
        assert!(matches!(cli.command, Command::Verify(_)));
    }

    #[test]
    fn parse_balance() {
        let cli = Cli::try_parse_from(["topic", "balance", "out.json", "-p", "bob", "--outcome", "2"]).unwrap();
        if let Command::Balance(args) = cli.command {
            assert_eq!(args.participant, "bob");
            assert_eq!(args.outcome, Some(2));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn balance_requires_participant() {
        assert!(Cli::try_parse_from(["topic", "balance", "out.json"]).is_err());
    }

    #[test]
    fn parse_summary_height() {
        let cli = Cli::try_parse_from(["topic", "summary", "out.json", "--height", "999"]).unwrap();
        if let Command::Summary(args) = cli.command {
            assert_eq!(args.height, Some(999));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["topic", "--verbose", "verify", "x.json"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["topic", "--format", "json", "summary", "x.json"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
    }
}
