//! # CLI Interface
//!
//! Argument structure for the `zkrollup-node` binary, via `clap`
//! derive. Four subcommands: `run` (the sequencer), `genkey` and `sign`
//! (the offline client-side key tooling), and `version`.
//!
//! Every `run` flag has an environment-variable twin so containerized
//! deployments do not need a wall of arguments.

use clap::{Parser, Subcommand};

/// ZK-rollup sequencer node.
///
/// Accepts signed transfers over HTTP, batches them into blocks, and
/// emits a Groth16 validity proof per block.
#[derive(Parser, Debug)]
#[command(name = "zkrollup-node", about = "ZK-rollup sequencer node", version)]
pub struct NodeCli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the sequencer: HTTP API plus the auto-block scheduler.
    Run(RunArgs),
    /// Generate a P-256 key pair and print it as hex.
    Genkey,
    /// Sign a canonical transfer payload with a private key.
    Sign(SignArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Bind address for the HTTP API.
    #[arg(long, env = "ZKROLLUP_LISTEN_ADDR", default_value = zkrollup_protocol::config::DEFAULT_LISTEN_ADDR)]
    pub listen_addr: String,

    /// Base URL of the external ledger gateway that stores proof blobs.
    /// Proof submission is disabled when unset.
    #[arg(long, env = "ZKROLLUP_LEDGER_URL")]
    pub ledger_url: Option<String>,

    /// Bearer token for the ledger gateway.
    #[arg(long, env = "ZKROLLUP_LEDGER_TOKEN")]
    pub ledger_token: Option<String>,

    /// Disable the auto-block scheduler; blocks are then built only via
    /// POST /api/v1/block/create.
    #[arg(long)]
    pub no_auto_block: bool,

    /// Default log filter when RUST_LOG is unset.
    #[arg(long, env = "ZKROLLUP_LOG_LEVEL", default_value = "zkrollup_node=info,zkrollup_protocol=info")]
    pub log_level: String,

    /// Log output format: pretty or json.
    #[arg(long, env = "ZKROLLUP_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

/// Arguments for the `sign` subcommand: the canonical transfer payload
/// plus the signing key.
#[derive(Parser, Debug, Clone)]
pub struct SignArgs {
    /// Sender address (hex).
    #[arg(long)]
    pub from: String,

    /// Receiver address (hex).
    #[arg(long)]
    pub to: String,

    /// Transfer value.
    #[arg(long)]
    pub value: u64,

    /// Transaction nonce.
    #[arg(long)]
    pub nonce: u64,

    /// Hex-encoded P-256 private scalar. Never pass production keys on
    /// a shared machine's command line.
    #[arg(long)]
    pub privkey: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_structure_is_valid() {
        NodeCli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let cli = NodeCli::parse_from(["zkrollup-node", "run"]);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.listen_addr, "0.0.0.0:8080");
                assert!(args.ledger_url.is_none());
                assert!(!args.no_auto_block);
                assert_eq!(args.log_format, "pretty");
            }
            _ => panic!("expected run subcommand"),
        }
    }

    #[test]
    fn run_with_ledger() {
        let cli = NodeCli::parse_from([
            "zkrollup-node",
            "run",
            "--ledger-url",
            "http://gateway:7051",
            "--ledger-token",
            "secret",
            "--no-auto-block",
        ]);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.ledger_url.as_deref(), Some("http://gateway:7051"));
                assert_eq!(args.ledger_token.as_deref(), Some("secret"));
                assert!(args.no_auto_block);
            }
            _ => panic!("expected run subcommand"),
        }
    }

    #[test]
    fn genkey_parses() {
        let cli = NodeCli::parse_from(["zkrollup-node", "genkey"]);
        assert!(matches!(cli.command, Commands::Genkey));
    }

    #[test]
    fn sign_requires_every_field() {
        let cli = NodeCli::parse_from([
            "zkrollup-node",
            "sign",
            "--from",
            "0000000000000000000000000000000000000001",
            "--to",
            "0000000000000000000000000000000000000002",
            "--value",
            "100",
            "--nonce",
            "0",
            "--privkey",
            "ab",
        ]);
        match cli.command {
            Commands::Sign(args) => {
                assert_eq!(args.value, 100);
                assert_eq!(args.nonce, 0);
            }
            _ => panic!("expected sign subcommand"),
        }

        // Missing --privkey must fail to parse.
        let result = NodeCli::try_parse_from([
            "zkrollup-node",
            "sign",
            "--from",
            "01",
            "--to",
            "02",
            "--value",
            "1",
            "--nonce",
            "0",
        ]);
        assert!(result.is_err());
    }
}
