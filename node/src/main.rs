// Copyright (c) 2026 zkrollup contributors. MIT License.
// See LICENSE for details.

//! # Sequencer Node
//!
//! Entry point for the `zkrollup-node` binary. Four subcommands:
//!
//! - `run`     — start the sequencer (HTTP API + auto-block scheduler)
//! - `genkey`  — print a fresh P-256 key pair as hex
//! - `sign`    — sign a canonical transfer payload offline
//! - `version` — print build version information

mod api;
mod cli;
mod logging;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;

use zkrollup_protocol::chain::Blockchain;
use zkrollup_protocol::crypto::keys::Keypair;
use zkrollup_protocol::ledger::LedgerClient;
use zkrollup_protocol::transaction::signing_payload;

use cli::{Commands, NodeCli, RunArgs, SignArgs};
use logging::LogFormat;

fn main() -> Result<()> {
    let cli = NodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args),
        Commands::Genkey => {
            genkey();
            Ok(())
        }
        Commands::Sign(args) => sign(args),
        Commands::Version => {
            println!("zkrollup-node {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Start the sequencer: build the chain, wire the optional ledger
/// client, start the scheduler, and serve the API until SIGINT/SIGTERM.
fn run_node(args: RunArgs) -> Result<()> {
    logging::init_logging(&args.log_level, LogFormat::from_str_lossy(&args.log_format));

    let ledger = match &args.ledger_url {
        Some(url) => {
            tracing::info!(gateway = %url, "proof submission enabled");
            Some(Arc::new(
                LedgerClient::new(url, args.ledger_token.clone())
                    .context("failed to construct ledger client")?,
            ))
        }
        None => {
            tracing::info!("no ledger gateway configured, proofs stay local");
            None
        }
    };

    let chain = Arc::new(Blockchain::with_ledger(ledger));

    if args.no_auto_block {
        tracing::info!("auto-block scheduler disabled");
    } else {
        chain.start_auto_block();
    }

    // The protocol core is thread-based; only the HTTP surface runs on
    // tokio.
    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(serve(args.listen_addr, Arc::clone(&chain)))?;

    chain.stop_auto_block();
    tracing::info!("sequencer stopped");
    Ok(())
}

async fn serve(listen_addr: String, chain: Arc<Blockchain>) -> Result<()> {
    let router = api::create_router(api::AppState { chain });

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;
    tracing::info!("API listening on {listen_addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")?;
    Ok(())
}

/// Generate and print a fresh P-256 key pair.
fn genkey() {
    let keypair = Keypair::generate();
    let (x, y) = keypair.public_xy_hex();
    println!("Private key: {}", keypair.secret_hex());
    println!("Public key X: {x}");
    println!("Public key Y: {y}");
}

/// Sign the canonical transfer payload and print everything a
/// `transaction/send` request needs.
fn sign(args: SignArgs) -> Result<()> {
    let keypair = Keypair::from_secret_hex(&args.privkey)
        .context("invalid private key")?;

    let digest = signing_payload(&args.from, &args.to, args.value, args.nonce);
    let (r, s) = keypair
        .sign_digest(&digest)
        .context("signing failed")?;
    let (x, y) = keypair.public_xy_hex();

    println!("Transaction hash: {}", hex::encode(digest));
    println!("Signature R: {}", hex::encode(r));
    println!("Signature S: {}", hex::encode(s));
    println!("Public key X: {x}");
    println!("Public key Y: {y}");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM, whichever lands first.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
