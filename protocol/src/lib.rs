// Copyright (c) 2026 zkrollup contributors. MIT License.
// See LICENSE for details.

//! # ZK-Rollup Sequencer Core
//!
//! The library behind the rollup sequencer: a single-writer process that
//! orders signed value transfers, batches them into blocks, applies them
//! against an authenticated account state, and emits a Groth16 proof that
//! every batch's state transition is valid with respect to the previous
//! committed state root.
//!
//! ## Architecture
//!
//! The crate is split into modules that mirror the actual concerns of a
//! rollup sequencer:
//!
//! - **crypto** — Hashing and signatures. Two hash domains, strictly
//!   separated: SHA-256 for transport (tx digests, header hashes, the tx
//!   Merkle tree) and MiMC over BN254 for everything the circuit sees.
//! - **transaction** — The signed value-transfer type and its lifecycle.
//! - **state** — The account map (balance, nonce, public key) and its
//!   MiMC commitment.
//! - **mempool** — A serialized FIFO of admitted transactions.
//! - **chain** — The append-only block log, admission protocol, block
//!   builder, and the auto-block scheduler.
//! - **zkp** — The state-transition circuit and the Groth16 prover /
//!   verifier harness around it.
//! - **ledger** — A thin client that submits proof blobs to an external
//!   ledger gateway.
//! - **config** — Protocol constants and network parameters.
//!
//! ## The one contract that matters
//!
//! The off-circuit state update must land on exactly the root the circuit
//! computes. Both sides therefore share a single MiMC implementation
//! ([`crypto::mimc`]) — the native path and the R1CS gadget are generated
//! from the same round-constant table and are cross-tested against each
//! other on random vectors.

pub mod chain;
pub mod config;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod mempool;
pub mod state;
pub mod transaction;
pub mod zkp;

pub use chain::Blockchain;
pub use error::ChainError;
