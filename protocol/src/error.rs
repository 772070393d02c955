//! Error vocabulary for the sequencer core.
//!
//! One enum covers the whole pipeline: admission, block building, proof
//! generation/verification, and ledger submission. The HTTP adapter maps
//! these onto status codes (admission failures become 400, lookup misses
//! 404, everything else 500); nothing in this crate knows about HTTP.

use thiserror::Error;

/// Everything that can go wrong between "client submits a transaction"
/// and "proof blob lands on the external ledger".
#[derive(Debug, Error)]
pub enum ChainError {
    /// A request field failed to parse (bad hex, non-decimal number,
    /// wrong address width).
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// The transaction carries no signature (zero `r` or `s`).
    #[error("missing signature")]
    MissingSignature,

    /// The signature does not verify against the sender's bound key.
    #[error("invalid signature")]
    InvalidSignature,

    /// No public key is bound in state for the sender address.
    #[error("public key not found for sender {0}")]
    UnknownSender(String),

    /// The receiver address has no account in state. Crediting it would
    /// silently drop funds inside the circuit, so admission refuses it.
    #[error("receiver account {0} does not exist")]
    UnknownReceiver(String),

    /// The sender's balance does not cover the transfer value.
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: u64, available: u64 },

    /// The transaction nonce does not match the sender's state nonce.
    #[error("invalid nonce: expected {expected}, got {got}")]
    NonceMismatch { expected: u64, got: u64 },

    /// The mempool was empty when a block build was requested.
    #[error("no transactions to create block")]
    NoTransactions,

    /// No block exists at the requested height.
    #[error("block not found at height {0}")]
    BlockNotFound(u64),

    /// The transaction hash is in neither the pool nor any block.
    #[error("transaction not found: {0}")]
    TxNotFound(String),

    /// The Groth16 pipeline failed: circuit compilation, trusted setup,
    /// witness assembly, or proving. The block build aborts and the
    /// mempool snapshot survives for the next attempt.
    #[error("proof generation failed: {0}")]
    ProofGeneration(String),

    /// The proof blob did not verify (or did not even decode).
    #[error("invalid proof: {0}")]
    InvalidProof(String),

    /// The external ledger gateway rejected or never received the blob.
    /// Logged and swallowed by the block builder — the block stays.
    #[error("ledger submission failed: {0}")]
    LedgerSubmission(String),

    /// A bug-shaped failure: arithmetic overflow, poisoned invariant.
    #[error("internal error: {0}")]
    Internal(String),
}
