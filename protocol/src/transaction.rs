//! # Transactions
//!
//! The signed value transfer — the only operation this rollup executes.
//!
//! The transaction digest is `SHA-256(from ‖ to ‖ decimal(value) ‖
//! decimal(nonce))`. That digest is simultaneously the mempool key, the
//! Merkle leaf preimage, and the ECDSA signing payload, which is why
//! `timestamp`, `status`, and the signature itself stay out of it: a
//! client can sign before the sequencer ever sees the transaction, and
//! confirmation cannot silently re-key the pool.

use p256::ecdsa::VerifyingKey;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::hash::sha256;
use crate::crypto::keys::{self, Keypair};
use crate::error::ChainError;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle state of a transaction. `Pending` in the mempool,
/// `Confirmed` once its block is appended, `Failed` if execution
/// rejected it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// An ECDSA signature as raw `(r, s)` scalars, big-endian.
///
/// A default (all-zero) signature is the "unsigned" sentinel; admission
/// rejects it before any curve arithmetic happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TxSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl TxSignature {
    /// Whether both scalars are nonzero. A zero `r` or `s` is never a
    /// valid ECDSA signature.
    pub fn is_present(&self) -> bool {
        self.r != [0u8; 32] && self.s != [0u8; 32]
    }

    /// Hex encodings of `(r, s)` for the wire.
    pub fn to_hex(&self) -> (String, String) {
        (hex::encode(self.r), hex::encode(self.s))
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A value transfer between two rollup accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// SHA-256 digest of the canonical payload; pool key and signing
    /// payload.
    pub hash: [u8; 32],
    /// Sender address (hex).
    pub from: String,
    /// Receiver address (hex).
    pub to: String,
    /// Transfer amount.
    pub value: u64,
    /// Sender sequence number; must equal the sender's state nonce at
    /// admission.
    pub nonce: u64,
    /// Unix timestamp (seconds) of submission. Not part of the hash.
    pub timestamp: i64,
    /// Lifecycle state. Not part of the hash.
    pub status: TxStatus,
    /// ECDSA signature over `hash`. Not part of the hash.
    pub signature: TxSignature,
}

impl Transaction {
    /// Build a transaction, computing its digest from the canonical
    /// payload.
    pub fn new(
        from: String,
        to: String,
        value: u64,
        nonce: u64,
        timestamp: i64,
        signature: TxSignature,
    ) -> Self {
        let hash = signing_payload(&from, &to, value, nonce);
        Self {
            hash,
            from,
            to,
            value,
            nonce,
            timestamp,
            status: TxStatus::Pending,
            signature,
        }
    }

    /// Recompute the digest from the current field values.
    pub fn compute_hash(&self) -> [u8; 32] {
        signing_payload(&self.from, &self.to, self.value, self.nonce)
    }

    /// Sign the transaction digest with the given keypair, storing the
    /// `(r, s)` scalars.
    pub fn sign(&mut self, keypair: &Keypair) -> Result<(), ChainError> {
        let (r, s) = keypair.sign_digest(&self.hash)?;
        self.signature = TxSignature { r, s };
        Ok(())
    }

    /// Verify the stored signature over the transaction digest.
    pub fn verify_signature(&self, key: &VerifyingKey) -> bool {
        if !self.signature.is_present() {
            return false;
        }
        keys::verify_digest(key, &self.hash, &self.signature.r, &self.signature.s)
    }

    /// The digest as lowercase hex — the external transaction ID.
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transaction{{hash: {}, from: {}, to: {}, value: {}, nonce: {}, status: {}}}",
            self.hash_hex(),
            self.from,
            self.to,
            self.value,
            self.nonce,
            self.status,
        )
    }
}

/// The canonical signing payload: `SHA-256(from ‖ to ‖ decimal(value) ‖
/// decimal(nonce))`. Shared by the sequencer and the offline signing
/// CLI so both sides always hash the same bytes.
pub fn signing_payload(from: &str, to: &str, value: u64, nonce: u64) -> [u8; 32] {
    sha256(format!("{from}{to}{value}{nonce}").as_bytes())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_tx() -> Transaction {
        Transaction::new(
            "0000000000000000000000000000000000000001".into(),
            "0000000000000000000000000000000000000002".into(),
            100,
            0,
            1_700_000_000,
            TxSignature::default(),
        )
    }

    // -- P1: hash determinism and field sensitivity --------------------------

    #[test]
    fn hash_is_deterministic() {
        let tx = make_tx();
        assert_eq!(tx.hash, tx.compute_hash());
        assert_eq!(tx.compute_hash(), tx.compute_hash());
    }

    #[test]
    fn hash_depends_on_every_signed_field() {
        let base = make_tx();

        let mut other = base.clone();
        other.from = "0000000000000000000000000000000000000003".into();
        assert_ne!(base.hash, other.compute_hash());

        let mut other = base.clone();
        other.to = "0000000000000000000000000000000000000003".into();
        assert_ne!(base.hash, other.compute_hash());

        let mut other = base.clone();
        other.value = 101;
        assert_ne!(base.hash, other.compute_hash());

        let mut other = base.clone();
        other.nonce = 1;
        assert_ne!(base.hash, other.compute_hash());
    }

    #[test]
    fn hash_ignores_timestamp_status_signature() {
        let base = make_tx();

        let mut other = base.clone();
        other.timestamp = 0;
        other.status = TxStatus::Confirmed;
        other.signature = TxSignature { r: [1u8; 32], s: [2u8; 32] };
        assert_eq!(base.hash, other.compute_hash());
    }

    // -- P2: signature round-trip --------------------------------------------

    #[test]
    fn sign_and_verify() {
        let kp = Keypair::generate();
        let mut tx = make_tx();

        tx.sign(&kp).unwrap();
        assert!(tx.verify_signature(&kp.verifying_key()));
    }

    #[test]
    fn verify_rejects_other_key() {
        let kp = Keypair::generate();
        let stranger = Keypair::generate();
        let mut tx = make_tx();

        tx.sign(&kp).unwrap();
        assert!(!tx.verify_signature(&stranger.verifying_key()));
    }

    #[test]
    fn verify_rejects_mutated_fields() {
        let kp = Keypair::generate();
        let mut tx = make_tx();
        tx.sign(&kp).unwrap();

        // Change a signed field and recompute the digest: the old
        // signature must not carry over.
        tx.value = 10_000;
        tx.hash = tx.compute_hash();
        assert!(!tx.verify_signature(&kp.verifying_key()));
    }

    #[test]
    fn zero_signature_never_verifies() {
        let kp = Keypair::generate();
        let tx = make_tx();
        assert!(!tx.signature.is_present());
        assert!(!tx.verify_signature(&kp.verifying_key()));
    }

    #[test]
    fn signing_payload_matches_digest() {
        let tx = make_tx();
        assert_eq!(tx.hash, signing_payload(&tx.from, &tx.to, tx.value, tx.nonce));
    }

    #[test]
    fn status_display() {
        assert_eq!(TxStatus::Pending.to_string(), "pending");
        assert_eq!(TxStatus::Confirmed.to_string(), "confirmed");
        assert_eq!(TxStatus::Failed.to_string(), "failed");
    }
}
