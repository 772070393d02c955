//! # Zero-Knowledge Proof Subsystem
//!
//! Groth16 over BN254, proving one statement: *the batch of transfers in
//! this block, applied in order to the committed account balances,
//! produces exactly the new state root*.
//!
//! ```text
//! batch.rs    — off-circuit MiMC Merkle tree over serialized transfers
//!               (batch root + membership paths)
//! circuit.rs  — the R1CS state-transition circuit (BatchCircuit)
//! prover.rs   — witness assembly, key cache, Groth16 proving
//! verifier.rs — proof-blob decoding and Groth16 verification
//! ```
//!
//! ## Public inputs (in allocation order)
//!
//! | index | value |
//! |-------|-------|
//! | 0     | old state root |
//! | 1     | batch root |
//! | 2     | final state root |
//!
//! ## Circuit shape
//!
//! The constraint topology is a function of `(account_size,
//! batch_size)` — both the per-account rows and the membership-path
//! depth are baked in at compile time. The prover caches `(pk, vk)`
//! pairs per shape instead of re-running the setup for every block of
//! the same size.

pub mod batch;
pub mod circuit;
pub mod prover;
pub mod verifier;

use ark_bn254::Fr;
use ark_ff::PrimeField;

use crate::error::ChainError;

pub use circuit::BatchCircuit;
pub use prover::{BatchTransfer, ProofBlob, ProofInput, ProofOutput, Prover};
pub use verifier::verify_proof;

/// Map a hex address to its circuit representative: the big-endian
/// integer value of the address bytes, reduced into the scalar field.
/// Injective for canonical 20-byte addresses (they are far below the
/// modulus), and deterministic — the same address always lands on the
/// same field element on both sides of the proof.
pub fn address_to_field(address: &str) -> Result<Fr, ChainError> {
    let bytes = hex::decode(address)
        .map_err(|e| ChainError::MalformedRequest(format!("invalid address hex {address:?}: {e}")))?;
    if bytes.is_empty() || bytes.len() > 32 {
        return Err(ChainError::MalformedRequest(format!(
            "address {address:?} must be 1..=32 bytes of hex"
        )));
    }
    Ok(Fr::from_be_bytes_mod_order(&bytes))
}
