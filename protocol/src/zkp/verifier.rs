//! # Proof Verification
//!
//! The consuming side of [`super::prover`]: decode a proof blob, rebuild
//! the public witness from its three decimal roots, and run Groth16
//! verification. This is the same check the external ledger's contract
//! performs — having it here keeps the blob format honest end to end
//! and backs the chain's state-root verification.
//!
//! Verification is pairings-only and runs in milliseconds regardless of
//! how large the batch was.

use ark_bn254::Bn254;
use ark_groth16::{Groth16, Proof, VerifyingKey};
use ark_serialize::CanonicalDeserialize;
use ark_snark::SNARK;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::debug;

use crate::crypto::mimc;
use crate::error::ChainError;
use crate::zkp::circuit;
use crate::zkp::prover::ProofBlob;

/// Verify a serialized proof blob.
///
/// Every failure — JSON, base64, curve deserialization, root parsing,
/// or the pairing check itself — surfaces as
/// [`ChainError::InvalidProof`]; callers only care that the blob does
/// not attest to its claimed transition.
pub fn verify_proof(blob_json: &str) -> Result<(), ChainError> {
    let blob = ProofBlob::from_json(blob_json)?;
    verify_blob(&blob)
}

/// Verify an already-decoded blob.
pub fn verify_blob(blob: &ProofBlob) -> Result<(), ChainError> {
    let proof_bytes = BASE64
        .decode(&blob.proof)
        .map_err(|e| ChainError::InvalidProof(format!("proof is not valid base64: {e}")))?;
    let vk_bytes = BASE64
        .decode(&blob.vk)
        .map_err(|e| ChainError::InvalidProof(format!("vk is not valid base64: {e}")))?;

    let proof = Proof::<Bn254>::deserialize_compressed(proof_bytes.as_slice())
        .map_err(|e| ChainError::InvalidProof(format!("undecodable proof: {e}")))?;
    let vk = VerifyingKey::<Bn254>::deserialize_compressed(vk_bytes.as_slice())
        .map_err(|e| ChainError::InvalidProof(format!("undecodable vk: {e}")))?;

    let old_root = mimc::decimal_to_field(&blob.old_state_root)
        .map_err(|_| ChainError::InvalidProof("old_state_root is not a field element".into()))?;
    let batch_root = mimc::decimal_to_field(&blob.batch_root)
        .map_err(|_| ChainError::InvalidProof("batch_root is not a field element".into()))?;
    let new_root = mimc::decimal_to_field(&blob.new_state_root)
        .map_err(|_| ChainError::InvalidProof("new_state_root is not a field element".into()))?;

    let public_inputs = circuit::public_inputs(old_root, batch_root, new_root);

    let valid = Groth16::<Bn254>::verify(&vk, &public_inputs, &proof)
        .map_err(|e| ChainError::InvalidProof(format!("verification algorithm failed: {e}")))?;

    if !valid {
        return Err(ChainError::InvalidProof(
            "proof does not attest to the claimed roots".into(),
        ));
    }

    debug!(new_state_root = %blob.new_state_root, "proof blob verified");
    Ok(())
}
