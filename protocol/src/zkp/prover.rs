//! # Proof Generation
//!
//! Wraps `ark-groth16` into the sequencer's one operation: prove a
//! batch. The workflow per block:
//!
//! 1. Serialize every transfer as a JSON line and build the MiMC batch
//!    tree; sample one leaf index uniformly and extract its membership
//!    path. The randomization only varies the witness — soundness does
//!    not depend on *which* leaf is proven, merely that one is.
//! 2. Fetch (or create and cache) the Groth16 keys for this circuit
//!    shape. Keys are cached by `(account_size, batch_size)` because
//!    the topology depends on nothing else; re-running the setup per
//!    block would dwarf the proving time itself.
//! 3. Apply the transition off-circuit — with the circuit's exact
//!    semantics, including the credit drop for an absent receiver — to
//!    obtain the expected final root.
//! 4. Assemble the witness and call `Groth16::prove`.
//!
//! The output carries the three public roots in decimal plus the
//! compressed proof and verifying key; [`ProofBlob`] is its
//! JSON-with-base64 wire form, which is exactly what gets shipped to
//! the external ledger.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, ProvingKey, VerifyingKey};
use ark_serialize::CanonicalSerialize;
use ark_snark::SNARK;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::crypto::mimc;
use crate::error::ChainError;
use crate::state::Account;
use crate::zkp::batch::BatchTree;
use crate::zkp::circuit::{BatchCircuit, TransferWitness};
use crate::zkp::address_to_field;

// ---------------------------------------------------------------------------
// Input / output types
// ---------------------------------------------------------------------------

/// One transfer as the circuit sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchTransfer {
    pub from: String,
    pub to: String,
    pub amount: u64,
    pub nonce: u64,
}

/// Everything the prover needs for one block: the committed prior root,
/// the full account set in canonical order, and the batch.
#[derive(Debug, Clone)]
pub struct ProofInput {
    pub old_state_root: String,
    pub accounts: Vec<Account>,
    pub transactions: Vec<BatchTransfer>,
}

/// The prover's result: the three public roots (decimal) plus the
/// compressed proof and verifying key bytes.
#[derive(Debug, Clone)]
pub struct ProofOutput {
    pub old_state_root: String,
    pub batch_root: String,
    pub new_state_root: String,
    pub proof: Vec<u8>,
    pub vk: Vec<u8>,
}

impl ProofOutput {
    /// The wire form: opaque byte fields as base64.
    pub fn to_blob(&self) -> ProofBlob {
        ProofBlob {
            old_state_root: self.old_state_root.clone(),
            batch_root: self.batch_root.clone(),
            new_state_root: self.new_state_root.clone(),
            proof: BASE64.encode(&self.proof),
            vk: BASE64.encode(&self.vk),
        }
    }
}

/// The serialized proof artifact submitted to the external ledger and
/// accepted by [`crate::zkp::verifier::verify_proof`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofBlob {
    pub old_state_root: String,
    pub batch_root: String,
    pub new_state_root: String,
    /// Base64 of the compressed Groth16 proof.
    pub proof: String,
    /// Base64 of the compressed verifying key.
    pub vk: String,
}

impl ProofBlob {
    pub fn to_json(&self) -> Result<String, ChainError> {
        serde_json::to_string(self)
            .map_err(|e| ChainError::Internal(format!("proof blob serialization: {e}")))
    }

    pub fn from_json(json: &str) -> Result<Self, ChainError> {
        serde_json::from_str(json)
            .map_err(|e| ChainError::InvalidProof(format!("undecodable proof blob: {e}")))
    }
}

/// The line format hashed into batch-tree leaves. Amount and nonce are
/// decimal strings so the encoding is width-independent.
#[derive(Serialize)]
struct SerializedTransfer<'a> {
    from: &'a str,
    to: &'a str,
    amount: String,
    nonce: String,
}

// ---------------------------------------------------------------------------
// Prover
// ---------------------------------------------------------------------------

/// Cached Groth16 keys for one circuit shape.
struct CircuitKeys {
    pk: ProvingKey<Bn254>,
    vk: VerifyingKey<Bn254>,
}

/// The proving harness. Owns the per-shape key cache; one instance
/// lives for the lifetime of the blockchain.
#[derive(Default)]
pub struct Prover {
    keys: Mutex<HashMap<(usize, usize), Arc<CircuitKeys>>>,
}

impl Prover {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of circuit shapes with cached keys (used by tests).
    pub fn cached_shapes(&self) -> usize {
        self.keys.lock().len()
    }

    /// Generate the batch proof. See the module docs for the pipeline.
    pub fn generate_proof(&self, input: &ProofInput) -> Result<ProofOutput, ChainError> {
        let account_size = input.accounts.len();
        let batch_size = input.transactions.len();
        if batch_size == 0 {
            return Err(ChainError::ProofGeneration("empty batch".into()));
        }
        if account_size == 0 {
            return Err(ChainError::ProofGeneration("empty account set".into()));
        }

        // The circuit asserts the old root against the account set; a
        // mismatched input would only surface as an unsatisfiable
        // witness deep inside proving, so check it up front.
        let balances: Vec<u64> = input.accounts.iter().map(|a| a.balance).collect();
        let old_root = mimc::state_root(&balances);
        if mimc::field_to_decimal(&old_root) != input.old_state_root {
            return Err(ChainError::ProofGeneration(format!(
                "old state root mismatch: committed {}, account set folds to {}",
                input.old_state_root,
                mimc::field_to_decimal(&old_root),
            )));
        }

        // Batch tree over the serialized transfer lines, with a random
        // member leaf for the witness.
        let lines = serialize_batch(&input.transactions)?;
        let tree = BatchTree::from_lines(&lines);
        let leaf_index = rand::thread_rng().gen_range(0..batch_size);
        let path = tree
            .path(leaf_index)
            .ok_or_else(|| ChainError::Internal("membership path out of range".into()))?;
        let batch_root = tree.root();

        // Off-circuit transition with circuit semantics.
        let new_balances = apply_batch(&input.accounts, &input.transactions)?;
        let new_root = mimc::state_root(&new_balances);

        // Keys for this shape, cached.
        let keys = self.keys_for_shape(account_size, batch_size)?;

        // Witness assembly.
        let circuit = BatchCircuit {
            old_state_root: Some(old_root),
            batch_root: Some(batch_root),
            new_state_root: Some(new_root),
            addresses: input
                .accounts
                .iter()
                .map(|a| address_to_field(&a.address).map(Some))
                .collect::<Result<_, _>>()?,
            balances: input.accounts.iter().map(|a| Some(Fr::from(a.balance))).collect(),
            nonces: input.accounts.iter().map(|a| Some(Fr::from(a.nonce))).collect(),
            transfers: input
                .transactions
                .iter()
                .map(|t| {
                    Ok(TransferWitness {
                        from: Some(address_to_field(&t.from)?),
                        to: Some(address_to_field(&t.to)?),
                        amount: Some(Fr::from(t.amount)),
                        nonce: Some(Fr::from(t.nonce)),
                    })
                })
                .collect::<Result<_, ChainError>>()?,
            leaf: Some(path.leaf),
            siblings: path.siblings.iter().map(|s| Some(*s)).collect(),
            is_left: path.is_left.iter().map(|b| Some(*b)).collect(),
        };

        let started = Instant::now();
        let mut rng = ark_std::rand::thread_rng();
        let proof = Groth16::<Bn254>::prove(&keys.pk, circuit, &mut rng)
            .map_err(|e| ChainError::ProofGeneration(format!("Groth16 prove: {e}")))?;
        info!(
            accounts = account_size,
            batch = batch_size,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch proof generated"
        );

        let mut proof_bytes = Vec::new();
        proof
            .serialize_compressed(&mut proof_bytes)
            .map_err(|e| ChainError::ProofGeneration(format!("proof serialization: {e}")))?;
        let mut vk_bytes = Vec::new();
        keys.vk
            .serialize_compressed(&mut vk_bytes)
            .map_err(|e| ChainError::ProofGeneration(format!("vk serialization: {e}")))?;

        Ok(ProofOutput {
            old_state_root: input.old_state_root.clone(),
            batch_root: mimc::field_to_decimal(&batch_root),
            new_state_root: mimc::field_to_decimal(&new_root),
            proof: proof_bytes,
            vk: vk_bytes,
        })
    }

    /// Fetch the Groth16 keys for a circuit shape, running the trusted
    /// setup on a blank circuit the first time the shape is seen.
    fn keys_for_shape(
        &self,
        account_size: usize,
        batch_size: usize,
    ) -> Result<Arc<CircuitKeys>, ChainError> {
        // Fast path under the lock.
        if let Some(keys) = self.keys.lock().get(&(account_size, batch_size)) {
            return Ok(Arc::clone(keys));
        }

        // Setup outside the lock — it can take seconds and another
        // shape's proof should not wait on it.
        let started = Instant::now();
        let blank = BatchCircuit::blank(account_size, batch_size);
        let mut rng = ark_std::rand::thread_rng();
        let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(blank, &mut rng)
            .map_err(|e| ChainError::ProofGeneration(format!("Groth16 setup: {e}")))?;
        debug!(
            accounts = account_size,
            batch = batch_size,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "circuit keys generated"
        );

        let keys = Arc::new(CircuitKeys { pk, vk });
        // Two racing setups for the same shape are both valid; keep the
        // first one that landed.
        let mut cache = self.keys.lock();
        let entry = cache
            .entry((account_size, batch_size))
            .or_insert_with(|| Arc::clone(&keys));
        Ok(Arc::clone(entry))
    }
}

// ---------------------------------------------------------------------------
// Batch serialization & off-circuit application
// ---------------------------------------------------------------------------

/// Serialize each transfer as one newline-terminated JSON line — the
/// preimage of its batch-tree leaf.
fn serialize_batch(transactions: &[BatchTransfer]) -> Result<Vec<Vec<u8>>, ChainError> {
    transactions
        .iter()
        .map(|t| {
            let line = SerializedTransfer {
                from: &t.from,
                to: &t.to,
                amount: t.amount.to_string(),
                nonce: t.nonce.to_string(),
            };
            let mut bytes = serde_json::to_vec(&line)
                .map_err(|e| ChainError::Internal(format!("transfer serialization: {e}")))?;
            bytes.push(b'\n');
            Ok(bytes)
        })
        .collect()
}

/// Apply the batch to a balance snapshot with the circuit's exact
/// semantics: sequential, one sender row debited and nonce-checked per
/// transfer, credits to absent receivers dropped.
fn apply_batch(accounts: &[Account], transactions: &[BatchTransfer]) -> Result<Vec<u64>, ChainError> {
    let mut balances: Vec<u64> = accounts.iter().map(|a| a.balance).collect();
    let mut nonces: Vec<u64> = accounts.iter().map(|a| a.nonce).collect();

    let index_of = |address: &str| accounts.iter().position(|a| a.address == address);

    for tx in transactions {
        let from = index_of(&tx.from).ok_or_else(|| {
            ChainError::ProofGeneration(format!("sender {} not in account set", tx.from))
        })?;

        if nonces[from] != tx.nonce {
            return Err(ChainError::ProofGeneration(format!(
                "nonce mismatch for {}: state {}, transfer {}",
                tx.from, nonces[from], tx.nonce
            )));
        }

        balances[from] = balances[from].checked_sub(tx.amount).ok_or_else(|| {
            ChainError::ProofGeneration(format!(
                "balance underflow for {}: {} < {}",
                tx.from, balances[from], tx.amount
            ))
        })?;
        nonces[from] += 1;

        match index_of(&tx.to) {
            Some(to) => {
                balances[to] = balances[to].checked_add(tx.amount).ok_or_else(|| {
                    ChainError::ProofGeneration(format!("balance overflow for {}", tx.to))
                })?;
            }
            None => {
                // Mirrors the circuit: no receiver row, no credit.
                warn!(to = %tx.to, amount = tx.amount, "receiver not in account set, credit dropped");
            }
        }
    }

    Ok(balances)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const A1: &str = "0000000000000000000000000000000000000001";
    const A2: &str = "0000000000000000000000000000000000000002";
    const A3: &str = "0000000000000000000000000000000000000003";

    fn genesis_accounts() -> Vec<Account> {
        vec![
            Account { address: A1.into(), balance: 1_000_000, nonce: 0 },
            Account { address: A2.into(), balance: 500_000, nonce: 0 },
            Account { address: A3.into(), balance: 300_000, nonce: 0 },
        ]
    }

    fn transfer(from: &str, to: &str, amount: u64, nonce: u64) -> BatchTransfer {
        BatchTransfer { from: from.into(), to: to.into(), amount, nonce }
    }

    fn genesis_input(transactions: Vec<BatchTransfer>) -> ProofInput {
        let accounts = genesis_accounts();
        let balances: Vec<u64> = accounts.iter().map(|a| a.balance).collect();
        ProofInput {
            old_state_root: mimc::field_to_decimal(&mimc::state_root(&balances)),
            accounts,
            transactions,
        }
    }

    #[test]
    fn apply_batch_matches_expected_balances() {
        let accounts = genesis_accounts();
        let txs = vec![transfer(A1, A2, 100, 0), transfer(A2, A3, 50, 0)];
        let new = apply_batch(&accounts, &txs).unwrap();
        assert_eq!(new, vec![999_900, 500_050, 300_050]);
    }

    #[test]
    fn apply_batch_rejects_missing_sender() {
        let accounts = genesis_accounts();
        let txs = vec![transfer("00000000000000000000000000000000000000ff", A2, 1, 0)];
        assert!(matches!(
            apply_batch(&accounts, &txs),
            Err(ChainError::ProofGeneration(_))
        ));
    }

    #[test]
    fn apply_batch_rejects_overdraw_and_bad_nonce() {
        let accounts = genesis_accounts();
        assert!(apply_batch(&accounts, &[transfer(A3, A1, 300_001, 0)]).is_err());
        assert!(apply_batch(&accounts, &[transfer(A1, A2, 1, 5)]).is_err());
    }

    #[test]
    fn apply_batch_drops_credit_for_missing_receiver() {
        let accounts = genesis_accounts();
        let txs = vec![transfer(A1, "00000000000000000000000000000000000000ff", 100, 0)];
        let new = apply_batch(&accounts, &txs).unwrap();
        // Debit happened, credit went nowhere.
        assert_eq!(new, vec![999_900, 500_000, 300_000]);
    }

    #[test]
    fn serialized_lines_are_stable() {
        let lines = serialize_batch(&[transfer(A1, A2, 100, 0)]).unwrap();
        let text = String::from_utf8(lines[0].clone()).unwrap();
        assert!(text.ends_with('\n'));
        assert!(text.contains("\"amount\":\"100\""));
        assert!(text.contains("\"nonce\":\"0\""));
    }

    #[test]
    fn generate_proof_end_to_end() {
        let prover = Prover::new();
        let input = genesis_input(vec![transfer(A1, A2, 100, 0)]);

        let output = prover.generate_proof(&input).expect("proof");
        assert_eq!(output.old_state_root, input.old_state_root);
        assert_eq!(
            output.new_state_root,
            mimc::field_to_decimal(&mimc::state_root(&[999_900, 500_100, 300_000]))
        );
        assert!(!output.proof.is_empty());
        assert!(!output.vk.is_empty());

        // Same shape again: the cache must not grow.
        assert_eq!(prover.cached_shapes(), 1);
        let again = genesis_input(vec![transfer(A2, A3, 50, 0)]);
        prover.generate_proof(&again).expect("second proof");
        assert_eq!(prover.cached_shapes(), 1);
    }

    #[test]
    fn generate_proof_rejects_stale_old_root() {
        let prover = Prover::new();
        let mut input = genesis_input(vec![transfer(A1, A2, 100, 0)]);
        input.old_state_root = "12345".into();

        assert!(matches!(
            prover.generate_proof(&input),
            Err(ChainError::ProofGeneration(_))
        ));
    }

    #[test]
    fn generate_proof_rejects_empty_batch() {
        let prover = Prover::new();
        let input = genesis_input(vec![]);
        assert!(matches!(
            prover.generate_proof(&input),
            Err(ChainError::ProofGeneration(_))
        ));
    }

    #[test]
    fn blob_round_trip() {
        let output = ProofOutput {
            old_state_root: "1".into(),
            batch_root: "2".into(),
            new_state_root: "3".into(),
            proof: vec![1, 2, 3],
            vk: vec![4, 5, 6],
        };
        let blob = output.to_blob();
        let json = blob.to_json().unwrap();
        assert!(json.contains("\"old_state_root\":\"1\""));

        let restored = ProofBlob::from_json(&json).unwrap();
        assert_eq!(restored, blob);
    }
}
