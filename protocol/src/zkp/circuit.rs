//! # The State-Transition Circuit
//!
//! One R1CS circuit enforces the whole batch statement:
//!
//! 1. **Batch binding** — a private leaf plus its membership path must
//!    hash up to the public `batch_root`, so the root commits to at
//!    least one real serialized transaction.
//! 2. **Old state** — the private balances, MiMC-folded in canonical
//!    order (odd-carry), must equal the public `old_state_root`.
//! 3. **Transfers** — for each transaction, in declaration order:
//!    exactly one account row matches the sender (`found_sender == 1`);
//!    on that row the nonce must match and the debited balance must
//!    stay in `[0, 2^64)` — enforced by a genuine bit-decomposition
//!    range check, not an identity; the sender row is debited and
//!    nonce-bumped, and any row matching the receiver is credited. A
//!    receiver absent from the account set silently loses the credit
//!    in-circuit; admission refuses such transactions upstream, and the
//!    tests pin the in-circuit behavior.
//! 4. **New state** — the updated balances, folded the same way, must
//!    equal the public `new_state_root`.
//!
//! All witness fields are `Option<_>` so the same struct describes both
//! the blank circuit handed to the Groth16 setup (shape only) and the
//! populated circuit handed to the prover. The shape is a function of
//! `(account_size, batch_size)` alone.

use ark_bn254::Fr;
use ark_r1cs_std::alloc::AllocVar;
use ark_r1cs_std::boolean::Boolean;
use ark_r1cs_std::eq::EqGadget;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::fields::FieldVar;
use ark_r1cs_std::select::CondSelectGadget;
use ark_r1cs_std::ToBitsGadget;
use ark_relations::ns;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use crate::crypto::mimc;
use crate::zkp::batch::membership_depth;

/// Per-transaction private witness: the transfer fields as field
/// elements.
#[derive(Debug, Clone, Default)]
pub struct TransferWitness {
    pub from: Option<Fr>,
    pub to: Option<Fr>,
    pub amount: Option<Fr>,
    pub nonce: Option<Fr>,
}

/// The batch state-transition circuit.
#[derive(Debug, Clone)]
pub struct BatchCircuit {
    // -- Public inputs ------------------------------------------------------
    pub old_state_root: Option<Fr>,
    pub batch_root: Option<Fr>,
    pub new_state_root: Option<Fr>,

    // -- Account rows (private, canonical address order) --------------------
    pub addresses: Vec<Option<Fr>>,
    pub balances: Vec<Option<Fr>>,
    pub nonces: Vec<Option<Fr>>,

    // -- Transfers (private, block order) ------------------------------------
    pub transfers: Vec<TransferWitness>,

    // -- Batch membership witness (private) ----------------------------------
    pub leaf: Option<Fr>,
    pub siblings: Vec<Option<Fr>>,
    pub is_left: Vec<Option<bool>>,
}

impl BatchCircuit {
    /// A shape-only circuit for Groth16 key generation: same topology,
    /// empty witness slots.
    pub fn blank(account_size: usize, batch_size: usize) -> Self {
        let depth = membership_depth(batch_size);
        Self {
            old_state_root: None,
            batch_root: None,
            new_state_root: None,
            addresses: vec![None; account_size],
            balances: vec![None; account_size],
            nonces: vec![None; account_size],
            transfers: vec![TransferWitness::default(); batch_size],
            leaf: None,
            siblings: vec![None; depth],
            is_left: vec![None; depth],
        }
    }
}

impl ConstraintSynthesizer<Fr> for BatchCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        // -- Public inputs, in the order the verifier rebuilds them ---------
        let old_root = FpVar::new_input(ns!(cs, "old_state_root"), || {
            self.old_state_root.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let batch_root = FpVar::new_input(ns!(cs, "batch_root"), || {
            self.batch_root.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let new_root = FpVar::new_input(ns!(cs, "new_state_root"), || {
            self.new_state_root.ok_or(SynthesisError::AssignmentMissing)
        })?;

        // -- 1. Batch membership --------------------------------------------
        let leaf = FpVar::new_witness(ns!(cs, "batch_leaf"), || {
            self.leaf.ok_or(SynthesisError::AssignmentMissing)
        })?;

        let mut current = leaf;
        for (sibling, left) in self.siblings.iter().zip(&self.is_left) {
            let sibling = FpVar::new_witness(ns!(cs, "sibling"), || {
                sibling.ok_or(SynthesisError::AssignmentMissing)
            })?;
            let is_left = Boolean::new_witness(ns!(cs, "is_left"), || {
                left.ok_or(SynthesisError::AssignmentMissing)
            })?;
            let l = FpVar::conditionally_select(&is_left, &current, &sibling)?;
            let r = FpVar::conditionally_select(&is_left, &sibling, &current)?;
            current = mimc::hash_two_gadget(&l, &r)?;
        }
        current.enforce_equal(&batch_root)?;

        // -- Account rows ----------------------------------------------------
        let addresses = alloc_row(&cs, &self.addresses)?;
        let mut balances = alloc_row(&cs, &self.balances)?;
        let mut nonces = alloc_row(&cs, &self.nonces)?;

        // -- 2. Input balances commit to the old root ------------------------
        let computed_old = mimc::state_root_gadget(&balances)?;
        computed_old.enforce_equal(&old_root)?;

        // -- 3. Apply each transfer in order ---------------------------------
        for transfer in &self.transfers {
            let t_from = FpVar::new_witness(ns!(cs, "tx_from"), || {
                transfer.from.ok_or(SynthesisError::AssignmentMissing)
            })?;
            let t_to = FpVar::new_witness(ns!(cs, "tx_to"), || {
                transfer.to.ok_or(SynthesisError::AssignmentMissing)
            })?;
            let t_amount = FpVar::new_witness(ns!(cs, "tx_amount"), || {
                transfer.amount.ok_or(SynthesisError::AssignmentMissing)
            })?;
            let t_nonce = FpVar::new_witness(ns!(cs, "tx_nonce"), || {
                transfer.nonce.ok_or(SynthesisError::AssignmentMissing)
            })?;

            let mut found_sender = FpVar::<Fr>::zero();

            for j in 0..addresses.len() {
                let is_sender = addresses[j].is_eq(&t_from)?;
                found_sender = found_sender + FpVar::from(is_sender.clone());

                // The sender row's nonce must equal the transfer nonce.
                let nonce_diff = &nonces[j] - &t_nonce;
                (FpVar::from(is_sender.clone()) * nonce_diff).enforce_equal(&FpVar::zero())?;

                // The debit may not overdraw: on the sender row the
                // post-debit balance must decompose into 64 bits. Other
                // rows check zero, which trivially does.
                let delta = &balances[j] - &t_amount;
                let gated = FpVar::conditionally_select(&is_sender, &delta, &FpVar::zero())?;
                enforce_u64(&gated)?;

                balances[j] = FpVar::conditionally_select(&is_sender, &delta, &balances[j])?;
                nonces[j] = FpVar::conditionally_select(
                    &is_sender,
                    &(&nonces[j] + FpVar::one()),
                    &nonces[j],
                )?;

                let is_receiver = addresses[j].is_eq(&t_to)?;
                balances[j] = FpVar::conditionally_select(
                    &is_receiver,
                    &(&balances[j] + &t_amount),
                    &balances[j],
                )?;
            }

            // Exactly one row carried the sender. Addresses are unique,
            // so the indicator sum is 0 or 1 and this pins it to 1.
            found_sender.enforce_equal(&FpVar::one())?;
        }

        // -- 4. Updated balances commit to the new root ----------------------
        let computed_new = mimc::state_root_gadget(&balances)?;
        computed_new.enforce_equal(&new_root)?;

        Ok(())
    }
}

/// Allocate one account-row column as private witnesses.
fn alloc_row(
    cs: &ConstraintSystemRef<Fr>,
    values: &[Option<Fr>],
) -> Result<Vec<FpVar<Fr>>, SynthesisError> {
    values
        .iter()
        .map(|v| {
            FpVar::new_witness(ns!(cs.clone(), "row"), || {
                v.ok_or(SynthesisError::AssignmentMissing)
            })
        })
        .collect()
}

/// Constrain a field element to the u64 range via its canonical bit
/// decomposition: every bit above the 64th must be zero.
fn enforce_u64(value: &FpVar<Fr>) -> Result<(), SynthesisError> {
    let bits = value.to_bits_le()?;
    for bit in bits.iter().skip(64) {
        bit.enforce_equal(&Boolean::constant(false))?;
    }
    Ok(())
}

/// The public-input vector in the order the circuit allocates them.
pub fn public_inputs(old_state_root: Fr, batch_root: Fr, new_state_root: Fr) -> Vec<Fr> {
    vec![old_state_root, batch_root, new_state_root]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
