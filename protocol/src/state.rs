//! # Account State
//!
//! The rollup's entire world state: `address → (balance, nonce, public
//! key)`. Balances live in a `BTreeMap` so the ascending-address
//! iteration the state root requires falls out of the container instead
//! of a sort at every commitment.
//!
//! A single `RwLock` guards the inner maps: readers run concurrently,
//! mutators are exclusive. Balance and nonce are only ever mutated by
//! the block builder's state application; public keys are bound once at
//! first admission and re-bound only through the explicit setter.
//!
//! The state root is computed on demand from the balances alone —
//! addresses, nonces, and keys do not enter the commitment. That is the
//! shape the circuit hashes, so it is the shape we hash.

use std::collections::{BTreeMap, HashMap};

use ark_bn254::Fr;
use p256::ecdsa::VerifyingKey;
use parking_lot::RwLock;

use crate::crypto::mimc;

/// One account row as the prover consumes it: the canonical snapshot
/// element. Ordering is by address, matching the in-circuit layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub address: String,
    pub balance: u64,
    pub nonce: u64,
}

#[derive(Default, Clone)]
struct StateInner {
    /// Balances, keyed by address. BTreeMap iteration order *is* the
    /// canonical state order.
    balances: BTreeMap<String, u64>,
    nonces: HashMap<String, u64>,
    keys: HashMap<String, VerifyingKey>,
}

/// Thread-safe account state.
#[derive(Default)]
pub struct State {
    inner: RwLock<StateInner>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance for an address; unknown addresses read as zero.
    pub fn balance(&self, address: &str) -> u64 {
        self.inner.read().balances.get(address).copied().unwrap_or(0)
    }

    /// Set an address balance, creating the account row if absent.
    pub fn set_balance(&self, address: &str, balance: u64) {
        self.inner.write().balances.insert(address.to_string(), balance);
    }

    /// Next expected nonce for an address; unknown addresses read as zero.
    pub fn nonce(&self, address: &str) -> u64 {
        self.inner.read().nonces.get(address).copied().unwrap_or(0)
    }

    pub fn set_nonce(&self, address: &str, nonce: u64) {
        self.inner.write().nonces.insert(address.to_string(), nonce);
    }

    /// The public key bound to an address, if any.
    pub fn public_key(&self, address: &str) -> Option<VerifyingKey> {
        self.inner.read().keys.get(address).cloned()
    }

    /// Explicitly (re)bind a public key. Callers that merely relay a
    /// client-supplied key should use [`State::bind_public_key`] instead.
    pub fn set_public_key(&self, address: &str, key: VerifyingKey) {
        self.inner.write().keys.insert(address.to_string(), key);
    }

    /// Bind a key only if the address has none yet. Returns whether the
    /// key was stored. This is what admission uses: the first submitted
    /// key wins and later submissions cannot silently re-key an account.
    pub fn bind_public_key(&self, address: &str, key: VerifyingKey) -> bool {
        let mut inner = self.inner.write();
        if inner.keys.contains_key(address) {
            return false;
        }
        inner.keys.insert(address.to_string(), key);
        true
    }

    /// Whether an account row exists for this address.
    pub fn has_account(&self, address: &str) -> bool {
        self.inner.read().balances.contains_key(address)
    }

    /// Snapshot of every account in canonical (ascending-address) order.
    pub fn all_accounts(&self) -> Vec<Account> {
        let inner = self.inner.read();
        inner
            .balances
            .iter()
            .map(|(address, balance)| Account {
                address: address.clone(),
                balance: *balance,
                nonce: inner.nonces.get(address).copied().unwrap_or(0),
            })
            .collect()
    }

    /// Deep copy of the whole state.
    pub fn clone_state(&self) -> State {
        State {
            inner: RwLock::new(self.inner.read().clone()),
        }
    }

    /// The MiMC commitment to the current balances, in canonical order.
    pub fn state_root(&self) -> Fr {
        let inner = self.inner.read();
        let balances: Vec<u64> = inner.balances.values().copied().collect();
        mimc::state_root(&balances)
    }

    /// [`State::state_root`] in its decimal wire form.
    pub fn state_root_decimal(&self) -> String {
        mimc::field_to_decimal(&self.state_root())
    }
}
