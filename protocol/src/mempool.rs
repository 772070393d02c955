//! # Mempool
//!
//! A serialized FIFO of admitted transactions. Insertion order is
//! preserved and becomes block order — there is no fee market and no
//! priority queue in a single-sequencer rollup; the nonce check upstream
//! already fixes per-sender ordering, and arrival order settles the rest.
//!
//! Deliberately dumb: no dedup (admission rejects replays via the nonce
//! rule before anything reaches the pool), no expiry, no capacity
//! eviction. A `RwLock` around a `Vec` — mutators exclusive, readers
//! shared, `get_all` hands out an owned snapshot so the block builder
//! can work outside the lock.

use parking_lot::RwLock;

use crate::transaction::Transaction;

/// Thread-safe FIFO transaction pool.
#[derive(Default)]
pub struct Mempool {
    transactions: RwLock<Vec<Transaction>>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transaction, preserving arrival order.
    pub fn add(&self, tx: Transaction) {
        self.transactions.write().push(tx);
    }

    /// Remove the transaction with the given hash, if present.
    pub fn remove(&self, hash: &[u8; 32]) -> Option<Transaction> {
        let mut txs = self.transactions.write();
        let idx = txs.iter().position(|tx| &tx.hash == hash)?;
        Some(txs.remove(idx))
    }

    /// Clone of the transaction with the given hash, if present.
    pub fn get(&self, hash: &[u8; 32]) -> Option<Transaction> {
        self.transactions
            .read()
            .iter()
            .find(|tx| &tx.hash == hash)
            .cloned()
    }

    /// Owned snapshot of the pool in insertion order. Callers may not
    /// mutate pool entries through this — it is a copy.
    pub fn get_all(&self) -> Vec<Transaction> {
        self.transactions.read().clone()
    }

    /// Drop every pending transaction.
    pub fn clear(&self) {
        self.transactions.write().clear();
    }

    /// Number of pending transactions.
    pub fn size(&self) -> usize {
        self.transactions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.read().is_empty()
    }
}
