//! # Transaction Merkle Tree
//!
//! Binary SHA-256 Merkle tree over transaction hashes — the transport
//! commitment stamped into every block header as `merkle_root`.
//!
//! Rules, pinned:
//!
//! - A leaf is `SHA-256(tx.hash)` — the transaction digest is hashed
//!   once more on entry, so a single-transaction block has
//!   `merkle_root = SHA-256(tx.hash)`.
//! - Internal nodes are `SHA-256(left || right)`.
//! - An odd node at any level is **duplicated** (paired with itself).
//!   The account-balance fold in [`super::mimc`] carries odd elements
//!   instead; the two rules are intentionally different.
//! - The empty tree has an all-zero root.
//!
//! The tree retains its leaves so transactions can be appended; appends
//! rebuild from the leaf level rather than patching incrementally —
//! blocks are small enough that correctness wins over cleverness.

use crate::crypto::hash::{sha256, sha256_concat};
use crate::transaction::Transaction;

/// A built Merkle tree: the retained leaf level plus the computed root.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    leaves: Vec<[u8; 32]>,
    root: [u8; 32],
}

impl MerkleTree {
    /// Build a tree over raw leaf data (each datum is hashed into a leaf).
    pub fn from_data(data: &[&[u8]]) -> Self {
        let leaves: Vec<[u8; 32]> = data.iter().map(|d| sha256(d)).collect();
        let root = fold(&leaves);
        Self { leaves, root }
    }

    /// Build a tree over a transaction batch. Leaf order is batch order.
    pub fn from_transactions(txs: &[Transaction]) -> Self {
        let leaves: Vec<[u8; 32]> = txs.iter().map(|tx| sha256(&tx.hash)).collect();
        let root = fold(&leaves);
        Self { leaves, root }
    }

    /// The Merkle root. All zeros for an empty tree.
    pub fn root(&self) -> [u8; 32] {
        self.root
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Whether the tree has no leaves.
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Append a transaction and rebuild the tree.
    pub fn add_transaction(&mut self, tx: &Transaction) {
        self.leaves.push(sha256(&tx.hash));
        self.root = fold(&self.leaves);
    }
}

/// Recompute the root for a batch and compare against a claimed root.
pub fn verify_transactions(txs: &[Transaction], root: [u8; 32]) -> bool {
    MerkleTree::from_transactions(txs).root() == root
}

/// Bottom-up fold with odd-leaf duplication.
fn fold(leaves: &[[u8; 32]]) -> [u8; 32] {
    if leaves.is_empty() {
        return [0u8; 32];
    }

    let mut level = leaves.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            let right = if pair.len() == 2 { &pair[1] } else { &pair[0] };
            next.push(sha256_concat(&[&pair[0], right]));
        }
        level = next;
    }
    level[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{Transaction, TxSignature};

    fn make_tx(from: &str, to: &str, value: u64, nonce: u64) -> Transaction {
        Transaction::new(
            from.to_string(),
            to.to_string(),
            value,
            nonce,
            1_700_000_000,
            TxSignature::default(),
        )
    }

    #[test]
    fn empty_tree_has_zero_root() {
        let tree = MerkleTree::from_transactions(&[]);
        assert_eq!(tree.root(), [0u8; 32]);
        assert!(tree.is_empty());
    }

    #[test]
    fn single_leaf_root_is_hash_of_tx_hash() {
        let tx = make_tx("01", "02", 100, 0);
        let tree = MerkleTree::from_transactions(std::slice::from_ref(&tx));
        assert_eq!(tree.root(), sha256(&tx.hash));
    }

    #[test]
    fn two_leaves_hash_pairwise() {
        let tx1 = make_tx("01", "02", 100, 0);
        let tx2 = make_tx("02", "03", 50, 0);
        let tree = MerkleTree::from_transactions(&[tx1.clone(), tx2.clone()]);

        let l1 = sha256(&tx1.hash);
        let l2 = sha256(&tx2.hash);
        assert_eq!(tree.root(), sha256_concat(&[&l1, &l2]));
    }

    #[test]
    fn odd_leaf_is_duplicated() {
        let txs = [
            make_tx("01", "02", 100, 0),
            make_tx("02", "03", 50, 0),
            make_tx("03", "01", 25, 0),
        ];
        let tree = MerkleTree::from_transactions(&txs);

        let leaves: Vec<[u8; 32]> = txs.iter().map(|tx| sha256(&tx.hash)).collect();
        let left = sha256_concat(&[&leaves[0], &leaves[1]]);
        // The third leaf pairs with itself.
        let right = sha256_concat(&[&leaves[2], &leaves[2]]);
        assert_eq!(tree.root(), sha256_concat(&[&left, &right]));
    }

    #[test]
    fn verify_accepts_matching_root_only() {
        let txs = vec![make_tx("01", "02", 100, 0), make_tx("02", "03", 50, 0)];
        let root = MerkleTree::from_transactions(&txs).root();

        assert!(verify_transactions(&txs, root));
        assert!(!verify_transactions(&txs, [0xffu8; 32]));
    }

    #[test]
    fn permuting_transactions_changes_root() {
        let a = make_tx("01", "02", 100, 0);
        let b = make_tx("02", "03", 50, 0);

        let root_ab = MerkleTree::from_transactions(&[a.clone(), b.clone()]).root();
        let root_ba = MerkleTree::from_transactions(&[b, a]).root();
        assert_ne!(root_ab, root_ba);
    }

    #[test]
    fn append_matches_rebuild() {
        let txs = vec![
            make_tx("01", "02", 100, 0),
            make_tx("02", "03", 50, 0),
            make_tx("03", "01", 25, 0),
        ];

        let mut incremental = MerkleTree::from_transactions(&txs[..2]);
        incremental.add_transaction(&txs[2]);

        let rebuilt = MerkleTree::from_transactions(&txs);
        assert_eq!(incremental.root(), rebuilt.root());
        assert_eq!(incremental.len(), 3);
    }
}
