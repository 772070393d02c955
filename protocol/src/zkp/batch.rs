//! # Batch Merkle Tree (circuit domain)
//!
//! MiMC Merkle tree over the serialized transactions of one block. Its
//! root is the public `batch_root` input that pins the proof to a
//! specific batch, and a membership path for one leaf is part of the
//! private witness — the submitter cannot claim an empty or fabricated
//! batch root.
//!
//! Unlike the balance fold (odd-carry), this tree **duplicates** an odd
//! node, so every leaf has a membership path of identical length
//! `ceil(log2(n))` — a fixed-shape circuit needs a fixed-depth path.
//! A single-leaf tree has depth zero: the root *is* the leaf hash.

use ark_bn254::Fr;

use crate::crypto::mimc;

/// Path length for a batch of the given size. This is circuit shape:
/// the blank circuit and the witness builder must agree on it.
pub fn membership_depth(batch_size: usize) -> usize {
    if batch_size <= 1 {
        0
    } else {
        (usize::BITS - (batch_size - 1).leading_zeros()) as usize
    }
}

/// A leaf's membership witness: the leaf hash, the sibling at each
/// level (bottom-up), and whether the running node is the left child.
#[derive(Debug, Clone)]
pub struct MembershipPath {
    pub leaf: Fr,
    pub siblings: Vec<Fr>,
    pub is_left: Vec<bool>,
}

/// The built batch tree: all levels retained so paths can be extracted.
#[derive(Debug, Clone)]
pub struct BatchTree {
    levels: Vec<Vec<Fr>>,
}

impl BatchTree {
    /// Build the tree over serialized transaction lines. Each line is
    /// hashed into a leaf with the byte-packing MiMC hash.
    pub fn from_lines<L: AsRef<[u8]>>(lines: &[L]) -> Self {
        let leaves: Vec<Fr> = lines.iter().map(|l| mimc::hash_bytes(l.as_ref())).collect();
        Self::from_leaves(leaves)
    }

    /// Build the tree over precomputed leaf hashes.
    pub fn from_leaves(leaves: Vec<Fr>) -> Self {
        let mut levels = vec![leaves];
        while levels.last().map(Vec::len).unwrap_or(0) > 1 {
            let prev = levels.last().expect("non-empty by loop condition");
            let mut next = Vec::with_capacity(prev.len().div_ceil(2));
            for pair in prev.chunks(2) {
                let right = if pair.len() == 2 { pair[1] } else { pair[0] };
                next.push(mimc::hash_two(pair[0], right));
            }
            levels.push(next);
        }
        Self { levels }
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.levels.first().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The tree root. Zero for an empty tree.
    pub fn root(&self) -> Fr {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or_else(|| Fr::from(0u64))
    }

    /// Extract the membership path for the leaf at `index`.
    ///
    /// The duplication rule means a node without a right neighbour is
    /// its own sibling, so the path always has `membership_depth(len)`
    /// entries.
    pub fn path(&self, index: usize) -> Option<MembershipPath> {
        let leaves = self.levels.first()?;
        let leaf = *leaves.get(index)?;

        let mut siblings = Vec::new();
        let mut is_left = Vec::new();
        let mut i = index;

        // Walk every level below the root.
        for level in &self.levels[..self.levels.len().saturating_sub(1)] {
            let sibling_index = i ^ 1;
            let sibling = if sibling_index < level.len() {
                level[sibling_index]
            } else {
                level[i]
            };
            siblings.push(sibling);
            is_left.push(i % 2 == 0);
            i /= 2;
        }

        Some(MembershipPath { leaf, siblings, is_left })
    }

    /// Recompute a root from a membership path — the native mirror of
    /// what the circuit enforces.
    pub fn root_from_path(path: &MembershipPath) -> Fr {
        let mut current = path.leaf;
        for (sibling, left) in path.siblings.iter().zip(&path.is_left) {
            current = if *left {
                mimc::hash_two(current, *sibling)
            } else {
                mimc::hash_two(*sibling, current)
            };
        }
        current
    }
}
