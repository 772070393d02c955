//! # Blocks & Headers
//!
//! A block is an ordered transaction batch plus the header that commits
//! to it: the parent link, the SHA-256 transaction Merkle root, and the
//! MiMC state root the batch's proof attests to.
//!
//! The header hash covers every header field with fixed-width
//! little-endian integers. The state root enters as its decimal string
//! bytes — it is a BN254 field element, not a 32-byte digest, and the
//! decimal form is its canonical wire encoding everywhere else too.

use serde::{Deserialize, Serialize};

use crate::config::BLOCK_VERSION;
use crate::crypto::hash::sha256_concat;
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Block header. `state_root` is the decimal string of the MiMC field
/// element; everything else is transport-domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Block format version.
    pub version: u32,
    /// SHA-256 hash of the parent header. All zeros for genesis.
    pub prev_hash: [u8; 32],
    /// SHA-256 Merkle root over the transaction hashes.
    pub merkle_root: [u8; 32],
    /// MiMC commitment to the post-application balances (decimal).
    pub state_root: String,
    /// Unix timestamp (seconds) of block creation.
    pub timestamp: i64,
    /// Height in the chain; genesis is 0.
    pub height: u64,
    /// Number of transactions in the body.
    pub tx_count: u32,
}

impl Header {
    /// SHA-256 over the canonical header encoding.
    pub fn compute_hash(&self) -> [u8; 32] {
        sha256_concat(&[
            &self.version.to_le_bytes(),
            &self.prev_hash,
            &self.merkle_root,
            self.state_root.as_bytes(),
            &self.timestamp.to_le_bytes(),
            &self.height.to_le_bytes(),
            &self.tx_count.to_le_bytes(),
        ])
    }
}

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// A full block: header plus ordered transaction list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Construct the genesis block over a precomputed seeded state root.
    pub fn genesis(state_root: String, timestamp: i64) -> Self {
        Self {
            header: Header {
                version: BLOCK_VERSION,
                prev_hash: [0u8; 32],
                merkle_root: [0u8; 32],
                state_root,
                timestamp,
                height: 0,
                tx_count: 0,
            },
            transactions: Vec::new(),
        }
    }

    /// The block hash — the hash of its header.
    pub fn hash(&self) -> [u8; 32] {
        self.header.compute_hash()
    }

    /// The block hash as lowercase hex.
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_header() -> Header {
        Header {
            version: BLOCK_VERSION,
            prev_hash: [0u8; 32],
            merkle_root: [7u8; 32],
            state_root: "12345".into(),
            timestamp: 1_700_000_000,
            height: 3,
            tx_count: 2,
        }
    }

    #[test]
    fn header_hash_is_deterministic() {
        let h = make_header();
        assert_eq!(h.compute_hash(), h.compute_hash());
    }

    #[test]
    fn header_hash_covers_every_field() {
        let base = make_header();
        let base_hash = base.compute_hash();

        let mut h = make_header();
        h.version = 2;
        assert_ne!(h.compute_hash(), base_hash);

        let mut h = make_header();
        h.prev_hash = [1u8; 32];
        assert_ne!(h.compute_hash(), base_hash);

        let mut h = make_header();
        h.merkle_root = [8u8; 32];
        assert_ne!(h.compute_hash(), base_hash);

        let mut h = make_header();
        h.state_root = "12346".into();
        assert_ne!(h.compute_hash(), base_hash);

        let mut h = make_header();
        h.timestamp += 1;
        assert_ne!(h.compute_hash(), base_hash);

        let mut h = make_header();
        h.height += 1;
        assert_ne!(h.compute_hash(), base_hash);

        let mut h = make_header();
        h.tx_count += 1;
        assert_ne!(h.compute_hash(), base_hash);
    }

    #[test]
    fn genesis_shape() {
        let g = Block::genesis("42".into(), 0);
        assert_eq!(g.header.height, 0);
        assert_eq!(g.header.prev_hash, [0u8; 32]);
        assert_eq!(g.header.merkle_root, [0u8; 32]);
        assert_eq!(g.header.tx_count, 0);
        assert!(g.transactions.is_empty());
        assert_eq!(g.header.state_root, "42");
    }

    #[test]
    fn block_serde_round_trip() {
        let block = Block::genesis("9000".into(), 123);
        let json = serde_json::to_string(&block).unwrap();
        let restored: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(block, restored);
    }
}
