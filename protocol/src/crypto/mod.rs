//! # Cryptographic Primitives
//!
//! Two hash domains, kept strictly separate:
//!
//! - **Transport hashing** ([`hash`]) — SHA-256 for transaction digests,
//!   block header hashes, and the transaction Merkle tree. Never seen by
//!   the circuit.
//! - **Circuit hashing** ([`mimc`]) — MiMC over the BN254 scalar field,
//!   seeded with the literal string `"seed"`. The account state root and
//!   the in-circuit batch root both live here. The native implementation
//!   and the R1CS gadget share one round-constant table; agreeing
//!   bit-for-bit is the single most important cross-layer contract in
//!   the repository.
//!
//! Signatures ([`keys`]) are P-256 ECDSA over the transaction digest.
//! The transaction Merkle tree ([`merkle`]) duplicates odd leaves; the
//! account-balance fold in [`mimc`] carries them — the two rules are
//! different on purpose and must not be unified.

pub mod hash;
pub mod keys;
pub mod merkle;
pub mod mimc;

pub use hash::sha256;
pub use keys::Keypair;
pub use merkle::MerkleTree;
