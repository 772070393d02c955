//! # Protocol Configuration & Constants
//!
//! Every magic number in the sequencer lives here. The values below are
//! consensus-relevant in the sense that the prover, the verifier, and the
//! off-circuit state machine must all agree on them — change one and every
//! previously emitted proof blob stops verifying.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Block parameters
// ---------------------------------------------------------------------------

/// Block format version stamped into every header.
pub const BLOCK_VERSION: u32 = 1;

/// Timed trigger for the auto-block scheduler: a build is attempted on
/// every tick regardless of pool size.
pub const BLOCK_INTERVAL: Duration = Duration::from_secs(1);

/// How often the size trigger polls the mempool.
pub const POOL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The size trigger fires as soon as the pool holds strictly more than
/// this many transactions.
pub const POOL_SIZE_TRIGGER: usize = 1;

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

/// Canonical address width: 20 bytes, lowercase hex, no prefix.
///
/// Lexicographic order over the fixed-width hex string equals big-endian
/// numeric order, which is the canonical account order for state-root
/// computation.
pub const ADDRESS_HEX_LEN: usize = 40;

// ---------------------------------------------------------------------------
// Circuit hashing
// ---------------------------------------------------------------------------

/// Seed string for the MiMC instantiation over the BN254 scalar field.
/// Round constants are derived deterministically from this literal; both
/// the native hash and the in-circuit gadget consume the same table.
pub const MIMC_SEED: &str = "seed";

// ---------------------------------------------------------------------------
// Genesis
// ---------------------------------------------------------------------------

/// Accounts seeded into the genesis state, with their initial balances.
/// All genesis nonces are zero. The genesis state root is the MiMC root
/// over these balances in ascending-address order.
pub const GENESIS_ACCOUNTS: [(&str, u64); 3] = [
    ("0000000000000000000000000000000000000001", 1_000_000),
    ("0000000000000000000000000000000000000002", 500_000),
    ("0000000000000000000000000000000000000003", 300_000),
];

// ---------------------------------------------------------------------------
// Node defaults
// ---------------------------------------------------------------------------

/// Default bind address for the HTTP API.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
