//! # Blockchain Core
//!
//! The sequencer's spine: an append-only block log over the account
//! state, fed by the mempool, sealed by the prover.
//!
//! ## Concurrency discipline
//!
//! Four pieces of shared state, each with its own guard: the block
//! vector (`RwLock`), the account state and mempool (internally
//! locked), and the scheduler flag (`AtomicBool`). On top of that sits
//! one builder mutex serializing `create_block` — the scheduler has two
//! independent triggers and HTTP can ask for a build too; exactly one
//! proof pipeline runs at a time.
//!
//! No lock is held across proof generation. The builder snapshots the
//! mempool and the account set, proves outside every lock (seconds of
//! CPU), and only then takes the write lock to append. Admission
//! failures never roll anything back because they are caught before the
//! pool; a proof failure aborts the build with the pool intact, so the
//! next trigger simply retries.

pub mod block;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::config::{BLOCK_INTERVAL, BLOCK_VERSION, GENESIS_ACCOUNTS, POOL_POLL_INTERVAL, POOL_SIZE_TRIGGER};
use crate::crypto::merkle::{self, MerkleTree};
use crate::error::ChainError;
use crate::ledger::LedgerClient;
use crate::mempool::Mempool;
use crate::state::State;
use crate::transaction::{Transaction, TxStatus};
use crate::zkp::prover::{BatchTransfer, ProofBlob, ProofInput, ProofOutput, Prover};
use crate::zkp::verifier;

pub use block::{Block, Header};

/// The blockchain: block log, state, mempool, prover, and the
/// auto-block scheduler, behind one owner.
pub struct Blockchain {
    blocks: RwLock<Vec<Block>>,
    state: State,
    mempool: Mempool,
    auto_block: AtomicBool,
    /// Serializes concurrent `create_block` calls. Held for the whole
    /// build, including proving — that is the point.
    builder: Mutex<()>,
    prover: Prover,
    /// The blob attesting to the tip's state transition. Replaced on
    /// every append; `verify_block` checks the tip against it.
    latest_proof: RwLock<Option<ProofBlob>>,
    ledger: Option<Arc<LedgerClient>>,
}

impl Blockchain {
    /// Create a chain with the seeded genesis accounts and its genesis
    /// block.
    pub fn new() -> Self {
        Self::with_ledger(None)
    }

    /// Create a chain that submits proof blobs to an external ledger
    /// gateway after each block.
    pub fn with_ledger(ledger: Option<Arc<LedgerClient>>) -> Self {
        let state = State::new();
        for (address, balance) in GENESIS_ACCOUNTS {
            state.set_balance(address, balance);
            state.set_nonce(address, 0);
        }

        let state_root = state.state_root_decimal();
        let genesis = Block::genesis(state_root.clone(), Utc::now().timestamp());
        info!(state_root = %state_root, "genesis block created");

        Self {
            blocks: RwLock::new(vec![genesis]),
            state,
            mempool: Mempool::new(),
            auto_block: AtomicBool::new(false),
            builder: Mutex::new(()),
            prover: Prover::new(),
            latest_proof: RwLock::new(None),
            ledger,
        }
    }

    // -----------------------------------------------------------------------
    // Admission
    // -----------------------------------------------------------------------

    /// Admit a signed transaction into the mempool.
    ///
    /// Checks run in a fixed order and the first failure wins:
    /// signature present, sender key bound, signature valid, balance
    /// sufficient, nonce exact, receiver account exists. Admission never
    /// debits — balances move only when a block applies the batch.
    pub fn add_transaction(&self, tx: Transaction) -> Result<(), ChainError> {
        if !tx.signature.is_present() {
            warn!(hash = %tx.hash_hex(), "rejected: missing signature");
            return Err(ChainError::MissingSignature);
        }

        let sender_key = self
            .state
            .public_key(&tx.from)
            .ok_or_else(|| ChainError::UnknownSender(tx.from.clone()))?;

        if !tx.verify_signature(&sender_key) {
            warn!(hash = %tx.hash_hex(), from = %tx.from, "rejected: signature verification failed");
            return Err(ChainError::InvalidSignature);
        }

        let available = self.state.balance(&tx.from);
        if available < tx.value {
            return Err(ChainError::InsufficientBalance {
                required: tx.value,
                available,
            });
        }

        let expected = self.state.nonce(&tx.from);
        if tx.nonce != expected {
            return Err(ChainError::NonceMismatch {
                expected,
                got: tx.nonce,
            });
        }

        // A receiver without an account row would be silently dropped by
        // the circuit's credit pass; refuse it here instead.
        if !self.state.has_account(&tx.to) {
            return Err(ChainError::UnknownReceiver(tx.to.clone()));
        }

        info!(hash = %tx.hash_hex(), from = %tx.from, to = %tx.to, value = tx.value, "transaction admitted");
        self.mempool.add(tx);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Block building
    // -----------------------------------------------------------------------

    /// Build, prove, and append one block from the current mempool.
    ///
    /// Returns the appended block. On `ProofGeneration` failure nothing
    /// is mutated: the mempool keeps its transactions and the next
    /// attempt retries the same batch.
    pub fn create_block(&self) -> Result<Block, ChainError> {
        let _guard = self.builder.lock();

        let transactions = self.mempool.get_all();
        if transactions.is_empty() {
            return Err(ChainError::NoTransactions);
        }

        info!(tx_count = transactions.len(), "starting block build");

        let (prev_hash, height) = {
            let blocks = self.blocks.read();
            let tip = blocks.last().expect("chain always has a genesis block");
            (tip.hash(), blocks.len() as u64)
        };

        let merkle_root = MerkleTree::from_transactions(&transactions).root();

        let mut block = Block {
            header: Header {
                version: BLOCK_VERSION,
                prev_hash,
                merkle_root,
                state_root: String::new(),
                timestamp: Utc::now().timestamp(),
                height,
                tx_count: transactions.len() as u32,
            },
            transactions,
        };

        // Heavy part: prove the transition, then commit it to the live
        // state. Aborts before any mutation on failure.
        let output = self.apply_transactions(&mut block)?;
        block.header.state_root = output.new_state_root.clone();

        self.blocks.write().push(block.clone());
        *self.latest_proof.write() = Some(output.to_blob());
        self.mempool.clear();

        info!(
            height = block.header.height,
            tx_count = block.header.tx_count,
            state_root = %block.header.state_root,
            "block appended"
        );

        self.submit_proof(output);
        Ok(block)
    }

    /// Run the prover over the batch, then apply the same transition to
    /// the live state in the same order.
    ///
    /// One transaction per sender per batch (the nonce rule guarantees
    /// it), and admission checked balances against the pre-batch state,
    /// so in-batch credits can only enlarge a sender's balance before
    /// its single debit — the circuit's sequential application cannot go
    /// negative where admission said it would not.
    fn apply_transactions(&self, block: &mut Block) -> Result<ProofOutput, ChainError> {
        let accounts = self.state.all_accounts();
        let transactions: Vec<BatchTransfer> = block
            .transactions
            .iter()
            .map(|tx| BatchTransfer {
                from: tx.from.clone(),
                to: tx.to.clone(),
                amount: tx.value,
                nonce: tx.nonce,
            })
            .collect();

        let input = ProofInput {
            old_state_root: self.state_root(),
            accounts,
            transactions,
        };

        let output = self.prover.generate_proof(&input)?;

        // The proof is in hand; commit the identical transition.
        for tx in block.transactions.iter_mut() {
            let from_balance = self.state.balance(&tx.from);
            let debited = from_balance.checked_sub(tx.value).ok_or_else(|| {
                ChainError::Internal(format!("balance underflow for {}", tx.from))
            })?;
            self.state.set_balance(&tx.from, debited);
            self.state.set_nonce(&tx.from, tx.nonce + 1);

            let to_balance = self.state.balance(&tx.to);
            let credited = to_balance.checked_add(tx.value).ok_or_else(|| {
                ChainError::Internal(format!("balance overflow for {}", tx.to))
            })?;
            self.state.set_balance(&tx.to, credited);

            tx.status = TxStatus::Confirmed;
        }

        debug!(new_state_root = %output.new_state_root, "state transition applied");
        Ok(output)
    }

    /// Fire-and-forget submission of the proof blob to the external
    /// ledger. Failures are logged, never fatal — the block stands.
    fn submit_proof(&self, output: ProofOutput) {
        let Some(ledger) = self.ledger.clone() else {
            debug!("no ledger gateway configured, skipping proof submission");
            return;
        };

        std::thread::spawn(move || match output.to_blob().to_json() {
            Ok(blob) => match ledger.verify_save_proof(&blob) {
                Ok(id) => info!(id, "proof blob submitted to ledger"),
                Err(e) => error!(error = %e, "ledger submission failed"),
            },
            Err(e) => error!(error = %e, "proof blob serialization failed"),
        });
    }

    // -----------------------------------------------------------------------
    // Verification
    // -----------------------------------------------------------------------

    /// Recheck a block's transport-domain integrity: the genesis
    /// prev-hash rule, the parent link, the transaction count, and the
    /// Merkle root. The state root is the ZK verifier's job — see
    /// [`crate::zkp::verifier::verify_proof`] against the persisted
    /// blob.
    pub fn verify_block(&self, block: &Block) -> Result<(), ChainError> {
        if block.header.height == 0 {
            if block.header.prev_hash != [0u8; 32] {
                return Err(ChainError::InvalidProof(
                    "genesis block must have an all-zero previous hash".into(),
                ));
            }
        } else {
            let blocks = self.blocks.read();
            let parent = blocks
                .get(block.header.height as usize - 1)
                .ok_or(ChainError::BlockNotFound(block.header.height - 1))?;
            if block.header.prev_hash != parent.hash() {
                return Err(ChainError::InvalidProof("previous block hash mismatch".into()));
            }
        }

        if block.transactions.len() as u32 != block.header.tx_count {
            return Err(ChainError::InvalidProof("transaction count mismatch".into()));
        }

        if !merkle::verify_transactions(&block.transactions, block.header.merkle_root) {
            return Err(ChainError::InvalidProof("merkle root mismatch".into()));
        }

        // State-root verification is the ZK verifier's job: the tip is
        // checked against the blob its build produced.
        if block.header.height + 1 == self.height() {
            if let Some(blob) = self.latest_proof.read().clone() {
                if blob.new_state_root != block.header.state_root {
                    return Err(ChainError::InvalidProof(
                        "state root does not match the persisted proof".into(),
                    ));
                }
                verifier::verify_blob(&blob)?;
            }
        }

        Ok(())
    }

    /// The proof blob for the tip's transition, if a block has been
    /// built this process lifetime.
    pub fn latest_proof(&self) -> Option<ProofBlob> {
        self.latest_proof.read().clone()
    }

    // -----------------------------------------------------------------------
    // Auto-block scheduler
    // -----------------------------------------------------------------------

    /// Start the auto-block scheduler: a 1 s timed trigger plus a 100 ms
    /// mempool-size poll. Idempotent — a second call while running is a
    /// no-op. Build errors are logged and swallowed; `NoTransactions`
    /// in particular is routine.
    pub fn start_auto_block(self: &Arc<Self>) {
        if self.auto_block.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("auto-block scheduler started");

        // Timed trigger.
        let chain = Arc::clone(self);
        std::thread::spawn(move || {
            while chain.auto_block.load(Ordering::SeqCst) {
                std::thread::sleep(BLOCK_INTERVAL);
                if !chain.auto_block.load(Ordering::SeqCst) {
                    break;
                }
                chain.try_auto_build("timer");
            }
            debug!("timed trigger stopped");
        });

        // Size trigger.
        let chain = Arc::clone(self);
        std::thread::spawn(move || {
            while chain.auto_block.load(Ordering::SeqCst) {
                std::thread::sleep(POOL_POLL_INTERVAL);
                if !chain.auto_block.load(Ordering::SeqCst) {
                    break;
                }
                if chain.mempool.size() > POOL_SIZE_TRIGGER {
                    chain.try_auto_build("pool size");
                }
            }
            debug!("size trigger stopped");
        });
    }

    /// Clear the scheduler flag. Both trigger threads exit at their next
    /// check; an in-flight build completes.
    pub fn stop_auto_block(&self) {
        if self.auto_block.swap(false, Ordering::SeqCst) {
            info!("auto-block scheduler stopped");
        }
    }

    /// Whether the scheduler is currently enabled.
    pub fn auto_block_enabled(&self) -> bool {
        self.auto_block.load(Ordering::SeqCst)
    }

    fn try_auto_build(&self, trigger: &str) {
        if self.mempool.is_empty() {
            return;
        }
        match self.create_block() {
            Ok(block) => info!(trigger, height = block.header.height, "auto-block created"),
            Err(ChainError::NoTransactions) => {
                // Another trigger won the race for the same batch.
                debug!(trigger, "auto-block skipped: pool drained");
            }
            Err(e) => error!(trigger, error = %e, "auto-block failed"),
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Balance for an address.
    pub fn balance(&self, address: &str) -> u64 {
        self.state.balance(address)
    }

    /// Next expected nonce for an address.
    pub fn nonce(&self, address: &str) -> u64 {
        self.state.nonce(address)
    }

    /// The account state owner (key binding, snapshots).
    pub fn state(&self) -> &State {
        &self.state
    }

    /// The committed state root: the tip header's root.
    pub fn state_root(&self) -> String {
        let blocks = self.blocks.read();
        blocks
            .last()
            .map(|b| b.header.state_root.clone())
            .unwrap_or_default()
    }

    /// Current chain height (number of blocks, genesis included).
    pub fn height(&self) -> u64 {
        self.blocks.read().len() as u64
    }

    /// The latest block.
    pub fn tip(&self) -> Block {
        self.blocks
            .read()
            .last()
            .cloned()
            .expect("chain always has a genesis block")
    }

    /// The block at a height, if any.
    pub fn block(&self, height: u64) -> Result<Block, ChainError> {
        self.blocks
            .read()
            .get(height as usize)
            .cloned()
            .ok_or(ChainError::BlockNotFound(height))
    }

    /// Snapshot of every block.
    pub fn blocks(&self) -> Vec<Block> {
        self.blocks.read().clone()
    }

    /// Look up a transaction by hash: the pool first, then the blocks.
    pub fn transaction_by_hash(&self, hash: &[u8; 32]) -> Option<Transaction> {
        if let Some(tx) = self.mempool.get(hash) {
            return Some(tx);
        }
        let blocks = self.blocks.read();
        blocks
            .iter()
            .flat_map(|b| b.transactions.iter())
            .find(|tx| &tx.hash == hash)
            .cloned()
    }

    /// Snapshot of the pending transactions.
    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.mempool.get_all()
    }

    /// Number of pending transactions.
    pub fn pending_count(&self) -> usize {
        self.mempool.size()
    }
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
