//! End-to-end pipeline: admission → block build → proof verification →
//! chain growth. One flow, exercised the way the running sequencer
//! exercises it, so the cross-layer contracts (admission order, state
//! application vs. circuit, blob round-trip) are checked together
//! rather than module by module.

use std::sync::Arc;

use zkrollup_protocol::chain::Blockchain;
use zkrollup_protocol::crypto::keys::Keypair;
use zkrollup_protocol::error::ChainError;
use zkrollup_protocol::transaction::{Transaction, TxSignature, TxStatus};
use zkrollup_protocol::zkp;

const A1: &str = "0000000000000000000000000000000000000001";
const A2: &str = "0000000000000000000000000000000000000002";
const A3: &str = "0000000000000000000000000000000000000003";

fn admit(chain: &Blockchain, kp: &Keypair, from: &str, to: &str, value: u64, nonce: u64) {
    chain.state().bind_public_key(from, kp.verifying_key());
    let mut tx = Transaction::new(from.into(), to.into(), value, nonce, 0, TxSignature::default());
    tx.sign(kp).expect("signing");
    chain.add_transaction(tx).expect("admission");
}

#[test]
fn sequencer_pipeline_end_to_end() {
    let chain = Arc::new(Blockchain::new());
    let key1 = Keypair::generate();
    let key2 = Keypair::generate();

    // ---- Block 1: a single transfer ------------------------------------

    admit(&chain, &key1, A1, A2, 100, 0);
    assert_eq!(chain.pending_count(), 1);

    let block1 = chain.create_block().expect("block 1");

    assert_eq!(chain.balance(A1), 999_900);
    assert_eq!(chain.balance(A2), 500_100);
    assert_eq!(chain.nonce(A1), 1);
    assert_eq!(block1.header.height, 1);
    assert_eq!(block1.header.tx_count, 1);
    assert!(block1.transactions.iter().all(|tx| tx.status == TxStatus::Confirmed));
    assert_eq!(chain.pending_count(), 0);

    // The proof blob round-trips through its JSON wire form.
    let blob = chain.latest_proof().expect("blob for block 1");
    assert_eq!(blob.new_state_root, block1.header.state_root);
    let json = blob.to_json().expect("blob json");
    zkp::verify_proof(&json).expect("block 1 proof verifies");

    // A corrupted blob does not.
    let mut tampered = blob.clone();
    let mut chars: Vec<char> = tampered.proof.chars().collect();
    chars[5] = if chars[5] == 'A' { 'B' } else { 'A' };
    tampered.proof = chars.into_iter().collect();
    assert!(matches!(
        zkp::verifier::verify_blob(&tampered),
        Err(ChainError::InvalidProof(_))
    ));

    // ---- Block 2: two transfers from distinct senders ------------------

    admit(&chain, &key1, A1, A3, 400, 1);
    admit(&chain, &key2, A2, A3, 50, 0);

    let block2 = chain.create_block().expect("block 2");

    assert_eq!(block2.header.height, 2);
    assert_eq!(block2.header.tx_count, 2);
    assert_eq!(block2.header.prev_hash, block1.hash());

    assert_eq!(chain.balance(A1), 999_500);
    assert_eq!(chain.balance(A2), 500_050);
    assert_eq!(chain.balance(A3), 300_450);
    assert_eq!(chain.nonce(A1), 2);
    assert_eq!(chain.nonce(A2), 1);

    let blob2 = chain.latest_proof().expect("blob for block 2");
    assert_eq!(blob2.old_state_root, block1.header.state_root);
    assert_eq!(blob2.new_state_root, block2.header.state_root);
    zkp::verify_proof(&blob2.to_json().unwrap()).expect("block 2 proof verifies");

    // ---- Chain-wide invariants -----------------------------------------

    // Every block links to its parent's header hash.
    let blocks = chain.blocks();
    for pair in blocks.windows(2) {
        assert_eq!(pair[1].header.prev_hash, pair[0].hash());
    }

    // Every block passes the transport recheck.
    for block in &blocks {
        chain.verify_block(block).expect("block verifies");
    }

    // Confirmed transactions resolve by hash; the mempool stays empty.
    for tx in blocks.iter().flat_map(|b| b.transactions.iter()) {
        let found = chain.transaction_by_hash(&tx.hash).expect("tx lookup");
        assert_eq!(found.status, TxStatus::Confirmed);
    }
    assert_eq!(chain.pending_count(), 0);
}

#[test]
fn admission_failures_leave_no_trace() {
    let chain = Blockchain::new();
    let kp = Keypair::generate();
    chain.state().bind_public_key(A1, kp.verifying_key());

    // Overdraw.
    let mut tx = Transaction::new(A1.into(), A2.into(), 2_000_000, 0, 0, TxSignature::default());
    tx.sign(&kp).unwrap();
    assert!(matches!(
        chain.add_transaction(tx),
        Err(ChainError::InsufficientBalance { .. })
    ));

    // Future nonce.
    let mut tx = Transaction::new(A1.into(), A2.into(), 100, 3, 0, TxSignature::default());
    tx.sign(&kp).unwrap();
    assert!(matches!(
        chain.add_transaction(tx),
        Err(ChainError::NonceMismatch { expected: 0, got: 3 })
    ));

    // Nothing queued, nothing moved, no block possible.
    assert_eq!(chain.pending_count(), 0);
    assert_eq!(chain.balance(A1), 1_000_000);
    assert!(matches!(chain.create_block(), Err(ChainError::NoTransactions)));
    assert_eq!(chain.height(), 1);
}
