//! # HTTP API
//!
//! The axum router over the blockchain core. JSON in, JSON out; every
//! response body carries either a `status` field or an `error` field.
//! Status codes follow the propagation policy: admission failures and
//! malformed input are 400, lookup misses are 404, everything else that
//! goes wrong is a 500.
//!
//! ## Endpoints
//!
//! | Method | Path                          | Description                      |
//! |--------|-------------------------------|----------------------------------|
//! | POST   | `/api/v1/transaction/send`    | Admit a signed transfer          |
//! | GET    | `/api/v1/transaction/get`     | Transaction by hash (pool first) |
//! | GET    | `/api/v1/transaction/pool`    | Pending transactions             |
//! | GET    | `/api/v1/balance/get`         | Balance for an address           |
//! | GET    | `/api/v1/account/nonce`       | Next expected nonce              |
//! | GET    | `/api/v1/state/root`          | Current state root               |
//! | GET    | `/api/v1/blocks`              | All blocks, transactions decoded |
//! | POST   | `/api/v1/block/create`        | Manual block build               |
//! | GET    | `/api/v1/chain/info`          | Height and tip hash              |

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use zkrollup_protocol::chain::{Block, Blockchain};
use zkrollup_protocol::config::ADDRESS_HEX_LEN;
use zkrollup_protocol::crypto::keys;
use zkrollup_protocol::error::ChainError;
use zkrollup_protocol::transaction::{Transaction, TxSignature};

// ---------------------------------------------------------------------------
// Application state & router
// ---------------------------------------------------------------------------

/// Shared handler state. Cheap to clone — one `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub chain: Arc<Blockchain>,
}

/// Build the full router with CORS and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/transaction/send", post(send_transaction))
        .route("/api/v1/transaction/get", get(get_transaction))
        .route("/api/v1/transaction/pool", get(get_transaction_pool))
        .route("/api/v1/balance/get", get(get_balance))
        .route("/api/v1/account/nonce", get(get_nonce))
        .route("/api/v1/state/root", get(get_state_root))
        .route("/api/v1/blocks", get(get_blocks))
        .route("/api/v1/block/create", post(create_block))
        .route("/api/v1/chain/info", get(chain_info))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / response DTOs
// ---------------------------------------------------------------------------

/// Body of `POST /api/v1/transaction/send`. Numbers travel as decimal
/// strings; signature scalars and public coordinates as hex.
#[derive(Debug, Deserialize)]
pub struct SendTransactionRequest {
    pub from: String,
    pub to: String,
    pub value: String,
    pub nonce: String,
    pub signature: SignatureRequest,
    #[serde(rename = "publicKey")]
    pub public_key: PublicKeyRequest,
}

#[derive(Debug, Deserialize)]
pub struct SignatureRequest {
    pub r: String,
    pub s: String,
}

#[derive(Debug, Deserialize)]
pub struct PublicKeyRequest {
    pub x: String,
    pub y: String,
}

#[derive(Debug, Deserialize)]
pub struct HashQuery {
    pub hash: String,
}

#[derive(Debug, Deserialize)]
pub struct AddressQuery {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub hash: String,
    pub from: String,
    pub to: String,
    pub value: String,
    pub nonce: u64,
    pub status: String,
    pub timestamp: i64,
}

impl From<&Transaction> for TransactionResponse {
    fn from(tx: &Transaction) -> Self {
        Self {
            hash: tx.hash_hex(),
            from: tx.from.clone(),
            to: tx.to.clone(),
            value: tx.value.to_string(),
            nonce: tx.nonce,
            status: tx.status.to_string(),
            timestamp: tx.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BlockResponse {
    pub height: u64,
    pub hash: String,
    #[serde(rename = "prevHash")]
    pub prev_hash: String,
    #[serde(rename = "merkleRoot")]
    pub merkle_root: String,
    #[serde(rename = "stateRoot")]
    pub state_root: String,
    pub timestamp: i64,
    #[serde(rename = "transactionCount")]
    pub transaction_count: u32,
    pub transactions: Vec<TransactionResponse>,
}

impl From<&Block> for BlockResponse {
    fn from(block: &Block) -> Self {
        Self {
            height: block.header.height,
            hash: block.hash_hex(),
            prev_hash: hex::encode(block.header.prev_hash),
            merkle_root: hex::encode(block.header.merkle_root),
            state_root: block.header.state_root.clone(),
            timestamp: block.header.timestamp,
            transaction_count: block.header.tx_count,
            transactions: block.transactions.iter().map(TransactionResponse::from).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Map a core error onto an HTTP response per the propagation policy.
fn error_response(err: ChainError) -> Response {
    let status = match &err {
        ChainError::MalformedRequest(_)
        | ChainError::MissingSignature
        | ChainError::InvalidSignature
        | ChainError::UnknownSender(_)
        | ChainError::UnknownReceiver(_)
        | ChainError::InsufficientBalance { .. }
        | ChainError::NonceMismatch { .. } => StatusCode::BAD_REQUEST,
        ChainError::TxNotFound(_) | ChainError::BlockNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

fn bad_request(message: impl Into<String>) -> Response {
    error_response(ChainError::MalformedRequest(message.into()))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `POST /api/v1/transaction/send` — parse, bind the sender key on
/// first use, and run the admission protocol.
async fn send_transaction(
    State(state): State<AppState>,
    Json(req): Json<SendTransactionRequest>,
) -> Response {
    let Ok(value) = req.value.parse::<u64>() else {
        return bad_request("invalid value: expected a decimal integer");
    };
    let Ok(nonce) = req.nonce.parse::<u64>() else {
        return bad_request("invalid nonce: expected a decimal integer");
    };

    if let Err(e) = validate_address(&req.from).and_then(|_| validate_address(&req.to)) {
        return error_response(e);
    }

    let r = match keys::scalar_bytes(&req.signature.r, "signature r") {
        Ok(bytes) => bytes,
        Err(e) => return error_response(e),
    };
    let s = match keys::scalar_bytes(&req.signature.s, "signature s") {
        Ok(bytes) => bytes,
        Err(e) => return error_response(e),
    };

    let public_key = match keys::verifying_key_from_xy(&req.public_key.x, &req.public_key.y) {
        Ok(key) => key,
        Err(e) => return error_response(e),
    };

    // First submission binds the key; later submissions must verify
    // against the key already on file.
    state.chain.state().bind_public_key(&req.from, public_key);

    let tx = Transaction::new(
        req.from,
        req.to,
        value,
        nonce,
        chrono::Utc::now().timestamp(),
        TxSignature { r, s },
    );
    let dto = TransactionResponse::from(&tx);

    match state.chain.add_transaction(tx) {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok", "transaction": dto })))
            .into_response(),
        Err(e) => {
            warn!(error = %e, "transaction rejected");
            error_response(e)
        }
    }
}

/// `GET /api/v1/transaction/get?hash=<hex>` — pool first, then blocks.
async fn get_transaction(
    State(state): State<AppState>,
    Query(query): Query<HashQuery>,
) -> Response {
    let Ok(bytes) = hex::decode(&query.hash) else {
        return bad_request("invalid hash format");
    };
    let Ok(hash) = <[u8; 32]>::try_from(bytes.as_slice()) else {
        return bad_request("hash must be 32 bytes of hex");
    };

    match state.chain.transaction_by_hash(&hash) {
        Some(tx) => {
            (StatusCode::OK, Json(json!({ "status": "ok", "transaction": TransactionResponse::from(&tx) })))
                .into_response()
        }
        None => error_response(ChainError::TxNotFound(query.hash)),
    }
}

/// `GET /api/v1/transaction/pool` — pending transactions, FIFO order.
async fn get_transaction_pool(State(state): State<AppState>) -> Response {
    let txs = state.chain.pending_transactions();
    let dtos: Vec<TransactionResponse> = txs.iter().map(TransactionResponse::from).collect();
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "count": dtos.len(), "transactions": dtos })),
    )
        .into_response()
}

/// `GET /api/v1/balance/get?address=<hex>`.
async fn get_balance(State(state): State<AppState>, Query(query): Query<AddressQuery>) -> Response {
    if query.address.is_empty() {
        return bad_request("missing address parameter");
    }
    let balance = state.chain.balance(&query.address);
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "address": query.address, "balance": balance.to_string() })),
    )
        .into_response()
}

/// `GET /api/v1/account/nonce?address=<hex>` — the next expected nonce.
async fn get_nonce(State(state): State<AppState>, Query(query): Query<AddressQuery>) -> Response {
    if query.address.is_empty() {
        return bad_request("missing address parameter");
    }
    let nonce = state.chain.nonce(&query.address);
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "address": query.address, "nonce": nonce })),
    )
        .into_response()
}

/// `GET /api/v1/state/root` — the committed state root (decimal).
async fn get_state_root(State(state): State<AppState>) -> Response {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "stateRoot": state.chain.state_root() })),
    )
        .into_response()
}

/// `GET /api/v1/blocks` — the whole chain with decoded transactions.
async fn get_blocks(State(state): State<AppState>) -> Response {
    let blocks: Vec<BlockResponse> = state.chain.blocks().iter().map(BlockResponse::from).collect();
    (
        StatusCode::OK,
        Json(json!({ "status": "success", "data": { "blocks": blocks } })),
    )
        .into_response()
}

/// `POST /api/v1/block/create` — manual build trigger. Proving is
/// seconds of CPU, so it runs on the blocking pool.
async fn create_block(State(state): State<AppState>) -> Response {
    let chain = Arc::clone(&state.chain);
    let result = tokio::task::spawn_blocking(move || chain.create_block()).await;

    match result {
        Ok(Ok(block)) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "block": BlockResponse::from(&block) })),
        )
            .into_response(),
        Ok(Err(e)) => error_response(e),
        Err(e) => error_response(ChainError::Internal(format!("block build task: {e}"))),
    }
}

/// `GET /api/v1/chain/info` — height and tip hash.
async fn chain_info(State(state): State<AppState>) -> Response {
    let tip = state.chain.tip();
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "height": tip.header.height,
            "latestBlockHash": tip.hash_hex(),
            "timestamp": tip.header.timestamp,
        })),
    )
        .into_response()
}

/// Canonical-address check for the send path: exactly 20 bytes of hex.
fn validate_address(address: &str) -> Result<(), ChainError> {
    if address.len() != ADDRESS_HEX_LEN || hex::decode(address).is_err() {
        return Err(ChainError::MalformedRequest(format!(
            "address {address:?} must be {ADDRESS_HEX_LEN} hex characters"
        )));
    }
    Ok(())
}
