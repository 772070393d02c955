//! # External Ledger Adapter
//!
//! After every appended block the sequencer ships the proof blob to an
//! external distributed ledger through an HTTP gateway, where a
//! contract re-verifies and stores it. Exactly two gateway operations
//! exist: `VerifySaveProof(id, blob)` and `GetAllProof()`. Submission
//! ids increase monotonically per sequencer process.
//!
//! This is an interface-only adapter by design: the block builder calls
//! it fire-and-forget from a detached thread, logs failures, and never
//! lets the ledger's availability decide whether a block stands. The
//! gateway authenticates with a bearer token (the identity-wallet side
//! of the gateway is its problem, not ours).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::ChainError;

/// HTTP timeout for gateway calls. Submission runs off the hot path,
/// but a hung gateway should not pin threads forever.
const GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the external ledger gateway.
pub struct LedgerClient {
    base_url: String,
    auth_token: Option<String>,
    next_id: AtomicU64,
    http: reqwest::blocking::Client,
}

impl LedgerClient {
    /// Build a client for the gateway at `base_url` (no trailing
    /// slash), optionally authenticating with a bearer token.
    pub fn new(base_url: &str, auth_token: Option<String>) -> Result<Self, ChainError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(GATEWAY_TIMEOUT)
            .build()
            .map_err(|e| ChainError::Internal(format!("http client construction: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
            next_id: AtomicU64::new(1),
            http,
        })
    }

    /// Submit a proof blob for verification and storage. Returns the
    /// submission id assigned to it.
    pub fn verify_save_proof(&self, blob_json: &str) -> Result<u64, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let url = format!("{}/proofs/{}", self.base_url, id);
        debug!(id, url = %url, "submitting proof blob");

        let mut request = self
            .http
            .post(&url)
            .header("content-type", "application/json")
            .body(blob_json.to_string());
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .map_err(|e| ChainError::LedgerSubmission(format!("gateway unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(ChainError::LedgerSubmission(format!(
                "gateway returned {} for proof {}",
                response.status(),
                id
            )));
        }

        info!(id, "proof accepted by ledger gateway");
        Ok(id)
    }

    /// Fetch every stored proof from the gateway, as raw JSON.
    pub fn get_all_proofs(&self) -> Result<String, ChainError> {
        let url = format!("{}/proofs", self.base_url);

        let mut request = self.http.get(&url);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .map_err(|e| ChainError::LedgerSubmission(format!("gateway unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(ChainError::LedgerSubmission(format!(
                "gateway returned {}",
                response.status()
            )));
        }

        response
            .text()
            .map_err(|e| ChainError::LedgerSubmission(format!("unreadable gateway response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_normalized() {
        let client = LedgerClient::new("http://localhost:9999/", None).unwrap();
        assert_eq!(client.base_url, "http://localhost:9999");
    }

    #[test]
    fn submission_ids_increase_monotonically() {
        // No gateway is listening on this port; both calls fail, but
        // each one consumes a fresh id.
        let client = LedgerClient::new("http://127.0.0.1:1", None).unwrap();
        assert!(client.verify_save_proof("{}").is_err());
        assert!(client.verify_save_proof("{}").is_err());
        assert_eq!(client.next_id.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn unreachable_gateway_is_a_submission_error() {
        let client = LedgerClient::new("http://127.0.0.1:1", None).unwrap();
        assert!(matches!(
            client.verify_save_proof("{}"),
            Err(ChainError::LedgerSubmission(_))
        ));
        assert!(matches!(
            client.get_all_proofs(),
            Err(ChainError::LedgerSubmission(_))
        ));
    }
}
