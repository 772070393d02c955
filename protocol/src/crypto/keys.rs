//! # Key Management & Signatures
//!
//! P-256 ECDSA over the transaction digest. Clients sign the SHA-256
//! transaction hash with their private scalar; the sequencer verifies
//! against the public key bound to the sender address in state.
//!
//! The wire form is deliberately low-tech: the private scalar, the
//! affine public coordinates `(x, y)`, and the signature `(r, s)` all
//! travel as hex strings. No point compression, no DER — the HTTP
//! adapter and the keygen CLI speak the same four hex fields.
//!
//! Keys are generated from the OS RNG. Secret material is never logged.

use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use crate::error::ChainError;

/// A P-256 signing key together with its derived verifying key.
///
/// This is a client-side construct: the sequencer itself never holds
/// private keys. It exists for the keygen/sign CLI and for tests that
/// need to produce valid admissions.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a fresh keypair from the OS cryptographic RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Reconstruct a keypair from a hex-encoded private scalar.
    pub fn from_secret_hex(secret: &str) -> Result<Self, ChainError> {
        let bytes = hex::decode(secret)
            .map_err(|e| ChainError::MalformedRequest(format!("invalid private key hex: {e}")))?;
        let signing_key = SigningKey::from_slice(&bytes)
            .map_err(|_| ChainError::MalformedRequest("invalid P-256 private scalar".into()))?;
        Ok(Self { signing_key })
    }

    /// Hex encoding of the private scalar.
    pub fn secret_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// The verifying (public) key.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key().clone()
    }

    /// The affine public coordinates as `(x, y)` hex strings.
    pub fn public_xy_hex(&self) -> (String, String) {
        verifying_key_xy_hex(&self.verifying_key())
    }

    /// Sign a 32-byte digest, returning the signature scalars `(r, s)`
    /// as big-endian byte arrays.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<([u8; 32], [u8; 32]), ChainError> {
        let signature: Signature = self
            .signing_key
            .sign_prehash(digest)
            .map_err(|e| ChainError::Internal(format!("ECDSA signing failed: {e}")))?;
        let (r, s) = signature.split_bytes();
        Ok((r.into(), s.into()))
    }
}

/// Verify an `(r, s)` signature over a 32-byte digest.
///
/// Returns `false` for any malformed input — a zero scalar, an `(r, s)`
/// pair that is not a valid signature encoding, anything. Verification
/// never errors; it only fails.
pub fn verify_digest(key: &VerifyingKey, digest: &[u8; 32], r: &[u8; 32], s: &[u8; 32]) -> bool {
    let Ok(signature) = Signature::from_scalars(*r, *s) else {
        return false;
    };
    key.verify_prehash(digest, &signature).is_ok()
}

/// Rebuild a verifying key from hex-encoded affine coordinates.
pub fn verifying_key_from_xy(x: &str, y: &str) -> Result<VerifyingKey, ChainError> {
    let x = coordinate_bytes(x, "x")?;
    let y = coordinate_bytes(y, "y")?;
    let point = p256::EncodedPoint::from_affine_coordinates(
        p256::FieldBytes::from_slice(&x),
        p256::FieldBytes::from_slice(&y),
        false,
    );
    VerifyingKey::from_encoded_point(&point)
        .map_err(|_| ChainError::MalformedRequest("public key is not a point on P-256".into()))
}

/// The affine coordinates of a verifying key as `(x, y)` hex strings.
pub fn verifying_key_xy_hex(key: &VerifyingKey) -> (String, String) {
    let point = key.to_encoded_point(false);
    // An uncompressed SEC1 point always carries both coordinates.
    let x = point.x().map(hex::encode).unwrap_or_default();
    let y = point.y().map(hex::encode).unwrap_or_default();
    (x, y)
}

/// Decode a hex coordinate into a left-padded 32-byte array. Accepts
/// shorter encodings (leading zeros stripped), rejects anything longer.
fn coordinate_bytes(hex_str: &str, name: &str) -> Result<[u8; 32], ChainError> {
    let padded = if hex_str.len() % 2 == 1 {
        format!("0{hex_str}")
    } else {
        hex_str.to_string()
    };
    let bytes = hex::decode(&padded)
        .map_err(|e| ChainError::MalformedRequest(format!("invalid {name} coordinate hex: {e}")))?;
    if bytes.len() > 32 {
        return Err(ChainError::MalformedRequest(format!(
            "{name} coordinate exceeds 32 bytes"
        )));
    }
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(out)
}

/// Decode a hex-encoded signature scalar into a left-padded 32-byte
/// array. Same rules as coordinates.
pub fn scalar_bytes(hex_str: &str, name: &str) -> Result<[u8; 32], ChainError> {
    coordinate_bytes(hex_str, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::sha256;

    #[test]
    fn sign_verify_round_trip() {
        let kp = Keypair::generate();
        let digest = sha256(b"transfer 100 from 01 to 02");

        let (r, s) = kp.sign_digest(&digest).unwrap();
        assert!(verify_digest(&kp.verifying_key(), &digest, &r, &s));
    }

    #[test]
    fn wrong_key_fails() {
        let kp = Keypair::generate();
        let other = Keypair::generate();
        let digest = sha256(b"payload");

        let (r, s) = kp.sign_digest(&digest).unwrap();
        assert!(!verify_digest(&other.verifying_key(), &digest, &r, &s));
    }

    #[test]
    fn mutated_digest_fails() {
        let kp = Keypair::generate();
        let digest = sha256(b"payload");
        let (r, s) = kp.sign_digest(&digest).unwrap();

        let tampered = sha256(b"payl0ad");
        assert!(!verify_digest(&kp.verifying_key(), &tampered, &r, &s));
    }

    #[test]
    fn zero_scalars_never_verify() {
        let kp = Keypair::generate();
        let digest = sha256(b"payload");
        assert!(!verify_digest(&kp.verifying_key(), &digest, &[0u8; 32], &[0u8; 32]));
    }

    #[test]
    fn secret_hex_round_trip() {
        let kp = Keypair::generate();
        let restored = Keypair::from_secret_hex(&kp.secret_hex()).unwrap();

        let digest = sha256(b"same key, same signatures verify");
        let (r, s) = restored.sign_digest(&digest).unwrap();
        assert!(verify_digest(&kp.verifying_key(), &digest, &r, &s));
    }

    #[test]
    fn public_key_xy_round_trip() {
        let kp = Keypair::generate();
        let (x, y) = kp.public_xy_hex();
        let restored = verifying_key_from_xy(&x, &y).unwrap();
        assert_eq!(restored, kp.verifying_key());
    }

    #[test]
    fn rejects_off_curve_point() {
        // (1, 1) is not on P-256.
        let result = verifying_key_from_xy("01", "01");
        assert!(result.is_err());
    }

    #[test]
    fn coordinate_padding_accepts_short_hex() {
        let bytes = coordinate_bytes("ff", "x").unwrap();
        assert_eq!(bytes[31], 0xff);
        assert!(bytes[..31].iter().all(|b| *b == 0));
    }

    #[test]
    fn coordinate_rejects_oversized_hex() {
        let long = "ff".repeat(33);
        assert!(coordinate_bytes(&long, "x").is_err());
    }
}
