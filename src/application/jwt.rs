use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, crypto, decode, encode,
    errors::ErrorKind,
};
use rand::{Rng, distributions::Alphanumeric, rngs::OsRng};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::Duration;

use crate::app_error::{AppError, AppResult};

/// The only algorithm tokens are signed and accepted with.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

pub const NONCE_LEN: usize = 32;

/// Byte length of an HS256 MAC.
const SIGNATURE_LEN: usize = 32;

// ============================================================================
// QR Claims
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrClaims {
    pub sub: String, // owner id
    pub nonce: String,
    pub iat: i64,
    pub exp: i64,
}

impl QrClaims {
    /// Build claims for `owner_id` valid from `issued_at` (unix seconds) for `ttl`.
    pub fn issue(owner_id: &str, issued_at: i64, ttl: Duration) -> Self {
        Self {
            sub: owner_id.to_string(),
            nonce: generate_nonce(),
            iat: issued_at,
            exp: issued_at.saturating_add(ttl.whole_seconds()),
        }
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp <= now
    }
}

fn generate_nonce() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

// ============================================================================
// Claim Codec
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("malformed token")]
    Malformed,

    #[error("token signature does not match")]
    BadSignature,

    #[error("token is not signed with the expected algorithm")]
    UnsupportedAlgorithm,
}

/// Signs and verifies QR claims with a shared HMAC secret.
///
/// Verification never rejects on expiry; `exp` is returned as data so the
/// redeemer can still mark the stored token expired.
#[derive(Clone)]
pub struct ClaimCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl ClaimCodec {
    pub fn new(secret: &SecretString) -> AppResult<Self> {
        let raw = secret.expose_secret().as_bytes();
        if raw.is_empty() {
            return Err(AppError::InvalidInput(
                "QR signing key must not be empty".into(),
            ));
        }

        // Pinned algorithm list: the `alg` header of the input is never trusted.
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(raw),
            decoding: DecodingKey::from_secret(raw),
            validation,
        })
    }

    pub fn sign(&self, claims: &QrClaims) -> AppResult<String> {
        encode(&Header::new(SIGNING_ALGORITHM), claims, &self.encoding)
            .map_err(|e| AppError::Internal(e.to_string()))
    }

    pub fn verify(&self, signed_value: &str) -> Result<QrClaims, VerifyError> {
        decode::<QrClaims>(signed_value, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| self.classify(signed_value, &e))
    }

    fn classify(&self, signed_value: &str, err: &jsonwebtoken::errors::Error) -> VerifyError {
        match err.kind() {
            ErrorKind::InvalidSignature => VerifyError::BadSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                VerifyError::UnsupportedAlgorithm
            }
            // The header is parsed before the MAC is checked, so a tampered
            // header surfaces as a decoding error. Check the MAC ourselves.
            ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_)
                if self.mac_mismatch(signed_value) =>
            {
                VerifyError::BadSignature
            }
            _ => VerifyError::Malformed,
        }
    }

    /// `true` when the value has the shape of a signed token but its MAC does
    /// not cover `header.payload`.
    fn mac_mismatch(&self, signed_value: &str) -> bool {
        let Some((message, signature)) = signed_value.rsplit_once('.') else {
            return false;
        };
        if message.split('.').count() != 2 {
            return false;
        }
        let well_formed = URL_SAFE_NO_PAD
            .decode(signature)
            .is_ok_and(|mac| mac.len() == SIGNATURE_LEN);

        well_formed
            && matches!(
                crypto::verify(signature, message.as_bytes(), &self.decoding, SIGNING_ALGORITHM),
                Ok(false)
            )
    }
}

/// Short, non-reversible identifier for a signed value, safe to put in logs.
pub fn token_fingerprint(signed_value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(signed_value.as_bytes());
    let out = hasher.finalize();
    hex::encode(&out[..8])
}
