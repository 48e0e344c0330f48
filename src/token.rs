use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use time::OffsetDateTime;

type HmacSha256 = Hmac<Sha256>;

/// Claims carried inside a bearer token
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Claims {
    /// Username of the authenticated user
    pub sub: String,
    /// Issued-at, unix seconds
    pub iat: i64,
    /// Expiry, unix seconds
    pub exp: i64,
}

#[derive(Debug, PartialEq, Eq)]
pub enum TokenError {
    Malformed,
    Signature,
    Expired,
}

/// Issues and validates HMAC-SHA256 signed bearer tokens.
///
/// A token is `base64url(claims_json) "." base64url(hmac(claims_json))`.
/// There is no refresh, revocation, or key rotation; a token is valid
/// until its expiry or not at all.
#[derive(Clone)]
pub struct TokenKeeper {
    secret: Arc<Vec<u8>>,
    expiry_hours: i64,
}

impl TokenKeeper {
    pub fn new(secret: &str, expiry_hours: i64) -> Self {
        Self {
            secret: Arc::new(secret.as_bytes().to_vec()),
            expiry_hours,
        }
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length, so new_from_slice cannot fail here
        HmacSha256::new_from_slice(&self.secret).expect("HMAC key of any length is valid")
    }

    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = self.mac();
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }

    /// Issue a token for `username`, expiring `expiry_hours` from now.
    pub fn issue(&self, username: &str) -> String {
        self.issue_at(username, OffsetDateTime::now_utc().unix_timestamp())
    }

    /// Issue a token with an explicit issue time (unix seconds).
    pub fn issue_at(&self, username: &str, now: i64) -> String {
        let claims = Claims {
            sub: username.to_string(),
            iat: now,
            exp: now + self.expiry_hours * 3600,
        };
        // Claims contain only strings and integers, serialization cannot fail
        let payload = serde_json::to_vec(&claims).unwrap_or_default();
        let signature = self.sign(&payload);
        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(signature)
        )
    }

    /// Verify signature and expiry, returning the claims on success.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, OffsetDateTime::now_utc().unix_timestamp())
    }

    /// Verify against an explicit current time (unix seconds).
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let (payload_b64, signature_b64) =
            token.split_once('.').ok_or(TokenError::Malformed)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Malformed)?;

        let mut mac = self.mac();
        mac.update(&payload);
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::Signature)?;

        let claims: Claims =
            serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

        if claims.exp <= now {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}
