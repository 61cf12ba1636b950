/// Token issuer: mints and verifies the two credential types.
///
/// Access tokens are HS256-signed JWTs. Refresh credentials are opaque
/// `jti.secret` pairs: a 128-bit public identifier and a 256-bit secret,
/// both hex-encoded. Only a bcrypt hash of the secret is ever stored;
/// possession of the raw secret is required in addition to a matching
/// jti.

use bcrypt::DEFAULT_COST;
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{thread_rng, Rng};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

/// Access-token verification failures, distinguished so callers can
/// log or message them differently. The session façade maps both to
/// `Unauthenticated`.
#[derive(Debug, PartialEq, Eq)]
pub enum TokenVerifyError {
    Expired,
    InvalidSignature,
}

/// A freshly minted refresh credential. The `secret` field exists in
/// plaintext only here, on its way to the client.
pub struct RefreshCredential {
    pub jti: String,
    pub secret: String,
}

impl RefreshCredential {
    /// The externally visible form: `jti + "." + secret`.
    pub fn raw(&self) -> String {
        format!("{}.{}", self.jti, self.secret)
    }
}

/// Split a raw refresh credential into its `(jti, secret)` halves.
///
/// Fails with `MalformedToken` before any storage access when the
/// separator or structure is wrong.
pub fn parse_raw_credential(raw: &str) -> Result<(&str, &str), AuthError> {
    let mut parts = raw.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(jti), Some(secret), None) if !jti.is_empty() && !secret.is_empty() => {
            Ok((jti, secret))
        }
        _ => Err(AuthError::MalformedToken),
    }
}

#[derive(Clone)]
pub struct TokenIssuer {
    settings: JwtSettings,
}

impl TokenIssuer {
    pub fn new(settings: JwtSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &JwtSettings {
        &self.settings
    }

    /// Mint a signed access token for a user. Pure function of inputs,
    /// server secret, and clock; no storage involved.
    pub fn mint_access_token(&self, user_id: &Uuid, email: &str) -> Result<String, AppError> {
        let claims = Claims::new(
            *user_id,
            email.to_string(),
            self.settings.access_token_expiry,
            self.settings.issuer.clone(),
        );

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.settings.secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("token generation failed: {}", e)))
    }

    /// Verify an access token's signature, expiry, and issuer.
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, TokenVerifyError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.settings.issuer]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.settings.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenVerifyError::Expired,
            _ => TokenVerifyError::InvalidSignature,
        })
    }

    /// Mint a new refresh credential: two independent random values with
    /// cryptographic-quality entropy. Does not touch storage.
    pub fn mint_refresh_credential() -> RefreshCredential {
        let mut rng = thread_rng();
        let jti: [u8; 16] = rng.gen();
        let secret: [u8; 32] = rng.gen();
        RefreshCredential {
            jti: hex::encode(jti),
            secret: hex::encode(secret),
        }
    }

    /// Hash a refresh secret with bcrypt.
    ///
    /// Refresh secrets must resist offline brute force exactly like
    /// passwords, so they get a slow salted hash, not SHA-256.
    pub fn hash_secret(&self, secret: &str) -> Result<String, AppError> {
        bcrypt::hash(secret, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("secret hashing failed: {}", e)))
    }

    /// Check a presented refresh secret against its stored hash.
    pub fn verify_secret(&self, secret: &str, secret_hash: &str) -> Result<bool, AppError> {
        bcrypt::verify(secret, secret_hash)
            .map_err(|e| AppError::Internal(format!("secret verification failed: {}", e)))
    }
}
