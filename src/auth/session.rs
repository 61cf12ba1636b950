/// Session façade: the boundary HTTP handlers talk to.
///
/// Owns the issuer and the injected stores; handlers never reach into
/// the ledger or mint tokens themselves, so expiry policy and rotation
/// logic live in exactly one place.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::issuer::{parse_raw_credential, TokenIssuer, TokenVerifyError};
use crate::auth::ledger::RefreshTokenLedger;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::rotation;
use crate::auth::store::{CredentialStore, User};
use crate::error::{AppError, AuthError};

/// The credential pair handed to a client at login, registration, or
/// refresh. Both are opaque strings to the client.
#[derive(Debug)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Access-token lifetime in seconds.
    pub expires_in: i64,
}

/// Verified identity extracted from an access token. This is all the
/// rest of the application gets to see.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
}

#[derive(Clone)]
pub struct SessionService {
    users: Arc<dyn CredentialStore>,
    ledger: Arc<dyn RefreshTokenLedger>,
    issuer: TokenIssuer,
}

impl SessionService {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        ledger: Arc<dyn RefreshTokenLedger>,
        issuer: TokenIssuer,
    ) -> Self {
        Self {
            users,
            ledger,
            issuer,
        }
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Create a user and issue their first session.
    pub async fn register(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<(User, SessionTokens), AppError> {
        let password_hash = hash_password(password)?;
        let user = self.users.insert(email, name, &password_hash).await?;
        let tokens = self.issue_session(&user).await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok((user, tokens))
    }

    /// Verify credentials and issue a brand-new session. This is token
    /// issuance, not rotation: no existing record is touched.
    ///
    /// Unknown email, wrong password, and deactivated account all fail
    /// with the same `InvalidCredentials`.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionTokens, AppError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials.into());
        }

        let tokens = self.issue_session(&user).await?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(tokens)
    }

    /// Exchange a refresh credential for a new access+refresh pair.
    pub async fn refresh(&self, raw: &str) -> Result<SessionTokens, AppError> {
        let rotated =
            rotation::rotate(&self.issuer, self.ledger.as_ref(), self.users.as_ref(), raw).await?;

        Ok(SessionTokens {
            access_token: rotated.access_token,
            refresh_token: rotated.refresh_token,
            expires_in: self.issuer.settings().access_token_expiry,
        })
    }

    /// Revoke the presented refresh credential.
    ///
    /// Idempotent: a malformed credential or an already-dead token is
    /// not an error. Only storage failures propagate.
    pub async fn logout(&self, raw: &str) -> Result<(), AppError> {
        let jti = match parse_raw_credential(raw) {
            Ok((jti, _secret)) => jti,
            Err(_) => return Ok(()),
        };

        let revoked = self.ledger.revoke(jti).await?;
        if revoked {
            tracing::info!(jti = %jti, "Refresh token revoked on logout");
        }
        Ok(())
    }

    /// Verify an access token and return the identity it proves.
    ///
    /// Pure verification: no storage access. Expired and bad-signature
    /// tokens both come back as `Unauthenticated`.
    pub fn current_user(&self, access_token: &str) -> Result<AuthenticatedUser, AppError> {
        let claims = self.issuer.verify_access_token(access_token).map_err(|e| {
            match e {
                TokenVerifyError::Expired => tracing::debug!("Access token expired"),
                TokenVerifyError::InvalidSignature => {
                    tracing::warn!("Access token failed signature verification")
                }
            }
            AuthError::Unauthenticated
        })?;

        Ok(AuthenticatedUser {
            id: claims.user_id()?,
            email: claims.email,
        })
    }

    /// Invalidate every session for a user (logout-everywhere,
    /// password change). Returns the number of tokens revoked.
    pub async fn revoke_all(&self, user_id: Uuid) -> Result<u64, AppError> {
        self.ledger.revoke_all_for_owner(user_id).await
    }

    async fn issue_session(&self, user: &User) -> Result<SessionTokens, AppError> {
        let access_token = self.issuer.mint_access_token(&user.id, &user.email)?;

        let credential = TokenIssuer::mint_refresh_credential();
        let secret_hash = self.issuer.hash_secret(&credential.secret)?;
        let expires_at = Utc::now() + Duration::seconds(self.issuer.settings().refresh_token_expiry);
        self.ledger
            .create(user.id, &credential.jti, &secret_hash, expires_at)
            .await?;

        Ok(SessionTokens {
            access_token,
            refresh_token: credential.raw(),
            expires_in: self.issuer.settings().access_token_expiry,
        })
    }
}
