/// Rotation engine: the single-use exchange of a refresh credential for
/// a fresh access+refresh pair.
///
/// State machine per token: ACTIVE -> {ROTATED, REVOKED, EXPIRED}.
/// ROTATED and REVOKED share the stored `revoked` flag; EXPIRED is
/// derived from `expires_at`. The ledger's compare-and-set revoke is
/// the serialization point: at most one rotation ever succeeds per
/// issued credential, however many callers race.

use chrono::{Duration, Utc};

use crate::auth::issuer::{parse_raw_credential, TokenIssuer};
use crate::auth::ledger::RefreshTokenLedger;
use crate::auth::store::CredentialStore;
use crate::error::{AppError, AuthError};

pub struct RotatedCredentials {
    pub access_token: String,
    pub refresh_token: String,
}

/// Exchange `raw` for new credentials, permanently retiring the old
/// ones.
///
/// Unknown jti, expired record, already-revoked record, and wrong
/// secret all fail with the same `InvalidOrExpiredToken`; which case
/// occurred must not be observable from outside.
pub async fn rotate(
    issuer: &TokenIssuer,
    ledger: &dyn RefreshTokenLedger,
    users: &dyn CredentialStore,
    raw: &str,
) -> Result<RotatedCredentials, AppError> {
    let (jti, secret) = parse_raw_credential(raw)?;

    let record = ledger
        .find_active_by_jti(jti)
        .await?
        .ok_or(AuthError::InvalidOrExpiredToken)?;

    if !issuer.verify_secret(secret, &record.secret_hash)? {
        tracing::warn!(jti = %record.jti, "Refresh secret mismatch for known jti");
        return Err(AuthError::InvalidOrExpiredToken.into());
    }

    // Claim the token. Losing this compare-and-set means a concurrent
    // rotation or logout got there first; the presented credential is
    // spent either way.
    if !ledger.revoke(&record.jti).await? {
        tracing::warn!(
            jti = %record.jti,
            user_id = %record.owner,
            "Lost rotation race; possible refresh token replay"
        );
        return Err(AuthError::InvalidOrExpiredToken.into());
    }

    // Owner row gone or deactivated: the lineage dies with it.
    let user = users
        .find_by_id(record.owner)
        .await?
        .filter(|u| u.is_active)
        .ok_or(AuthError::InvalidOrExpiredToken)?;

    let replacement = TokenIssuer::mint_refresh_credential();
    let secret_hash = issuer.hash_secret(&replacement.secret)?;
    let expires_at = Utc::now() + Duration::seconds(issuer.settings().refresh_token_expiry);
    ledger
        .create(record.owner, &replacement.jti, &secret_hash, expires_at)
        .await?;

    let access_token = issuer.mint_access_token(&user.id, &user.email)?;

    tracing::info!(
        user_id = %user.id,
        old_jti = %record.jti,
        new_jti = %replacement.jti,
        "Refresh token rotated"
    );

    Ok(RotatedCredentials {
        access_token,
        refresh_token: replacement.raw(),
    })
}
