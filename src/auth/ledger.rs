/// Refresh token ledger: durable storage and lookup of refresh-token
/// records, with strict consistency on the revoke transition.
///
/// The ledger is the single source of truth for the `revoked` flag and
/// the only shared mutable state in the session core. Its `revoke` is
/// an atomic compare-and-set, which is the sole serialization point
/// that makes rotation at-most-once per jti.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

/// One refresh-token record. Rows are created at login or rotation,
/// mutated exactly once (the revoked flag), and never deleted by the
/// core.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    /// Public lookup key; random, unique, not a credential by itself.
    pub jti: String,
    /// bcrypt hash of the refresh secret. The plaintext secret is never
    /// stored or logged.
    pub secret_hash: String,
    /// User this token authenticates.
    pub owner: Uuid,
    pub expires_at: DateTime<Utc>,
    /// Monotonic false-to-true; never reset.
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait RefreshTokenLedger: Send + Sync {
    /// Persist a new record for `owner`.
    async fn create(
        &self,
        owner: Uuid,
        jti: &str,
        secret_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord, AppError>;

    /// Look up a record that is neither revoked nor expired.
    ///
    /// Revoked and expired rows are physically retained for audit but
    /// treated identically to "not found" here.
    async fn find_active_by_jti(&self, jti: &str) -> Result<Option<RefreshTokenRecord>, AppError>;

    /// Atomically flip `revoked` from false to true.
    ///
    /// Returns true only if this call performed the transition. Of N
    /// concurrent callers on the same jti, exactly one sees true; the
    /// losers must not proceed as if they owned the token.
    async fn revoke(&self, jti: &str) -> Result<bool, AppError>;

    /// Revoke every active record for `owner`; returns how many rows
    /// were flipped. Used by logout-everywhere and password-change
    /// flows.
    async fn revoke_all_for_owner(&self, owner: Uuid) -> Result<u64, AppError>;
}

/// Postgres-backed ledger over the `refresh_tokens` table.
#[derive(Clone)]
pub struct PgRefreshTokenLedger {
    pool: PgPool,
}

impl PgRefreshTokenLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenLedger for PgRefreshTokenLedger {
    async fn create(
        &self,
        owner: Uuid,
        jti: &str,
        secret_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord, AppError> {
        let created_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, jti, user_id, secret_hash, expires_at, revoked, created_at)
            VALUES ($1, $2, $3, $4, $5, false, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(jti)
        .bind(owner)
        .bind(secret_hash)
        .bind(expires_at)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(RefreshTokenRecord {
            jti: jti.to_string(),
            secret_hash: secret_hash.to_string(),
            owner,
            expires_at,
            revoked: false,
            created_at,
        })
    }

    async fn find_active_by_jti(&self, jti: &str) -> Result<Option<RefreshTokenRecord>, AppError> {
        let row = sqlx::query_as::<_, (String, String, Uuid, DateTime<Utc>, bool, DateTime<Utc>)>(
            r#"
            SELECT jti, secret_hash, user_id, expires_at, revoked, created_at
            FROM refresh_tokens
            WHERE jti = $1 AND revoked = false AND expires_at > $2
            "#,
        )
        .bind(jti)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(jti, secret_hash, owner, expires_at, revoked, created_at)| {
            RefreshTokenRecord {
                jti,
                secret_hash,
                owner,
                expires_at,
                revoked,
                created_at,
            }
        }))
    }

    async fn revoke(&self, jti: &str) -> Result<bool, AppError> {
        // The `revoked = false` predicate makes this a compare-and-set:
        // a concurrent revoke on the same jti matches zero rows.
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = true, revoked_at = $1
            WHERE jti = $2 AND revoked = false
            "#,
        )
        .bind(Utc::now())
        .bind(jti)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn revoke_all_for_owner(&self, owner: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = true, revoked_at = $1
            WHERE user_id = $2 AND revoked = false
            "#,
        )
        .bind(Utc::now())
        .bind(owner)
        .execute(&self.pool)
        .await?;

        tracing::info!(user_id = %owner, count = result.rows_affected(), "Revoked all refresh tokens for user");
        Ok(result.rows_affected())
    }
}
