// Not every test binary uses every fixture.
#![allow(dead_code)]

/// Shared test fixtures: in-memory implementations of the credential
/// store and the refresh-token ledger, plus a session service wired to
/// them. The ledger mirrors the Postgres semantics, including the
/// compare-and-set revoke.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use riseup_auth::auth::{
    hash_password, CredentialStore, RefreshTokenLedger, RefreshTokenRecord, SessionService,
    TokenIssuer, User,
};
use riseup_auth::configuration::JwtSettings;
use riseup_auth::error::AppError;

#[derive(Default)]
pub struct InMemoryCredentialStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryCredentialStore {
    pub fn deactivate(&self, id: Uuid) {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.get_mut(&id) {
            user.is_active = false;
        }
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = self.users.lock().unwrap();
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let users = self.users.lock().unwrap();
        Ok(users.get(&id).cloned())
    }

    async fn insert(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<User, AppError> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == email) {
            return Err(AppError::Storage(
                riseup_auth::error::StorageError::UniqueViolation(
                    "email already registered".to_string(),
                ),
            ));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            password_hash: password_hash.to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[derive(Default)]
pub struct InMemoryRefreshTokenLedger {
    records: Mutex<HashMap<String, RefreshTokenRecord>>,
}

impl InMemoryRefreshTokenLedger {
    /// Count of rows, dead or alive; revocation must retain them.
    pub fn total_records(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Insert a record directly, e.g. one that is already expired.
    pub fn seed(&self, record: RefreshTokenRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.jti.clone(), record);
    }
}

#[async_trait]
impl RefreshTokenLedger for InMemoryRefreshTokenLedger {
    async fn create(
        &self,
        owner: Uuid,
        jti: &str,
        secret_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord, AppError> {
        let record = RefreshTokenRecord {
            jti: jti.to_string(),
            secret_hash: secret_hash.to_string(),
            owner,
            expires_at,
            revoked: false,
            created_at: Utc::now(),
        };
        self.records
            .lock()
            .unwrap()
            .insert(jti.to_string(), record.clone());
        Ok(record)
    }

    async fn find_active_by_jti(&self, jti: &str) -> Result<Option<RefreshTokenRecord>, AppError> {
        let records = self.records.lock().unwrap();
        Ok(records
            .get(jti)
            .filter(|r| !r.revoked && r.expires_at > Utc::now())
            .cloned())
    }

    async fn revoke(&self, jti: &str) -> Result<bool, AppError> {
        // Holding the map lock makes the read-check-write indivisible,
        // matching the Postgres conditional UPDATE.
        let mut records = self.records.lock().unwrap();
        match records.get_mut(jti) {
            Some(record) if !record.revoked => {
                record.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_all_for_owner(&self, owner: Uuid) -> Result<u64, AppError> {
        let mut records = self.records.lock().unwrap();
        let mut count = 0;
        for record in records.values_mut() {
            if record.owner == owner && !record.revoked {
                record.revoked = true;
                count += 1;
            }
        }
        Ok(count)
    }
}

pub fn test_jwt_settings() -> JwtSettings {
    JwtSettings {
        secret: "test-secret-key-at-least-32-characters-long".to_string(),
        access_token_expiry: 3600,
        refresh_token_expiry: 604800,
        issuer: "test".to_string(),
    }
}

pub struct TestHarness {
    pub sessions: SessionService,
    pub users: Arc<InMemoryCredentialStore>,
    pub ledger: Arc<InMemoryRefreshTokenLedger>,
}

pub fn test_harness() -> TestHarness {
    let users = Arc::new(InMemoryCredentialStore::default());
    let ledger = Arc::new(InMemoryRefreshTokenLedger::default());
    let sessions = SessionService::new(
        users.clone(),
        ledger.clone(),
        TokenIssuer::new(test_jwt_settings()),
    );
    TestHarness {
        sessions,
        users,
        ledger,
    }
}

/// Register a user directly through the store and return their id.
pub async fn seed_user(harness: &TestHarness, email: &str, password: &str) -> Uuid {
    let password_hash = hash_password(password).expect("Failed to hash password");
    harness
        .users
        .insert(email, "Test User", &password_hash)
        .await
        .expect("Failed to insert user")
        .id
}
