/// Identity/session core.
///
/// Access tokens are short-lived signed JWTs; refresh credentials are
/// opaque `jti.secret` pairs that rotate on every use. The modules map
/// onto the moving parts: issuer (mint/verify), ledger (durable refresh
/// records), rotation (the single-use exchange), session (the façade
/// handlers call), store (user lookup), password (credential hashing).

mod claims;
mod issuer;
mod ledger;
mod password;
mod rotation;
mod session;
mod store;

pub use claims::Claims;
pub use issuer::parse_raw_credential;
pub use issuer::RefreshCredential;
pub use issuer::TokenIssuer;
pub use issuer::TokenVerifyError;
pub use ledger::PgRefreshTokenLedger;
pub use ledger::RefreshTokenLedger;
pub use ledger::RefreshTokenRecord;
pub use password::hash_password;
pub use password::verify_password;
pub use session::AuthenticatedUser;
pub use session::SessionService;
pub use session::SessionTokens;
pub use store::CredentialStore;
pub use store::PgCredentialStore;
pub use store::User;
