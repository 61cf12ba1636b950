/// Authentication routes.
///
/// Thin transport layer over the session façade: handlers validate
/// input shape, apply per-IP rate limits, and translate
/// `SessionTokens` into the JSON body. All rotation and revocation
/// logic lives behind the façade.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthenticatedUser, SessionService, SessionTokens};
use crate::error::AppError;
use crate::security::AuthRateLimits;
use crate::validators::{is_valid_email, is_valid_name};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

/// Credential pair response. Clients store the two tokens separately;
/// the refresh token outlives the access token by design.
#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl From<SessionTokens> for AuthResponse {
    fn from(tokens: SessionTokens) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: tokens.expires_in,
        }
    }
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
}

#[derive(Serialize)]
pub struct RevokeAllResponse {
    pub revoked: u64,
}

fn client_ip(req: &HttpRequest) -> String {
    req.connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string()
}

/// POST /auth/register
///
/// Create a user and hand back their first session.
///
/// # Errors
/// - 400: invalid email, name, or password shape
/// - 409: email already registered
pub async fn register(
    form: web::Json<RegisterRequest>,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;
    let name = is_valid_name(&form.name)?;

    let (_user, tokens) = sessions.register(&email, &name, &form.password).await?;

    Ok(HttpResponse::Created().json(AuthResponse::from(tokens)))
}

/// POST /auth/login
///
/// Verify credentials and issue a fresh access+refresh pair. Unknown
/// email and wrong password produce the same 401.
///
/// # Errors
/// - 400: invalid email format
/// - 401: invalid credentials
/// - 429: rate limited
pub async fn login(
    req: HttpRequest,
    form: web::Json<LoginRequest>,
    sessions: web::Data<SessionService>,
    limits: web::Data<AuthRateLimits>,
) -> Result<HttpResponse, AppError> {
    if !limits.login.check(&format!("auth:login:{}", client_ip(&req))) {
        return Err(AppError::RateLimited);
    }

    let email = is_valid_email(&form.email)?;
    let tokens = sessions.login(&email, &form.password).await?;

    Ok(HttpResponse::Ok().json(AuthResponse::from(tokens)))
}

/// POST /auth/refresh
///
/// Rotate a refresh credential: the presented token is spent whether or
/// not the caller receives the response. A 401 here means the client
/// must fall back to a full re-login, never retry.
///
/// # Errors
/// - 401: malformed, unknown, expired, revoked, or replayed credential
/// - 429: rate limited
pub async fn refresh(
    req: HttpRequest,
    form: web::Json<RefreshRequest>,
    sessions: web::Data<SessionService>,
    limits: web::Data<AuthRateLimits>,
) -> Result<HttpResponse, AppError> {
    if !limits
        .refresh
        .check(&format!("auth:refresh:{}", client_ip(&req)))
    {
        return Err(AppError::RateLimited);
    }

    let tokens = sessions.refresh(&form.refresh_token).await?;

    Ok(HttpResponse::Ok().json(AuthResponse::from(tokens)))
}

/// POST /auth/logout
///
/// Revoke the presented refresh credential. Idempotent: logging out an
/// already-dead or malformed token still returns 200.
pub async fn logout(
    form: web::Json<LogoutRequest>,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    sessions.logout(&form.refresh_token).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Logged out" })))
}

/// POST /auth/logout_all
///
/// Revoke every refresh token the authenticated user holds, across all
/// devices. Requires a valid access token.
pub async fn logout_all(
    user: web::ReqData<AuthenticatedUser>,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let revoked = sessions.revoke_all(user.id).await?;

    Ok(HttpResponse::Ok().json(RevokeAllResponse { revoked }))
}

/// GET /auth/me
///
/// Identity carried by the verified access token. No storage access:
/// the token itself is the authority for its validity window.
pub async fn get_current_user(
    user: web::ReqData<AuthenticatedUser>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(UserResponse {
        id: user.id.to_string(),
        email: user.email.clone(),
    }))
}
