/// Session Routes
///
/// The session manager: orchestrates the credential verifier, token signer,
/// and refresh-token store into the four public operations (login, refresh,
/// revoke, revoke-all). Holds no mutable state of its own; all session
/// state lives in the refresh-token store.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::{
    consume_refresh_token, decode_expired_token, generate_access_token,
    generate_access_token_from_claims, issue_refresh_token, revoke_all_refresh_tokens,
    revoke_refresh_token, verify_credentials, Claims, SessionStoreError,
};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, ErrorContext, ValidationError};
use crate::validators::is_valid_username;

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Token refresh request: the expired access token plus the live refresh
/// token
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub access_token: String,
    pub refresh_token: String,
}

/// Login response with the token pair and the session's business claims
#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub role: String,
    pub username: String,
    pub user_id: i32,
}

/// Refresh response with the replacement token pair
#[derive(Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Collapse store refusals into the single outward token error; only
/// infrastructure failures keep their own (retryable) shape.
fn store_error(err: SessionStoreError) -> AppError {
    match err {
        SessionStoreError::Database(e) => e.into(),
        _ => AppError::Auth(AuthError::TokenInvalid),
    }
}

/// POST /auth/login
///
/// Authenticate with username and password; returns an access/refresh token
/// pair. Issuing the refresh token overwrites any prior session for the
/// user.
///
/// # Errors
/// - 400: Malformed username
/// - 401: Invalid credentials (same message whether the user is unknown or
///   the password is wrong)
/// - 503: Credential store unavailable
pub async fn login(
    form: web::Json<LoginRequest>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("login");

    let username = is_valid_username(&form.username)?;

    let principal = verify_credentials(pool.get_ref(), &username, &form.password).await?;

    let access_token = generate_access_token(&principal, jwt_config.get_ref())?;
    let refresh_token = issue_refresh_token(
        pool.get_ref(),
        principal.user_id,
        jwt_config.refresh_token_expiry,
    )
    .await
    .map_err(store_error)?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = principal.user_id,
        username = %principal.username,
        "User logged in"
    );

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: jwt_config.access_token_expiry,
        role: principal.role,
        username: principal.username,
        user_id: principal.user_id,
    }))
}

/// POST /auth/refresh
///
/// Exchange an expired access token plus the live refresh token for a new
/// pair. The access token's signature and algorithm are fully verified;
/// only its expiry is ignored. Rotation is one-time-use: after a successful
/// call the presented refresh token is permanently dead.
///
/// # Errors
/// - 400: Any token defect (tampered access token, refresh mismatch, expiry,
///   or no session) — one indistinguishable message for all of them
/// - 503: Session store unavailable
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    // Signature-only check: recover the session claims from the (typically
    // expired) access token. Any signature or algorithm defect is terminal.
    let old_claims = decode_expired_token(&form.access_token, jwt_config.get_ref())
        .map_err(|_| AppError::Auth(AuthError::TokenInvalid))?;
    let principal = old_claims.principal();

    let refresh_token = consume_refresh_token(
        pool.get_ref(),
        principal.user_id,
        &form.refresh_token,
        jwt_config.refresh_token_expiry,
    )
    .await
    .map_err(store_error)?;

    // Fresh jti/iat/exp, same business claims
    let new_claims = Claims::new(
        &principal,
        jwt_config.access_token_expiry,
        jwt_config.issuer.clone(),
        jwt_config.audience.clone(),
    );
    let access_token = generate_access_token_from_claims(&new_claims, jwt_config.get_ref())?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = principal.user_id,
        "Token pair refreshed"
    );

    Ok(HttpResponse::Ok().json(RefreshResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: jwt_config.access_token_expiry,
    }))
}

/// POST /auth/revoke/{username}
///
/// Revoke a user's refresh token. Behind the access-token gate. Idempotent
/// for users without an active session; unknown usernames are a 400.
pub async fn revoke(
    path: web::Path<String>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("revoke");

    let username = is_valid_username(&path.into_inner())?;

    let user_id = sqlx::query_scalar::<_, i32>("SELECT user_id FROM users WHERE username = $1")
        .bind(&username)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| {
            AppError::Validation(ValidationError::InvalidFormat("user name".to_string()))
        })?;

    revoke_refresh_token(pool.get_ref(), user_id)
        .await
        .map_err(store_error)?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = user_id,
        username = %username,
        "Session revoked"
    );

    Ok(HttpResponse::NoContent().finish())
}

/// POST /auth/revoke-all
///
/// Revoke every user's refresh token. Behind the access-token gate.
pub async fn revoke_all(pool: web::Data<PgPool>) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("revoke_all");

    let revoked = revoke_all_refresh_tokens(pool.get_ref())
        .await
        .map_err(store_error)?;

    tracing::info!(
        request_id = %context.request_id,
        revoked = revoked,
        "All sessions revoked"
    );

    Ok(HttpResponse::NoContent().finish())
}
