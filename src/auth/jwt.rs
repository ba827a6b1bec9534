/// JWT Token Generation and Validation
///
/// Token signer for access tokens. The signing algorithm is pinned to
/// HS256: a token whose header declares any other algorithm is rejected
/// before signature verification (algorithm-substitution defense).

use jsonwebtoken::{
    decode, decode_header, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};

use crate::auth::claims::Claims;
use crate::auth::credentials::Principal;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

const PINNED_ALGORITHM: Algorithm = Algorithm::HS256;

/// Generate a new access token for a verified principal
///
/// # Errors
/// Returns error if token encoding fails
pub fn generate_access_token(
    principal: &Principal,
    config: &JwtSettings,
) -> Result<String, AppError> {
    let claims = Claims::new(
        principal,
        config.access_token_expiry,
        config.issuer.clone(),
        config.audience.clone(),
    );

    generate_access_token_from_claims(&claims, config)
}

/// Sign a prepared claim set
///
/// The refresh path uses this to mint a token from claims recovered out of
/// an expired access token.
pub fn generate_access_token_from_claims(
    claims: &Claims,
    config: &JwtSettings,
) -> Result<String, AppError> {
    encode(
        &Header::new(PINNED_ALGORITHM),
        claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Validate an access token and extract its claims
///
/// Verifies algorithm pin, signature, issuer, audience, and expiry.
/// Expiry uses strictly-after semantics: a token is rejected only once the
/// current UTC instant is past its declared expiry (no leeway).
///
/// # Errors
/// `AuthError::TokenExpired` if only the expiry check failed,
/// `AuthError::TokenInvalid` for every other defect
pub fn validate_access_token(token: &str, config: &JwtSettings) -> Result<Claims, AppError> {
    decode_token(token, config, true)
}

/// Extract claims from an access token while ignoring expiry
///
/// Used ONLY by the refresh path, to recover the session claims from an
/// access token that has legitimately expired. Signature, algorithm pin,
/// issuer, and audience are still enforced; a tampered token is a hard
/// error regardless of the expiry flag.
pub fn decode_expired_token(token: &str, config: &JwtSettings) -> Result<Claims, AppError> {
    decode_token(token, config, false)
}

fn decode_token(token: &str, config: &JwtSettings, check_expiry: bool) -> Result<Claims, AppError> {
    // Reject any declared algorithm other than the pinned one up front
    let header = decode_header(token).map_err(|e| {
        tracing::warn!("Malformed JWT header: {}", e);
        AppError::Auth(AuthError::TokenInvalid)
    })?;
    if header.alg != PINNED_ALGORITHM {
        tracing::warn!(algorithm = ?header.alg, "Rejected token with unpinned algorithm");
        return Err(AppError::Auth(AuthError::TokenInvalid));
    }

    let mut validation = Validation::new(PINNED_ALGORITHM);
    validation.leeway = 0;
    validation.set_issuer(&[&config.issuer]);
    validation.set_audience(&[&config.audience]);
    validation.validate_exp = check_expiry;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!("JWT validation error: {}", e);
        match e.kind() {
            ErrorKind::ExpiredSignature => AppError::Auth(AuthError::TokenExpired),
            _ => AppError::Auth(AuthError::TokenInvalid),
        }
    })
}
