/// Refresh Token Store
///
/// Opaque refresh token generation, persistence, rotation, and revocation.
/// Refresh tokens are:
/// - Cryptographically random 64-character strings (no predictable seed)
/// - Hashed with SHA-256 before storage (never store plaintext)
/// - One live token per user id: issuing replaces any prior record
/// - One-time-use: a successful consume atomically rotates the stored value

use chrono::{Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use std::fmt;

/// Why a consume attempt was refused
///
/// Kept separate from the outward error surface: callers collapse all three
/// session variants into one "invalid token" response so an attacker cannot
/// probe session existence, but logs keep the distinction.
#[derive(Debug)]
pub enum SessionStoreError {
    /// No refresh-token record exists for the user id
    NoSuchSession,
    /// A record exists but the presented token is not the live one
    /// (superseded by rotation, or never valid)
    Mismatch,
    /// The live record has passed its expiry instant
    Expired,
    /// The store itself failed; retryable, unlike the variants above
    Database(sqlx::Error),
}

impl fmt::Display for SessionStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStoreError::NoSuchSession => write!(f, "no session for user"),
            SessionStoreError::Mismatch => write!(f, "presented token does not match"),
            SessionStoreError::Expired => write!(f, "refresh token expired"),
            SessionStoreError::Database(e) => write!(f, "session store error: {}", e),
        }
    }
}

impl std::error::Error for SessionStoreError {}

impl From<sqlx::Error> for SessionStoreError {
    fn from(err: sqlx::Error) -> Self {
        SessionStoreError::Database(err)
    }
}

/// Generate a new cryptographically random refresh token
///
/// 64 alphanumeric characters drawn from the thread-local CSPRNG, well over
/// 256 bits of entropy. The plaintext goes to the client; the server keeps
/// only the SHA-256 hash.
pub fn generate_refresh_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// Hash a refresh token for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Issue a refresh token for a user, replacing any prior one
///
/// The upsert keyed on user id enforces single-active-session-per-user:
/// whatever token was live before this call is permanently unusable after
/// it.
///
/// # Returns
/// The plaintext token to hand to the client
pub async fn issue_refresh_token(
    pool: &PgPool,
    user_id: i32,
    expiry_seconds: i64,
) -> Result<String, SessionStoreError> {
    let token = generate_refresh_token();
    let now = Utc::now();
    let expires_at = now + Duration::seconds(expiry_seconds);

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, token_hash, expires_at, issued_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id)
        DO UPDATE SET token_hash = $2, expires_at = $3, issued_at = $4
        "#,
    )
    .bind(user_id)
    .bind(hash_token(&token))
    .bind(expires_at)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(token)
}

/// Consume a presented refresh token, rotating it on success
///
/// The check and the rotation are one conditional UPDATE, so two concurrent
/// consumes of the same token race at the database row: exactly one commits
/// the rotation, the other matches zero rows and is classified as a
/// mismatch (the stored value has already been superseded).
///
/// # Returns
/// The replacement plaintext token
///
/// # Errors
/// `NoSuchSession`, `Mismatch`, or `Expired`; callers must present all
/// three identically to the client
pub async fn consume_refresh_token(
    pool: &PgPool,
    user_id: i32,
    presented: &str,
    expiry_seconds: i64,
) -> Result<String, SessionStoreError> {
    let presented_hash = hash_token(presented);
    let replacement = generate_refresh_token();
    let now = Utc::now();
    let new_expires_at = now + Duration::seconds(expiry_seconds);

    let rotated = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET token_hash = $3, expires_at = $4, issued_at = $5
        WHERE user_id = $1 AND token_hash = $2 AND expires_at > $5
        "#,
    )
    .bind(user_id)
    .bind(&presented_hash)
    .bind(hash_token(&replacement))
    .bind(new_expires_at)
    .bind(now)
    .execute(pool)
    .await?;

    if rotated.rows_affected() == 1 {
        return Ok(replacement);
    }

    // Zero rows: classify the refusal for the logs. The re-read is advisory
    // only; the rotation above is the single authoritative check.
    let record = sqlx::query_as::<_, (String, chrono::DateTime<Utc>)>(
        "SELECT token_hash, expires_at FROM refresh_tokens WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    match record {
        None => {
            tracing::warn!(user_id = user_id, "Refresh attempt with no stored session");
            Err(SessionStoreError::NoSuchSession)
        }
        Some((stored_hash, _)) if stored_hash != presented_hash => {
            tracing::warn!(
                user_id = user_id,
                "Refresh attempt with superseded or foreign token"
            );
            Err(SessionStoreError::Mismatch)
        }
        Some(_) => {
            tracing::info!(user_id = user_id, "Refresh attempt with expired token");
            Err(SessionStoreError::Expired)
        }
    }
}

/// Revoke a user's refresh token
///
/// Idempotent: revoking an absent session is a no-op success.
pub async fn revoke_refresh_token(pool: &PgPool, user_id: i32) -> Result<(), SessionStoreError> {
    sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    tracing::info!(user_id = user_id, "Refresh token revoked");
    Ok(())
}

/// Revoke every user's refresh token
///
/// One set-based statement; per-row locking only, no process-level lock.
pub async fn revoke_all_refresh_tokens(pool: &PgPool) -> Result<u64, SessionStoreError> {
    let result = sqlx::query("DELETE FROM refresh_tokens")
        .execute(pool)
        .await?;

    let revoked = result.rows_affected();
    tracing::info!(revoked = revoked, "All refresh tokens revoked");
    Ok(revoked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_refresh_token() {
        let token = generate_refresh_token();

        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_alphanumeric()));
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = generate_refresh_token();
        let b = generate_refresh_token();

        assert_ne!(a, b);
    }

    #[test]
    fn test_token_hashing() {
        let token = generate_refresh_token();
        let hash1 = hash_token(&token);
        let hash2 = hash_token(&token);

        // Deterministic, not the plaintext, SHA-256 hex width
        assert_eq!(hash1, hash2);
        assert_ne!(token, hash1);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_tokens_different_hashes() {
        assert_ne!(
            hash_token(&generate_refresh_token()),
            hash_token(&generate_refresh_token())
        );
    }
}
