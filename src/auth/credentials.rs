/// Credential Verification
///
/// Checks a submitted username/secret pair against the stored credential
/// record. "Unknown user" and "wrong password" produce the identical
/// failure, and the unknown-user path still performs a bcrypt comparison
/// against a fixed dummy hash so the two cases take comparable time.

use bcrypt::{hash, verify, DEFAULT_COST};
use sqlx::PgPool;

use crate::error::{AppError, AuthError, ValidationError};

const MAX_PASSWORD_LENGTH: usize = 128;

// Valid bcrypt hash of an unguessable throwaway value; compared against
// when the username does not exist so lookup misses are not cheaper than
// hash mismatches.
const DUMMY_HASH: &str = "$2a$12$R9h/cIPz0gi.URNNX3kh2OPST9/PgBkqquzi.Ss7KIUgO2t0jWMUW";

/// Verified user identity returned by the credential check
///
/// The role travels as an opaque claim; this service never interprets it.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: i32,
    pub username: String,
    pub role: String,
    pub display_name: String,
}

/// Verify a username/secret pair against the credential store
///
/// Read-only; the credential record is owned by account-management flows
/// outside this service.
///
/// # Errors
/// `AuthError::InvalidCredentials` on any mismatch or absent user;
/// `Database` errors when the store itself is unreachable
pub async fn verify_credentials(
    pool: &PgPool,
    username: &str,
    secret: &str,
) -> Result<Principal, AppError> {
    if username.is_empty() || secret.is_empty() {
        return Err(AppError::Auth(AuthError::InvalidCredentials));
    }

    let record = sqlx::query_as::<_, (i32, String, String, String, String)>(
        "SELECT user_id, username, password_hash, role, display_name \
         FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    match record {
        None => {
            // Burn a comparison so a miss costs the same as a mismatch
            let _ = verify(secret, DUMMY_HASH);
            Err(AppError::Auth(AuthError::InvalidCredentials))
        }
        Some((user_id, username, password_hash, role, display_name)) => {
            if verify_secret(secret, &password_hash)? {
                Ok(Principal {
                    user_id,
                    username,
                    role,
                    display_name,
                })
            } else {
                Err(AppError::Auth(AuthError::InvalidCredentials))
            }
        }
    }
}

/// Verify a secret against its stored bcrypt hash
///
/// # Errors
/// Returns error if the stored hash is not a parseable bcrypt string
pub fn verify_secret(secret: &str, stored_hash: &str) -> Result<bool, AppError> {
    verify(secret, stored_hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
}

/// Hash a secret for storage
///
/// Account provisioning lives outside this service; this helper exists for
/// seeding and tests. Salt handling is embedded in the bcrypt format.
///
/// # Errors
/// Returns error if the secret is empty, over the length ceiling, or
/// hashing fails
pub fn hash_password(secret: &str) -> Result<String, AppError> {
    if secret.is_empty() {
        return Err(AppError::Validation(ValidationError::EmptyField(
            "password".to_string(),
        )));
    }

    // bcrypt limitation and DoS ceiling
    if secret.len() > MAX_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        )));
    }

    hash(secret, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password() {
        let hash = hash_password("correct horse").expect("Failed to hash password");

        assert_ne!(hash, "correct horse");
        assert!(hash.starts_with("$2"));
    }

    #[test]
    fn test_verify_secret_round_trip() {
        let hash = hash_password("correct horse").expect("Failed to hash password");

        assert!(verify_secret("correct horse", &hash).unwrap());
        assert!(!verify_secret("wrong horse", &hash).unwrap());
    }

    #[test]
    fn test_empty_password_rejected() {
        assert!(hash_password("").is_err());
    }

    #[test]
    fn test_overlong_password_rejected() {
        let long = "a".repeat(MAX_PASSWORD_LENGTH + 1);
        assert!(hash_password(&long).is_err());
    }

    #[test]
    fn test_dummy_hash_is_parseable() {
        // The enumeration-resistance path relies on this constant being a
        // well-formed bcrypt hash
        assert!(verify("anything", DUMMY_HASH).is_ok());
    }
}
