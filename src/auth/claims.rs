/// JWT Claims structure
///
/// Represents the payload of an access token: the registered claims
/// (RFC 7519) plus the business claims the LMS attaches to a session.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::credentials::Principal;

/// Claim set embedded in every access token
///
/// Built fresh per issuance and never mutated after signing. `jti` is a
/// unique token id for replay/audit correlation. Business claims beyond the
/// named fields travel in the flattened `extra` map.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Unique token id
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// Stable integer user identity
    pub user_id: i32,
    /// Role, carried as an opaque claim (not interpreted here)
    pub role: String,
    /// Display name business claim
    pub display_name: String,
    /// Open extension mapping for additional business claims
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Claims {
    /// Create new claims for a verified principal
    ///
    /// # Arguments
    /// * `principal` - Verified user identity
    /// * `expiry_seconds` - Token lifetime in seconds from now
    /// * `issuer` - Issuer identifier
    /// * `audience` - Audience identifier
    pub fn new(
        principal: &Principal,
        expiry_seconds: i64,
        issuer: String,
        audience: String,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: principal.username.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + expiry_seconds,
            iss: issuer,
            aud: audience,
            user_id: principal.user_id,
            role: principal.role.clone(),
            display_name: principal.display_name.clone(),
            extra: HashMap::new(),
        }
    }

    /// Rebuild the principal carried by these claims
    ///
    /// Used by the refresh path to mint a new token pair from an expired
    /// access token without re-reading the credential record.
    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.user_id,
            username: self.sub.clone(),
            role: self.role.clone(),
            display_name: self.display_name.clone(),
        }
    }

    /// Check if the token has expired (strictly-after semantics, UTC)
    pub fn is_expired(&self) -> bool {
        chrono::Utc::now().timestamp() > self.exp
    }
}
