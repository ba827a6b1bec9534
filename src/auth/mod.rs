/// Authentication module
///
/// JWT signing/validation, credential verification, and refresh-token
/// storage with one-time-use rotation.

mod claims;
mod credentials;
mod jwt;
mod refresh_token;

pub use claims::Claims;
pub use credentials::hash_password;
pub use credentials::verify_credentials;
pub use credentials::Principal;
pub use jwt::decode_expired_token;
pub use jwt::generate_access_token;
pub use jwt::generate_access_token_from_claims;
pub use jwt::validate_access_token;
pub use refresh_token::consume_refresh_token;
pub use refresh_token::issue_refresh_token;
pub use refresh_token::revoke_all_refresh_tokens;
pub use refresh_token::revoke_refresh_token;
pub use refresh_token::SessionStoreError;
