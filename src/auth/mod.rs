//! Authentication module
//!
//! Password hashing, signed access tokens, and the manager tying them to
//! stored users.

mod manager;
mod password;
mod token;

pub use manager::{AuthError, AuthManager, UserLookup};
pub use password::{PasswordError, PasswordHasher};
pub use token::{extract_bearer_token, Claims, TokenError, TokenService, DEFAULT_TOKEN_TTL};
