mod password;
mod tokens;

pub use password::{hash_password, verify_password};
pub use tokens::{AuthClaims, TokenSigner};
