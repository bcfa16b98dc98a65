//! Credential hashing, secret generation and access token signing

pub mod jwt;
pub mod password;
pub mod tokens;

pub use jwt::{AccessClaims, TokenSigner};
pub use password::PasswordHasher;
