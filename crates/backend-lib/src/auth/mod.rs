// ============================
// vidtube-backend/src/auth/mod.rs
// ============================
//! Authentication module.

mod error;
pub mod gate;
pub mod password;
mod service;
pub mod session;
pub mod token;

pub use error::AuthError;
pub use gate::{cookie_value, extract_access_token, AuthorizationGate};
pub use password::{
    validate_password_strength, verify_password, PasswordHasher, PasswordRequirements,
    MIN_PASSWORD_LENGTH,
};
pub use service::AuthService;
pub use session::{LoginOutcome, SessionManager};
pub use token::{Claims, IssuedToken, TokenCodec, TokenError, TokenKind, TokenPair};
