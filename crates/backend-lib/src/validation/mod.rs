// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Input validation for identity fields.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

use crate::auth::AuthError;

const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 30;
const MAX_FULL_NAME_LENGTH: usize = 100;
const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit

static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_.-]+$").unwrap());
static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());
static FULL_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^<>/\\{}\[\];]*$").unwrap());

/// Possible validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Invalid full name: {0}")]
    InvalidFullName(String),
}

impl From<ValidationError> for AuthError {
    fn from(err: ValidationError) -> Self {
        AuthError::Validation(err.to_string())
    }
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate a username; returns it trimmed
pub fn validate_username(username: &str) -> ValidationResult<&str> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ValidationError::InvalidUsername(
            "Username must not be empty".to_string(),
        ));
    }

    let len = username.chars().count();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&len) {
        return Err(ValidationError::InvalidUsername(format!(
            "Username must be between {MIN_USERNAME_LENGTH} and {MAX_USERNAME_LENGTH} characters"
        )));
    }

    // No '@', so a username can never collide with an email on login
    if !USERNAME_REGEX.is_match(username) {
        return Err(ValidationError::InvalidUsername(
            "Username may contain only letters, digits, '.', '_' and '-'".to_string(),
        ));
    }

    Ok(username)
}

/// Validate an email address; returns it trimmed
pub fn validate_email(email: &str) -> ValidationResult<&str> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::InvalidEmail(
            "Email address cannot be empty".to_string(),
        ));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::InvalidEmail(format!(
            "Email address cannot exceed {MAX_EMAIL_LENGTH} characters"
        )));
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidEmail(
            "Invalid email address format".to_string(),
        ));
    }

    Ok(email)
}

/// Validate a display name; returns it trimmed
pub fn validate_full_name(full_name: &str) -> ValidationResult<&str> {
    let full_name = full_name.trim();
    if full_name.is_empty() {
        return Err(ValidationError::InvalidFullName(
            "Full name must not be empty".to_string(),
        ));
    }

    if full_name.chars().count() > MAX_FULL_NAME_LENGTH {
        return Err(ValidationError::InvalidFullName(format!(
            "Full name must be between 1 and {MAX_FULL_NAME_LENGTH} characters"
        )));
    }

    if !FULL_NAME_REGEX.is_match(full_name) {
        return Err(ValidationError::InvalidFullName(
            "Full name contains invalid characters".to_string(),
        ));
    }

    Ok(full_name)
}
