// ============================
// vidtube-backend/src/auth/password.rs
// ============================
//! Password hashing and verification.
use scrypt::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Params, Scrypt,
};
use zeroize::Zeroize;

use super::AuthError;

/// Minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Password complexity requirements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordRequirements {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
}

impl Default for PasswordRequirements {
    fn default() -> Self {
        Self {
            min_length: MIN_PASSWORD_LENGTH,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: false,
        }
    }
}

impl PasswordRequirements {
    /// Human readable summary used in validation errors
    pub fn describe(&self) -> String {
        let mut parts = vec![format!("at least {} characters", self.min_length)];
        if self.require_uppercase {
            parts.push("an uppercase letter".to_string());
        }
        if self.require_lowercase {
            parts.push("a lowercase letter".to_string());
        }
        if self.require_digit {
            parts.push("a digit".to_string());
        }
        if self.require_special {
            parts.push("a special character".to_string());
        }
        format!("Password must contain {}", parts.join(", "))
    }
}

/// Salted scrypt hasher producing PHC strings
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// `log_n` is the scrypt cost parameter, log2(N)
    pub fn new(log_n: u8) -> Result<Self, AuthError> {
        let params = Params::new(log_n, 8, 1, Params::RECOMMENDED_LEN)
            .map_err(|e| AuthError::Internal(format!("scrypt params: {e}")))?;
        Ok(Self { params })
    }

    /// Hash a password with a fresh random salt
    pub fn hash(&self, plain: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Scrypt
            .hash_password_customized(plain.as_bytes(), None, None, self.params, &salt)
            .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))?
            .to_string();
        Ok(hash)
    }

    /// Hash a password and zeroize the original
    pub fn hash_secure(&self, plain: &mut String) -> Result<String, AuthError> {
        let hash = self.hash(plain);
        plain.zeroize();
        hash
    }
}

/// Verify a password against a stored hash; unparsable hashes never match
pub fn verify_password(hash: &str, plain: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Scrypt.verify_password(plain.as_bytes(), &parsed_hash).is_ok()
}

/// Check if a password meets the complexity requirements
pub fn validate_password_strength(password: &str, requirements: &PasswordRequirements) -> bool {
    if password.chars().count() < requirements.min_length {
        return false;
    }

    if requirements.require_uppercase && !password.chars().any(char::is_uppercase) {
        return false;
    }

    if requirements.require_lowercase && !password.chars().any(char::is_lowercase) {
        return false;
    }

    if requirements.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }

    if requirements.require_special && !password.chars().any(|c| !c.is_alphanumeric()) {
        return false;
    }

    true
}
