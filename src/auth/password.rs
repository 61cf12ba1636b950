/// Password hashing and verification.
///
/// bcrypt with the default cost, plus strength validation before
/// hashing.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::{AppError, ValidationError};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Hash a password with bcrypt after validating its strength.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    validate_password_strength(password)?;

    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

/// Verify a password against its stored hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash)
        .map_err(|e| AppError::Internal(format!("password verification failed: {}", e)))
}

/// Minimum 8 characters, maximum 128 (bcrypt limit and DoS guard), at
/// least one digit, one lowercase, and one uppercase letter.
fn validate_password_strength(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooShort(
            "password".to_string(),
            MIN_PASSWORD_LENGTH,
        )));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        )));
    }

    let has_digit = password.chars().any(|c| c.is_numeric());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());

    if !has_digit || !has_lowercase || !has_uppercase {
        return Err(AppError::Validation(ValidationError::InvalidFormat(
            "password must contain at least one digit, one lowercase letter, and one uppercase letter"
                .to_string(),
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_not_plaintext() {
        let hash = hash_password("ValidPassword123").expect("Failed to hash password");
        assert_ne!(hash, "ValidPassword123");
        assert!(hash.starts_with("$2"));
    }

    #[test]
    fn correct_password_verifies() {
        let hash = hash_password("ValidPassword123").expect("Failed to hash password");
        assert!(verify_password("ValidPassword123", &hash).unwrap());
    }

    #[test]
    fn wrong_password_fails_verification() {
        let hash = hash_password("ValidPassword123").expect("Failed to hash password");
        assert!(!verify_password("WrongPassword123", &hash).unwrap());
    }

    #[test]
    fn weak_passwords_are_rejected() {
        for weak in ["Short1", "nouppercase1", "NOLOWERCASE1", "NoDigitsHere"] {
            assert!(hash_password(weak).is_err(), "accepted {:?}", weak);
        }
        let too_long = format!("Aa1{}", "x".repeat(MAX_PASSWORD_LENGTH));
        assert!(hash_password(&too_long).is_err());
    }
}
