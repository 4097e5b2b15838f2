/// Input validators
///
/// All checks run before anything touches storage:
/// 1. Length limits on every free-text field
/// 2. Email format
/// 3. Control characters in display names
/// 4. Role names and `resource:action` permission codes

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MAX_NAME_LENGTH: usize = 256;
const MAX_ROLE_NAME_LENGTH: usize = 100;
const MAX_DESCRIPTION_LENGTH: usize = 1024;
const MAX_PERMISSION_CODE_LENGTH: usize = 100;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).expect("email regex is valid");

    static ref PERMISSION_CODE_REGEX: Regex =
        Regex::new(r"^[a-z0-9_]+:[a-z0-9_]+$").expect("permission code regex is valid");
}

/// Validates and normalizes an email address (trimmed, lowercased)
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    // local part is limited to 64 octets
    if let Some(at_pos) = trimmed.find('@') {
        if at_pos > 64 {
            return Err(ValidationError::SuspiciousContent("email".to_string()));
        }
    }

    Ok(trimmed.to_lowercase())
}

/// Validates a user display name
pub fn is_valid_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("name".to_string()));
    }

    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong("name".to_string(), MAX_NAME_LENGTH));
    }

    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::SuspiciousContent("name".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates a role name
pub fn is_valid_role_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("role name".to_string()));
    }

    if trimmed.len() > MAX_ROLE_NAME_LENGTH {
        return Err(ValidationError::TooLong(
            "role name".to_string(),
            MAX_ROLE_NAME_LENGTH,
        ));
    }

    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::SuspiciousContent("role name".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates a free-form description. Empty is allowed.
pub fn is_valid_description(description: &str) -> Result<String, ValidationError> {
    let trimmed = description.trim();

    if trimmed.len() > MAX_DESCRIPTION_LENGTH {
        return Err(ValidationError::TooLong(
            "description".to_string(),
            MAX_DESCRIPTION_LENGTH,
        ));
    }

    Ok(trimmed.to_string())
}

/// Validates a permission code of the form `resource:action`
pub fn is_valid_permission_code(code: &str) -> Result<String, ValidationError> {
    let trimmed = code.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("permission code".to_string()));
    }

    if trimmed.len() > MAX_PERMISSION_CODE_LENGTH {
        return Err(ValidationError::TooLong(
            "permission code".to_string(),
            MAX_PERMISSION_CODE_LENGTH,
        ));
    }

    if !PERMISSION_CODE_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("permission code".to_string()));
    }

    Ok(trimmed.to_string())
}
