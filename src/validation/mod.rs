//! Request-level field checks for the inbound layer, and the structural validator
//! that runs inside the screening pipeline.

use std::fmt;

mod structural;

pub use structural::{validate_structure, StructuralRejection};

pub const TRANSACTION_ID_MAX_LEN: usize = 64;
pub const ACCOUNT_MAX_LEN: usize = 64;
pub const TAG_MAX_LEN: usize = 32;
pub const IP_ADDRESS_MAX_LEN: usize = 45;
pub const LOCATION_MAX_LEN: usize = 128;
pub const ALLOWED_CURRENCIES: &[&str] = &["INR", "USD", "EUR", "GBP"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.len() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

pub fn validate_enum(field: &'static str, value: &str, allowed: &[&str]) -> ValidationResult {
    if allowed.iter().all(|candidate| value != *candidate) {
        return Err(ValidationError::new(
            field,
            format!("must be one of: {}", allowed.join(", ")),
        ));
    }

    Ok(())
}

/// Required identifier-like field: sanitized, non-empty, bounded.
pub fn validate_identifier(
    field: &'static str,
    value: &str,
    max_len: usize,
) -> Result<String, ValidationError> {
    let value = sanitize_string(value);
    validate_required(field, &value)?;
    validate_max_len(field, &value, max_len)?;
    Ok(value)
}

/// Optional free-text field: sanitized, bounded, empty collapses to `None`.
pub fn validate_optional(
    field: &'static str,
    value: Option<&str>,
    max_len: usize,
) -> Result<Option<String>, ValidationError> {
    let Some(value) = value.map(sanitize_string).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    validate_max_len(field, &value, max_len)?;
    Ok(Some(value))
}

pub fn validate_currency(currency: &str) -> ValidationResult {
    let currency = sanitize_string(currency);
    validate_required("currency", &currency)?;
    validate_enum("currency", &currency, ALLOWED_CURRENCIES)
}
