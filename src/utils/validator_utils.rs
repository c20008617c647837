use std::borrow::Cow;

use validator::ValidationError;

/// Rejects absent (defaulted to empty) and whitespace-only values.
pub fn validate_required(value: &str) -> Result<(), ValidationError> {
    if !value.trim().is_empty() {
        return Ok(());
    }

    let mut error = ValidationError::new("is_required");
    error.message = Some(Cow::from("This field is required"));
    Err(error)
}
