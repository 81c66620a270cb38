//! Request decoding with result-code aware validation errors.
//!
//! Decoding failures are classified from the deserializer's message into the
//! missing-required, unexpected-field and wrong-type kinds; range and pattern
//! rules are checked afterwards through [`Validate`].

use serde::de::DeserializeOwned;

use crate::error::ValidationError;

/// Range and pattern rules checked after a request has been decoded.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Decode and validate a JSON request body.
pub fn parse_json<T: DeserializeOwned + Validate>(body: &[u8]) -> Result<T, ValidationError> {
    if body.is_empty() {
        return Err(ValidationError::MissingRequired("request body".to_string()));
    }
    let value: T = serde_json::from_slice(body).map_err(|e| classify(&e.to_string()))?;
    value.validate()?;
    Ok(value)
}

/// Decode and validate a query string.
pub fn parse_query<T: DeserializeOwned + Validate>(query: &str) -> Result<T, ValidationError> {
    let value: T = serde_urlencoded_from_str(query)?;
    value.validate()?;
    Ok(value)
}

fn serde_urlencoded_from_str<T: DeserializeOwned>(query: &str) -> Result<T, ValidationError> {
    actix_web::web::Query::<T>::from_query(query)
        .map(|q| q.into_inner())
        .map_err(|e| classify(&e.to_string()))
}

/// Map a deserializer error message onto a validation kind.
pub fn classify(message: &str) -> ValidationError {
    if let Some(field) = quoted_field(message, "missing field `") {
        ValidationError::MissingRequired(field)
    } else if let Some(field) = quoted_field(message, "unknown field `") {
        ValidationError::UnexpectedField(field)
    } else {
        ValidationError::WrongType(message.to_string())
    }
}

fn quoted_field(message: &str, prefix: &str) -> Option<String> {
    let start = message.find(prefix)? + prefix.len();
    let rest = &message[start..];
    let end = rest.find('`')?;
    Some(rest[..end].to_string())
}

/// Character length must be within `min..=max`.
pub fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ValidationError::OutOfRange(format!(
            "{} must be {}..={} characters, got {}",
            field, min, max, len
        )));
    }
    Ok(())
}

/// Value must satisfy `matches`.
pub fn check_pattern(
    field: &str,
    value: &str,
    matches: impl Fn(&str) -> bool,
) -> Result<(), ValidationError> {
    if !matches(value) {
        return Err(ValidationError::OutOfRange(format!(
            "{} has an invalid format",
            field
        )));
    }
    Ok(())
}
