//! Small field rules shared by the request handlers.

use formdesk_types::api::FieldErrors;

use crate::error::push_error;

/// Returns the trimmed value, or records "field is required" when it is
/// missing or blank.
pub fn required<'a>(errors: &mut FieldErrors, field: &str, value: Option<&'a str>) -> Option<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            push_error(errors, field, format!("The {} field is required.", label(field)));
            None
        }
    }
}

/// Loose address check: a non-empty local part and domain around the last
/// `@`, and no whitespace.
pub fn is_email(value: &str) -> bool {
    match value.rfind('@') {
        Some(at) => {
            let (local, domain) = (&value[..at], &value[at + 1..]);
            !local.is_empty() && !domain.is_empty() && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// ASCII letters, digits, dashes and underscores only.
pub fn is_alpha_dash(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Human wording for a field key, e.g. `choice_type` -> `choice type`.
pub fn label(field: &str) -> String {
    field.replace('_', " ")
}
