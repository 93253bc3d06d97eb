//! Field validation for the registration write path.

use std::collections::HashMap;

/// Checks every rule independently and accumulates the violations in order,
/// so a request missing a name and carrying a bad email reports both.
pub fn validate(fields: &HashMap<String, String>) -> Vec<String> {
    let mut errors = Vec::new();

    let field = |key: &str| fields.get(key).map(String::as_str).unwrap_or("");

    if field("name").trim().is_empty() {
        errors.push("name is required".to_string());
    }
    if !valid_email(field("email")) {
        errors.push("email is invalid".to_string());
    }
    if !valid_date(field("start_date")) {
        errors.push("start_date must be an ISO date (YYYY-MM-DD)".to_string());
    }

    errors
}

/// Simple local@domain.tld shape: non-empty local part, non-empty domain with
/// at least one dot, no whitespace or extra `@` anywhere. Trimmed first.
pub fn valid_email(value: &str) -> bool {
    let value = value.trim();
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || local.chars().any(char::is_whitespace) {
        return false;
    }
    if domain.contains('@') || domain.chars().any(char::is_whitespace) {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Exactly `\d{4}-\d{2}-\d{2}`. Shape only; 2024-99-99 passes.
pub fn valid_date(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && [0usize, 1, 2, 3, 5, 6, 8, 9]
            .iter()
            .all(|&i| bytes[i].is_ascii_digit())
}
