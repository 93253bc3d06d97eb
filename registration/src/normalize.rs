//! Request normalization: flattens either query parameters or an encoded JSON
//! body into a uniform field map.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use http::Method;
use serde_json::Value;
use std::collections::HashMap;

/// Produces the field map for a request.
///
/// Read-style requests use the query parameters directly. Write-style
/// requests parse the body as a JSON object, falling back to
/// base64-decode-then-parse for transports that encode the body; if the body
/// yields nothing, the query parameters are used so registrations can also be
/// submitted that way. A malformed body resolves to an empty map so that the
/// caller surfaces missing-field validation errors instead of a decode error.
pub fn normalize(
    method: &Method,
    query: &HashMap<String, String>,
    body: &[u8],
) -> HashMap<String, String> {
    if method != Method::POST {
        return query.clone();
    }

    let fields = parse_body(body);
    if fields.is_empty() && !query.is_empty() {
        return query.clone();
    }
    fields
}

fn parse_body(body: &[u8]) -> HashMap<String, String> {
    let parsed: Option<Value> = serde_json::from_slice(body).ok().or_else(|| {
        STANDARD
            .decode(body.trim_ascii())
            .ok()
            .and_then(|decoded| serde_json::from_slice(&decoded).ok())
    });

    let Some(Value::Object(object)) = parsed else {
        return HashMap::new();
    };

    object
        .into_iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((key, value))
        })
        .collect()
}
