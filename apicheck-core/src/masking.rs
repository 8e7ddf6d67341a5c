//! Sensitive data masking for captured HTTP logs.
//!
//! Scenarios routinely carry bearer credentials. Before a request is
//! handed to reporters, credential-bearing headers and query parameters
//! are replaced with a fixed mask.

use http::header::{HeaderMap, HeaderValue};

/// The mask string used to replace sensitive values.
pub const MASK: &str = "*****";

/// Query parameter names to mask (case-insensitive comparison).
const SENSITIVE_QUERY_PARAMS: &[&str] = &[
    "access_token",
    "api_key",
    "apikey",
    "token",
    "secret",
    "password",
    "key",
    "auth",
];

/// Header names to mask (case-insensitive comparison).
const SENSITIVE_HEADERS: &[&str] = &["authorization", "x-api-key", "x-auth-token", "cookie"];

/// Masks sensitive query parameters in a request target. Works on the raw
/// text so both absolute URLs and bare paths keep their original encoding.
///
/// ```
/// use apicheck_core::masking::mask_target;
///
/// let masked = mask_target("https://dummyjson.com/users?token=secret&limit=5");
/// assert_eq!(masked, "https://dummyjson.com/users?token=*****&limit=5");
/// ```
pub fn mask_target(target: &str) -> String {
    let Some((head, query)) = target.split_once('?') else {
        return target.to_string();
    };
    let (query, fragment) = match query.split_once('#') {
        Some((query, fragment)) => (query, Some(fragment)),
        None => (query, None),
    };

    let masked_query = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _value)) if is_sensitive_param(key) => format!("{key}={MASK}"),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&");

    match fragment {
        Some(fragment) => format!("{head}?{masked_query}#{fragment}"),
        None => format!("{head}?{masked_query}"),
    }
}

fn is_sensitive_param(key: &str) -> bool {
    let key = key.to_lowercase();
    SENSITIVE_QUERY_PARAMS.iter().any(|&p| key == p)
}

/// Masks sensitive header values in a HeaderMap.
pub fn mask_headers(headers: &HeaderMap) -> HeaderMap {
    let mut masked = HeaderMap::with_capacity(headers.len());

    for (name, value) in headers.iter() {
        let masked_value = if SENSITIVE_HEADERS.contains(&name.as_str()) {
            HeaderValue::from_static(MASK)
        } else {
            value.clone()
        };
        masked.append(name.clone(), masked_value);
    }

    masked
}
