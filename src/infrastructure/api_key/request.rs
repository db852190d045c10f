//! Presented-key resolution
//!
//! A caller may present its key in one of three locations, checked in order:
//! `Authorization: Bearer <key>`, the `X-API-Key` header, or an `api_key`
//! query parameter.

use http::{header, HeaderMap};

/// Query parameter accepted as a key location.
const QUERY_PARAM: &str = "api_key";

/// Resolve the presented API key from request parts.
///
/// Returns `None` when no accepted location carries a key; the quota manager
/// turns that into a `MissingKey` denial.
pub fn resolve_presented_key(headers: &HeaderMap, query: Option<&str>) -> Option<String> {
    if let Some(auth) = headers.get(header::AUTHORIZATION) {
        if let Ok(value) = auth.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                let token = token.trim();
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }

    if let Some(value) = headers.get("x-api-key") {
        if let Ok(key) = value.to_str() {
            let key = key.trim();
            if !key.is_empty() {
                return Some(key.to_string());
            }
        }
    }

    query.and_then(query_api_key)
}

fn query_api_key(query: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| *name == QUERY_PARAM)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
