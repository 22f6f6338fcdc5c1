//! URL utilities for consistent endpoint construction
//!
//! The backend is configured with a single base URL (usually `http://host:port`).
//! HTTP endpoints hang off it directly while session channels use the matching
//! WebSocket scheme.

use crate::core::session::SessionId;

/// Normalize a base URL by removing trailing slashes
///
/// # Examples
///
/// ```
/// use askportal::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:8000"), "http://localhost:8000");
/// assert_eq!(normalize_base_url("http://localhost:8000///"), "http://localhost:8000");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Construct a complete endpoint URL from a base URL and endpoint path
///
/// # Examples
///
/// ```
/// use askportal::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:8000/", "/api/health"),
///     "http://localhost:8000/api/health"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

/// Rewrite an `http(s)` base URL to its `ws(s)` counterpart. URLs already using
/// a WebSocket scheme, or carrying no scheme, are returned with `ws://`
/// semantics preserved.
pub fn websocket_base_url(base_url: &str) -> String {
    let normalized = normalize_base_url(base_url.trim());
    if let Some(rest) = normalized.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = normalized.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if normalized.starts_with("ws://") || normalized.starts_with("wss://") {
        normalized
    } else {
        format!("ws://{normalized}")
    }
}

/// URL of the streaming chat channel for one session.
pub fn session_channel_url(base_url: &str, session_id: SessionId) -> String {
    format!(
        "{}?session_id={}",
        construct_api_url(&websocket_base_url(base_url), "ws"),
        session_id
    )
}
