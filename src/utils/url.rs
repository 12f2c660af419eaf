//! URL helpers for building backend endpoints.

/// Remove trailing slashes so endpoints can be appended without doubling them.
///
/// ```
/// use parley::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:8000/api/chat/"), "http://localhost:8000/api/chat");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Join a base URL and an endpoint path with exactly one slash.
///
/// ```
/// use parley::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:8000/api/chat/", "/conversations/7"),
///     "http://localhost:8000/api/chat/conversations/7"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{normalized_base}/{endpoint}")
}
