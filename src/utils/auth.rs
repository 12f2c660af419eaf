//! Authentication helpers for backend requests.

/// Attach a bearer token when one is configured.
///
/// Blank tokens are treated as absent so an empty environment variable does
/// not produce an `Authorization: Bearer ` header the backend would reject.
pub fn add_auth_headers(
    request: reqwest::RequestBuilder,
    token: Option<&str>,
) -> reqwest::RequestBuilder {
    match token.map(str::trim).filter(|token| !token.is_empty()) {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}
