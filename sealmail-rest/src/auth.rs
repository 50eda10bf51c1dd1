//! Authentication header source.

use std::collections::HashMap;

/// Supplies the authentication headers attached to every request.
///
/// An empty map means the user is not logged in; the client refuses to
/// issue requests in that case.
pub trait AuthHeadersProvider: Send + Sync {
    fn create_auth_headers(&self) -> HashMap<String, String>;
}

/// A fixed set of headers, e.g. an access token obtained at login.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthHeaders {
    headers: HashMap<String, String>,
}

impl StaticAuthHeaders {
    pub fn new(headers: HashMap<String, String>) -> Self {
        Self { headers }
    }

    /// Headers for an access token: `{"accessToken": token}`.
    pub fn access_token(token: impl Into<String>) -> Self {
        Self::new(HashMap::from([("accessToken".to_string(), token.into())]))
    }

    /// No headers at all, i.e. logged out.
    pub fn none() -> Self {
        Self::default()
    }
}

impl AuthHeadersProvider for StaticAuthHeaders {
    fn create_auth_headers(&self) -> HashMap<String, String> {
        self.headers.clone()
    }
}
