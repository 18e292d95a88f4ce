//! Client credential extraction and the upstream token source.

use std::sync::LazyLock;

use regex::Regex;

static BASIC_AUTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Basic ([A-Za-z0-9+=]*)$").expect("basic auth regex"));

/// Extract a Basic credential from an `Authorization` header value.
///
/// The whole header value (`Basic <base64>`) is kept as the opaque credential
/// string; the proxy never decodes it, it only forwards it upstream and
/// records it in access lists.
pub fn extract_basic_credential(header: Option<&str>) -> Option<String> {
    let value = header?;
    BASIC_AUTH.is_match(value).then(|| value.to_string())
}

// ---------------------------------------------------------------------------
// Token source
// ---------------------------------------------------------------------------

/// Supplies an `Authorization` value for upstream calls when the client did
/// not send a credential of its own.
pub trait TokenSource: Send + Sync {
    fn authorization(&self) -> Option<String>;
}

/// A fixed bearer token, typically loaded from the settings file.
pub struct StaticTokenSource {
    header: String,
}

impl StaticTokenSource {
    pub fn new(token: &str) -> Self {
        Self {
            header: format!("Bearer {token}"),
        }
    }
}

impl TokenSource for StaticTokenSource {
    fn authorization(&self) -> Option<String> {
        Some(self.header.clone())
    }
}

/// No upstream credential at all.
pub struct NoToken;

impl TokenSource for NoToken {
    fn authorization(&self) -> Option<String> {
        None
    }
}
