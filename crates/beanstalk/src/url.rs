//! Public URL derivation.
//!
//! The environment URL is never stored independently: it is composed from
//! the host name and the HTTPS port, and rewritten when the port changes.

use regex::Regex;
use std::sync::LazyLock;

static SCHEME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^https?://").unwrap());
static PORT_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r":\d+$").unwrap());

/// Compose the public URL for a host.
///
/// Port 443 is implied by the `https` scheme and omitted.
///
/// ```
/// use beanstalk::url::compose;
///
/// assert_eq!(compose("app.example.com", None), "http://app.example.com");
/// assert_eq!(compose("app.example.com", Some(443)), "https://app.example.com");
/// assert_eq!(compose("app.example.com", Some(8443)), "https://app.example.com:8443");
/// ```
#[must_use]
pub fn compose(host: &str, https_port: Option<u16>) -> String {
    match https_port {
        None => format!("http://{host}"),
        Some(443) => format!("https://{host}"),
        Some(port) => format!("https://{host}:{port}"),
    }
}

/// Extract the host from a URL previously produced by [`compose`].
#[must_use]
pub fn host(url: &str) -> String {
    let without_scheme = SCHEME.replace(url, "");
    PORT_SUFFIX.replace(&without_scheme, "").into_owned()
}

/// Rewrite an existing URL for a new HTTPS setting, keeping its host.
#[must_use]
pub fn rewrite(url: &str, https_port: Option<u16>) -> String {
    compose(&host(url), https_port)
}
