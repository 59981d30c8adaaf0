use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Client;
use url::Url;

const USER_AGENT: &str = "veil/0.1.0";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const PROBE_TIMEOUT_SECS: u64 = 5;
const MAX_REDIRECTS: usize = 5;

/// Client for the remote proxy backend. The backend fetches and rewrites
/// third-party pages; this side only probes its health and requests
/// already-proxied documents from its `/service/` endpoint.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    origin: String,
}

impl BackendClient {
    pub fn new(origin: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;

        Ok(Self {
            client,
            origin: origin.trim_end_matches('/').to_string(),
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Builds the backend target for a normalized URL. The backend serves
    /// proxied pages under a path segment, `{origin}/service/{encoded-url}`,
    /// with the URL percent-encoded as a single component.
    pub fn proxy_url(&self, normalized_url: &str) -> String {
        format!(
            "{}/service/{}",
            self.origin,
            urlencoding::encode(normalized_url)
        )
    }

    /// Idempotent reachability probe against the backend root. Any non-error
    /// status counts as healthy; every failure mode collapses to `false`.
    pub async fn probe(&self) -> bool {
        let request = self
            .client
            .head(format!("{}/", self.origin))
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS));

        match request.send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                log::debug!("backend probe failed: {}", e);
                false
            }
        }
    }

    /// Fetches a proxied document from the backend.
    pub async fn fetch(&self, proxy_url: &str) -> Result<String> {
        let response = self
            .client
            .get(proxy_url)
            .send()
            .await
            .map_err(|e| anyhow!("failed to reach backend: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow!("backend returned HTTP {}", response.status()));
        }

        response
            .text()
            .await
            .map_err(|e| anyhow!("failed to read proxied page: {}", e))
    }
}

/// Coerces user input to a scheme-prefixed URL: bare hosts get `https://`
/// prepended, anything that still does not parse is rejected. The prefixed
/// string is returned as typed rather than reserialized, so
/// `"example.com"` becomes exactly `"https://example.com"`.
pub fn normalize_url(input: &str) -> Result<String> {
    let input = input.trim();
    let with_scheme = if input.starts_with("http://") || input.starts_with("https://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };
    Url::parse(&with_scheme).map_err(|e| anyhow!("not a valid URL: {}", e))?;
    Ok(with_scheme)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_prepends_https_to_bare_hosts() {
        assert_eq!(normalize_url("example.com").unwrap(), "https://example.com");
        assert_eq!(
            normalize_url("  example.com/a path  ").unwrap(),
            "https://example.com/a path"
        );
    }

    #[test]
    fn normalize_keeps_explicit_schemes() {
        assert_eq!(
            normalize_url("http://example.com").unwrap(),
            "http://example.com"
        );
        assert_eq!(
            normalize_url("https://example.com/x?q=1").unwrap(),
            "https://example.com/x?q=1"
        );
    }

    #[test]
    fn normalize_rejects_unparseable_input() {
        assert!(normalize_url("https://").is_err());
        assert!(normalize_url("").is_err());
    }

    #[test]
    fn proxy_url_percent_encodes_the_target() {
        let backend = BackendClient::new("http://127.0.0.1:8080/").unwrap();
        assert_eq!(
            backend.proxy_url("https://example.com"),
            "http://127.0.0.1:8080/service/https%3A%2F%2Fexample.com"
        );
        assert_eq!(
            backend.proxy_url("https://example.com/a b?q=1"),
            "http://127.0.0.1:8080/service/https%3A%2F%2Fexample.com%2Fa%20b%3Fq%3D1"
        );
    }

    #[test]
    fn origin_is_stored_without_trailing_slash() {
        let backend = BackendClient::new("http://127.0.0.1:8080///").unwrap();
        assert_eq!(backend.origin(), "http://127.0.0.1:8080");
    }
}
