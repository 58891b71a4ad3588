//! URL canonicalization, origin checks and resource keys.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for offline_core::Error {
    fn from(err: UrlError) -> Self {
        offline_core::Error::InvalidUrl(err.to_string())
    }
}

/// Canonicalize a URL string before routing.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Cache key for a request: its path, without query or fragment.
pub fn resource_key(url: &url::Url) -> String {
    url.path().to_string()
}

/// Whether two URLs share scheme, host and port.
pub fn same_origin(a: &url::Url, b: &url::Url) -> bool {
    a.origin() == b.origin()
}

/// Absolute URL for a manifest key on `origin`.
pub fn resolve_key(origin: &url::Url, key: &str) -> Result<url::Url, UrlError> {
    if !key.starts_with('/') {
        return Err(UrlError::InvalidUrl(format!("resource key must start with '/': {key}")));
    }
    origin.join(key).map_err(|e| UrlError::InvalidUrl(e.to_string()))
}
