use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors that can occur while validating the listing API URL.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    #[error("URL has no host")]
    MissingHost,
    /// Plain http is only accepted for loopback hosts.
    #[error("Insecure API URL: HTTPS required (except localhost for testing)")]
    InsecureScheme,
}

/// Validates the configured listing endpoint.
///
/// Accepts `https` URLs with a host. Plain `http` is allowed only for
/// `localhost` and loopback addresses so a local mock server can stand in for
/// the real API.
///
/// # Examples
///
/// ```
/// use jobfeed::util::validate_api_url;
///
/// assert!(validate_api_url("https://example.com/common/jobs").is_ok());
/// assert!(validate_api_url("http://127.0.0.1:8080/jobs").is_ok());
/// assert!(validate_api_url("http://example.com/jobs").is_err());
/// assert!(validate_api_url("file:///etc/passwd").is_err());
/// ```
pub fn validate_api_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    let secure = match url.scheme() {
        "https" => true,
        "http" => false,
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    };

    let host = url.host_str().ok_or(UrlValidationError::MissingHost)?;
    if host.is_empty() {
        return Err(UrlValidationError::MissingHost);
    }

    if !secure && !is_loopback_host(host) {
        return Err(UrlValidationError::InsecureScheme);
    }

    Ok(url)
}

fn is_loopback_host(host: &str) -> bool {
    if host == "localhost" {
        return true;
    }
    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    bare.parse::<IpAddr>().map(|ip| ip.is_loopback()).unwrap_or(false)
}
