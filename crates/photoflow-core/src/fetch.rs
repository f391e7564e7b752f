//! Blocking byte fetch for a single photo URL.
//!
//! Uses the curl crate (libcurl) to GET the full body into memory. Follows
//! redirects. Runs on the download runner's worker thread; by default there
//! is no transfer timeout, but the caller can opt into one via `FetchLimits`.

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Failure of the download stage: the item is marked `Failed` for any of these.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Curl reported an error (connection refused, DNS, timeout, etc.).
    #[error("transfer failed: {0}")]
    Curl(#[from] curl::Error),
    /// Response had a non-2xx status.
    #[error("GET returned HTTP {0}")]
    Http(u32),
    /// Body was fetched but is not a decodable image.
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
}

/// Optional transfer limits. Both default to `None` (unbounded), matching the
/// single-attempt, no-timeout contract of the download stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchLimits {
    pub connect_timeout: Option<Duration>,
    pub timeout: Option<Duration>,
}

/// Fetch the full response body for `url` into memory.
pub fn fetch_bytes(url: &Url, limits: &FetchLimits) -> Result<Vec<u8>, FetchError> {
    let mut body: Vec<u8> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url.as_str())?;
    easy.follow_location(true)?;
    if let Some(t) = limits.connect_timeout {
        easy.connect_timeout(t)?;
    }
    if let Some(t) = limits.timeout {
        easy.timeout(t)?;
    }

    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(FetchError::Http(code));
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_default_to_unbounded() {
        let limits = FetchLimits::default();
        assert!(limits.connect_timeout.is_none());
        assert!(limits.timeout.is_none());
    }

    #[test]
    fn http_error_display() {
        let err = FetchError::Http(404);
        assert_eq!(err.to_string(), "GET returned HTTP 404");
    }
}
