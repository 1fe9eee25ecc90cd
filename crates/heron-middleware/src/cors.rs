//! CORS response headers.
//!
//! Every response the server produces, including 501s, preflights and
//! pipeline rejections, passes through [`CorsPolicy::apply`].

use http::header::InvalidHeaderValue;
use http::{header, HeaderMap, HeaderValue};

/// Default `Access-Control-Allow-Methods`.
pub const DEFAULT_ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

/// Default `Access-Control-Allow-Headers`.
pub const DEFAULT_ALLOW_HEADERS: &str =
    "Origin, X-Requested-With, Content-Type, Accept, Authorization";

/// Fixed CORS headers added to every response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsPolicy {
    allow_origin: HeaderValue,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allow_origin: HeaderValue::from_static("*"),
            allow_methods: HeaderValue::from_static(DEFAULT_ALLOW_METHODS),
            allow_headers: HeaderValue::from_static(DEFAULT_ALLOW_HEADERS),
        }
    }
}

impl CorsPolicy {
    /// Any origin, the default methods and headers.
    #[must_use]
    pub fn permissive() -> Self {
        Self::default()
    }

    /// A policy with explicit header values.
    ///
    /// # Errors
    ///
    /// Fails if a value is not a legal header value.
    pub fn new(
        allow_origin: &str,
        allow_methods: &str,
        allow_headers: &str,
    ) -> Result<Self, InvalidHeaderValue> {
        Ok(Self {
            allow_origin: HeaderValue::from_str(allow_origin)?,
            allow_methods: HeaderValue::from_str(allow_methods)?,
            allow_headers: HeaderValue::from_str(allow_headers)?,
        })
    }

    /// Adds the CORS headers, replacing any already present.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            self.allow_origin.clone(),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            self.allow_methods.clone(),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            self.allow_headers.clone(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissive_headers() {
        let mut headers = HeaderMap::new();
        CorsPolicy::permissive().apply(&mut headers);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_METHODS],
            "GET, POST, PUT, DELETE, OPTIONS"
        );
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "Origin, X-Requested-With, Content-Type, Accept, Authorization"
        );
    }

    #[test]
    fn test_custom_origin_replaces_existing() {
        let policy = CorsPolicy::new("https://app.example.com", "GET", "Authorization").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        policy.apply(&mut headers);
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://app.example.com"
        );
        assert_eq!(headers.get_all(header::ACCESS_CONTROL_ALLOW_ORIGIN).iter().count(), 1);
    }

    #[test]
    fn test_invalid_value_is_rejected() {
        assert!(CorsPolicy::new("bad\nvalue", "GET", "Accept").is_err());
    }
}
