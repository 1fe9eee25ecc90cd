//! Identity providers for registration.
//!
//! Google access tokens are exchanged against the userinfo endpoint. Apple
//! identity tokens are JWTs whose payload already carries the email; the
//! payload is decoded without verifying the signature.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use heron::core::{HeronError, IdentityProfile, IdentityProvider};
use serde::Deserialize;
use tracing::warn;

/// Google's OAuth2 userinfo endpoint.
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

const GOOGLE_FAILURE: &str = "Failed to get user data from Google";
const APPLE_NO_EMAIL: &str = "Failed to get email from Apple.";
const APPLE_BAD_EMAIL: &str = "Invalid email from Apple.";

/// Resolves Google access tokens through the userinfo endpoint.
///
/// Every failure (transport, non-2xx status, unreadable body, no email) is
/// reported as an external error, which the client sees as a 502.
#[derive(Debug, Clone)]
pub struct GoogleIdentity {
    client: reqwest::Client,
    userinfo_url: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

impl GoogleIdentity {
    /// Uses the public userinfo endpoint.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_url(GOOGLE_USERINFO_URL)
    }

    /// Uses `url` as the userinfo endpoint.
    pub fn with_url(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            userinfo_url: url.into(),
        })
    }

    fn failure() -> HeronError {
        HeronError::external(GOOGLE_FAILURE, Some("google"))
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentity {
    async fn resolve(&self, access_token: &str) -> Result<IdentityProfile, HeronError> {
        let response = self
            .client
            .get(&self.userinfo_url)
            .query(&[("access_token", access_token)])
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "google userinfo request failed");
                Self::failure()
            })?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "google userinfo rejected the token");
            return Err(Self::failure());
        }

        let info: GoogleUserInfo = response.json().await.map_err(|e| {
            warn!(error = %e, "google userinfo body unreadable");
            Self::failure()
        })?;
        let Some(email) = info.email.filter(|e| !e.is_empty()) else {
            return Err(Self::failure());
        };
        let name = info.name.unwrap_or_else(|| local_part(&email).to_string());

        Ok(IdentityProfile {
            email,
            name,
            picture: info.picture.filter(|p| !p.is_empty()),
        })
    }
}

/// Reads the email from an Apple identity token.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppleIdentity;

#[derive(Debug, Deserialize)]
struct AppleClaims {
    email: Option<String>,
}

impl AppleIdentity {
    /// Creates the provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl IdentityProvider for AppleIdentity {
    async fn resolve(&self, access_token: &str) -> Result<IdentityProfile, HeronError> {
        let email = jwt_payload::<AppleClaims>(access_token)
            .and_then(|claims| claims.email)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| HeronError::validation(APPLE_NO_EMAIL))?;

        let name = local_part(&email);
        if name.is_empty() {
            return Err(HeronError::validation(APPLE_BAD_EMAIL));
        }

        Ok(IdentityProfile {
            name: name.to_string(),
            email,
            picture: None,
        })
    }
}

/// Decodes the payload segment of a JWT.
fn jwt_payload<T: for<'de> Deserialize<'de>>(token: &str) -> Option<T> {
    let segment = token.split('.').nth(1)?.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .or_else(|_| STANDARD_NO_PAD.decode(segment))
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// The part of an email before `@`.
pub fn local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or_default()
}
