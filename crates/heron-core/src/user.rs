//! The user entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How a user signed up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterType {
    /// Google OAuth access token.
    Google,
    /// Sign in with Apple identity token.
    Apple,
}

impl RegisterType {
    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Apple => "apple",
        }
    }
}

/// One linked social account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialMedia {
    /// Network name, e.g. `github`.
    pub key: String,
    /// Handle or URL on that network.
    pub value: String,
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Stable user id.
    pub uid: String,
    /// Sign-up provider.
    pub register_type: RegisterType,
    /// When the account was created.
    pub register_date: DateTime<Utc>,
    /// Last successful registration/login call.
    pub last_login_date: DateTime<Utc>,
    /// Email reported by the identity provider.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Unique handle.
    pub username: String,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// Linked social accounts.
    #[serde(default)]
    pub social_medias: Vec<SocialMedia>,
    /// Session token presented as `Authorization: Bearer <token>`.
    pub token: String,
}

impl User {
    /// The public profile: no token, no uid, social accounts flattened
    /// into top-level keys.
    #[must_use]
    pub fn profile(&self) -> Value {
        let mut out = Map::new();
        out.insert("registerType".into(), self.register_type.as_str().into());
        out.insert(
            "registerDate".into(),
            self.register_date.to_rfc3339().into(),
        );
        out.insert(
            "lastLoginDate".into(),
            self.last_login_date.to_rfc3339().into(),
        );
        out.insert("email".into(), self.email.clone().into());
        out.insert("name".into(), self.name.clone().into());
        out.insert("username".into(), self.username.clone().into());
        if let Some(picture) = &self.picture {
            out.insert("picture".into(), picture.clone().into());
        }
        for social in &self.social_medias {
            out.insert(social.key.clone(), social.value.clone().into());
        }
        Value::Object(out)
    }
}
