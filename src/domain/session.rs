use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::validation::not_blank;

/// User record as returned by the auth endpoints and persisted under the `user` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub display_name: String,
    pub token: String,
}

impl Session {
    pub fn new(user: &UserProfile, token: impl Into<String>) -> Self {
        let display_name = user
            .full_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                user.email
                    .split('@')
                    .next()
                    .unwrap_or_default()
                    .to_string()
            });
        Self {
            user_id: user.id.clone(),
            email: user.email.clone(),
            display_name,
            token: token.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticating,
    Authenticated(Session),
}

impl AuthState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthState::Authenticated(session) => Some(session),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct Credentials {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(custom(function = "not_blank", message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct Registration {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(custom(function = "not_blank", message = "Password is required"))]
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// Body of a login or registration response.
///
/// The backend answers either `{access_token, user}` or a flat token record
/// (`user_id`, `email`, `full_name` beside the token). Registration may also
/// return the bare user record with no token at all.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl AuthResponse {
    /// Profile carried by the response, if any.
    pub fn profile(&self) -> Option<UserProfile> {
        if let Some(user) = &self.user {
            return Some(user.clone());
        }
        let id = self.user_id.clone().or_else(|| self.id.clone())?;
        Some(UserProfile {
            id,
            email: self.email.clone().unwrap_or_default(),
            full_name: self.full_name.clone(),
        })
    }
}
