use serde::{Deserialize, Serialize};

use crate::domain::{Role, UserProfile};

/// Namespace under which the persisted session blob is stored.
pub const SESSION_STORAGE_KEY: &str = "auth-storage";

pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

impl LoginCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoginOutcome {
    Success,
    Failure { error: String },
}

impl LoginOutcome {
    pub fn failure(error: impl Into<String>) -> Self {
        LoginOutcome::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, LoginOutcome::Success)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoginOutcome::Success => None,
            LoginOutcome::Failure { error } => Some(error),
        }
    }
}

/// A successful directory lookup: the profile plus the credential to hold for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user: UserProfile,
    pub token: String,
}

/// The subset of a session that survives a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    #[serde(default)]
    pub user: Option<UserProfile>,
    #[serde(default)]
    pub is_authenticated: bool,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistedSessionDefect {
    AuthenticatedWithoutUser,
    UserWithoutAuthentication,
    RoleMismatch,
    MissingToken,
    TokenWithoutSession,
}

impl PersistedSession {
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// Checks the cross-field invariants a rehydrated session must satisfy.
    pub fn validate(&self) -> Result<(), PersistedSessionDefect> {
        match (&self.user, self.is_authenticated) {
            (None, true) => return Err(PersistedSessionDefect::AuthenticatedWithoutUser),
            (Some(_), false) => return Err(PersistedSessionDefect::UserWithoutAuthentication),
            _ => {}
        }

        match &self.user {
            Some(user) => {
                if self.role != Some(user.role) {
                    return Err(PersistedSessionDefect::RoleMismatch);
                }
                if self.token.as_deref().map_or(true, str::is_empty) {
                    return Err(PersistedSessionDefect::MissingToken);
                }
            }
            None => {
                if self.role.is_some() {
                    return Err(PersistedSessionDefect::RoleMismatch);
                }
                if self.token.is_some() {
                    return Err(PersistedSessionDefect::TokenWithoutSession);
                }
            }
        }

        Ok(())
    }
}
