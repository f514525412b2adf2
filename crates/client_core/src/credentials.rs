use std::{collections::HashMap, time::Duration};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use shared::{
    domain::{Role, UserId, UserProfile},
    error::ApiError,
    protocol::{AuthenticatedUser, LoginCredentials},
};
use url::Url;
use uuid::Uuid;

/// Password shared by every entry of the built-in directory.
pub const REFERENCE_PASSWORD: &str = "password";

/// Looks credentials up and hands back the matching profile.
///
/// `Ok(None)` means the credentials were rejected. `Err` is reserved for faults the
/// lookup did not anticipate (transport failures, malformed responses).
#[async_trait]
pub trait CredentialDirectory: Send + Sync {
    async fn authenticate(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<Option<AuthenticatedUser>>;
}

pub struct StaticCredentialDirectory {
    entries: HashMap<String, UserProfile>,
    shared_password: String,
    latency: Duration,
}

impl StaticCredentialDirectory {
    pub fn new(entries: impl IntoIterator<Item = UserProfile>, shared_password: impl Into<String>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|profile| (profile.email.clone(), profile))
                .collect(),
            shared_password: shared_password.into(),
            latency: Duration::ZERO,
        }
    }

    /// The three demo accounts, one per role.
    pub fn reference() -> Self {
        Self::new(
            [
                reference_profile(
                    1,
                    "John Doe",
                    "user@ktf.com",
                    Role::User,
                    "Engineering",
                    "Software Engineer",
                    &["Rust", "TypeScript", "SQL"],
                ),
                reference_profile(
                    2,
                    "Sarah Johnson",
                    "hr@ktf.com",
                    Role::Hr,
                    "Human Resources",
                    "HR Manager",
                    &["Talent Management", "Competency Frameworks"],
                ),
                reference_profile(
                    3,
                    "Admin User",
                    "admin@ktf.com",
                    Role::Admin,
                    "IT",
                    "System Administrator",
                    &["Access Control", "Infrastructure"],
                ),
            ],
            REFERENCE_PASSWORD,
        )
    }

    /// Simulated round-trip delay before each answer.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn emails(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

fn reference_profile(
    id: i64,
    name: &str,
    email: &str,
    role: Role,
    department: &str,
    title: &str,
    skills: &[&str],
) -> UserProfile {
    UserProfile {
        id: UserId(id),
        name: name.to_string(),
        email: email.to_string(),
        role,
        department: department.to_string(),
        title: Some(title.to_string()),
        skills: skills.iter().map(|skill| skill.to_string()).collect(),
    }
}

#[async_trait]
impl CredentialDirectory for StaticCredentialDirectory {
    async fn authenticate(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<Option<AuthenticatedUser>> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let Some(profile) = self.entries.get(&credentials.email) else {
            return Ok(None);
        };
        if credentials.password != self.shared_password {
            return Ok(None);
        }

        Ok(Some(AuthenticatedUser {
            user: profile.clone(),
            token: format!("skm-{}", Uuid::new_v4().simple()),
        }))
    }
}

/// Delegates the check to `POST {base_url}/auth/login`.
///
/// Only `401` counts as a credential mismatch. Any other non-`200` status, `403`
/// included, is surfaced as a fault.
pub struct HttpCredentialDirectory {
    http: Client,
    login_url: Url,
}

impl HttpCredentialDirectory {
    pub fn new(base_url: &Url) -> Result<Self> {
        let login_url = base_url
            .join("auth/login")
            .with_context(|| format!("cannot derive login endpoint from '{base_url}'"))?;
        Ok(Self {
            http: Client::new(),
            login_url,
        })
    }

    pub fn login_url(&self) -> &Url {
        &self.login_url
    }
}

#[async_trait]
impl CredentialDirectory for HttpCredentialDirectory {
    async fn authenticate(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<Option<AuthenticatedUser>> {
        let res = self
            .http
            .post(self.login_url.clone())
            .json(credentials)
            .send()
            .await
            .with_context(|| format!("failed to reach auth server at {}", self.login_url))?;

        match res.status() {
            StatusCode::OK => {
                let body: AuthenticatedUser = res
                    .json()
                    .await
                    .context("auth server returned a malformed login response")?;
                if body.token.trim().is_empty() {
                    return Err(anyhow!("auth server returned an empty token"));
                }
                Ok(Some(body))
            }
            StatusCode::UNAUTHORIZED => Ok(None),
            status => {
                let detail = res
                    .json::<ApiError>()
                    .await
                    .map(|err| err.to_string())
                    .unwrap_or_else(|_| status.to_string());
                Err(anyhow!("auth server rejected login request: {detail}"))
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/credentials_tests.rs"]
mod tests;
