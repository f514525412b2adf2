use std::sync::Arc;

use anyhow::{Context, Result};
use shared::{
    domain::{NotificationKind, Role},
    protocol::{LoginCredentials, LoginOutcome},
};
use storage::{BlobStore, Storage};
use tracing::info;

pub mod config;
pub mod credentials;
pub mod error;
pub mod notifications;
pub mod router;
pub mod session;
pub mod ui;

pub use config::{load_settings, Settings};
pub use credentials::{CredentialDirectory, HttpCredentialDirectory, StaticCredentialDirectory};
pub use error::SessionError;
pub use notifications::NotificationSurface;
pub use router::{route, DashboardVariant, Route};
pub use session::{SessionEvent, SessionState, SessionStore};
pub use ui::{ModalContent, Notification, UiEvent, UiState, UiStore};

/// Owns one of each store and hands them to whichever front end drives the client.
pub struct ClientContext {
    session: Arc<SessionStore>,
    ui: Arc<UiStore>,
    notifications: NotificationSurface,
}

impl ClientContext {
    /// Opens durable storage, picks the credential directory and restores any saved session.
    pub async fn initialize(settings: &Settings) -> Result<Self> {
        let storage = Storage::new(&settings.database_url)
            .await
            .with_context(|| {
                format!(
                    "failed to initialize session storage at '{}'",
                    settings.database_url
                )
            })?;

        let directory: Arc<dyn CredentialDirectory> = match &settings.auth_server_url {
            Some(url) => {
                info!(%url, "using remote credential directory");
                Arc::new(HttpCredentialDirectory::new(url)?)
            }
            None => Arc::new(StaticCredentialDirectory::reference()),
        };

        Ok(Self::from_parts(directory, Arc::new(storage), settings).await)
    }

    pub async fn from_parts(
        directory: Arc<dyn CredentialDirectory>,
        persistence: Arc<dyn BlobStore>,
        settings: &Settings,
    ) -> Self {
        let session = SessionStore::rehydrate(directory, persistence).await;
        let ui = Arc::new(UiStore::new());
        let notifications = NotificationSurface::new(Arc::clone(&ui), settings.notification_dwell);
        Self {
            session,
            ui,
            notifications,
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn ui(&self) -> &Arc<UiStore> {
        &self.ui
    }

    pub fn notifications(&self) -> &NotificationSurface {
        &self.notifications
    }

    /// Login plus the toast and view reset a sign-in form expects.
    pub async fn submit_login(&self, credentials: LoginCredentials) -> LoginOutcome {
        let outcome = self.session.login(credentials).await;
        match &outcome {
            LoginOutcome::Success => {
                let state = self.session.snapshot().await;
                let name = state
                    .user
                    .as_ref()
                    .map(|user| user.name.as_str())
                    .unwrap_or("there");
                self.ui
                    .add_notification(NotificationKind::Success, format!("Welcome back, {name}!"));
                let variant = DashboardVariant::for_role(state.role);
                self.ui.set_active_view(variant.default_view());
            }
            LoginOutcome::Failure { error } => {
                self.ui
                    .add_notification(NotificationKind::Error, error.clone());
            }
        }
        outcome
    }

    pub async fn sign_out(&self) {
        self.session.logout().await;
        self.ui.close_modal();
        self.ui.set_active_view(ui::DEFAULT_ACTIVE_VIEW);
        self.ui
            .add_notification(NotificationKind::Info, "You have been signed out");
    }

    pub async fn current_route(&self) -> Route {
        let state = self.session.snapshot().await;
        route(state.is_authenticated, state.role)
    }

    pub async fn has_permission(&self, required: Role) -> bool {
        self.session.has_permission(required).await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
