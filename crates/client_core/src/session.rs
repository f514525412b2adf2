//! Authentication state: who is signed in and with what authority.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use shared::{
    domain::{ProfileUpdate, Role, UserId, UserProfile},
    protocol::{
        AuthenticatedUser, LoginCredentials, LoginOutcome, PersistedSession, SESSION_STORAGE_KEY,
    },
};
use storage::BlobStore;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::{credentials::CredentialDirectory, error::SessionError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<UserProfile>,
    pub is_authenticated: bool,
    pub role: Option<Role>,
    pub token: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
}

impl SessionState {
    fn from_persisted(persisted: PersistedSession) -> Self {
        Self {
            user: persisted.user,
            is_authenticated: persisted.is_authenticated,
            role: persisted.role,
            token: persisted.token,
            loading: false,
            error: None,
        }
    }

    pub fn persisted(&self) -> PersistedSession {
        PersistedSession {
            user: self.user.clone(),
            is_authenticated: self.is_authenticated,
            role: self.role,
            token: self.token.clone(),
        }
    }

    fn sign_in(&mut self, authenticated: AuthenticatedUser) {
        self.role = Some(authenticated.user.role);
        self.user = Some(authenticated.user);
        self.token = Some(authenticated.token);
        self.is_authenticated = true;
        self.loading = false;
        self.error = None;
    }

    fn sign_out(&mut self) {
        self.user = None;
        self.is_authenticated = false;
        self.role = None;
        self.token = None;
        self.error = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Rehydrated { authenticated: bool },
    LoginStarted { email: String },
    LoggedIn { user_id: UserId, role: Role },
    LoginFailed { error: String },
    LoggedOut,
    ProfileUpdated { user_id: UserId },
    ErrorCleared,
}

pub struct SessionStore {
    directory: Arc<dyn CredentialDirectory>,
    persistence: Arc<dyn BlobStore>,
    state: RwLock<SessionState>,
    /// Bumped by every logout. Only read or written while `state` is write-locked.
    login_epoch: AtomicU64,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    /// A signed-out store that ignores anything previously persisted.
    pub fn new(
        directory: Arc<dyn CredentialDirectory>,
        persistence: Arc<dyn BlobStore>,
    ) -> Arc<Self> {
        Self::with_state(directory, persistence, SessionState::default())
    }

    fn with_state(
        directory: Arc<dyn CredentialDirectory>,
        persistence: Arc<dyn BlobStore>,
        state: SessionState,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            directory,
            persistence,
            state: RwLock::new(state),
            login_epoch: AtomicU64::new(0),
            events,
        })
    }

    /// Restores the persisted session, falling back to signed-out on any defect.
    pub async fn rehydrate(
        directory: Arc<dyn CredentialDirectory>,
        persistence: Arc<dyn BlobStore>,
    ) -> Arc<Self> {
        let state = match load_persisted(persistence.as_ref()).await {
            Some(persisted) => SessionState::from_persisted(persisted),
            None => SessionState::default(),
        };
        let authenticated = state.is_authenticated;
        if authenticated {
            info!(
                role = %state.role.unwrap_or(Role::Unrecognized),
                "restored persisted session"
            );
        }

        let store = Self::with_state(directory, persistence, state);
        let _ = store.events.send(SessionEvent::Rehydrated { authenticated });
        store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_authenticated
    }

    pub async fn role(&self) -> Option<Role> {
        self.state.read().await.role
    }

    pub async fn user(&self) -> Option<UserProfile> {
        self.state.read().await.user.clone()
    }

    /// Checks the credentials and, on a match, replaces the signed-in user.
    ///
    /// The lookup runs on its own task so that neither a panicking directory nor a caller
    /// that stops waiting can leave `loading` set. A logout issued while the lookup is
    /// pending wins: the late result is discarded.
    pub async fn login(self: &Arc<Self>, credentials: LoginCredentials) -> LoginOutcome {
        let epoch = {
            let mut state = self.state.write().await;
            if state.loading {
                debug!(email = %credentials.email, "rejected overlapping login attempt");
                return LoginOutcome::failure(SessionError::LoginInProgress.to_string());
            }
            state.loading = true;
            state.error = None;
            self.login_epoch.load(Ordering::SeqCst)
        };
        let _ = self.events.send(SessionEvent::LoginStarted {
            email: credentials.email.clone(),
        });

        let store = Arc::clone(self);
        let attempt = tokio::spawn(async move {
            let result = store.lookup(credentials).await;
            store.finish_login(epoch, result).await
        });

        match attempt.await {
            Ok(outcome) => outcome,
            Err(join_err) => {
                let err = SessionError::Unexpected(format!("login task failed: {join_err}"));
                self.finish_login(epoch, Err(err)).await
            }
        }
    }

    async fn lookup(&self, credentials: LoginCredentials) -> Result<AuthenticatedUser, SessionError> {
        let directory = Arc::clone(&self.directory);
        let email = credentials.email.clone();
        let lookup = tokio::spawn(async move { directory.authenticate(&credentials).await });

        match lookup.await {
            Ok(Ok(Some(authenticated))) => Ok(authenticated),
            Ok(Ok(None)) => {
                info!(%email, "login rejected");
                Err(SessionError::InvalidCredentials)
            }
            Ok(Err(err)) => {
                warn!(%email, "credential lookup failed: {err:#}");
                Err(SessionError::unexpected(&err))
            }
            Err(join_err) => {
                warn!(%email, "credential lookup aborted: {join_err}");
                Err(SessionError::Unexpected(format!(
                    "credential lookup aborted: {join_err}"
                )))
            }
        }
    }

    async fn finish_login(
        &self,
        epoch: u64,
        result: Result<AuthenticatedUser, SessionError>,
    ) -> LoginOutcome {
        let mut state = self.state.write().await;
        if self.login_epoch.load(Ordering::SeqCst) != epoch {
            // Logged out mid-flight. `loading` was already released and may now belong to
            // a newer attempt, so state is left alone.
            drop(state);
            info!("discarding login result superseded by logout");
            let message = SessionError::LoginCancelled.to_string();
            let _ = self.events.send(SessionEvent::LoginFailed {
                error: message.clone(),
            });
            return LoginOutcome::failure(message);
        }

        match result {
            Ok(authenticated) => {
                let user_id = authenticated.user.id;
                let role = authenticated.user.role;
                state.sign_in(authenticated);
                let persisted = state.persisted();
                // Written under the lock so a racing logout cannot be overwritten.
                self.persist(&persisted).await;
                drop(state);
                info!(user_id = user_id.0, %role, "login succeeded");
                let _ = self.events.send(SessionEvent::LoggedIn { user_id, role });
                LoginOutcome::Success
            }
            Err(err) => {
                let message = err.to_string();
                state.loading = false;
                state.error = Some(message.clone());
                drop(state);
                let _ = self.events.send(SessionEvent::LoginFailed {
                    error: message.clone(),
                });
                LoginOutcome::failure(message)
            }
        }
    }

    pub async fn logout(&self) {
        {
            let mut state = self.state.write().await;
            let was_authenticated = state.is_authenticated;
            if state.loading {
                self.login_epoch.fetch_add(1, Ordering::SeqCst);
                state.loading = false;
                info!("cancelled in-flight login");
            }
            state.sign_out();
            if was_authenticated {
                info!("logged out");
            }
            self.persist(&state.persisted()).await;
        }
        let _ = self.events.send(SessionEvent::LoggedOut);
    }

    /// Merges `update` into the signed-in user.
    ///
    /// Fails with [`SessionError::NoActiveSession`] when nobody is signed in.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<UserProfile, SessionError> {
        let (profile, persisted) = {
            let mut state = self.state.write().await;
            let Some(user) = state.user.as_mut() else {
                return Err(SessionError::NoActiveSession);
            };
            update.apply_to(user);
            let profile = user.clone();
            (profile, state.persisted())
        };
        self.persist(&persisted).await;
        debug!(user_id = profile.id.0, "profile updated");
        let _ = self.events.send(SessionEvent::ProfileUpdated {
            user_id: profile.id,
        });
        Ok(profile)
    }

    pub async fn clear_error(&self) {
        let cleared = self.state.write().await.error.take().is_some();
        if cleared {
            let _ = self.events.send(SessionEvent::ErrorCleared);
        }
    }

    pub async fn has_permission(&self, required: Role) -> bool {
        role_satisfies(self.state.read().await.role, required)
    }

    async fn persist(&self, persisted: &PersistedSession) {
        let blob = match serde_json::to_string(persisted) {
            Ok(blob) => blob,
            Err(err) => {
                warn!("failed to serialize session: {err}");
                return;
            }
        };
        if let Err(err) = self
            .persistence
            .store_blob(SESSION_STORAGE_KEY, &blob)
            .await
        {
            warn!("failed to persist session: {err:#}");
        }
    }
}

/// Rank comparison over `admin > hr > user`; a missing or unrecognized role satisfies nothing.
pub fn role_satisfies(current: Option<Role>, required: Role) -> bool {
    let current = current.map_or(0, Role::rank);
    let required = required.rank();
    current > 0 && required > 0 && current >= required
}

async fn load_persisted(persistence: &dyn BlobStore) -> Option<PersistedSession> {
    let raw = match persistence.load_blob(SESSION_STORAGE_KEY).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            warn!("failed to read persisted session, starting signed out: {err:#}");
            return None;
        }
    };

    let persisted = match serde_json::from_str::<PersistedSession>(&raw) {
        Ok(persisted) => persisted,
        Err(err) => {
            warn!("discarding malformed persisted session: {err}");
            return None;
        }
    };

    if let Err(defect) = persisted.validate() {
        warn!(?defect, "discarding inconsistent persisted session");
        return None;
    }

    Some(persisted)
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
