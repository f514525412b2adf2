use shared::{error::ErrorCode, protocol::INVALID_CREDENTIALS_MESSAGE};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("{}", INVALID_CREDENTIALS_MESSAGE)]
    InvalidCredentials,
    #[error("Login already in progress")]
    LoginInProgress,
    #[error("Login cancelled by sign-out")]
    LoginCancelled,
    #[error("No active session")]
    NoActiveSession,
    #[error("{0}")]
    Unexpected(String),
}

impl SessionError {
    /// Flattens any fault into the string-carrying variant, keeping the full cause chain.
    pub fn unexpected(err: &anyhow::Error) -> Self {
        SessionError::Unexpected(format!("{err:#}"))
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::InvalidCredentials => ErrorCode::Unauthorized,
            SessionError::LoginInProgress | SessionError::LoginCancelled => ErrorCode::Conflict,
            SessionError::NoActiveSession => ErrorCode::Forbidden,
            SessionError::Unexpected(_) => ErrorCode::Internal,
        }
    }
}
