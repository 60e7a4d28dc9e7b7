//! Errors returned by this crate

/// Shorthand for results of this crate
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The authentication provider refused the request (bad credentials, existing account...)
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The request was rejected before reaching any collaborator
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// A remote write or read requires a session, and none is active
    #[error("not authenticated")]
    NotAuthenticated,

    /// The remote store could not complete the operation
    #[error("persistence failed: {0}")]
    Persistence(String),

    /// The task controller this handle points to has been torn down
    #[error("the task controller is not running anymore")]
    ControllerStopped,

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Input rejected by client-side checks
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("an email address is required")]
    EmptyEmail,
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("password must be at least {min_len} characters long")]
    PasswordTooShort { min_len: usize },
    #[error("a task needs a title")]
    EmptyTitle,
}
