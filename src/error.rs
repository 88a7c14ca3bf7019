//! User-facing errors
//!
//! None of these are fatal. The [`Provider`](crate::Provider) catches them at its operation boundary
//! and turns them into [`Notification`](crate::notification::Notification)s.

use std::fmt::{Display, Formatter};

use thiserror::Error;

/// Everything that can go wrong during a [`Provider`](crate::Provider) operation
#[derive(Clone, Debug, PartialEq, Error)]
pub enum Error {
    /// An operation that needs a signed-in identity was attempted while signed out
    #[error("You must be logged in to do this")]
    Unauthenticated,
    /// Sign-up or sign-in was refused by the identity service
    #[error("{0}")]
    Identity(IdentityErrorCode),
    /// The document store failed to create, update, delete or fetch
    #[error("Task storage error: {message}")]
    Store { message: String },
    /// A draft or a patch was rejected before being submitted
    #[error("Invalid task: {reason}")]
    InvalidTask { reason: String },
}

impl Error {
    pub fn store<S: ToString>(message: S) -> Self {
        Self::Store { message: message.to_string() }
    }

    pub fn invalid_task<S: ToString>(reason: S) -> Self {
        Self::InvalidTask { reason: reason.to_string() }
    }
}

impl From<IdentityErrorCode> for Error {
    fn from(code: IdentityErrorCode) -> Self {
        Self::Identity(code)
    }
}


/// Classified failures of the identity service.
///
/// Identity backends report raw codes, either in the SDK flavour (`auth/email-already-in-use`)
/// or in the REST flavour (`EMAIL_EXISTS`). Both are understood by [`IdentityErrorCode::from_code`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdentityErrorCode {
    EmailAlreadyInUse,
    InvalidEmail,
    WeakPassword,
    OperationNotAllowed,
    WrongPassword,
    UserNotFound,
    /// Any code we do not know about. The raw code is kept for display
    Other(String),
}

impl IdentityErrorCode {
    pub fn from_code(raw: &str) -> Self {
        // REST replies may append details, e.g. "WEAK_PASSWORD : Password should be at least 6 characters"
        let code = raw.split(" : ").next().unwrap_or(raw).trim();
        match code {
            "auth/email-already-in-use" | "EMAIL_EXISTS" => Self::EmailAlreadyInUse,
            "auth/invalid-email" | "INVALID_EMAIL" => Self::InvalidEmail,
            "auth/weak-password" | "WEAK_PASSWORD" => Self::WeakPassword,
            "auth/operation-not-allowed" | "OPERATION_NOT_ALLOWED" => Self::OperationNotAllowed,
            "auth/wrong-password" | "INVALID_PASSWORD" => Self::WrongPassword,
            "auth/user-not-found" | "EMAIL_NOT_FOUND" => Self::UserNotFound,
            _ => Self::Other(code.to_string()),
        }
    }
}

impl Display for IdentityErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmailAlreadyInUse => write!(f, "This email is already in use"),
            Self::InvalidEmail => write!(f, "This email address is invalid"),
            Self::WeakPassword => write!(f, "The password is too weak"),
            Self::OperationNotAllowed => write!(f, "This sign-in method is not enabled"),
            Self::WrongPassword => write!(f, "Wrong password"),
            Self::UserNotFound => write!(f, "No user matches these credentials"),
            Self::Other(code) => write!(f, "Authentication error ({})", code),
        }
    }
}

impl std::error::Error for IdentityErrorCode {}
