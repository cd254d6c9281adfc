//! User accounts: registration, profile and status lifecycle.

mod aggregate;
mod events;
mod hasher;
mod service;

pub use aggregate::{User, UserStatus};
pub use events::UserEvent;
pub use hasher::{CredentialHasher, HashError, PlainTextHasher};
pub use service::{DEFAULT_MIN_PASSWORD_LENGTH, UserService};

use thiserror::Error;

use crate::error::ErrorKind;

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("Password is too short: at least {min} characters required")]
    PasswordTooShort { min: usize },

    #[error("Email is already taken: {email}")]
    EmailTaken { email: String },

    /// Deactivated users are frozen.
    #[error("User cannot be changed while {status}")]
    UserCannotBeChanged { status: UserStatus },

    #[error(transparent)]
    Hashing(#[from] HashError),
}

impl UserError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UserError::PasswordTooShort { .. } => ErrorKind::InvalidInput,
            UserError::EmailTaken { .. } => ErrorKind::BusinessRuleViolation,
            UserError::UserCannotBeChanged { .. } => ErrorKind::IllegalStateTransition,
            UserError::Hashing(_) => ErrorKind::Infrastructure,
        }
    }
}
