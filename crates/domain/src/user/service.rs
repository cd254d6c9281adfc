//! User service.

use std::sync::Arc;

use aggregate_store::{AggregateStore, StoreError};
use common::AggregateId;

use crate::command::CommandHandler;
use crate::dispatch::EventDispatcher;
use crate::error::DomainError;

use super::{CredentialHasher, User, UserError, UserEvent, UserStatus};

pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 8;

/// Service for registering and managing users.
pub struct UserService<S> {
    handler: CommandHandler<S, User>,
    hasher: Arc<dyn CredentialHasher>,
    min_password_length: usize,
}

impl<S: AggregateStore<User>> UserService<S> {
    pub fn new(
        store: S,
        hasher: Arc<dyn CredentialHasher>,
        dispatcher: Arc<dyn EventDispatcher>,
    ) -> Self {
        Self {
            handler: CommandHandler::new(store, dispatcher),
            hasher,
            min_password_length: DEFAULT_MIN_PASSWORD_LENGTH,
        }
    }

    pub fn with_min_password_length(mut self, min: usize) -> Self {
        self.min_password_length = min;
        self
    }

    /// Registers an active user.
    ///
    /// The password length is checked before the email lookup, and the
    /// password is hashed only once both checks pass.
    #[tracing::instrument(skip(self, password))]
    pub async fn register_new_user(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, DomainError> {
        if password.chars().count() < self.min_password_length {
            return Err(UserError::PasswordTooShort {
                min: self.min_password_length,
            }
            .into());
        }

        if self.handler.store().find_by_key("email", email).await?.is_some() {
            return Err(email_taken(email));
        }

        let digest = self.hasher.hash(password).map_err(UserError::from)?;
        let user_id = self.handler.next_id();
        let user = User::register(user_id, email, digest, first_name, last_name);
        let registered = UserEvent::UserRegistered {
            user_id,
            email: email.to_string(),
            first_name: first_name.to_string(),
        };

        match self.handler.create(user, vec![registered]).await {
            Ok(result) => Ok(result.aggregate),
            // Lost a race with a concurrent registration for the same email.
            Err(DomainError::Store(StoreError::DuplicateKey { .. })) => Err(email_taken(email)),
            Err(e) => Err(e),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_profile(
        &self,
        user_id: AggregateId,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, DomainError> {
        let result = self
            .handler
            .execute(user_id, |user| user.update_profile(first_name, last_name))
            .await?;
        Ok(result.aggregate)
    }

    pub async fn suspend_user(&self, user_id: AggregateId) -> Result<User, DomainError> {
        self.change_status(user_id, UserStatus::Suspended).await
    }

    pub async fn activate_user(&self, user_id: AggregateId) -> Result<User, DomainError> {
        self.change_status(user_id, UserStatus::Active).await
    }

    pub async fn deactivate_user(&self, user_id: AggregateId) -> Result<User, DomainError> {
        self.change_status(user_id, UserStatus::Deactivated).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_user(&self, user_id: AggregateId) -> Result<User, DomainError> {
        self.handler.load(user_id).await
    }

    /// Checks a password against the stored digest. An unknown email is
    /// simply a mismatch.
    #[tracing::instrument(skip(self, password))]
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<bool, DomainError> {
        let Some(user) = self.handler.store().find_by_key("email", email).await? else {
            return Ok(false);
        };

        let matches = self
            .hasher
            .verify(password, user.password_hash())
            .map_err(UserError::from)?;
        Ok(matches)
    }

    #[tracing::instrument(skip(self))]
    async fn change_status(
        &self,
        user_id: AggregateId,
        new_status: UserStatus,
    ) -> Result<User, DomainError> {
        let result = self
            .handler
            .execute(user_id, |user| user.change_status(new_status))
            .await?;
        Ok(result.aggregate)
    }
}

fn email_taken(email: &str) -> DomainError {
    UserError::EmailTaken {
        email: email.to_string(),
    }
    .into()
}
