//! User aggregate implementation.

use aggregate_store::{UniqueKey, Version, Versioned};
use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, Decision};

use super::{UserError, UserEvent};

/// Account status.
///
/// Registration produces `Active` directly; `PendingVerification` is kept
/// for accounts imported from elsewhere. `Deactivated` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UserStatus {
    #[default]
    PendingVerification,
    Active,
    Suspended,
    Deactivated,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::PendingVerification => "PendingVerification",
            UserStatus::Active => "Active",
            UserStatus::Suspended => "Suspended",
            UserStatus::Deactivated => "Deactivated",
        }
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User aggregate root. Unique by email.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    id: AggregateId,
    version: Version,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    status: UserStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl User {
    /// Creates an active user at version 1 from an already hashed password.
    pub fn register(
        id: AggregateId,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            version: Version::first(),
            email: email.into(),
            password_hash: password_hash.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn status(&self) -> UserStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

// Command methods
impl User {
    pub fn update_profile(
        &mut self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Decision<UserEvent>, UserError> {
        if self.status == UserStatus::Deactivated {
            return Err(UserError::UserCannotBeChanged {
                status: self.status,
            });
        }

        self.first_name = first_name.to_string();
        self.last_name = last_name.to_string();

        Ok(Decision::emit(UserEvent::UserProfileUpdated { user_id: self.id }))
    }

    /// Moves to `new_status`. Asking for the current status, or changing a
    /// deactivated user, is a no-op.
    pub fn change_status(&mut self, new_status: UserStatus) -> Result<Decision<UserEvent>, UserError> {
        let old_status = self.status;
        if old_status == new_status || old_status == UserStatus::Deactivated {
            return Ok(Decision::Unchanged);
        }

        self.status = new_status;

        let mut events = vec![UserEvent::UserStatusChanged {
            user_id: self.id,
            old_status,
            new_status,
        }];
        if new_status == UserStatus::Deactivated {
            events.push(UserEvent::UserDeactivated { user_id: self.id });
        }
        Ok(Decision::Apply(events))
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl Versioned for User {
    fn aggregate_type() -> &'static str {
        "User"
    }

    fn id(&self) -> AggregateId {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::new("email", self.email.as_str())]
    }
}

impl Aggregate for User {
    type Event = UserEvent;
    type Error = UserError;

    fn advance(&mut self, at: DateTime<Utc>) {
        self.version = self.version.next();
        self.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User::register(AggregateId::new(), "ada@example.com", "digest", "Ada", "Lovelace")
    }

    #[test]
    fn registered_user_is_active() {
        let user = user();
        assert_eq!(user.status(), UserStatus::Active);
        assert_eq!(user.version(), Version::first());
        assert_eq!(user.unique_keys(), vec![UniqueKey::new("email", "ada@example.com")]);
    }

    #[test]
    fn debug_hides_password_hash() {
        let rendered = format!("{:?}", user());
        assert!(!rendered.contains("digest"));
        assert!(rendered.contains("ada@example.com"));
    }

    #[test]
    fn same_status_is_unchanged() {
        let mut user = user();
        assert!(user.change_status(UserStatus::Active).unwrap().is_unchanged());
    }

    #[test]
    fn deactivation_emits_two_events() {
        let mut user = user();
        let id = user.id();

        let decision = user.change_status(UserStatus::Deactivated).unwrap();

        assert_eq!(
            decision.events(),
            &[
                UserEvent::UserStatusChanged {
                    user_id: id,
                    old_status: UserStatus::Active,
                    new_status: UserStatus::Deactivated,
                },
                UserEvent::UserDeactivated { user_id: id },
            ]
        );
        assert_eq!(user.status(), UserStatus::Deactivated);
    }

    #[test]
    fn deactivated_is_absorbing() {
        let mut user = user();
        user.change_status(UserStatus::Deactivated).unwrap();

        for target in [
            UserStatus::Active,
            UserStatus::Suspended,
            UserStatus::Deactivated,
            UserStatus::PendingVerification,
        ] {
            assert!(user.change_status(target).unwrap().is_unchanged());
            assert_eq!(user.status(), UserStatus::Deactivated);
        }

        let before = user.clone();
        let result = user.update_profile("Grace", "Hopper");
        assert!(matches!(result, Err(UserError::UserCannotBeChanged { .. })));
        assert_eq!(user, before);
    }
}
