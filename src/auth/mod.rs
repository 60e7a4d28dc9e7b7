//! Sessions, and implementations of [`AuthProvider`](crate::traits::AuthProvider)

pub mod memory_auth;
pub mod rest_auth;

use serde::{Deserialize, Serialize};

use crate::config::MIN_PASSWORD_LEN;
use crate::error::ValidationError;

/// An authenticated user context
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The identifier of the user, that keys its remote data
    pub uid: String,
    pub email: String,
    /// The token sent along remote requests (empty for in-memory providers)
    #[serde(default)]
    pub id_token: String,
}

impl Session {
    pub fn new<S: ToString, T: ToString>(uid: S, email: T) -> Self {
        Self {
            uid: uid.to_string(),
            email: email.to_string(),
            id_token: String::new(),
        }
    }
}

/// The content of a registration form
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

impl Registration {
    pub fn new<S: ToString, T: ToString, U: ToString>(email: S, password: T, password_confirmation: U) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
            password_confirmation: password_confirmation.to_string(),
        }
    }

    /// Client-side checks, done before asking the auth provider to create an account
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.email.trim().is_empty() {
            return Err(ValidationError::EmptyEmail);
        }
        if self.password != self.password_confirmation {
            return Err(ValidationError::PasswordMismatch);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort { min_len: MIN_PASSWORD_LEN });
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_checks() {
        assert_eq!(Registration::new("jan@mail.cz", "secret1", "secret1").validate(), Ok(()));
        assert_eq!(Registration::new("jan@mail.cz", "secret1", "secret2").validate(), Err(ValidationError::PasswordMismatch));
        assert_eq!(Registration::new("jan@mail.cz", "12345", "12345").validate(), Err(ValidationError::PasswordTooShort { min_len: 6 }));
        assert_eq!(Registration::new("  ", "secret1", "secret1").validate(), Err(ValidationError::EmptyEmail));
        // Six characters, not six bytes
        assert_eq!(Registration::new("jan@mail.cz", "heslíčko", "heslíčko").validate(), Ok(()));
        assert!(Registration::new("jan@mail.cz", "žluť", "žluť").validate().is_err());
    }
}
