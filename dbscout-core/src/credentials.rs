//! Credential container with automatic memory zeroing.
//!
//! Login material lives in [`zeroize::Zeroizing`] wrappers so it is
//! cleared from memory on drop. Profiles convert to and from plain
//! strings only at the serde boundary.

use zeroize::{Zeroize, Zeroizing};

/// Username and optional password for a database login.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct Credentials {
    username: Zeroizing<String>,
    password: Zeroizing<Option<String>>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &*self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Credentials {
    /// Wraps login material in zeroizing storage.
    pub fn new(username: String, password: Option<String>) -> Self {
        Self {
            username: Zeroizing::new(username),
            password: Zeroizing::new(password),
        }
    }

    /// The username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The password, when one was provided.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Whether a password is present, without exposing it.
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_round_trip() {
        let creds = Credentials::new("reader".to_string(), Some("hunter2".to_string()));
        assert_eq!(creds.username(), "reader");
        assert_eq!(creds.password(), Some("hunter2"));
        assert!(creds.has_password());
    }

    #[test]
    fn test_credentials_without_password() {
        let creds = Credentials::new("reader".to_string(), None);
        assert!(!creds.has_password());
        assert_eq!(creds.password(), None);
    }

    #[test]
    fn test_debug_masks_password() {
        let creds = Credentials::new("reader".to_string(), Some("hunter2".to_string()));
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("reader"));
    }
}
