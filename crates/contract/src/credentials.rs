//! Credentials shared by authenticating handlers.

use std::fmt;

use crate::error::{Result, TransferError};

/// User, password and optional domain.
///
/// Every handler owns its own copy; changing one copy never affects another.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Login name.
    pub user: Option<String>,
    /// Password or token.
    pub password: Option<String>,
    /// Windows domain, used by SMB only.
    pub domain: Option<String>,
}

impl Credentials {
    /// Create credentials from optional parts.
    pub fn new(user: Option<String>, password: Option<String>, domain: Option<String>) -> Self {
        Self {
            user,
            password,
            domain,
        }
    }

    /// Returns user and password when both are set.
    pub fn pair(&self) -> Result<(&str, &str)> {
        match (self.user.as_deref(), self.password.as_deref()) {
            (Some(user), Some(password)) => Ok((user, password)),
            _ => Err(TransferError::CredentialsMissing),
        }
    }

    /// Whether both user and password are set.
    pub fn is_complete(&self) -> bool {
        self.user.is_some() && self.password.is_some()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("domain", &self.domain)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_requires_user_and_password() {
        let creds = Credentials::new(Some("admin".into()), Some("secret".into()), None);
        assert_eq!(creds.pair().unwrap(), ("admin", "secret"));
        assert!(creds.is_complete());
    }

    #[test]
    fn test_pair_missing_user() {
        let creds = Credentials::new(None, Some("x".into()), None);
        assert!(matches!(creds.pair(), Err(TransferError::CredentialsMissing)));
        assert!(!creds.is_complete());
    }

    #[test]
    fn test_pair_missing_password() {
        let creds = Credentials::new(Some("admin".into()), None, Some("CORP".into()));
        assert!(matches!(creds.pair(), Err(TransferError::CredentialsMissing)));
    }

    #[test]
    fn test_debug_hides_password() {
        let creds = Credentials::new(Some("admin".into()), Some("hunter2".into()), None);
        let debug = format!("{:?}", creds);
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }
}
