// MIT License - Copyright (c) 2021 TJForc
// Credential lookup by key identifier

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

use crate::constants::NOT_SET;
use crate::error::{ElkError, Result};

/// A user/token pair for the M1XEP login prompt.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub user: String,
    pub token: String,
}

impl Credentials {
    /// Credentials that skip the login handshake.
    pub fn not_set() -> Self {
        Self {
            user: NOT_SET.to_string(),
            token: NOT_SET.to_string(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Resolves a key identifier to credentials.
pub trait CredentialStore: Send + Sync {
    fn resolve(&self, id: &str) -> Result<Credentials>;
}

/// In-memory credential table.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    entries: HashMap<String, Credentials>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, credentials: Credentials) {
        self.entries.insert(id.into(), credentials);
    }

    pub fn with(mut self, id: impl Into<String>, user: &str, token: &str) -> Self {
        self.insert(
            id,
            Credentials {
                user: user.to_string(),
                token: token.to_string(),
            },
        );
        self
    }
}

impl From<HashMap<String, Credentials>> for StaticCredentials {
    fn from(entries: HashMap<String, Credentials>) -> Self {
        Self { entries }
    }
}

impl CredentialStore for StaticCredentials {
    fn resolve(&self, id: &str) -> Result<Credentials> {
        if id == NOT_SET {
            return Ok(Credentials::not_set());
        }
        self.entries
            .get(id)
            .cloned()
            .ok_or_else(|| ElkError::UnknownCredentials { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() {
        let store = StaticCredentials::new().with("m1", "installer", "1234");
        let creds = store.resolve("m1").unwrap();
        assert_eq!(creds.user, "installer");
        assert_eq!(creds.token, "1234");
    }

    #[test]
    fn test_not_set_id() {
        let store = StaticCredentials::new();
        assert_eq!(store.resolve(NOT_SET).unwrap(), Credentials::not_set());
    }

    #[test]
    fn test_unknown_id() {
        let err = StaticCredentials::new().resolve("missing").unwrap_err();
        assert!(matches!(err, ElkError::UnknownCredentials { ref id } if id == "missing"));
    }

    #[test]
    fn test_debug_hides_token() {
        let creds = Credentials {
            user: "installer".into(),
            token: "1234".into(),
        };
        let shown = format!("{creds:?}");
        assert!(shown.contains("installer"));
        assert!(!shown.contains("1234"));
    }
}
