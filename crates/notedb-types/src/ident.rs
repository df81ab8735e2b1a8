use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Name, email, and timestamp recorded on commits and reflog entries.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonIdent {
    pub name: String,
    pub email: String,
    /// Milliseconds since the UNIX epoch.
    pub when_ms: u64,
}

impl PersonIdent {
    /// Create an identity stamped with `when_ms`.
    pub fn new(name: impl Into<String>, email: impl Into<String>, when_ms: u64) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            when_ms,
        }
    }

    /// Ident stamped with the current wall-clock time.
    pub fn now(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self::new(name, email, now_ms())
    }

    /// Same person, different timestamp.
    pub fn at(&self, when_ms: u64) -> Self {
        Self {
            when_ms,
            ..self.clone()
        }
    }
}

impl fmt::Display for PersonIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> {}", self.name, self.email, self.when_ms)
    }
}

/// Current wall-clock time in milliseconds since the UNIX epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_keeps_identity() {
        let ident = PersonIdent::new("Server", "server@example.com", 1);
        let later = ident.at(2000);
        assert_eq!(later.name, "Server");
        assert_eq!(later.when_ms, 2000);
        assert_eq!(later.to_string(), "Server <server@example.com> 2000");
    }

    #[test]
    fn now_is_after_epoch() {
        assert!(PersonIdent::now("a", "b").when_ms > 0);
    }
}
