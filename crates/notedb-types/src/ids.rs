//! Identifiers for changes, accounts, and projects.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Numeric id of a change.
///
/// Valid ids are positive. The field is public for literals; ids from
/// untrusted input should go through [`ChangeId::new`] or [`FromStr`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChangeId(pub i32);

impl ChangeId {
    /// Checked constructor; rejects zero and negative ids.
    pub fn new(id: i32) -> Result<Self, TypeError> {
        let change = ChangeId(id);
        if change.is_valid() {
            Ok(change)
        } else {
            Err(TypeError::InvalidId {
                kind: "change",
                value: id.to_string(),
            })
        }
    }

    pub fn get(self) -> i32 {
        self.0
    }

    pub fn is_valid(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChangeId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_positive(s, "change").map(ChangeId)
    }
}

/// Numeric id of a user account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub i32);

impl AccountId {
    pub fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_positive(s, "account").map(AccountId)
    }
}

fn parse_positive(s: &str, kind: &'static str) -> Result<i32, TypeError> {
    let invalid = || TypeError::InvalidId {
        kind,
        value: s.to_string(),
    };
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    match s.parse::<i32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(invalid()),
    }
}

/// Name of a project, which is also the name of its repository.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectName(String);

impl ProjectName {
    /// Validate and wrap a project name; rejects empty, absolute and `..` names.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.is_empty() || name.starts_with('/') || name.contains("..") {
            return Err(TypeError::InvalidProjectName(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
