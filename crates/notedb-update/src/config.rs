//! Coordinator configuration.
//!
//! ```toml
//! all_users_project = "All-Users"
//! ref_log_message = "Update NoteDb refs"
//!
//! [server_ident]
//! name = "Gerrit Code Review"
//! email = "noreply@example.com"
//!
//! [migration]
//! write_changes = true
//! read_only = false
//! ```

use serde::{Deserialize, Serialize};

use notedb_types::{PersonIdent, ProjectName};

use crate::error::{UpdateError, UpdateResult};

/// Settings for writing change metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteDbConfig {
    /// Project holding every account's draft comments.
    pub all_users_project: String,
    /// Identity stamped on reflog entries when the caller sets none.
    pub server_ident: ServerIdent,
    pub ref_log_message: String,
    pub migration: NotesMigration,
}

impl Default for NoteDbConfig {
    fn default() -> Self {
        Self {
            all_users_project: "All-Users".into(),
            server_ident: ServerIdent::default(),
            ref_log_message: "Update NoteDb refs".into(),
            migration: NotesMigration::default(),
        }
    }
}

impl NoteDbConfig {
    /// Parse a config from TOML; missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> UpdateResult<Self> {
        toml::from_str(s).map_err(|e| UpdateError::Config(e.to_string()))
    }

    /// The All-Users project name, validated.
    pub fn all_users_name(&self) -> UpdateResult<ProjectName> {
        Ok(ProjectName::new(self.all_users_project.as_str())?)
    }
}

/// Identity used for commits and reflog entries written by the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerIdent {
    pub name: String,
    pub email: String,
}

impl Default for ServerIdent {
    fn default() -> Self {
        Self {
            name: "Gerrit Code Review".into(),
            email: "noreply@example.com".into(),
        }
    }
}

impl ServerIdent {
    pub fn to_person_ident(&self) -> PersonIdent {
        PersonIdent::now(self.name.as_str(), self.email.as_str())
    }
}

/// Global switches controlling whether NoteDb is written at all.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotesMigration {
    pub write_changes: bool,
    pub read_only: bool,
}

impl Default for NotesMigration {
    fn default() -> Self {
        Self {
            write_changes: true,
            read_only: false,
        }
    }
}

impl NotesMigration {
    /// When false every manager reports itself empty and commits nothing.
    pub fn commit_change_writes(&self) -> bool {
        self.write_changes
    }

    /// Whether writes must be refused outright.
    pub fn fail_change_writes(&self) -> bool {
        self.read_only
    }
}
