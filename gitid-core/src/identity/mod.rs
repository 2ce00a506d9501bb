//! Identity records and the in-memory registry
//!
//! An identity pairs a Git author (display name and email) with the
//! directory prefixes it applies to. Records are keyed by a short name such
//! as `work` or `personal`, which also names the identity's credential file.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::editor::EditorError;

pub mod registry;

pub use registry::Registry;

/// A Git author identity bound to a set of directories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Registry key, also embedded in the credential file name
    pub name: String,

    /// Value written as `user.name`
    pub display_name: String,

    /// Value written as `user.email`
    pub email: String,

    /// Absolute directory prefixes, without trailing separator
    pub paths: Vec<String>,
}

/// Errors surfaced by registry operations
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity '{0}' already exists")]
    AlreadyExists(String),

    #[error("identity '{0}' not found")]
    NotFound(String),

    #[error("failed to persist identity '{name}': {source}")]
    PersistenceFailed {
        name: String,
        #[source]
        source: EditorError,
    },

    #[error("invalid identity '{name}': {reason}")]
    InvalidIdentity { name: String, reason: String },
}

impl IdentityError {
    /// Name of the identity the failure concerns
    pub fn identity_name(&self) -> &str {
        match self {
            IdentityError::AlreadyExists(name) | IdentityError::NotFound(name) => name,
            IdentityError::PersistenceFailed { name, .. }
            | IdentityError::InvalidIdentity { name, .. } => name,
        }
    }
}

impl Identity {
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        email: impl Into<String>,
        paths: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            email: email.into(),
            paths,
        }
    }

    /// Check the fields before anything is written to disk
    ///
    /// Only emptiness, file-name safety and Git config syntax are checked;
    /// email syntax is not.
    pub fn validate(&self) -> Result<(), IdentityError> {
        let invalid = |reason: &str| IdentityError::InvalidIdentity {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if self
            .name
            .chars()
            .any(|c| c.is_whitespace() || c == '/' || c == '\\')
        {
            return Err(invalid(
                "name must not contain whitespace or path separators",
            ));
        }
        // The name ends up unquoted in a `path =` value.
        if self.name.contains(['#', ';', '"']) {
            return Err(invalid("name must not contain '#', ';' or '\"'"));
        }
        if self.display_name.trim().is_empty() {
            return Err(invalid("display name must not be empty"));
        }
        if self.email.trim().is_empty() {
            return Err(invalid("email must not be empty"));
        }
        if self.display_name.contains(['\n', '\r']) || self.email.contains(['\n', '\r']) {
            return Err(invalid("display name and email must fit on one line"));
        }
        if self.paths.iter().any(|p| p.trim().is_empty()) {
            return Err(invalid("paths must not be empty"));
        }
        // Each path becomes part of a quoted `gitdir:` header line.
        if self.paths.iter().any(|p| p.contains(['\n', '\r', '"'])) {
            return Err(invalid("paths must not contain line breaks or '\"'"));
        }
        Ok(())
    }

    /// First configured prefix covering `path`, if any
    ///
    /// Prefixes match whole path components: `/src/work` covers
    /// `/src/work` and `/src/work/api` but not `/src/workshop`.
    pub fn matches(&self, path: &str) -> Option<&str> {
        self.paths
            .iter()
            .map(String::as_str)
            .find(|prefix| covers(prefix, path))
    }
}

fn covers(prefix: &str, path: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
