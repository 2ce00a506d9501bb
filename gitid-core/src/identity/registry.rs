//! In-memory identity registry
//!
//! The registry owns the name -> identity map and is the only way to mutate
//! it. Every mutation is persisted through the [`ConfigEditor`] first; the map
//! changes only after the editor reports success, so a failed call leaves
//! both the map and the files as they were.

use std::collections::HashMap;

use tracing::{debug, info};

use super::{Identity, IdentityError};
use crate::editor::ConfigEditor;

/// Identity store composed with the editor that persists it
pub struct Registry<E: ConfigEditor> {
    editor: E,
    identities: HashMap<String, Identity>,
}

impl<E: ConfigEditor> Registry<E> {
    /// Create an empty registry
    pub fn new(editor: E) -> Self {
        Self {
            editor,
            identities: HashMap::new(),
        }
    }

    /// Replace the whole map with `records` without touching disk
    ///
    /// Meant to seed the registry from [`ConfigEditor::load_existing`] once at
    /// startup. Prior content is discarded, not merged.
    pub fn load(&mut self, records: HashMap<String, Identity>) {
        debug!(count = records.len(), "loading identities into registry");
        self.identities = records;
    }

    /// Persist and register a new identity
    pub fn add(
        &mut self,
        name: &str,
        display_name: &str,
        email: &str,
        paths: Vec<String>,
    ) -> Result<&Identity, IdentityError> {
        if self.identities.contains_key(name) {
            return Err(IdentityError::AlreadyExists(name.to_string()));
        }

        let identity = Identity::new(name, display_name, email, paths);
        identity.validate()?;

        self.editor
            .persist_new(&identity)
            .map_err(|source| IdentityError::PersistenceFailed {
                name: name.to_string(),
                source,
            })?;

        info!(identity = name, paths = identity.paths.len(), "identity added");
        Ok(self
            .identities
            .entry(name.to_string())
            .or_insert(identity))
    }

    /// Remove an identity from disk and from the registry
    pub fn remove(&mut self, name: &str) -> Result<Identity, IdentityError> {
        if !self.identities.contains_key(name) {
            return Err(IdentityError::NotFound(name.to_string()));
        }

        self.editor
            .remove_existing(name)
            .map_err(|source| IdentityError::PersistenceFailed {
                name: name.to_string(),
                source,
            })?;

        info!(identity = name, "identity removed");
        self.identities
            .remove(name)
            .ok_or_else(|| IdentityError::NotFound(name.to_string()))
    }

    /// Look up one identity
    pub fn get(&self, name: &str) -> Result<&Identity, IdentityError> {
        self.identities
            .get(name)
            .ok_or_else(|| IdentityError::NotFound(name.to_string()))
    }

    /// All registered identities
    pub fn list(&self) -> &HashMap<String, Identity> {
        &self.identities
    }

    /// Identities covering `path`, sorted by name, with the matching prefix
    pub fn matching(&self, path: &str) -> Vec<(&Identity, &str)> {
        let mut matches: Vec<(&Identity, &str)> = self
            .identities
            .values()
            .filter_map(|identity| identity.matches(path).map(|prefix| (identity, prefix)))
            .collect();
        matches.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        matches
    }

    /// The editor backing this registry
    pub fn editor(&self) -> &E {
        &self.editor
    }
}
