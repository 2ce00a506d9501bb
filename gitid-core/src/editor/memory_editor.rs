//! In-memory config editor for testing
//!
//! Keeps the global config text and the credential files in memory and runs
//! the same section logic as the file-backed editor. Writes can be made to
//! fail on demand to exercise the registry's all-or-nothing behavior.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use super::section;
use super::{
    collect_identities, credential_file_name, gitdir_prefix, ConfigEditor, Credential, EditorError,
};
use crate::config::GLOBAL_CONFIG_FILE_NAME;
use crate::identity::Identity;

/// In-memory editor (non-persistent, for tests)
#[derive(Debug)]
pub struct MemoryConfigEditor {
    home_dir: PathBuf,
    global: RwLock<String>,
    credentials: RwLock<HashMap<String, String>>,
    writes_until_failure: AtomicUsize,
}

impl MemoryConfigEditor {
    /// Empty editor whose virtual files live under `home_dir`
    pub fn new(home_dir: impl Into<PathBuf>) -> Self {
        Self {
            home_dir: home_dir.into(),
            global: RwLock::new(String::new()),
            credentials: RwLock::new(HashMap::new()),
            writes_until_failure: AtomicUsize::new(0),
        }
    }

    /// Current global config text
    pub fn global_config_text(&self) -> String {
        self.global
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the global config text, bypassing the editor logic
    pub fn set_global_config_text(&self, text: impl Into<String>) {
        *self.global.write().unwrap_or_else(PoisonError::into_inner) = text.into();
    }

    /// Current credential file text for `name`
    pub fn credential_text(&self, name: &str) -> Option<String> {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Replace or delete a credential file, bypassing the editor logic
    pub fn set_credential_text(&self, name: &str, text: Option<String>) {
        let mut credentials = self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match text {
            Some(text) => credentials.insert(name.to_string(), text),
            None => credentials.remove(name),
        };
    }

    /// Make the next write (credential or global config) fail
    pub fn fail_next_write(&self) {
        self.fail_nth_write(1);
    }

    /// Make the `n`th write from now fail; `0` disables injection
    pub fn fail_nth_write(&self, n: usize) {
        self.writes_until_failure.store(n, Ordering::SeqCst);
    }

    fn global_path(&self) -> PathBuf {
        self.home_dir.join(GLOBAL_CONFIG_FILE_NAME)
    }

    fn credential_path(&self, name: &str) -> PathBuf {
        self.home_dir.join(credential_file_name(name))
    }

    fn check_write(&self, path: &Path) -> Result<(), EditorError> {
        let remaining = self.writes_until_failure.load(Ordering::SeqCst);
        if remaining > 0 {
            self.writes_until_failure.store(remaining - 1, Ordering::SeqCst);
        }
        if remaining == 1 {
            return Err(EditorError::Write {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "injected write failure"),
            });
        }
        Ok(())
    }

    fn write_global(&self, text: String) -> Result<(), EditorError> {
        self.check_write(&self.global_path())?;
        self.set_global_config_text(text);
        Ok(())
    }

    fn write_credential(&self, name: &str, text: Option<String>) -> Result<(), EditorError> {
        self.check_write(&self.credential_path(name))?;
        self.set_credential_text(name, text);
        Ok(())
    }

    fn read_credential(&self, name: &str) -> Result<Credential, EditorError> {
        let path = self.credential_path(name);
        let text = self.credential_text(name).ok_or_else(|| EditorError::Read {
            path: path.clone(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such credential file"),
        })?;
        Credential::parse(&text)
            .map_err(|missing| EditorError::IncompleteCredential { path, key: missing.0 })
    }
}

impl ConfigEditor for MemoryConfigEditor {
    fn load_existing(&self) -> Result<HashMap<String, Identity>, EditorError> {
        let groups = section::parse_groups(&self.global_config_text())
            .map_err(|m| EditorError::malformed(&self.global_path(), m))?;
        Ok(collect_identities(groups, |name| self.read_credential(name)))
    }

    fn persist_new(&self, identity: &Identity) -> Result<(), EditorError> {
        if identity.paths.is_empty() {
            return Ok(());
        }

        let prefixes: Vec<String> = identity
            .paths
            .iter()
            .map(|path| gitdir_prefix(path, &self.home_dir))
            .collect();
        let credential_path = self.credential_path(&identity.name);
        let entries = section::render_entries(&prefixes, &credential_path.to_string_lossy());
        let updated = section::append_entries(&self.global_config_text(), &entries)
            .map_err(|m| EditorError::malformed(&self.global_path(), m))?;

        let previous = self.credential_text(&identity.name);
        let credential = Credential::new(&identity.display_name, &identity.email);
        self.write_credential(&identity.name, Some(credential.render()))?;

        if let Err(e) = self.write_global(updated) {
            self.set_credential_text(&identity.name, previous);
            return Err(e);
        }
        Ok(())
    }

    fn remove_existing(&self, name: &str) -> Result<(), EditorError> {
        let current = self.global_config_text();
        let updated = section::strip_identity(&current, name)
            .map_err(|m| EditorError::malformed(&self.global_path(), m))?;
        let rewritten = updated.is_some();
        if let Some(text) = updated {
            self.write_global(text)?;
        }
        if self.credential_text(name).is_some() {
            if let Err(e) = self.write_credential(name, None) {
                if rewritten {
                    self.set_global_config_text(current);
                }
                return Err(e);
            }
        }
        Ok(())
    }
}
