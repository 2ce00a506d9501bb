//! File-backed config editor
//!
//! Every operation reads the whole global config file, builds the new
//! contents in memory and replaces the file with a single write. Writes go
//! to a sibling temporary file which is then renamed over the target, so a
//! reader sees either the old or the new contents. When the global config is
//! a symlink (common with dotfile managers) the link target is replaced and
//! the link itself is kept.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use super::section;
use super::{
    collect_identities, credential_file_name, gitdir_prefix, ConfigEditor, Credential, EditorError,
};
use crate::config::PathsConfig;
use crate::identity::Identity;

/// Config editor operating on the real files
#[derive(Debug, Clone)]
pub struct FileConfigEditor {
    global_config: PathBuf,
    identity_dir: PathBuf,
    home_dir: PathBuf,
}

impl FileConfigEditor {
    /// Editor for the locations in `paths`
    pub fn new(paths: &PathsConfig) -> Self {
        Self {
            global_config: paths.global_config.clone(),
            identity_dir: paths.identity_dir.clone(),
            home_dir: paths.home_dir.clone(),
        }
    }

    /// Global Git config file holding the managed section
    pub fn global_config_path(&self) -> &Path {
        &self.global_config
    }

    /// Credential file location for `name`
    pub fn credential_path(&self, name: &str) -> PathBuf {
        self.identity_dir.join(credential_file_name(name))
    }

    /// Global config contents; a missing file reads as empty
    fn read_global(&self) -> Result<String, EditorError> {
        match fs::read_to_string(&self.global_config) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(source) => Err(EditorError::Read {
                path: self.global_config.clone(),
                source,
            }),
        }
    }

    fn write_global(&self, contents: &str) -> Result<(), EditorError> {
        let target = fs::canonicalize(&self.global_config)
            .unwrap_or_else(|_| self.global_config.clone());
        write_atomic(&target, contents.as_bytes()).map_err(|source| EditorError::Write {
            path: self.global_config.clone(),
            source,
        })?;
        debug!(path = %self.global_config.display(), bytes = contents.len(), "global config written");
        Ok(())
    }

    fn read_credential(&self, name: &str) -> Result<Credential, EditorError> {
        let path = self.credential_path(name);
        let text = fs::read_to_string(&path).map_err(|source| EditorError::Read {
            path: path.clone(),
            source,
        })?;
        Credential::parse(&text).map_err(|missing| EditorError::IncompleteCredential {
            path,
            key: missing.0,
        })
    }

    fn write_credential(&self, name: &str, contents: &[u8]) -> Result<(), EditorError> {
        let path = self.credential_path(name);
        fs::create_dir_all(&self.identity_dir)
            .and_then(|_| write_atomic(&path, contents))
            .map_err(|source| EditorError::Write {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), "credential file written");
        Ok(())
    }

    /// Put a credential file back the way it was before a failed add
    fn restore_credential(&self, name: &str, previous: Option<Vec<u8>>) {
        let path = self.credential_path(name);
        let result = match previous {
            Some(bytes) => write_atomic(&path, &bytes),
            None => fs::remove_file(&path),
        };
        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "could not roll back credential file");
        }
    }
}

impl ConfigEditor for FileConfigEditor {
    fn load_existing(&self) -> Result<HashMap<String, Identity>, EditorError> {
        let text = self.read_global()?;
        let groups = section::parse_groups(&text)
            .map_err(|m| EditorError::malformed(&self.global_config, m))?;
        trace!(groups = groups.len(), "parsed managed section");

        Ok(collect_identities(groups, |name| self.read_credential(name)))
    }

    fn persist_new(&self, identity: &Identity) -> Result<(), EditorError> {
        if identity.paths.is_empty() {
            debug!(identity = %identity.name, "no paths, nothing to persist");
            return Ok(());
        }

        let prefixes: Vec<String> = identity
            .paths
            .iter()
            .map(|path| gitdir_prefix(path, &self.home_dir))
            .collect();
        let credential_path = self.credential_path(&identity.name);
        let entries =
            section::render_entries(&prefixes, &credential_path.to_string_lossy());

        let current = self.read_global()?;
        let updated = section::append_entries(&current, &entries)
            .map_err(|m| EditorError::malformed(&self.global_config, m))?;

        let previous = match fs::read(&credential_path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(source) => {
                return Err(EditorError::Read {
                    path: credential_path,
                    source,
                })
            }
        };
        let credential = Credential::new(&identity.display_name, &identity.email);
        self.write_credential(&identity.name, credential.render().as_bytes())?;

        if let Err(e) = self.write_global(&updated) {
            self.restore_credential(&identity.name, previous);
            return Err(e);
        }
        Ok(())
    }

    fn remove_existing(&self, name: &str) -> Result<(), EditorError> {
        let current = self.read_global()?;
        let updated = section::strip_identity(&current, name)
            .map_err(|m| EditorError::malformed(&self.global_config, m))?;

        let rewritten = match updated {
            Some(contents) => {
                self.write_global(&contents)?;
                true
            }
            None => {
                debug!(identity = name, "no managed entries to remove");
                false
            }
        };

        let path = self.credential_path(name);
        match fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "credential file removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                if rewritten {
                    if let Err(e) = self.write_global(&current) {
                        warn!(error = %e, "could not roll back global config");
                    }
                }
                return Err(EditorError::Remove { path, source });
            }
        }
        Ok(())
    }
}

/// Write data to a file atomically using temp-file-then-rename
///
/// Permissions of an existing target are carried over to the new file.
fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".gitid-tmp");
    let tmp = path.with_file_name(tmp_name);

    let result = (|| {
        let mut file = File::create(&tmp)?;
        file.write_all(data)?;
        file.sync_data()?;
        if let Ok(meta) = fs::metadata(path) {
            fs::set_permissions(&tmp, meta.permissions())?;
        }
        fs::rename(&tmp, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}
