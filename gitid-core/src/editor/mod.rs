//! Config editor module
//!
//! Owns the on-disk representation of identities: the managed section of the
//! global Git config file and one credential file per identity. The
//! [`ConfigEditor`] trait is the seam the registry persists through; the
//! file-backed editor is used by the CLI and the in-memory editor by tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use crate::identity::Identity;

pub mod credential;
pub mod file_editor;
pub mod memory_editor;
pub mod section;

pub use credential::Credential;
pub use file_editor::FileConfigEditor;
pub use memory_editor::MemoryConfigEditor;
pub use section::{SectionFault, CREDENTIAL_PREFIX, SECTION_END, SECTION_START};

/// Editor errors
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed managed section in {} at line {line}: {fault}", path.display())]
    MalformedSection {
        path: PathBuf,
        line: usize,
        fault: SectionFault,
    },

    #[error("credential file {} has no user.{key} entry", path.display())]
    IncompleteCredential { path: PathBuf, key: &'static str },
}

impl EditorError {
    fn malformed(path: &Path, malformed: section::Malformed) -> Self {
        EditorError::MalformedSection {
            path: path.to_path_buf(),
            line: malformed.line,
            fault: malformed.fault,
        }
    }
}

/// Persistence backend for the identity registry
///
/// Implementations must apply each call completely or not at all: on error
/// the global config file is left exactly as it was before the call.
pub trait ConfigEditor {
    /// Parse the managed section into identity records
    ///
    /// A missing global config file yields an empty map. Identities whose
    /// credential file cannot be read are left out of the result.
    fn load_existing(&self) -> Result<HashMap<String, Identity>, EditorError>;

    /// Write the credential file and one entry pair per path
    fn persist_new(&self, identity: &Identity) -> Result<(), EditorError>;

    /// Remove every entry for `name` and its credential file
    ///
    /// A credential file that is already gone is not an error.
    fn remove_existing(&self, name: &str) -> Result<(), EditorError>;
}

/// File name of the credential file for `name`
pub fn credential_file_name(name: &str) -> String {
    format!("{}{}", CREDENTIAL_PREFIX, name)
}

/// Expand a leading `~` against `home`
pub fn expand_home(path: &str, home: &Path) -> String {
    shellexpand::tilde_with_context(path, || Some(home.to_string_lossy().into_owned()))
        .into_owned()
}

/// Prefix as written into a `gitdir:` condition, with one trailing `/`
pub fn gitdir_prefix(path: &str, home: &Path) -> String {
    let expanded = expand_home(path, home);
    format!("{}/", expanded.trim_end_matches('/'))
}

/// Build identity records from parsed include groups
///
/// `read_credential` is called once per distinct name. Paths from several
/// groups of the same identity are concatenated in file order.
pub(crate) fn collect_identities<F>(
    groups: Vec<section::IncludeGroup>,
    mut read_credential: F,
) -> HashMap<String, Identity>
where
    F: FnMut(&str) -> Result<Credential, EditorError>,
{
    let mut identities: HashMap<String, Identity> = HashMap::new();
    let mut unreadable: Vec<String> = Vec::new();

    for group in groups {
        if let Some(identity) = identities.get_mut(&group.name) {
            identity.paths.extend(group.paths);
            continue;
        }
        if unreadable.contains(&group.name) {
            continue;
        }

        match read_credential(&group.name) {
            Ok(credential) => {
                identities.insert(
                    group.name.clone(),
                    Identity::new(
                        group.name,
                        credential.display_name,
                        credential.email,
                        group.paths,
                    ),
                );
            }
            Err(e) => {
                warn!(identity = %group.name, error = %e, "skipping identity with unreadable credential file");
                unreadable.push(group.name);
            }
        }
    }

    identities
}
