//! Application context
//!
//! Built once at process start and passed to every command. Owns the
//! resolved configuration and the registry, which is seeded from disk
//! through the editor without re-persisting anything.

use tracing::{debug, warn};

use crate::config::GitIdConfig;
use crate::editor::{ConfigEditor, EditorError, FileConfigEditor};
use crate::identity::Registry;

pub struct AppContext<E: ConfigEditor = FileConfigEditor> {
    config: GitIdConfig,
    registry: Registry<E>,
    load_error: Option<EditorError>,
}

impl AppContext<FileConfigEditor> {
    /// Context over the real files named in `config`
    pub fn bootstrap(config: GitIdConfig) -> Self {
        let editor = FileConfigEditor::new(&config.paths);
        Self::with_editor(config, editor)
    }
}

impl<E: ConfigEditor> AppContext<E> {
    /// Context over an arbitrary editor
    ///
    /// A load failure does not abort construction: the registry starts empty
    /// and the error is kept for [`AppContext::load_error`], so read-only
    /// callers can carry on while mutating callers refuse.
    pub fn with_editor(config: GitIdConfig, editor: E) -> Self {
        let mut registry = Registry::new(editor);
        let load_error = match registry.editor().load_existing() {
            Ok(records) => {
                debug!(count = records.len(), "existing identities loaded");
                registry.load(records);
                None
            }
            Err(e) => {
                warn!(error = %e, "could not load existing identities");
                Some(e)
            }
        };

        Self {
            config,
            registry,
            load_error,
        }
    }

    pub fn config(&self) -> &GitIdConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry<E> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry<E> {
        &mut self.registry
    }

    /// Give up the context, keeping only the registry
    pub fn into_registry(self) -> Registry<E> {
        self.registry
    }

    /// Why the startup load failed, if it did
    pub fn load_error(&self) -> Option<&EditorError> {
        self.load_error.as_ref()
    }
}
