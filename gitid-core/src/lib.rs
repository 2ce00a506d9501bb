//! gitid-core: per-directory Git author identities
//!
//! Identities are persisted as `includeIf "gitdir:..."` entries in a managed
//! section of the global Git config, each pointing at a small credential
//! file carrying `user.name` and `user.email`.

pub mod config;
pub mod context;
pub mod editor;
pub mod identity;
pub mod logging;

pub use config::{ConfigError, GitIdConfig};
pub use context::AppContext;
pub use editor::{ConfigEditor, EditorError, FileConfigEditor, MemoryConfigEditor};
pub use identity::{Identity, IdentityError, Registry};
pub use logging::{init_logging, init_logging_with_config, LogConfig, LogLevel};

