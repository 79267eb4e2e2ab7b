//! Publishing configuration
//!
//! Organization defaults and publishing settings come from four layers,
//! later layers overriding earlier ones:
//! 1. Built-in defaults
//! 2. User config (~/.config/klog-publish/config.toml)
//! 3. Repo config (.klog/publish.toml)
//! 4. CLI `--set key=value` overrides
//!
//! The project manifest (`publish.toml`) is separate: it describes the
//! project and its modules rather than organization-wide policy.

mod defaults;
mod effective;
mod merge;
mod project;

pub use defaults::BuiltinDefaults;
pub use effective::{
    parse_override, ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig, PublishSettings,
    DEFAULT_REPO_CONFIG, USER_CONFIG_SUFFIX,
};
pub use merge::{deep_merge, merge_layers};
pub use project::{
    ArtifactFile, DeclaredDependency, ModuleSpec, ProjectManifest, ProjectMetadata,
    DEFAULT_MANIFEST,
};
