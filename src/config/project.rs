//! Project manifest (publish.toml)
//!
//! Describes the project's coordinates and, per module, what gets
//! published: declared dependencies, the resolution views the dependency
//! resolver produced for them, and the built artifact files.
//!
//! ```toml
//! [project]
//! group = "com.coditory.klog"
//! version = "1.0.0"
//! description = "Logging toolkit"
//!
//! [[module]]
//! name = "core"
//! artifacts = [{ path = "core/build/libs/core.jar" }]
//!
//! [[module.dependency]]
//! coordinate = "org.slf4j:slf4j-api"
//! configuration = "api"
//! version = "2.0.0"
//!
//! [module.resolution.runtimeClasspath]
//! "org.slf4j:slf4j-api" = "2.0.9"
//!
//! [module.resolution.resolutionResult]
//! "org.slf4j:slf4j-api" = "2.0.9"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use super::ConfigError;
use crate::version_mapping::{Configuration, DependencyGraph};

/// Default manifest file name
pub const DEFAULT_MANIFEST: &str = "publish.toml";

/// Project-level metadata shared by all modules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Maven groupId
    pub group: String,

    pub version: String,

    /// Root project description, second link of the description chain
    #[serde(default)]
    pub description: Option<String>,
}

/// A dependency as declared in the module's build script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredDependency {
    /// `group:name`
    pub coordinate: String,

    pub configuration: Configuration,

    /// Requested version; the resolved version takes precedence
    #[serde(default)]
    pub version: Option<String>,
}

/// A built file to publish alongside the POM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFile {
    /// Path relative to the manifest directory
    pub path: PathBuf,

    /// Maven classifier, e.g. `sources` or `javadoc`
    #[serde(default)]
    pub classifier: Option<String>,

    /// Defaults to the file's own extension, then `jar`
    #[serde(default)]
    pub extension: Option<String>,
}

impl ArtifactFile {
    /// Extension used in the published file name.
    pub fn published_extension(&self) -> String {
        self.extension
            .clone()
            .or_else(|| {
                self.path
                    .extension()
                    .map(|e| e.to_string_lossy().to_string())
            })
            .unwrap_or_else(|| "jar".to_string())
    }
}

/// One publishable module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleSpec {
    #[serde(default)]
    pub name: String,

    /// Overrides the artifactId derived from `name`
    #[serde(default)]
    pub artifact_id: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default, rename = "dependency")]
    pub dependencies: Vec<DeclaredDependency>,

    /// Resolution views keyed by name (`runtimeClasspath`, `resolutionResult`, ...)
    #[serde(default)]
    pub resolution: BTreeMap<String, BTreeMap<String, String>>,

    #[serde(default)]
    pub artifacts: Vec<ArtifactFile>,
}

impl ModuleSpec {
    /// Create a bare module with only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Label for logs and reports; falls back to the override or `<unnamed>`.
    pub fn label(&self) -> &str {
        if !self.name.trim().is_empty() {
            self.name.as_str()
        } else {
            self.artifact_id
                .as_deref()
                .filter(|a| !a.trim().is_empty())
                .unwrap_or("<unnamed>")
        }
    }

    /// The module's dependency resolution result.
    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::from_views(self.resolution.clone())
    }
}

/// The whole manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectManifest {
    pub project: ProjectMetadata,

    #[serde(default, rename = "module")]
    pub modules: Vec<ModuleSpec>,
}

impl ProjectManifest {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;
        Self::from_str(&contents)
    }

    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        let manifest: ProjectManifest =
            toml::from_str(s).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Build-level checks. Per-module problems are left to assembly so one
    /// broken module does not block the others.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project.group.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "project.group must not be empty".to_string(),
            ));
        }

        if self.modules.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one [[module]] must be defined".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for module in &self.modules {
            let name = module.name.trim();
            if !name.is_empty() && !seen.insert(name) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate module name '{}'",
                    name
                )));
            }
        }

        Ok(())
    }
}
