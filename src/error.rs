//! Error types for publication assembly.

use thiserror::Error;

use crate::version_mapping::Usage;

/// A module's publication cannot be assembled from its configuration.
///
/// Fatal for the affected module only; other modules keep publishing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("cannot derive artifactId: module has no name and no artifact_id override")]
    MissingArtifactId,

    #[error("invalid {field} '{value}': only letters, digits, '.', '_' and '-' are allowed, and it must not start with '.'")]
    InvalidCoordinate { field: &'static str, value: String },

    #[error("version mapping has no rule for usage '{0}'")]
    MissingVersionMapping(Usage),

    #[error("dependency graph has no '{0}' resolution view")]
    MissingResolutionView(String),

    #[error("dependency '{0}' has no declared version and was not resolved")]
    UnresolvedDependency(String),

    #[error("invalid dependency coordinate '{0}': expected group:name")]
    MalformedDependency(String),

    #[error("project version is blank")]
    MissingVersion,

    #[error("artifactId '{artifact_id}' is already published by module '{module}'")]
    DuplicateArtifactId { artifact_id: String, module: String },
}

/// Result type for assembly operations
pub type ConfigurationResult<T> = Result<T, ConfigurationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_problem() {
        assert!(ConfigurationError::MissingVersionMapping(Usage::JavaApi)
            .to_string()
            .contains("java-api"));
        assert!(ConfigurationError::MissingResolutionView("runtimeClasspath".to_string())
            .to_string()
            .contains("runtimeClasspath"));
        assert!(ConfigurationError::InvalidCoordinate {
            field: "artifactId",
            value: "a b".to_string()
        }
        .to_string()
        .contains("'a b'"));
    }
}
