//! Built-in defaults (layer 1)
//!
//! The organization metadata every klog module is published with.

use serde::{Deserialize, Serialize};

/// Literal description used when neither the module nor the project has one.
pub const DEFAULT_DESCRIPTION: &str = "Kotlin logging library";

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// GitHub repository slug substituted into `{repository}` templates
    pub repository: String,

    pub organization_name: String,
    pub organization_url: String,

    pub license_name: String,
    pub license_url: String,

    /// (id, name, email)
    pub developers: Vec<(String, String, String)>,

    pub default_description: String,

    /// Nexus staging API of OSSRH
    pub nexus_url: String,

    /// Snapshot repository of OSSRH
    pub snapshot_url: String,

    /// Resolution view backing the `java-api` usage
    pub java_api_view: String,

    /// Resolution view backing the `java-runtime` usage
    pub java_runtime_view: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            repository: "coditory/klog".to_string(),
            organization_name: "Coditory".to_string(),
            organization_url: "https://coditory.com".to_string(),
            license_name: "The Apache License, Version 2.0".to_string(),
            license_url: "https://www.apache.org/licenses/LICENSE-2.0.txt".to_string(),
            developers: vec![(
                "ogesaku".to_string(),
                "ogesaku".to_string(),
                "ogesaku@gmail.com".to_string(),
            )],
            default_description: DEFAULT_DESCRIPTION.to_string(),
            nexus_url: "https://oss.sonatype.org/service/local/".to_string(),
            snapshot_url: "https://oss.sonatype.org/content/repositories/snapshots/".to_string(),
            java_api_view: "runtimeClasspath".to_string(),
            java_runtime_view: "resolutionResult".to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        let developers: Vec<serde_json::Value> = self
            .developers
            .iter()
            .map(|(id, name, email)| serde_json::json!({"id": id, "name": name, "email": email}))
            .collect();

        serde_json::json!({
            "pom": {
                "repository": self.repository,
                "url_template": "https://github.com/{repository}",
                "default_description": self.default_description,
                "organization": {
                    "name": self.organization_name,
                    "url": self.organization_url
                },
                "license": {
                    "name": self.license_name,
                    "url": self.license_url
                },
                "developers": developers,
                "scm": {
                    "connection": "scm:git:git://github.com/{repository}.git",
                    "url": "https://github.com/{repository}"
                },
                "issue_management": {
                    "system": "GitHub",
                    "url": "https://github.com/{repository}/issues"
                }
            },
            "repository": {
                "nexus_url": self.nexus_url,
                "snapshot_url": self.snapshot_url
            },
            "version_mapping": {
                "java-api": self.java_api_view,
                "java-runtime": self.java_runtime_view
            }
        })
    }
}
