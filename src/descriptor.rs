//! Publication descriptor
//!
//! Pure derivation of the POM metadata for one module from the module
//! itself and the organization-wide defaults.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use klog_pom::{Developer, IssueManagement, License, Organization, Scm};

use crate::config::ModuleSpec;
use crate::error::{ConfigurationError, ConfigurationResult};

/// Placeholder substituted with the repository slug in URL templates.
const REPOSITORY_PLACEHOLDER: &str = "{repository}";

/// Organization-wide publishing defaults.
///
/// URL fields are templates; `{repository}` expands to [`Self::repository`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgDefaults {
    /// `owner/name` slug of the source repository
    pub repository: String,

    pub url_template: String,

    /// Last link of the description chain
    pub default_description: String,

    /// Project-root description, filled in from the project manifest
    #[serde(default)]
    pub root_description: Option<String>,

    pub organization: Organization,
    pub license: License,
    pub developers: Vec<Developer>,
    pub scm: Scm,
    pub issue_management: IssueManagement,
}

impl OrgDefaults {
    /// Copy with the project-root description set.
    pub fn with_root_description(mut self, description: Option<String>) -> Self {
        self.root_description = description;
        self
    }

    fn expand(&self, template: &str) -> String {
        template.replace(REPOSITORY_PLACEHOLDER, &self.repository)
    }
}

/// Fully resolved POM metadata for one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationDescriptor {
    pub artifact_id: String,
    pub name: String,
    pub description: String,
    pub url: String,
    pub organization: Organization,
    pub license: License,
    pub developers: Vec<Developer>,
    pub scm: Scm,
    pub issue_management: IssueManagement,
}

/// First candidate that is present and not blank.
pub fn first_non_blank<'a, I>(candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    candidates
        .into_iter()
        .flatten()
        .find(|c| !c.trim().is_empty())
}

fn coordinate_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_\-][A-Za-z0-9_.\-]*$").expect("static pattern compiles"))
}

/// Check a coordinate element against the characters Maven accepts.
///
/// Used for every value that becomes a path segment or file name in the
/// repository layout: groupId, artifactId, version, classifier, extension.
pub fn validate_coordinate(field: &'static str, value: &str) -> ConfigurationResult<()> {
    if coordinate_pattern().is_match(value) {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidCoordinate {
            field,
            value: value.to_string(),
        })
    }
}

/// Derive the artifactId: explicit override, then module name.
pub fn derive_artifact_id(module: &ModuleSpec) -> ConfigurationResult<String> {
    let artifact_id = first_non_blank([module.artifact_id.as_deref(), Some(module.name.as_str())])
        .map(str::trim)
        .ok_or(ConfigurationError::MissingArtifactId)?;
    validate_coordinate("artifactId", artifact_id)?;
    Ok(artifact_id.to_string())
}

/// Build the descriptor for one module.
///
/// The description falls back from the module, to the project root, to
/// the organization's default string.
pub fn build_descriptor(
    module: &ModuleSpec,
    org: &OrgDefaults,
) -> ConfigurationResult<PublicationDescriptor> {
    let artifact_id = derive_artifact_id(module)?;

    let description = first_non_blank([
        module.description.as_deref(),
        org.root_description.as_deref(),
    ])
    .unwrap_or(org.default_description.as_str())
    .to_string();

    Ok(PublicationDescriptor {
        name: artifact_id.clone(),
        artifact_id,
        description,
        url: org.expand(&org.url_template),
        organization: org.organization.clone(),
        license: org.license.clone(),
        developers: org.developers.clone(),
        scm: Scm {
            connection: org.expand(&org.scm.connection),
            url: org.expand(&org.scm.url),
        },
        issue_management: IssueManagement {
            system: org.issue_management.system.clone(),
            url: org.expand(&org.issue_management.url),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EffectiveConfig;

    fn org() -> OrgDefaults {
        EffectiveConfig::build(None, None, None)
            .unwrap()
            .settings()
            .unwrap()
            .pom
    }

    #[test]
    fn test_descriptor_from_defaults() {
        let descriptor = build_descriptor(&ModuleSpec::named("klog-core"), &org()).unwrap();

        assert_eq!(descriptor.artifact_id, "klog-core");
        assert_eq!(descriptor.name, "klog-core");
        assert_eq!(descriptor.description, "Kotlin logging library");
        assert_eq!(descriptor.url, "https://github.com/coditory/klog");
        assert_eq!(descriptor.scm.connection, "scm:git:git://github.com/coditory/klog.git");
        assert_eq!(descriptor.issue_management.url, "https://github.com/coditory/klog/issues");
        assert_eq!(descriptor.issue_management.system, "GitHub");
        assert_eq!(descriptor.license.name, "The Apache License, Version 2.0");
        assert_eq!(descriptor.developers[0].email, "ogesaku@gmail.com");
    }

    #[test]
    fn test_module_description_wins() {
        let mut module = ModuleSpec::named("core");
        module.description = Some("Core API".to_string());
        let org = org().with_root_description(Some("Logging toolkit".to_string()));

        assert_eq!(build_descriptor(&module, &org).unwrap().description, "Core API");
    }

    #[test]
    fn test_root_description_fallback() {
        let org = org().with_root_description(Some("Logging toolkit".to_string()));
        let descriptor = build_descriptor(&ModuleSpec::named("core"), &org).unwrap();
        assert_eq!(descriptor.description, "Logging toolkit");
    }

    #[test]
    fn test_blank_descriptions_fall_through() {
        let mut module = ModuleSpec::named("core");
        module.description = Some("   ".to_string());
        let org = org().with_root_description(Some("".to_string()));

        let descriptor = build_descriptor(&module, &org).unwrap();
        assert_eq!(descriptor.description, "Kotlin logging library");
    }

    #[test]
    fn test_artifact_id_override() {
        let mut module = ModuleSpec::named("core");
        module.artifact_id = Some("klog-core".to_string());
        assert_eq!(derive_artifact_id(&module).unwrap(), "klog-core");
    }

    #[test]
    fn test_blank_override_falls_back_to_name() {
        let mut module = ModuleSpec::named("core");
        module.artifact_id = Some(" ".to_string());
        assert_eq!(derive_artifact_id(&module).unwrap(), "core");
    }

    #[test]
    fn test_missing_artifact_id() {
        let result = build_descriptor(&ModuleSpec::named(""), &org());
        assert_eq!(result, Err(ConfigurationError::MissingArtifactId));

        let result = build_descriptor(&ModuleSpec::named("  "), &org());
        assert_eq!(result, Err(ConfigurationError::MissingArtifactId));
    }

    #[test]
    fn test_unnamed_module_with_override() {
        let mut module = ModuleSpec::named("");
        module.artifact_id = Some("klog-bom".to_string());
        assert_eq!(build_descriptor(&module, &org()).unwrap().artifact_id, "klog-bom");
    }

    #[test]
    fn test_invalid_artifact_id_characters() {
        let result = derive_artifact_id(&ModuleSpec::named("klog core"));
        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidCoordinate { field: "artifactId", .. })
        ));
    }

    #[test]
    fn test_coordinate_rejects_path_segments() {
        for value in ["..", ".", "../../escaped", "1.0/../x", ".hidden", "a\\b", ""] {
            assert!(
                validate_coordinate("version", value).is_err(),
                "accepted {:?}",
                value
            );
        }
        for value in ["1.0.0", "1.0.0-SNAPSHOT", "2.0.0-rc.1", "klog_core", "sources"] {
            assert_eq!(validate_coordinate("version", value), Ok(()));
        }
    }

    #[test]
    fn test_first_non_blank() {
        assert_eq!(first_non_blank([None, Some(""), Some("b"), Some("c")]), Some("b"));
        assert_eq!(first_non_blank([None, Some(" \t")]), None);
        assert_eq!(first_non_blank(Vec::<Option<&str>>::new()), None);
    }

    #[test]
    fn test_custom_repository_templates() {
        let mut org = org();
        org.repository = "acme/alog".to_string();
        let descriptor = build_descriptor(&ModuleSpec::named("core"), &org).unwrap();

        assert_eq!(descriptor.url, "https://github.com/acme/alog");
        assert_eq!(descriptor.scm.url, "https://github.com/acme/alog");
    }
}
