//! Publication assembly
//!
//! Combines project coordinates, the module's descriptor and its
//! version-mapped dependencies into one immutable [`Publication`]. Pure:
//! no I/O, no environment access.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use klog_pom::{PomDependency, PomDocument, PomWriter};

use crate::config::{ModuleSpec, ProjectMetadata};
use crate::descriptor::{build_descriptor, validate_coordinate, OrgDefaults, PublicationDescriptor};
use crate::error::{ConfigurationError, ConfigurationResult};
use crate::version_mapping::{map_dependencies, resolve_with_rules, VersionMapping, VersionMappingRules};

/// Maven coordinates of a publication
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinates {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl Coordinates {
    /// Directory of this publication inside a Maven repository layout.
    pub fn repository_path(&self) -> String {
        format!(
            "{}/{}/{}",
            self.group_id.replace('.', "/"),
            self.artifact_id,
            self.version
        )
    }

    /// `<artifactId>-<version>` prefix of every published file name.
    pub fn file_stem(&self) -> String {
        format!("{}-{}", self.artifact_id, self.version)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

/// Everything needed to stage one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub coordinates: Coordinates,
    pub descriptor: PublicationDescriptor,
    pub version_mapping: VersionMapping,
    pub dependencies: Vec<PomDependency>,
}

impl Publication {
    pub fn to_pom(&self) -> PomDocument {
        let d = &self.descriptor;
        PomDocument {
            group_id: self.coordinates.group_id.clone(),
            artifact_id: self.coordinates.artifact_id.clone(),
            version: self.coordinates.version.clone(),
            name: d.name.clone(),
            description: d.description.clone(),
            url: d.url.clone(),
            organization: d.organization.clone(),
            licenses: vec![d.license.clone()],
            developers: d.developers.clone(),
            scm: d.scm.clone(),
            issue_management: d.issue_management.clone(),
            dependencies: self.dependencies.clone(),
        }
    }

    /// POM XML, byte-for-byte what gets staged and signed.
    pub fn render_pom(&self) -> String {
        PomWriter::render(&self.to_pom())
    }
}

/// Assembles publications for the modules of one project.
#[derive(Debug, Clone)]
pub struct PublicationAssembler<'a> {
    project: &'a ProjectMetadata,
    org: OrgDefaults,
    rules: &'a VersionMappingRules,
}

impl<'a> PublicationAssembler<'a> {
    /// The project's description becomes the org-level fallback.
    pub fn new(project: &'a ProjectMetadata, org: &OrgDefaults, rules: &'a VersionMappingRules) -> Self {
        let org = org.clone().with_root_description(project.description.clone());
        Self { project, org, rules }
    }

    pub fn assemble(&self, module: &ModuleSpec) -> ConfigurationResult<Publication> {
        let version = self.project.version.trim();
        if version.is_empty() {
            return Err(ConfigurationError::MissingVersion);
        }
        validate_coordinate("version", version)?;
        let group_id = self.project.group.trim();
        validate_coordinate("groupId", group_id)?;

        let descriptor = build_descriptor(module, &self.org)?;
        let version_mapping = resolve_with_rules(self.rules, &module.dependency_graph())?;
        let dependencies = map_dependencies(&module.dependencies, &version_mapping)?;

        let coordinates = Coordinates {
            group_id: group_id.to_string(),
            artifact_id: descriptor.artifact_id.clone(),
            version: version.to_string(),
        };
        debug!(module = module.label(), %coordinates, dependencies = dependencies.len(), "assembled publication");

        Ok(Publication {
            coordinates,
            descriptor,
            version_mapping,
            dependencies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DeclaredDependency, EffectiveConfig};
    use crate::version_mapping::{Configuration, RESOLUTION_RESULT, RUNTIME_CLASSPATH};
    use klog_pom::Scope;
    use std::collections::BTreeMap;

    fn org() -> OrgDefaults {
        EffectiveConfig::build(None, None, None)
            .unwrap()
            .settings()
            .unwrap()
            .pom
    }

    fn project(description: Option<&str>) -> ProjectMetadata {
        ProjectMetadata {
            group: "com.coditory.klog".to_string(),
            version: "1.0.0".to_string(),
            description: description.map(str::to_string),
        }
    }

    fn module(name: &str) -> ModuleSpec {
        let mut module = ModuleSpec::named(name);
        let views: BTreeMap<String, String> =
            [("org.slf4j:slf4j-api".to_string(), "2.0.9".to_string())].into_iter().collect();
        module.resolution.insert(RUNTIME_CLASSPATH.to_string(), views.clone());
        module.resolution.insert(RESOLUTION_RESULT.to_string(), views);
        module.dependencies.push(DeclaredDependency {
            coordinate: "org.slf4j:slf4j-api".to_string(),
            configuration: Configuration::Api,
            version: Some("2.0.0".to_string()),
        });
        module
    }

    #[test]
    fn test_assemble_core_module() {
        let project = project(Some("Logging toolkit"));
        let rules = VersionMappingRules::standard();
        let assembler = PublicationAssembler::new(&project, &org(), &rules);

        let publication = assembler.assemble(&module("core")).unwrap();

        assert_eq!(publication.coordinates.to_string(), "com.coditory.klog:core:1.0.0");
        assert_eq!(publication.descriptor.description, "Logging toolkit");
        assert_eq!(publication.dependencies.len(), 1);
        assert_eq!(publication.dependencies[0].version, "2.0.9");
        assert_eq!(publication.dependencies[0].scope, Scope::Compile);
    }

    #[test]
    fn test_repository_path_and_stem() {
        let coordinates = Coordinates {
            group_id: "com.coditory.klog".to_string(),
            artifact_id: "klog-core".to_string(),
            version: "1.0.0".to_string(),
        };
        assert_eq!(coordinates.repository_path(), "com/coditory/klog/klog-core/1.0.0");
        assert_eq!(coordinates.file_stem(), "klog-core-1.0.0");
    }

    #[test]
    fn test_pom_carries_descriptor() {
        let project = project(None);
        let rules = VersionMappingRules::standard();
        let assembler = PublicationAssembler::new(&project, &org(), &rules);
        let publication = assembler.assemble(&module("core")).unwrap();

        let pom = publication.to_pom();
        assert_eq!(pom.validate(), Ok(()));
        assert_eq!(pom.licenses.len(), 1);
        assert_eq!(pom.description, "Kotlin logging library");

        let xml = publication.render_pom();
        assert!(xml.contains("<artifactId>core</artifactId>"));
        assert!(xml.contains("<version>2.0.9</version>"));
    }

    #[test]
    fn test_missing_view_fails_module() {
        let project = project(None);
        let rules = VersionMappingRules::standard();
        let assembler = PublicationAssembler::new(&project, &org(), &rules);

        let mut broken = module("core");
        broken.resolution.remove(RUNTIME_CLASSPATH);

        assert_eq!(
            assembler.assemble(&broken),
            Err(ConfigurationError::MissingResolutionView(RUNTIME_CLASSPATH.to_string()))
        );
    }

    #[test]
    fn test_blank_version_rejected() {
        let mut project = project(None);
        project.version = " ".to_string();
        let rules = VersionMappingRules::standard();
        let assembler = PublicationAssembler::new(&project, &org(), &rules);

        assert_eq!(assembler.assemble(&module("core")), Err(ConfigurationError::MissingVersion));
    }

    #[test]
    fn test_path_like_version_rejected() {
        let mut project = project(None);
        project.version = "../../../../escaped".to_string();
        let rules = VersionMappingRules::standard();
        let assembler = PublicationAssembler::new(&project, &org(), &rules);

        assert!(matches!(
            assembler.assemble(&module("core")),
            Err(ConfigurationError::InvalidCoordinate { field: "version", .. })
        ));
    }

    #[test]
    fn test_invalid_group_rejected() {
        let mut project = project(None);
        project.group = "com/coditory".to_string();
        let rules = VersionMappingRules::standard();
        let assembler = PublicationAssembler::new(&project, &org(), &rules);

        assert!(matches!(
            assembler.assemble(&module("core")),
            Err(ConfigurationError::InvalidCoordinate { field: "groupId", .. })
        ));
    }
}
