//! Version mapping
//!
//! Decides which resolved versions end up in the published POM. Each
//! usage a consumer can select is bound to one resolution view:
//!
//! - `java-api` -> the `runtimeClasspath` view
//! - `java-runtime` -> the full resolution result
//!
//! Both rules must be present.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use klog_pom::{PomDependency, Scope};

use crate::config::DeclaredDependency;
use crate::error::{ConfigurationError, ConfigurationResult};

/// Name of the runtime classpath resolution view.
pub const RUNTIME_CLASSPATH: &str = "runtimeClasspath";

/// Name of the full resolution result view.
pub const RESOLUTION_RESULT: &str = "resolutionResult";

/// Consumption mode a dependent build selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Usage {
    #[serde(rename = "java-api")]
    JavaApi,
    #[serde(rename = "java-runtime")]
    JavaRuntime,
}

impl Usage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JavaApi => "java-api",
            Self::JavaRuntime => "java-runtime",
        }
    }

    /// POM scope a dependency published under this usage gets.
    pub fn scope(&self) -> Scope {
        match self {
            Self::JavaApi => Scope::Compile,
            Self::JavaRuntime => Scope::Runtime,
        }
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build configuration a dependency was declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Configuration {
    Api,
    Implementation,
    RuntimeOnly,
    CompileOnly,
    TestImplementation,
    TestRuntimeOnly,
    IntegrationTestImplementation,
}

impl Configuration {
    /// Usage the dependency is published under, `None` if it stays private.
    pub fn usage(&self) -> Option<Usage> {
        match self {
            Self::Api => Some(Usage::JavaApi),
            Self::Implementation | Self::RuntimeOnly => Some(Usage::JavaRuntime),
            Self::CompileOnly
            | Self::TestImplementation
            | Self::TestRuntimeOnly
            | Self::IntegrationTestImplementation => None,
        }
    }
}

/// Where a usage takes its versions from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum ResolutionSource {
    /// A named classpath view
    Classpath(String),
    /// The complete resolution result
    ResolutionResult,
}

impl ResolutionSource {
    pub fn parse(name: &str) -> Self {
        if name == RESOLUTION_RESULT {
            Self::ResolutionResult
        } else {
            Self::Classpath(name.to_string())
        }
    }

    pub fn view_name(&self) -> &str {
        match self {
            Self::Classpath(name) => name,
            Self::ResolutionResult => RESOLUTION_RESULT,
        }
    }
}

/// Configured mapping rules, by view name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMappingRules {
    #[serde(rename = "java-api", default)]
    pub java_api: Option<String>,

    #[serde(rename = "java-runtime", default)]
    pub java_runtime: Option<String>,
}

impl VersionMappingRules {
    /// `java-api` from `runtimeClasspath`, `java-runtime` from the full result.
    pub fn standard() -> Self {
        Self {
            java_api: Some(RUNTIME_CLASSPATH.to_string()),
            java_runtime: Some(RESOLUTION_RESULT.to_string()),
        }
    }

    /// Resolution source configured for a usage.
    pub fn source_for(&self, usage: Usage) -> ConfigurationResult<ResolutionSource> {
        let rule = match usage {
            Usage::JavaApi => &self.java_api,
            Usage::JavaRuntime => &self.java_runtime,
        };
        rule.as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ResolutionSource::parse)
            .ok_or(ConfigurationError::MissingVersionMapping(usage))
    }
}

/// `group:name` -> resolved version
pub type ResolvedVersions = BTreeMap<String, String>;

/// Result of dependency resolution for one module, as named views.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGraph {
    views: BTreeMap<String, ResolvedVersions>,
}

impl DependencyGraph {
    pub fn from_views(views: BTreeMap<String, ResolvedVersions>) -> Self {
        Self { views }
    }

    /// Add or replace a view.
    pub fn with_view(mut self, name: impl Into<String>, versions: ResolvedVersions) -> Self {
        self.views.insert(name.into(), versions);
        self
    }

    pub fn view(&self, name: &str) -> Option<&ResolvedVersions> {
        self.views.get(name)
    }

    pub fn view_names(&self) -> impl Iterator<Item = &str> {
        self.views.keys().map(String::as_str)
    }
}

/// A usage bound to the versions of its resolution view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedView {
    pub source: ResolutionSource,
    pub versions: ResolvedVersions,
}

/// Both usage rules, bound to concrete views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMapping {
    pub java_api: ResolvedView,
    pub java_runtime: ResolvedView,
}

impl VersionMapping {
    pub fn view(&self, usage: Usage) -> &ResolvedView {
        match usage {
            Usage::JavaApi => &self.java_api,
            Usage::JavaRuntime => &self.java_runtime,
        }
    }

    /// Resolved version of `coordinate` as seen by `usage`.
    pub fn version_for(&self, usage: Usage, coordinate: &str) -> Option<&str> {
        self.view(usage).versions.get(coordinate).map(String::as_str)
    }
}

/// Bind the standard rules to a dependency graph.
pub fn resolve_version_mapping(graph: &DependencyGraph) -> ConfigurationResult<VersionMapping> {
    resolve_with_rules(&VersionMappingRules::standard(), graph)
}

/// Bind configured rules to a dependency graph.
///
/// Fails if either rule is missing or names a view the graph lacks.
pub fn resolve_with_rules(
    rules: &VersionMappingRules,
    graph: &DependencyGraph,
) -> ConfigurationResult<VersionMapping> {
    let bind = |usage: Usage| -> ConfigurationResult<ResolvedView> {
        let source = rules.source_for(usage)?;
        let versions = graph
            .view(source.view_name())
            .ok_or_else(|| ConfigurationError::MissingResolutionView(source.view_name().to_string()))?
            .clone();
        debug!(%usage, view = source.view_name(), entries = versions.len(), "bound version mapping");
        Ok(ResolvedView { source, versions })
    };

    Ok(VersionMapping {
        java_api: bind(Usage::JavaApi)?,
        java_runtime: bind(Usage::JavaRuntime)?,
    })
}

/// Translate declared dependencies into POM dependencies.
///
/// Private configurations are dropped. The published version is the one
/// the usage's view resolved, else the declared version. A coordinate
/// declared under both usages is published once, with `compile` scope.
pub fn map_dependencies(
    declared: &[DeclaredDependency],
    mapping: &VersionMapping,
) -> ConfigurationResult<Vec<PomDependency>> {
    let mut published: Vec<PomDependency> = Vec::new();

    for dep in declared {
        let Some(usage) = dep.configuration.usage() else {
            continue;
        };

        let (group_id, artifact_id) = dep
            .coordinate
            .split_once(':')
            .filter(|(g, a)| !g.trim().is_empty() && !a.trim().is_empty() && !a.contains(':'))
            .ok_or_else(|| ConfigurationError::MalformedDependency(dep.coordinate.clone()))?;

        let version = mapping
            .version_for(usage, &dep.coordinate)
            .or(dep.version.as_deref())
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigurationError::UnresolvedDependency(dep.coordinate.clone()))?;

        let entry = PomDependency {
            group_id: group_id.trim().to_string(),
            artifact_id: artifact_id.trim().to_string(),
            version: version.to_string(),
            scope: usage.scope(),
        };

        match published
            .iter_mut()
            .find(|p| p.group_id == entry.group_id && p.artifact_id == entry.artifact_id)
        {
            Some(existing) if existing.scope == Scope::Runtime && entry.scope == Scope::Compile => {
                *existing = entry;
            }
            Some(_) => {}
            None => published.push(entry),
        }
    }

    Ok(published)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versions(pairs: &[(&str, &str)]) -> ResolvedVersions {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn graph() -> DependencyGraph {
        DependencyGraph::default()
            .with_view(
                RUNTIME_CLASSPATH,
                versions(&[("org.slf4j:slf4j-api", "2.0.9"), ("org.yaml:snakeyaml", "2.2")]),
            )
            .with_view(
                RESOLUTION_RESULT,
                versions(&[
                    ("org.slf4j:slf4j-api", "2.0.9"),
                    ("org.yaml:snakeyaml", "2.2"),
                    ("com.ibm.icu:icu4j", "74.1"),
                ]),
            )
    }

    fn declared(coordinate: &str, configuration: Configuration, version: Option<&str>) -> DeclaredDependency {
        DeclaredDependency {
            coordinate: coordinate.to_string(),
            configuration,
            version: version.map(str::to_string),
        }
    }

    #[test]
    fn test_standard_mapping_binds_both_views() {
        let mapping = resolve_version_mapping(&graph()).unwrap();

        assert_eq!(
            mapping.java_api.source,
            ResolutionSource::Classpath(RUNTIME_CLASSPATH.to_string())
        );
        assert_eq!(mapping.java_runtime.source, ResolutionSource::ResolutionResult);
        assert_eq!(mapping.version_for(Usage::JavaApi, "com.ibm.icu:icu4j"), None);
        assert_eq!(mapping.version_for(Usage::JavaRuntime, "com.ibm.icu:icu4j"), Some("74.1"));
    }

    #[test]
    fn test_missing_runtime_classpath_view() {
        let graph = DependencyGraph::default().with_view(RESOLUTION_RESULT, versions(&[]));
        assert_eq!(
            resolve_version_mapping(&graph),
            Err(ConfigurationError::MissingResolutionView(RUNTIME_CLASSPATH.to_string()))
        );
    }

    #[test]
    fn test_missing_resolution_result_view() {
        let graph = DependencyGraph::default().with_view(RUNTIME_CLASSPATH, versions(&[]));
        assert_eq!(
            resolve_version_mapping(&graph),
            Err(ConfigurationError::MissingResolutionView(RESOLUTION_RESULT.to_string()))
        );
    }

    #[test]
    fn test_one_rule_missing_is_configuration_error() {
        let rules = VersionMappingRules {
            java_api: Some(RUNTIME_CLASSPATH.to_string()),
            java_runtime: None,
        };
        assert_eq!(
            resolve_with_rules(&rules, &graph()),
            Err(ConfigurationError::MissingVersionMapping(Usage::JavaRuntime))
        );

        let blank = VersionMappingRules {
            java_api: Some("  ".to_string()),
            java_runtime: Some(RESOLUTION_RESULT.to_string()),
        };
        assert_eq!(
            resolve_with_rules(&blank, &graph()),
            Err(ConfigurationError::MissingVersionMapping(Usage::JavaApi))
        );
    }

    #[test]
    fn test_custom_classpath_rule() {
        let rules = VersionMappingRules {
            java_api: Some("compileClasspath".to_string()),
            java_runtime: Some(RESOLUTION_RESULT.to_string()),
        };
        let graph = graph().with_view("compileClasspath", versions(&[("org.slf4j:slf4j-api", "2.0.0")]));

        let mapping = resolve_with_rules(&rules, &graph).unwrap();
        assert_eq!(mapping.version_for(Usage::JavaApi, "org.slf4j:slf4j-api"), Some("2.0.0"));
    }

    #[test]
    fn test_rules_deserialize_from_config_shape() {
        let rules: VersionMappingRules = serde_json::from_value(serde_json::json!({
            "java-api": "runtimeClasspath",
            "java-runtime": null
        }))
        .unwrap();
        assert_eq!(rules.java_api.as_deref(), Some("runtimeClasspath"));
        assert!(rules.java_runtime.is_none());
    }

    #[test]
    fn test_configuration_usage() {
        assert_eq!(Configuration::Api.usage(), Some(Usage::JavaApi));
        assert_eq!(Configuration::Implementation.usage(), Some(Usage::JavaRuntime));
        assert_eq!(Configuration::RuntimeOnly.usage(), Some(Usage::JavaRuntime));
        assert_eq!(Configuration::CompileOnly.usage(), None);
        assert_eq!(Configuration::IntegrationTestImplementation.usage(), None);
    }

    #[test]
    fn test_map_dependencies_uses_resolved_versions() {
        let mapping = resolve_version_mapping(&graph()).unwrap();
        let deps = map_dependencies(
            &[
                declared("org.slf4j:slf4j-api", Configuration::Api, Some("2.0.0")),
                declared("com.ibm.icu:icu4j", Configuration::Implementation, Some("73.0")),
                declared("org.spockframework:spock-core", Configuration::TestImplementation, None),
            ],
            &mapping,
        )
        .unwrap();

        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].artifact_id, "slf4j-api");
        assert_eq!(deps[0].version, "2.0.9");
        assert_eq!(deps[0].scope, Scope::Compile);
        assert_eq!(deps[1].artifact_id, "icu4j");
        assert_eq!(deps[1].version, "74.1");
        assert_eq!(deps[1].scope, Scope::Runtime);
    }

    #[test]
    fn test_map_dependencies_falls_back_to_declared_version() {
        let mapping = resolve_version_mapping(&graph()).unwrap();
        let deps = map_dependencies(
            &[declared("org.jetbrains:annotations", Configuration::Api, Some("24.0.1"))],
            &mapping,
        )
        .unwrap();
        assert_eq!(deps[0].version, "24.0.1");
    }

    #[test]
    fn test_map_dependencies_unresolved() {
        let mapping = resolve_version_mapping(&graph()).unwrap();
        let result = map_dependencies(
            &[declared("org.jetbrains:annotations", Configuration::Api, None)],
            &mapping,
        );
        assert_eq!(
            result,
            Err(ConfigurationError::UnresolvedDependency(
                "org.jetbrains:annotations".to_string()
            ))
        );
    }

    #[test]
    fn test_map_dependencies_malformed_coordinate() {
        let mapping = resolve_version_mapping(&graph()).unwrap();
        for bad in ["slf4j", ":slf4j", "a:b:c"] {
            let result = map_dependencies(&[declared(bad, Configuration::Api, Some("1"))], &mapping);
            assert_eq!(result, Err(ConfigurationError::MalformedDependency(bad.to_string())));
        }
    }

    #[test]
    fn test_duplicate_declaration_promoted_to_compile() {
        let mapping = resolve_version_mapping(&graph()).unwrap();
        let deps = map_dependencies(
            &[
                declared("org.yaml:snakeyaml", Configuration::Implementation, None),
                declared("org.yaml:snakeyaml", Configuration::Api, None),
            ],
            &mapping,
        )
        .unwrap();

        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].scope, Scope::Compile);
    }
}
