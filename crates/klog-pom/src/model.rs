//! POM document model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors raised when a document is missing required content.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PomError {
    #[error("missing required element <{0}>")]
    MissingElement(&'static str),

    #[error("dependency {index} is missing <{element}>")]
    IncompleteDependency { index: usize, element: &'static str },
}

/// Organization block (`<organization>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub name: String,
    pub url: String,
}

/// License block (`<license>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub name: String,
    pub url: String,
}

/// Developer block (`<developer>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Developer {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Source control block (`<scm>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scm {
    /// Read-only connection string, e.g. `scm:git:git://github.com/org/repo.git`
    pub connection: String,
    pub url: String,
}

/// Issue tracker block (`<issueManagement>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueManagement {
    pub system: String,
    pub url: String,
}

/// Maven dependency scope.
///
/// Only the scopes a published library can carry are modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Visible on the consumer's compile classpath
    Compile,
    /// Only visible at runtime
    Runtime,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compile => "compile",
            Self::Runtime => "runtime",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dependency entry (`<dependency>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub scope: Scope,
}

/// A complete POM document for one published module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomDocument {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub name: String,
    pub description: String,
    pub url: String,
    pub organization: Organization,
    pub licenses: Vec<License>,
    pub developers: Vec<Developer>,
    pub scm: Scm,
    pub issue_management: IssueManagement,

    /// Dependencies in declaration order
    #[serde(default)]
    pub dependencies: Vec<PomDependency>,
}

impl PomDocument {
    /// Check the elements Maven Central rejects when empty.
    pub fn validate(&self) -> Result<(), PomError> {
        let required = [
            ("groupId", &self.group_id),
            ("artifactId", &self.artifact_id),
            ("version", &self.version),
            ("name", &self.name),
            ("description", &self.description),
            ("url", &self.url),
        ];
        for (element, value) in required {
            if value.trim().is_empty() {
                return Err(PomError::MissingElement(element));
            }
        }

        if self.licenses.is_empty() {
            return Err(PomError::MissingElement("licenses"));
        }
        if self.developers.is_empty() {
            return Err(PomError::MissingElement("developers"));
        }
        if self.scm.url.trim().is_empty() {
            return Err(PomError::MissingElement("scm"));
        }

        for (index, dep) in self.dependencies.iter().enumerate() {
            let fields = [
                ("groupId", &dep.group_id),
                ("artifactId", &dep.artifact_id),
                ("version", &dep.version),
            ];
            for (element, value) in fields {
                if value.trim().is_empty() {
                    return Err(PomError::IncompleteDependency { index, element });
                }
            }
        }

        Ok(())
    }

    /// Dependencies published with the given scope.
    pub fn dependencies_in(&self, scope: Scope) -> impl Iterator<Item = &PomDependency> {
        self.dependencies.iter().filter(move |d| d.scope == scope)
    }
}
