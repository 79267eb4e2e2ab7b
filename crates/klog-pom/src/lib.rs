//! klog POM Types
//!
//! Defines the Maven POM document published for every klog module and
//! renders it to XML.

pub mod model;
pub mod xml;

pub use model::{
    Developer, IssueManagement, License, Organization, PomDependency, PomDocument, PomError,
    Scm, Scope,
};
pub use xml::{escape_text, PomWriter};

/// POM model version written into every document.
pub const MODEL_VERSION: &str = "4.0.0";

/// XML namespace of the POM 4.0.0 schema.
pub const POM_NAMESPACE: &str = "http://maven.apache.org/POM/4.0.0";

/// Schema location of the POM 4.0.0 schema.
pub const POM_SCHEMA_LOCATION: &str = "https://maven.apache.org/xsd/maven-4.0.0.xsd";
