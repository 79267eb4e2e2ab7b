//! klog-publish - Maven Central publication pipeline for klog
//!
//! This crate assembles the publications of a multi-module klog build:
//! it derives each module's POM descriptor from project and organization
//! defaults, maps declared dependency versions from resolved views, decides
//! once per build whether publications are signed, and stages the result
//! into a Maven repository layout for the upload step.

pub mod assembler;
pub mod config;
pub mod descriptor;
pub mod environment;
pub mod error;
pub mod pipeline;
pub mod repository;
pub mod signing;
pub mod verify;
pub mod version_mapping;

pub use assembler::{Coordinates, Publication, PublicationAssembler};
pub use config::{EffectiveConfig, ModuleSpec, ProjectManifest, PublishSettings};
pub use descriptor::{build_descriptor, OrgDefaults, PublicationDescriptor};
pub use environment::{BuildEnvironment, CredentialProvider};
pub use error::{ConfigurationError, ConfigurationResult};
pub use pipeline::{PublishError, PublishPipeline, PublishReport, Stager};
pub use repository::{RepositoryKind, RepositoryTarget};
pub use signing::{resolve_signing_eligibility, SigningContext, SigningState};
pub use verify::{verify_staged, VerifyReport};
pub use version_mapping::{resolve_version_mapping, DependencyGraph, Usage, VersionMapping};
