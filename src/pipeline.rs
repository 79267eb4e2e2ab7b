//! Staging pipeline
//!
//! Runs every module of a project through assembly and stages the result
//! into a local Maven repository layout for the external upload step:
//!
//! ```text
//! <out>/<group path>/<artifactId>/<version>/
//!     <artifactId>-<version>.pom (+ .sha256, .sha512, .sig)
//!     <artifactId>-<version>[-<classifier>].<ext> (+ .sha256, .sha512, .sig)
//! <out>/publications/<artifactId>.json
//! <out>/publish-report.json
//! <out>/effective_config.json   (written by the CLI)
//! ```
//!
//! A module that fails is recorded in the report; the others still stage.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use thiserror::Error;
use tracing::{error, info, warn};

use klog_pom::{PomDependency, PomError};

use crate::assembler::{Coordinates, Publication, PublicationAssembler};
use crate::config::{ArtifactFile, ModuleSpec};
use crate::descriptor::{validate_coordinate, PublicationDescriptor};
use crate::error::ConfigurationError;
use crate::repository::RepositoryTarget;
use crate::signing::{SigningError, SigningState, SIGNATURE_EXTENSION};
use crate::version_mapping::ResolutionSource;

/// Schema version for publication records and the build report
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier for publication records
pub const PUBLICATION_SCHEMA_ID: &str = "klog-publish/publication@1";

/// Schema identifier for the build report
pub const REPORT_SCHEMA_ID: &str = "klog-publish/report@1";

/// Report file name, at the output root
pub const REPORT_FILE: &str = "publish-report.json";

/// Effective configuration written by `publish`, at the output root
pub const EFFECTIVE_CONFIG_FILE: &str = "effective_config.json";

/// Directory for publication records, at the output root
pub const PUBLICATIONS_DIR: &str = "publications";

/// Checksum files written next to every staged file
pub const CHECKSUM_EXTENSIONS: &[&str] = &["sha256", "sha512"];

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("invalid POM: {0}")]
    Pom(#[from] PomError),

    #[error("signing error: {0}")]
    Signing(#[from] SigningError),

    #[error("artifact not found: {0}")]
    MissingArtifact(PathBuf),

    #[error("two artifacts would be staged as '{0}'")]
    DuplicateFile(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("canonical JSON error: {0}")]
    Canonical(String),
}

impl PublishError {
    /// Exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            PublishError::Configuration(_) | PublishError::Pom(_) | PublishError::DuplicateFile(_) => 2,
            PublishError::Signing(_) => 3,
            PublishError::MissingArtifact(_) => 4,
            PublishError::Io(_) | PublishError::Serialization(_) | PublishError::Canonical(_) => 1,
        }
    }
}

/// Result type for pipeline operations
pub type PublishResult<T> = Result<T, PublishError>;

/// One file written into the repository layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedFile {
    /// File name inside the publication directory
    pub name: String,
    pub size: u64,
    pub sha256: String,
    pub signed: bool,
}

/// Where each usage took its versions from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingSummary {
    #[serde(rename = "java-api")]
    pub java_api: ResolutionSource,
    #[serde(rename = "java-runtime")]
    pub java_runtime: ResolutionSource,
}

/// Record of one staged publication (publications/<artifactId>.json).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicationRecord {
    pub schema_version: u32,
    pub schema_id: String,
    pub created_at: DateTime<Utc>,
    pub build_id: String,
    pub coordinates: Coordinates,
    pub descriptor: PublicationDescriptor,
    pub version_mapping: MappingSummary,
    pub dependencies: Vec<PomDependency>,

    /// Directory relative to the output root
    pub directory: String,
    pub files: Vec<StagedFile>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_fingerprint: Option<String>,

    /// SHA-256 of the JCS form of this record with this field empty
    pub record_sha256: String,
}

impl PublicationRecord {
    /// Digest over the canonical JSON with `record_sha256` blanked.
    pub fn compute_digest(&self) -> PublishResult<String> {
        let mut unsealed = self.clone();
        unsealed.record_sha256 = String::new();
        let jcs_bytes = serde_json_canonicalizer::to_vec(&unsealed)
            .map_err(|e| PublishError::Canonical(e.to_string()))?;
        Ok(hex::encode(Sha256::digest(&jcs_bytes)))
    }

    pub fn from_file(path: &Path) -> PublishResult<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Outcome of one module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    Staged,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleOutcome {
    pub module: String,
    pub status: ModuleStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Build-level report (publish-report.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishReport {
    pub schema_version: u32,
    pub schema_id: String,
    pub created_at: DateTime<Utc>,
    pub build_id: String,
    pub signing_enabled: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_fingerprint: Option<String>,

    pub repository: RepositoryTarget,
    pub modules: Vec<ModuleOutcome>,
}

impl PublishReport {
    pub fn failed(&self) -> impl Iterator<Item = &ModuleOutcome> {
        self.modules.iter().filter(|m| m.status == ModuleStatus::Failed)
    }

    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_file(path: &Path) -> PublishResult<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Writes publications into a repository layout.
#[derive(Debug)]
pub struct Stager<'a> {
    output_dir: PathBuf,

    /// Artifact paths are resolved against this directory
    base_dir: PathBuf,

    signing: &'a SigningState,
    build_id: String,
}

impl<'a> Stager<'a> {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        base_dir: impl Into<PathBuf>,
        signing: &'a SigningState,
        build_id: impl Into<String>,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            base_dir: base_dir.into(),
            signing,
            build_id: build_id.into(),
        }
    }

    /// Stage one publication and its artifacts.
    pub fn stage(
        &self,
        publication: &Publication,
        artifacts: &[ArtifactFile],
    ) -> PublishResult<PublicationRecord> {
        let pom = publication.to_pom();
        pom.validate()?;

        let coordinates = &publication.coordinates;
        let stem = coordinates.file_stem();
        let pom_name = format!("{}.pom", stem);

        // Check inputs before writing anything for this module.
        let mut names = HashSet::from([pom_name.clone()]);
        let mut sources = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            let name = staged_name(&stem, artifact)?;
            if !names.insert(name.clone()) {
                return Err(PublishError::DuplicateFile(name));
            }
            let source = self.base_dir.join(&artifact.path);
            if !source.is_file() {
                return Err(PublishError::MissingArtifact(source));
            }
            sources.push((name, source));
        }

        let relative = coordinates.repository_path();
        let dir = self.output_dir.join(&relative);
        fs::create_dir_all(&dir)?;

        let mut files = Vec::new();
        files.push(self.write_file(&dir, &pom_name, publication.render_pom().as_bytes())?);

        for (name, source) in sources {
            let bytes = fs::read(&source)?;
            files.push(self.write_file(&dir, &name, &bytes)?);
        }

        let mut record = PublicationRecord {
            schema_version: SCHEMA_VERSION,
            schema_id: PUBLICATION_SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            build_id: self.build_id.clone(),
            coordinates: coordinates.clone(),
            descriptor: publication.descriptor.clone(),
            version_mapping: MappingSummary {
                java_api: publication.version_mapping.java_api.source.clone(),
                java_runtime: publication.version_mapping.java_runtime.source.clone(),
            },
            dependencies: publication.dependencies.clone(),
            directory: relative,
            files,
            signing_fingerprint: self.signing.fingerprint().map(str::to_string),
            record_sha256: String::new(),
        };
        record.record_sha256 = record.compute_digest()?;

        let records_dir = self.output_dir.join(PUBLICATIONS_DIR);
        fs::create_dir_all(&records_dir)?;
        let record_path = records_dir.join(format!("{}.json", coordinates.artifact_id));
        fs::write(&record_path, serde_json::to_string_pretty(&record)?)?;

        info!(%coordinates, files = record.files.len(), signed = self.signing.is_enabled(), "staged publication");
        Ok(record)
    }

    /// Write a file with its checksums and, when enabled, its signature.
    fn write_file(&self, dir: &Path, name: &str, bytes: &[u8]) -> PublishResult<StagedFile> {
        fs::write(dir.join(name), bytes)?;

        let sha256 = hex::encode(Sha256::digest(bytes));
        let sha512 = hex::encode(Sha512::digest(bytes));
        fs::write(dir.join(format!("{}.sha256", name)), &sha256)?;
        fs::write(dir.join(format!("{}.sha512", name)), &sha512)?;

        let signed = match self.signing.context() {
            Some(context) => {
                let signature = context.sign(bytes);
                fs::write(
                    dir.join(format!("{}.{}", name, SIGNATURE_EXTENSION)),
                    &signature.signature,
                )?;
                true
            }
            None => false,
        };

        Ok(StagedFile {
            name: name.to_string(),
            size: bytes.len() as u64,
            sha256,
            signed,
        })
    }
}

/// `<stem>[-<classifier>].<extension>`, with both parts checked as
/// coordinate elements.
fn staged_name(stem: &str, artifact: &ArtifactFile) -> PublishResult<String> {
    let extension = artifact.published_extension();
    validate_coordinate("extension", &extension)?;

    match artifact.classifier.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(classifier) => {
            validate_coordinate("classifier", classifier)?;
            Ok(format!("{}-{}.{}", stem, classifier, extension))
        }
        None => Ok(format!("{}.{}", stem, extension)),
    }
}

/// Assembles and stages every module of a project.
#[derive(Debug)]
pub struct PublishPipeline<'a> {
    assembler: PublicationAssembler<'a>,
    stager: Stager<'a>,
    repository: RepositoryTarget,
}

impl<'a> PublishPipeline<'a> {
    pub fn new(assembler: PublicationAssembler<'a>, stager: Stager<'a>, repository: RepositoryTarget) -> Self {
        Self {
            assembler,
            stager,
            repository,
        }
    }

    /// Publish one module: assemble, claim its artifactId, then stage.
    ///
    /// `claimed` maps artifactIds to the module that first published them.
    fn publish_module(
        &self,
        module: &ModuleSpec,
        claimed: &mut HashMap<String, String>,
    ) -> PublishResult<PublicationRecord> {
        let publication = self.assembler.assemble(module)?;

        let artifact_id = &publication.coordinates.artifact_id;
        if let Some(owner) = claimed.get(artifact_id) {
            return Err(ConfigurationError::DuplicateArtifactId {
                artifact_id: artifact_id.clone(),
                module: owner.clone(),
            }
            .into());
        }
        claimed.insert(artifact_id.clone(), module.label().to_string());

        self.stager.stage(&publication, &module.artifacts)
    }

    /// Run all modules and write the build report.
    ///
    /// Module failures are recorded, not returned; only failing to write
    /// the report itself is an error. A module whose artifactId was already
    /// taken by an earlier module fails instead of overwriting it.
    pub fn run(&self, modules: &[ModuleSpec]) -> PublishResult<PublishReport> {
        let mut outcomes = Vec::with_capacity(modules.len());
        let mut claimed = HashMap::new();

        for module in modules {
            let outcome = match self.publish_module(module, &mut claimed) {
                Ok(record) => ModuleOutcome {
                    module: module.label().to_string(),
                    status: ModuleStatus::Staged,
                    coordinates: Some(record.coordinates.to_string()),
                    directory: Some(record.directory),
                    error: None,
                },
                Err(e) => {
                    error!(module = module.label(), error = %e, "module publication failed");
                    ModuleOutcome {
                        module: module.label().to_string(),
                        status: ModuleStatus::Failed,
                        coordinates: None,
                        directory: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }

        if !self.stager.signing.is_enabled() {
            warn!("publications staged unsigned");
        }

        let report = PublishReport {
            schema_version: SCHEMA_VERSION,
            schema_id: REPORT_SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            build_id: self.stager.build_id.clone(),
            signing_enabled: self.stager.signing.is_enabled(),
            signing_fingerprint: self.stager.signing.fingerprint().map(str::to_string),
            repository: self.repository.clone(),
            modules: outcomes,
        };

        fs::create_dir_all(&self.stager.output_dir)?;
        fs::write(self.stager.output_dir.join(REPORT_FILE), report.to_json()?)?;
        Ok(report)
    }
}
