//! Staged output verification
//!
//! Re-checks a staging directory before it is handed to the upload step:
//! every published file must match its `.sha256`/`.sha512` companions,
//! carry a valid `.sig` when a public key is given, and every publication
//! record must match its own digest.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::pipeline::{
    PublicationRecord, CHECKSUM_EXTENSIONS, EFFECTIVE_CONFIG_FILE, PUBLICATIONS_DIR, REPORT_FILE,
};
use crate::signing::{verify_detached, SIGNATURE_EXTENSION};

/// Errors that stop verification altogether
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Walk error: {0}")]
    WalkError(#[from] walkdir::Error),

    #[error("Path is not within staging root: {0}")]
    PathNotInRoot(String),
}

/// Result of checking one file or record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum CheckStatus {
    Ok,
    MissingChecksum(String),
    ChecksumMismatch(String),
    MissingSignature,
    InvalidSignature(String),
    DigestMismatch,
    Unreadable(String),
}

impl CheckStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, CheckStatus::Ok)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileCheck {
    /// Path relative to the staging root
    pub path: String,
    pub status: CheckStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyReport {
    pub files: Vec<FileCheck>,
    pub records: Vec<FileCheck>,
}

impl VerifyReport {
    pub fn is_success(&self) -> bool {
        self.files.iter().chain(&self.records).all(|c| c.status.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileCheck> {
        self.files.iter().chain(&self.records).filter(|c| !c.status.is_ok())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn is_companion(name: &str) -> bool {
    CHECKSUM_EXTENSIONS
        .iter()
        .chain(std::iter::once(&SIGNATURE_EXTENSION))
        .any(|ext| name.ends_with(&format!(".{}", ext)))
}

/// Verify every published file and record under `root`.
///
/// With `public_key` set, every published file must have a valid
/// signature; without it signatures are not checked.
pub fn verify_staged(root: &Path, public_key: Option<&VerifyingKey>) -> Result<VerifyReport, VerifyError> {
    let mut files: BTreeMap<String, CheckStatus> = BTreeMap::new();
    let mut records = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let rel_path = path
            .strip_prefix(root)
            .map_err(|_| VerifyError::PathNotInRoot(path.display().to_string()))?;
        let rel_path_str = rel_path.to_string_lossy().replace('\\', "/");

        if rel_path_str == REPORT_FILE || rel_path_str == EFFECTIVE_CONFIG_FILE {
            continue;
        }
        if rel_path.starts_with(PUBLICATIONS_DIR) {
            records.push(FileCheck {
                status: check_record(path),
                path: rel_path_str,
            });
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if is_companion(&name) {
            continue;
        }

        let status = check_file(path, public_key)?;
        if !status.is_ok() {
            warn!(path = %rel_path_str, ?status, "staged file failed verification");
        }
        files.insert(rel_path_str, status);
    }

    debug!(files = files.len(), records = records.len(), "verified staging directory");
    Ok(VerifyReport {
        files: files
            .into_iter()
            .map(|(path, status)| FileCheck { path, status })
            .collect(),
        records,
    })
}

fn companion(path: &Path, ext: &str) -> std::path::PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    name.into()
}

fn check_file(path: &Path, public_key: Option<&VerifyingKey>) -> Result<CheckStatus, VerifyError> {
    let contents = fs::read(path)?;

    for ext in CHECKSUM_EXTENSIONS {
        let expected = match fs::read_to_string(companion(path, ext)) {
            Ok(s) => s.trim().to_lowercase(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(CheckStatus::MissingChecksum(ext.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let actual = match *ext {
            "sha256" => hex::encode(Sha256::digest(&contents)),
            _ => hex::encode(Sha512::digest(&contents)),
        };
        if actual != expected {
            return Ok(CheckStatus::ChecksumMismatch(ext.to_string()));
        }
    }

    let Some(key) = public_key else {
        return Ok(CheckStatus::Ok);
    };
    let signature = match fs::read_to_string(companion(path, SIGNATURE_EXTENSION)) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(CheckStatus::MissingSignature),
        Err(e) => return Err(e.into()),
    };
    Ok(match verify_detached(key, &contents, &signature) {
        Ok(true) => CheckStatus::Ok,
        Ok(false) => CheckStatus::InvalidSignature("signature does not match".to_string()),
        Err(e) => CheckStatus::InvalidSignature(e.to_string()),
    })
}

fn check_record(path: &Path) -> CheckStatus {
    let record = match PublicationRecord::from_file(path) {
        Ok(record) => record,
        Err(e) => return CheckStatus::Unreadable(e.to_string()),
    };
    match record.compute_digest() {
        Ok(digest) if digest == record.record_sha256 => CheckStatus::Ok,
        Ok(_) => CheckStatus::DigestMismatch,
        Err(e) => CheckStatus::Unreadable(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::{generate_keypair, SigningContext};
    use tempfile::TempDir;

    fn write_staged(dir: &Path, name: &str, contents: &[u8], signer: Option<&SigningContext>) {
        fs::write(dir.join(name), contents).unwrap();
        fs::write(dir.join(format!("{}.sha256", name)), hex::encode(Sha256::digest(contents))).unwrap();
        fs::write(dir.join(format!("{}.sha512", name)), hex::encode(Sha512::digest(contents))).unwrap();
        if let Some(signer) = signer {
            fs::write(dir.join(format!("{}.sig", name)), signer.sign(contents).signature).unwrap();
        }
    }

    #[test]
    fn test_clean_directory_verifies() {
        let root = TempDir::new().unwrap();
        let signer = SigningContext::from_key(generate_keypair());
        write_staged(root.path(), "a-1.0.pom", b"<project/>", Some(&signer));
        write_staged(root.path(), "a-1.0.jar", b"jar", Some(&signer));

        let report = verify_staged(root.path(), Some(&signer.verifying_key())).unwrap();
        assert_eq!(report.files.len(), 2);
        assert!(report.is_success());
    }

    #[test]
    fn test_tampered_file_detected() {
        let root = TempDir::new().unwrap();
        write_staged(root.path(), "a-1.0.jar", b"jar", None);
        fs::write(root.path().join("a-1.0.jar"), b"other").unwrap();

        let report = verify_staged(root.path(), None).unwrap();
        assert!(!report.is_success());
        assert_eq!(
            report.files[0].status,
            CheckStatus::ChecksumMismatch("sha256".to_string())
        );
    }

    #[test]
    fn test_missing_checksum_detected() {
        let root = TempDir::new().unwrap();
        write_staged(root.path(), "a-1.0.jar", b"jar", None);
        fs::remove_file(root.path().join("a-1.0.jar.sha512")).unwrap();

        let report = verify_staged(root.path(), None).unwrap();
        assert_eq!(
            report.files[0].status,
            CheckStatus::MissingChecksum("sha512".to_string())
        );
    }

    #[test]
    fn test_signatures_required_with_key() {
        let root = TempDir::new().unwrap();
        write_staged(root.path(), "a-1.0.jar", b"jar", None);
        let key = generate_keypair().verifying_key();

        assert!(verify_staged(root.path(), None).unwrap().is_success());
        let report = verify_staged(root.path(), Some(&key)).unwrap();
        assert_eq!(report.files[0].status, CheckStatus::MissingSignature);
    }

    #[test]
    fn test_signature_from_other_key_rejected() {
        let root = TempDir::new().unwrap();
        let signer = SigningContext::from_key(generate_keypair());
        write_staged(root.path(), "a-1.0.jar", b"jar", Some(&signer));
        let other = generate_keypair().verifying_key();

        let report = verify_staged(root.path(), Some(&other)).unwrap();
        assert!(matches!(report.files[0].status, CheckStatus::InvalidSignature(_)));
    }

    #[test]
    fn test_build_outputs_at_root_are_not_published_files() {
        let root = TempDir::new().unwrap();
        write_staged(root.path(), "a-1.0.jar", b"jar", None);
        fs::write(root.path().join(REPORT_FILE), "{}").unwrap();
        fs::write(root.path().join(EFFECTIVE_CONFIG_FILE), "{}").unwrap();

        let report = verify_staged(root.path(), None).unwrap();
        assert!(report.is_success());
        assert_eq!(report.files.len(), 1);
    }

    #[test]
    fn test_unreadable_record_reported() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join(PUBLICATIONS_DIR)).unwrap();
        fs::write(root.path().join(PUBLICATIONS_DIR).join("core.json"), "{").unwrap();

        let report = verify_staged(root.path(), None).unwrap();
        assert!(report.files.is_empty());
        assert!(matches!(report.records[0].status, CheckStatus::Unreadable(_)));
    }
}
