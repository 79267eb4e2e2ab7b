//! Remote repository target
//!
//! Selects where the external upload step should send the staged
//! publications: the OSSRH snapshot repository for `-SNAPSHOT` versions,
//! the Nexus staging API otherwise. Nothing here talks to the network.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::environment::BuildEnvironment;

/// Version suffix marking snapshot builds
pub const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

/// Repository URLs from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySettings {
    pub nexus_url: String,
    pub snapshot_url: String,
}

/// Kind of remote repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryKind {
    /// Nexus staging, closed and released after upload
    Staging,
    /// Snapshot repository, published directly
    Snapshot,
}

/// Where and as whom to upload.
///
/// The password itself is never stored, only whether one was supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryTarget {
    pub kind: RepositoryKind,
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_profile_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    pub password_present: bool,
}

impl RepositoryTarget {
    /// Pick the target for `version`.
    pub fn select(version: &str, settings: &RepositorySettings, env: &BuildEnvironment) -> Self {
        let non_blank = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let (kind, url, staging_profile_id) = if is_snapshot(version) {
            (RepositoryKind::Snapshot, settings.snapshot_url.clone(), None)
        } else {
            (
                RepositoryKind::Staging,
                settings.nexus_url.clone(),
                non_blank(&env.ossrh_staging_profile_id),
            )
        };

        let selected = Self {
            kind,
            url,
            staging_profile_id,
            username: non_blank(&env.ossrh_username),
            password_present: non_blank(&env.ossrh_password).is_some(),
        };
        debug!(kind = ?selected.kind, url = %selected.url, "selected repository target");
        selected
    }

    /// Both user name and password are available for the upload step.
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password_present
    }
}

pub fn is_snapshot(version: &str) -> bool {
    version.trim().ends_with(SNAPSHOT_SUFFIX)
}
