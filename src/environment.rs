//! Build environment snapshot
//!
//! The environment is read exactly once at the start of a build and then
//! threaded explicitly through the pipeline. Nothing below this module
//! calls `std::env` directly.

use std::collections::HashMap;
use std::fmt;

/// Environment variable holding the sealed signing key.
pub const SIGNING_KEY_VAR: &str = "SIGNING_KEY";

/// Environment variable holding the signing key passphrase.
pub const SIGNING_PASSWORD_VAR: &str = "SIGNING_PASSWORD";

/// Environment variable holding the Nexus staging profile id.
pub const OSSRH_STAGING_PROFILE_ID_VAR: &str = "OSSRH_STAGING_PROFILE_ID";

/// Environment variable holding the OSSRH user name.
pub const OSSRH_USERNAME_VAR: &str = "OSSRH_USERNAME";

/// Environment variable holding the OSSRH password.
pub const OSSRH_PASSWORD_VAR: &str = "OSSRH_PASSWORD";

/// Source of signing credentials.
///
/// Implemented by [`BuildEnvironment`]; tests provide their own doubles.
pub trait CredentialProvider {
    /// Raw signing key material, if supplied
    fn signing_key(&self) -> Option<&str>;

    /// Passphrase unlocking the signing key, if supplied
    fn signing_password(&self) -> Option<&str>;
}

/// Values read from the process environment for one build invocation.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BuildEnvironment {
    pub signing_key: Option<String>,
    pub signing_password: Option<String>,
    pub ossrh_staging_profile_id: Option<String>,
    pub ossrh_username: Option<String>,
    pub ossrh_password: Option<String>,
}

impl BuildEnvironment {
    /// Snapshot the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            signing_key: lookup(SIGNING_KEY_VAR),
            signing_password: lookup(SIGNING_PASSWORD_VAR),
            ossrh_staging_profile_id: lookup(OSSRH_STAGING_PROFILE_ID_VAR),
            ossrh_username: lookup(OSSRH_USERNAME_VAR),
            ossrh_password: lookup(OSSRH_PASSWORD_VAR),
        }
    }

    /// Build from literal key/value pairs.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let map: HashMap<&str, &str> = pairs.into_iter().collect();
        Self::from_lookup(|key| map.get(key).map(|v| v.to_string()))
    }

    /// Names of the variables that are set, for diagnostics.
    pub fn present_variables(&self) -> Vec<&'static str> {
        [
            (SIGNING_KEY_VAR, self.signing_key.is_some()),
            (SIGNING_PASSWORD_VAR, self.signing_password.is_some()),
            (OSSRH_STAGING_PROFILE_ID_VAR, self.ossrh_staging_profile_id.is_some()),
            (OSSRH_USERNAME_VAR, self.ossrh_username.is_some()),
            (OSSRH_PASSWORD_VAR, self.ossrh_password.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect()
    }
}

impl CredentialProvider for BuildEnvironment {
    fn signing_key(&self) -> Option<&str> {
        self.signing_key.as_deref()
    }

    fn signing_password(&self) -> Option<&str> {
        self.signing_password.as_deref()
    }
}

// Secrets never reach logs through Debug.
impl fmt::Debug for BuildEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn mask(value: &Option<String>) -> &'static str {
            if value.is_some() {
                "[REDACTED]"
            } else {
                "<unset>"
            }
        }
        f.debug_struct("BuildEnvironment")
            .field("signing_key", &mask(&self.signing_key))
            .field("signing_password", &mask(&self.signing_password))
            .field("ossrh_staging_profile_id", &self.ossrh_staging_profile_id)
            .field("ossrh_username", &self.ossrh_username)
            .field("ossrh_password", &mask(&self.ossrh_password))
            .finish()
    }
}
