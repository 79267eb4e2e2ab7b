//! Per-build signing state
//!
//! ```text
//! Disabled --enable(context)--> Enabled
//! ```
//!
//! `Disabled` is the initial state and stays terminal when credentials are
//! absent. `Enabled` is entered at most once, before any publication is
//! staged. There is no way back to `Disabled`.

use tracing::{info, warn};

use super::context::SigningContext;
use super::{SigningError, SigningResult};
use crate::environment::{CredentialProvider, SIGNING_KEY_VAR, SIGNING_PASSWORD_VAR};

fn non_blank(value: Option<&str>) -> bool {
    value.map_or(false, |v| !v.trim().is_empty())
}

/// True iff both the signing key and its passphrase are present and
/// non-blank after trimming.
pub fn resolve_signing_eligibility<P>(credentials: &P) -> bool
where
    P: CredentialProvider + ?Sized,
{
    non_blank(credentials.signing_key()) && non_blank(credentials.signing_password())
}

/// Signing state of the current build.
#[derive(Debug, Default)]
pub enum SigningState {
    #[default]
    Disabled,
    Enabled(SigningContext),
}

impl SigningState {
    /// Decide the build's signing state from its credentials.
    ///
    /// Missing or blank credentials disable signing without error. Present
    /// but unusable key material is an error.
    pub fn resolve<P>(credentials: &P) -> SigningResult<Self>
    where
        P: CredentialProvider + ?Sized,
    {
        if !resolve_signing_eligibility(credentials) {
            let key = non_blank(credentials.signing_key());
            let password = non_blank(credentials.signing_password());
            if key != password {
                let (set, missing) = if key {
                    (SIGNING_KEY_VAR, SIGNING_PASSWORD_VAR)
                } else {
                    (SIGNING_PASSWORD_VAR, SIGNING_KEY_VAR)
                };
                warn!(set, missing, "signing disabled: only one signing credential is set");
            } else {
                info!("signing disabled: no signing credentials");
            }
            return Ok(Self::Disabled);
        }

        let (Some(key), Some(password)) = (credentials.signing_key(), credentials.signing_password())
        else {
            return Ok(Self::Disabled);
        };
        let context = SigningContext::load(key, password)?;
        info!(fingerprint = context.fingerprint(), "signing enabled");
        Self::Disabled.enable(context)
    }

    /// Transition `Disabled -> Enabled`.
    pub fn enable(self, context: SigningContext) -> SigningResult<Self> {
        match self {
            Self::Disabled => Ok(Self::Enabled(context)),
            Self::Enabled(_) => Err(SigningError::AlreadyEnabled),
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled(_))
    }

    pub fn context(&self) -> Option<&SigningContext> {
        match self {
            Self::Enabled(context) => Some(context),
            Self::Disabled => None,
        }
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.context().map(SigningContext::fingerprint)
    }
}
