//! Authentication Service
//!
//! Resolves the credential presented at upgrade time into an identity.
//! The socket is only accepted once this succeeds.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::domain::{Identity, SessionValidator};
use crate::infrastructure::metrics;
use crate::shared::error::AuthFailure;

/// Connection handshake authenticator.
pub struct ConnectionAuthenticator {
    validator: Arc<dyn SessionValidator>,
    timeout: Duration,
}

impl ConnectionAuthenticator {
    pub fn new(validator: Arc<dyn SessionValidator>, timeout: Duration) -> Self {
        Self { validator, timeout }
    }

    /// Validate an optional credential.
    ///
    /// A missing or blank credential never reaches the validator. A
    /// validator that does not answer within the persistence timeout is
    /// reported as unavailable.
    pub async fn authenticate(&self, credential: Option<&str>) -> Result<Identity, AuthFailure> {
        let credential = credential
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(AuthFailure::MissingCredential)?;

        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.validator.validate(credential)).await;
        metrics::record_collaborator_call("validate_session", started.elapsed().as_secs_f64());

        let result = match outcome {
            Ok(result) => result,
            Err(_) => Err(AuthFailure::Unavailable(
                "session validation timed out".into(),
            )),
        };

        match &result {
            Ok(identity) => tracing::debug!(user_id = identity.id, "Credential accepted"),
            Err(AuthFailure::Unavailable(detail)) => {
                tracing::error!(detail = %detail, "Session validator unavailable")
            }
            Err(failure) => tracing::debug!(reason = failure.code(), "Credential rejected"),
        }
        result
    }
}
