//! Secret verification wrapped in attempt accounting.

use std::sync::Arc;

use super::attempts::{AttemptGuard, AttemptPolicy};
use super::clock::Clock;
use super::error::AuthError;
use super::hasher::Hasher;
use super::models::Principal;
use super::repo::PrincipalStore;

pub struct CredentialVerifier {
    guard: AttemptGuard,
    hasher: Arc<dyn Hasher>,
}

impl CredentialVerifier {
    #[must_use]
    pub fn new(
        principals: Arc<dyn PrincipalStore>,
        hasher: Arc<dyn Hasher>,
        clock: Arc<dyn Clock>,
        policy: AttemptPolicy,
    ) -> Self {
        Self {
            guard: AttemptGuard::new(principals, clock, policy),
            hasher,
        }
    }

    /// Compare a presented secret against the principal's stored hash.
    ///
    /// Requires a configured credential, refuses locked principals before
    /// touching the hasher, counts a failure on mismatch, and clears the
    /// counter on success.
    pub async fn verify(&self, principal: &Principal, presented: &str) -> Result<(), AuthError> {
        let Some(secret_hash) = principal.secret_hash.as_deref() else {
            return Err(AuthError::AccountNotConfigured);
        };

        self.guard.assert_not_locked(principal)?;

        if self.hasher.compare(presented, secret_hash).await? {
            self.guard.clear_attempts(principal.id).await?;
            Ok(())
        } else {
            self.guard.record_failed_attempt(principal.id).await?;
            Err(AuthError::InvalidCredential)
        }
    }
}
