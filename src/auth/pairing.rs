//! One-time activation state machine for child accounts.
//!
//! A child is created with a hashed PIN and a pairing code bound to a 24 h
//! expiry (CREATED). Successful pairing verifies the PIN under the child
//! attempt policy, clears both pairing fields, and activates the account
//! (ACTIVE). The transition is irreversible and the cleared code can never
//! match again.

use chrono::Duration;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::attempts::AttemptPolicy;
use super::clock::Clock;
use super::error::AuthError;
use super::hasher::Hasher;
use super::models::{CreatedChild, Principal, PrincipalKind, SessionTokens};
use super::repo::PrincipalStore;
use super::tokens::TokenIssuer;
use super::utils::{generate_pairing_code, generate_pin};
use super::verifier::CredentialVerifier;

const PAIRING_CODE_TTL_HOURS: i64 = 24;

#[derive(Clone)]
pub struct PairingFlow {
    principals: Arc<dyn PrincipalStore>,
    hasher: Arc<dyn Hasher>,
    clock: Arc<dyn Clock>,
    tokens: TokenIssuer,
}

impl PairingFlow {
    #[must_use]
    pub fn new(
        principals: Arc<dyn PrincipalStore>,
        hasher: Arc<dyn Hasher>,
        clock: Arc<dyn Clock>,
        tokens: TokenIssuer,
    ) -> Self {
        Self {
            principals,
            hasher,
            clock,
            tokens,
        }
    }

    /// Create an inactive child under `parent_id`. Returns the plaintext PIN
    /// and pairing code exactly once; both must travel to the child
    /// out-of-band.
    pub async fn create_child(
        &self,
        parent_id: Uuid,
        name: &str,
    ) -> Result<CreatedChild, AuthError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::Validation("name is required".to_string()));
        }

        let parent = self
            .principals
            .find_by_id(parent_id)
            .await?
            .filter(|p| p.kind == PrincipalKind::Parent)
            .ok_or(AuthError::NotFound("parent account"))?;

        let pin = generate_pin();
        let pin_hash = self.hasher.hash(&pin).await?;
        let pairing_code = generate_pairing_code();
        let expires_at = self.clock.now() + Duration::hours(PAIRING_CODE_TTL_HOURS);

        let child = Principal::new_child(
            parent.id,
            name.to_string(),
            pin_hash,
            pairing_code.clone(),
            expires_at,
        );
        self.principals.create(&child).await?;

        info!(child_id = %child.id, parent_id = %parent.id, "child account created");

        Ok(CreatedChild {
            id: child.id,
            name: name.to_string(),
            pin,
            pairing_code,
            pairing_code_expires_at: expires_at,
        })
    }

    /// Complete activation: verify the PIN behind the pairing code, flip the
    /// child to ACTIVE, and open a session.
    pub async fn pair(&self, pairing_code: &str, pin: &str) -> Result<SessionTokens, AuthError> {
        let child = self
            .principals
            .find_by_pairing_code(pairing_code)
            .await?
            .ok_or(AuthError::NotFound("pairing code"))?;

        match child.pairing_code_expires_at {
            Some(expires_at) if expires_at < self.clock.now() => {
                return Err(AuthError::Expired("pairing code"));
            }
            Some(_) => {}
            // A code without an expiry is unusable rather than eternal.
            None => return Err(AuthError::Expired("pairing code")),
        }

        let verifier = CredentialVerifier::new(
            self.principals.clone(),
            self.hasher.clone(),
            self.clock.clone(),
            AttemptPolicy::for_kind(PrincipalKind::Child),
        );
        verifier.verify(&child, pin).await?;

        self.principals.activate_child(child.id).await?;

        info!(child_id = %child.id, "child paired and activated");

        self.tokens.issue_session(&child).await
    }
}
