//! The session orchestrator: composes attempt accounting, credential
//! verification, pairing, and token issuance into the account flows the
//! HTTP layer exposes.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::attempts::AttemptPolicy;
use super::clock::Clock;
use super::error::AuthError;
use super::hasher::Hasher;
use super::models::{
    AccessClaims, CreatedChild, PrincipalKind, Principal, RegisteredParent, SessionTokens,
};
use super::pairing::PairingFlow;
use super::repo::{PrincipalStore, RefreshTokenStore};
use super::signer::Signer;
use super::tokens::TokenIssuer;
use super::utils::{generate_family_code, generate_token, normalize_email, valid_email};
use super::verifier::CredentialVerifier;

pub struct AuthService {
    principals: Arc<dyn PrincipalStore>,
    hasher: Arc<dyn Hasher>,
    signer: Arc<dyn Signer>,
    clock: Arc<dyn Clock>,
    tokens: TokenIssuer,
    pairing: PairingFlow,
}

impl AuthService {
    #[must_use]
    pub fn new(
        principals: Arc<dyn PrincipalStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        hasher: Arc<dyn Hasher>,
        signer: Arc<dyn Signer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let tokens = TokenIssuer::new(refresh_tokens, signer.clone(), clock.clone());
        let pairing = PairingFlow::new(
            principals.clone(),
            hasher.clone(),
            clock.clone(),
            tokens.clone(),
        );
        Self {
            principals,
            hasher,
            signer,
            clock,
            tokens,
            pairing,
        }
    }

    fn verifier_for(&self, kind: PrincipalKind) -> CredentialVerifier {
        CredentialVerifier::new(
            self.principals.clone(),
            self.hasher.clone(),
            self.clock.clone(),
            AttemptPolicy::for_kind(kind),
        )
    }

    /// Register a parent account. The account stays inactive until the
    /// returned verify token is spent on `parent_set_password`.
    pub async fn parent_register(&self, email: &str) -> Result<RegisteredParent, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AuthError::Validation("email is required".to_string()));
        }
        if !valid_email(&email) {
            return Err(AuthError::Validation("email is not valid".to_string()));
        }
        // Uniqueness is checked on the normalized email, the same form every
        // lookup uses.
        if self.principals.find_by_email(&email).await?.is_some() {
            return Err(AuthError::Validation("email already used".to_string()));
        }

        let verify_token = generate_token();
        let family_code = generate_family_code();
        let parent = Principal::new_parent(email, family_code.clone(), verify_token.clone());
        self.principals.create(&parent).await?;

        info!(parent_id = %parent.id, "parent account registered");

        Ok(RegisteredParent {
            id: parent.id,
            family_code,
            verify_token,
        })
    }

    /// Spend a verify token to set the parent's password and profile,
    /// activating the account.
    pub async fn parent_set_password(
        &self,
        verify_token: &str,
        name: &str,
        phone_number: Option<&str>,
        password: &str,
    ) -> Result<(), AuthError> {
        if verify_token.is_empty() {
            return Err(AuthError::Validation("token is required".to_string()));
        }
        if name.trim().is_empty() {
            return Err(AuthError::Validation("name is required".to_string()));
        }
        if password.is_empty() {
            return Err(AuthError::Validation("password is required".to_string()));
        }

        let parent = self
            .principals
            .find_by_verify_token(verify_token)
            .await?
            .ok_or(AuthError::NotFound("verify token"))?;

        let secret_hash = self.hasher.hash(password).await?;
        self.principals
            .set_credentials(parent.id, name.trim(), phone_number, &secret_hash)
            .await?;

        info!(parent_id = %parent.id, "parent account activated");
        Ok(())
    }

    /// Parent login by email and password.
    pub async fn parent_login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SessionTokens, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AuthError::Validation("email is required".to_string()));
        }
        if password.is_empty() {
            return Err(AuthError::Validation("password is required".to_string()));
        }

        let parent = self
            .principals
            .find_by_email(&email)
            .await?
            .filter(|p| p.active)
            .ok_or(AuthError::NotFound("account"))?;

        self.verifier_for(PrincipalKind::Parent)
            .verify(&parent, password)
            .await?;

        self.tokens.issue_session(&parent).await
    }

    /// Rotate the presented refresh token and reissue an access token from
    /// the owner's current stored role and name.
    pub async fn refresh(&self, refresh_token: &str) -> Result<SessionTokens, AuthError> {
        let grant = self
            .tokens
            .verify_refresh_token(refresh_token)
            .await?
            .ok_or(AuthError::InvalidCredential)?;

        // Re-read the owner so a deactivated account cannot keep renewing.
        let owner = self
            .principals
            .find_by_id(grant.owner_id)
            .await?
            .filter(|p| p.active)
            .ok_or(AuthError::InvalidCredential)?;

        let new_refresh = self
            .tokens
            .rotate_refresh_token(refresh_token, owner.id)
            .await?;
        let access_token = self
            .tokens
            .issue_access_token(&AccessClaims::for_principal(&owner))?;

        Ok(SessionTokens {
            access_token,
            refresh_token: new_refresh,
        })
    }

    /// Revoke the presented refresh token. Always succeeds: an invalid or
    /// already-revoked token leaves nothing to do.
    pub async fn logout(&self, refresh_token: &str) {
        if let Err(err) = self.tokens.revoke_refresh_token(refresh_token).await {
            warn!(error = %err, "logout revocation failed");
        }
    }

    /// Create an inactive child under a parent. See [`PairingFlow`].
    pub async fn create_child(
        &self,
        parent_id: Uuid,
        name: &str,
    ) -> Result<CreatedChild, AuthError> {
        self.pairing.create_child(parent_id, name).await
    }

    /// Activate a child via pairing code + PIN. See [`PairingFlow`].
    pub async fn child_pairing(
        &self,
        pairing_code: &str,
        pin: &str,
    ) -> Result<SessionTokens, AuthError> {
        if pairing_code.is_empty() {
            return Err(AuthError::Validation("pairing code is required".to_string()));
        }
        if pin.is_empty() {
            return Err(AuthError::Validation("pin is required".to_string()));
        }
        self.pairing.pair(pairing_code, pin).await
    }

    /// Child login: the family code resolves the owning parent, the login
    /// targets that family's active child.
    pub async fn child_login(
        &self,
        family_code: &str,
        pin: &str,
    ) -> Result<SessionTokens, AuthError> {
        if family_code.is_empty() {
            return Err(AuthError::Validation("family code is required".to_string()));
        }
        if pin.is_empty() {
            return Err(AuthError::Validation("pin is required".to_string()));
        }

        let child = self
            .principals
            .find_active_child_by_family_code(family_code)
            .await?
            .ok_or(AuthError::NotFound("account"))?;

        self.verifier_for(PrincipalKind::Child)
            .verify(&child, pin)
            .await?;

        self.tokens.issue_session(&child).await
    }

    /// Verify a presented access token and gate it on the allowed kinds.
    pub fn authorize(
        &self,
        token: &str,
        allowed: &[PrincipalKind],
    ) -> Result<AccessClaims, AuthError> {
        let claims = self.signer.verify(token)?;
        if !allowed.contains(&claims.role) {
            return Err(AuthError::Unauthorized);
        }
        Ok(claims)
    }
}
