//! Access-token signing and opaque refresh-token lifecycle.
//!
//! Refresh tokens are single-use: every refresh revokes the presented token
//! and issues a new one (rotation). Verification collapses absent, revoked,
//! and expired into the same `None` so callers cannot probe why a token
//! stopped working.

use chrono::Duration;
use std::sync::Arc;
use uuid::Uuid;

use super::clock::Clock;
use super::error::AuthError;
use super::models::{AccessClaims, Principal, RefreshTokenRecord, SessionTokens};
use super::repo::RefreshTokenStore;
use super::signer::Signer;
use super::utils::{generate_token, hash_token};

const ACCESS_TOKEN_TTL_HOURS: i64 = 1;
const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

#[derive(Clone)]
pub struct TokenIssuer {
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    signer: Arc<dyn Signer>,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        signer: Arc<dyn Signer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            refresh_tokens,
            signer,
            clock,
        }
    }

    /// Sign a short-lived access token over the claims. No mutation.
    pub fn issue_access_token(&self, claims: &AccessClaims) -> Result<String, AuthError> {
        let token = self
            .signer
            .sign(claims, Duration::hours(ACCESS_TOKEN_TTL_HOURS))?;
        Ok(token)
    }

    /// Mint a new refresh token for `owner_id`, storing only its hash. The
    /// plaintext is returned to the caller exactly once.
    pub async fn issue_refresh_token(&self, owner_id: Uuid) -> Result<String, AuthError> {
        let plain = generate_token();
        let now = self.clock.now();
        let record = RefreshTokenRecord {
            id: Uuid::new_v4(),
            owner_id,
            token_hash: hash_token(&plain),
            issued_at: now,
            expires_at: now + Duration::days(REFRESH_TOKEN_TTL_DAYS),
            revoked_at: None,
        };
        self.refresh_tokens.create(&record).await?;
        Ok(plain)
    }

    /// Resolve a presented plaintext to its grant, or `None` when the token
    /// is unknown, revoked, or expired.
    pub async fn verify_refresh_token(
        &self,
        plain: &str,
    ) -> Result<Option<RefreshTokenRecord>, AuthError> {
        let Some(record) = self.refresh_tokens.find_by_hash(&hash_token(plain)).await? else {
            return Ok(None);
        };
        if record.revoked_at.is_some() || record.expires_at < self.clock.now() {
            return Ok(None);
        }
        Ok(Some(record))
    }

    /// Revoke the presented token and issue a fresh one for the same owner.
    /// Revoke-then-issue ordering means no point in time has both valid; a
    /// crash between the writes fails closed and forces re-authentication.
    pub async fn rotate_refresh_token(
        &self,
        plain: &str,
        owner_id: Uuid,
    ) -> Result<String, AuthError> {
        self.refresh_tokens
            .revoke_by_hash(&hash_token(plain), self.clock.now())
            .await?;
        self.issue_refresh_token(owner_id).await
    }

    /// Idempotent revocation; unknown tokens are a no-op.
    pub async fn revoke_refresh_token(&self, plain: &str) -> Result<(), AuthError> {
        self.refresh_tokens
            .revoke_by_hash(&hash_token(plain), self.clock.now())
            .await?;
        Ok(())
    }

    /// Access + refresh pair for a verified principal.
    pub async fn issue_session(&self, principal: &Principal) -> Result<SessionTokens, AuthError> {
        let claims = AccessClaims::for_principal(principal);
        let access_token = self.issue_access_token(&claims)?;
        let refresh_token = self.issue_refresh_token(principal.id).await?;
        Ok(SessionTokens {
            access_token,
            refresh_token,
        })
    }
}
