//! Typed error taxonomy for the credential and session lifecycle.
//!
//! Every failure inside the core surfaces as one of these kinds; the HTTP
//! boundary owns the status mapping and may collapse `NotFound` and
//! `InvalidCredential` into a single generic message on login paths while
//! logging keeps them apart.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or malformed required field.
    #[error("{0}")]
    Validation(String),

    /// Principal or token lookup failed.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Principal exists but has no credential set yet.
    #[error("account has not been set")]
    AccountNotConfigured,

    /// Lockout in force. Deliberately carries no unlock time so callers
    /// cannot learn the exact retry window.
    #[error("too many attempts, try again later")]
    Locked,

    /// Pairing code or token past its expiry.
    #[error("{0} expired")]
    Expired(&'static str),

    /// Secret comparison failed or a presented token did not verify.
    #[error("invalid credential")]
    InvalidCredential,

    /// Valid session but insufficient role for the operation.
    #[error("insufficient role")]
    Unauthorized,

    /// Store, hasher, or signer failure.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    /// Short stable tag for structured logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::AccountNotConfigured => "account_not_configured",
            Self::Locked => "locked",
            Self::Expired(_) => "expired",
            Self::InvalidCredential => "invalid_credential",
            Self::Unauthorized => "unauthorized",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AuthError;

    #[test]
    fn locked_message_does_not_leak_unlock_time() {
        let message = AuthError::Locked.to_string();
        assert_eq!(message, "too many attempts, try again later");
    }

    #[test]
    fn kinds_stay_distinguishable_for_logging() {
        assert_ne!(
            AuthError::NotFound("account").kind(),
            AuthError::InvalidCredential.kind()
        );
    }
}
