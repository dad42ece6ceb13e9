//! Domain types for principals, refresh tokens, and session results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of account kinds. Authorization decisions match on this enum,
/// never on raw role strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrincipalKind {
    #[serde(rename = "PARENT")]
    Parent,
    #[serde(rename = "CHILD")]
    Child,
}

impl PrincipalKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parent => "PARENT",
            Self::Child => "CHILD",
        }
    }

    /// Parse the stored representation back into the enum.
    pub fn parse(value: &str) -> Result<Self, String> {
        match value {
            "PARENT" => Ok(Self::Parent),
            "CHILD" => Ok(Self::Child),
            other => Err(format!("unknown principal kind: {other}")),
        }
    }
}

/// A parent or child account subject to authentication.
///
/// Parents carry `email`, `family_code`, and `verify_token`; children carry
/// `pairing_code`, `pairing_code_expires_at`, and `parent_id`. The pairing
/// fields exist only while the child is inactive and are cleared forever on
/// activation.
#[derive(Clone, Debug)]
pub struct Principal {
    pub id: Uuid,
    pub kind: PrincipalKind,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub secret_hash: Option<String>,
    pub active: bool,
    pub failed_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub family_code: Option<String>,
    pub verify_token: Option<String>,
    pub pairing_code: Option<String>,
    pub pairing_code_expires_at: Option<DateTime<Utc>>,
    pub parent_id: Option<Uuid>,
}

impl Principal {
    /// A freshly registered parent: inactive until a password is set.
    #[must_use]
    pub fn new_parent(email: String, family_code: String, verify_token: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: PrincipalKind::Parent,
            name: None,
            email: Some(email),
            phone_number: None,
            secret_hash: None,
            active: false,
            failed_attempts: 0,
            locked_until: None,
            family_code: Some(family_code),
            verify_token: Some(verify_token),
            pairing_code: None,
            pairing_code_expires_at: None,
            parent_id: None,
        }
    }

    /// A freshly created child: inactive until paired.
    #[must_use]
    pub fn new_child(
        parent_id: Uuid,
        name: String,
        pin_hash: String,
        pairing_code: String,
        pairing_code_expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: PrincipalKind::Child,
            name: Some(name),
            email: None,
            phone_number: None,
            secret_hash: Some(pin_hash),
            active: false,
            failed_attempts: 0,
            locked_until: None,
            family_code: None,
            verify_token: None,
            pairing_code: Some(pairing_code),
            pairing_code_expires_at: Some(pairing_code_expires_at),
            parent_id: Some(parent_id),
        }
    }
}

/// Result of the atomic failed-attempt increment at the store boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Counter incremented without reaching the threshold.
    Counted(i32),
    /// Threshold reached: counter reset to zero and the lock imposed.
    Locked,
}

/// One issued renewable session grant. Only the hash of the plaintext is
/// ever stored.
#[derive(Clone, Debug)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub token_hash: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Claims carried by a signed access token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub id: Uuid,
    pub role: PrincipalKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl AccessClaims {
    /// Claims for a principal: children carry their display name, parents
    /// do not.
    #[must_use]
    pub fn for_principal(principal: &Principal) -> Self {
        let name = match principal.kind {
            PrincipalKind::Child => principal.name.clone(),
            PrincipalKind::Parent => None,
        };
        Self {
            id: principal.id,
            role: principal.kind,
            name,
        }
    }
}

/// The access/refresh pair returned by every successful login or pairing.
#[derive(Clone, Debug, Serialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of parent registration. The verify token is returned once and is
/// consumed by the set-password step.
#[derive(Clone, Debug)]
pub struct RegisteredParent {
    pub id: Uuid,
    pub family_code: String,
    pub verify_token: String,
}

/// Result of child creation. The PIN is returned in plaintext exactly once;
/// the store only keeps its hash.
#[derive(Clone, Debug)]
pub struct CreatedChild {
    pub id: Uuid,
    pub name: String,
    pub pin: String,
    pub pairing_code: String,
    pub pairing_code_expires_at: DateTime<Utc>,
}
