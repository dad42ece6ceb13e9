//! Access-token signing as an injected capability. Key material is handed
//! to the signer at construction and never read from ambient state inside
//! the core.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use super::error::AuthError;
use super::models::AccessClaims;

pub trait Signer: Send + Sync {
    /// Deterministic signing over the claims with the given time to live.
    fn sign(&self, claims: &AccessClaims, ttl: Duration) -> anyhow::Result<String>;

    /// Verify signature and expiry, returning the embedded claims.
    fn verify(&self, token: &str) -> Result<AccessClaims, AuthError>;
}

#[derive(Serialize, Deserialize)]
struct WireClaims {
    #[serde(flatten)]
    claims: AccessClaims,
    iat: i64,
    exp: i64,
}

/// HS256 JWT signer over a shared secret.
pub struct JwtSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtSigner {
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }
}

impl Signer for JwtSigner {
    fn sign(&self, claims: &AccessClaims, ttl: Duration) -> anyhow::Result<String> {
        let now = Utc::now();
        let wire = WireClaims {
            claims: claims.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::default(), &wire, &self.encoding)
            .map_err(|err| anyhow::anyhow!("failed to sign access token: {err}"))
    }

    fn verify(&self, token: &str) -> Result<AccessClaims, AuthError> {
        match decode::<WireClaims>(token, &self.decoding, &self.validation) {
            Ok(data) => Ok(data.claims.claims),
            Err(err) if matches!(err.kind(), ErrorKind::ExpiredSignature) => {
                Err(AuthError::Expired("access token"))
            }
            Err(_) => Err(AuthError::InvalidCredential),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{JwtSigner, Signer};
    use crate::auth::error::AuthError;
    use crate::auth::models::{AccessClaims, PrincipalKind};
    use chrono::Duration;
    use uuid::Uuid;

    fn claims() -> AccessClaims {
        AccessClaims {
            id: Uuid::new_v4(),
            role: PrincipalKind::Child,
            name: Some("Mio".to_string()),
        }
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let signer = JwtSigner::new("test-secret");
        let claims = claims();
        let token = signer.sign(&claims, Duration::hours(1)).expect("sign");
        let verified = signer.verify(&token).expect("verify");
        assert_eq!(verified, claims);
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let signer = JwtSigner::new("test-secret");
        let token = signer.sign(&claims(), Duration::hours(1)).expect("sign");
        let other = JwtSigner::new("other-secret");
        assert!(matches!(
            other.verify(&token),
            Err(AuthError::InvalidCredential)
        ));
    }

    #[test]
    fn verify_rejects_garbage() {
        let signer = JwtSigner::new("test-secret");
        assert!(matches!(
            signer.verify("not-a-jwt"),
            Err(AuthError::InvalidCredential)
        ));
    }
}
