//! Credential and session lifecycle: attempt accounting, credential
//! verification, pairing activation, and token issuance/rotation.

pub mod attempts;
pub mod clock;
pub mod error;
pub mod hasher;
pub mod models;
pub mod pairing;
pub mod repo;
pub mod service;
pub mod signer;
pub mod tokens;
mod utils;
pub mod verifier;


pub use clock::{Clock, SystemClock};
pub use error::AuthError;
pub use hasher::{Argon2Hasher, Hasher};
pub use models::{AccessClaims, PrincipalKind, SessionTokens};
pub use repo::{PgPrincipalStore, PgRefreshTokenStore};
pub use service::AuthService;
pub use signer::{JwtSigner, Signer};
