//! # famgate
//!
//! Family account authentication and session service. Two principal kinds
//! are supported: a **parent** account (email + password) and a **child**
//! account (shared-secret PIN, paired to its parent via a family code).
//!
//! The heart of the crate is [`auth`]: brute-force lockout accounting,
//! credential verification, pairing-code activation, and access/refresh
//! token issuance and rotation. The HTTP layer in [`api`] stays thin; it
//! parses requests and maps the typed error taxonomy to status codes.

pub mod api;
pub mod auth;
pub mod cli;
