//! `carhub-auth`: bearer-token verification.
//!
//! This crate is decoupled from HTTP routing and storage: it turns a raw
//! token into a verified [`Principal`], or fails.

pub mod claims;
pub mod firebase;
pub mod hs256;
pub mod principal;
pub mod verifier;

pub use claims::{IdTokenClaims, TokenValidationError, validate_claims};
pub use firebase::FirebaseVerifier;
pub use hs256::Hs256Verifier;
pub use principal::Principal;
pub use verifier::{IdentityVerifier, VerifyError};
