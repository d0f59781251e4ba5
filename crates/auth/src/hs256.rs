//! Shared-secret HS256 tokens, for local development and tests.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::{
    claims::{validate_claims, IdTokenClaims, CLOCK_SKEW_SECS},
    principal::Principal,
    verifier::{IdentityVerifier, VerifyError},
};

#[derive(Clone)]
pub struct Hs256Verifier {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256Verifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_SECS;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }
}

impl core::fmt::Debug for Hs256Verifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256Verifier").finish_non_exhaustive()
    }
}

#[async_trait]
impl IdentityVerifier for Hs256Verifier {
    async fn verify(&self, token: &str) -> Result<Principal, VerifyError> {
        let data = decode::<IdTokenClaims>(token, &self.key, &self.validation)?;
        validate_claims(&data.claims, Utc::now())?;
        Principal::from_claims(data.claims)
    }
}
