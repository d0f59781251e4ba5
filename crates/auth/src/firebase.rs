//! Firebase Authentication ID tokens.
//!
//! Tokens are RS256 JWTs signed by Google. The signing keys are published as
//! a JWKS and rotate, so they are fetched lazily and cached.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{
    claims::{validate_claims, IdTokenClaims, CLOCK_SKEW_SECS},
    principal::Principal,
    verifier::{IdentityVerifier, VerifyError},
};

pub const GOOGLE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Cached keys are trusted for this long.
const KEY_TTL: Duration = Duration::from_secs(60 * 60);

/// An unknown `kid` triggers at most one refetch per this interval.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

struct CachedKeys {
    set: JwkSet,
    fetched_at: Instant,
}

pub struct FirebaseVerifier {
    http: reqwest::Client,
    jwks_url: String,
    validation: Validation,
    keys: RwLock<Option<CachedKeys>>,
}

impl FirebaseVerifier {
    pub fn new(project_id: &str) -> Self {
        Self::with_jwks_url(project_id, GOOGLE_JWKS_URL)
    }

    pub fn with_jwks_url(project_id: &str, jwks_url: impl Into<String>) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = CLOCK_SKEW_SECS;
        validation.set_audience(&[project_id]);
        validation.set_issuer(&[format!("https://securetoken.google.com/{project_id}")]);
        validation.set_required_spec_claims(&["exp", "iat", "sub", "aud", "iss"]);

        Self {
            http: reqwest::Client::new(),
            jwks_url: jwks_url.into(),
            validation,
            keys: RwLock::new(None),
        }
    }

    async fn key_for(&self, kid: &str) -> Result<DecodingKey, VerifyError> {
        if let Some(key) = self.cached_key(kid).await? {
            return Ok(key);
        }

        self.refresh().await?;
        if let Some(key) = self.cached_key(kid).await? {
            return Ok(key);
        }

        Err(VerifyError::UnknownKey(Some(kid.to_string())))
    }

    async fn cached_key(&self, kid: &str) -> Result<Option<DecodingKey>, VerifyError> {
        let guard = self.keys.read().await;
        let Some(cached) = guard.as_ref().filter(|c| c.fetched_at.elapsed() < KEY_TTL) else {
            return Ok(None);
        };
        match cached.set.find(kid) {
            Some(jwk) => Ok(Some(DecodingKey::from_jwk(jwk)?)),
            None => Ok(None),
        }
    }

    /// Refetch the key set unless it was fetched within `MIN_REFRESH_INTERVAL`.
    ///
    /// The staleness check and the fetch happen under one write lock, so
    /// concurrent misses wait for a single fetch instead of each issuing one.
    async fn refresh(&self) -> Result<(), VerifyError> {
        let mut guard = self.keys.write().await;
        if guard
            .as_ref()
            .is_some_and(|c| c.fetched_at.elapsed() < MIN_REFRESH_INTERVAL)
        {
            return Ok(());
        }

        let set: JwkSet = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(|e| VerifyError::KeyFetch(e.to_string()))?
            .json()
            .await
            .map_err(|e| VerifyError::KeyFetch(e.to_string()))?;

        info!(keys = set.keys.len(), "refreshed identity provider signing keys");
        *guard = Some(CachedKeys {
            set,
            fetched_at: Instant::now(),
        });
        Ok(())
    }
}

impl core::fmt::Debug for FirebaseVerifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FirebaseVerifier")
            .field("jwks_url", &self.jwks_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, VerifyError> {
        let header = decode_header(token)?;
        if header.alg != Algorithm::RS256 {
            return Err(VerifyError::Invalid(format!("unexpected alg {:?}", header.alg)));
        }
        let kid = header.kid.ok_or(VerifyError::UnknownKey(None))?;

        let key = self.key_for(&kid).await?;
        let data = decode::<IdTokenClaims>(token, &key, &self.validation)?;
        if data.claims.sub.is_empty() {
            return Err(VerifyError::Invalid("empty subject".to_string()));
        }
        validate_claims(&data.claims, Utc::now())?;
        debug!(sub = %data.claims.sub, "identity token verified");
        Principal::from_claims(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use axum::{extract::State, routing::get, Json, Router};
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};

    use super::*;

    const PROJECT: &str = "demo-project";
    const KID: &str = "test-key-1";
    const RSA_KEY_PEM: &str = include_str!("../testdata/rsa_test_key.pem");
    const JWKS: &str = include_str!("../testdata/jwks.json");

    /// Serves the test JWKS on an ephemeral port and counts fetches.
    async fn spawn_jwks() -> (String, Arc<AtomicUsize>) {
        async fn jwks(State(hits): State<Arc<AtomicUsize>>) -> Json<Value> {
            hits.fetch_add(1, Ordering::SeqCst);
            Json(serde_json::from_str(JWKS).unwrap())
        }

        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new().route("/jwks", get(jwks)).with_state(hits.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/jwks", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (url, hits)
    }

    fn signed(kid: &str, aud: &str, iss: &str, email: &str) -> String {
        let now = Utc::now().timestamp();
        let claims = json!({
            "sub": "firebase-uid",
            "email": email,
            "aud": aud,
            "iss": iss,
            "iat": now,
            "exp": now + 600,
            "auth_time": now,
        });
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());
        let key = EncodingKey::from_rsa_pem(RSA_KEY_PEM.as_bytes()).unwrap();
        encode(&header, &claims, &key).unwrap()
    }

    fn issuer() -> String {
        format!("https://securetoken.google.com/{PROJECT}")
    }

    #[tokio::test]
    async fn accepts_tokens_signed_by_a_published_key() {
        let (url, hits) = spawn_jwks().await;
        let verifier = FirebaseVerifier::with_jwks_url(PROJECT, url);

        let principal = verifier
            .verify(&signed(KID, PROJECT, &issuer(), "driver@x.com"))
            .await
            .unwrap();
        assert_eq!(principal.email(), "driver@x.com");
        assert_eq!(principal.subject(), "firebase-uid");

        // Second token is served from the cache.
        verifier
            .verify(&signed(KID, PROJECT, &issuer(), "other@x.com"))
            .await
            .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejects_wrong_audience_or_issuer() {
        let (url, _) = spawn_jwks().await;
        let verifier = FirebaseVerifier::with_jwks_url(PROJECT, url);

        let wrong_aud = signed(KID, "someone-elses-project", &issuer(), "a@x.com");
        assert!(matches!(verifier.verify(&wrong_aud).await, Err(VerifyError::Invalid(_))));

        let wrong_iss = signed(KID, PROJECT, "https://securetoken.google.com/impostor", "a@x.com");
        assert!(matches!(verifier.verify(&wrong_iss).await, Err(VerifyError::Invalid(_))));
    }

    #[tokio::test]
    async fn unknown_kid_refetches_at_most_once_per_interval() {
        let (url, hits) = spawn_jwks().await;
        let verifier = FirebaseVerifier::with_jwks_url(PROJECT, url);

        for _ in 0..3 {
            let err = verifier
                .verify(&signed("rotated-away", PROJECT, &issuer(), "a@x.com"))
                .await
                .unwrap_err();
            assert!(matches!(err, VerifyError::UnknownKey(Some(_))), "{err:?}");
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_cold_misses_share_one_fetch() {
        let (url, hits) = spawn_jwks().await;
        let verifier = Arc::new(FirebaseVerifier::with_jwks_url(PROJECT, url));

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let verifier = verifier.clone();
                let token = signed(KID, PROJECT, &issuer(), &format!("u{i}@x.com"));
                tokio::spawn(async move { verifier.verify(&token).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    // Nothing listens here; any attempt to fetch keys fails fast.
    const UNREACHABLE: &str = "http://127.0.0.1:9/jwks";

    /// A structurally valid token whose signature is never checked.
    fn unsigned(header: &str) -> String {
        format!("{}.e30.c2ln", URL_SAFE_NO_PAD.encode(header))
    }

    #[tokio::test]
    async fn rejects_symmetric_tokens_before_fetching_keys() {
        let now = Utc::now().timestamp();
        let claims = IdTokenClaims {
            sub: "uid".into(),
            email: Some("a@x.com".into()),
            iat: now,
            exp: now + 600,
            auth_time: None,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(b"k")).unwrap();

        let verifier = FirebaseVerifier::with_jwks_url("demo-project", UNREACHABLE);
        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, VerifyError::Invalid(_)), "{err:?}");
    }

    #[tokio::test]
    async fn rejects_tokens_without_kid() {
        let verifier = FirebaseVerifier::with_jwks_url("demo-project", UNREACHABLE);
        let err = verifier
            .verify(&unsigned(r#"{"alg":"RS256","typ":"JWT"}"#))
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::UnknownKey(None)), "{err:?}");
    }

    #[tokio::test]
    async fn unreachable_key_endpoint_is_a_fetch_error() {
        let verifier = FirebaseVerifier::with_jwks_url("demo-project", UNREACHABLE);
        let err = verifier
            .verify(&unsigned(r#"{"alg":"RS256","kid":"k1"}"#))
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::KeyFetch(_)), "{err:?}");
    }
}
