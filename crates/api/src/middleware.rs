use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use carhub_auth::IdentityVerifier;

use crate::{app::errors::ApiError, context::PrincipalContext};

#[derive(Clone)]
pub struct AuthState {
    pub verifier: Arc<dyn IdentityVerifier>,
}

/// Access guard for protected routes.
///
/// A missing header and a token that fails verification produce the same
/// 401; the reason is only logged.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers())?.to_owned();

    let principal = state.verifier.verify(&token).await.map_err(|e| {
        debug!(error = %e, "bearer token rejected");
        ApiError::Unauthenticated
    })?;

    req.extensions_mut().insert(PrincipalContext::new(principal));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(ApiError::Unauthenticated)?;

    let header = header.to_str().map_err(|_| ApiError::Unauthenticated)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthenticated)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(ApiError::Unauthenticated);
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use axum::http::{header::AUTHORIZATION, HeaderValue};

    use super::*;

    fn headers(value: &'static str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_static(value));
        h
    }

    #[test]
    fn extracts_trimmed_token() {
        assert_eq!(extract_bearer(&headers("Bearer  abc.def ")).unwrap(), "abc.def");
    }

    #[test]
    fn rejects_missing_wrong_scheme_and_empty() {
        assert!(matches!(extract_bearer(&HeaderMap::new()), Err(ApiError::Unauthenticated)));
        assert!(matches!(extract_bearer(&headers("Basic abc")), Err(ApiError::Unauthenticated)));
        assert!(matches!(extract_bearer(&headers("Bearer    ")), Err(ApiError::Unauthenticated)));
        assert!(matches!(extract_bearer(&headers("abc")), Err(ApiError::Unauthenticated)));
    }
}
