use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerated clock difference between us and the token issuer, in seconds.
pub const CLOCK_SKEW_SECS: u64 = 60;

/// ID token claims this service reads.
///
/// Field names follow the JWT registered claims; timestamps are Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Subject (the identity provider's user id).
    pub sub: String,

    /// Verified email; this is the principal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Issued-at.
    pub iat: i64,

    /// Expiration.
    pub exp: i64,

    /// When the user authenticated (identity-provider tokens only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_time: Option<i64>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("invalid timestamp in claims")]
    InvalidTimestamp,
}

fn at(secs: i64) -> Result<DateTime<Utc>, TokenValidationError> {
    DateTime::from_timestamp(secs, 0).ok_or(TokenValidationError::InvalidTimestamp)
}

/// Deterministically validate the claim time window against `now`.
///
/// Signature checks happen before this, in the verifier.
pub fn validate_claims(claims: &IdTokenClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    let skew = Duration::seconds(CLOCK_SKEW_SECS as i64);
    let issued_at = at(claims.iat)?;
    let expires_at = at(claims.exp)?;

    if expires_at <= issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if issued_at > now + skew {
        return Err(TokenValidationError::NotYetValid);
    }
    if let Some(auth_time) = claims.auth_time {
        if at(auth_time)? > now + skew {
            return Err(TokenValidationError::NotYetValid);
        }
    }
    if now >= expires_at + skew {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
