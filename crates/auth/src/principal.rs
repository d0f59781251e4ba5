use crate::{claims::IdTokenClaims, verifier::VerifyError};

/// A verified identity, attached to a request after its token validated.
///
/// The email is what routes compare against owner fields. Comparison is exact:
/// no case folding or normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal {
    subject: String,
    email: String,
}

impl Principal {
    pub fn new(subject: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            email: email.into(),
        }
    }

    /// Build a principal from verified claims. Tokens without an email are
    /// useless to this service and are rejected.
    pub fn from_claims(claims: IdTokenClaims) -> Result<Self, VerifyError> {
        match claims.email {
            Some(email) if !email.is_empty() => Ok(Self::new(claims.sub, email)),
            _ => Err(VerifyError::MissingEmail),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Whether `email` names this principal.
    pub fn owns(&self, email: &str) -> bool {
        self.email == email
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ownership_is_exact() {
        let p = Principal::new("uid", "Ann@x.com");
        assert!(p.owns("Ann@x.com"));
        assert!(!p.owns("ann@x.com"));
        assert!(!p.owns(""));
    }

    #[test]
    fn claims_without_email_are_rejected() {
        let claims = IdTokenClaims {
            sub: "uid".into(),
            email: Some(String::new()),
            iat: 0,
            exp: 1,
            auth_time: None,
        };
        assert!(matches!(Principal::from_claims(claims), Err(VerifyError::MissingEmail)));
    }
}
