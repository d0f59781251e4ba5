//! Ownership checks for owner-scoped routes.
//!
//! Routes that name an owner (path or query parameter) must be called by that
//! owner. This runs after the access guard and before any store call.

use tracing::debug;

use crate::{app::errors::ApiError, context::PrincipalContext};

/// Require that `owner_email` is the caller's own email.
///
/// Exact comparison; no case folding.
pub fn ensure_owner(principal: &PrincipalContext, owner_email: &str) -> Result<(), ApiError> {
    if principal.principal().owns(owner_email) {
        return Ok(());
    }
    debug!(principal = principal.email(), owner = owner_email, "ownership check failed");
    Err(ApiError::Forbidden)
}

#[cfg(test)]
mod tests {
    use carhub_auth::Principal;

    use super::*;

    #[test]
    fn owner_passes_and_others_are_forbidden() {
        let ctx = PrincipalContext::new(Principal::new("uid", "a@x.com"));
        assert!(ensure_owner(&ctx, "a@x.com").is_ok());
        assert!(matches!(ensure_owner(&ctx, "b@x.com"), Err(ApiError::Forbidden)));
        assert!(matches!(ensure_owner(&ctx, "A@x.com"), Err(ApiError::Forbidden)));
    }
}
