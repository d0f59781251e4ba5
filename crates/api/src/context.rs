use carhub_auth::Principal;

/// Principal context for a request (the verified identity).
///
/// Inserted by the access guard; present on every guarded route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn email(&self) -> &str {
        self.principal.email()
    }
}
