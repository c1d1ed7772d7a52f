//! Gates reads and writes of intentions on an external authorizer.
//!
//! The authorizer itself (tokens, roles, policies) lives outside this crate. A missing authorizer
//! means access control is disabled and every check passes.

use crate::intention::Intention;

/// The outcome of a single capability check.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AccessDecision {
    Allow,
    Deny,
}

/// Extra context for a capability check, filled from the side of the intention being checked.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthorizerContext {
    pub namespace: String,
}

/// Decides whether the caller may read or write intentions for a service name.
pub trait Authorizer: Send + Sync {
    fn intention_read(&self, name: &str, ctx: &AuthorizerContext) -> AccessDecision;

    fn intention_write(&self, name: &str, ctx: &AuthorizerContext) -> AccessDecision;
}

// === impl AccessDecision ===

impl AccessDecision {
    pub fn is_allow(self) -> bool {
        self == Self::Allow
    }
}

impl From<bool> for AccessDecision {
    fn from(allow: bool) -> Self {
        if allow {
            Self::Allow
        } else {
            Self::Deny
        }
    }
}

// === impl Intention ===

impl Intention {
    /// Fills an authorizer context for the destination (or source) side.
    pub fn authz_context(&self, destination: bool) -> AuthorizerContext {
        let namespace = if destination {
            &self.destination_ns
        } else {
            &self.source_ns
        };
        AuthorizerContext {
            namespace: namespace.clone(),
        }
    }

    /// Returns true if the caller may read the intention.
    ///
    /// Read access to either end reveals the whole intention so that both ends can see why a
    /// connection is or is not permitted.
    pub fn can_read(&self, authz: Option<&dyn Authorizer>) -> bool {
        let Some(authz) = authz else {
            return true;
        };

        if !self.source_name.is_empty()
            && authz
                .intention_read(&self.source_name, &self.authz_context(false))
                .is_allow()
        {
            return true;
        }

        !self.destination_name.is_empty()
            && authz
                .intention_read(&self.destination_name, &self.authz_context(true))
                .is_allow()
    }

    /// Returns true if the caller may create, modify or delete the intention.
    ///
    /// Only the owner of the destination may write rules about traffic into it.
    pub fn can_write(&self, authz: Option<&dyn Authorizer>) -> bool {
        let Some(authz) = authz else {
            return true;
        };

        if self.destination_name.is_empty() {
            return false;
        }

        authz
            .intention_write(&self.destination_name, &self.authz_context(true))
            .is_allow()
    }
}
