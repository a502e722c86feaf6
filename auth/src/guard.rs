//! Route guard for views that require a signed-in user.

use tokio::sync::watch;

use crate::session::AuthState;

/// Where denied visitors are sent.
pub const DEFAULT_LANDING_ROUTE: &str = "/";

/// True iff the session is ready and has a signed-in identity.
#[must_use]
pub fn allow(state: &AuthState) -> bool {
    state.ready && state.identity.is_some()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// The provider has not reported yet; render nothing.
    Pending,
    Allow,
    Redirect(String),
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    landing_route: String,
}

impl RouteGuard {
    #[must_use]
    pub fn new(landing_route: impl Into<String>) -> Self {
        Self { landing_route: landing_route.into() }
    }

    #[must_use]
    pub fn landing_route(&self) -> &str {
        &self.landing_route
    }

    #[must_use]
    pub fn decide(&self, state: &AuthState) -> GuardDecision {
        if !state.ready {
            GuardDecision::Pending
        } else if allow(state) {
            GuardDecision::Allow
        } else {
            GuardDecision::Redirect(self.landing_route.clone())
        }
    }

    /// Wait out the pending phase, then decide. A closed state channel
    /// decides on the last value seen.
    pub async fn resolve(&self, rx: &mut watch::Receiver<AuthState>) -> GuardDecision {
        let decided = match rx.wait_for(|state| state.ready).await {
            Ok(state) => Some(self.decide(&state)),
            Err(_) => None,
        };
        decided.unwrap_or_else(|| self.decide(&rx.borrow()))
    }
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new(DEFAULT_LANDING_ROUTE)
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
