//! Identity provider seam: identities, provider failures, user-change stream.
//!
//! DESIGN
//! ======
//! The remote auth service is consumed through [`IdentityProvider`]. Its
//! user-change notifications are a latest-value stream: a subscriber sees the
//! current resolved state first (once the provider has resolved one) and then
//! every later change. Intermediate states may coalesce, which is fine because
//! only the latest signed-in user matters.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::challenge::ChallengeToken;

// =============================================================================
// IDENTITY
// =============================================================================

/// An authenticated principal as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable provider-assigned user id.
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn new(uid: impl Into<String>) -> Self {
        Self { uid: uid.into(), display_name: None, email: None, phone_number: None }
    }

    /// Best human-readable label: display name, then email, then phone, then uid.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .or(self.phone_number.as_deref())
            .unwrap_or(&self.uid)
    }
}

/// Opaque provider handle for an issued passcode (Firebase `sessionInfo`).
#[derive(Clone, PartialEq, Eq)]
pub struct VerificationTicket(String);

impl VerificationTicket {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for VerificationTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("VerificationTicket(..)")
    }
}

/// Failure reported by the provider, keyed by its own string code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ProviderError {
    /// Provider code such as `auth/invalid-phone-number`.
    pub code: String,
    pub message: String,
}

impl ProviderError {
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into() }
    }
}

// =============================================================================
// PROVIDER
// =============================================================================

/// Remote identity service consumed by `AuthSession`.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Send a one-time passcode to `phone_number`, gated by a solved bot check.
    async fn issue_passcode(&self, phone_number: &str, proof: &ChallengeToken)
    -> Result<VerificationTicket, ProviderError>;

    /// Exchange an issued ticket plus the code the user typed for an identity.
    async fn confirm_passcode(&self, ticket: &VerificationTicket, code: &str) -> Result<Identity, ProviderError>;

    /// Run a third-party account sign-in interaction.
    async fn federated_sign_in(&self) -> Result<Identity, ProviderError>;

    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Subscribe to user changes. Dropping the returned stream unsubscribes.
    fn subscribe(&self) -> UserChanges;
}

// =============================================================================
// USER-CHANGE STREAM
// =============================================================================

/// Publisher side of the user-change stream, embedded in providers.
///
/// `None` in the channel means "not resolved yet"; `Some(None)` means
/// resolved and signed out.
pub struct UserChangeHub {
    tx: watch::Sender<Option<Option<Identity>>>,
}

impl UserChangeHub {
    /// A hub that has not resolved any user state yet.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Publish the current user (or `None` for signed out).
    pub fn publish(&self, identity: Option<Identity>) {
        self.tx.send_replace(Some(identity));
    }

    /// Latest resolved state, or `None` when nothing was published yet.
    #[must_use]
    pub fn current(&self) -> Option<Option<Identity>> {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> UserChanges {
        let mut rx = self.tx.subscribe();
        if rx.borrow().is_some() {
            rx.mark_changed();
        }
        UserChanges { rx }
    }
}

impl Default for UserChangeHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscriber side of the user-change stream.
pub struct UserChanges {
    rx: watch::Receiver<Option<Option<Identity>>>,
}

impl UserChanges {
    /// Wait for the next resolved user state. Returns `None` once the
    /// provider is gone.
    pub async fn next(&mut self) -> Option<Option<Identity>> {
        loop {
            self.rx.changed().await.ok()?;
            if let Some(identity) = self.rx.borrow_and_update().clone() {
                return Some(identity);
            }
        }
    }
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
