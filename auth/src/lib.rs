//! Phone and federated sign-in handshake for the MenuMaven front-ends.
//!
//! ARCHITECTURE
//! ============
//! `AuthSession` is the only type front-ends talk to. It owns a
//! `ChallengeManager` (the bot-check widget lifecycle) and an
//! `IdentityProvider` (the remote auth service), and mirrors the provider's
//! user-change stream into an `AuthState` that `RouteGuard` reads.
//!
//! Every session is an explicitly constructed value; there is no process-wide
//! current user or current challenge.

pub mod challenge;
pub mod error;
pub mod firebase;
pub mod guard;
pub mod identity;
pub mod phone;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use challenge::{ChallengeEvent, ChallengeInstance, ChallengeManager, ChallengeRenderer, ChallengeToken, WidgetId};
pub use error::AuthError;
pub use guard::{GuardDecision, RouteGuard, allow};
pub use identity::{Identity, IdentityProvider, ProviderError, UserChangeHub, UserChanges, VerificationTicket};
pub use session::{AuthSession, AuthState, PendingVerification, SessionConfig};
