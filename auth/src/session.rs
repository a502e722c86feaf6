//! Auth session context: the handshake front-ends drive.
//!
//! LIFECYCLE
//! =========
//! 1. `start` subscribes to the provider's user-change stream. Every
//!    notification replaces `AuthState` and marks it ready.
//! 2. `request_passcode` → challenge acquire + solve → provider issuance →
//!    `PendingVerification`.
//! 3. `confirm_passcode` consumes the pending verification and releases the
//!    challenge, whatever the provider answers.
//! 4. `shutdown` (or drop) unsubscribes and releases the challenge. It is
//!    final: later requests, and issuances still in flight, fail with
//!    `VerificationClosed`.
//!
//! CONCURRENCY
//! ===========
//! One passcode flow per session. A second `request_passcode` while a flow is
//! issuing or pending fails with `VerificationInProgress`; callers start over
//! with `cancel_verification`. Confirmation against a pending verification
//! that is no longer current fails with `VerificationClosed` and never reaches
//! the provider.
//!
//! The stream, not the return value of confirm/login, drives `AuthState`.
//! Callers that need to act on the new state use `wait_for_identity`, which
//! is bounded by a timeout.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::challenge::{ChallengeManager, ChallengeRenderer};
use crate::error::AuthError;
use crate::identity::{Identity, IdentityProvider, UserChanges, VerificationTicket};
use crate::phone::{DEFAULT_COUNTRY_CODE, mask_phone_number, normalize_phone_number};

pub const DEFAULT_CHALLENGE_CONTAINER: &str = "recaptcha-container";

// =============================================================================
// STATE
// =============================================================================

/// Snapshot of the signed-in user as last reported by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    /// False until the provider's first notification (signed in or not).
    pub ready: bool,
    pub identity: Option<Identity>,
}

impl AuthState {
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.ready && self.identity.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Container the bot-check widget is rendered into.
    pub challenge_container: String,
    /// Calling code prepended to numbers entered without `+`.
    pub default_country_code: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            challenge_container: DEFAULT_CHALLENGE_CONTAINER.to_owned(),
            default_country_code: DEFAULT_COUNTRY_CODE.to_owned(),
        }
    }
}

/// An issued, not yet confirmed passcode.
#[derive(Debug)]
pub struct PendingVerification {
    phone_number: String,
    ticket: VerificationTicket,
    generation: u64,
}

impl PendingVerification {
    /// Normalized number the code was sent to.
    #[must_use]
    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Idle,
    Issuing,
    Pending(u64),
}

// =============================================================================
// SESSION
// =============================================================================

pub struct AuthSession {
    provider: Arc<dyn IdentityProvider>,
    challenges: ChallengeManager,
    config: SessionConfig,
    state: Arc<watch::Sender<AuthState>>,
    flow: Mutex<Flow>,
    generation: AtomicU64,
    closed: AtomicBool,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl AuthSession {
    /// Create a session and subscribe to the provider's user changes.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn start(
        provider: Arc<dyn IdentityProvider>,
        renderer: Arc<dyn ChallengeRenderer>,
        config: SessionConfig,
    ) -> Self {
        let (tx, _rx) = watch::channel(AuthState::default());
        let state = Arc::new(tx);
        let listener = tokio::spawn(listen(provider.subscribe(), Arc::clone(&state)));

        Self {
            provider,
            challenges: ChallengeManager::new(renderer),
            config,
            state,
            flow: Mutex::new(Flow::Idle),
            generation: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            listener: Mutex::new(Some(listener)),
        }
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    // -------------------------------------------------------------------------
    // Passcode flow
    // -------------------------------------------------------------------------

    /// Send a one-time passcode to `phone_number`.
    ///
    /// # Errors
    ///
    /// `InvalidPhoneNumber`, `VerificationInProgress`, `VerificationClosed`
    /// (after `shutdown`), `ChallengeInitError`,
    /// `ChallengeFailed`, `RateLimited`, `QuotaExceeded`, `NetworkError`,
    /// `UnauthorizedOrigin` or `Unknown`. The challenge is released on every
    /// failure.
    pub async fn request_passcode(&self, phone_number: &str) -> Result<PendingVerification, AuthError> {
        let phone = normalize_phone_number(phone_number, &self.config.default_country_code)?;

        {
            let mut flow = self.flow();
            if self.closed.load(Ordering::Acquire) {
                return Err(AuthError::VerificationClosed);
            }
            if *flow != Flow::Idle {
                return Err(AuthError::VerificationInProgress);
            }
            *flow = Flow::Issuing;
        }
        let mut guard = IssueGuard { session: self, armed: true };

        let ticket = match self.issue(&phone).await {
            Ok(ticket) => ticket,
            Err(err) => {
                warn!(phone = %mask_phone_number(&phone), error = %err, code = err.error_code(), "passcode request failed");
                return Err(err);
            }
        };

        let generation = {
            let mut flow = self.flow();
            if self.closed.load(Ordering::Acquire) {
                debug!("session shut down during issuance");
                return Err(AuthError::VerificationClosed);
            }
            let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
            *flow = Flow::Pending(generation);
            generation
        };
        guard.armed = false;

        info!(phone = %mask_phone_number(&phone), generation, "passcode issued");
        Ok(PendingVerification { phone_number: phone, ticket, generation })
    }

    async fn issue(&self, phone: &str) -> Result<VerificationTicket, AuthError> {
        let instance = self.challenges.acquire(&self.config.challenge_container).await?;
        let proof = self.challenges.verify(&instance).await?;
        self.provider.issue_passcode(phone, &proof).await.map_err(|e| {
            debug!(provider_code = %e.code, "provider rejected passcode issuance");
            AuthError::from_issue_failure(&e)
        })
    }

    /// Submit `code` for `pending`.
    ///
    /// A blank code is rejected locally and leaves `pending` usable. Any other
    /// attempt consumes it.
    ///
    /// # Errors
    ///
    /// `InvalidCode`, `VerificationClosed`, `RateLimited`, `NetworkError` or
    /// `Unknown`.
    pub async fn confirm_passcode(&self, pending: &PendingVerification, code: &str) -> Result<Identity, AuthError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AuthError::InvalidCode);
        }

        {
            let mut flow = self.flow();
            if *flow != Flow::Pending(pending.generation) {
                return Err(AuthError::VerificationClosed);
            }
            *flow = Flow::Idle;
        }
        self.challenges.release();

        match self.provider.confirm_passcode(&pending.ticket, code).await {
            Ok(identity) => {
                info!(uid = %identity.uid, generation = pending.generation, "passcode confirmed");
                Ok(identity)
            }
            Err(e) => {
                let err = AuthError::from_confirm_failure(&e);
                warn!(provider_code = %e.code, error = %err, "passcode confirmation failed");
                Err(err)
            }
        }
    }

    /// Drop the outstanding pending verification so a new request can start.
    /// Returns whether there was one.
    pub fn cancel_verification(&self) -> bool {
        let cancelled = {
            let mut flow = self.flow();
            if matches!(*flow, Flow::Pending(_)) {
                *flow = Flow::Idle;
                true
            } else {
                false
            }
        };
        if cancelled {
            self.challenges.release();
            debug!("pending verification cancelled");
        }
        cancelled
    }

    // -------------------------------------------------------------------------
    // Federated sign-in / sign-out
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// `UserCancelled`, `PopupBlocked`, `NetworkError`, `UnauthorizedOrigin`
    /// or `Unknown`.
    pub async fn login_with_federated_provider(&self) -> Result<Identity, AuthError> {
        match self.provider.federated_sign_in().await {
            Ok(identity) => {
                info!(uid = %identity.uid, "federated sign-in succeeded");
                Ok(identity)
            }
            Err(e) => {
                let err = AuthError::from_federated_failure(&e);
                warn!(provider_code = %e.code, error = %err, "federated sign-in failed");
                Err(err)
            }
        }
    }

    /// Sign out. Any passcode flow in progress is cancelled.
    ///
    /// # Errors
    ///
    /// `NetworkError`, `UnauthorizedOrigin` or `Unknown`.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.cancel_verification();
        self.provider.sign_out().await.map_err(|e| {
            warn!(provider_code = %e.code, "sign-out failed");
            AuthError::from_sign_out_failure(&e)
        })?;
        info!("signed out");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Waiting on the stream
    // -------------------------------------------------------------------------

    /// Wait until the stream reports a signed-in identity.
    ///
    /// # Errors
    ///
    /// `AuthTimeout` if that does not happen within `limit`.
    pub async fn wait_for_identity(&self, limit: Duration) -> Result<Identity, AuthError> {
        let state = self.wait_until(limit, AuthState::is_signed_in).await?;
        state.identity.ok_or(AuthError::AuthTimeout)
    }

    /// Wait until the stream reports no signed-in identity.
    ///
    /// # Errors
    ///
    /// `AuthTimeout` if that does not happen within `limit`.
    pub async fn wait_for_sign_out(&self, limit: Duration) -> Result<(), AuthError> {
        self.wait_until(limit, |s| s.ready && s.identity.is_none()).await?;
        Ok(())
    }

    async fn wait_until(&self, limit: Duration, done: impl FnMut(&AuthState) -> bool) -> Result<AuthState, AuthError> {
        let mut rx = self.state.subscribe();
        match tokio::time::timeout(limit, rx.wait_for(done)).await {
            Ok(Ok(state)) => Ok(state.clone()),
            Ok(Err(_)) | Err(_) => Err(AuthError::AuthTimeout),
        }
    }

    // -------------------------------------------------------------------------
    // Teardown
    // -------------------------------------------------------------------------

    /// Unsubscribe from the provider and release the challenge. Idempotent.
    /// The session accepts no further passcode requests.
    pub fn shutdown(&self) {
        let listener = self.listener.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = listener {
            handle.abort();
            debug!("auth session unsubscribed");
        }
        {
            let mut flow = self.flow();
            self.closed.store(true, Ordering::Release);
            *flow = Flow::Idle;
        }
        self.challenges.release();
    }

    fn flow(&self) -> MutexGuard<'_, Flow> {
        self.flow.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for AuthSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Resets the flow and releases the challenge unless disarmed, so an issuance
/// that fails or is dropped mid-flight never leaves the session stuck.
struct IssueGuard<'a> {
    session: &'a AuthSession,
    armed: bool,
}

impl Drop for IssueGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.session.challenges.release();
            *self.session.flow() = Flow::Idle;
        }
    }
}

async fn listen(mut changes: UserChanges, state: Arc<watch::Sender<AuthState>>) {
    while let Some(identity) = changes.next().await {
        debug!(uid = identity.as_ref().map(|i| i.uid.as_str()), "user changed");
        state.send_replace(AuthState { ready: true, identity });
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
