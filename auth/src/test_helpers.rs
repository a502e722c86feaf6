//! In-memory renderer and provider used by unit tests.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::challenge::{ChallengeEvent, ChallengeRenderer, ChallengeToken, WidgetId};
use crate::identity::{Identity, IdentityProvider, ProviderError, UserChangeHub, UserChanges, VerificationTicket};

pub const VALID_CODE: &str = "123456";

// =============================================================================
// RENDERER
// =============================================================================

/// Records every call as a string like `clear:box`, `render:box:1`,
/// `solve:1`, `dispose:1`.
#[derive(Default)]
pub struct RecordingRenderer {
    pub log: Mutex<Vec<String>>,
    pub live: Mutex<HashSet<WidgetId>>,
    /// Error returned by the next `render` call.
    pub render_error: Mutex<Option<String>>,
    /// Outcome returned by `solve`; defaults to a solved token.
    pub outcome: Mutex<Option<ChallengeEvent>>,
    /// Largest number of simultaneously live widgets observed.
    pub max_live: AtomicUsize,
}

impl RecordingRenderer {
    pub fn events(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().unwrap().len()
    }

    pub fn fail_next_render(&self, reason: &str) {
        *self.render_error.lock().unwrap() = Some(reason.to_owned());
    }

    pub fn set_outcome(&self, event: ChallengeEvent) {
        *self.outcome.lock().unwrap() = Some(event);
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

#[async_trait::async_trait]
impl ChallengeRenderer for RecordingRenderer {
    fn clear_container(&self, container: &str) {
        self.record(format!("clear:{container}"));
    }

    async fn render(&self, container: &str, widget: WidgetId) -> Result<(), String> {
        self.record(format!("render:{container}:{widget}"));
        if let Some(reason) = self.render_error.lock().unwrap().take() {
            return Err(reason);
        }
        let mut live = self.live.lock().unwrap();
        live.insert(widget);
        self.max_live.fetch_max(live.len(), Ordering::SeqCst);
        Ok(())
    }

    async fn solve(&self, widget: WidgetId) -> ChallengeEvent {
        self.record(format!("solve:{widget}"));
        self.outcome
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| ChallengeEvent::Solved(ChallengeToken::new(format!("token-{widget}"))))
    }

    fn dispose(&self, widget: WidgetId) {
        self.record(format!("dispose:{widget}"));
        self.live.lock().unwrap().remove(&widget);
    }
}

// =============================================================================
// PROVIDER
// =============================================================================

/// Fake provider. Accepts [`VALID_CODE`] for any ticket it issued.
pub struct FakeProvider {
    pub hub: UserChangeHub,
    pub issued: Mutex<Vec<(String, String)>>,
    pub issue_errors: Mutex<VecDeque<ProviderError>>,
    pub federated_result: Mutex<Option<Result<Identity, ProviderError>>>,
    pub confirm_calls: AtomicUsize,
    /// Publish identities on the stream after confirm / federated sign-in.
    pub publish_on_sign_in: bool,
    /// When set, `issue_passcode` signals `issue_started` and then waits on
    /// the gate before answering.
    pub issue_gate: Mutex<Option<Arc<tokio::sync::Notify>>>,
    pub issue_started: tokio::sync::Notify,
}

impl FakeProvider {
    /// Provider whose stream has already resolved to signed-out.
    pub fn signed_out() -> Self {
        let provider = Self::unresolved();
        provider.hub.publish(None);
        provider
    }

    /// Provider that has not yet notified any user state.
    pub fn unresolved() -> Self {
        Self {
            hub: UserChangeHub::new(),
            issued: Mutex::new(Vec::new()),
            issue_errors: Mutex::new(VecDeque::new()),
            federated_result: Mutex::new(None),
            confirm_calls: AtomicUsize::new(0),
            publish_on_sign_in: true,
            issue_gate: Mutex::new(None),
            issue_started: tokio::sync::Notify::new(),
        }
    }

    pub fn without_stream_updates(mut self) -> Self {
        self.publish_on_sign_in = false;
        self
    }

    pub fn fail_next_issue(&self, code: &str) {
        self.issue_errors
            .lock()
            .unwrap()
            .push_back(ProviderError::new(code, format!("fake {code}")));
    }

    /// Hold issuances until the returned gate is notified.
    pub fn gate_issuance(&self) -> Arc<tokio::sync::Notify> {
        let gate = Arc::new(tokio::sync::Notify::new());
        *self.issue_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn issued_phones(&self) -> Vec<String> {
        self.issued.lock().unwrap().iter().map(|(phone, _)| phone.clone()).collect()
    }

    pub fn confirm_count(&self) -> usize {
        self.confirm_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IdentityProvider for FakeProvider {
    async fn issue_passcode(
        &self,
        phone_number: &str,
        proof: &ChallengeToken,
    ) -> Result<VerificationTicket, ProviderError> {
        let gate = self.issue_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            self.issue_started.notify_one();
            gate.notified().await;
        }
        if let Some(err) = self.issue_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        let mut issued = self.issued.lock().unwrap();
        issued.push((phone_number.to_owned(), proof.as_str().to_owned()));
        Ok(VerificationTicket::new(format!("ticket-{}:{phone_number}", issued.len())))
    }

    async fn confirm_passcode(&self, ticket: &VerificationTicket, code: &str) -> Result<Identity, ProviderError> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        if code != VALID_CODE {
            return Err(ProviderError::new("auth/invalid-verification-code", "bad code"));
        }
        let phone = ticket.as_str().split_once(':').map(|(_, phone)| phone.to_owned());
        let identity = Identity { phone_number: phone, ..Identity::new("uid-phone") };
        if self.publish_on_sign_in {
            self.hub.publish(Some(identity.clone()));
        }
        Ok(identity)
    }

    async fn federated_sign_in(&self) -> Result<Identity, ProviderError> {
        let result = self
            .federated_result
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(Identity { email: Some("fed@example.com".into()), ..Identity::new("uid-fed") }));
        if let Ok(identity) = &result {
            if self.publish_on_sign_in {
                self.hub.publish(Some(identity.clone()));
            }
        }
        result
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.hub.publish(None);
        Ok(())
    }

    fn subscribe(&self) -> UserChanges {
        self.hub.subscribe()
    }
}
