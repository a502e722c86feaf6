use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use auth::{
    AuthSession, ChallengeToken, Identity, IdentityProvider, ProviderError, SessionConfig, UserChangeHub, UserChanges,
    VerificationTicket,
};

use crate::terminal::{Console, TerminalChallenge};

pub const VALID_CODE: &str = "123456";
pub const REJECTED_PHONE: &str = "+15550000000";

/// Console fed from a script. `None` entries (and running out) mean end of
/// input.
#[derive(Default)]
pub struct ScriptedConsole {
    answers: Mutex<VecDeque<Option<String>>>,
    prompts: Mutex<Vec<String>>,
    said: Mutex<Vec<String>>,
}

impl ScriptedConsole {
    pub fn new(answers: &[Option<&str>]) -> Self {
        let answers = answers.iter().map(|a| a.map(str::to_owned)).collect();
        Self { answers: Mutex::new(answers), ..Self::default() }
    }

    pub fn said(&self) -> Vec<String> {
        self.said.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Console for ScriptedConsole {
    async fn prompt(&self, label: &str) -> Option<String> {
        self.prompts.lock().unwrap().push(label.to_owned());
        self.answers.lock().unwrap().pop_front().flatten()
    }

    fn say(&self, line: &str) {
        self.said.lock().unwrap().push(line.to_owned());
    }
}

/// In-memory provider: rejects `REJECTED_PHONE`, accepts `VALID_CODE`.
pub struct FakeProvider {
    hub: UserChangeHub,
    pub issued: Mutex<Vec<String>>,
    pub confirms: AtomicUsize,
}

impl FakeProvider {
    pub fn signed_out() -> Self {
        let hub = UserChangeHub::new();
        hub.publish(None);
        Self { hub, issued: Mutex::default(), confirms: AtomicUsize::new(0) }
    }

    pub fn confirm_count(&self) -> usize {
        self.confirms.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IdentityProvider for FakeProvider {
    async fn issue_passcode(
        &self,
        phone_number: &str,
        _proof: &ChallengeToken,
    ) -> Result<VerificationTicket, ProviderError> {
        if phone_number == REJECTED_PHONE {
            return Err(ProviderError::new("auth/invalid-phone-number", "rejected"));
        }
        self.issued.lock().unwrap().push(phone_number.to_owned());
        Ok(VerificationTicket::new(phone_number))
    }

    async fn confirm_passcode(&self, ticket: &VerificationTicket, code: &str) -> Result<Identity, ProviderError> {
        self.confirms.fetch_add(1, Ordering::SeqCst);
        if code != VALID_CODE {
            return Err(ProviderError::new("auth/invalid-verification-code", "wrong code"));
        }
        let mut identity = Identity::new(format!("uid{}", ticket.as_str()));
        identity.phone_number = Some(ticket.as_str().to_owned());
        self.hub.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn federated_sign_in(&self) -> Result<Identity, ProviderError> {
        let mut identity = Identity::new("uid-fed");
        identity.email = Some("fed@example.com".into());
        self.hub.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.hub.publish(None);
        Ok(())
    }

    fn subscribe(&self) -> UserChanges {
        self.hub.subscribe()
    }
}

/// Session over a `FakeProvider` with the bot check pre-answered.
pub fn test_session(console: Arc<ScriptedConsole>) -> (Arc<FakeProvider>, AuthSession) {
    let provider = Arc::new(FakeProvider::signed_out());
    let renderer = TerminalChallenge::new(console, Some("test-token".into()));
    let session = AuthSession::start(provider.clone(), Arc::new(renderer), SessionConfig::default());
    (provider, session)
}
