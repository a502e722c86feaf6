//! Terminal stand-ins for the browser pieces of sign-in: the input form, the
//! reCAPTCHA widget, and the federated sign-in popup.

use std::sync::Arc;

use auth::firebase::{FederatedCredential, FederatedPrompt};
use auth::{ChallengeEvent, ChallengeRenderer, ChallengeToken, ProviderError, WidgetId};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

// =============================================================================
// CONSOLE
// =============================================================================

#[async_trait::async_trait]
pub trait Console: Send + Sync {
    /// Show `label` and read one trimmed line. `None` at end of input.
    async fn prompt(&self, label: &str) -> Option<String>;

    fn say(&self, line: &str);
}

pub struct Stdio {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl Stdio {
    #[must_use]
    pub fn new() -> Self {
        Self { lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()) }
    }
}

impl Default for Stdio {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Console for Stdio {
    async fn prompt(&self, label: &str) -> Option<String> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(label.as_bytes()).await.ok()?;
        stdout.flush().await.ok()?;
        let line = self.lines.lock().await.next_line().await.ok()??;
        Some(line.trim().to_owned())
    }

    fn say(&self, line: &str) {
        println!("{line}");
    }
}

// =============================================================================
// BOT CHECK
// =============================================================================

/// Bot check answered with a reCAPTCHA token, either preset (emulator or
/// test setups) or pasted by the user. A blank answer counts as expired.
pub struct TerminalChallenge {
    console: Arc<dyn Console>,
    preset_token: Option<String>,
}

impl TerminalChallenge {
    #[must_use]
    pub fn new(console: Arc<dyn Console>, preset_token: Option<String>) -> Self {
        Self { console, preset_token: preset_token.filter(|t| !t.trim().is_empty()) }
    }
}

#[async_trait::async_trait]
impl ChallengeRenderer for TerminalChallenge {
    fn clear_container(&self, container: &str) {
        tracing::trace!(container, "challenge container cleared");
    }

    async fn render(&self, container: &str, widget: WidgetId) -> Result<(), String> {
        tracing::debug!(container, widget, "bot check rendered");
        if self.preset_token.is_none() {
            self.console.say("Bot check: solve the reCAPTCHA in a browser and paste the token.");
        }
        Ok(())
    }

    async fn solve(&self, widget: WidgetId) -> ChallengeEvent {
        if let Some(token) = &self.preset_token {
            return ChallengeEvent::Solved(ChallengeToken::new(token.clone()));
        }
        match self.console.prompt("reCAPTCHA token: ").await {
            Some(token) if !token.is_empty() => ChallengeEvent::Solved(ChallengeToken::new(token)),
            Some(_) => ChallengeEvent::Expired,
            None => ChallengeEvent::Error(format!("input closed before widget {widget} was solved")),
        }
    }

    fn dispose(&self, widget: WidgetId) {
        tracing::trace!(widget, "bot check disposed");
    }
}

// =============================================================================
// FEDERATED SIGN-IN
// =============================================================================

/// Federated sign-in where the user pastes an ID token from the account
/// provider. A blank answer is treated as closing the popup.
pub struct TerminalFederatedPrompt {
    console: Arc<dyn Console>,
    provider_id: String,
}

impl TerminalFederatedPrompt {
    #[must_use]
    pub fn new(console: Arc<dyn Console>, provider_id: impl Into<String>) -> Self {
        Self { console, provider_id: provider_id.into() }
    }
}

#[async_trait::async_trait]
impl FederatedPrompt for TerminalFederatedPrompt {
    async fn credential(&self) -> Result<FederatedCredential, ProviderError> {
        let label = format!("{} ID token (blank to cancel): ", self.provider_id);
        match self.console.prompt(&label).await {
            Some(id_token) if !id_token.is_empty() => {
                Ok(FederatedCredential { provider_id: self.provider_id.clone(), id_token })
            }
            _ => Err(ProviderError::new("auth/popup-closed-by-user", "sign-in cancelled")),
        }
    }
}

#[cfg(test)]
#[path = "terminal_test.rs"]
mod tests;
