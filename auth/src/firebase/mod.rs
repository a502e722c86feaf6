//! Identity Toolkit REST client implementing [`IdentityProvider`].
//!
//! DESIGN
//! ======
//! Talks to the `accounts:*` endpoints directly (or to the auth emulator).
//! REST error messages such as `INVALID_CODE : ...` are mapped onto the same
//! `auth/*` codes the browser SDK reports, so `AuthError` classification is
//! provider-agnostic. Parsing is kept in pure functions for testability.
//!
//! The REST API has no sign-in popup; federated sign-in obtains the
//! third-party credential through a [`FederatedPrompt`].

pub mod config;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::challenge::ChallengeToken;
use crate::identity::{Identity, IdentityProvider, ProviderError, UserChangeHub, UserChanges, VerificationTicket};
pub use config::{FirebaseConfig, FirebaseConfigError, FirebaseTimeouts};

// =============================================================================
// FEDERATED PROMPT
// =============================================================================

/// Credential issued by a third-party account provider.
#[derive(Clone, PartialEq, Eq)]
pub struct FederatedCredential {
    /// Provider id such as `google.com`.
    pub provider_id: String,
    pub id_token: String,
}

impl std::fmt::Debug for FederatedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FederatedCredential")
            .field("provider_id", &self.provider_id)
            .finish_non_exhaustive()
    }
}

/// Source of federated credentials (the popup, in a browser).
#[async_trait::async_trait]
pub trait FederatedPrompt: Send + Sync {
    /// Fails with `auth/popup-closed-by-user` when the user backs out.
    async fn credential(&self) -> Result<FederatedCredential, ProviderError>;
}

// =============================================================================
// PROVIDER
// =============================================================================

pub struct FirebaseRestProvider {
    http: reqwest::Client,
    config: FirebaseConfig,
    hub: UserChangeHub,
    id_token: Mutex<Option<String>>,
    federated: Option<Arc<dyn FederatedPrompt>>,
}

impl FirebaseRestProvider {
    /// Build a provider. No session is persisted, so the user-change stream
    /// resolves to signed-out immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: FirebaseConfig) -> Result<Self, FirebaseConfigError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| FirebaseConfigError::HttpClientBuild(e.to_string()))?;
        let hub = UserChangeHub::new();
        hub.publish(None);
        Ok(Self { http, config, hub, id_token: Mutex::new(None), federated: None })
    }

    #[must_use]
    pub fn with_federated_prompt(mut self, prompt: Arc<dyn FederatedPrompt>) -> Self {
        self.federated = Some(prompt);
        self
    }

    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.config.project_id
    }

    /// ID token of the signed-in user, for calling backends.
    #[must_use]
    pub fn id_token(&self) -> Option<String> {
        self.id_token.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn signed_in(&self, response: SignInResponse) -> Identity {
        let (identity, id_token) = split_sign_in(response);
        *self.id_token.lock().unwrap_or_else(PoisonError::into_inner) = id_token;
        self.hub.publish(Some(identity.clone()));
        identity
    }

    async fn call<B, R>(&self, method: &str, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        debug!(method, "identity toolkit request");
        let response = self
            .http
            .post(self.config.endpoint(method))
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| transport_error(&e))?;
        if !(200..300).contains(&status) {
            return Err(parse_error_body(status, &text));
        }

        serde_json::from_str(&text)
            .map_err(|e| ProviderError::new("auth/internal-error", format!("unexpected {method} response: {e}")))
    }
}

#[async_trait::async_trait]
impl IdentityProvider for FirebaseRestProvider {
    async fn issue_passcode(
        &self,
        phone_number: &str,
        proof: &ChallengeToken,
    ) -> Result<VerificationTicket, ProviderError> {
        let body = SendVerificationCodeRequest { phone_number, recaptcha_token: proof.as_str() };
        let response: SendVerificationCodeResponse = self.call("sendVerificationCode", &body).await?;
        Ok(VerificationTicket::new(response.session_info))
    }

    async fn confirm_passcode(&self, ticket: &VerificationTicket, code: &str) -> Result<Identity, ProviderError> {
        let body = SignInWithPhoneNumberRequest { session_info: ticket.as_str(), code };
        let response: SignInResponse = self.call("signInWithPhoneNumber", &body).await?;
        Ok(self.signed_in(response))
    }

    async fn federated_sign_in(&self) -> Result<Identity, ProviderError> {
        let Some(prompt) = &self.federated else {
            return Err(ProviderError::new(
                "auth/operation-not-supported-in-this-environment",
                "no federated sign-in prompt configured",
            ));
        };
        let credential = prompt.credential().await?;
        let post_body = format!("id_token={}&providerId={}", credential.id_token, credential.provider_id);
        let request_uri = self.config.request_uri();
        let body = SignInWithIdpRequest {
            post_body: &post_body,
            request_uri: &request_uri,
            return_secure_token: true,
            return_idp_credential: true,
        };
        let response: SignInResponse = self.call("signInWithIdp", &body).await?;
        Ok(self.signed_in(response))
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.id_token.lock().unwrap_or_else(PoisonError::into_inner).take();
        self.hub.publish(None);
        Ok(())
    }

    fn subscribe(&self) -> UserChanges {
        self.hub.subscribe()
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendVerificationCodeRequest<'a> {
    phone_number: &'a str,
    recaptcha_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendVerificationCodeResponse {
    session_info: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithPhoneNumberRequest<'a> {
    session_info: &'a str,
    code: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithIdpRequest<'a> {
    post_body: &'a str,
    request_uri: &'a str,
    return_secure_token: bool,
    return_idp_credential: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    id_token: Option<String>,
    phone_number: Option<String>,
    email: Option<String>,
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// =============================================================================
// PARSING
// =============================================================================

fn split_sign_in(response: SignInResponse) -> (Identity, Option<String>) {
    let identity = Identity {
        uid: response.local_id,
        display_name: response.display_name.filter(|v| !v.is_empty()),
        email: response.email.filter(|v| !v.is_empty()),
        phone_number: response.phone_number.filter(|v| !v.is_empty()),
    };
    (identity, response.id_token)
}

fn transport_error(err: &reqwest::Error) -> ProviderError {
    let code = if err.is_timeout() { "auth/timeout" } else { "auth/network-request-failed" };
    ProviderError::new(code, err.to_string())
}

/// Map an Identity Toolkit error body (`{"error":{"message":"CODE : detail"}}`)
/// to an `auth/*` provider error.
fn parse_error_body(status: u16, body: &str) -> ProviderError {
    let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) else {
        return ProviderError::new("auth/internal-error", format!("status {status}: {body}"));
    };

    let message = envelope.error.message;
    let (key, detail) = match message.split_once(" : ") {
        Some((key, detail)) => (key.trim().to_owned(), detail.trim().to_owned()),
        None => (message.trim().to_owned(), message.trim().to_owned()),
    };
    ProviderError::new(rest_error_code(&key), detail)
}

fn rest_error_code(key: &str) -> String {
    let mapped = match key {
        "INVALID_PHONE_NUMBER" => "auth/invalid-phone-number",
        "MISSING_PHONE_NUMBER" => "auth/missing-phone-number",
        "CAPTCHA_CHECK_FAILED" => "auth/captcha-check-failed",
        "INVALID_RECAPTCHA_TOKEN" => "auth/invalid-app-credential",
        "MISSING_RECAPTCHA_TOKEN" => "auth/missing-app-credential",
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "auth/too-many-requests",
        "QUOTA_EXCEEDED" => "auth/quota-exceeded",
        "INVALID_CODE" => "auth/invalid-verification-code",
        "MISSING_CODE" => "auth/missing-verification-code",
        "SESSION_EXPIRED" => "auth/code-expired",
        "INVALID_SESSION_INFO" => "auth/invalid-verification-id",
        "MISSING_SESSION_INFO" => "auth/missing-verification-id",
        "UNAUTHORIZED_DOMAIN" => "auth/unauthorized-domain",
        "INVALID_IDP_RESPONSE" => "auth/invalid-credential",
        _ if key.starts_with("API key not valid") => "auth/invalid-api-key",
        other => return format!("auth/{}", other.to_ascii_lowercase().replace('_', "-")),
    };
    mapped.to_owned()
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
