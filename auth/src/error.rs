//! Closed error taxonomy surfaced to front-ends.
//!
//! DESIGN
//! ======
//! Providers report failures as opaque string codes (`auth/too-many-requests`
//! and friends). Those codes are translated here, once, per operation, so no
//! provider-specific code ever escapes `AuthSession`.

use crate::identity::ProviderError;

/// Errors produced by `AuthSession` operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid phone number")]
    InvalidPhoneNumber,
    #[error("invalid verification code")]
    InvalidCode,
    #[error("bot-check challenge failed to initialize: {0}")]
    ChallengeInitError(String),
    #[error("bot-check challenge failed")]
    ChallengeFailed,
    #[error("too many requests")]
    RateLimited,
    #[error("sms quota exceeded")]
    QuotaExceeded,
    #[error("a verification is already in progress")]
    VerificationInProgress,
    /// The pending verification was already consumed or cancelled.
    #[error("verification is no longer pending")]
    VerificationClosed,
    #[error("sign-in cancelled by user")]
    UserCancelled,
    #[error("sign-in popup blocked")]
    PopupBlocked,
    #[error("network error")]
    NetworkError,
    #[error("origin not authorized for sign-in")]
    UnauthorizedOrigin,
    /// The user-change stream did not settle within the allowed window.
    #[error("timed out waiting for sign-in state")]
    AuthTimeout,
    #[error("auth error: {0}")]
    Unknown(String),
}

impl AuthError {
    /// Stable machine-readable code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidPhoneNumber => "E_INVALID_PHONE_NUMBER",
            Self::InvalidCode => "E_INVALID_CODE",
            Self::ChallengeInitError(_) => "E_CHALLENGE_INIT",
            Self::ChallengeFailed => "E_CHALLENGE_FAILED",
            Self::RateLimited => "E_RATE_LIMITED",
            Self::QuotaExceeded => "E_QUOTA_EXCEEDED",
            Self::VerificationInProgress => "E_VERIFICATION_IN_PROGRESS",
            Self::VerificationClosed => "E_VERIFICATION_CLOSED",
            Self::UserCancelled => "E_USER_CANCELLED",
            Self::PopupBlocked => "E_POPUP_BLOCKED",
            Self::NetworkError => "E_NETWORK",
            Self::UnauthorizedOrigin => "E_UNAUTHORIZED_ORIGIN",
            Self::AuthTimeout => "E_AUTH_TIMEOUT",
            Self::Unknown(_) => "E_UNKNOWN",
        }
    }

    /// Message shown next to the form that triggered the failure.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidPhoneNumber => "Invalid phone number format. Please check your number.",
            Self::InvalidCode => "Invalid OTP. Please try again.",
            Self::ChallengeInitError(_) => "reCAPTCHA failed to load. Please refresh and try again.",
            Self::ChallengeFailed => "reCAPTCHA verification failed. Please refresh and try again.",
            Self::RateLimited => "Too many requests. Please try again later.",
            Self::QuotaExceeded => "SMS quota exceeded. Please try again later.",
            Self::VerificationInProgress => "A code was already sent. Enter it or start over.",
            Self::VerificationClosed => "This code request has expired. Please request a new code.",
            Self::UserCancelled => "Sign-in was cancelled.",
            Self::PopupBlocked => "The sign-in popup was blocked. Allow popups and try again.",
            Self::NetworkError => "Network error. Check your connection and try again.",
            Self::UnauthorizedOrigin => "This site is not authorized for sign-in.",
            Self::AuthTimeout => "Sign-in is taking too long. Please try again.",
            Self::Unknown(_) => "Failed to sign in. Please try again.",
        }
    }

    /// Whether repeating the same operation may succeed without user changes.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::ChallengeInitError(_) | Self::ChallengeFailed | Self::NetworkError | Self::AuthTimeout)
    }

    /// Classify a failed passcode issuance.
    #[must_use]
    pub fn from_issue_failure(err: &ProviderError) -> Self {
        match err.code.as_str() {
            "auth/invalid-phone-number" | "auth/missing-phone-number" => Self::InvalidPhoneNumber,
            "auth/captcha-check-failed" | "auth/invalid-app-credential" | "auth/missing-app-credential" => {
                Self::ChallengeFailed
            }
            "auth/too-many-requests" => Self::RateLimited,
            "auth/quota-exceeded" => Self::QuotaExceeded,
            _ => Self::from_common(err),
        }
    }

    /// Classify a failed passcode confirmation. Any rejection of the code or
    /// of its verification session reads as an invalid code.
    #[must_use]
    pub fn from_confirm_failure(err: &ProviderError) -> Self {
        match err.code.as_str() {
            "auth/invalid-verification-code"
            | "auth/missing-verification-code"
            | "auth/code-expired"
            | "auth/invalid-verification-id"
            | "auth/missing-verification-id"
            | "auth/session-expired" => Self::InvalidCode,
            "auth/too-many-requests" => Self::RateLimited,
            _ => Self::from_common(err),
        }
    }

    /// Classify a failed federated sign-in.
    #[must_use]
    pub fn from_federated_failure(err: &ProviderError) -> Self {
        match err.code.as_str() {
            "auth/popup-closed-by-user" | "auth/cancelled-popup-request" | "auth/user-cancelled" => Self::UserCancelled,
            "auth/popup-blocked" => Self::PopupBlocked,
            "auth/operation-not-supported-in-this-environment" => Self::UnauthorizedOrigin,
            _ => Self::from_common(err),
        }
    }

    /// Classify a failed sign-out.
    #[must_use]
    pub fn from_sign_out_failure(err: &ProviderError) -> Self {
        Self::from_common(err)
    }

    fn from_common(err: &ProviderError) -> Self {
        match err.code.as_str() {
            "auth/network-request-failed" | "auth/timeout" => Self::NetworkError,
            "auth/unauthorized-domain" => Self::UnauthorizedOrigin,
            _ => Self::Unknown(err.message.clone()),
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
