//! Bot-check challenge lifecycle.
//!
//! DESIGN
//! ======
//! A challenge widget is rendered into a named container by a
//! [`ChallengeRenderer`] (the widget SDK seam). [`ChallengeManager`] keeps at
//! most one live widget: every `acquire` disposes the previous widget and
//! clears the target container before rendering a fresh one, and a failed
//! render leaves nothing behind.
//!
//! The SDK's `solved` / `expired` / `error` callbacks are folded into a single
//! [`ChallengeEvent`] returned from [`ChallengeRenderer::solve`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::error::AuthError;

/// Renderer-scoped widget handle.
pub type WidgetId = u64;

/// Proof token produced by a solved challenge.
#[derive(Clone, PartialEq, Eq)]
pub struct ChallengeToken(String);

impl ChallengeToken {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ChallengeToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ChallengeToken(..)")
    }
}

/// Terminal outcome of a rendered widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeEvent {
    Solved(ChallengeToken),
    Expired,
    Error(String),
}

/// Widget SDK seam. Implementations own the actual container (a DOM node, a
/// terminal region, a test recorder).
#[async_trait::async_trait]
pub trait ChallengeRenderer: Send + Sync {
    /// Remove whatever is currently shown in `container`.
    fn clear_container(&self, container: &str);

    /// Create widget `widget` inside `container` and make it interactive.
    async fn render(&self, container: &str, widget: WidgetId) -> Result<(), String>;

    /// Wait for the user (or the invisible check) to finish the widget.
    async fn solve(&self, widget: WidgetId) -> ChallengeEvent;

    /// Tear the widget down. Must tolerate already-disposed ids.
    fn dispose(&self, widget: WidgetId);
}

/// Handle to the live widget returned by [`ChallengeManager::acquire`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeInstance {
    widget: WidgetId,
    container: String,
}

impl ChallengeInstance {
    #[must_use]
    pub fn widget(&self) -> WidgetId {
        self.widget
    }

    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }
}

/// Owns the single live challenge widget for one auth session.
pub struct ChallengeManager {
    renderer: Arc<dyn ChallengeRenderer>,
    current: Mutex<Option<ChallengeInstance>>,
    /// Serializes `acquire` so two renders never overlap.
    acquire_gate: tokio::sync::Mutex<()>,
    next_widget: AtomicU64,
}

impl ChallengeManager {
    #[must_use]
    pub fn new(renderer: Arc<dyn ChallengeRenderer>) -> Self {
        Self {
            renderer,
            current: Mutex::new(None),
            acquire_gate: tokio::sync::Mutex::new(()),
            next_widget: AtomicU64::new(0),
        }
    }

    /// Replace any live widget with a freshly rendered one in `container`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ChallengeInitError`] if rendering fails; no widget
    /// is live afterwards.
    pub async fn acquire(&self, container: &str) -> Result<ChallengeInstance, AuthError> {
        let _gate = self.acquire_gate.lock().await;

        self.release();
        self.renderer.clear_container(container);

        let widget = self.next_widget.fetch_add(1, Ordering::Relaxed) + 1;
        if let Err(reason) = self.renderer.render(container, widget).await {
            warn!(widget, container, %reason, "challenge render failed");
            self.renderer.dispose(widget);
            self.renderer.clear_container(container);
            return Err(AuthError::ChallengeInitError(reason));
        }

        let instance = ChallengeInstance { widget, container: container.to_owned() };
        *self.slot() = Some(instance.clone());
        debug!(widget, container, "challenge rendered");
        Ok(instance)
    }

    /// Dispose the live widget, if any, and clear its container.
    pub fn release(&self) {
        let prior = self.slot().take();
        if let Some(instance) = prior {
            self.renderer.dispose(instance.widget);
            self.renderer.clear_container(&instance.container);
            debug!(widget = instance.widget, container = %instance.container, "challenge released");
        }
    }

    /// Wait for `instance` to be solved and return its proof token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ChallengeFailed`] if the widget expired, errored,
    /// or is no longer the live one.
    pub async fn verify(&self, instance: &ChallengeInstance) -> Result<ChallengeToken, AuthError> {
        if !self.is_live(instance) {
            return Err(AuthError::ChallengeFailed);
        }

        match self.renderer.solve(instance.widget).await {
            ChallengeEvent::Solved(token) => Ok(token),
            ChallengeEvent::Expired => {
                warn!(widget = instance.widget, "challenge expired");
                Err(AuthError::ChallengeFailed)
            }
            ChallengeEvent::Error(reason) => {
                warn!(widget = instance.widget, %reason, "challenge errored");
                Err(AuthError::ChallengeFailed)
            }
        }
    }

    /// The live widget, if any.
    #[must_use]
    pub fn current(&self) -> Option<ChallengeInstance> {
        self.slot().clone()
    }

    #[must_use]
    pub fn is_live(&self, instance: &ChallengeInstance) -> bool {
        self.slot().as_ref() == Some(instance)
    }

    fn slot(&self) -> MutexGuard<'_, Option<ChallengeInstance>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "challenge_test.rs"]
mod tests;
