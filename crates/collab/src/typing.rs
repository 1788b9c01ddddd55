//! Typing presence with idle timeout
//!
//! Broadcasts `typing:start` when a collaborator begins typing and
//! `typing:stop` either on explicit stop or after a configurable idle
//! period without keystrokes. Repeated keystrokes extend the idle window
//! instead of re-broadcasting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ot_engine::CollaboratorId;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::transport::{ChannelEvent, ChannelId, DocumentId, Transport, WireEnvelope};

/// Default idle period after the last keystroke before `typing:stop` is
/// broadcast automatically (in milliseconds).
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 3000;

/// Identity shown to other collaborators in presence events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratorProfile {
    /// Stable collaborator identity, matches operation origins.
    pub id: CollaboratorId,
    /// Display name.
    pub name: String,
    /// Optional avatar URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl CollaboratorProfile {
    pub fn new(id: CollaboratorId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            avatar: None,
        }
    }

    /// Attach an avatar URL.
    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }
}

/// Typing indicator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingConfig {
    /// Idle period after the last keystroke before auto-stop (in milliseconds)
    pub idle_timeout_ms: u64,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
        }
    }
}

impl TypingConfig {
    /// Create a config with a custom idle timeout
    pub fn with_idle_timeout(mut self, ms: u64) -> Self {
        self.idle_timeout_ms = ms;
        self
    }
}

/// State shared between the indicator and its idle timer task.
struct TypingShared {
    transport: Arc<dyn Transport>,
    channel: ChannelId,
    profile: CollaboratorProfile,
    typing: AtomicBool,
}

impl TypingShared {
    fn broadcast(&self, event: ChannelEvent) {
        let name = event.event_name();
        let payload = match WireEnvelope::new(event).encode() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Failed to encode {} event: {}", name, e);
                return;
            }
        };
        if let Err(e) = self.transport.publish(&self.channel, payload) {
            tracing::warn!("Failed to publish {} event: {}", name, e);
        }
    }

    /// Flip typing off and broadcast `typing:stop`. The swap makes this a
    /// no-op when a stop was already sent.
    fn broadcast_stop_if_typing(&self) {
        if self.typing.swap(false, Ordering::SeqCst) {
            self.broadcast(ChannelEvent::TypingStop {
                collaborator: self.profile.id.clone(),
            });
        }
    }
}

/// Broadcasts typing presence for one collaborator on one document.
///
/// Must be driven from within a Tokio runtime: each keystroke arms a timer
/// task that fires `typing:stop` after the configured idle period.
pub struct TypingIndicator {
    shared: Arc<TypingShared>,
    config: TypingConfig,
    timer: Option<JoinHandle<()>>,
}

impl TypingIndicator {
    pub fn new(
        profile: CollaboratorProfile,
        transport: Arc<dyn Transport>,
        document: &DocumentId,
    ) -> Self {
        Self::with_config(profile, transport, document, TypingConfig::default())
    }

    pub fn with_config(
        profile: CollaboratorProfile,
        transport: Arc<dyn Transport>,
        document: &DocumentId,
        config: TypingConfig,
    ) -> Self {
        Self {
            shared: Arc::new(TypingShared {
                transport,
                channel: ChannelId::document(document),
                profile,
                typing: AtomicBool::new(false),
            }),
            config,
            timer: None,
        }
    }

    /// The profile broadcast in `typing:start` events.
    pub fn profile(&self) -> &CollaboratorProfile {
        &self.shared.profile
    }

    /// Record a keystroke. Broadcasts `typing:start` on the idle-to-typing
    /// transition and (re)arms the idle timer either way.
    pub fn start_typing(&mut self) {
        if !self.shared.typing.swap(true, Ordering::SeqCst) {
            self.shared.broadcast(ChannelEvent::TypingStart(self.shared.profile.clone()));
        }
        self.arm_timer();
    }

    /// Stop immediately: cancels the idle timer and broadcasts
    /// `typing:stop` if a start was outstanding.
    pub fn stop_typing(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.shared.broadcast_stop_if_typing();
    }

    /// Whether this collaborator currently counts as typing.
    pub fn is_typing(&self) -> bool {
        self.shared.typing.load(Ordering::SeqCst)
    }

    /// Tear down the indicator, sending a final `typing:stop` if needed.
    /// Safe to call more than once.
    pub fn destroy(&mut self) {
        self.stop_typing();
    }

    fn arm_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        let shared = self.shared.clone();
        let idle = Duration::from_millis(self.config.idle_timeout_ms);
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(idle).await;
            shared.broadcast_stop_if_typing();
        }));
    }
}

impl Drop for TypingIndicator {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
