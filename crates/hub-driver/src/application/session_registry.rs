//! Per-socket setup session state.
//!
//! The [`SessionRegistry`] is the single source of truth for "where is this
//! socket in the setup conversation".  It holds four independent maps keyed
//! by socket id:
//!
//! | Map                   | Value                 | Written by                      |
//! |-----------------------|-----------------------|---------------------------------|
//! | `steps`               | [`SetupStep`]         | entry point, dispatcher         |
//! | `reconfigure_targets` | entity id             | reconfiguration action handler  |
//! | `repeat_handles`      | `CancellationToken`   | repeat-command senders          |
//! | `subscriptions`       | subscribed-events flag| request router                  |
//!
//! # Concurrency
//!
//! Each map is a `DashMap`, so every get / set / remove / conditional update
//! on a single key is atomic and never blocks other keys for long.  There is
//! no transaction spanning maps: the step and the reconfigure target of one
//! socket are updated separately.  That is sound because the transport hands
//! a given socket's requests to the core one at a time, so only one task
//! ever writes a given socket id's entries.
//!
//! The registry is an ordinary value, not a global.  The host creates one and
//! shares it behind an `Arc`; tests create as many isolated ones as they like.

use dashmap::DashMap;
use hub_core::SetupStep;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub struct SessionRegistry {
    steps: DashMap<String, SetupStep>,
    reconfigure_targets: DashMap<String, String>,
    repeat_handles: DashMap<String, CancellationToken>,
    subscriptions: DashMap<String, bool>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Setup step ────────────────────────────────────────────────────────────

    pub fn step(&self, socket_id: &str) -> Option<SetupStep> {
        self.steps.get(socket_id).map(|entry| *entry)
    }

    pub fn set_step(&self, socket_id: &str, step: SetupStep) {
        self.steps.insert(socket_id.to_string(), step);
    }

    /// Removes the step entry, returning the step that was registered.
    pub fn clear_step(&self, socket_id: &str) -> Option<SetupStep> {
        self.steps.remove(socket_id).map(|(_, step)| step)
    }

    /// Replaces the step only if the current one equals `expected`.
    ///
    /// Returns `true` when the replacement happened.  The check and the write
    /// happen under the same shard lock.
    pub fn compare_and_set_step(
        &self,
        socket_id: &str,
        expected: SetupStep,
        new: SetupStep,
    ) -> bool {
        match self.steps.get_mut(socket_id) {
            Some(mut current) if *current == expected => {
                *current = new;
                true
            }
            _ => false,
        }
    }

    // ── Reconfiguration target ────────────────────────────────────────────────

    pub fn reconfigure_target(&self, socket_id: &str) -> Option<String> {
        self.reconfigure_targets
            .get(socket_id)
            .map(|entry| entry.value().clone())
    }

    pub fn set_reconfigure_target(&self, socket_id: &str, entity_id: &str) {
        self.reconfigure_targets
            .insert(socket_id.to_string(), entity_id.to_string());
    }

    /// Idempotent: clearing an absent target is a no-op.
    pub fn clear_reconfigure_target(&self, socket_id: &str) -> Option<String> {
        self.reconfigure_targets
            .remove(socket_id)
            .map(|(_, target)| target)
    }

    // ── Repeat-command cancellation ───────────────────────────────────────────

    /// Registers a fresh cancellation handle for a repeating command.
    ///
    /// Any handle already registered for the socket is cancelled first, so at
    /// most one repeat loop per socket is ever live.
    pub fn start_repeat(&self, socket_id: &str) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some(previous) = self
            .repeat_handles
            .insert(socket_id.to_string(), token.clone())
        {
            previous.cancel();
        }
        token
    }

    /// Cancels and forgets the socket's repeat handle.  Returns `true` if one
    /// was registered.
    pub fn cancel_repeat(&self, socket_id: &str) -> bool {
        match self.repeat_handles.remove(socket_id) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn has_repeat(&self, socket_id: &str) -> bool {
        self.repeat_handles.contains_key(socket_id)
    }

    // ── Event subscription ────────────────────────────────────────────────────

    pub fn set_subscribed(&self, socket_id: &str, subscribed: bool) {
        self.subscriptions.insert(socket_id.to_string(), subscribed);
    }

    pub fn is_subscribed(&self, socket_id: &str) -> bool {
        self.subscriptions
            .get(socket_id)
            .map(|entry| *entry)
            .unwrap_or(false)
    }

    /// Socket ids that currently want entity events.
    pub fn subscribed_sockets(&self) -> Vec<String> {
        self.subscriptions
            .iter()
            .filter(|entry| *entry.value())
            .map(|entry| entry.key().clone())
            .collect()
    }

    // ── Whole session ─────────────────────────────────────────────────────────

    /// Drops every entry for a disconnected socket and cancels its repeat
    /// handle.
    pub fn remove_session(&self, socket_id: &str) {
        self.steps.remove(socket_id);
        self.reconfigure_targets.remove(socket_id);
        self.subscriptions.remove(socket_id);
        self.cancel_repeat(socket_id);
    }

    /// `true` when no socket has any entry in any map.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
            && self.reconfigure_targets.is_empty()
            && self.repeat_handles.is_empty()
            && self.subscriptions.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
