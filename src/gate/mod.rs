//! The application lock. [SecurityGate] owns the PIN, the lock state, the activity clock and the
//! lock policy for one application session.
//!
//! Everything here is synchronous and never blocks. Storage goes through
//! [SecurityStore](crate::storage::adapter::SecurityStore), time through [Clock], so the gate can
//! be exercised without a real profile directory or real time passing.

pub mod activity;
pub mod config;
pub mod pin;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::{
    storage::{adapter::SecurityStore, KeyValueStore},
    utils::{clock::Clock, time::ceil_seconds},
};

use activity::{ActivityClock, InteractionKind};
use config::{SecurityConfig, SecurityConfigPatch};
use pin::PinCredential;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockReason {
    /// Explicit `lock_app` call.
    Manual,
    /// No activity for longer than the auto-lock delay.
    Idle,
    /// The view became visible again with `require_pin_on_resume` set.
    Resume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    Locked {
        reason: LockReason,
        since: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Point in time snapshot of the gate, for UI code and the `status` command.
#[derive(Debug, Clone, Serialize)]
pub struct GateStatus {
    pub locked: bool,
    pub lock_reason: Option<LockReason>,
    pub locked_at: Option<DateTime<Utc>>,
    pub pin_configured: bool,
    pub failed_attempts: u32,
    pub seconds_until_lock: Option<u64>,
    pub visibility: Visibility,
    pub obscure_content: bool,
    pub config: SecurityConfig,
}

pub struct SecurityGate<S> {
    store: SecurityStore<S>,
    clock: Box<dyn Clock>,
    config: SecurityConfig,
    pin: Option<PinCredential>,
    state: LockState,
    activity: ActivityClock,
    visibility: Visibility,
    failed_attempts: u32,
}

impl<S: KeyValueStore> SecurityGate<S> {
    /// Loads the persisted PIN and config. The gate always starts unlocked, whether a PIN exists or
    /// not; it only locks in response to later events.
    pub fn initialize(store: S, clock: Box<dyn Clock>) -> Self {
        let store = SecurityStore::new(store);
        let config = store.load_config();
        let pin = store.load_pin();
        let activity = ActivityClock::new(clock.instant());

        info!(
            "Security gate initialized, PIN configured: {}, auto-lock delay {}ms",
            pin.is_some(),
            config.auto_lock_delay_ms
        );

        Self {
            store,
            clock,
            config,
            pin,
            state: LockState::Unlocked,
            activity,
            visibility: Visibility::Visible,
            failed_attempts: 0,
        }
    }

    /// Tears the gate down and hands the store back.
    pub fn dispose(self) -> S {
        debug!("Security gate disposed");
        self.store.into_inner()
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.state, LockState::Locked { .. })
    }

    pub fn is_pin_configured(&self) -> bool {
        self.pin.is_some()
    }

    pub fn config(&self) -> SecurityConfig {
        self.config
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    /// Stores the first PIN. Refuses to overwrite an existing one, that has to go through
    /// [SecurityGate::change_pin] or [SecurityGate::disable_pin] which check the current PIN.
    pub fn setup_pin(&mut self, pin: &str) -> bool {
        if self.pin.is_some() {
            warn!("Refusing to set up a PIN while one is already configured");
            return false;
        }
        let Some(pin) = PinCredential::new(pin, self.config.pin_length) else {
            debug!("Rejected PIN setup, expected {} digits", self.config.pin_length);
            return false;
        };

        self.store.save_pin(&pin);
        self.pin = Some(pin);
        info!("PIN configured");
        true
    }

    /// Compares `candidate` with the stored PIN without touching any state.
    pub fn verify_pin(&self, candidate: &str) -> bool {
        self.pin.as_ref().is_some_and(|pin| pin.matches(candidate))
    }

    pub fn unlock_app(&mut self, candidate: &str) -> bool {
        if !self.verify_pin(candidate) {
            self.failed_attempts = self.failed_attempts.saturating_add(1);
            warn!("Unlock attempt failed ({} in a row)", self.failed_attempts);
            return false;
        }

        self.state = LockState::Unlocked;
        self.failed_attempts = 0;
        self.activity.touch(self.clock.instant());
        info!("App unlocked");
        true
    }

    pub fn change_pin(&mut self, current: &str, next: &str) -> bool {
        if !self.verify_pin(current) {
            warn!("PIN change rejected, current PIN doesn't match");
            return false;
        }
        let Some(next) = PinCredential::new(next, self.config.pin_length) else {
            debug!("PIN change rejected, expected {} digits", self.config.pin_length);
            return false;
        };

        self.store.save_pin(&next);
        self.pin = Some(next);
        info!("PIN changed");
        true
    }

    pub fn disable_pin(&mut self, current: &str) -> bool {
        if !self.verify_pin(current) {
            warn!("Disabling PIN rejected, current PIN doesn't match");
            return false;
        }
        self.remove_pin();
        info!("PIN disabled");
        true
    }

    /// Locks the app if there is anything to protect. Locking a locked gate keeps the original
    /// reason and timestamp.
    pub fn lock_app(&mut self) {
        if self.pin.is_none() {
            debug!("Lock requested without a PIN, ignoring");
            return;
        }
        self.lock(LockReason::Manual);
    }

    /// "Forgot PIN" escape hatch. Always allowed.
    pub fn reset_pin(&mut self) {
        self.remove_pin();
        info!("PIN reset");
    }

    /// Clears the PIN and restores the default policy.
    pub fn emergency_reset(&mut self) {
        self.remove_pin();
        self.config = SecurityConfig::default();
        self.store.save_config(&self.config);
        warn!("Emergency reset performed, PIN cleared and security config restored to defaults");
    }

    /// Merges `patch` into the current config and persists it. Lock state isn't touched here, a new
    /// delay is picked up by the next [SecurityGate::check_idle].
    pub fn update_config(&mut self, patch: &SecurityConfigPatch) {
        let mut patch = *patch;
        if self.pin.is_some()
            && patch
                .pin_length
                .is_some_and(|v| v != self.config.pin_length as i64)
        {
            warn!("PIN length can't change while a PIN is configured, ignoring it");
            patch.pin_length = None;
        }

        self.config = self.config.merged(&patch);
        self.store.save_config(&self.config);
        debug!("Security config updated {:?}", self.config);
    }

    /// Whole seconds until auto-lock, `Some(0)` once the deadline has passed (or auto-lock is
    /// disabled) and `None` when there is no PIN.
    pub fn time_until_lock(&self) -> Option<u64> {
        self.pin.as_ref()?;
        let delay = std::time::Duration::from_millis(self.config.auto_lock_delay_ms);
        Some(ceil_seconds(
            self.activity.remaining(self.clock.instant(), delay),
        ))
    }

    /// Resets the idle clock. Fires at a high rate, so it does no IO.
    pub fn record_activity(&mut self, kind: InteractionKind) {
        trace!("Activity {kind}");
        self.activity.touch(self.clock.instant());
    }

    pub fn set_visibility(&mut self, visibility: Visibility) {
        let previous = std::mem::replace(&mut self.visibility, visibility);
        debug!("Visibility changed from {previous:?} to {visibility:?}");

        if previous == Visibility::Hidden
            && visibility == Visibility::Visible
            && self.config.require_pin_on_resume
            && self.pin.is_some()
        {
            self.lock(LockReason::Resume);
        }
    }

    /// The periodic idle check. Returns `true` if this call locked the gate.
    pub fn check_idle(&mut self) -> bool {
        if self.pin.is_none() || self.is_locked() {
            return false;
        }
        let Some(delay) = self.config.auto_lock_delay() else {
            return false;
        };
        if !self.activity.has_exceeded(self.clock.instant(), delay) {
            return false;
        }

        self.lock(LockReason::Idle);
        true
    }

    /// Whether UI should hide its content, e.g. while sitting in the task switcher or behind the
    /// lock screen.
    pub fn should_obscure_content(&self) -> bool {
        self.config.hide_content_in_multitask
            && self.pin.is_some()
            && (self.visibility == Visibility::Hidden || self.is_locked())
    }

    pub fn status(&self) -> GateStatus {
        let (lock_reason, locked_at) = match self.state {
            LockState::Unlocked => (None, None),
            LockState::Locked { reason, since } => (Some(reason), Some(since)),
        };

        GateStatus {
            locked: self.is_locked(),
            lock_reason,
            locked_at,
            pin_configured: self.is_pin_configured(),
            failed_attempts: self.failed_attempts,
            seconds_until_lock: self.time_until_lock(),
            visibility: self.visibility,
            obscure_content: self.should_obscure_content(),
            config: self.config,
        }
    }

    fn lock(&mut self, reason: LockReason) {
        if self.is_locked() {
            return;
        }
        self.state = LockState::Locked {
            reason,
            since: self.clock.time(),
        };
        info!("App locked ({reason:?})");
    }

    fn remove_pin(&mut self) {
        self.store.clear_pin();
        self.pin = None;
        self.state = LockState::Unlocked;
        self.failed_attempts = 0;
    }
}
