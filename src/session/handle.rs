use anyhow::{anyhow, Result};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::gate::{
    activity::InteractionKind, config::SecurityConfigPatch, GateStatus, LockState, Visibility,
};

use super::events::{EnvironmentSignal, GateEvent, GateRequest};

/// Cloneable front-end to a running [GateMonitor](super::monitor::GateMonitor). Every call is
/// queued behind the ones sent before it. Errors only mean the monitor is gone.
#[derive(Clone)]
pub struct GateHandle {
    events: mpsc::Sender<GateEvent>,
    state: watch::Receiver<LockState>,
    shutdown: CancellationToken,
}

impl GateHandle {
    pub fn new(
        events: mpsc::Sender<GateEvent>,
        state: watch::Receiver<LockState>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            events,
            state,
            shutdown,
        }
    }

    async fn send(&self, event: impl Into<GateEvent>) -> Result<()> {
        self.events
            .send(event.into())
            .await
            .map_err(|_| anyhow!("Gate monitor is no longer running"))
    }

    async fn ask<T>(&self, request: impl FnOnce(oneshot::Sender<T>) -> GateRequest) -> Result<T> {
        let (sender, receiver) = oneshot::channel();
        self.send(request(sender)).await?;
        receiver
            .await
            .map_err(|_| anyhow!("Gate monitor stopped before answering"))
    }

    pub async fn status(&self) -> Result<GateStatus> {
        self.ask(GateRequest::Status).await
    }

    pub async fn is_locked(&self) -> Result<bool> {
        Ok(self.status().await?.locked)
    }

    pub async fn is_pin_configured(&self) -> Result<bool> {
        Ok(self.status().await?.pin_configured)
    }

    pub async fn time_until_lock(&self) -> Result<Option<u64>> {
        self.ask(GateRequest::TimeUntilLock).await
    }

    pub async fn setup_pin(&self, pin: &str) -> Result<bool> {
        let pin = pin.to_owned();
        self.ask(|reply| GateRequest::SetupPin { pin, reply }).await
    }

    pub async fn verify_pin(&self, pin: &str) -> Result<bool> {
        let pin = pin.to_owned();
        self.ask(|reply| GateRequest::VerifyPin { pin, reply }).await
    }

    pub async fn unlock_app(&self, pin: &str) -> Result<bool> {
        let pin = pin.to_owned();
        self.ask(|reply| GateRequest::Unlock { pin, reply }).await
    }

    pub async fn change_pin(&self, current: &str, next: &str) -> Result<bool> {
        let current = current.to_owned();
        let next = next.to_owned();
        self.ask(|reply| GateRequest::ChangePin {
            current,
            next,
            reply,
        })
        .await
    }

    pub async fn disable_pin(&self, current: &str) -> Result<bool> {
        let current = current.to_owned();
        self.ask(|reply| GateRequest::DisablePin { current, reply })
            .await
    }

    pub async fn lock_app(&self) -> Result<()> {
        self.send(GateRequest::Lock).await
    }

    pub async fn reset_pin(&self) -> Result<()> {
        self.send(GateRequest::ResetPin).await
    }

    pub async fn emergency_reset(&self) -> Result<()> {
        self.send(GateRequest::EmergencyReset).await
    }

    pub async fn update_config(&self, patch: SecurityConfigPatch) -> Result<()> {
        self.send(GateRequest::UpdateConfig(patch)).await
    }

    pub async fn record_activity(&self, kind: InteractionKind) -> Result<()> {
        self.send(EnvironmentSignal::Interaction(kind)).await
    }

    pub async fn set_visibility(&self, visibility: Visibility) -> Result<()> {
        self.send(EnvironmentSignal::Visibility(visibility)).await
    }

    /// Lock state as last published by the monitor. Changes whenever the gate locks or unlocks,
    /// including auto-locks nobody asked for.
    pub fn subscribe(&self) -> watch::Receiver<LockState> {
        self.state.clone()
    }

    /// Stops the monitor. Pending events are dropped.
    pub fn dispose(&self) {
        self.shutdown.cancel();
    }
}
