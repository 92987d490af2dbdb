use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn};

use crate::{
    gate::{LockState, SecurityGate},
    storage::KeyValueStore,
    utils::clock::Clock,
};

use super::events::{EnvironmentSignal, GateEvent, GateRequest};

/// Owns the gate for the lifetime of a session. Environment signals, UI requests and the periodic
/// idle check are all handled on this one task, one at a time, so the gate never needs a lock.
pub struct GateMonitor<S> {
    gate: SecurityGate<S>,
    events: mpsc::Receiver<GateEvent>,
    state: watch::Sender<LockState>,
    shutdown: CancellationToken,
    poll_interval: Duration,
    clock: Box<dyn Clock>,
}

impl<S: KeyValueStore> GateMonitor<S> {
    pub fn new(
        gate: SecurityGate<S>,
        events: mpsc::Receiver<GateEvent>,
        state: watch::Sender<LockState>,
        shutdown: CancellationToken,
        poll_interval: Duration,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            gate,
            events,
            state,
            shutdown,
            poll_interval,
            clock,
        }
    }

    /// Executes the monitor event loop until the session is cancelled or every handle is dropped.
    /// Hands the gate back afterwards; nothing keeps polling once this returns.
    pub async fn run(mut self) -> SecurityGate<S> {
        info!("Gate monitor started, polling every {:?}", self.poll_interval);
        let mut next_poll = self.clock.instant() + self.poll_interval;
        loop {
            tokio::select! {
                // Cancellation first, then the idle check so a busy queue can't starve it.
                biased;
                _ = self.shutdown.cancelled() => {
                    break;
                }
                _ = self.clock.sleep_until(next_poll) => {
                    if self.gate.check_idle() {
                        info!("Auto-locked after inactivity");
                    }
                    next_poll = self.clock.instant() + self.poll_interval;
                }
                event = self.events.recv() => {
                    let Some(event) = event else {
                        debug!("All gate handles dropped");
                        break;
                    };
                    self.handle_event(event);
                }
            }
            self.publish_state();
        }

        self.events.close();
        info!("Gate monitor stopped");
        self.gate
    }

    fn handle_event(&mut self, event: GateEvent) {
        match event {
            GateEvent::Signal(EnvironmentSignal::Interaction(kind)) => {
                self.gate.record_activity(kind);
            }
            GateEvent::Signal(EnvironmentSignal::Visibility(visibility)) => {
                self.gate.set_visibility(visibility);
            }
            GateEvent::Request(request) => {
                let _span = info_span!("Gate request").entered();
                self.handle_request(request);
            }
        }
    }

    fn handle_request(&mut self, request: GateRequest) {
        // A dropped reply receiver only means the caller stopped waiting.
        let delivered = match request {
            GateRequest::Status(reply) => reply.send(self.gate.status()).is_ok(),
            GateRequest::TimeUntilLock(reply) => reply.send(self.gate.time_until_lock()).is_ok(),
            GateRequest::SetupPin { pin, reply } => reply.send(self.gate.setup_pin(&pin)).is_ok(),
            GateRequest::VerifyPin { pin, reply } => {
                reply.send(self.gate.verify_pin(&pin)).is_ok()
            }
            GateRequest::Unlock { pin, reply } => reply.send(self.gate.unlock_app(&pin)).is_ok(),
            GateRequest::ChangePin {
                current,
                next,
                reply,
            } => reply.send(self.gate.change_pin(&current, &next)).is_ok(),
            GateRequest::DisablePin { current, reply } => {
                reply.send(self.gate.disable_pin(&current)).is_ok()
            }
            GateRequest::Lock => {
                self.gate.lock_app();
                true
            }
            GateRequest::ResetPin => {
                self.gate.reset_pin();
                true
            }
            GateRequest::EmergencyReset => {
                self.gate.emergency_reset();
                true
            }
            GateRequest::UpdateConfig(patch) => {
                self.gate.update_config(&patch);
                true
            }
        };
        if !delivered {
            warn!("Gate request finished but nobody was waiting for the answer");
        }
    }

    fn publish_state(&self) {
        let current = self.gate.state();
        self.state.send_if_modified(|published| {
            if *published == current {
                false
            } else {
                *published = current;
                true
            }
        });
    }
}
