use tokio::sync::oneshot;

use crate::gate::{
    activity::InteractionKind, config::SecurityConfigPatch, GateStatus, Visibility,
};

/// Signals fired by the environment rather than by a user decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentSignal {
    Visibility(Visibility),
    Interaction(InteractionKind),
}

/// Operations requested by UI code. Requests that produce an answer carry the channel to send it
/// back on.
#[derive(Debug)]
pub enum GateRequest {
    Status(oneshot::Sender<GateStatus>),
    TimeUntilLock(oneshot::Sender<Option<u64>>),
    SetupPin {
        pin: String,
        reply: oneshot::Sender<bool>,
    },
    VerifyPin {
        pin: String,
        reply: oneshot::Sender<bool>,
    },
    Unlock {
        pin: String,
        reply: oneshot::Sender<bool>,
    },
    ChangePin {
        current: String,
        next: String,
        reply: oneshot::Sender<bool>,
    },
    DisablePin {
        current: String,
        reply: oneshot::Sender<bool>,
    },
    Lock,
    ResetPin,
    EmergencyReset,
    UpdateConfig(SecurityConfigPatch),
}

/// Everything the monitor consumes, in the order it was sent.
#[derive(Debug)]
pub enum GateEvent {
    Signal(EnvironmentSignal),
    Request(GateRequest),
}

impl From<EnvironmentSignal> for GateEvent {
    fn from(value: EnvironmentSignal) -> Self {
        Self::Signal(value)
    }
}

impl From<GateRequest> for GateEvent {
    fn from(value: GateRequest) -> Self {
        Self::Request(value)
    }
}
