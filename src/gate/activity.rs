use std::{fmt::Display, str::FromStr, time::Duration};

use anyhow::anyhow;
use tokio::time::Instant;

/// Low level interaction signals that count as user activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    PointerDown,
    PointerMove,
    KeyPress,
    Scroll,
    TouchStart,
    Click,
}

impl InteractionKind {
    pub const ALL: [InteractionKind; 6] = [
        Self::PointerDown,
        Self::PointerMove,
        Self::KeyPress,
        Self::Scroll,
        Self::TouchStart,
        Self::Click,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::PointerDown => "mousedown",
            Self::PointerMove => "mousemove",
            Self::KeyPress => "keypress",
            Self::Scroll => "scroll",
            Self::TouchStart => "touchstart",
            Self::Click => "click",
        }
    }
}

impl Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InteractionKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| anyhow!("Unknown interaction {s}"))
    }
}

/// Last-activity timestamp. Only ever lives in memory.
#[derive(Debug, Clone, Copy)]
pub struct ActivityClock {
    last_activity: Instant,
}

impl ActivityClock {
    pub fn new(now: Instant) -> Self {
        Self { last_activity: now }
    }

    /// Called for every interaction, so it must stay O(1) with no IO.
    pub fn touch(&mut self, now: Instant) {
        self.last_activity = now;
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    /// Idle time strictly exceeds `delay`.
    pub fn has_exceeded(&self, now: Instant, delay: Duration) -> bool {
        self.idle_for(now) > delay
    }

    /// Time left until `delay` elapses, zero once it has.
    pub fn remaining(&self, now: Instant, delay: Duration) -> Duration {
        delay.saturating_sub(self.idle_for(now))
    }
}
