//! Runs a [SecurityGate] for an application session.
//!
//! [start_session] builds the gate and splits it into a [GateHandle] for UI code and a
//! [GateMonitor] that must be driven on the same runtime, e.g. with `tokio::join!`. Cancelling the
//! session token (or [GateHandle::dispose]) stops the idle poll and releases every subscription.

pub mod events;
pub mod handle;
pub mod monitor;

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::{gate::SecurityGate, storage::KeyValueStore, utils::clock::Clock};

use handle::GateHandle;
use monitor::GateMonitor;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

const EVENT_BUFFER: usize = 64;

pub fn start_session<S: KeyValueStore>(
    store: S,
    clock: impl Clock + Clone,
    shutdown: &CancellationToken,
) -> (GateHandle, GateMonitor<S>) {
    let gate = SecurityGate::initialize(store, Box::new(clock.clone()));
    let (event_sender, event_receiver) = mpsc::channel(EVENT_BUFFER);
    let (state_sender, state_receiver) = watch::channel(gate.state());

    let handle = GateHandle::new(event_sender, state_receiver, shutdown.clone());
    let monitor = GateMonitor::new(
        gate,
        event_receiver,
        state_sender,
        shutdown.clone(),
        DEFAULT_POLL_INTERVAL,
        Box::new(clock),
    );
    (handle, monitor)
}

#[cfg(test)]
mod session_tests {
    use std::time::Duration;

    use anyhow::Result;
    use tokio_util::sync::CancellationToken;

    use crate::{
        gate::{
            activity::InteractionKind, config::SecurityConfigPatch, LockReason, LockState,
            Visibility,
        },
        storage::{memory_store::MemoryStore, KeyValueStore, PIN_KEY},
        utils::{clock::DefaultClock, logging::TEST_LOGGING},
    };

    use super::start_session;

    fn delay_ms(ms: i64) -> SecurityConfigPatch {
        SecurityConfigPatch::default().with_auto_lock_delay_ms(ms)
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_poll_locks_the_gate() -> Result<()> {
        *TEST_LOGGING;
        let shutdown = CancellationToken::new();
        let (handle, monitor) = start_session(MemoryStore::new(), DefaultClock, &shutdown);
        let mut state = handle.subscribe();

        let (gate, result) = tokio::join!(monitor.run(), async {
            assert!(handle.setup_pin("1234").await?);
            handle.update_config(delay_ms(1000)).await?;
            assert!(!handle.is_locked().await?);

            tokio::time::sleep(Duration::from_millis(2500)).await;
            assert!(handle.is_locked().await?);
            assert!(matches!(
                *state.borrow_and_update(),
                LockState::Locked {
                    reason: LockReason::Idle,
                    ..
                }
            ));
            assert_eq!(handle.time_until_lock().await?, Some(0));

            assert!(!handle.unlock_app("0000").await?);
            assert!(handle.unlock_app("1234").await?);
            assert_eq!(*state.borrow_and_update(), LockState::Unlocked);

            handle.dispose();
            anyhow::Ok(())
        });
        result?;

        assert!(!gate.is_locked());
        assert_eq!(gate.dispose().get(PIN_KEY)?.as_deref(), Some("1234"));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_keeps_the_gate_open() -> Result<()> {
        *TEST_LOGGING;
        let shutdown = CancellationToken::new();
        let (handle, monitor) = start_session(MemoryStore::new(), DefaultClock, &shutdown);

        let (_, result) = tokio::join!(monitor.run(), async {
            handle.update_config(delay_ms(1000)).await?;
            assert!(handle.setup_pin("1234").await?);

            for _ in 0..10 {
                tokio::time::sleep(Duration::from_millis(500)).await;
                handle.record_activity(InteractionKind::PointerMove).await?;
            }
            assert!(!handle.is_locked().await?);

            tokio::time::sleep(Duration::from_millis(2100)).await;
            assert!(handle.is_locked().await?);

            shutdown.cancel();
            anyhow::Ok(())
        });
        result
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_auto_lock_never_fires() -> Result<()> {
        let shutdown = CancellationToken::new();
        let (handle, monitor) = start_session(MemoryStore::new(), DefaultClock, &shutdown);

        let (_, result) = tokio::join!(monitor.run(), async {
            handle.update_config(delay_ms(0)).await?;
            assert!(handle.setup_pin("1234").await?);

            tokio::time::sleep(Duration::from_secs(60 * 60)).await;
            assert!(!handle.is_locked().await?);

            handle.dispose();
            anyhow::Ok(())
        });
        result
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_locks_immediately() -> Result<()> {
        let shutdown = CancellationToken::new();
        let (handle, monitor) = start_session(MemoryStore::new(), DefaultClock, &shutdown);

        let (_, result) = tokio::join!(monitor.run(), async {
            assert!(handle.setup_pin("1234").await?);

            handle.set_visibility(Visibility::Hidden).await?;
            let status = handle.status().await?;
            assert!(!status.locked);
            assert!(status.obscure_content);

            handle.set_visibility(Visibility::Visible).await?;
            let status = handle.status().await?;
            assert!(status.locked);
            assert_eq!(status.lock_reason, Some(LockReason::Resume));

            handle.dispose();
            anyhow::Ok(())
        });
        result
    }

    #[tokio::test(start_paused = true)]
    async fn test_pin_lifecycle_through_handle() -> Result<()> {
        let shutdown = CancellationToken::new();
        let (handle, monitor) = start_session(MemoryStore::new(), DefaultClock, &shutdown);

        let (gate, result) = tokio::join!(monitor.run(), async {
            assert!(handle.setup_pin("1234").await?);
            assert!(handle.verify_pin("1234").await?);
            assert!(!handle.change_pin("1111", "2222").await?);
            assert!(handle.change_pin("1234", "2222").await?);

            handle.lock_app().await?;
            handle.lock_app().await?;
            assert!(handle.is_locked().await?);

            assert!(!handle.disable_pin("1234").await?);
            assert!(handle.disable_pin("2222").await?);
            assert!(!handle.is_locked().await?);
            assert!(!handle.is_pin_configured().await?);

            assert!(handle.setup_pin("3333").await?);
            handle.update_config(delay_ms(5000)).await?;
            handle.lock_app().await?;
            handle.emergency_reset().await?;
            let status = handle.status().await?;
            assert!(!status.locked);
            assert!(!status.pin_configured);
            assert_eq!(status.config.auto_lock_delay_ms, 600_000);

            assert!(handle.setup_pin("4444").await?);
            handle.reset_pin().await?;
            assert_eq!(handle.time_until_lock().await?, None);

            handle.dispose();
            anyhow::Ok(())
        });
        result?;

        assert!(!gate.is_pin_configured());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_fails_after_dispose() -> Result<()> {
        let shutdown = CancellationToken::new();
        let (handle, monitor) = start_session(MemoryStore::new(), DefaultClock, &shutdown);

        handle.dispose();
        let gate = monitor.run().await;
        assert!(!gate.is_locked());

        assert!(handle.lock_app().await.is_err());
        assert!(handle.status().await.is_err());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handles_stops_the_monitor() {
        let shutdown = CancellationToken::new();
        let (handle, monitor) = start_session(MemoryStore::new(), DefaultClock, &shutdown);
        let second = handle.clone();

        drop(handle);
        drop(second);
        let gate = monitor.run().await;
        assert!(!gate.is_pin_configured());
        assert!(!shutdown.is_cancelled());
    }
}
