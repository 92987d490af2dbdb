//! One-shot commands. Each builds a fresh gate over the stored records, runs one operation and
//! exits, so the gate always starts unlocked here.

use anyhow::{bail, Result};
use clap::Parser;

use crate::{
    gate::{config::SecurityConfigPatch, SecurityGate},
    storage::KeyValueStore,
    utils::clock::DefaultClock,
};

use super::output::{print_done, print_outcome, print_status};

#[derive(Debug, Clone, Copy, Parser)]
pub struct ConfigArgs {
    #[arg(
        long,
        allow_negative_numbers = true,
        help = "Idle time before the app locks itself. 0 disables auto-lock"
    )]
    auto_lock_delay_ms: Option<i64>,
    #[arg(long, help = "Ask for the PIN every time the app comes back to the foreground")]
    require_pin_on_resume: Option<bool>,
    #[arg(long, help = "Hide content while the app sits in the task switcher")]
    hide_content_in_multitask: Option<bool>,
    #[arg(long, help = "Digits in a PIN. Can only change while no PIN is set")]
    pin_length: Option<i64>,
}

impl From<ConfigArgs> for SecurityConfigPatch {
    fn from(value: ConfigArgs) -> Self {
        SecurityConfigPatch {
            auto_lock_delay_ms: value.auto_lock_delay_ms,
            require_pin_on_resume: value.require_pin_on_resume,
            hide_content_in_multitask: value.hide_content_in_multitask,
            pin_length: value.pin_length,
        }
    }
}

fn open_gate<S: KeyValueStore>(store: S) -> SecurityGate<S> {
    SecurityGate::initialize(store, Box::new(DefaultClock))
}

pub fn status(store: impl KeyValueStore, json: bool) -> Result<()> {
    let status = open_gate(store).status();
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_status(&status);
    }
    Ok(())
}

pub fn setup(store: impl KeyValueStore, pin: &str) -> Result<()> {
    let mut gate = open_gate(store);
    if gate.is_pin_configured() {
        bail!("A PIN is already set. Use `change` or `disable` first");
    }
    let length = gate.config().pin_length;
    let success = gate.setup_pin(pin);
    print_outcome(
        success,
        "PIN set",
        &format!("PIN must be exactly {length} digits"),
    );
    Ok(())
}

pub fn verify(store: impl KeyValueStore, pin: &str) -> Result<()> {
    let gate = open_gate(store);
    print_outcome(gate.verify_pin(pin), "PIN is correct", "PIN is wrong");
    Ok(())
}

pub fn change(store: impl KeyValueStore, current: &str, next: &str) -> Result<()> {
    let mut gate = open_gate(store);
    print_outcome(
        gate.change_pin(current, next),
        "PIN changed",
        "Current PIN is wrong or the new one is malformed",
    );
    Ok(())
}

pub fn disable(store: impl KeyValueStore, current: &str) -> Result<()> {
    let mut gate = open_gate(store);
    print_outcome(gate.disable_pin(current), "PIN removed", "Current PIN is wrong");
    Ok(())
}

pub fn reset(store: impl KeyValueStore) -> Result<()> {
    open_gate(store).reset_pin();
    print_done("PIN removed");
    Ok(())
}

pub fn emergency_reset(store: impl KeyValueStore) -> Result<()> {
    open_gate(store).emergency_reset();
    print_done("PIN removed and lock policy restored to defaults");
    Ok(())
}

pub fn update_config(store: impl KeyValueStore, args: ConfigArgs) -> Result<()> {
    let patch = SecurityConfigPatch::from(args);
    if patch.is_empty() {
        bail!("Nothing to update, pass at least one option");
    }
    let mut gate = open_gate(store);
    gate.update_config(&patch);
    print_status(&gate.status());
    Ok(())
}
