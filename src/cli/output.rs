use std::time::Duration;

use ansi_term::Colour;

use crate::{
    gate::{GateStatus, LockReason, LockState},
    utils::time::format_duration,
};

pub fn describe_lock(state: &LockState) -> String {
    match state {
        LockState::Unlocked => Colour::Green.paint("unlocked").to_string(),
        LockState::Locked { reason, since } => format!(
            "{} ({}, since {})",
            Colour::Red.paint("locked"),
            describe_reason(*reason),
            since.format("%H:%M:%S")
        ),
    }
}

fn describe_reason(reason: LockReason) -> &'static str {
    match reason {
        LockReason::Manual => "locked by hand",
        LockReason::Idle => "inactivity",
        LockReason::Resume => "app resumed",
    }
}

pub fn print_status(status: &GateStatus) {
    let lock = match (status.lock_reason, status.locked_at) {
        (Some(reason), Some(since)) => describe_lock(&LockState::Locked { reason, since }),
        _ => describe_lock(&LockState::Unlocked),
    };
    println!("state\t\t{lock}");

    let pin = if status.pin_configured {
        Colour::Green.paint("set")
    } else {
        Colour::Yellow.paint("not set")
    };
    println!("pin\t\t{pin}");

    let config = &status.config;
    let auto_lock = match config.auto_lock_delay() {
        Some(delay) => format!("after {}", format_duration(delay)),
        None => "disabled".into(),
    };
    println!("auto-lock\t{auto_lock}");
    if let (Some(seconds), Some(_)) = (status.seconds_until_lock, config.auto_lock_delay()) {
        println!(
            "locks in\t{}",
            format_duration(Duration::from_secs(seconds))
        );
    }
    println!("pin on resume\t{}", config.require_pin_on_resume);
    println!("hide content\t{}", config.hide_content_in_multitask);
    println!("pin length\t{}", config.pin_length);
    if status.failed_attempts > 0 {
        println!(
            "failed tries\t{}",
            Colour::Red.paint(status.failed_attempts.to_string())
        );
    }
}

/// Prints a pass/fail line for a boolean gate operation.
pub fn print_outcome(success: bool, done: &str, failed: &str) {
    if success {
        println!("{}", Colour::Green.paint(done));
    } else {
        println!("{}", Colour::Red.paint(failed));
    }
}

pub fn print_done(message: &str) {
    println!("{}", Colour::Green.paint(message));
}
