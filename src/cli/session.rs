use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use tokio::{
    io::{self, AsyncBufReadExt, BufReader},
    select,
    sync::watch,
};
use tokio_stream::{wrappers::LinesStream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    gate::{activity::InteractionKind, LockState, Visibility},
    session::{handle::GateHandle, start_session},
    storage::KeyValueStore,
    utils::clock::DefaultClock,
};

use super::output::{describe_lock, print_outcome, print_status};

const HELP: &str = "commands: status | lock | unlock <pin> | show | hide | countdown | \
                    mousedown | mousemove | keypress | scroll | touchstart | click | quit";

/// A line typed into an interactive session. Stands in for the UI: visibility changes and
/// interaction events are fed to the gate the same way a front-end would.
#[derive(Debug, PartialEq, Eq)]
enum SessionCommand {
    Status,
    Lock,
    Unlock(String),
    Visibility(Visibility),
    Interaction(InteractionKind),
    Countdown,
    Help,
    Quit,
}

impl FromStr for SessionCommand {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let Some(command) = words.next() else {
            bail!("Empty command");
        };
        let command = match command {
            "status" => Self::Status,
            "lock" => Self::Lock,
            "unlock" => Self::Unlock(
                words
                    .next()
                    .ok_or_else(|| anyhow!("unlock needs a PIN"))?
                    .to_owned(),
            ),
            "show" | "visible" => Self::Visibility(Visibility::Visible),
            "hide" | "hidden" => Self::Visibility(Visibility::Hidden),
            "countdown" => Self::Countdown,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => Self::Interaction(other.parse()?),
        };
        if words.next().is_some() {
            bail!("Too many arguments");
        }
        Ok(command)
    }
}

pub async fn run_session(store: impl KeyValueStore) -> Result<()> {
    let shutdown = CancellationToken::new();
    let (handle, monitor) = start_session(store, DefaultClock, &shutdown);
    let lock_state = handle.subscribe();
    println!("{HELP}");

    let (gate, input_result, _, _) = tokio::join!(
        monitor.run(),
        read_commands(handle, shutdown.clone()),
        report_lock_changes(lock_state),
        detect_shutdown(shutdown.clone()),
    );
    gate.dispose();
    input_result
}

/// Cancels the session on Ctrl-C. Returns as soon as the session ends for any other reason too.
async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, closing session");
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => (),
    };
}

async fn report_lock_changes(mut state: watch::Receiver<LockState>) {
    while state.changed().await.is_ok() {
        let current = *state.borrow_and_update();
        println!("-- {}", describe_lock(&current));
    }
}

async fn read_commands(handle: GateHandle, shutdown: CancellationToken) -> Result<()> {
    let mut lines = LinesStream::new(BufReader::new(io::stdin()).lines());
    let result = loop {
        let line = select! {
            _ = shutdown.cancelled() => break Ok(()),
            line = lines.next() => line,
        };
        let line = match line {
            None => break Ok(()),
            Some(Err(e)) => break Err(e.into()),
            Some(Ok(line)) if line.trim().is_empty() => continue,
            Some(Ok(line)) => line,
        };
        let command = match line.parse::<SessionCommand>() {
            Ok(command) => command,
            Err(e) => {
                println!("{e}. {HELP}");
                continue;
            }
        };
        if command == SessionCommand::Quit {
            break Ok(());
        }
        if let Err(e) = execute(&handle, command).await {
            error!("Session command failed {e:?}");
            break Err(e);
        }
    };
    handle.dispose();
    result
}

async fn execute(handle: &GateHandle, command: SessionCommand) -> Result<()> {
    match command {
        SessionCommand::Status => print_status(&handle.status().await?),
        SessionCommand::Lock => {
            if !handle.is_pin_configured().await? {
                println!("No PIN is set, nothing to lock");
            }
            handle.lock_app().await?;
        }
        SessionCommand::Unlock(pin) => {
            print_outcome(handle.unlock_app(&pin).await?, "Unlocked", "Wrong PIN");
        }
        SessionCommand::Visibility(visibility) => handle.set_visibility(visibility).await?,
        SessionCommand::Interaction(kind) => handle.record_activity(kind).await?,
        SessionCommand::Countdown => match handle.time_until_lock().await? {
            Some(seconds) => println!("Locks in {seconds}s"),
            None => println!("No PIN is set"),
        },
        SessionCommand::Help => println!("{HELP}"),
        SessionCommand::Quit => (),
    }
    Ok(())
}
