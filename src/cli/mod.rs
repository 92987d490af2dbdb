pub mod commands;
pub mod output;
pub mod session;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, level_filters::LevelFilter, warn};

use crate::{
    storage::{file_store::DirectoryStore, memory_store::MemoryStore, KeyValueStore},
    utils::{
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, CLI_PREFIX, SESSION_PREFIX},
    },
};

use commands::ConfigArgs;

#[derive(Parser, Debug)]
#[command(name = "Diarygate", version, long_about = None)]
#[command(about = "PIN lock for the diary and habit tracker", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default uses $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Print logs to the console")]
    log: bool,
    #[arg(long = "log-filter", global = true)]
    log_filter: Option<LevelFilter>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Show whether a PIN is set and the current lock policy")]
    Status {
        #[arg(long, help = "Print as JSON")]
        json: bool,
    },
    #[command(about = "Set the first PIN")]
    Setup {
        #[arg(long)]
        pin: String,
    },
    #[command(about = "Check a PIN without changing anything")]
    Verify {
        #[arg(long)]
        pin: String,
    },
    #[command(about = "Replace the PIN, requires the current one")]
    Change {
        #[arg(long)]
        current: String,
        #[arg(long)]
        next: String,
    },
    #[command(about = "Remove the PIN, requires the current one")]
    Disable {
        #[arg(long)]
        current: String,
    },
    #[command(about = "Forgot the PIN. Removes it without asking for it")]
    Reset {},
    #[command(about = "Remove the PIN and restore the default lock policy")]
    EmergencyReset {},
    #[command(about = "Update the lock policy")]
    Config {
        #[command(flatten)]
        config: ConfigArgs,
    },
    #[command(about = "Run an interactive lock session reading events from stdin")]
    Session {},
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = args
        .dir
        .map_or_else(create_application_default_path, ensure_dir)?;

    let prefix = if matches!(args.commands, Commands::Session {}) {
        SESSION_PREFIX
    } else {
        CLI_PREFIX
    };
    let log_level = args
        .log_filter
        .or_else(|| args.log.then_some(LevelFilter::TRACE));
    enable_logging(prefix, &app_dir, log_level, args.log)?;

    let store = open_store(app_dir.join("security"));

    match args.commands {
        Commands::Status { json } => commands::status(store, json),
        Commands::Setup { pin } => commands::setup(store, &pin),
        Commands::Verify { pin } => commands::verify(store, &pin),
        Commands::Change { current, next } => commands::change(store, &current, &next),
        Commands::Disable { current } => commands::disable(store, &current),
        Commands::Reset {} => commands::reset(store),
        Commands::EmergencyReset {} => commands::emergency_reset(store),
        Commands::Config { config } => commands::update_config(store, config),
        Commands::Session {} => session::run_session(store).await,
    }
}

/// Storage is best effort: when the records directory is unusable the gate still works, it just
/// forgets everything on exit.
fn open_store(dir: PathBuf) -> Box<dyn KeyValueStore> {
    match DirectoryStore::new(dir.clone()) {
        Ok(store) => {
            debug!("Storing security records in {:?}", store.dir());
            Box::new(store)
        }
        Err(e) => {
            warn!("Can't use {dir:?} for storage, nothing will be persisted: {e}");
            Box::new(MemoryStore::new())
        }
    }
}
