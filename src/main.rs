use anyhow::Result;
use diarygate::{cli::run_cli, utils::runtime::single_thread_runtime};
use tracing::error;

fn main() -> Result<()> {
    let runtime = single_thread_runtime()?;
    let result = runtime.block_on(run_cli()).inspect_err(|e| {
        error!("Error running cli {e:?}");
    });
    // Reading stdin parks a blocking thread that would otherwise hold the runtime open.
    runtime.shutdown_background();
    result
}
