use anyhow::Result;

/// The gate is single threaded by nature: every signal, request and idle poll is delivered on the
/// same execution context.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
