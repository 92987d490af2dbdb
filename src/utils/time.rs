use std::time::Duration;

/// Whole seconds left in `remaining`, rounded up. A partially elapsed second still counts as one.
pub fn ceil_seconds(remaining: Duration) -> u64 {
    remaining.as_nanos().div_ceil(1_000_000_000) as u64
}

/// Human readable form used when printing lock countdowns and delays.
pub fn format_duration(v: Duration) -> String {
    let seconds = v.as_secs();
    let hours = seconds / 3600;
    let minutes = seconds / 60;
    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes % 60, seconds % 60)
    } else if minutes > 0 {
        format!("{}m{}s", minutes % 60, seconds % 60)
    } else {
        format!("{}s", seconds % 60)
    }
}
