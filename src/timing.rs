//! Start/end/elapsed logging around install steps.

use std::time::{Duration, Instant, SystemTime};

use humantime::{format_duration, format_rfc3339_seconds};
use tracing::{info, warn};

/// Runs `body`, logging wall-clock start and end times and the elapsed
/// duration under `label`.
///
/// # Errors
///
/// Returns whatever `body` returns; a failure is logged as aborted.
pub fn timed<T, E>(label: &str, body: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
    let clock = Instant::now();
    info!(at = %format_rfc3339_seconds(SystemTime::now()), "{label}: start");
    let outcome = body();
    let elapsed = format_duration(to_millis(clock.elapsed()));
    let at = format_rfc3339_seconds(SystemTime::now());
    if outcome.is_ok() {
        info!(%at, %elapsed, "{label}: end");
    } else {
        warn!(%at, %elapsed, "{label}: aborted");
    }
    outcome
}

const fn to_millis(elapsed: Duration) -> Duration {
    Duration::new(elapsed.as_secs(), elapsed.subsec_millis() * 1_000_000)
}
