//! Wall-clock functions routed through fnmock dispatch points.
//!
//! All functions live in scope [`SCOPE`]. Tests replace them with a
//! `MockBuilder` using that scope and the function name (`"time"`,
//! `"microtime"` or `"sleep"`).

use fnmock::{CallError, CallResult, MockableFunction, Value};
use serde_json::json;
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const SCOPE: &str = "fnmock_clock";

fn since_epoch() -> Result<Duration, CallError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| CallError::failed(format!("System clock is before the Unix epoch: {}", e)))
}

fn real_time(_args: &[Value]) -> CallResult {
    Ok(json!(since_epoch()?.as_secs()))
}

fn real_microtime(_args: &[Value]) -> CallResult {
    Ok(json!(since_epoch()?.as_secs_f64()))
}

fn real_sleep(args: &[Value]) -> CallResult {
    let seconds = args
        .first()
        .and_then(Value::as_u64)
        .ok_or_else(|| CallError::failed("sleep expects a number of seconds"))?;
    thread::sleep(Duration::from_secs(seconds));
    Ok(json!(0))
}

fn time_fn() -> &'static MockableFunction {
    static F: OnceLock<MockableFunction> = OnceLock::new();
    F.get_or_init(|| MockableFunction::new(SCOPE, "time", real_time))
}

fn microtime_fn() -> &'static MockableFunction {
    static F: OnceLock<MockableFunction> = OnceLock::new();
    F.get_or_init(|| MockableFunction::new(SCOPE, "microtime", real_microtime))
}

fn sleep_fn() -> &'static MockableFunction {
    static F: OnceLock<MockableFunction> = OnceLock::new();
    F.get_or_init(|| MockableFunction::new(SCOPE, "sleep", real_sleep))
}

/// Seconds since the Unix epoch.
pub fn time() -> Result<u64, CallError> {
    time_fn().call_as(&[])
}

/// Seconds since the Unix epoch with sub-second precision.
pub fn microtime() -> Result<f64, CallError> {
    microtime_fn().call_as(&[])
}

/// Block the calling thread for `seconds`.
pub fn sleep(seconds: u64) -> Result<(), CallError> {
    sleep_fn().call(&[json!(seconds)]).map(|_| ())
}

/// Seconds elapsed since `start`, a value previously returned by [`time`].
pub fn seconds_since(start: u64) -> Result<u64, CallError> {
    Ok(time()?.saturating_sub(start))
}
