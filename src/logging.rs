//! Structured logging utilities for fnmock.
//!
//! Helper functions for consistent, structured events across the crate using
//! the `tracing` crate. Nothing here logs errors that are returned to the
//! caller; events describe lifecycle and dispatch decisions only.

use crate::runtime::{RegistryKey, Visibility};
use std::sync::Once;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the filter used by [`init_test_subscriber`].
pub const LOG_ENV: &str = "FNMOCK_LOG";

const FALLBACK_FILTER: &str = "fnmock=warn";

/// Install a stderr `tracing` subscriber for test suites.
///
/// The filter comes from `FNMOCK_LOG` (e.g. `fnmock=trace`), falling back to
/// warnings only. Setting `FNMOCK_LOG_JSON` switches to JSON lines. Calling it
/// more than once, or after another subscriber was installed, does nothing.
pub fn init_test_subscriber() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| FALLBACK_FILTER.into());

        if std::env::var("FNMOCK_LOG_JSON").is_ok() {
            let json_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_test_writer()
                .with_target(true)
                .with_level(true);
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(json_layer)
                .try_init();
        } else {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_test_writer()
                .with_target(true)
                .with_level(true);
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init();
        }
    });
}

/// Log a mock being published into the registry.
pub fn log_mock_enabled(key: &RegistryKey, visibility: Visibility) {
    tracing::debug!(
        scope = key.scope.as_str(),
        name = key.name.as_str(),
        ?visibility,
        "Mock enabled"
    );
}

/// Log a mock being removed from the registry.
pub fn log_mock_disabled(key: &RegistryKey) {
    tracing::debug!(
        scope = key.scope.as_str(),
        name = key.name.as_str(),
        "Mock disabled"
    );
}

/// Log a handle noticing that its entry was cleared behind its back.
pub fn log_stale_handle(key: &RegistryKey) {
    tracing::debug!(
        scope = key.scope.as_str(),
        name = key.name.as_str(),
        "Registry entry was cleared externally; handle reset to disabled"
    );
}

/// Log a registry reset.
pub fn log_registry_cleared(removed: usize) {
    tracing::debug!(removed, "Registry cleared");
}

/// Log entries dropped because the thread that registered them exited.
pub fn log_thread_exit_cleanup(removed: usize) {
    tracing::debug!(removed, "Removed mocks of exited thread");
}

/// Log the outcome of a dispatch.
pub fn log_dispatch(key: &RegistryKey, args_count: usize, mocked: bool) {
    tracing::trace!(
        scope = key.scope.as_str(),
        name = key.name.as_str(),
        args_count,
        mocked,
        "Dispatch"
    );
}

/// Log an enabled handle being dropped without `disable()`.
pub fn log_leaked_handle(key: &RegistryKey) {
    tracing::warn!(
        scope = key.scope.as_str(),
        name = key.name.as_str(),
        "Mock handle dropped while enabled; disabling it. Call disable() or use enable_scoped()"
    );
}

/// Log a group rollback after a member failed to enable.
pub fn log_environment_rollback(failed: &RegistryKey, rolled_back: usize) {
    tracing::debug!(
        scope = failed.scope.as_str(),
        name = failed.name.as_str(),
        rolled_back,
        "Mock environment enable failed; rolled back"
    );
}
