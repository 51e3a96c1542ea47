//! Scoped function mocking for tests.
//!
//! Call sites that should be replaceable in tests go through a
//! [`MockableFunction`] (the dispatch point) instead of calling the real
//! implementation directly. Tests build a [`MockHandle`] with a
//! [`MockBuilder`], enable it, exercise the code under test and disable it
//! again. While the handle is enabled, dispatches for its `(scope, name)`
//! run the configured [`Replacement`]; otherwise they fall through to the
//! real implementation.
//!
//! ```
//! use fnmock::{MockBuilder, MockableFunction};
//! use serde_json::json;
//!
//! let time = MockableFunction::new("app::clock", "time", |_| Ok(json!(1_700_000_000)));
//!
//! let mut mock = MockBuilder::new()
//!     .scope("app::clock")
//!     .name("time")
//!     .value(json!(1234))
//!     .build()
//!     .unwrap();
//!
//! mock.enable().unwrap();
//! assert_eq!(time.call(&[]).unwrap(), json!(1234));
//! mock.disable();
//! assert_eq!(time.call(&[]).unwrap(), json!(1_700_000_000));
//! ```
//!
//! Interception is explicit: only calls routed through a dispatch point can
//! be replaced.

pub mod config;
pub mod logging;
pub mod mock;
pub mod runtime;

use miette::Diagnostic;

pub use mock::{MockBuilder, MockEnvironment, MockGuard, MockHandle};
pub use runtime::{
    dispatch, CallError, CallResult, Exhaustion, Interception, MockableFunction, Registration,
    Registry, RegistryConfig, RegistryKey, Replacement, Visibility,
};

/// Argument and result type of every mockable call.
pub use serde_json::Value;

/// Result type alias for registry and handle operations
pub type Result<T> = std::result::Result<T, MockError>;

/// Error types for mock configuration and lifecycle
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum MockError {
    #[error("A mock for {scope}::{name} is already registered")]
    #[diagnostic(
        code(fnmock::already_registered),
        help("Another handle intercepts this function. Disable it first; a leftover mock usually means a previous test skipped its cleanup.")
    )]
    AlreadyRegistered { scope: String, name: String },

    #[error("The mock for {scope}::{name} is already enabled")]
    #[diagnostic(
        code(fnmock::already_enabled),
        help("Call `disable()` before enabling the same handle again.")
    )]
    AlreadyEnabled { scope: String, name: String },

    #[error("No mock is registered for {scope}::{name}")]
    #[diagnostic(code(fnmock::not_registered))]
    NotRegistered { scope: String, name: String },

    #[error("Incomplete mock configuration: missing {0}")]
    #[diagnostic(
        code(fnmock::incomplete_configuration),
        help("A mock needs a scope, a name and either a function or a replacement before `build()`.")
    )]
    IncompleteConfiguration(&'static str),

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(fnmock::config_error),
        help("Check that .fnmock.toml is valid TOML and only uses the documented keys.")
    )]
    ConfigError(String),
}

impl MockError {
    pub(crate) fn already_registered(key: &RegistryKey) -> Self {
        MockError::AlreadyRegistered {
            scope: key.scope.clone(),
            name: key.name.clone(),
        }
    }

    pub(crate) fn already_enabled(key: &RegistryKey) -> Self {
        MockError::AlreadyEnabled {
            scope: key.scope.clone(),
            name: key.name.clone(),
        }
    }

    pub(crate) fn not_registered(key: &RegistryKey) -> Self {
        MockError::NotRegistered {
            scope: key.scope.clone(),
            name: key.name.clone(),
        }
    }
}

/// Removes the calling thread's mocks from the global registry.
///
/// Intended as a teardown safety net. Mocks enabled by other threads and
/// process-wide mocks are left alone, so one test tearing down never disturbs
/// a test running next to it. Handles whose entries are removed this way
/// notice it on their next `enable()` or `disable()`.
pub fn disable_all() {
    Registry::global().clear_thread();
}
