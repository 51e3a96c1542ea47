pub mod dispatch;
pub mod registry;
pub mod replacement;

pub use dispatch::{dispatch, MockableFunction};
pub use registry::{Interception, Registration, Registry, RegistryConfig, RegistryKey, Visibility};
pub use replacement::{CallError, CallFn, CallResult, Exhaustion, Replacement};
