use super::registry::{Registry, RegistryKey};
use super::replacement::{CallError, CallFn, CallResult};
use crate::logging;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A call site that can be intercepted.
///
/// Production code calls [`call`](Self::call) instead of the real
/// implementation. Each call looks up `(scope, name)` in the registry and
/// runs the installed replacement, or the real implementation when no mock
/// is active for the calling thread.
#[derive(Clone)]
pub struct MockableFunction {
    key: RegistryKey,
    real: Arc<CallFn>,
    registry: Option<Arc<Registry>>,
}

impl MockableFunction {
    pub fn new<F>(scope: impl Into<String>, name: impl Into<String>, real: F) -> Self
    where
        F: Fn(&[Value]) -> CallResult + Send + Sync + 'static,
    {
        Self {
            key: RegistryKey::new(scope, name),
            real: Arc::new(real),
            registry: None,
        }
    }

    /// Resolve against `registry` instead of the global one.
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn key(&self) -> &RegistryKey {
        &self.key
    }

    pub fn call(&self, args: &[Value]) -> CallResult {
        match &self.registry {
            Some(registry) => dispatch_in(registry, &self.key, args, self.real.as_ref()),
            None => dispatch_in(&Registry::global(), &self.key, args, self.real.as_ref()),
        }
    }

    /// Call and deserialize the result.
    pub fn call_as<T: DeserializeOwned>(&self, args: &[Value]) -> Result<T, CallError> {
        let value = self.call(args)?;
        serde_json::from_value(value).map_err(|e| {
            CallError::failed(format!("Unexpected result type from {}: {}", self.key, e))
        })
    }

    /// Run the real implementation, bypassing any mock.
    pub fn call_real(&self, args: &[Value]) -> CallResult {
        (self.real)(args)
    }
}

impl fmt::Debug for MockableFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockableFunction")
            .field("key", &self.key)
            .field("custom_registry", &self.registry.is_some())
            .finish()
    }
}

/// One-off dispatch through the global registry.
pub fn dispatch<F>(scope: &str, name: &str, args: &[Value], real: F) -> CallResult
where
    F: FnOnce(&[Value]) -> CallResult,
{
    let key = RegistryKey::new(scope, name);
    dispatch_in(&Registry::global(), &key, args, real)
}

fn dispatch_in<F>(registry: &Registry, key: &RegistryKey, args: &[Value], real: F) -> CallResult
where
    F: FnOnce(&[Value]) -> CallResult,
{
    // The lookup guard is released here; the replacement runs unlocked.
    let installed = registry.lookup(key);
    logging::log_dispatch(key, args.len(), installed.is_some());
    match installed {
        Some(interception) => interception.invoke(args),
        None => real(args),
    }
}
