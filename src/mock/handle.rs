use crate::config::LeakPolicy;
use crate::logging;
use crate::runtime::{Interception, Registration, Registry, RegistryKey, Visibility};
use crate::{MockError, Result};
use serde_json::Value;
use std::ops::Deref;
use std::sync::Arc;
use std::thread;

/// One configured interception of `(scope, name)`.
///
/// Created disabled by [`MockBuilder::build`](super::MockBuilder::build).
/// [`enable`](Self::enable) publishes it to the registry and
/// [`disable`](Self::disable) removes it again; a handle can go through that
/// cycle any number of times. Dropping an enabled handle disables it and
/// reports the leak according to its [`LeakPolicy`].
#[derive(Debug)]
pub struct MockHandle {
    interception: Arc<Interception>,
    registry: Arc<Registry>,
    visibility: Visibility,
    on_leak: LeakPolicy,
    registration: Option<Registration>,
}

impl MockHandle {
    pub(crate) fn new(
        interception: Interception,
        registry: Arc<Registry>,
        visibility: Visibility,
        on_leak: LeakPolicy,
    ) -> Self {
        Self {
            interception: Arc::new(interception),
            registry,
            visibility,
            on_leak,
            registration: None,
        }
    }

    pub fn key(&self) -> &RegistryKey {
        self.interception.key()
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_enabled(&self) -> bool {
        self.registration
            .as_ref()
            .is_some_and(|registration| self.registry.holds(registration))
    }

    /// Publish the replacement.
    ///
    /// Fails with `AlreadyEnabled` if this handle is enabled and with
    /// `AlreadyRegistered` if another handle intercepts the same key.
    pub fn enable(&mut self) -> Result<()> {
        if let Some(registration) = &self.registration {
            if self.registry.holds(registration) {
                return Err(MockError::already_enabled(self.key()));
            }
            logging::log_stale_handle(self.key());
            self.registration = None;
        }

        let registration = self
            .registry
            .register_with(Arc::clone(&self.interception), self.visibility)?;
        self.registration = Some(registration);
        Ok(())
    }

    /// Withdraw the replacement. Does nothing if the handle is disabled.
    pub fn disable(&mut self) {
        if let Some(registration) = self.registration.take() {
            if !self.registry.release(&registration) {
                logging::log_stale_handle(self.key());
            }
        }
    }

    /// Enable for the lifetime of the returned guard.
    pub fn enable_scoped(&mut self) -> Result<MockGuard<'_>> {
        self.enable()?;
        Ok(MockGuard { handle: self })
    }

    /// Arguments of every intercepted call, across all enable cycles.
    pub fn calls(&self) -> Vec<Vec<Value>> {
        self.interception.calls()
    }

    pub fn call_count(&self) -> usize {
        self.interception.call_count()
    }

    /// Forget the recorded calls. The handle stays in its current state.
    pub fn clear_calls(&self) {
        self.interception.clear_calls();
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        let Some(registration) = self.registration.take() else {
            return;
        };
        if !self.registry.release(&registration) {
            return;
        }
        logging::log_leaked_handle(self.key());
        if self.on_leak == LeakPolicy::Panic && !thread::panicking() {
            panic!(
                "mock for {} was dropped while enabled; call disable() before dropping it",
                self.key()
            );
        }
    }
}

/// Disables its handle when dropped.
#[derive(Debug)]
pub struct MockGuard<'a> {
    handle: &'a mut MockHandle,
}

impl MockGuard<'_> {
    /// Disable now instead of at the end of the scope.
    pub fn disable(self) {
        drop(self);
    }
}

impl Deref for MockGuard<'_> {
    type Target = MockHandle;

    fn deref(&self) -> &MockHandle {
        self.handle
    }
}

impl Drop for MockGuard<'_> {
    fn drop(&mut self) {
        self.handle.disable();
    }
}
