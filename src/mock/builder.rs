use super::handle::MockHandle;
use crate::config::LeakPolicy;
use crate::runtime::{CallResult, Interception, Registry, RegistryKey, Replacement, Visibility};
use crate::{MockError, Result};
use serde_json::Value;
use std::sync::Arc;

/// Collects the configuration of a mock and builds disabled [`MockHandle`]s.
///
/// `function` and the replacement setters all write the same field, so the
/// last one called wins.
#[derive(Clone, Debug, Default)]
pub struct MockBuilder {
    scope: Option<String>,
    name: Option<String>,
    replacement: Option<Replacement>,
    visibility: Option<Visibility>,
    on_leak: Option<LeakPolicy>,
    registry: Option<Arc<Registry>>,
}

impl MockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope of the intercepted function, e.g. a module path.
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Use a raw callable as the replacement.
    pub fn function<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Value]) -> CallResult + Send + Sync + 'static,
    {
        self.replacement = Some(Replacement::callable(f));
        self
    }

    pub fn replacement(mut self, replacement: impl Into<Replacement>) -> Self {
        self.replacement = Some(replacement.into());
        self
    }

    pub fn value(self, value: impl Into<Value>) -> Self {
        self.replacement(Replacement::value(value))
    }

    pub fn sequence<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.replacement(Replacement::sequence(values))
    }

    pub fn value_map<I>(self, cases: I) -> Self
    where
        I: IntoIterator<Item = (Vec<Value>, Value)>,
    {
        self.replacement(Replacement::map(cases))
    }

    /// Defaults to the registry's configured visibility.
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Defaults to the registry's configured policy.
    pub fn leak_policy(mut self, on_leak: LeakPolicy) -> Self {
        self.on_leak = Some(on_leak);
        self
    }

    /// Register into `registry` instead of the global one.
    pub fn registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build a disabled handle.
    ///
    /// Every call yields an independent handle; a sequence starts from its
    /// first value in each of them.
    pub fn build(&self) -> Result<MockHandle> {
        let scope = self
            .scope
            .clone()
            .ok_or(MockError::IncompleteConfiguration("scope"))?;
        let name = self
            .name
            .clone()
            .ok_or(MockError::IncompleteConfiguration("name"))?;
        let replacement = self
            .replacement
            .clone()
            .ok_or(MockError::IncompleteConfiguration("replacement"))?;

        let registry = self.registry.clone().unwrap_or_else(Registry::global);
        let defaults = registry.config();

        Ok(MockHandle::new(
            Interception::new(RegistryKey::new(scope, name), replacement),
            registry,
            self.visibility.unwrap_or(defaults.visibility),
            self.on_leak.unwrap_or(defaults.on_leak),
        ))
    }
}
