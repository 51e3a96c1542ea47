use super::replacement::{CallError, CallResult, InvokeError, Replacement};
use crate::config::{Config, LeakPolicy};
use crate::logging;
use crate::{MockError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::thread::{self, ThreadId};

#[derive(Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub struct RegistryKey {
    pub scope: String,
    pub name: String,
}

impl RegistryKey {
    pub fn new(scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.scope, self.name)
    }
}

/// Which dispatches observe a registered mock.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Only dispatches on the thread that enabled the mock. Keeps tests
    /// running in parallel threads from seeing each other's mocks.
    #[default]
    Thread,
    /// Every thread, for code under test that spawns its own threads.
    Process,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
enum Slot {
    Thread(ThreadId),
    Process,
}

impl Slot {
    fn for_current_thread(visibility: Visibility) -> Self {
        match visibility {
            Visibility::Thread => Slot::Thread(thread::current().id()),
            Visibility::Process => Slot::Process,
        }
    }
}

/// An installed replacement together with the calls it has answered
pub struct Interception {
    key: RegistryKey,
    replacement: Replacement,
    calls: Mutex<Vec<Vec<Value>>>,
}

impl Interception {
    pub fn new(key: RegistryKey, replacement: Replacement) -> Self {
        Self {
            key,
            replacement,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn key(&self) -> &RegistryKey {
        &self.key
    }

    pub fn replacement(&self) -> &Replacement {
        &self.replacement
    }

    /// Record the call and run the replacement.
    pub fn invoke(&self, args: &[Value]) -> CallResult {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(args.to_vec());

        self.replacement.invoke(args).map_err(|e| match e {
            InvokeError::NoMatchingCase(args) => CallError::NoMatchingCase {
                scope: self.key.scope.clone(),
                name: self.key.name.clone(),
                args,
            },
            InvokeError::SequenceExhausted(len) => CallError::SequenceExhausted {
                scope: self.key.scope.clone(),
                name: self.key.name.clone(),
                len,
            },
            InvokeError::Failed(err) => err,
        })
    }

    /// Arguments of every call answered so far, oldest first.
    pub fn calls(&self) -> Vec<Vec<Value>> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Forget the recorded calls.
    pub fn clear_calls(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl fmt::Debug for Interception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interception")
            .field("key", &self.key)
            .field("replacement", &self.replacement)
            .field("calls", &self.call_count())
            .finish()
    }
}

/// Proof of one registration, used to remove exactly that entry later.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Registration {
    key: RegistryKey,
    slot: Slot,
    token: u64,
}

impl Registration {
    pub fn key(&self) -> &RegistryKey {
        &self.key
    }

    pub fn visibility(&self) -> Visibility {
        match self.slot {
            Slot::Thread(_) => Visibility::Thread,
            Slot::Process => Visibility::Process,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RegistryConfig {
    /// Visibility used by [`Registry::register`] and by builders that do not set one
    pub visibility: Visibility,
    /// Reaction of handles dropped while enabled
    pub on_leak: LeakPolicy,
}

struct Entry {
    interception: Arc<Interception>,
    token: u64,
}

type EntryMap = HashMap<RegistryKey, HashMap<Slot, Entry>>;

/// Removes a thread's entries from every registry it registered into when
/// the thread exits. Nothing can observe or unregister them afterwards.
struct ThreadExitCleanup {
    thread: ThreadId,
    maps: Vec<Weak<Mutex<EntryMap>>>,
}

impl Drop for ThreadExitCleanup {
    fn drop(&mut self) {
        for map in self.maps.drain(..) {
            let Some(map) = map.upgrade() else {
                continue;
            };
            let mut entries = map.lock().unwrap_or_else(PoisonError::into_inner);
            let removed = remove_slot(&mut entries, Slot::Thread(self.thread));
            if removed > 0 {
                logging::log_thread_exit_cleanup(removed);
            }
        }
    }
}

thread_local! {
    static THREAD_EXIT: RefCell<ThreadExitCleanup> = RefCell::new(ThreadExitCleanup {
        thread: thread::current().id(),
        maps: Vec::new(),
    });
}

fn track_thread_exit(map: &Arc<Mutex<EntryMap>>) {
    let weak = Arc::downgrade(map);
    // Fails only while this thread's locals are being destroyed.
    let _ = THREAD_EXIT.try_with(|cleanup| {
        let mut cleanup = cleanup.borrow_mut();
        cleanup.maps.retain(|m| m.strong_count() > 0);
        if !cleanup.maps.iter().any(|m| m.ptr_eq(&weak)) {
            cleanup.maps.push(weak);
        }
    });
}

/// Maps `(scope, name)` to the active replacement.
///
/// At most one entry per key is observable from any thread. All access is
/// serialized by a single lock, which is never held while a replacement runs.
/// Thread-visible entries disappear when their thread exits.
pub struct Registry {
    config: RegistryConfig,
    next_token: AtomicU64,
    entries: Arc<Mutex<EntryMap>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl Registry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            next_token: AtomicU64::new(1),
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The process-wide registry, configured from `.fnmock.toml` on first use.
    pub fn global() -> Arc<Registry> {
        static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| {
            Arc::new(Registry::new(Config::load_or_default().registry_config()))
        }))
    }

    pub fn config(&self) -> RegistryConfig {
        self.config
    }

    fn entries(&self) -> MutexGuard<'_, EntryMap> {
        // Every mutation completes before the guard drops, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install `replacement` for `key` with the registry's default visibility.
    pub fn register(&self, key: RegistryKey, replacement: Replacement) -> Result<()> {
        let interception = Arc::new(Interception::new(key, replacement));
        self.register_with(interception, self.config.visibility)
            .map(|_| ())
    }

    /// Install an interception, failing if its key is already taken.
    pub fn register_with(
        &self,
        interception: Arc<Interception>,
        visibility: Visibility,
    ) -> Result<Registration> {
        let key = interception.key().clone();
        let slot = Slot::for_current_thread(visibility);
        let mut entries = self.entries();
        let slots = entries.entry(key.clone()).or_default();

        let taken = match slot {
            Slot::Process => !slots.is_empty(),
            Slot::Thread(_) => slots.contains_key(&slot) || slots.contains_key(&Slot::Process),
        };
        if taken {
            return Err(MockError::already_registered(&key));
        }

        if let Slot::Thread(_) = slot {
            track_thread_exit(&self.entries);
        }
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        slots.insert(
            slot,
            Entry {
                interception,
                token,
            },
        );
        logging::log_mock_enabled(&key, visibility);

        Ok(Registration { key, slot, token })
    }

    /// Remove the entry for `key` visible to this thread.
    ///
    /// A thread-local entry takes precedence over a process-wide one.
    pub fn unregister(&self, key: &RegistryKey) -> Result<()> {
        let mut entries = self.entries();
        let thread_slot = Slot::Thread(thread::current().id());
        let removed = match entries.get_mut(key) {
            Some(slots) => {
                slots.remove(&thread_slot).is_some() || slots.remove(&Slot::Process).is_some()
            }
            None => false,
        };
        if !removed {
            return Err(MockError::not_registered(key));
        }
        prune(&mut entries, key);
        logging::log_mock_disabled(key);
        Ok(())
    }

    /// Remove the entry created by `registration` if it is still installed.
    ///
    /// Returns `false` when the entry is already gone, for example after
    /// [`clear_all`](Self::clear_all).
    pub fn release(&self, registration: &Registration) -> bool {
        let mut entries = self.entries();
        let removed = match entries.get_mut(&registration.key) {
            Some(slots) => match slots.get(&registration.slot) {
                Some(entry) if entry.token == registration.token => {
                    slots.remove(&registration.slot);
                    true
                }
                _ => false,
            },
            None => false,
        };
        if removed {
            prune(&mut entries, &registration.key);
            logging::log_mock_disabled(&registration.key);
        }
        removed
    }

    /// Whether the entry created by `registration` is still installed.
    pub fn holds(&self, registration: &Registration) -> bool {
        self.entries()
            .get(&registration.key)
            .and_then(|slots| slots.get(&registration.slot))
            .is_some_and(|entry| entry.token == registration.token)
    }

    /// The interception this thread's dispatches for `key` should use.
    pub fn lookup(&self, key: &RegistryKey) -> Option<Arc<Interception>> {
        let entries = self.entries();
        let slots = entries.get(key)?;
        slots
            .get(&Slot::Thread(thread::current().id()))
            .or_else(|| slots.get(&Slot::Process))
            .map(|entry| Arc::clone(&entry.interception))
    }

    /// Remove the calling thread's entries, leaving other threads' and
    /// process-wide entries alone. The teardown hook for one test.
    pub fn clear_thread(&self) -> usize {
        let mut entries = self.entries();
        let removed = remove_slot(&mut entries, Slot::Thread(thread::current().id()));
        logging::log_registry_cleared(removed);
        removed
    }

    /// Remove every entry, whichever thread installed it.
    ///
    /// This also withdraws mocks that tests on other threads are still
    /// relying on; while tests run in parallel use
    /// [`clear_thread`](Self::clear_thread) instead.
    pub fn clear_all(&self) -> usize {
        let mut entries = self.entries();
        let removed = entries.values().map(HashMap::len).sum();
        entries.clear();
        logging::log_registry_cleared(removed);
        removed
    }

    /// Number of installed entries across all threads.
    pub fn len(&self) -> usize {
        self.entries().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys with at least one installed entry, sorted.
    pub fn active_keys(&self) -> Vec<RegistryKey> {
        let mut keys: Vec<RegistryKey> = self.entries().keys().cloned().collect();
        keys.sort();
        keys
    }
}

fn prune(entries: &mut EntryMap, key: &RegistryKey) {
    if entries.get(key).is_some_and(HashMap::is_empty) {
        entries.remove(key);
    }
}

fn remove_slot(entries: &mut EntryMap, slot: Slot) -> usize {
    let mut removed = 0;
    entries.retain(|_, slots| {
        if slots.remove(&slot).is_some() {
            removed += 1;
        }
        !slots.is_empty()
    });
    removed
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("active_keys", &self.active_keys())
            .finish()
    }
}
