use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use super::{fire, Observers, SettingsObserver, SettingsProvider};
use crate::error::ProviderError;

#[derive(Default)]
struct Inner {
    values: HashMap<String, String>,
    observers: Observers,
    fail_reads: bool,
    fail_writes: bool,
    writes: usize,
}

/// In-process settings map. Clones share state, so a test can keep one
/// handle while the store owns another.
#[derive(Clone, Default)]
pub struct MemorySettings {
    inner: Arc<Mutex<Inner>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(settings_id: &str, value: &str) -> Self {
        let settings = Self::new();
        settings
            .lock()
            .values
            .insert(settings_id.to_string(), value.to_string());
        settings
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Simulate another process editing `settings_id`
    pub fn set_external(&self, settings_id: &str, value: &str) {
        let observers = {
            let mut inner = self.lock();
            inner.values.insert(settings_id.to_string(), value.to_string());
            inner.observers.for_id(settings_id)
        };
        fire(observers, settings_id);
    }

    /// Fire observers without changing anything
    pub fn touch(&self, settings_id: &str) {
        let observers = self.lock().observers.for_id(settings_id);
        fire(observers, settings_id);
    }

    /// Make subsequent reads fail with [`ProviderError::Unavailable`]
    pub fn set_fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    /// Make subsequent writes fail with [`ProviderError::Unavailable`]
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Number of successful writes
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    pub fn value(&self, settings_id: &str) -> Option<String> {
        self.lock().values.get(settings_id).cloned()
    }
}

impl SettingsProvider for MemorySettings {
    fn read_string(&self, settings_id: &str) -> Result<Option<String>, ProviderError> {
        let inner = self.lock();
        if inner.fail_reads {
            return Err(ProviderError::Unavailable(format!(
                "reads of {settings_id} are disabled"
            )));
        }
        Ok(inner.values.get(settings_id).cloned())
    }

    fn write_string(&mut self, settings_id: &str, value: &str) -> Result<(), ProviderError> {
        let observers = {
            let mut inner = self.lock();
            if inner.fail_writes {
                return Err(ProviderError::Unavailable(format!(
                    "writes to {settings_id} are disabled"
                )));
            }
            inner.values.insert(settings_id.to_string(), value.to_string());
            inner.writes += 1;
            inner.observers.for_id(settings_id)
        };
        debug!(settings_id, "memory settings written");
        fire(observers, settings_id);
        Ok(())
    }

    fn register_observer(&mut self, settings_id: &str, observer: SettingsObserver) {
        self.lock().observers.register(settings_id, observer);
    }
}
