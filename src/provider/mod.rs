//! Settings providers: the external key/value store that holds the raw
//! policy strings.
//!
//! - **memory**: in-process map, used by tests and embedders
//! - **json_file**: JSON object on disk, used by the CLI

use std::sync::Arc;

use crate::error::ProviderError;

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileSettings;
pub use memory::MemorySettings;

/// Called with the settings id whose value changed
pub type SettingsObserver = Arc<dyn Fn(&str) + Send + Sync>;

pub trait SettingsProvider: Send {
    fn read_string(&self, settings_id: &str) -> Result<Option<String>, ProviderError>;

    fn write_string(&mut self, settings_id: &str, value: &str) -> Result<(), ProviderError>;

    /// Observers fire for every change of `settings_id`, including writes
    /// made through this provider.
    fn register_observer(&mut self, settings_id: &str, observer: SettingsObserver);

    /// Look for changes made outside this process. Providers that are told
    /// about changes directly have nothing to do here.
    fn poll(&mut self) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Observer lists keyed by settings id
#[derive(Default, Clone)]
pub(crate) struct Observers {
    by_id: std::collections::HashMap<String, Vec<SettingsObserver>>,
}

impl Observers {
    pub(crate) fn register(&mut self, settings_id: &str, observer: SettingsObserver) {
        self.by_id.entry(settings_id.to_string()).or_default().push(observer);
    }

    /// Observers to call for `settings_id`, cloned so they can run unlocked
    pub(crate) fn for_id(&self, settings_id: &str) -> Vec<SettingsObserver> {
        self.by_id.get(settings_id).cloned().unwrap_or_default()
    }
}

pub(crate) fn fire(observers: Vec<SettingsObserver>, settings_id: &str) {
    for observer in observers {
        observer(settings_id);
    }
}
