//! Economic policy configuration store
//!
//! Holds the tunable factors of the alarm manager and job scheduler
//! economies, decodes and encodes their compact `key=value` settings
//! strings, persists edits through a settings provider and tells
//! listeners when values change.

#![forbid(unsafe_code)]

pub mod catalog;
pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod notifier;
pub mod provider;
pub mod service;
pub mod store;
pub mod table;
pub mod units;

pub use catalog::{FactorDescriptor, FactorGroup, PolicyId};
pub use config::AppConfig;
pub use error::{ParseError, ProviderError, StoreError, StoreResult};
pub use notifier::{ChangeNotifier, ListenerId, PolicyListener};
pub use provider::{JsonFileSettings, MemorySettings, SettingsProvider};
pub use service::{StoreHandle, StoreService};
pub use store::PolicyStore;
pub use table::{Catalog, FactorEntry, FactorSnapshot, PolicyTable};
