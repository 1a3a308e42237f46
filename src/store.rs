//! Policy store: loads both policy tables from the settings provider,
//! reacts to external changes and persists local edits.

use tracing::{debug, info, warn};

use crate::catalog::PolicyId;
use crate::codec;
use crate::error::{ProviderError, StoreError, StoreResult};
use crate::notifier::ChangeNotifier;
use crate::provider::{SettingsObserver, SettingsProvider};
use crate::table::{Catalog, FactorSnapshot, PolicyTable};

pub struct PolicyStore {
    provider: Box<dyn SettingsProvider>,
    notifier: ChangeNotifier,
    catalog: Catalog,
    scale: i64,
    // Last raw string read from or written to the provider, per policy
    raw_alarm_manager: String,
    raw_job_scheduler: String,
}

impl PolicyStore {
    /// Read both raw strings from `provider` and decode them over the
    /// catalog defaults. Unreadable settings leave the defaults in effect.
    pub fn load(
        provider: Box<dyn SettingsProvider>,
        notifier: ChangeNotifier,
        scale: i64,
    ) -> Self {
        let mut store = Self {
            provider,
            notifier,
            catalog: Catalog::from_defaults(),
            scale,
            raw_alarm_manager: String::new(),
            raw_job_scheduler: String::new(),
        };
        for policy in PolicyId::ALL {
            let raw = match store.read_raw(policy) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(
                        policy = ?policy,
                        error = %e,
                        "failed to read settings, using defaults"
                    );
                    String::new()
                }
            };
            store.apply_raw(policy, raw);
        }
        store
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    pub fn scale(&self) -> i64 {
        self.scale
    }

    pub fn table(&self, policy: PolicyId) -> &PolicyTable {
        self.catalog.table(policy)
    }

    pub fn raw_settings(&self, policy: PolicyId) -> &str {
        match policy {
            PolicyId::AlarmManager => &self.raw_alarm_manager,
            PolicyId::JobScheduler => &self.raw_job_scheduler,
        }
    }

    fn raw_mut(&mut self, policy: PolicyId) -> &mut String {
        match policy {
            PolicyId::AlarmManager => &mut self.raw_alarm_manager,
            PolicyId::JobScheduler => &mut self.raw_job_scheduler,
        }
    }

    pub fn resolve_policy(&self, key: &str) -> StoreResult<PolicyId> {
        self.catalog.resolve_policy(key)
    }

    pub fn get_title(&self, key: &str) -> StoreResult<&'static str> {
        self.catalog.get_title(key)
    }

    pub fn get_current_value(&self, key: &str) -> StoreResult<i64> {
        self.catalog.get_current_value(key)
    }

    pub fn snapshot(&self, policy: PolicyId) -> Vec<FactorSnapshot> {
        self.table(policy).snapshot()
    }

    /// Register `observer` for changes to both policies' settings ids
    pub fn watch_provider(&mut self, observer: SettingsObserver) {
        for policy in PolicyId::ALL {
            self.provider.register_observer(policy.settings_id(), observer.clone());
        }
    }

    pub fn poll_provider(&mut self) -> Result<(), ProviderError> {
        self.provider.poll()
    }

    /// Absent settings read as the empty string
    fn read_raw(&self, policy: PolicyId) -> Result<String, ProviderError> {
        Ok(self
            .provider
            .read_string(policy.settings_id())?
            .unwrap_or_default())
    }

    /// Decode `raw` onto the policy's table, replacing every value
    fn apply_raw(&mut self, policy: PolicyId, raw: String) {
        let table = self.catalog.table_mut(policy);
        let decoded = codec::decode_report(&raw, table, self.scale);
        for (key, token) in &decoded.rejected {
            warn!(
                policy = ?policy,
                key = %key,
                token = %token,
                "invalid factor value, using default"
            );
        }
        table.apply(&decoded.values);
        info!(
            policy = ?policy,
            overrides = decoded.values.len(),
            rejected = decoded.rejected.len(),
            "loaded policy settings"
        );
        *self.raw_mut(policy) = raw;
    }

    /// React to the provider reporting that `policy`'s raw string changed.
    /// Returns true if listeners were notified.
    ///
    /// A failed read keeps the current table and raw string; the next
    /// change event retries.
    pub fn on_external_change(&mut self, policy: PolicyId) -> bool {
        let raw = match self.read_raw(policy) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    policy = ?policy,
                    error = %e,
                    "failed to re-read settings, keeping current values"
                );
                return false;
            }
        };
        if raw == self.raw_settings(policy) {
            debug!(policy = ?policy, "settings unchanged, ignoring change event");
            return false;
        }
        self.apply_raw(policy, raw);
        self.notifier.notify_all(policy);
        true
    }

    /// Set `key` to `value`, persist, then notify. Routes to the owning policy.
    pub fn update_value(&mut self, key: &str, value: i64) -> StoreResult<()> {
        let policy = self.resolve_policy(key)?;
        self.update_policy_value(policy, key, value)
    }

    /// Like [`update_value`](Self::update_value) but `key` must belong to `policy`.
    ///
    /// The new raw string is written before the in-memory value changes, so
    /// a failed write leaves the table as it was.
    pub fn update_policy_value(
        &mut self,
        policy: PolicyId,
        key: &str,
        value: i64,
    ) -> StoreResult<()> {
        let table = self.catalog.table(policy);
        let current = table.get_current_value(key)?;
        if current == value {
            debug!(policy = ?policy, key = %key, value, "value unchanged, skipping write");
            return Ok(());
        }

        let mut candidate = table.clone();
        candidate.set_value(key, value)?;
        let raw = codec::encode(&candidate, self.scale);
        self.persist(policy, &raw)?;

        *self.catalog.table_mut(policy) = candidate;
        *self.raw_mut(policy) = raw;
        info!(policy = ?policy, key = %key, from = current, to = value, "factor updated");
        self.notifier.notify_all(policy);
        Ok(())
    }

    /// Drop every override of `policy`. No-op if there are none.
    pub fn reset_to_defaults(&mut self, policy: PolicyId) -> StoreResult<()> {
        if !self.table(policy).has_overrides() {
            debug!(policy = ?policy, "no overrides to reset");
            return Ok(());
        }
        self.persist(policy, "")?;
        self.catalog.table_mut(policy).reset_to_defaults();
        self.raw_mut(policy).clear();
        info!(policy = ?policy, "policy reset to defaults");
        self.notifier.notify_all(policy);
        Ok(())
    }

    fn persist(&mut self, policy: PolicyId, raw: &str) -> StoreResult<()> {
        self.provider
            .write_string(policy.settings_id(), raw)
            .map_err(|source| StoreError::Persist { policy, source })
    }
}
