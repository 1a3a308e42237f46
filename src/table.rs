//! Per-policy factor tables
//!
//! A table is built once from the catalog and never gains or loses keys;
//! only the current values change.

use std::collections::HashMap;

use serde::Serialize;

use crate::catalog::{self, FactorDescriptor, FactorGroup, PolicyId};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorEntry {
    pub descriptor: FactorDescriptor,
    pub current_value: i64,
}

impl FactorEntry {
    pub fn new(descriptor: FactorDescriptor) -> Self {
        Self {
            current_value: descriptor.default_value,
            descriptor,
        }
    }

    pub fn key(&self) -> &'static str {
        self.descriptor.key
    }

    pub fn is_overridden(&self) -> bool {
        self.current_value != self.descriptor.default_value
    }
}

/// Value copy of one entry handed to presentation code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactorSnapshot {
    pub key: String,
    pub title: String,
    pub group: FactorGroup,
    pub policy: PolicyId,
    pub default_value: i64,
    pub current_value: i64,
}

impl FactorSnapshot {
    pub fn is_overridden(&self) -> bool {
        self.current_value != self.default_value
    }
}

impl From<&FactorEntry> for FactorSnapshot {
    fn from(entry: &FactorEntry) -> Self {
        Self {
            key: entry.descriptor.key.to_string(),
            title: entry.descriptor.title.to_string(),
            group: entry.descriptor.group,
            policy: entry.descriptor.policy,
            default_value: entry.descriptor.default_value,
            current_value: entry.current_value,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PolicyTable {
    policy: PolicyId,
    // Catalog order, so encoding is deterministic
    entries: Vec<FactorEntry>,
    index: HashMap<&'static str, usize>,
}

impl PolicyTable {
    pub fn new(policy: PolicyId, descriptors: &[FactorDescriptor]) -> Self {
        let entries: Vec<FactorEntry> = descriptors.iter().cloned().map(FactorEntry::new).collect();
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.key(), i))
            .collect();
        Self { policy, entries, index }
    }

    /// Table for `policy` populated with catalog defaults
    pub fn from_catalog(policy: PolicyId) -> Self {
        Self::new(policy, catalog::descriptors(policy))
    }

    pub fn policy(&self) -> PolicyId {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = &FactorEntry> {
        self.entries.iter()
    }

    pub fn entry(&self, key: &str) -> StoreResult<&FactorEntry> {
        self.index
            .get(key)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| StoreError::UnknownKey(key.to_string()))
    }

    pub fn get_title(&self, key: &str) -> StoreResult<&'static str> {
        self.entry(key).map(|entry| entry.descriptor.title)
    }

    pub fn get_current_value(&self, key: &str) -> StoreResult<i64> {
        self.entry(key).map(|entry| entry.current_value)
    }

    pub fn get_default_value(&self, key: &str) -> StoreResult<i64> {
        self.entry(key).map(|entry| entry.descriptor.default_value)
    }

    /// Returns the previous value
    pub fn set_value(&mut self, key: &str, value: i64) -> StoreResult<i64> {
        let &i = self
            .index
            .get(key)
            .ok_or_else(|| StoreError::UnknownKey(key.to_string()))?;
        Ok(std::mem::replace(&mut self.entries[i].current_value, value))
    }

    /// Overwrite every entry: keys present in `values` take that value,
    /// all others fall back to their default. Unknown keys are ignored.
    pub fn apply(&mut self, values: &HashMap<String, i64>) {
        for entry in &mut self.entries {
            entry.current_value = values
                .get(entry.descriptor.key)
                .copied()
                .unwrap_or(entry.descriptor.default_value);
        }
    }

    pub fn reset_to_defaults(&mut self) {
        for entry in &mut self.entries {
            entry.current_value = entry.descriptor.default_value;
        }
    }

    pub fn has_overrides(&self) -> bool {
        self.entries.iter().any(FactorEntry::is_overridden)
    }

    /// Current values of the keys that differ from their default
    pub fn overrides(&self) -> HashMap<String, i64> {
        self.entries
            .iter()
            .filter(|entry| entry.is_overridden())
            .map(|entry| (entry.key().to_string(), entry.current_value))
            .collect()
    }

    pub fn snapshot(&self) -> Vec<FactorSnapshot> {
        self.entries.iter().map(FactorSnapshot::from).collect()
    }
}

/// Both policy tables, with key routing between them
#[derive(Debug, Clone)]
pub struct Catalog {
    alarm_manager: PolicyTable,
    job_scheduler: PolicyTable,
}

impl Catalog {
    pub fn new(alarm_manager: PolicyTable, job_scheduler: PolicyTable) -> Self {
        Self { alarm_manager, job_scheduler }
    }

    pub fn from_defaults() -> Self {
        Self::new(
            PolicyTable::from_catalog(PolicyId::AlarmManager),
            PolicyTable::from_catalog(PolicyId::JobScheduler),
        )
    }

    pub fn table(&self, policy: PolicyId) -> &PolicyTable {
        match policy {
            PolicyId::AlarmManager => &self.alarm_manager,
            PolicyId::JobScheduler => &self.job_scheduler,
        }
    }

    pub fn table_mut(&mut self, policy: PolicyId) -> &mut PolicyTable {
        match policy {
            PolicyId::AlarmManager => &mut self.alarm_manager,
            PolicyId::JobScheduler => &mut self.job_scheduler,
        }
    }

    /// Which policy owns `key`
    pub fn resolve_policy(&self, key: &str) -> StoreResult<PolicyId> {
        PolicyId::ALL
            .into_iter()
            .find(|&policy| self.table(policy).contains(key))
            .ok_or_else(|| StoreError::UnknownKey(key.to_string()))
    }

    pub fn get_title(&self, key: &str) -> StoreResult<&'static str> {
        self.table(self.resolve_policy(key)?).get_title(key)
    }

    pub fn get_current_value(&self, key: &str) -> StoreResult<i64> {
        self.table(self.resolve_policy(key)?).get_current_value(key)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const TEST_FACTORS: &[FactorDescriptor] = &[
        FactorDescriptor {
            key: "k1",
            title: "First",
            group: FactorGroup::Balances,
            default_value: 0,
            policy: PolicyId::AlarmManager,
        },
        FactorDescriptor {
            key: "k2",
            title: "Second",
            group: FactorGroup::Rewards,
            default_value: 999,
            policy: PolicyId::AlarmManager,
        },
    ];

    pub(crate) fn test_table() -> PolicyTable {
        PolicyTable::new(PolicyId::AlarmManager, TEST_FACTORS)
    }

    #[test]
    fn test_new_table_holds_defaults() {
        let table = test_table();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get_current_value("k1").unwrap(), 0);
        assert_eq!(table.get_current_value("k2").unwrap(), 999);
        assert_eq!(table.get_title("k2").unwrap(), "Second");
        assert!(!table.has_overrides());
    }

    #[test]
    fn test_unknown_key() {
        let mut table = test_table();
        assert!(table.get_title("nope").unwrap_err().is_unknown_key());
        assert!(table.get_current_value("nope").unwrap_err().is_unknown_key());
        assert!(table.set_value("nope", 1).unwrap_err().is_unknown_key());
        assert_eq!(table.overrides().len(), 0);
    }

    #[test]
    fn test_set_value_returns_previous() {
        let mut table = test_table();
        assert_eq!(table.set_value("k1", 42).unwrap(), 0);
        assert_eq!(table.set_value("k1", 43).unwrap(), 42);
        assert_eq!(table.overrides(), HashMap::from([("k1".to_string(), 43)]));
    }

    #[test]
    fn test_apply_resets_absent_keys() {
        let mut table = test_table();
        table.set_value("k2", 5).unwrap();

        table.apply(&HashMap::from([
            ("k1".to_string(), 7),
            ("stranger".to_string(), 1),
        ]));

        assert_eq!(table.get_current_value("k1").unwrap(), 7);
        assert_eq!(table.get_current_value("k2").unwrap(), 999);
    }

    #[test]
    fn test_snapshot_is_a_copy_in_catalog_order() {
        let mut table = test_table();
        table.set_value("k1", 10).unwrap();
        let snapshot = table.snapshot();
        table.set_value("k1", 20).unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].key, "k1");
        assert_eq!(snapshot[0].current_value, 10);
        assert!(snapshot[0].is_overridden());
        assert_eq!(snapshot[1].key, "k2");
        assert!(!snapshot[1].is_overridden());
    }

    #[test]
    fn test_catalog_resolves_policy() {
        let catalog = Catalog::from_defaults();
        assert_eq!(
            catalog.resolve_policy("am_min_consumption_limit").unwrap(),
            PolicyId::AlarmManager
        );
        assert_eq!(
            catalog.resolve_policy("js_max_satiated_balance").unwrap(),
            PolicyId::JobScheduler
        );
        assert!(catalog.resolve_policy("nonexistent").unwrap_err().is_unknown_key());
    }

    #[test]
    fn test_catalog_reads_route_by_key() {
        let catalog = Catalog::from_defaults();
        assert_eq!(catalog.get_title("js_max_satiated_balance").unwrap(), "Max satiated balance");
        assert_eq!(
            catalog.get_current_value("am_max_satiated_balance").unwrap(),
            960 * crate::constants::units::CAKES_PER_ARC
        );
    }
}
