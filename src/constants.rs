//! Application-wide constants
//!
//! Settings ids, unit names and config defaults live here so the rest of
//! the crate has a single source of truth for them.

/// Currency units
pub mod units {
    /// Number of cakes (micro-units) in one ARC (macro-unit)
    pub const CAKES_PER_ARC: i64 = 1_000_000_000;

    /// Token suffix for values written in ARCs
    pub const ARC_SUFFIX: &str = "A";

    /// Token suffix for values written in cakes
    pub const CAKE_SUFFIX: &str = "ck";
}

/// Settings provider keys
pub mod settings {
    /// Backing string for the alarm manager policy
    pub const ALARM_MANAGER_ID: &str = "tare_alarm_manager_constants";

    /// Backing string for the job scheduler policy
    pub const JOB_SCHEDULER_ID: &str = "tare_job_scheduler_constants";

    /// Separator between `key=value` pairs
    pub const PAIR_SEPARATOR: char = ',';

    /// Separator between a key and its value token
    pub const KEY_VALUE_SEPARATOR: char = '=';

    /// File name of the JSON settings store
    pub const FILENAME: &str = "settings.json";
}

/// Config file locations
pub mod config {
    /// Directory under the platform config dir
    pub const APP_DIR: &str = "econ-policy";

    /// Config file name
    pub const FILENAME: &str = "config.json";
}

/// Config validation bounds
pub mod validation {
    /// Minimum settings file poll interval for `watch`
    pub const MIN_WATCH_INTERVAL_MS: u64 = 50;

    /// Maximum settings file poll interval for `watch`
    pub const MAX_WATCH_INTERVAL_MS: u64 = 60_000;
}

/// Store service
pub mod service {
    /// Capacity of the store command queue
    pub const QUEUE_CAPACITY: usize = 64;
}
