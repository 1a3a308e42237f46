//! Static factor catalog for both policies
//!
//! Every tunable the economy exposes is listed here once, with its display
//! title and default. Defaults are stored in cakes.

use serde::{Deserialize, Serialize};

use crate::constants::settings::{ALARM_MANAGER_ID, JOB_SCHEDULER_ID};
use crate::constants::units::CAKES_PER_ARC;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyId {
    AlarmManager,
    JobScheduler,
}

impl PolicyId {
    pub const ALL: [PolicyId; 2] = [PolicyId::AlarmManager, PolicyId::JobScheduler];

    /// Key under which the settings provider stores this policy's raw string
    pub fn settings_id(self) -> &'static str {
        match self {
            PolicyId::AlarmManager => ALARM_MANAGER_ID,
            PolicyId::JobScheduler => JOB_SCHEDULER_ID,
        }
    }

    /// Prefix shared by all keys of this policy
    pub fn key_prefix(self) -> &'static str {
        match self {
            PolicyId::AlarmManager => "am_",
            PolicyId::JobScheduler => "js_",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PolicyId::AlarmManager => "AlarmManager",
            PolicyId::JobScheduler => "JobScheduler",
        }
    }

    pub fn from_settings_id(id: &str) -> Option<PolicyId> {
        Self::ALL.into_iter().find(|policy| policy.settings_id() == id)
    }
}

/// Section a factor is listed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorGroup {
    Balances,
    ConsumptionLimits,
    Rewards,
    Actions,
}

impl FactorGroup {
    pub fn title(self) -> &'static str {
        match self {
            FactorGroup::Balances => "Balances",
            FactorGroup::ConsumptionLimits => "Consumption limits",
            FactorGroup::Rewards => "Rewards",
            FactorGroup::Actions => "Actions",
        }
    }
}

/// Immutable description of one factor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorDescriptor {
    pub key: &'static str,
    pub title: &'static str,
    pub group: FactorGroup,
    pub default_value: i64,
    pub policy: PolicyId,
}

const fn arcs(whole: i64) -> i64 {
    whole * CAKES_PER_ARC
}

const fn factor(
    policy: PolicyId,
    group: FactorGroup,
    key: &'static str,
    title: &'static str,
    default_value: i64,
) -> FactorDescriptor {
    FactorDescriptor { key, title, group, default_value, policy }
}

use FactorGroup::*;
use PolicyId::*;

const ALARM_MANAGER_FACTORS: &[FactorDescriptor] = &[
    factor(
        AlarmManager,
        Balances,
        "am_min_satiated_balance_exempted",
        "Min satiated balance (exempted)",
        arcs(500),
    ),
    factor(
        AlarmManager,
        Balances,
        "am_min_satiated_balance_headless_system_app",
        "Min satiated balance (headless system app)",
        arcs(256),
    ),
    factor(
        AlarmManager,
        Balances,
        "am_min_satiated_balance_other_app",
        "Min satiated balance (other app)",
        arcs(160),
    ),
    factor(AlarmManager, Balances, "am_max_satiated_balance", "Max satiated balance", arcs(960)),
    factor(
        AlarmManager,
        ConsumptionLimits,
        "am_initial_consumption_limit",
        "Initial consumption limit",
        arcs(2_880),
    ),
    factor(
        AlarmManager,
        ConsumptionLimits,
        "am_min_consumption_limit",
        "Min consumption limit",
        arcs(1_440),
    ),
    factor(
        AlarmManager,
        ConsumptionLimits,
        "am_hard_consumption_limit",
        "Hard consumption limit",
        arcs(15_000),
    ),
    factor(AlarmManager, Rewards, "am_reward_top_activity_instant", "Top activity: instant", 0),
    factor(
        AlarmManager,
        Rewards,
        "am_reward_top_activity_ongoing",
        "Top activity: ongoing",
        CAKES_PER_ARC / 100,
    ),
    factor(AlarmManager, Rewards, "am_reward_top_activity_max", "Top activity: max", arcs(500)),
    factor(
        AlarmManager,
        Rewards,
        "am_reward_notification_seen_instant",
        "Notification seen: instant",
        arcs(3),
    ),
    factor(
        AlarmManager,
        Rewards,
        "am_reward_notification_interaction_instant",
        "Notification interaction: instant",
        arcs(5),
    ),
    factor(
        AlarmManager,
        Rewards,
        "am_reward_widget_interaction_instant",
        "Widget interaction: instant",
        arcs(10),
    ),
    factor(
        AlarmManager,
        Rewards,
        "am_reward_other_user_interaction_instant",
        "Other user interaction: instant",
        arcs(10),
    ),
    factor(
        AlarmManager,
        Actions,
        "am_action_alarm_allow_while_idle_exact_wakeup_ctp",
        "Allow-while-idle exact wakeup alarm: cost to produce",
        arcs(3),
    ),
    factor(
        AlarmManager,
        Actions,
        "am_action_alarm_exact_wakeup_ctp",
        "Exact wakeup alarm: cost to produce",
        arcs(3),
    ),
    factor(
        AlarmManager,
        Actions,
        "am_action_alarm_inexact_wakeup_ctp",
        "Inexact wakeup alarm: cost to produce",
        arcs(3),
    ),
    factor(
        AlarmManager,
        Actions,
        "am_action_alarm_exact_nonwakeup_ctp",
        "Exact non-wakeup alarm: cost to produce",
        arcs(1),
    ),
    factor(
        AlarmManager,
        Actions,
        "am_action_alarm_alarmclock_ctp",
        "Alarm clock: cost to produce",
        arcs(5),
    ),
    factor(
        AlarmManager,
        Actions,
        "am_action_alarm_allow_while_idle_exact_wakeup_base_price",
        "Allow-while-idle exact wakeup alarm: base price",
        arcs(5),
    ),
    factor(
        AlarmManager,
        Actions,
        "am_action_alarm_exact_wakeup_base_price",
        "Exact wakeup alarm: base price",
        arcs(4),
    ),
    factor(
        AlarmManager,
        Actions,
        "am_action_alarm_alarmclock_base_price",
        "Alarm clock: base price",
        arcs(10),
    ),
];

const JOB_SCHEDULER_FACTORS: &[FactorDescriptor] = &[
    factor(
        JobScheduler,
        Balances,
        "js_min_satiated_balance_exempted",
        "Min satiated balance (exempted)",
        arcs(15_000),
    ),
    factor(
        JobScheduler,
        Balances,
        "js_min_satiated_balance_headless_system_app",
        "Min satiated balance (headless system app)",
        arcs(7_500),
    ),
    factor(
        JobScheduler,
        Balances,
        "js_min_satiated_balance_other_app",
        "Min satiated balance (other app)",
        arcs(2_000),
    ),
    factor(JobScheduler, Balances, "js_max_satiated_balance", "Max satiated balance", arcs(60_000)),
    factor(
        JobScheduler,
        ConsumptionLimits,
        "js_initial_consumption_limit",
        "Initial consumption limit",
        arcs(29_000),
    ),
    factor(
        JobScheduler,
        ConsumptionLimits,
        "js_min_consumption_limit",
        "Min consumption limit",
        arcs(17_000),
    ),
    factor(
        JobScheduler,
        ConsumptionLimits,
        "js_hard_consumption_limit",
        "Hard consumption limit",
        arcs(250_000),
    ),
    factor(JobScheduler, Rewards, "js_reward_top_activity_instant", "Top activity: instant", 0),
    factor(
        JobScheduler,
        Rewards,
        "js_reward_top_activity_ongoing",
        "Top activity: ongoing",
        CAKES_PER_ARC / 2,
    ),
    factor(JobScheduler, Rewards, "js_reward_top_activity_max", "Top activity: max", arcs(15_000)),
    factor(
        JobScheduler,
        Rewards,
        "js_reward_notification_seen_instant",
        "Notification seen: instant",
        arcs(1),
    ),
    factor(
        JobScheduler,
        Rewards,
        "js_reward_notification_interaction_instant",
        "Notification interaction: instant",
        arcs(5),
    ),
    factor(
        JobScheduler,
        Rewards,
        "js_reward_widget_interaction_instant",
        "Widget interaction: instant",
        arcs(10),
    ),
    factor(
        JobScheduler,
        Rewards,
        "js_reward_other_user_interaction_instant",
        "Other user interaction: instant",
        arcs(10),
    ),
    factor(
        JobScheduler,
        Actions,
        "js_action_job_max_start_ctp",
        "Max priority job start: cost to produce",
        arcs(3),
    ),
    factor(
        JobScheduler,
        Actions,
        "js_action_job_max_running_ctp",
        "Max priority job running: cost to produce",
        arcs(2),
    ),
    factor(
        JobScheduler,
        Actions,
        "js_action_job_high_start_ctp",
        "High priority job start: cost to produce",
        arcs(3),
    ),
    factor(
        JobScheduler,
        Actions,
        "js_action_job_high_running_ctp",
        "High priority job running: cost to produce",
        arcs(2),
    ),
    factor(
        JobScheduler,
        Actions,
        "js_action_job_default_start_ctp",
        "Default priority job start: cost to produce",
        arcs(3),
    ),
    factor(
        JobScheduler,
        Actions,
        "js_action_job_default_running_ctp",
        "Default priority job running: cost to produce",
        arcs(2),
    ),
    factor(
        JobScheduler,
        Actions,
        "js_action_job_low_start_ctp",
        "Low priority job start: cost to produce",
        arcs(3),
    ),
    factor(
        JobScheduler,
        Actions,
        "js_action_job_low_running_ctp",
        "Low priority job running: cost to produce",
        arcs(2),
    ),
    factor(
        JobScheduler,
        Actions,
        "js_action_job_min_start_ctp",
        "Min priority job start: cost to produce",
        arcs(3),
    ),
    factor(
        JobScheduler,
        Actions,
        "js_action_job_min_running_ctp",
        "Min priority job running: cost to produce",
        arcs(2),
    ),
    factor(
        JobScheduler,
        Actions,
        "js_action_job_timeout_penalty_ctp",
        "Job timeout penalty: cost to produce",
        arcs(30),
    ),
];

/// All descriptors belonging to `policy`, in display order
pub fn descriptors(policy: PolicyId) -> &'static [FactorDescriptor] {
    match policy {
        PolicyId::AlarmManager => ALARM_MANAGER_FACTORS,
        PolicyId::JobScheduler => JOB_SCHEDULER_FACTORS,
    }
}
