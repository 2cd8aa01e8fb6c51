//! Status conditions and the lookup helpers every resolver is built on.
//!
//! Conditions are owned by whichever reconciler observes a resource; the
//! helpers here only read them, except [`set_condition`] and
//! [`remove_condition`] which are used by condition producers.
//!
//! Lookups are linear scans and the first condition of a given type wins.

use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const PROVISIONING_STARTED: &str = "ProvisioningStarted";
pub const REPLICA_READY: &str = "ReplicaReady";
pub const ACCEPTING_CONNECTION: &str = "AcceptingConnection";
pub const DATA_RESTORE_STARTED: &str = "DataRestoreStarted";
pub const DATA_RESTORED: &str = "DataRestored";
pub const READY: &str = "Ready";
pub const HALTED: &str = "Halted";
pub const PAUSED: &str = "Paused";
pub const HEALTH_CHECK_PAUSED: &str = "HealthCheckPaused";
pub const PROVISIONED: &str = "Provisioned";

/// Dashboard server health, reported by the dashboard's own health check.
pub const SERVER_HEALTHY: &str = "ServerHealthy";

/// Tri-state status of a condition.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

impl ConditionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        }
    }
}

impl From<bool> for ConditionStatus {
    fn from(value: bool) -> Self {
        if value {
            ConditionStatus::True
        } else {
            ConditionStatus::False
        }
    }
}

impl From<&str> for ConditionStatus {
    fn from(value: &str) -> Self {
        match value {
            "True" => ConditionStatus::True,
            "False" => ConditionStatus::False,
            _ => ConditionStatus::Unknown,
        }
    }
}

/// One observed aspect of a resource's runtime state.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition, e.g. `Ready` or `Provisioned`.
    #[serde(rename = "type")]
    pub type_: String,
    /// Status of the condition, one of True, False, Unknown.
    pub status: ConditionStatus,
    /// The `.metadata.generation` the condition was set for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    /// Machine readable reason for the last transition.
    #[serde(default)]
    pub reason: String,
    /// Human readable details about the last transition.
    #[serde(default)]
    pub message: String,
    /// Last time the condition transitioned from one status to another.
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    pub fn new(type_: impl Into<String>, status: impl Into<ConditionStatus>) -> Self {
        Self {
            type_: type_.into(),
            status: status.into(),
            observed_generation: None,
            reason: String::new(),
            message: String::new(),
            last_transition_time: Utc::now(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_observed_generation(mut self, generation: i64) -> Self {
        self.observed_generation = Some(generation);
        self
    }

    pub fn at(mut self, time: DateTime<Utc>) -> Self {
        self.last_transition_time = time;
        self
    }

    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }

    pub fn is_false(&self) -> bool {
        self.status == ConditionStatus::False
    }
}

impl From<metav1::Condition> for Condition {
    fn from(c: metav1::Condition) -> Self {
        Self {
            status: ConditionStatus::from(c.status.as_str()),
            type_: c.type_,
            observed_generation: c.observed_generation,
            reason: c.reason,
            message: c.message,
            last_transition_time: c.last_transition_time.0,
        }
    }
}

impl From<Condition> for metav1::Condition {
    fn from(c: Condition) -> Self {
        Self {
            status: c.status.as_str().to_owned(),
            type_: c.type_,
            observed_generation: c.observed_generation,
            reason: c.reason,
            message: c.message,
            last_transition_time: metav1::Time(c.last_transition_time),
        }
    }
}

/// Returns the index and a reference to the first condition of `type_`.
pub fn get_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<(usize, &'a Condition)> {
    conditions.iter().enumerate().find(|(_, c)| c.type_ == type_)
}

pub fn has_condition(conditions: &[Condition], type_: &str) -> bool {
    get_condition(conditions, type_).is_some()
}

pub fn is_condition_true(conditions: &[Condition], type_: &str) -> bool {
    get_condition(conditions, type_).is_some_and(|(_, c)| c.is_true())
}

pub fn is_condition_false(conditions: &[Condition], type_: &str) -> bool {
    get_condition(conditions, type_).is_some_and(|(_, c)| c.is_false())
}

/// An absent condition counts as unknown.
pub fn is_condition_unknown(conditions: &[Condition], type_: &str) -> bool {
    get_condition(conditions, type_).map_or(true, |(_, c)| c.status == ConditionStatus::Unknown)
}

/// Inserts `new`, or updates the first condition of the same type in place.
///
/// The transition time of an existing condition only moves when its status
/// changes, so repeated reports of the same state keep the original time.
pub fn set_condition(conditions: &mut Vec<Condition>, new: Condition) {
    match conditions.iter_mut().find(|c| c.type_ == new.type_) {
        Some(existing) => {
            if existing.status != new.status {
                existing.last_transition_time = new.last_transition_time;
            }
            existing.status = new.status;
            existing.reason = new.reason;
            existing.message = new.message;
            existing.observed_generation = new.observed_generation;
        }
        None => conditions.push(new),
    }
}

/// Removes every condition of `type_`.
pub fn remove_condition(conditions: &mut Vec<Condition>, type_: &str) {
    conditions.retain(|c| c.type_ != type_);
}

/// Orders condition `a` against condition `b` by last transition time.
///
/// Absent conditions sort before present ones, so `Greater` means `a` is the
/// newer (or only) observation and `Equal` covers "both absent" as well as
/// identical timestamps.
///
/// As an integer (`ordering as i8`) the result is `1` for `Greater`, `-1` for
/// `Less` and `0` for `Equal`.
pub fn compare_last_transition_time(conditions: &[Condition], a: &str, b: &str) -> Ordering {
    match (get_condition(conditions, a), get_condition(conditions, b)) {
        (None, None) => Ordering::Equal,
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (Some((_, a)), Some((_, b))) => a.last_transition_time.cmp(&b.last_transition_time),
    }
}
