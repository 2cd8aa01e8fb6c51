use crate::conditions::{
    get_condition, is_condition_true, Condition, ConditionStatus, ACCEPTING_CONNECTION, PROVISIONED,
    SERVER_HEALTHY,
};
use derive_more::Display;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reason reported on `ServerHealthy=False` when the backing cluster is red.
pub const DASHBOARD_SERVER_STATE_RED: &str = "Red";

/// Phase of a dashboard sub-resource.
#[derive(Display, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash, JsonSchema)]
pub enum DashboardPhase {
    #[display("Provisioning")]
    Provisioning,
    #[display("Ready")]
    Ready,
    #[display("Critical")]
    Critical,
    #[display("NotReady")]
    NotReady,
}

pub fn dashboard_phase_from_conditions(conditions: &[Condition]) -> DashboardPhase {
    if !is_condition_true(conditions, PROVISIONED) {
        return DashboardPhase::Provisioning;
    }
    if !is_condition_true(conditions, ACCEPTING_CONNECTION) {
        return DashboardPhase::NotReady;
    }

    match get_condition(conditions, SERVER_HEALTHY) {
        Some((_, c)) if c.status == ConditionStatus::True => DashboardPhase::Ready,
        Some((_, c)) if c.status == ConditionStatus::False => {
            if c.reason == DASHBOARD_SERVER_STATE_RED {
                DashboardPhase::NotReady
            } else {
                DashboardPhase::Critical
            }
        }
        _ => DashboardPhase::NotReady,
    }
}
