//! `kubedb.com/v1alpha2`, the generation preceding [`super::v1`].
//!
//! Objects of this generation are still served for reading; their status is
//! converted to the `v1` shape through the canonical [`Phase`].

use super::{v1, PhaseValue};
use crate::conditions::Condition;
use crate::phase::Phase;
use derive_more::Display;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Display, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash, JsonSchema)]
pub enum DatabasePhase {
    #[display("Provisioning")]
    Provisioning,
    #[display("DataRestoring")]
    DataRestoring,
    #[display("NotReady")]
    NotReady,
    #[display("Critical")]
    Critical,
    #[display("Ready")]
    Ready,
    #[display("Halted")]
    Halted,
    #[display("Unknown")]
    Unknown,
}

impl From<Phase> for DatabasePhase {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Provisioning => DatabasePhase::Provisioning,
            Phase::DataRestoring => DatabasePhase::DataRestoring,
            Phase::NotReady => DatabasePhase::NotReady,
            Phase::Critical => DatabasePhase::Critical,
            Phase::Ready => DatabasePhase::Ready,
            Phase::Halted => DatabasePhase::Halted,
            Phase::Unknown => DatabasePhase::Unknown,
        }
    }
}

impl From<DatabasePhase> for Phase {
    fn from(phase: DatabasePhase) -> Self {
        match phase {
            DatabasePhase::Provisioning => Phase::Provisioning,
            DatabasePhase::DataRestoring => Phase::DataRestoring,
            DatabasePhase::NotReady => Phase::NotReady,
            DatabasePhase::Critical => Phase::Critical,
            DatabasePhase::Ready => Phase::Ready,
            DatabasePhase::Halted => Phase::Halted,
            DatabasePhase::Unknown => Phase::Unknown,
        }
    }
}

impl PhaseValue for DatabasePhase {
    fn is_unhealthy(&self) -> bool {
        matches!(self, DatabasePhase::NotReady | DatabasePhase::Critical | DatabasePhase::Halted)
    }
}

/// Predecessor of [`v1::DeletionPolicy`].
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq, JsonSchema)]
pub enum TerminationPolicy {
    #[default]
    Delete,
    Halt,
    WipeOut,
    DoNotTerminate,
}

impl From<TerminationPolicy> for v1::DeletionPolicy {
    fn from(policy: TerminationPolicy) -> Self {
        match policy {
            TerminationPolicy::Delete => v1::DeletionPolicy::Delete,
            TerminationPolicy::Halt => v1::DeletionPolicy::Halt,
            TerminationPolicy::WipeOut => v1::DeletionPolicy::WipeOut,
            TerminationPolicy::DoNotTerminate => v1::DeletionPolicy::DoNotTerminate,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<DatabasePhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl From<DatabaseStatus> for v1::DatabaseStatus {
    fn from(status: DatabaseStatus) -> Self {
        Self {
            phase: status.phase.map(|p| Phase::from(p).into()),
            observed_generation: status.observed_generation,
            conditions: status.conditions,
        }
    }
}

impl From<v1::DatabaseStatus> for DatabaseStatus {
    fn from(status: v1::DatabaseStatus) -> Self {
        Self {
            phase: status.phase.map(|p| Phase::from(p).into()),
            observed_generation: status.observed_generation,
            conditions: status.conditions,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::conditions::{HALTED, READY};

    #[test]
    fn status_converts_between_generations() {
        let old = DatabaseStatus {
            phase: Some(DatabasePhase::Halted),
            observed_generation: Some(4),
            conditions: vec![Condition::new(HALTED, true), Condition::new(READY, false)],
        };
        let new: v1::DatabaseStatus = old.clone().into();
        assert_eq!(new.phase, Some(v1::DatabasePhase::Halted));
        assert_eq!(new.observed_generation, Some(4));
        assert_eq!(new.conditions, old.conditions);

        let back: DatabaseStatus = new.into();
        assert_eq!(back, old);
    }

    #[test]
    fn phases_serialize_identically_in_both_generations() {
        for phase in [
            Phase::Provisioning,
            Phase::DataRestoring,
            Phase::NotReady,
            Phase::Critical,
            Phase::Ready,
            Phase::Halted,
            Phase::Unknown,
        ] {
            let old = serde_json::to_value(DatabasePhase::from(phase)).unwrap();
            let new = serde_json::to_value(v1::DatabasePhase::from(phase)).unwrap();
            assert_eq!(old, new);
            assert_eq!(old, serde_json::Value::String(phase.to_string()));
        }
    }

    #[test]
    fn termination_policy_maps_to_deletion_policy() {
        assert_eq!(v1::DeletionPolicy::from(TerminationPolicy::WipeOut), v1::DeletionPolicy::WipeOut);
        assert_eq!(v1::DeletionPolicy::from(TerminationPolicy::default()), v1::DeletionPolicy::Delete);
    }
}
