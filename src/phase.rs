//! Derivation of a resource's lifecycle phase from its conditions.
//!
//! The phase is never a source of truth: it is recomputed from the condition
//! list whenever it is needed. [`resolve`] evaluates a fixed set of rules in
//! priority order and returns on the first one that decides; the result is
//! a canonical [`Phase`] which callers project onto the phase enum of the API
//! generation they serve via [`phase_from_conditions`].

use crate::conditions::{
    has_condition, is_condition_false, is_condition_true, Condition, ACCEPTING_CONNECTION,
    DATA_RESTORED, DATA_RESTORE_STARTED, HALTED, HEALTH_CHECK_PAUSED, PROVISIONED,
    PROVISIONING_STARTED, READY, REPLICA_READY,
};
use derive_more::Display;

mod dashboard;
pub use dashboard::{dashboard_phase_from_conditions, DashboardPhase, DASHBOARD_SERVER_STATE_RED};

/// Canonical phase names shared by every API generation.
///
/// The unset phase has no variant; resolvers return `None` for it.
#[derive(Display, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
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

/// Resolves the canonical phase for a set of conditions.
pub fn resolve(conditions: &[Condition]) -> Option<Phase> {
    let provisioned = is_condition_true(conditions, PROVISIONED);

    if is_condition_true(conditions, HEALTH_CHECK_PAUSED) {
        return Some(Phase::Unknown);
    }

    let mut phase = None;
    if is_condition_true(conditions, PROVISIONING_STARTED) {
        phase = Some(Phase::Provisioning);
    }

    if is_condition_true(conditions, HALTED) {
        return Some(Phase::Halted);
    }

    if is_condition_true(conditions, DATA_RESTORE_STARTED) {
        if !has_condition(conditions, DATA_RESTORED) {
            return Some(Phase::DataRestoring);
        }
        // DataRestored=True falls through: producers never clear DataRestoreStarted.
        if is_condition_false(conditions, DATA_RESTORED) {
            return Some(Phase::NotReady);
        }
    } else if is_condition_false(conditions, DATA_RESTORED) {
        return Some(Phase::NotReady);
    }

    // Health rules only apply once initial provisioning has completed.
    if provisioned {
        if is_condition_false(conditions, ACCEPTING_CONNECTION) {
            return Some(Phase::NotReady);
        }
        if is_condition_false(conditions, REPLICA_READY) {
            return Some(Phase::Critical);
        }
        if is_condition_false(conditions, READY) {
            return Some(Phase::Critical);
        }
        if is_condition_true(conditions, READY) {
            return Some(Phase::Ready);
        }
    }

    phase
}

/// Resolves the phase and projects it onto the caller's phase enum.
pub fn phase_from_conditions<P: From<Phase>>(conditions: &[Condition]) -> Option<P> {
    resolve(conditions).map(P::from)
}
