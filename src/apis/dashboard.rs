//! `elasticsearch.kubedb.com/v1alpha1` dashboards.

use super::{DatabaseKind, PhaseValue, PhasedResource};
use crate::conditions::Condition;
use crate::phase::{dashboard_phase_from_conditions, DashboardPhase};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, Eq, JsonSchema)]
pub struct DatabaseRef {
    pub name: String,
}

#[derive(CustomResource, Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[kube(
    kind = "ElasticsearchDashboard",
    group = "elasticsearch.kubedb.com",
    version = "v1alpha1",
    namespaced,
    status = "DashboardStatus",
    shortname = "ed",
    printcolumn = r#"{"name":"Database","type":"string","jsonPath":".spec.databaseRef.name"}"#,
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.phase"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ElasticsearchDashboardSpec {
    /// The Elasticsearch database in the same namespace this dashboard serves.
    pub database_ref: DatabaseRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<DashboardPhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl PhaseValue for DashboardPhase {
    fn is_unhealthy(&self) -> bool {
        matches!(self, DashboardPhase::NotReady | DashboardPhase::Critical)
    }
}

impl PhasedResource for ElasticsearchDashboard {
    const KIND: DatabaseKind = DatabaseKind::ElasticsearchDashboard;
    type Phase = DashboardPhase;

    fn conditions(&self) -> &[Condition] {
        self.status.as_ref().map(|s| s.conditions.as_slice()).unwrap_or(&[])
    }

    fn current_phase(&self) -> Option<DashboardPhase> {
        self.status.as_ref().and_then(|s| s.phase)
    }

    fn resolve_phase(&self) -> Option<DashboardPhase> {
        Some(dashboard_phase_from_conditions(self.conditions()))
    }
}
