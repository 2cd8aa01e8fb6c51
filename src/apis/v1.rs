//! `kubedb.com/v1` database kinds.

use super::{DatabaseKind, PhaseValue, PhasedResource};
use crate::conditions::Condition;
use crate::phase::{phase_from_conditions, Phase};
use derive_more::Display;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Lifecycle phase of a `kubedb.com/v1` database.
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

/// The status object shared by every `kubedb.com/v1` database.
#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStatus {
    /// Derived from `conditions`; absent until a phase can be determined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<DatabasePhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// What happens to the data when the database object is deleted.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq, JsonSchema)]
pub enum DeletionPolicy {
    #[default]
    Delete,
    Halt,
    WipeOut,
    DoNotTerminate,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i32>,
    /// Consecutive failed checks before the database is reported unhealthy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_threshold: Option<i32>,
    #[serde(default)]
    pub disable_write_check: bool,
}

/// A reference to an object, optionally in another namespace.
#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, Eq, JsonSchema)]
pub struct NamespacedRef {
    pub name: String,
    /// Defaults to the namespace of the referencing object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Archiver binding of a database.
#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, Eq, JsonSchema)]
pub struct ArchiverOptions {
    /// Pins the database to one archiver instead of discovering it.
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub ref_: Option<NamespacedRef>,
}

#[derive(CustomResource, Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[kube(
    kind = "MySQL",
    group = "kubedb.com",
    version = "v1",
    plural = "mysqls",
    namespaced,
    status = "DatabaseStatus",
    shortname = "my",
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".spec.version"}"#,
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.phase"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MySQLSpec {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<DeletionPolicy>,
    /// Keeps the database's data but stops serving it.
    #[serde(default)]
    pub halted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_checker: Option<HealthCheckSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archiver: Option<ArchiverOptions>,
    #[serde(default, rename = "requireSSL")]
    pub require_ssl: bool,
}

#[derive(CustomResource, Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[kube(
    kind = "Postgres",
    group = "kubedb.com",
    version = "v1",
    plural = "postgreses",
    namespaced,
    status = "DatabaseStatus",
    shortname = "pg",
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".spec.version"}"#,
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.phase"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PostgresSpec {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<DeletionPolicy>,
    #[serde(default)]
    pub halted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_checker: Option<HealthCheckSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archiver: Option<ArchiverOptions>,
    /// `md5` or `scram`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_auth_mode: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, Eq, JsonSchema)]
pub struct ReplicaSetSpec {
    pub name: String,
}

#[derive(CustomResource, Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[kube(
    kind = "MongoDB",
    group = "kubedb.com",
    version = "v1",
    plural = "mongodbs",
    namespaced,
    status = "DatabaseStatus",
    shortname = "mg",
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".spec.version"}"#,
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.phase"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MongoDBSpec {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<DeletionPolicy>,
    #[serde(default)]
    pub halted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_checker: Option<HealthCheckSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archiver: Option<ArchiverOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_set: Option<ReplicaSetSpec>,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq, JsonSchema)]
pub enum RedisMode {
    #[default]
    Standalone,
    Cluster,
    Sentinel,
}

#[derive(CustomResource, Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[kube(
    kind = "Redis",
    group = "kubedb.com",
    version = "v1",
    plural = "redises",
    namespaced,
    status = "DatabaseStatus",
    shortname = "rd",
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".spec.version"}"#,
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.phase"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RedisSpec {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<DeletionPolicy>,
    #[serde(default)]
    pub halted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_checker: Option<HealthCheckSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archiver: Option<ArchiverOptions>,
    #[serde(default)]
    pub mode: RedisMode,
}

/// Read access to the fields the archiver selection needs.
pub trait ArchivedDatabase: kube::ResourceExt {
    fn archiver_ref(&self) -> Option<&NamespacedRef>;
}

macro_rules! database_resource {
    ($ty:ty, $kind:expr) => {
        impl PhasedResource for $ty {
            const KIND: DatabaseKind = $kind;
            type Phase = DatabasePhase;

            fn conditions(&self) -> &[Condition] {
                self.status.as_ref().map(|s| s.conditions.as_slice()).unwrap_or(&[])
            }

            fn current_phase(&self) -> Option<DatabasePhase> {
                self.status.as_ref().and_then(|s| s.phase)
            }

            fn resolve_phase(&self) -> Option<DatabasePhase> {
                phase_from_conditions(self.conditions())
            }
        }

        impl ArchivedDatabase for $ty {
            fn archiver_ref(&self) -> Option<&NamespacedRef> {
                self.spec.archiver.as_ref().and_then(|a| a.ref_.as_ref())
            }
        }
    };
}

database_resource!(MySQL, DatabaseKind::MySQL);
database_resource!(Postgres, DatabaseKind::Postgres);
database_resource!(MongoDB, DatabaseKind::MongoDB);
database_resource!(Redis, DatabaseKind::Redis);
