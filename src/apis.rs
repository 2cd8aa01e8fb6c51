//! Typed API objects and the capability interface the phase controller
//! drives them through.

use crate::conditions::Condition;
use crate::Error;
use derive_more::Display;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use k8s_openapi::NamespaceResourceScope;
use kube::{CustomResourceExt, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::fmt::Debug;
use std::str::FromStr;

pub mod archiver;
pub mod dashboard;
pub mod v1;
pub mod v1alpha2;

/// Every kind whose phase is derived from its conditions.
#[derive(Display, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DatabaseKind {
    #[display("MySQL")]
    MySQL,
    #[display("Postgres")]
    Postgres,
    #[display("MongoDB")]
    MongoDB,
    #[display("Redis")]
    Redis,
    #[display("ElasticsearchDashboard")]
    ElasticsearchDashboard,
}

impl DatabaseKind {
    pub const ALL: [DatabaseKind; 5] = [
        DatabaseKind::MySQL,
        DatabaseKind::Postgres,
        DatabaseKind::MongoDB,
        DatabaseKind::Redis,
        DatabaseKind::ElasticsearchDashboard,
    ];
}

impl FromStr for DatabaseKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DatabaseKind::ALL
            .into_iter()
            .find(|kind| kind.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownKind(s.to_owned()))
    }
}

/// A phase value as stored in a status sub-resource.
pub trait PhaseValue: Copy + PartialEq + Debug + std::fmt::Display + Serialize + Send + Sync {
    /// Phases reported as warnings when a resource enters them.
    fn is_unhealthy(&self) -> bool;
}

/// A namespaced custom resource whose phase is a projection of its conditions.
pub trait PhasedResource:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + CustomResourceExt
    + Clone
    + Debug
    + DeserializeOwned
    + Serialize
    + Send
    + Sync
    + 'static
{
    const KIND: DatabaseKind;
    type Phase: PhaseValue;

    fn conditions(&self) -> &[Condition];

    /// The phase currently recorded in the status, if any.
    fn current_phase(&self) -> Option<Self::Phase>;

    fn resolve_phase(&self) -> Option<Self::Phase>;

    /// Server-side apply body for the status sub-resource. Without a phase
    /// the body omits `status.phase`, which releases the field.
    fn status_patch(phase: Option<Self::Phase>) -> serde_json::Value {
        let status = match phase {
            Some(phase) => json!({ "phase": phase }),
            None => json!({}),
        };
        json!({
            "apiVersion": Self::api_version(&()),
            "kind": Self::kind(&()),
            "status": status
        })
    }
}

#[derive(Clone, Debug)]
pub struct KindEntry {
    pub kind: DatabaseKind,
    pub crd: CustomResourceDefinition,
}

/// The set of kinds a hosting application serves.
///
/// Built explicitly at startup and handed to whatever needs it; nothing
/// registers itself.
#[derive(Clone, Debug, Default)]
pub struct KindRegistry {
    entries: Vec<KindEntry>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `K`; registering a kind twice keeps the first entry.
    pub fn register<K: PhasedResource>(mut self) -> Self {
        if !self.contains(K::KIND) {
            self.entries.push(KindEntry {
                kind: K::KIND,
                crd: K::crd(),
            });
        }
        self
    }

    pub fn all() -> Self {
        Self::for_kinds(&DatabaseKind::ALL)
    }

    pub fn for_kinds(kinds: &[DatabaseKind]) -> Self {
        kinds.iter().fold(Self::new(), |registry, kind| match kind {
            DatabaseKind::MySQL => registry.register::<v1::MySQL>(),
            DatabaseKind::Postgres => registry.register::<v1::Postgres>(),
            DatabaseKind::MongoDB => registry.register::<v1::MongoDB>(),
            DatabaseKind::Redis => registry.register::<v1::Redis>(),
            DatabaseKind::ElasticsearchDashboard => registry.register::<dashboard::ElasticsearchDashboard>(),
        })
    }

    pub fn contains(&self, kind: DatabaseKind) -> bool {
        self.entries.iter().any(|e| e.kind == kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = DatabaseKind> + '_ {
        self.entries.iter().map(|e| e.kind)
    }

    pub fn crds(&self) -> impl Iterator<Item = &CustomResourceDefinition> + '_ {
        self.entries.iter().map(|e| &e.crd)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
