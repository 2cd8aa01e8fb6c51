//! `archiver.kubedb.com/v1alpha1` archivers and their consumer rules.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where consumers of an archiver may live.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum FromNamespaces {
    /// Any namespace.
    All,
    /// Only the archiver's own namespace.
    Same,
    /// Namespaces matching `selector`.
    Selector,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct ConsumerNamespaces {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<FromNamespaces>,
    /// Only used with `from: Selector`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,
}

/// The archiver side of the double opt-in.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct AllowedConsumers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<ConsumerNamespaces>,
    /// Labels a database must carry to be archived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,
}

#[derive(CustomResource, Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[kube(
    kind = "PostgresArchiver",
    group = "archiver.kubedb.com",
    version = "v1alpha1",
    namespaced,
    shortname = "pgarchiver"
)]
#[serde(rename_all = "camelCase")]
pub struct PostgresArchiverSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub databases: Option<AllowedConsumers>,
    /// A paused archiver is not picked up by databases discovering one.
    #[serde(default)]
    pub pause: bool,
}

/// Read access to the fields the archiver selection needs.
pub trait Archiver: kube::ResourceExt {
    fn consumers(&self) -> Option<&AllowedConsumers>;
    fn paused(&self) -> bool;
}

impl Archiver for PostgresArchiver {
    fn consumers(&self) -> Option<&AllowedConsumers> {
        self.spec.databases.as_ref()
    }

    fn paused(&self) -> bool {
        self.spec.pause
    }
}
