//! # kubedb-apimachinery
//!
//! API types of the KubeDB database operator and the logic that derives a
//! database's lifecycle phase from its status conditions. The phase-sync
//! controller binary keeps `.status.phase` of every served
//! kind in line with its conditions.

#![forbid(unsafe_code)]

use thiserror::Error;

pub mod apis;
pub mod archiver;
pub mod conditions;
pub mod config;
pub mod phase;

/// Expose all controller components used by main
pub mod controllers;

/// Log and trace integrations
pub mod telemetry;

/// Metrics
mod metrics;
pub use metrics::Metrics;

#[cfg(test)]
pub mod fixtures;

use crate::apis::{dashboard, v1, DatabaseKind, PhasedResource};
use crate::controllers::phase_event_recorder::PhaseEventRecorder;
use crate::controllers::phase_sync;
use chrono::{DateTime, Utc};
pub use config::Config;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use kube::api::ListParams;
use kube::runtime::events::{Recorder, Reporter};
use kube::runtime::watcher;
use kube::runtime::Controller;
use kube::{Api, Client, Resource};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

// Context for our reconciler
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client
    pub client: Client,
    /// Diagnostics read by the web server
    pub diagnostics: Arc<RwLock<Diagnostics>>,
    /// Prometheus metrics
    pub metrics: Metrics,
    /// Runtime settings
    pub config: Arc<Config>,
}

/// State shared between the controller and the web server
#[derive(Clone, Default)]
pub struct State {
    /// Diagnostics populated by the reconciler
    diagnostics: Arc<RwLock<Diagnostics>>,
    /// Metrics registry
    registry: prometheus::Registry,
}

/// State wrapper around the controller outputs for the web server
impl State {
    /// Events are reported under the same name that owns the applied status fields
    pub fn new(config: &Config) -> Self {
        Self {
            diagnostics: Arc::new(RwLock::new(Diagnostics::new(&config.field_manager))),
            registry: prometheus::Registry::default(),
        }
    }

    /// Metrics getter
    pub fn metrics(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }

    /// State getter
    pub async fn diagnostics(&self) -> Diagnostics {
        self.diagnostics.read().await.clone()
    }

    // Create a Controller Context that can update State
    pub fn to_context(&self, client: Client, config: Config) -> Result<Arc<Context>> {
        Ok(Arc::new(Context {
            client,
            metrics: Metrics::register(&self.registry)?,
            diagnostics: self.diagnostics.clone(),
            config: Arc::new(config),
        }))
    }
}

/// Initialize one controller per configured kind (given the crds are installed)
pub async fn run(state: State, config: Config) -> Result<()> {
    let client = Client::try_default().await?;
    let registry = config.registry();
    if registry.is_empty() {
        return Err(Error::InvalidConfig("no kinds to watch".into()));
    }
    let context = state.to_context(client.clone(), config)?;

    let controllers = registry.kinds().map(|kind| match kind {
        DatabaseKind::MySQL => watch::<v1::MySQL>(client.clone(), context.clone()),
        DatabaseKind::Postgres => watch::<v1::Postgres>(client.clone(), context.clone()),
        DatabaseKind::MongoDB => watch::<v1::MongoDB>(client.clone(), context.clone()),
        DatabaseKind::Redis => watch::<v1::Redis>(client.clone(), context.clone()),
        DatabaseKind::ElasticsearchDashboard => {
            watch::<dashboard::ElasticsearchDashboard>(client.clone(), context.clone())
        }
    });

    futures::future::try_join_all(controllers).await?;
    Ok(())
}

fn watch<K: PhasedResource>(client: Client, context: Arc<Context>) -> BoxFuture<'static, Result<()>> {
    async move {
        let api = Api::<K>::all(client);
        if let Err(e) = api.list(&ListParams::default().limit(1)).await {
            error!("{} CRD is not queryable; {e:?}. Is the CRD installed?", K::KIND);
            info!("Installation: cargo run --bin crdgen | kubectl apply -f -");
            return Err(Error::KubeError(e));
        }

        info!("Watching {} resources", K::KIND);
        Controller::new(api, watcher::Config::default().any_semantic())
            .shutdown_on_signal()
            .run(phase_sync::reconcile::<K>, phase_sync::error_policy::<K>, context)
            .filter_map(|x| async move { x.ok() })
            .for_each(|_| futures::future::ready(()))
            .await;
        Ok(())
    }
    .boxed()
}

/// Diagnostics to be exposed by the web server
#[derive(Clone, Serialize)]
pub struct Diagnostics {
    pub last_event: DateTime<Utc>,
    #[serde(skip)]
    pub reporter: Reporter,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(&Config::default().field_manager)
    }
}

impl Diagnostics {
    pub fn new(reporter: &str) -> Self {
        Self {
            last_event: Utc::now(),
            reporter: reporter.into(),
        }
    }

    pub fn recorder<K>(&self, client: Client, obj: &K) -> PhaseEventRecorder
    where
        K: Resource<DynamicType = ()>,
    {
        Recorder::new(client, self.reporter.clone(), obj.object_ref(&())).into()
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("SerializationError: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Kubernetes API Error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Metrics Error: {0}")]
    MetricsError(#[from] prometheus::Error),

    #[error("Invalid label selector: {0}")]
    InvalidLabelSelector(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown kind: {0}")]
    UnknownKind(String),

    #[error("Multiple archivers accept the database: {}", .0.join(", "))]
    AmbiguousArchiver(Vec<String>),

    #[error("MissingNamespace: {0}")]
    MissingNamespace(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn metric_label(&self) -> String {
        format!("{self:?}").to_lowercase()
    }
}
