//! Helper methods only available for tests
use crate::apis::dashboard::{DatabaseRef, ElasticsearchDashboard, ElasticsearchDashboardSpec};
use crate::apis::v1::{DatabasePhase, Postgres, PostgresSpec};
use crate::conditions::Condition;
use crate::phase::DashboardPhase;
use crate::{Config, Context, Metrics};
use assert_json_diff::assert_json_include;
use http::{Request, Response};
use kube::{client::Body, Client, ResourceExt};
use prometheus::Registry;
use serde_json::json;
use std::sync::Arc;
use tower_test::mock::SendResponse;

impl Postgres {
    /// A normal test database
    pub fn test() -> Self {
        let mut pg = Postgres::new(
            "test",
            PostgresSpec {
                version: "16.1".into(),
                ..Default::default()
            },
        );
        pg.metadata.namespace = Some("default".into());
        pg
    }

    pub fn with_conditions(mut self, conditions: Vec<Condition>) -> Self {
        self.status.get_or_insert_with(Default::default).conditions = conditions;
        self
    }

    pub fn with_phase(mut self, phase: DatabasePhase) -> Self {
        self.status.get_or_insert_with(Default::default).phase = Some(phase);
        self
    }
}

impl ElasticsearchDashboard {
    pub fn test() -> Self {
        let mut dashboard = ElasticsearchDashboard::new(
            "test",
            ElasticsearchDashboardSpec {
                database_ref: DatabaseRef { name: "es".into() },
                ..Default::default()
            },
        );
        dashboard.metadata.namespace = Some("default".into());
        dashboard
    }

    pub fn with_conditions(mut self, conditions: Vec<Condition>) -> Self {
        self.status.get_or_insert_with(Default::default).conditions = conditions;
        self
    }
}

// We wrap tower_test::mock::Handle
type ApiServerHandle = tower_test::mock::Handle<Request<Body>, Response<Body>>;
pub struct ApiServerVerifier(ApiServerHandle);

/// Scenarios we test for in ApiServerVerifier
pub enum Scenario {
    /// Objects whose phase does not change cause no calls
    RadioSilence,
    /// A status patch with the expected phase, followed by an event of the given type
    PhasePatchThenEvent(Postgres, DatabasePhase, String),
    /// A dashboard status patch followed by a normal event
    DashboardPhasePatch(ElasticsearchDashboard, DashboardPhase),
    /// A status patch without a phase and no event
    PhaseRelease(Postgres),
}

pub async fn timeout_after_1s(handle: tokio::task::JoinHandle<()>) {
    tokio::time::timeout(std::time::Duration::from_secs(1), handle)
        .await
        .expect("timeout on mock apiserver")
        .expect("scenario succeeded")
}

impl ApiServerVerifier {
    /// Tests only get to run specific scenarios that has matching handlers
    ///
    /// NB: If the controller is making more calls than we are handling in the scenario,
    /// you then typically see a `KubeError(Service(Closed(())))` from the reconciler.
    pub fn run(self, scenario: Scenario) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            match scenario {
                Scenario::RadioSilence => {}
                Scenario::PhasePatchThenEvent(pg, phase, type_) => {
                    let mut response = pg.clone();
                    response.status.get_or_insert_with(Default::default).phase = Some(phase);
                    self.handle_status_patch(
                        &format!("/apis/kubedb.com/v1/namespaces/default/postgreses/{}/status", pg.name_any()),
                        json!({ "apiVersion": "kubedb.com/v1", "kind": "Postgres", "status": { "phase": phase } }),
                        serde_json::to_vec(&response).unwrap(),
                    )
                    .await
                    .handle_event_create(&type_)
                    .await;
                }
                Scenario::PhaseRelease(pg) => {
                    let mut response = pg.clone();
                    response.status.get_or_insert_with(Default::default).phase = None;
                    self.handle_phase_release(
                        &format!("/apis/kubedb.com/v1/namespaces/default/postgreses/{}/status", pg.name_any()),
                        serde_json::to_vec(&response).unwrap(),
                    )
                    .await;
                }
                Scenario::DashboardPhasePatch(dashboard, phase) => {
                    let mut response = dashboard.clone();
                    response.status.get_or_insert_with(Default::default).phase = Some(phase);
                    self.handle_status_patch(
                        &format!(
                            "/apis/elasticsearch.kubedb.com/v1alpha1/namespaces/default/elasticsearchdashboards/{}/status",
                            dashboard.name_any()
                        ),
                        json!({
                            "apiVersion": "elasticsearch.kubedb.com/v1alpha1",
                            "kind": "ElasticsearchDashboard",
                            "status": { "phase": phase }
                        }),
                        serde_json::to_vec(&response).unwrap(),
                    )
                    .await
                    .handle_event_create("Normal")
                    .await;
                }
            }
        })
    }

    // Receives a forced server-side apply on the status sub-resource at `path`
    async fn next_status_patch(&mut self, path: &str) -> (serde_json::Value, SendResponse<Response<Body>>) {
        let (request, send) = self.0.next_request().await.expect("service not called");
        assert_eq!(request.method(), http::Method::PATCH);
        assert_eq!(request.uri().path(), path);
        let query = request.uri().query().unwrap_or_default().to_string();
        assert!(query.contains("fieldManager=kubedb-phase-sync"), "{query}");
        assert!(query.contains("force=true"), "{query}");
        let req_body = request.into_body().collect_bytes().await.unwrap();
        let json = serde_json::from_slice(&req_body).expect("patch_status object is json");
        (json, send)
    }

    async fn handle_status_patch(mut self, path: &str, expected: serde_json::Value, response: Vec<u8>) -> Self {
        let (json, send) = self.next_status_patch(path).await;
        assert_json_include!(actual: json, expected: expected);
        send.send_response(Response::builder().body(Body::from(response)).unwrap());
        self
    }

    async fn handle_phase_release(mut self, path: &str, response: Vec<u8>) -> Self {
        let (json, send) = self.next_status_patch(path).await;
        assert_eq!(
            json,
            json!({ "apiVersion": "kubedb.com/v1", "kind": "Postgres", "status": {} })
        );
        send.send_response(Response::builder().body(Body::from(response)).unwrap());
        self
    }

    async fn handle_event_create(mut self, type_: &str) -> Self {
        let (request, send) = self.0.next_request().await.expect("service not called");
        assert_eq!(request.method(), http::Method::POST);
        assert_eq!(request.uri().path(), "/apis/events.k8s.io/v1/namespaces/default/events");
        let req_body = request.into_body().collect_bytes().await.unwrap();
        let postdata: serde_json::Value = serde_json::from_slice(&req_body).expect("valid event from runtime");
        assert_json_include!(
            actual: postdata.clone(),
            expected: json!({
                "type": type_,
                "reason": "PhaseChanged",
                "action": "SyncPhase",
                "reportingController": "kubedb-phase-sync"
            })
        );
        send.send_response(
            Response::builder()
                .body(Body::from(serde_json::to_vec(&postdata).unwrap()))
                .unwrap(),
        );
        self
    }
}

impl Context {
    // Create a test context with a mocked kube client, locally registered metrics and default config
    pub fn test() -> (Arc<Self>, ApiServerVerifier, Registry) {
        let (mock_service, handle) = tower_test::mock::pair::<Request<Body>, Response<Body>>();
        let mock_client = Client::new(mock_service, "default");
        let registry = Registry::default();
        let ctx = Self {
            client: mock_client,
            metrics: Metrics::register(&registry).unwrap(),
            diagnostics: Arc::default(),
            config: Arc::new(Config::default()),
        };
        (Arc::new(ctx), ApiServerVerifier(handle), registry)
    }
}
