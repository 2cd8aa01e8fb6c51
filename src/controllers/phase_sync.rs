//! Keeps `.status.phase` in line with `.status.conditions`.
//!
//! Conditions are written by the engine-specific operators; this controller
//! only reads them, derives the phase and applies it when it changed.

use crate::apis::{PhaseValue, PhasedResource};
use crate::controllers::phase_event_recorder::{EventAction, EventReason};
use crate::{Context, Error};
use chrono::Utc;
use kube::{
    api::{Api, Patch, PatchParams, ResourceExt},
    runtime::controller::Action,
};
use std::sync::Arc;
use tracing::*;

#[instrument(skip(ctx, obj), fields(trace_id, kind))]
pub async fn reconcile<K: PhasedResource>(obj: Arc<K>, ctx: Arc<Context>) -> crate::Result<Action> {
    let trace_id = crate::telemetry::get_trace_id();
    Span::current().record("trace_id", field::display(&trace_id));
    Span::current().record("kind", field::display(K::KIND));
    let _timer = ctx.metrics.count_and_measure();
    ctx.diagnostics.write().await.last_event = Utc::now();

    let name = obj.name_any();
    let ns = obj.namespace().ok_or_else(|| Error::MissingNamespace(name.clone()))?;
    let requeue = Action::requeue(ctx.config.requeue);

    let current = obj.current_phase();
    let next = obj.resolve_phase();
    if current == next {
        if next.is_none() {
            debug!("No phase derivable for {} \"{}\" in {} yet", K::KIND, name, ns);
        }
        return Ok(requeue);
    }

    let from = current.map_or_else(|| "<unset>".to_string(), |p| p.to_string());
    let to = next.map_or_else(|| "<unset>".to_string(), |p| p.to_string());
    info!("Phase of {} \"{}\" in {}: {} -> {}", K::KIND, name, ns, from, to);

    let api: Api<K> = Api::namespaced(ctx.client.clone(), &ns);
    let patch = Patch::Apply(K::status_patch(next));
    let ps = PatchParams::apply(&ctx.config.field_manager).force();
    let _o = api
        .patch_status(&name, &ps, &patch)
        .await
        .map_err(Error::KubeError)?;

    // Released phases are not announced
    let Some(next) = next else {
        return Ok(requeue);
    };
    ctx.metrics.phase_transition(K::KIND, &to);

    let recorder = ctx.diagnostics.read().await.recorder(ctx.client.clone(), obj.as_ref());
    let note = format!("Phase changed from {from} to {next}");
    if next.is_unhealthy() {
        recorder.warn(EventAction::SyncPhase, EventReason::PhaseChanged, note).await?;
    } else {
        recorder.info(EventAction::SyncPhase, EventReason::PhaseChanged, note).await?;
    }

    Ok(requeue)
}

pub fn error_policy<K: PhasedResource>(obj: Arc<K>, error: &Error, ctx: Arc<Context>) -> Action {
    warn!("reconcile failed: {:?}", error);
    ctx.metrics.reconcile_failure(obj.as_ref(), error);
    Action::requeue(ctx.config.requeue)
}

// Mock tests relying on fixtures.rs and its primitive apiserver mocks
#[cfg(test)]
mod test {
    use super::{error_policy, reconcile};
    use crate::apis::dashboard::ElasticsearchDashboard;
    use crate::apis::v1::{DatabasePhase, Postgres};
    use crate::conditions::{
        Condition, ACCEPTING_CONNECTION, HEALTH_CHECK_PAUSED, PROVISIONED, PROVISIONING_STARTED, READY,
        SERVER_HEALTHY,
    };
    use crate::fixtures::{timeout_after_1s, Scenario};
    use crate::phase::DashboardPhase;
    use crate::Context;
    use std::sync::Arc;

    #[tokio::test]
    async fn unchanged_phase_causes_no_api_calls() {
        let (testctx, fakeserver, _) = Context::test();
        let pg = Postgres::test()
            .with_conditions(vec![Condition::new(PROVISIONED, true), Condition::new(READY, true)])
            .with_phase(DatabasePhase::Ready);
        let mocksrv = fakeserver.run(Scenario::RadioSilence);
        reconcile(Arc::new(pg), testctx.clone()).await.expect("reconciler");
        timeout_after_1s(mocksrv).await;
        assert_eq!(testctx.metrics.reconciliations.get(), 1);
    }

    #[tokio::test]
    async fn no_derivable_phase_causes_no_api_calls() {
        let (testctx, fakeserver, _) = Context::test();
        let pg = Postgres::test().with_conditions(vec![Condition::new(READY, true)]);
        let mocksrv = fakeserver.run(Scenario::RadioSilence);
        reconcile(Arc::new(pg), testctx).await.expect("reconciler");
        timeout_after_1s(mocksrv).await;
    }

    #[tokio::test]
    async fn stale_phase_is_released_when_conditions_no_longer_resolve() {
        let (testctx, fakeserver, _) = Context::test();
        let pg = Postgres::test().with_conditions(vec![]).with_phase(DatabasePhase::Halted);
        let mocksrv = fakeserver.run(Scenario::PhaseRelease(pg.clone()));
        reconcile(Arc::new(pg), testctx.clone()).await.expect("reconciler");
        timeout_after_1s(mocksrv).await;
        let transitions = testctx
            .metrics
            .transitions
            .with_label_values(&["Postgres", "Halted"])
            .get();
        assert_eq!(transitions, 0);
    }

    #[tokio::test]
    async fn new_phase_is_applied_and_announced() {
        let (testctx, fakeserver, _) = Context::test();
        let pg = Postgres::test().with_conditions(vec![Condition::new(PROVISIONING_STARTED, true)]);
        let scenario = Scenario::PhasePatchThenEvent(pg.clone(), DatabasePhase::Provisioning, "Normal".into());
        let mocksrv = fakeserver.run(scenario);
        reconcile(Arc::new(pg), testctx.clone()).await.expect("reconciler");
        timeout_after_1s(mocksrv).await;
        let transitions = testctx
            .metrics
            .transitions
            .with_label_values(&["Postgres", "Provisioning"])
            .get();
        assert_eq!(transitions, 1);
    }

    #[tokio::test]
    async fn degraded_phase_is_announced_as_warning() {
        let (testctx, fakeserver, _) = Context::test();
        let pg = Postgres::test()
            .with_conditions(vec![
                Condition::new(PROVISIONED, true),
                Condition::new(ACCEPTING_CONNECTION, true),
                Condition::new(READY, false),
            ])
            .with_phase(DatabasePhase::Ready);
        let scenario = Scenario::PhasePatchThenEvent(pg.clone(), DatabasePhase::Critical, "Warning".into());
        let mocksrv = fakeserver.run(scenario);
        reconcile(Arc::new(pg), testctx).await.expect("reconciler");
        timeout_after_1s(mocksrv).await;
    }

    #[tokio::test]
    async fn paused_health_check_reports_unknown() {
        let (testctx, fakeserver, _) = Context::test();
        let pg = Postgres::test()
            .with_conditions(vec![
                Condition::new(PROVISIONED, true),
                Condition::new(READY, false),
                Condition::new(HEALTH_CHECK_PAUSED, true),
            ])
            .with_phase(DatabasePhase::Critical);
        let scenario = Scenario::PhasePatchThenEvent(pg.clone(), DatabasePhase::Unknown, "Normal".into());
        let mocksrv = fakeserver.run(scenario);
        reconcile(Arc::new(pg), testctx).await.expect("reconciler");
        timeout_after_1s(mocksrv).await;
    }

    #[tokio::test]
    async fn dashboard_phase_is_applied() {
        let (testctx, fakeserver, _) = Context::test();
        let dashboard = ElasticsearchDashboard::test().with_conditions(vec![
            Condition::new(PROVISIONED, true),
            Condition::new(ACCEPTING_CONNECTION, true),
            Condition::new(SERVER_HEALTHY, true),
        ]);
        let scenario = Scenario::DashboardPhasePatch(dashboard.clone(), DashboardPhase::Ready);
        let mocksrv = fakeserver.run(scenario);
        reconcile(Arc::new(dashboard), testctx).await.expect("reconciler");
        timeout_after_1s(mocksrv).await;
    }

    #[tokio::test]
    async fn missing_namespace_errors_which_bumps_failure_metric() {
        let (testctx, fakeserver, _registry) = Context::test();
        let mut pg = Postgres::test().with_conditions(vec![Condition::new(PROVISIONING_STARTED, true)]);
        pg.metadata.namespace = None;
        let pg = Arc::new(pg);
        let mocksrv = fakeserver.run(Scenario::RadioSilence);
        let res = reconcile(pg.clone(), testctx.clone()).await;
        timeout_after_1s(mocksrv).await;
        assert!(res.is_err(), "reconciler fails on objects without namespace");
        let err = res.unwrap_err();
        assert!(err.to_string().contains("MissingNamespace"));
        // calling error policy with the reconciler error should cause the correct metric to be set
        error_policy(pg.clone(), &err, testctx.clone());
        let failures = testctx
            .metrics
            .failures
            .with_label_values(&["test", "missingnamespace(\"test\")", "Postgres"])
            .get();
        assert_eq!(failures, 1);
    }

    // Integration test without mocks
    use kube::api::{Api, Patch, PatchParams};
    #[tokio::test]
    #[ignore = "uses k8s current-context"]
    async fn integration_reconcile_should_set_phase() {
        let client = kube::Client::try_default().await.unwrap();
        let ctx = crate::State::default()
            .to_context(client.clone(), crate::Config::default())
            .unwrap();

        let pg = Postgres::test();
        let pgs: Api<Postgres> = Api::namespaced(client.clone(), "default");
        let ssapply = PatchParams::apply("ctrltest");
        pgs.patch("test", &ssapply, &Patch::Apply(pg.clone())).await.unwrap();
        let status = Patch::Apply(serde_json::json!({
            "apiVersion": "kubedb.com/v1",
            "kind": "Postgres",
            "status": { "conditions": [Condition::new(PROVISIONING_STARTED, true)] }
        }));
        let pg = pgs.patch_status("test", &ssapply, &status).await.unwrap();

        reconcile(Arc::new(pg), ctx).await.unwrap();

        let output = pgs.get_status("test").await.unwrap();
        assert_eq!(
            output.status.and_then(|s| s.phase),
            Some(DatabasePhase::Provisioning)
        );
    }
}
