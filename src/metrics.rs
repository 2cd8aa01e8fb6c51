use crate::apis::{DatabaseKind, PhasedResource};
use crate::Error;
use kube::ResourceExt;
use prometheus::{histogram_opts, opts, HistogramVec, IntCounter, IntCounterVec, Registry};
use tokio::time::Instant;

#[derive(Clone)]
pub struct Metrics {
    pub reconciliations: IntCounter,
    pub failures: IntCounterVec,
    pub transitions: IntCounterVec,
    pub reconcile_duration: HistogramVec,
}

impl Metrics {
    /// Create the metrics and register them to start tracking them.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let reconcile_duration = HistogramVec::new(
            histogram_opts!(
                "kubedb_phase_reconcile_duration_seconds",
                "The duration of reconcile to complete in seconds"
            )
            .buckets(vec![0.01, 0.1, 0.25, 0.5, 1., 5., 15., 60.]),
            &[],
        )?;
        let failures = IntCounterVec::new(
            opts!("kubedb_phase_reconcile_errors_total", "reconciliation errors"),
            &["instance", "error", "kind"],
        )?;
        let transitions = IntCounterVec::new(
            opts!("kubedb_phase_transitions_total", "phases written to status"),
            &["kind", "phase"],
        )?;
        let reconciliations = IntCounter::new("kubedb_phase_reconciliations_total", "reconciliations")?;

        registry.register(Box::new(reconcile_duration.clone()))?;
        registry.register(Box::new(failures.clone()))?;
        registry.register(Box::new(transitions.clone()))?;
        registry.register(Box::new(reconciliations.clone()))?;
        Ok(Metrics {
            reconciliations,
            failures,
            transitions,
            reconcile_duration,
        })
    }

    pub fn reconcile_failure<K: PhasedResource>(&self, obj: &K, e: &Error) {
        self.failures
            .with_label_values(&[
                obj.name_any().as_ref(),
                e.metric_label().as_ref(),
                K::KIND.to_string().as_ref(),
            ])
            .inc()
    }

    pub fn phase_transition(&self, kind: DatabaseKind, phase: &str) {
        self.transitions
            .with_label_values(&[kind.to_string().as_ref(), phase])
            .inc()
    }

    pub fn count_and_measure(&self) -> ReconcileMeasurer {
        self.reconciliations.inc();
        ReconcileMeasurer {
            start: Instant::now(),
            metric: self.reconcile_duration.clone(),
        }
    }
}

/// Smart function duration measurer
///
/// Relies on Drop to calculate duration and register the observation in the histogram
pub struct ReconcileMeasurer {
    start: Instant,
    metric: HistogramVec,
}

impl Drop for ReconcileMeasurer {
    fn drop(&mut self) {
        #[allow(clippy::cast_precision_loss)]
        let duration = self.start.elapsed().as_millis() as f64 / 1000.0;
        self.metric.with_label_values(&[]).observe(duration);
    }
}
