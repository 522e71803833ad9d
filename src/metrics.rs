// Prometheus metrics for governed calls
//
// Counters are updated by the governor whether or not they were registered;
// call `init()` once to expose them through `gather_metrics()`:
// - Governed calls by outcome (counter)
// - Local quota rejections by scope class (counter)
// - Probes, discovery failures and rollbacks (counters)
// - Probe round-trip time (histogram)

use lazy_static::lazy_static;
use prometheus::{Encoder, Histogram, IntCounter, IntCounterVec, Registry, TextEncoder};
use std::sync::Arc;

lazy_static! {
    pub static ref REGISTRY: Arc<Registry> = Arc::new(Registry::new());

    pub static ref GOVERNED_CALLS_TOTAL: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new("riftgate_governed_calls_total", "Governed calls by outcome"),
        &["outcome"]
    ).expect("Failed to create governed calls metric");

    pub static ref QUOTA_REJECTIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new(
            "riftgate_quota_rejections_total",
            "Calls rejected locally, by the class of the exhausted scope"
        ),
        &["scope_class"]
    ).expect("Failed to create quota rejections metric");

    pub static ref PROBES_TOTAL: IntCounter = IntCounter::new(
        "riftgate_probes_total",
        "Calls made to discover an unknown quota"
    ).expect("Failed to create probes metric");

    pub static ref DISCOVERY_FAILURES_TOTAL: IntCounter = IntCounter::new(
        "riftgate_discovery_failures_total",
        "Probes that did not yield a quota"
    ).expect("Failed to create discovery failures metric");

    pub static ref ROLLBACKS_TOTAL: IntCounter = IntCounter::new(
        "riftgate_rollbacks_total",
        "Scope consumptions undone after a rejection or failed call"
    ).expect("Failed to create rollbacks metric");

    pub static ref PROBE_DURATION_SECONDS: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new("riftgate_probe_duration_seconds", "Round-trip time of probe calls"),
    ).expect("Failed to create probe duration metric");
}

/// Register all metrics with [`REGISTRY`]. Repeated calls are harmless.
pub fn init() -> prometheus::Result<()> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(GOVERNED_CALLS_TOTAL.clone()),
        Box::new(QUOTA_REJECTIONS_TOTAL.clone()),
        Box::new(PROBES_TOTAL.clone()),
        Box::new(DISCOVERY_FAILURES_TOTAL.clone()),
        Box::new(ROLLBACKS_TOTAL.clone()),
        Box::new(PROBE_DURATION_SECONDS.clone()),
    ];

    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {}", e))?;
    String::from_utf8(buffer).map_err(|e| anyhow::anyhow!("Invalid UTF-8 in metrics: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        assert!(init().is_ok());
        assert!(init().is_ok());
    }

    #[test]
    fn test_outcome_counter() {
        let before = GOVERNED_CALLS_TOTAL.with_label_values(&["admitted"]).get();
        GOVERNED_CALLS_TOTAL.with_label_values(&["admitted"]).inc();
        assert!(GOVERNED_CALLS_TOTAL.with_label_values(&["admitted"]).get() > before);
    }

    #[test]
    fn test_gather_metrics() {
        init().unwrap();
        PROBES_TOTAL.inc();
        QUOTA_REJECTIONS_TOTAL.with_label_values(&["route_short"]).inc();

        let text = gather_metrics().unwrap();
        assert!(text.contains("riftgate_probes_total"));
        assert!(text.contains("scope_class=\"route_short\""));
    }
}
