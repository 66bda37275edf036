//! Prometheus metrics for the governance node.
//!
//! [`GovernanceMetrics`] owns a dedicated [`Registry`]; [`GovernanceMetrics::encode`]
//! renders it in the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, register_int_gauge_vec_with_registry,
    register_int_gauge_with_registry, Encoder, Histogram, HistogramOpts, IntCounter,
    IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder,
};

use concord_types::ProposalState;

pub struct GovernanceMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    pub proposals_created: IntCounter,
    pub votes_cast: IntCounter,
    /// Tallies by outcome ("passed" / "rejected").
    pub tallies: IntCounterVec,
    pub sweeps: IntCounter,
    /// Errors raised while advancing proposals, retried next sweep.
    pub sweep_errors: IntCounter,
    /// Sponsored batches by outcome ("submitted" / "rolled_back" / "dropped").
    pub sponsorship_batches: IntCounterVec,
    pub deployments: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub proposals_by_state: IntGaugeVec,
    pub active_runs: IntGauge,
    pub pending_sponsorships: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    pub sweep_duration_ms: Histogram,
}

impl GovernanceMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let proposals_created = register_int_counter_with_registry!(
            Opts::new("concord_proposals_created_total", "Proposals created"),
            registry
        )?;
        let votes_cast = register_int_counter_with_registry!(
            Opts::new("concord_votes_cast_total", "Votes accepted, replacements included"),
            registry
        )?;
        let tallies = register_int_counter_vec_with_registry!(
            Opts::new("concord_tallies_total", "Final tallies by outcome"),
            &["outcome"],
            registry
        )?;
        let sweeps = register_int_counter_with_registry!(
            Opts::new("concord_sweeps_total", "Completed sweeps"),
            registry
        )?;
        let sweep_errors = register_int_counter_with_registry!(
            Opts::new("concord_sweep_errors_total", "Errors raised during sweeps"),
            registry
        )?;
        let sponsorship_batches = register_int_counter_vec_with_registry!(
            Opts::new("concord_sponsorship_batches_total", "Sponsored batch flushes by outcome"),
            &["outcome"],
            registry
        )?;
        let deployments = register_int_counter_with_registry!(
            Opts::new("concord_deployments_total", "Successful deployments"),
            registry
        )?;

        let proposals_by_state = register_int_gauge_vec_with_registry!(
            Opts::new("concord_proposals", "Proposals per lifecycle state"),
            &["state"],
            registry
        )?;
        let active_runs = register_int_gauge_with_registry!(
            Opts::new("concord_active_execution_runs", "Execution runs still in progress"),
            registry
        )?;
        let pending_sponsorships = register_int_gauge_with_registry!(
            Opts::new("concord_pending_sponsorships", "Sponsored transactions waiting in batches"),
            registry
        )?;

        // 1 ms → ~16 s.
        let sweep_duration_ms = register_histogram_with_registry!(
            HistogramOpts::new("concord_sweep_duration_ms", "Sweep duration in milliseconds")
                .buckets(prometheus::exponential_buckets(1.0, 2.0, 15)?),
            registry
        )?;

        Ok(Self {
            registry,
            proposals_created,
            votes_cast,
            tallies,
            sweeps,
            sweep_errors,
            sponsorship_batches,
            deployments,
            proposals_by_state,
            active_runs,
            pending_sponsorships,
            sweep_duration_ms,
        })
    }

    pub fn set_state_count(&self, state: ProposalState, count: usize) {
        self.proposals_by_state
            .with_label_values(&[state.as_str()])
            .set(count as i64);
    }

    /// Render every metric in the text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
