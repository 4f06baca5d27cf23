use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

use crate::cost::PriceTable;
use crate::types::{Measurement, ModelTotals, Snapshot};

/// Running totals across every request since startup (or the last `reset`).
/// Only ever touched through the tracker's mutex.
#[derive(Debug, Default)]
struct AggregateState {
    requests: u64,
    cost_usd: f64,
    input_tokens: u64,
    output_tokens: u64,
    latency_seconds: f64,
    per_model: BTreeMap<String, ModelTotals>,
}

/// Thread-safe request aggregate.
///
/// `record` folds a measurement into the totals inside one critical
/// section; a concurrent `snapshot` sees either all of a record's fields
/// applied or none of them. Latency is stored as a running sum, and the
/// average is derived at snapshot time.
#[derive(Debug)]
pub struct MetricsTracker {
    prices: PriceTable,
    state: Mutex<AggregateState>,
}

impl MetricsTracker {
    pub fn new(prices: PriceTable) -> Self {
        Self {
            prices,
            state: Mutex::new(AggregateState::default()),
        }
    }

    pub fn prices(&self) -> &PriceTable {
        &self.prices
    }

    /// Fold one completed request into the aggregate.
    ///
    /// A model without a pricing entry contributes zero cost; its request,
    /// tokens, and latency are still counted. Cost accumulates at full
    /// precision; rounding belongs to the reporting boundary.
    pub fn record(&self, m: Measurement) {
        let cost = self.prices.cost_for(&m);
        let unpriced = cost.is_none();
        let cost = cost.unwrap_or(0.0);

        debug!(
            model = %m.model,
            input = m.input_tokens,
            output = m.output_tokens,
            latency = m.latency_seconds,
            finish = %m.finish_reason,
            "recording request"
        );

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if unpriced && !state.per_model.contains_key(&m.model) {
            warn!(model = %m.model, "no pricing entry for model, counting requests at zero cost");
        }

        state.requests += 1;
        state.cost_usd += cost;
        state.input_tokens += m.input_tokens;
        state.output_tokens += m.output_tokens;
        state.latency_seconds += m.latency_seconds;
        state
            .per_model
            .entry(m.model)
            .or_default()
            .accumulate(m.input_tokens, m.output_tokens, cost);
    }

    /// Consistent copy of the aggregate. Reflects every record completed
    /// before this call; a racing record is included fully or not at all.
    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let average_latency_seconds = if state.requests == 0 {
            0.0
        } else {
            state.latency_seconds / state.requests as f64
        };

        Snapshot {
            total_requests: state.requests,
            total_cost_usd: state.cost_usd,
            total_input_tokens: state.input_tokens,
            total_output_tokens: state.output_tokens,
            total_latency_seconds: state.latency_seconds,
            average_latency_seconds,
            models_used: state.per_model.keys().cloned().collect(),
            per_model: state.per_model.clone(),
        }
    }

    /// Zero the aggregate. For test isolation, not the request path.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = AggregateState::default();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn tracker() -> MetricsTracker {
        MetricsTracker::new(PriceTable::builtin())
    }

    #[test]
    fn two_request_scenario() {
        let tracker = tracker();
        tracker.record(Measurement::new("gpt-4o-mini", 100, 200, 1.0, "stop"));
        tracker.record(Measurement::new("gpt-4o", 50, 50, 0.5, "stop"));

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.total_requests, 2);
        assert_eq!(snapshot.total_tokens(), 400);
        assert!((snapshot.total_cost_usd - 0.00076).abs() < 1e-9);
        assert!((snapshot.average_latency_seconds - 0.75).abs() < 1e-9);
        assert_eq!(snapshot.models_used, vec!["gpt-4o", "gpt-4o-mini"]);
    }

    #[test]
    fn empty_snapshot_has_zero_average() {
        let snapshot = tracker().snapshot();
        assert_eq!(snapshot.total_requests, 0);
        assert_eq!(snapshot.average_latency_seconds, 0.0);
        assert!(snapshot.models_used.is_empty());
        assert!(snapshot.per_model.is_empty());
    }

    #[test]
    fn unpriced_model_counts_everything_but_cost() {
        let tracker = tracker();
        tracker.record(Measurement::new("mystery-model", 300, 100, 2.0, "stop"));

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.total_requests, 1);
        assert_eq!(snapshot.total_tokens(), 400);
        assert_eq!(snapshot.total_cost_usd, 0.0);
        assert!((snapshot.total_latency_seconds - 2.0).abs() < 1e-9);
        assert_eq!(snapshot.per_model["mystery-model"].requests, 1);
    }

    #[test]
    fn per_model_totals_sum_to_overall_totals() {
        let tracker = tracker();
        for i in 0..30u64 {
            let model = if i % 3 == 0 { "gpt-4o" } else { "gpt-4o-mini" };
            tracker.record(Measurement::new(model, 100 + i, 50 + i, 0.1, "stop"));
        }

        let snapshot = tracker.snapshot();
        let requests: u64 = snapshot.per_model.values().map(|t| t.requests).sum();
        let cost: f64 = snapshot.per_model.values().map(|t| t.cost_usd).sum();
        let input: u64 = snapshot.per_model.values().map(|t| t.input_tokens).sum();

        assert_eq!(requests, snapshot.total_requests);
        assert_eq!(input, snapshot.total_input_tokens);
        assert!((cost - snapshot.total_cost_usd).abs() < 1e-9);
        assert_eq!(snapshot.per_model["gpt-4o"].requests, 10);
        assert_eq!(snapshot.per_model["gpt-4o-mini"].requests, 20);
    }

    #[test]
    fn totals_are_additive_over_independent_costs() {
        let prices = PriceTable::builtin();
        let measurements: Vec<Measurement> = (0..50u64)
            .map(|i| Measurement::new("gpt-4o", i * 10, i * 5, 0.01 * i as f64, "stop"))
            .collect();

        let expected_cost: f64 = measurements
            .iter()
            .filter_map(|m| prices.cost_for(m))
            .sum();
        let expected_tokens: u64 = measurements
            .iter()
            .map(|m| m.input_tokens + m.output_tokens)
            .sum();

        let tracker = MetricsTracker::new(prices);
        for m in measurements {
            tracker.record(m);
        }

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.total_requests, 50);
        assert_eq!(snapshot.total_tokens(), expected_tokens);
        assert!((snapshot.total_cost_usd - expected_cost).abs() < 1e-9);
    }

    #[test]
    fn concurrent_records_match_sequential_totals() {
        let measurements: Vec<Measurement> = (0..200u64)
            .map(|i| {
                let model = match i % 3 {
                    0 => "gpt-4o",
                    1 => "gpt-4o-mini",
                    _ => "unpriced-model",
                };
                Measurement::new(model, i, i * 2, 0.001 * i as f64, "stop")
            })
            .collect();

        let sequential = tracker();
        for m in measurements.iter().cloned() {
            sequential.record(m);
        }

        let concurrent = Arc::new(tracker());
        let mut handles = Vec::new();
        for chunk in measurements.chunks(25) {
            let chunk = chunk.to_vec();
            let tracker = Arc::clone(&concurrent);
            handles.push(thread::spawn(move || {
                for m in chunk {
                    tracker.record(m);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let a = sequential.snapshot();
        let b = concurrent.snapshot();
        assert_eq!(a.total_requests, b.total_requests);
        assert_eq!(a.total_input_tokens, b.total_input_tokens);
        assert_eq!(a.total_output_tokens, b.total_output_tokens);
        assert!((a.total_cost_usd - b.total_cost_usd).abs() < 1e-9);
        assert!((a.total_latency_seconds - b.total_latency_seconds).abs() < 1e-9);
        assert_eq!(a.models_used, b.models_used);
        for (model, totals) in &a.per_model {
            assert_eq!(totals.requests, b.per_model[model].requests);
        }
    }

    #[test]
    fn snapshot_is_detached_from_later_records() {
        let tracker = tracker();
        tracker.record(Measurement::new("gpt-4o", 10, 10, 0.1, "stop"));

        let before = tracker.snapshot();
        tracker.record(Measurement::new("gpt-4o", 10, 10, 0.1, "stop"));

        assert_eq!(before.total_requests, 1);
        assert_eq!(tracker.snapshot().total_requests, 2);
    }

    #[test]
    fn reset_zeroes_the_aggregate() {
        let tracker = tracker();
        tracker.record(Measurement::new("gpt-4o", 10, 10, 0.1, "stop"));
        tracker.reset();

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.total_requests, 0);
        assert_eq!(snapshot.total_cost_usd, 0.0);
        assert!(snapshot.per_model.is_empty());
    }
}
