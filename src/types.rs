use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed text-generation request, as observed by the metering layer.
///
/// Constructed by the request handler right after the downstream call
/// returns; only its contribution to the running aggregate is retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub latency_seconds: f64,
    #[serde(default)]
    pub finish_reason: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Measurement {
    pub fn new(
        model: impl Into<String>,
        input_tokens: u64,
        output_tokens: u64,
        latency_seconds: f64,
        finish_reason: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            input_tokens,
            output_tokens,
            latency_seconds,
            finish_reason: finish_reason.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Running totals for a single model.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelTotals {
    pub requests: u64,
    pub cost_usd: f64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl ModelTotals {
    /// Fold one request's contribution into these totals.
    pub fn accumulate(&mut self, input_tokens: u64, output_tokens: u64, cost_usd: f64) {
        self.requests += 1;
        self.cost_usd += cost_usd;
        self.input_tokens += input_tokens;
        self.output_tokens += output_tokens;
    }
}

/// Immutable point-in-time copy of the aggregate.
///
/// `models_used` is the sorted key set of `per_model`, so its order does not
/// depend on how concurrent records interleaved.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub total_requests: u64,
    pub total_cost_usd: f64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_latency_seconds: f64,
    /// 0 when no requests have been recorded.
    pub average_latency_seconds: f64,
    pub models_used: Vec<String>,
    pub per_model: BTreeMap<String, ModelTotals>,
}

impl Snapshot {
    pub fn total_tokens(&self) -> u64 {
        self.total_input_tokens + self.total_output_tokens
    }
}
