use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;

use crate::sink::{ReportSink, SinkError};
use crate::types::Snapshot;

#[derive(Debug, Error)]
pub enum ReportError {
    /// The requested export format is not one of `json` or `csv`.
    #[error("unsupported report format: {0}")]
    UnsupportedFormat(String),
    /// The sink rejected the rendered report. The report itself is still
    /// usable by the caller.
    #[error("failed to persist report {name}")]
    Sink {
        name: String,
        #[source]
        source: SinkError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Csv,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Csv => "csv",
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(ReportFormat::Json),
            "csv" => Ok(ReportFormat::Csv),
            other => Err(ReportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// One model's line in the report breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRow {
    pub model: String,
    pub requests: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
}

/// Breakdown rows in report order: descending cost, ascending model
/// identifier on ties.
pub fn sorted_rows(snapshot: &Snapshot) -> Vec<ModelRow> {
    let mut rows: Vec<ModelRow> = snapshot
        .per_model
        .iter()
        .map(|(model, totals)| ModelRow {
            model: model.clone(),
            requests: totals.requests,
            input_tokens: totals.input_tokens,
            output_tokens: totals.output_tokens,
            cost_usd: totals.cost_usd,
        })
        .collect();

    rows.sort_by(|a, b| {
        b.cost_usd
            .partial_cmp(&a.cost_usd)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.model.cmp(&b.model))
    });
    rows
}

/// Round at the reporting boundary; accumulation stays at full precision.
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Point-in-time export document.
///
/// Construction fixes the breakdown order and the `generated_at` stamp;
/// rendering is deterministic from there, so two renders of the same
/// report are byte-identical.
#[derive(Debug, Clone)]
pub struct Report {
    pub format: ReportFormat,
    pub generated_at: DateTime<Utc>,
    pub snapshot: Snapshot,
    pub breakdown: Vec<ModelRow>,
}

impl Report {
    pub fn generate(snapshot: &Snapshot, format: ReportFormat) -> Self {
        Self {
            format,
            generated_at: Utc::now(),
            snapshot: snapshot.clone(),
            breakdown: sorted_rows(snapshot),
        }
    }

    pub fn render(&self) -> String {
        match self.format {
            ReportFormat::Json => self.render_json(),
            ReportFormat::Csv => self.render_csv(),
        }
    }

    fn render_json(&self) -> String {
        let mut model_breakdown = serde_json::Map::new();
        for row in &self.breakdown {
            model_breakdown.insert(
                row.model.clone(),
                json!({
                    "requests": row.requests,
                    "cost_usd": round_to(row.cost_usd, 6),
                    "input_tokens": row.input_tokens,
                    "output_tokens": row.output_tokens,
                }),
            );
        }

        let report = json!({
            "summary": {
                "total_requests": self.snapshot.total_requests,
                "total_cost_usd": round_to(self.snapshot.total_cost_usd, 6),
                "total_tokens": self.snapshot.total_tokens(),
                "total_input_tokens": self.snapshot.total_input_tokens,
                "total_output_tokens": self.snapshot.total_output_tokens,
                "average_latency_seconds": round_to(self.snapshot.average_latency_seconds, 3),
                "models_used": self.snapshot.models_used,
            },
            "model_breakdown": model_breakdown,
            "generated_at": self.generated_at.to_rfc3339(),
        });

        serde_json::to_string_pretty(&report).expect("JSON serialization failed")
    }

    fn render_csv(&self) -> String {
        let mut lines = vec!["model,requests,input_tokens,output_tokens,cost_usd".to_string()];

        for row in &self.breakdown {
            lines.push(format!(
                "{},{},{},{},{:.6}",
                row.model, row.requests, row.input_tokens, row.output_tokens, row.cost_usd
            ));
        }

        lines.push(format!(
            "TOTAL,{},{},{},{:.6}",
            self.snapshot.total_requests,
            self.snapshot.total_input_tokens,
            self.snapshot.total_output_tokens,
            self.snapshot.total_cost_usd
        ));

        lines.join("\n")
    }

    /// `report_<UTC compact timestamp>.<ext>`.
    pub fn filename(&self) -> String {
        format!(
            "report_{}.{}",
            self.generated_at.format("%Y%m%d_%H%M%S"),
            self.format.extension()
        )
    }

    /// Render and hand the document to `sink`, returning the location the
    /// sink reports. On failure the report stays usable by the caller.
    pub fn persist(&self, sink: &dyn ReportSink) -> Result<String, ReportError> {
        let name = self.filename();
        sink.write(&name, self.render().as_bytes())
            .map_err(|source| ReportError::Sink { name, source })
    }
}
