use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, ContentArrangement, Table};

use crate::cost::PriceTable;
use crate::report::{round_to, sorted_rows};
use crate::types::Snapshot;

fn format_tokens(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

fn format_cost(cost: f64) -> String {
    format!("${:.6}", cost)
}

/// Per-model table with a trailing TOTAL row, plus the latency summary.
pub fn print_summary_table(snapshot: &Snapshot) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(
        ["Model", "Requests", "Input", "Output", "Cost"]
            .iter()
            .map(Cell::new),
    );

    for row in sorted_rows(snapshot) {
        table.add_row(vec![
            Cell::new(&row.model),
            Cell::new(row.requests),
            Cell::new(format_tokens(row.input_tokens)),
            Cell::new(format_tokens(row.output_tokens)),
            Cell::new(format_cost(row.cost_usd)),
        ]);
    }

    table.add_row(vec![
        Cell::new("TOTAL"),
        Cell::new(snapshot.total_requests),
        Cell::new(format_tokens(snapshot.total_input_tokens)),
        Cell::new(format_tokens(snapshot.total_output_tokens)),
        Cell::new(format_cost(snapshot.total_cost_usd)),
    ]);

    println!("{table}");
    println!(
        "Average latency: {:.3}s across {} requests",
        snapshot.average_latency_seconds, snapshot.total_requests
    );
}

/// The summary-query view of a snapshot.
pub fn print_summary_json(snapshot: &Snapshot) {
    let json = serde_json::json!({
        "total_requests": snapshot.total_requests,
        "total_cost_usd": round_to(snapshot.total_cost_usd, 6),
        "total_tokens": snapshot.total_tokens(),
        "average_latency_seconds": round_to(snapshot.average_latency_seconds, 3),
        "models_used": snapshot.models_used,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&json).expect("JSON serialization failed")
    );
}

/// Known models and their configured per-1K-token rates.
pub fn print_models(prices: &PriceTable) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(
        ["Model", "Input / 1K", "Output / 1K"]
            .iter()
            .map(Cell::new),
    );

    for model in prices.models() {
        let Some(rates) = prices.get(model) else {
            continue;
        };
        table.add_row(vec![
            Cell::new(model),
            Cell::new(format_cost(rates.input_per_1k)),
            Cell::new(format_cost(rates.output_per_1k)),
        ]);
    }

    println!("{table}");
}
