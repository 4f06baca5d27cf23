use std::collections::HashMap;

use serde::Deserialize;

use crate::types::Measurement;

/// Per-1000-token pricing for a model, in USD.
///
/// TOML config uses the short `input`/`output` key names.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ModelRates {
    #[serde(rename = "input")]
    pub input_per_1k: f64,
    #[serde(rename = "output")]
    pub output_per_1k: f64,
}

/// Model identifier → per-1K-token rates, fixed at process start.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    rates: HashMap<String, ModelRates>,
}

impl PriceTable {
    pub fn new(rates: HashMap<String, ModelRates>) -> Self {
        Self { rates }
    }

    /// Built-in rates for the commonly served models. The `[pricing]`
    /// config section extends or overrides these.
    pub fn builtin() -> Self {
        let mut rates = HashMap::new();
        rates.insert(
            "gpt-4o".to_string(),
            ModelRates {
                input_per_1k: 0.0025,
                output_per_1k: 0.01,
            },
        );
        rates.insert(
            "gpt-4o-mini".to_string(),
            ModelRates {
                input_per_1k: 0.00015,
                output_per_1k: 0.0006,
            },
        );
        rates.insert(
            "gpt-3.5-turbo".to_string(),
            ModelRates {
                input_per_1k: 0.0005,
                output_per_1k: 0.0015,
            },
        );
        Self { rates }
    }

    pub fn get(&self, model: &str) -> Option<&ModelRates> {
        self.rates.get(model)
    }

    pub fn insert(&mut self, model: String, rates: ModelRates) {
        self.rates.insert(model, rates);
    }

    /// Known model identifiers, sorted.
    pub fn models(&self) -> Vec<&str> {
        let mut models: Vec<&str> = self.rates.keys().map(String::as_str).collect();
        models.sort_unstable();
        models
    }

    /// Cost of one request at full precision. `None` when the model has no
    /// pricing entry; rounding happens at the reporting boundary only.
    pub fn cost_for(&self, m: &Measurement) -> Option<f64> {
        let rates = self.get(&m.model)?;
        Some(
            m.input_tokens as f64 / 1000.0 * rates.input_per_1k
                + m.output_tokens as f64 / 1000.0 * rates.output_per_1k,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measurement(model: &str, input: u64, output: u64) -> Measurement {
        Measurement::new(model, input, output, 1.0, "stop")
    }

    #[test]
    fn cost_for_gpt_4o() {
        let table = PriceTable::builtin();
        let cost = table.cost_for(&measurement("gpt-4o", 1000, 500)).unwrap();
        let expected = 1000.0 / 1000.0 * 0.0025 + 500.0 / 1000.0 * 0.01;
        assert!((cost - expected).abs() < 1e-12);
    }

    #[test]
    fn cost_for_gpt_4o_mini() {
        let table = PriceTable::builtin();
        let cost = table
            .cost_for(&measurement("gpt-4o-mini", 1000, 500))
            .unwrap();
        let expected = 1000.0 / 1000.0 * 0.00015 + 500.0 / 1000.0 * 0.0006;
        assert!((cost - expected).abs() < 1e-12);
    }

    #[test]
    fn unknown_model_has_no_cost() {
        let table = PriceTable::builtin();
        assert!(table.cost_for(&measurement("unknown-model", 1000, 500)).is_none());
    }

    #[test]
    fn models_are_sorted() {
        let table = PriceTable::builtin();
        assert_eq!(table.models(), vec!["gpt-3.5-turbo", "gpt-4o", "gpt-4o-mini"]);
    }
}
