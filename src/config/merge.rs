//! Config layer merging
//!
//! Layers are merged in priority order:
//! 1. Synthetic base (root filesystem)
//! 2. Platform base config
//! 3. User config (highest priority)
//!
//! Scalars from the upper layer win when present. Lists are concatenated,
//! lower entries first, with no deduplication: stages apply their own
//! last-wins-by-name rules where they need them.

use super::{Config, ConfigDirectives};
use serde_json::Value;
use tracing::{debug, error};

/// Merge two configs, `upper` taking precedence over `lower`.
///
/// The `ignition.config` directives of both inputs are consumed by rendering
/// and never carried into the result.
pub fn merge(lower: &Config, upper: &Config) -> Config {
    // Convert both to JSON values for structural merging
    let lower_value = serde_json::to_value(lower).unwrap_or(Value::Null);
    let upper_value = serde_json::to_value(upper).unwrap_or(Value::Null);

    let merged = merge_values(&lower_value, &upper_value);

    // Merging two serialized configs always yields the same shape
    let mut config = match serde_json::from_value::<Config>(merged) {
        Ok(config) => config,
        Err(e) => {
            error!("merged config does not deserialize: {}", e);
            Config::default()
        }
    };
    config.ignition.config = ConfigDirectives::default();
    config
}

/// Merge two JSON values recursively
pub fn merge_values(lower: &Value, upper: &Value) -> Value {
    match (lower, upper) {
        // Both are objects - merge recursively
        (Value::Object(lower_map), Value::Object(upper_map)) => {
            let mut result = lower_map.clone();

            for (key, upper_value) in upper_map {
                let merged = match result.get(key) {
                    Some(lower_value) => merge_values(lower_value, upper_value),
                    None => upper_value.clone(),
                };
                result.insert(key.clone(), merged);
            }

            Value::Object(result)
        }

        // Both are arrays - lower entries first, duplicates kept
        (Value::Array(lower_seq), Value::Array(upper_seq)) => {
            let mut result = lower_seq.clone();
            result.extend(upper_seq.iter().cloned());
            Value::Array(result)
        }

        // Upper is null - keep lower value
        (lower_value, Value::Null) => lower_value.clone(),

        // All other cases - upper wins
        (_, upper_value) => upper_value.clone(),
    }
}

/// Merge configs in order (later configs have higher priority)
pub fn merge_all(configs: &[Config]) -> Config {
    let Some((first, rest)) = configs.split_first() else {
        return Config::default();
    };

    rest.iter().fold(merge(first, &Config::default()), |acc, config| {
        debug!("Merging config layer");
        merge(&acc, config)
    })
}
