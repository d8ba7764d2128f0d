//! Conversions from configuration and front-matter values into template
//! [`Value`]s.

use crate::config::Config;
use gtmpl_value::Value;
use serde_yaml::Value as Yaml;
use std::collections::HashMap;

/// Converts a YAML value into a template value. Mapping keys that aren't
/// scalars are dropped.
pub fn from_yaml(yaml: &Yaml) -> Value {
    match yaml {
        Yaml::Null => Value::Nil,
        Yaml::Bool(b) => Value::from(*b),
        Yaml::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Value::from(i),
            (None, Some(f)) => Value::from(f),
            (None, None) => Value::String(n.to_string()),
        },
        Yaml::String(s) => Value::String(s.clone()),
        Yaml::Sequence(items) => Value::Array(items.iter().map(from_yaml).collect()),
        Yaml::Mapping(mapping) => {
            let mut m: HashMap<String, Value> = HashMap::new();
            for (key, value) in mapping {
                if let Some(key) = crate::attributes::scalar_to_string(key) {
                    m.insert(key, from_yaml(value));
                }
            }
            Value::Object(m)
        }
    }
}

/// Converts an optional string into a template value, `None` becoming nil.
pub fn from_option(opt: &Option<String>) -> Value {
    match opt {
        Some(s) => Value::String(s.clone()),
        None => Value::Nil,
    }
}

impl From<&Config> for Value {
    /// Exposes every configuration key as a field of an object, which is
    /// bound as `site` in templates.
    fn from(config: &Config) -> Value {
        let m: HashMap<String, Value> = config
            .iter()
            .map(|(key, value)| (key.clone(), from_yaml(value)))
            .collect();
        Value::Object(m)
    }
}
