//! Write the parsed advisory as JSON
//! It presents the flaws in a JSON format and prints it on STDOUT.

use serde_json::value::Value;
use serde_json::Map;

use super::Writer;
use crate::models::ParsedAdvisory;

/// A writer to print the flaws as JSON.
pub struct JsonWriter {
    /// The URL parsed
    url: String,
}

impl Writer for JsonWriter {
    /// Create a new JsonWriter
    fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }

    /// Formats the parsed advisory
    /// { "url": "...", "flaws": [...], "warnings": [...] }
    fn render(&self, parsed: &ParsedAdvisory) -> String {
        let mut map = Map::new();
        map.insert("url".to_string(), Value::String(self.url.clone()));

        // serde_json::to_value() should never return Err, since the models
        // derive Serialize with string keys only.
        let flaws_value = serde_json::to_value(&parsed.flaws).unwrap_or(Value::Null);
        map.insert("flaws".to_string(), flaws_value);
        map.insert(
            "warnings".to_string(),
            Value::Array(
                parsed
                    .warnings
                    .iter()
                    .map(|w| Value::String(w.clone()))
                    .collect(),
            ),
        );
        format!("{:#}", Value::Object(map))
    }
}
