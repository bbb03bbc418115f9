//! The FM 301 metadata rule set.

mod loader;
mod rule;

use crate::error::SchemaError;

pub use loader::{load_schema, parse_schema, SchemaFormat};
pub use rule::{AllowedValue, FieldRule, SWEEP_PLACEHOLDER};

/// File name of the schema looked up next to the executable.
pub const SCHEMA_FILE_NAME: &str = "fm301_metadata.json";

/// Copy of `data/fm301_metadata.json` compiled into the binary.
pub const EMBEDDED_SCHEMA: &str = include_str!("../../data/fm301_metadata.json");

/// Loaded rule set. Mandatory rules keep document order, followed by optional rules.
#[derive(Debug, Clone)]
pub struct Schema {
    pub name: Option<String>,
    pub version: Option<String>,
    pub rules: Vec<FieldRule>,
}

impl Schema {
    pub fn embedded() -> Result<Self, SchemaError> {
        parse_schema(EMBEDDED_SCHEMA, SchemaFormat::Json)
    }

    pub fn mandatory(&self) -> impl Iterator<Item = &FieldRule> {
        self.rules.iter().filter(|rule| rule.required)
    }

    pub fn optional(&self) -> impl Iterator<Item = &FieldRule> {
        self.rules.iter().filter(|rule| !rule.required)
    }

    pub fn display_name(&self) -> String {
        match (&self.name, &self.version) {
            (Some(name), Some(version)) => format!("{name} {version}"),
            (Some(name), None) => name.clone(),
            _ => "unnamed schema".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_schema_loads() {
        let schema = Schema::embedded().unwrap();
        assert!(schema.mandatory().count() > 10);
        assert!(schema.optional().count() > 10);
        assert!(schema.rules.iter().any(FieldRule::has_sweep_placeholder));
    }

    #[test]
    fn embedded_schema_covers_radar_calibration() {
        let schema = Schema::embedded().unwrap();
        let calibration: Vec<String> = schema
            .optional()
            .map(|rule| rule.key.to_string())
            .filter(|key| key.starts_with("radar_calibration/"))
            .collect();
        assert!(calibration.contains(&"radar_calibration/calibration_time".to_string()));
        assert!(calibration.contains(&"radar_calibration/radar_constant_h".to_string()));
        assert!(schema
            .mandatory()
            .all(|rule| !rule.key.to_string().starts_with("radar_calibration/")));
    }
}
