use std::fmt;

use regex::Regex;

use crate::dataset::{FieldKey, SWEEP_GROUP_PREFIX};
use crate::datatype::ExpectedType;

/// Group segment standing for "each selected sweep group".
pub const SWEEP_PLACEHOLDER: &str = "sweep_<n>";

/// A literal from a rule's allowed-value set, typed by the rule's datatype at load time.
#[derive(Debug, Clone, PartialEq)]
pub enum AllowedValue {
    Text(String),
    Integer(i128),
    Real(f64),
}

impl fmt::Display for AllowedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Real(value) => write!(f, "{value}"),
        }
    }
}

/// One declared metadata field. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub key: FieldKey,
    pub required: bool,
    pub expected_datatype: ExpectedType,
    /// Empty means any value is accepted.
    pub allowed_values: Vec<AllowedValue>,
    /// Anchored at the start of the value's text form.
    pub pattern: Option<Regex>,
    /// Enclosing variable for attribute rules declared under a variable entry.
    pub parent: Option<FieldKey>,
    pub description: Option<String>,
}

impl FieldRule {
    pub fn new(key: FieldKey, required: bool, expected_datatype: ExpectedType) -> Self {
        Self {
            key,
            required,
            expected_datatype,
            allowed_values: Vec::new(),
            pattern: None,
            parent: None,
            description: None,
        }
    }

    pub fn with_allowed_values(mut self, values: Vec<AllowedValue>) -> Self {
        self.allowed_values = values;
        self
    }

    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn with_parent(mut self, parent: FieldKey) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn requirement_label(&self) -> &'static str {
        if self.required {
            "Mandatory"
        } else {
            "Optional"
        }
    }

    pub fn has_value_constraint(&self) -> bool {
        !self.allowed_values.is_empty() || self.pattern.is_some()
    }

    pub fn has_sweep_placeholder(&self) -> bool {
        key_has_placeholder(&self.key)
    }

    /// Copy of this rule bound to a concrete sweep group.
    pub fn for_sweep(&self, sweep_group: &str) -> FieldRule {
        FieldRule {
            key: bind_sweep(&self.key, sweep_group),
            parent: self.parent.as_ref().map(|parent| bind_sweep(parent, sweep_group)),
            ..self.clone()
        }
    }

    /// Human-readable constraint: allowed values, the pattern, or nothing.
    pub fn expected_values_label(&self) -> Option<String> {
        let mut parts: Vec<String> = self.allowed_values.iter().map(ToString::to_string).collect();
        if let Some(pattern) = &self.pattern {
            parts.push(format!("/{}/", display_pattern(pattern)));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// Strip the `^(?:...)` anchor added at load time.
fn display_pattern(pattern: &Regex) -> &str {
    let raw = pattern.as_str();
    raw.strip_prefix("^(?:")
        .and_then(|inner| inner.strip_suffix(')'))
        .unwrap_or(raw)
}

fn key_has_placeholder(key: &FieldKey) -> bool {
    match key {
        FieldKey::GlobalAttribute(path) | FieldKey::Variable(path) => path.contains(SWEEP_PLACEHOLDER),
        FieldKey::VariableAttribute { variable, .. } => variable.contains(SWEEP_PLACEHOLDER),
    }
}

/// Placeholder form of a key bound to a concrete sweep: `sweep_2/x` becomes `sweep_<n>/x`.
pub(crate) fn sweep_template(key: &FieldKey) -> Option<FieldKey> {
    let unbind = |path: &str| -> Option<String> {
        let (head, rest) = path.split_once('/')?;
        let index = head.strip_prefix(SWEEP_GROUP_PREFIX)?;
        if index.is_empty() || !index.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }
        Some(format!("{SWEEP_PLACEHOLDER}/{rest}"))
    };
    match key {
        FieldKey::GlobalAttribute(path) => unbind(path).map(FieldKey::GlobalAttribute),
        FieldKey::Variable(path) => unbind(path).map(FieldKey::Variable),
        FieldKey::VariableAttribute {
            variable,
            attribute,
        } => unbind(variable).map(|variable| FieldKey::VariableAttribute {
            variable,
            attribute: attribute.clone(),
        }),
    }
}

fn bind_sweep(key: &FieldKey, sweep_group: &str) -> FieldKey {
    let bind = |path: &str| path.replace(SWEEP_PLACEHOLDER, sweep_group);
    match key {
        FieldKey::GlobalAttribute(path) => FieldKey::GlobalAttribute(bind(path)),
        FieldKey::Variable(path) => FieldKey::Variable(bind(path)),
        FieldKey::VariableAttribute {
            variable,
            attribute,
        } => FieldKey::VariableAttribute {
            variable: bind(variable),
            attribute: attribute.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_a_sweep_rewrites_key_and_parent() {
        let rule = FieldRule::new(
            FieldKey::variable_attribute("sweep_<n>/azimuth", "units"),
            true,
            ExpectedType::Text,
        )
        .with_parent(FieldKey::variable("sweep_<n>/azimuth"));
        assert!(rule.has_sweep_placeholder());

        let bound = rule.for_sweep("sweep_3");
        assert_eq!(bound.key, FieldKey::variable_attribute("sweep_3/azimuth", "units"));
        assert_eq!(bound.parent, Some(FieldKey::variable("sweep_3/azimuth")));
        assert!(!bound.has_sweep_placeholder());
    }

    #[test]
    fn concrete_sweep_keys_map_back_to_their_template() {
        assert_eq!(
            sweep_template(&FieldKey::variable_attribute("sweep_12/azimuth", "units")),
            Some(FieldKey::variable_attribute("sweep_<n>/azimuth", "units"))
        );
        assert_eq!(
            sweep_template(&FieldKey::variable("sweep_0/sweep_mode")),
            Some(FieldKey::variable("sweep_<n>/sweep_mode"))
        );
        assert_eq!(sweep_template(&FieldKey::variable("sweep_x/sweep_mode")), None);
        assert_eq!(sweep_template(&FieldKey::variable("radar_parameters/frequency")), None);
        assert_eq!(sweep_template(&FieldKey::global("sweep_0")), None);
    }

    #[test]
    fn expected_values_label_lists_values_then_pattern() {
        let rule = FieldRule::new(FieldKey::global("calendar"), false, ExpectedType::Text)
            .with_allowed_values(vec![AllowedValue::Text("standard".to_string())])
            .with_pattern(Regex::new("^(?:greg.*)").unwrap());
        assert_eq!(rule.expected_values_label().as_deref(), Some("standard, /greg.*/"));
        assert_eq!(
            FieldRule::new(FieldKey::global("title"), true, ExpectedType::Text).expected_values_label(),
            None
        );
    }
}
