//! Rule evaluation: one verdict per rule, as a pure function of rules and observed fields.

mod sweeps;
mod values;

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::dataset::{FieldKey, ObservedField, ObservedFields};
use crate::schema::FieldRule;

pub use sweeps::{expand_sweeps, selected_sweeps, SweepSelection};
pub use values::value_allowed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    MissingMandatory,
    WrongDatatype,
    WrongValue,
    /// Optional field absent; excluded from the report.
    NotApplicable,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::MissingMandatory => "missing_mandatory",
            Self::WrongDatatype => "wrong_datatype",
            Self::WrongValue => "wrong_value",
            Self::NotApplicable => "not_applicable",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pass => "Pass",
            Self::MissingMandatory => "Missing (mandatory)",
            Self::WrongDatatype => "Wrong datatype",
            Self::WrongValue => "Wrong value",
            Self::NotApplicable => "Not applicable",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::MissingMandatory | Self::WrongDatatype | Self::WrongValue
        )
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rule, the field it was checked against (if present) and the outcome.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub rule: FieldRule,
    pub observed: Option<ObservedField>,
    pub verdict: Verdict,
}

/// Evaluate every rule independently. Rules must already be bound to concrete sweeps.
pub fn evaluate(rules: &[FieldRule], observed: &ObservedFields) -> Vec<Evaluation> {
    let required_by_key: HashMap<&FieldKey, bool> =
        rules.iter().map(|rule| (&rule.key, rule.required)).collect();

    rules
        .iter()
        .map(|rule| {
            let field = observed.get(&rule.key);
            let verdict = if parent_unused(rule, observed, &required_by_key) {
                Verdict::NotApplicable
            } else {
                verdict_for(rule, field)
            };
            Evaluation {
                rule: rule.clone(),
                observed: field.cloned(),
                verdict,
            }
        })
        .collect()
}

/// Verdict for one rule against zero-or-one observed field.
/// The datatype check always runs before the value check.
pub fn verdict_for(rule: &FieldRule, field: Option<&ObservedField>) -> Verdict {
    let Some(field) = field else {
        return if rule.required {
            Verdict::MissingMandatory
        } else {
            Verdict::NotApplicable
        };
    };

    if !rule.expected_datatype.accepts(&field.datatype) {
        return Verdict::WrongDatatype;
    }
    if rule.has_value_constraint() && !value_allowed(rule, field) {
        return Verdict::WrongValue;
    }
    Verdict::Pass
}

/// Nested attribute rules are skipped when their optional parent variable is absent.
fn parent_unused(
    rule: &FieldRule,
    observed: &ObservedFields,
    required_by_key: &HashMap<&FieldKey, bool>,
) -> bool {
    let Some(parent) = &rule.parent else {
        return false;
    };
    let parent_required = required_by_key.get(parent).copied().unwrap_or(false);
    !parent_required && !observed.contains(parent)
}
