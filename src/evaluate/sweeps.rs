//! Expansion of `sweep_<n>` rules onto the sweep groups a volume contains.

use clap::ValueEnum;
use serde::Serialize;

use crate::dataset::ObservedFields;
use crate::schema::FieldRule;

/// Sweep group used when a volume has none; keeps mandatory sweep fields reportable.
const FALLBACK_SWEEP: &str = "sweep_0";

/// Which sweep groups `sweep_<n>` rules are checked against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepSelection {
    /// Only the first sweep group.
    #[default]
    First,
    /// Every sweep group, in numeric order.
    All,
}

impl SweepSelection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::All => "all",
        }
    }
}

pub fn selected_sweeps(observed: &ObservedFields, selection: SweepSelection) -> Vec<String> {
    let mut sweeps = observed.sweep_groups();
    if sweeps.is_empty() {
        return vec![FALLBACK_SWEEP.to_string()];
    }
    if selection == SweepSelection::First {
        sweeps.truncate(1);
    }
    sweeps
}

/// Bind placeholder rules to concrete sweeps. Rules without a placeholder keep their
/// position; the per-sweep block is emitted where the first placeholder rule stood,
/// sweep by sweep.
pub fn expand_sweeps(
    rules: &[FieldRule],
    observed: &ObservedFields,
    selection: SweepSelection,
) -> Vec<FieldRule> {
    let templates: Vec<&FieldRule> = rules
        .iter()
        .filter(|rule| rule.has_sweep_placeholder())
        .collect();
    if templates.is_empty() {
        return rules.to_vec();
    }

    let sweeps = selected_sweeps(observed, selection);
    let mut expanded = Vec::with_capacity(rules.len() + templates.len() * sweeps.len());
    let mut block_emitted = false;
    for rule in rules {
        if !rule.has_sweep_placeholder() {
            expanded.push(rule.clone());
            continue;
        }
        if block_emitted {
            continue;
        }
        for sweep in &sweeps {
            expanded.extend(templates.iter().map(|template| template.for_sweep(sweep)));
        }
        block_emitted = true;
    }
    expanded
}
