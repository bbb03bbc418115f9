use std::collections::HashMap;

use crate::evaluate::{Evaluation, Verdict};

use super::{
    DetailRow, GroupSummary, Report, ReportMetadata, ReportSummary, Section, SectionOutcome,
    SectionSummary,
};

/// Turn evaluations into a report. Not-applicable evaluations produce no rows and no counts.
pub fn assemble(evaluations: &[Evaluation], metadata: ReportMetadata) -> Report {
    let applicable = || {
        evaluations
            .iter()
            .filter(|evaluation| evaluation.verdict != Verdict::NotApplicable)
    };

    let rows: Vec<DetailRow> = applicable()
        .filter(|evaluation| evaluation.rule.required)
        .chain(applicable().filter(|evaluation| !evaluation.rule.required))
        .map(detail_row)
        .collect();

    let mandatory = summarize(&rows, Section::Mandatory);
    let optional = summarize(&rows, Section::Optional);
    let overall = if mandatory.outcome != SectionOutcome::Pass {
        SectionOutcome::FailMandatory
    } else if optional.outcome != SectionOutcome::Pass {
        SectionOutcome::FailOptional
    } else {
        SectionOutcome::Pass
    };

    Report {
        metadata,
        summary: ReportSummary {
            mandatory,
            optional,
            overall,
        },
        groups: group_summaries(&rows),
        rows,
    }
}

fn detail_row(evaluation: &Evaluation) -> DetailRow {
    let rule = &evaluation.rule;
    let observed = evaluation.observed.as_ref();
    DetailRow {
        section: if rule.required {
            Section::Mandatory
        } else {
            Section::Optional
        },
        group: rule.key.group_label(),
        field: rule.key.to_string(),
        kind: rule.key.kind_label().to_string(),
        requirement: rule.requirement_label().to_string(),
        available: observed.is_some(),
        expected_datatype: rule.expected_datatype.to_string(),
        observed_datatype: observed.map(|field| field.datatype.to_string()),
        expected_values: rule.expected_values_label(),
        observed_value: observed
            .and_then(|field| field.value.as_ref())
            .map(ToString::to_string),
        verdict: evaluation.verdict,
    }
}

fn summarize(rows: &[DetailRow], section: Section) -> SectionSummary {
    let mut summary = SectionSummary {
        section,
        evaluated: 0,
        passed: 0,
        missing: 0,
        wrong_datatype: 0,
        wrong_value: 0,
        outcome: SectionOutcome::Pass,
    };
    for row in rows.iter().filter(|row| row.section == section) {
        summary.evaluated += 1;
        match row.verdict {
            Verdict::Pass => summary.passed += 1,
            Verdict::MissingMandatory => summary.missing += 1,
            Verdict::WrongDatatype => summary.wrong_datatype += 1,
            Verdict::WrongValue => summary.wrong_value += 1,
            Verdict::NotApplicable => {}
        }
    }
    if summary.failed() > 0 {
        summary.outcome = match section {
            Section::Mandatory => SectionOutcome::FailMandatory,
            Section::Optional => SectionOutcome::FailOptional,
        };
    }
    summary
}

/// Groups in order of first appearance.
fn group_summaries(rows: &[DetailRow]) -> Vec<GroupSummary> {
    let mut groups: Vec<GroupSummary> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for row in rows {
        let position = *index.entry(row.group.as_str()).or_insert_with(|| {
            groups.push(GroupSummary {
                group: row.group.clone(),
                passed: 0,
                fail_mandatory: 0,
                fail_optional: 0,
            });
            groups.len() - 1
        });
        let group = &mut groups[position];
        match (row.verdict.is_failure(), row.section) {
            (false, _) => group.passed += 1,
            (true, Section::Mandatory) => group.fail_mandatory += 1,
            (true, Section::Optional) => group.fail_optional += 1,
        }
    }
    groups
}
