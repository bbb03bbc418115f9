//! One validation run: load schema, extract fields, evaluate, assemble, render.

use tracing::info;

use crate::config::RunConfig;
use crate::dataset::{open_dataset, DatasetSource};
use crate::error::{CheckError, DatasetError};
use crate::evaluate::{evaluate, expand_sweeps, SweepSelection};
use crate::report::{assemble, stage_report, Report, ReportFormat, ReportMetadata};
use crate::schema::Schema;

/// Evaluate a dataset against a schema and assemble the report. No output is written.
pub fn check(
    schema: &Schema,
    dataset: &dyn DatasetSource,
    sweeps: SweepSelection,
) -> Result<Report, DatasetError> {
    let observed = dataset.observed_fields()?;
    info!(
        dataset = %dataset.label(),
        fields = observed.len(),
        sweep_groups = observed.sweep_groups().len(),
        "fields extracted"
    );

    let rules = expand_sweeps(&schema.rules, &observed, sweeps);
    let evaluations = evaluate(&rules, &observed);
    let report = assemble(
        &evaluations,
        ReportMetadata::new(dataset.label(), schema.display_name(), sweeps),
    );
    info!(
        rules = rules.len(),
        rows = report.rows.len(),
        mandatory = report.summary.mandatory.outcome.label(),
        optional = report.summary.optional.outcome.label(),
        "evaluation complete"
    );
    Ok(report)
}

/// Full run. Fatal errors abort before any report file is written.
pub fn run(config: &RunConfig) -> Result<Report, CheckError> {
    let schema = config.schema.load()?;
    info!(
        source = %config.schema.describe(),
        rules = schema.rules.len(),
        "schema loaded"
    );

    let report = {
        let dataset = open_dataset(&config.dataset)?;
        check(&schema, dataset.as_ref(), config.sweeps)?
    };

    // Nothing is committed until every output has been staged.
    let staged_report = stage_report(&report, &config.output, config.format)?;
    let staged_results = config
        .results_json
        .as_deref()
        .map(|path| stage_report(&report, path, Some(ReportFormat::Json)))
        .transpose()?;

    let format = staged_report.commit()?;
    info!(path = %config.output.display(), format = format.as_str(), "report written");
    if let Some(results) = staged_results {
        let path = results.path().to_path_buf();
        results.commit()?;
        info!(path = %path.display(), "results written");
    }
    Ok(report)
}
