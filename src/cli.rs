use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::{RunConfig, SchemaLocation};
use crate::evaluate::SweepSelection;
use crate::pipeline;
use crate::report::ReportFormat;

/// Check a weather radar volume against the WMO FM 301 metadata rules.
#[derive(Debug, Parser)]
#[command(name = "fm301check", version, about)]
pub struct Cli {
    /// Dataset to check: an `ncks --json` dump, or a netCDF file when built with `netcdf`.
    pub dataset: PathBuf,

    /// Report file; the format follows its extension (.md, .html, .pdf, .json, .csv).
    pub output: PathBuf,

    /// Schema file (JSON or YAML) overriding the bundled rule set.
    #[arg(long, env = "FM301_SCHEMA")]
    pub schema: Option<PathBuf>,

    /// Which sweep groups per-sweep rules are checked against.
    #[arg(long, value_enum, env = "FM301_SWEEPS", default_value_t = SweepSelection::First)]
    pub sweeps: SweepSelection,

    /// Force the report format instead of inferring it from the output extension.
    #[arg(long, value_enum)]
    pub format: Option<ReportFormat>,

    /// Also write the full results as JSON to this path.
    #[arg(long)]
    pub results_json: Option<PathBuf>,

    /// Log pipeline stages to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn into_config(self) -> RunConfig {
        RunConfig {
            dataset: self.dataset,
            output: self.output,
            schema: SchemaLocation::resolve(self.schema),
            sweeps: self.sweeps,
            format: self.format,
            results_json: self.results_json,
        }
    }
}

/// Exit codes: 0 when a report was written (whatever the verdict), 1 on a fatal
/// error, 2 on bad usage.
pub fn run_with_args(args: &[String]) -> i32 {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { 2 } else { 0 };
            let _ = err.print();
            return code;
        }
    };

    init_logging(cli.verbose);
    let config = cli.into_config();

    match pipeline::run(&config) {
        Ok(report) => {
            println!(
                "validation complete: {} (mandatory: {}, optional: {}); report saved to {}",
                report.summary.overall.label(),
                report.summary.mandatory.outcome.label(),
                report.summary.optional.outcome.label(),
                config.output.display()
            );
            0
        }
        Err(err) => {
            eprintln!("fm301check: {err}");
            1
        }
    }
}

/// `RUST_LOG` wins when set; otherwise warnings only, or debug with `--verbose`.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "fm301check=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn missing_positionals_is_a_usage_error() {
        assert_eq!(run_with_args(&args(&["fm301check"])), 2);
        assert_eq!(run_with_args(&args(&["fm301check", "volume.json"])), 2);
    }

    #[test]
    fn unknown_sweep_selection_is_a_usage_error() {
        let code = run_with_args(&args(&[
            "fm301check",
            "volume.json",
            "report.md",
            "--sweeps",
            "some",
        ]));
        assert_eq!(code, 2);
    }

    #[test]
    fn help_exits_cleanly() {
        assert_eq!(run_with_args(&args(&["fm301check", "--help"])), 0);
    }

    #[test]
    fn options_map_onto_run_config() {
        let cli = Cli::try_parse_from([
            "fm301check",
            "volume.json",
            "out.txt",
            "--schema",
            "rules.yaml",
            "--sweeps",
            "all",
            "--format",
            "csv",
            "--results-json",
            "results.json",
        ])
        .unwrap();
        let config = cli.into_config();
        assert_eq!(config.schema, SchemaLocation::File(PathBuf::from("rules.yaml")));
        assert_eq!(config.sweeps, SweepSelection::All);
        assert_eq!(config.format, Some(ReportFormat::Csv));
        assert_eq!(config.results_json, Some(PathBuf::from("results.json")));
    }

    #[test]
    fn missing_dataset_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("report.md");
        let code = run_with_args(&args(&[
            "fm301check",
            dir.path().join("absent.json").to_str().unwrap(),
            output.to_str().unwrap(),
        ]));
        assert_eq!(code, 1);
        assert!(!output.exists());
    }
}
