use std::fs;
use std::path::Path;

use fm301check::config::{RunConfig, SchemaLocation};
use fm301check::dataset::{InMemoryDataset, NcoJsonDataset, ObservedValue};
use fm301check::datatype::StorageType;
use fm301check::evaluate::{SweepSelection, Verdict};
use fm301check::pipeline::{check, run};
use fm301check::report::{Section, SectionOutcome};
use fm301check::schema::{parse_schema, Schema, SchemaFormat};
use fm301check::CheckError;

const SMALL_SCHEMA: &str = r#"{
    "name": "small",
    "version": "0.1",
    "mandatory": {
        "title": { "datatype": "string" },
        "latitude": {
            "kind": "variable",
            "datatype": "double",
            "attributes": { "units": { "datatype": "string", "values": ["degrees_north"] } }
        },
        "sweep_<n>/sweep_mode": {
            "kind": "variable",
            "datatype": "string",
            "values": ["azimuth_surveillance", "rhi"]
        }
    },
    "optional": {
        "site_name": { "datatype": "string" },
        "radar_parameters/radar_beam_width_h": {
            "kind": "variable",
            "datatype": "real",
            "attributes": {
                "units": { "datatype": "string", "values": ["degrees"], "required": true }
            }
        }
    }
}"#;

fn small_schema() -> Schema {
    parse_schema(SMALL_SCHEMA, SchemaFormat::Json).expect("schema should parse")
}

fn text(value: &str) -> ObservedValue {
    ObservedValue::Text(value.to_string())
}

fn compliant() -> InMemoryDataset {
    InMemoryDataset::new("memory")
        .with_text("title", "volume")
        .with_variable("latitude", StorageType::Float64, Some(ObservedValue::Real(51.1)))
        .with_variable_attribute("latitude", "units", StorageType::Char, text("degrees_north"))
        .with_variable("sweep_0/sweep_mode", StorageType::String, Some(text("rhi")))
        .with_variable("sweep_1/sweep_mode", StorageType::String, Some(text("ppi")))
}

#[test]
fn compliant_dataset_passes_and_skips_absent_optionals() {
    let report = check(&small_schema(), &compliant(), SweepSelection::First).unwrap();

    assert_eq!(report.summary.overall, SectionOutcome::Pass);
    assert_eq!(report.summary.mandatory.evaluated, 4);
    assert_eq!(report.summary.optional.evaluated, 0);
    assert!(report
        .rows
        .iter()
        .all(|row| !row.field.starts_with("radar_parameters")));
    assert_eq!(report.metadata.schema, "small 0.1");
}

#[test]
fn empty_optional_attribute_counts_as_used() {
    let dataset = compliant().with_text("site_name", "");
    let report = check(&small_schema(), &dataset, SweepSelection::First).unwrap();

    let site = report
        .optional_rows()
        .find(|row| row.field == "site_name")
        .expect("present optional attribute is evaluated");
    assert_eq!(site.verdict, Verdict::Pass);
    assert_eq!(site.observed_value.as_deref(), Some(""));
}

#[test]
fn required_attribute_of_present_optional_variable_is_enforced() {
    let dataset = compliant().with_variable(
        "radar_parameters/radar_beam_width_h",
        StorageType::Float32,
        Some(ObservedValue::Real(1.0)),
    );
    let report = check(&small_schema(), &dataset, SweepSelection::First).unwrap();

    let units = report
        .rows
        .iter()
        .find(|row| row.field == "radar_parameters/radar_beam_width_h:units")
        .expect("attribute of a present optional variable is evaluated");
    assert_eq!(units.verdict, Verdict::MissingMandatory);
    assert_eq!(units.section, Section::Mandatory);
    assert_eq!(units.group, "radar_parameters");
    assert_eq!(report.summary.overall, SectionOutcome::FailMandatory);

    let variable = report
        .optional_rows()
        .find(|row| row.field == "radar_parameters/radar_beam_width_h")
        .unwrap();
    assert_eq!(variable.verdict, Verdict::Pass);
}

#[test]
fn mandatory_variable_attribute_is_required_even_without_variable() {
    let dataset = InMemoryDataset::new("memory")
        .with_text("title", "volume")
        .with_variable("sweep_0/sweep_mode", StorageType::String, Some(text("rhi")));
    let report = check(&small_schema(), &dataset, SweepSelection::First).unwrap();

    let missing: Vec<&str> = report
        .mandatory_rows()
        .filter(|row| row.verdict == Verdict::MissingMandatory)
        .map(|row| row.field.as_str())
        .collect();
    assert_eq!(missing, vec!["latitude", "latitude:units"]);
    assert_eq!(report.summary.mandatory.missing, 2);
    assert_eq!(report.summary.overall, SectionOutcome::FailMandatory);
}

#[test]
fn sweep_selection_controls_expansion() {
    let schema = small_schema();
    let first = check(&schema, &compliant(), SweepSelection::First).unwrap();
    let all = check(&schema, &compliant(), SweepSelection::All).unwrap();

    assert!(first.rows.iter().all(|row| row.group != "sweep_1"));
    let second = all
        .rows
        .iter()
        .find(|row| row.field == "sweep_1/sweep_mode")
        .unwrap();
    assert_eq!(second.verdict, Verdict::WrongValue);
    assert_eq!(all.summary.overall, SectionOutcome::FailMandatory);
}

#[test]
fn dataset_without_sweeps_is_checked_against_sweep_zero() {
    let dataset = InMemoryDataset::new("memory")
        .with_text("title", "volume")
        .with_variable("latitude", StorageType::Float64, Some(ObservedValue::Real(51.1)))
        .with_variable_attribute("latitude", "units", StorageType::Char, text("degrees_north"));
    let report = check(&small_schema(), &dataset, SweepSelection::All).unwrap();

    let sweep_mode = report
        .rows
        .iter()
        .find(|row| row.field == "sweep_0/sweep_mode")
        .unwrap();
    assert!(!sweep_mode.available);
    assert_eq!(sweep_mode.verdict, Verdict::MissingMandatory);
}

#[test]
fn repeated_checks_produce_identical_rows() {
    let schema = small_schema();
    let dataset = compliant().with_text("site_name", "Chilbolton");
    let first = check(&schema, &dataset, SweepSelection::All).unwrap();
    let second = check(&schema, &dataset, SweepSelection::All).unwrap();

    assert_eq!(first.rows, second.rows);
    assert_eq!(first.summary, second.summary);
    assert_eq!(first.groups, second.groups);
}

#[test]
fn group_summaries_follow_first_appearance() {
    let report = check(&small_schema(), &compliant(), SweepSelection::All).unwrap();
    let groups: Vec<&str> = report.groups.iter().map(|group| group.group.as_str()).collect();
    assert_eq!(
        groups,
        vec!["global_attributes", "root_variables", "sweep_0", "sweep_1"]
    );
    let sweep_1 = &report.groups[3];
    assert_eq!(sweep_1.fail_mandatory, 1);
    assert_eq!(sweep_1.passed, 0);
}

#[test]
fn embedded_schema_accepts_the_fixture_volume() {
    let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/compliant_volume.json");
    let dataset = NcoJsonDataset::open(&fixture).unwrap();
    let report = check(&Schema::embedded().unwrap(), &dataset, SweepSelection::First).unwrap();

    let failures: Vec<(&str, Verdict)> = report
        .rows
        .iter()
        .filter(|row| row.verdict.is_failure())
        .map(|row| (row.field.as_str(), row.verdict))
        .collect();
    assert!(failures.is_empty(), "unexpected failures: {failures:?}");
    assert!(report
        .rows
        .iter()
        .any(|row| row.field == "sweep_0/time:units" && row.verdict == Verdict::Pass));
}

#[test]
fn char_encoded_strings_pass_the_bundled_rules() {
    let dataset = InMemoryDataset::new("memory")
        .with_variable(
            "time_coverage_start",
            StorageType::Char,
            Some(ObservedValue::from_char_bytes(b"2024-05-01T12:00:00Z\0\0\0\0")),
        )
        .with_variable(
            "sweep_0/sweep_mode",
            StorageType::Char,
            Some(ObservedValue::from_char_bytes(b"azimuth_surveillance    ")),
        );
    let report = check(&Schema::embedded().unwrap(), &dataset, SweepSelection::First).unwrap();

    for field in ["time_coverage_start", "sweep_0/sweep_mode"] {
        let row = report.rows.iter().find(|row| row.field == field).unwrap();
        assert_eq!(row.section, Section::Mandatory);
        assert_eq!(row.verdict, Verdict::Pass, "{field}");
    }
}

#[test]
fn schema_errors_abort_before_the_dataset_is_touched() {
    let dir = tempfile::tempdir().unwrap();
    let schema = dir.path().join("schema.json");
    fs::write(
        &schema,
        r#"{ "mandatory": { "title": { "datatype": "string" }, "title": { "datatype": "string" } }, "optional": {} }"#,
    )
    .unwrap();

    let mut config = RunConfig::new(dir.path().join("absent.json"), dir.path().join("report.md"));
    config.schema = SchemaLocation::File(schema);

    let err = run(&config).unwrap_err();
    assert!(matches!(err, CheckError::Schema(_)), "{err}");
    assert!(!config.output.exists());
}

#[test]
fn unwritable_results_path_leaves_no_report() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/compliant_volume.json");
    let mut config = RunConfig::new(fixture, dir.path().join("report.md"));
    config.results_json = Some(dir.path().join("missing").join("results.json"));

    let err = run(&config).unwrap_err();
    assert!(matches!(err, CheckError::Render(_)), "{err}");
    assert!(!config.output.exists());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn run_writes_report_and_sidecar() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/compliant_volume.json");
    let mut config = RunConfig::new(fixture.clone(), dir.path().join("report.csv"));
    config.sweeps = SweepSelection::All;
    config.results_json = Some(dir.path().join("results.json"));

    let report = run(&config).unwrap();
    assert_eq!(report.summary.overall, SectionOutcome::FailMandatory);

    let csv = fs::read_to_string(dir.path().join("report.csv")).unwrap();
    assert_eq!(csv.lines().count(), report.rows.len() + 1);

    let results: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("results.json")).unwrap()).unwrap();
    assert_eq!(results["rows"].as_array().unwrap().len(), report.rows.len());
    assert!(results["metadata"]["generated_at"].is_string());
}
