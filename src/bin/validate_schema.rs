//! Lint schema files: load each one and print its rule counts.
//! Run: cargo run --bin validate_schema [schema.json|schema.yaml ...]
//! With no arguments the bundled data/fm301_metadata.json is checked.

use std::path::{Path, PathBuf};

use fm301check::schema::load_schema;

fn main() {
    let mut paths: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
        paths.push(Path::new(&manifest_dir).join("data").join("fm301_metadata.json"));
    }

    let mut failed = 0;
    for path in &paths {
        match load_schema(path) {
            Ok(schema) => {
                let sweep_rules = schema
                    .rules
                    .iter()
                    .filter(|rule| rule.has_sweep_placeholder())
                    .count();
                let nested = schema.rules.iter().filter(|rule| rule.parent.is_some()).count();
                let constrained = schema
                    .rules
                    .iter()
                    .filter(|rule| rule.has_value_constraint())
                    .count();
                println!(
                    "{}: {} ({} mandatory, {} optional, {} per-sweep, {} nested attributes, {} value-constrained)",
                    path.display(),
                    schema.display_name(),
                    schema.mandatory().count(),
                    schema.optional().count(),
                    sweep_rules,
                    nested,
                    constrained
                );
            }
            Err(err) => {
                eprintln!("{}: {err}", path.display());
                failed += 1;
            }
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
}
