//! Field extraction: what a dataset actually carries, independent of container format.

mod field;
mod memory;
mod nco_json;
#[cfg(feature = "netcdf")]
mod netcdf_file;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::DatasetError;

pub use field::{FieldKey, ObservedField, ObservedValue};
pub use memory::InMemoryDataset;
pub use nco_json::NcoJsonDataset;
#[cfg(feature = "netcdf")]
pub use netcdf_file::NetcdfDataset;

/// Prefix of the per-sweep groups in an FM 301 volume.
pub const SWEEP_GROUP_PREFIX: &str = "sweep_";

/// The single capability the evaluator needs from a container reader.
pub trait DatasetSource {
    /// Human-readable label for reports and log lines.
    fn label(&self) -> String;

    /// List every attribute and variable present, with datatype and value.
    fn observed_fields(&self) -> Result<ObservedFields, DatasetError>;
}

/// Fields present in one dataset, keyed by identity, plus the group paths seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservedFields {
    fields: BTreeMap<FieldKey, ObservedField>,
    groups: BTreeSet<String>,
}

impl ObservedFields {
    pub fn insert(&mut self, field: ObservedField) {
        self.fields.insert(field.key.clone(), field);
    }

    pub fn add_group(&mut self, path: impl Into<String>) {
        self.groups.insert(path.into());
    }

    pub fn get(&self, key: &FieldKey) -> Option<&ObservedField> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &FieldKey) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObservedField> {
        self.fields.values()
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(String::as_str)
    }

    /// Root-level `sweep_<digits>` groups in numeric order.
    pub fn sweep_groups(&self) -> Vec<String> {
        let mut sweeps: Vec<(u32, &String)> = self
            .groups
            .iter()
            .filter_map(|group| {
                let index = group.strip_prefix(SWEEP_GROUP_PREFIX)?;
                index.parse::<u32>().ok().map(|n| (n, group))
            })
            .collect();
        sweeps.sort();
        sweeps.into_iter().map(|(_, group)| group.clone()).collect()
    }
}

/// Open a dataset, picking the reader from the file extension.
pub fn open_dataset(path: &Path) -> Result<Box<dyn DatasetSource>, DatasetError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("nc") | Some("nc4") | Some("cdf") | Some("h5") => open_netcdf(path),
        _ => Ok(Box::new(NcoJsonDataset::open(path)?)),
    }
}

#[cfg(feature = "netcdf")]
fn open_netcdf(path: &Path) -> Result<Box<dyn DatasetSource>, DatasetError> {
    Ok(Box::new(NetcdfDataset::open(path)?))
}

#[cfg(not(feature = "netcdf"))]
fn open_netcdf(path: &Path) -> Result<Box<dyn DatasetSource>, DatasetError> {
    Err(DatasetError::NetcdfUnsupported(path.to_path_buf()))
}
