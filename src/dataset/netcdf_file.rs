//! Native netCDF-4 reader (cargo feature `netcdf`, links libnetcdf).

use std::path::{Path, PathBuf};

use netcdf::types::{FloatType, IntType, NcVariableType};
use netcdf::{AttributeValue, Extent, Group, Variable};
use tracing::warn;

use crate::datatype::StorageType;
use crate::error::DatasetError;

use super::{DatasetSource, FieldKey, ObservedField, ObservedFields, ObservedValue};

/// Handle to an open netCDF file; closed when dropped.
pub struct NetcdfDataset {
    path: PathBuf,
    file: netcdf::File,
}

impl NetcdfDataset {
    pub fn open(path: &Path) -> Result<Self, DatasetError> {
        let file = netcdf::open(path).map_err(|err| DatasetError::Unreadable {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    fn walk_group(&self, prefix: &str, group: &Group<'_>, fields: &mut ObservedFields) {
        for attribute in group.attributes() {
            let key = FieldKey::global(join(prefix, attribute.name()));
            fields.insert(decode_attribute(key, attribute.value()));
        }

        for variable in group.variables() {
            let path = join(prefix, &variable.name());
            self.variable(&path, &variable, fields);
        }

        for child in group.groups() {
            let path = join(prefix, &child.name());
            fields.add_group(path.clone());
            self.walk_group(&path, &child, fields);
        }
    }

    fn variable(&self, path: &str, variable: &Variable<'_>, fields: &mut ObservedFields) {
        let datatype = storage_type(&variable.vartype());
        let value = representative_value(variable, &datatype);
        fields.insert(ObservedField::new(
            FieldKey::variable(path),
            datatype,
            value,
        ));

        for attribute in variable.attributes() {
            let key = FieldKey::variable_attribute(path, attribute.name());
            fields.insert(decode_attribute(key, attribute.value()));
        }
    }
}

impl DatasetSource for NetcdfDataset {
    fn label(&self) -> String {
        self.path.display().to_string()
    }

    fn observed_fields(&self) -> Result<ObservedFields, DatasetError> {
        let root = self.file.root().ok_or_else(|| DatasetError::UnrecognizedFormat {
            path: self.path.clone(),
            message: "file has no root group".to_string(),
        })?;
        let mut fields = ObservedFields::default();
        self.walk_group("", &root, &mut fields);
        Ok(fields)
    }
}

/// An attribute that fails to decode is still present: it is kept with an unknown
/// type so the evaluator reports a datatype problem rather than a missing field.
fn decode_attribute(key: FieldKey, value: netcdf::Result<AttributeValue>) -> ObservedField {
    match value {
        Ok(value) => {
            let (datatype, value) = convert_attribute(value);
            ObservedField::new(key, datatype, value)
        }
        Err(err) => {
            warn!(field = %key, error = %err, "unable to decode attribute");
            ObservedField::undecodable(key, "undecodable")
        }
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

fn storage_type(vartype: &NcVariableType) -> StorageType {
    match vartype {
        NcVariableType::Char => StorageType::Char,
        NcVariableType::String => StorageType::String,
        NcVariableType::Int(IntType::I8) => StorageType::Int8,
        NcVariableType::Int(IntType::U8) => StorageType::UInt8,
        NcVariableType::Int(IntType::I16) => StorageType::Int16,
        NcVariableType::Int(IntType::U16) => StorageType::UInt16,
        NcVariableType::Int(IntType::I32) => StorageType::Int32,
        NcVariableType::Int(IntType::U32) => StorageType::UInt32,
        NcVariableType::Int(IntType::I64) => StorageType::Int64,
        NcVariableType::Int(IntType::U64) => StorageType::UInt64,
        NcVariableType::Float(FloatType::F32) => StorageType::Float32,
        NcVariableType::Float(FloatType::F64) => StorageType::Float64,
        other => StorageType::Other(format!("{other:?}").to_ascii_lowercase()),
    }
}

/// Scalar value, or the first element of an array variable.
fn representative_value(variable: &Variable<'_>, datatype: &StorageType) -> Option<ObservedValue> {
    if variable.len() == 0 {
        return None;
    }
    let first: Vec<usize> = vec![0; variable.dimensions().len()];
    match datatype {
        StorageType::String => variable.get_string(first.as_slice()).ok().map(ObservedValue::Text),
        StorageType::Float32 | StorageType::Float64 => variable
            .get_value::<f64, _>(first.as_slice())
            .ok()
            .map(ObservedValue::Real),
        StorageType::UInt64 => variable
            .get_value::<u64, _>(first.as_slice())
            .ok()
            .map(|value| ObservedValue::Integer(i128::from(value))),
        StorageType::Int8
        | StorageType::UInt8
        | StorageType::Int16
        | StorageType::UInt16
        | StorageType::Int32
        | StorageType::UInt32
        | StorageType::Int64 => variable
            .get_value::<i64, _>(first.as_slice())
            .ok()
            .map(|value| ObservedValue::Integer(i128::from(value))),
        StorageType::Char => first_char_string(variable),
        StorageType::Other(_) => None,
    }
}

/// First string of a `char` variable: index 0 on every leading dimension and the
/// whole trailing string-length dimension.
fn first_char_string(variable: &Variable<'_>) -> Option<ObservedValue> {
    let dimensions = variable.dimensions();
    let last = dimensions.len().saturating_sub(1);
    let extents: Vec<Extent> = dimensions
        .iter()
        .enumerate()
        .map(|(index, dimension)| {
            if index == last {
                Extent::from(0..dimension.len())
            } else {
                Extent::from(0..1)
            }
        })
        .collect();
    match variable.get_raw_values(extents) {
        Ok(bytes) => Some(ObservedValue::from_char_bytes(&bytes)),
        Err(err) => {
            warn!(variable = %variable.name(), error = %err, "unable to read char variable");
            None
        }
    }
}

fn convert_attribute(value: AttributeValue) -> (StorageType, Option<ObservedValue>) {
    fn ints<T: Into<i128>>(items: Vec<T>) -> Option<ObservedValue> {
        Some(ObservedValue::List(
            items.into_iter().map(|v| ObservedValue::Integer(v.into())).collect(),
        ))
    }
    fn reals<T: Into<f64>>(items: Vec<T>) -> Option<ObservedValue> {
        Some(ObservedValue::List(
            items.into_iter().map(|v| ObservedValue::Real(v.into())).collect(),
        ))
    }
    let int = |v: i128| Some(ObservedValue::Integer(v));

    match value {
        AttributeValue::Str(text) => (StorageType::Char, Some(ObservedValue::Text(text))),
        AttributeValue::Strs(items) => (
            StorageType::String,
            Some(ObservedValue::List(
                items.into_iter().map(ObservedValue::Text).collect(),
            )),
        ),
        AttributeValue::Schar(v) => (StorageType::Int8, int(v.into())),
        AttributeValue::Schars(v) => (StorageType::Int8, ints(v)),
        AttributeValue::Uchar(v) => (StorageType::UInt8, int(v.into())),
        AttributeValue::Uchars(v) => (StorageType::UInt8, ints(v)),
        AttributeValue::Short(v) => (StorageType::Int16, int(v.into())),
        AttributeValue::Shorts(v) => (StorageType::Int16, ints(v)),
        AttributeValue::Ushort(v) => (StorageType::UInt16, int(v.into())),
        AttributeValue::Ushorts(v) => (StorageType::UInt16, ints(v)),
        AttributeValue::Int(v) => (StorageType::Int32, int(v.into())),
        AttributeValue::Ints(v) => (StorageType::Int32, ints(v)),
        AttributeValue::Uint(v) => (StorageType::UInt32, int(v.into())),
        AttributeValue::Uints(v) => (StorageType::UInt32, ints(v)),
        AttributeValue::Longlong(v) => (StorageType::Int64, int(v.into())),
        AttributeValue::Longlongs(v) => (StorageType::Int64, ints(v)),
        AttributeValue::Ulonglong(v) => (StorageType::UInt64, int(v.into())),
        AttributeValue::Ulonglongs(v) => (StorageType::UInt64, ints(v)),
        AttributeValue::Float(v) => (StorageType::Float32, Some(ObservedValue::Real(v.into()))),
        AttributeValue::Floats(v) => (StorageType::Float32, reals(v)),
        AttributeValue::Double(v) => (StorageType::Float64, Some(ObservedValue::Real(v))),
        AttributeValue::Doubles(v) => (StorageType::Float64, reals(v)),
    }
}
