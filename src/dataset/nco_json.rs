//! Reader for netCDF files dumped as JSON by NCO (`ncks --json volume.nc`).
//!
//! Layout: `{ "dimensions": {..}, "attributes": {..}, "variables": {..}, "groups": {..} }`,
//! groups nest the same structure. Attributes are either bare JSON values
//! (strings are `char`, integers `int`, fractions `double`) or typed objects
//! `{ "type": "float", "data": 0.5 }`.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Number, Value};

use crate::datatype::{StorageType, TypeClass};
use crate::error::DatasetError;

use super::{DatasetSource, FieldKey, ObservedField, ObservedFields, ObservedValue};

const CONTAINER_KEYS: &[&str] = &["attributes", "variables", "dimensions", "groups"];

#[derive(Debug, Clone)]
pub struct NcoJsonDataset {
    path: PathBuf,
    root: Map<String, Value>,
}

impl NcoJsonDataset {
    pub fn open(path: &Path) -> Result<Self, DatasetError> {
        let raw = fs::read_to_string(path).map_err(|source| DatasetError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &raw)
    }

    /// Parse an in-memory dump; `path` is only used for labels and error messages.
    pub fn parse(path: &Path, raw: &str) -> Result<Self, DatasetError> {
        let payload: Value = serde_json::from_str(raw).map_err(|err| DatasetError::Unreadable {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

        let Value::Object(root) = payload else {
            return Err(unrecognized(path, "top-level value is not an object"));
        };
        if !CONTAINER_KEYS.iter().any(|key| root.contains_key(*key)) {
            return Err(unrecognized(
                path,
                "expected at least one of attributes, variables, dimensions or groups",
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            root,
        })
    }

    fn walk_group(
        &self,
        prefix: &str,
        group: &Map<String, Value>,
        fields: &mut ObservedFields,
    ) -> Result<(), DatasetError> {
        if let Some(attributes) = self.section(group, "attributes", prefix)? {
            for (name, raw) in attributes {
                let (datatype, value) = self.attribute(raw, &join(prefix, name))?;
                fields.insert(ObservedField::new(
                    FieldKey::global(join(prefix, name)),
                    datatype,
                    value,
                ));
            }
        }

        if let Some(variables) = self.section(group, "variables", prefix)? {
            for (name, raw) in variables {
                let path = join(prefix, name);
                self.variable(&path, raw, fields)?;
            }
        }

        if let Some(groups) = self.section(group, "groups", prefix)? {
            for (name, raw) in groups {
                let path = join(prefix, name);
                let Value::Object(child) = raw else {
                    return Err(unrecognized(&self.path, &format!("group '{path}' is not an object")));
                };
                fields.add_group(path.clone());
                self.walk_group(&path, child, fields)?;
            }
        }

        Ok(())
    }

    fn variable(
        &self,
        path: &str,
        raw: &Value,
        fields: &mut ObservedFields,
    ) -> Result<(), DatasetError> {
        let Value::Object(variable) = raw else {
            return Err(unrecognized(&self.path, &format!("variable '{path}' is not an object")));
        };
        let datatype = variable
            .get("type")
            .and_then(Value::as_str)
            .map(StorageType::from_nc_name)
            .ok_or_else(|| unrecognized(&self.path, &format!("variable '{path}' has no type")))?;

        let value = variable
            .get("data")
            .and_then(first_element)
            .and_then(|data| convert(data, &datatype));
        fields.insert(ObservedField::new(
            FieldKey::variable(path),
            datatype,
            value,
        ));

        if let Some(Value::Object(attributes)) = variable.get("attributes") {
            for (name, raw) in attributes {
                let (datatype, value) = self.attribute(raw, &format!("{path}:{name}"))?;
                fields.insert(ObservedField::new(
                    FieldKey::variable_attribute(path, name),
                    datatype,
                    value,
                ));
            }
        }
        Ok(())
    }

    fn attribute(
        &self,
        raw: &Value,
        context: &str,
    ) -> Result<(StorageType, Option<ObservedValue>), DatasetError> {
        if let Value::Object(typed) = raw {
            let datatype = typed
                .get("type")
                .and_then(Value::as_str)
                .map(StorageType::from_nc_name)
                .ok_or_else(|| {
                    unrecognized(&self.path, &format!("attribute '{context}' has no type"))
                })?;
            let value = typed.get("data").and_then(|data| convert(data, &datatype));
            return Ok((datatype, value));
        }

        let datatype = infer_type(raw).ok_or_else(|| {
            unrecognized(&self.path, &format!("attribute '{context}' has no value"))
        })?;
        let value = convert(raw, &datatype);
        Ok((datatype, value))
    }

    fn section<'a>(
        &self,
        group: &'a Map<String, Value>,
        key: &str,
        prefix: &str,
    ) -> Result<Option<&'a Map<String, Value>>, DatasetError> {
        match group.get(key) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(_) => {
                let location = if prefix.is_empty() { "/" } else { prefix };
                Err(unrecognized(
                    &self.path,
                    &format!("'{key}' in group '{location}' is not an object"),
                ))
            }
        }
    }
}

impl DatasetSource for NcoJsonDataset {
    fn label(&self) -> String {
        self.path.display().to_string()
    }

    fn observed_fields(&self) -> Result<ObservedFields, DatasetError> {
        let mut fields = ObservedFields::default();
        self.walk_group("", &self.root, &mut fields)?;
        Ok(fields)
    }
}

fn unrecognized(path: &Path, message: &str) -> DatasetError {
    DatasetError::UnrecognizedFormat {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Type NCO omits for "natural" JSON values.
fn infer_type(raw: &Value) -> Option<StorageType> {
    match raw {
        Value::String(_) | Value::Bool(_) => Some(StorageType::Char),
        Value::Number(number) if number.is_f64() => Some(StorageType::Float64),
        Value::Number(_) => Some(StorageType::Int32),
        Value::Array(items) => {
            let mut inferred: Option<StorageType> = None;
            for item in items {
                let item_type = infer_type(item)?;
                inferred = Some(match (inferred, item_type) {
                    (None, item_type) => item_type,
                    (Some(StorageType::Int32), StorageType::Float64) => StorageType::Float64,
                    (Some(current), _) => current,
                });
            }
            inferred
        }
        Value::Null | Value::Object(_) => None,
    }
}

/// Representative value of variable data: the scalar, or the first element of an array.
fn first_element(data: &Value) -> Option<&Value> {
    match data {
        Value::Array(items) => items.first().and_then(first_element),
        Value::Null => None,
        other => Some(other),
    }
}

fn convert(data: &Value, datatype: &StorageType) -> Option<ObservedValue> {
    match data {
        Value::Null => None,
        Value::String(text) => Some(ObservedValue::Text(text.clone())),
        Value::Bool(flag) => Some(ObservedValue::Text(flag.to_string())),
        Value::Number(number) => Some(convert_number(number, datatype)),
        Value::Array(items) => {
            let values: Vec<ObservedValue> = items
                .iter()
                .filter_map(|item| convert(item, datatype))
                .collect();
            Some(ObservedValue::List(values))
        }
        Value::Object(_) => None,
    }
}

fn convert_number(number: &Number, datatype: &StorageType) -> ObservedValue {
    match datatype.class() {
        Some(TypeClass::Text) => ObservedValue::Text(number.to_string()),
        Some(TypeClass::Real) => ObservedValue::Real(number.as_f64().unwrap_or(f64::NAN)),
        _ => {
            if let Some(value) = number.as_i64() {
                ObservedValue::Integer(i128::from(value))
            } else if let Some(value) = number.as_u64() {
                ObservedValue::Integer(i128::from(value))
            } else {
                ObservedValue::Real(number.as_f64().unwrap_or(f64::NAN))
            }
        }
    }
}
