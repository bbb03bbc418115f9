//! In-memory dataset: a builder over [ObservedFields], used in tests and by callers
//! that already hold the metadata in another form.

use crate::datatype::StorageType;
use crate::error::DatasetError;

use super::{DatasetSource, FieldKey, ObservedField, ObservedFields, ObservedValue};

#[derive(Debug, Clone, Default)]
pub struct InMemoryDataset {
    label: String,
    fields: ObservedFields,
}

impl InMemoryDataset {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            fields: ObservedFields::default(),
        }
    }

    pub fn with_global(self, name: &str, datatype: StorageType, value: ObservedValue) -> Self {
        self.with_field(FieldKey::global(name), datatype, Some(value))
    }

    pub fn with_text(self, name: &str, value: &str) -> Self {
        self.with_global(name, StorageType::Char, ObservedValue::Text(value.to_string()))
    }

    pub fn with_variable(
        self,
        path: &str,
        datatype: StorageType,
        value: Option<ObservedValue>,
    ) -> Self {
        self.with_field(FieldKey::variable(path), datatype, value)
    }

    pub fn with_variable_attribute(
        self,
        variable: &str,
        attribute: &str,
        datatype: StorageType,
        value: ObservedValue,
    ) -> Self {
        self.with_field(
            FieldKey::variable_attribute(variable, attribute),
            datatype,
            Some(value),
        )
    }

    pub fn with_field(
        mut self,
        key: FieldKey,
        datatype: StorageType,
        value: Option<ObservedValue>,
    ) -> Self {
        let path = match &key {
            FieldKey::GlobalAttribute(path) | FieldKey::Variable(path) => path.clone(),
            FieldKey::VariableAttribute { variable, .. } => variable.clone(),
        };
        register_parent_groups(&mut self.fields, &path);
        self.fields.insert(ObservedField::new(key, datatype, value));
        self
    }

    pub fn with_group(mut self, path: &str) -> Self {
        register_parent_groups(&mut self.fields, &format!("{path}/"));
        self
    }
}

/// Record every group that encloses `path` (`a/b/var` registers `a` and `a/b`).
fn register_parent_groups(fields: &mut ObservedFields, path: &str) {
    let segments: Vec<&str> = path.split('/').collect();
    for depth in 1..segments.len() {
        fields.add_group(segments[..depth].join("/"));
    }
}

impl DatasetSource for InMemoryDataset {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn observed_fields(&self) -> Result<ObservedFields, DatasetError> {
        Ok(self.fields.clone())
    }
}
