use std::fmt;

use crate::datatype::StorageType;

/// Identity of a metadata field: where it lives in the container.
///
/// Paths use `/` between group segments, e.g. `sweep_0/sweep_mode`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKey {
    /// Attribute of the root group (`title`) or of a sub-group (`radar_parameters/title`).
    GlobalAttribute(String),
    /// Presence of a variable.
    Variable(String),
    /// Attribute attached to a variable.
    VariableAttribute { variable: String, attribute: String },
}

impl FieldKey {
    pub fn global(name: impl Into<String>) -> Self {
        Self::GlobalAttribute(name.into())
    }

    pub fn variable(path: impl Into<String>) -> Self {
        Self::Variable(path.into())
    }

    pub fn variable_attribute(variable: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::VariableAttribute {
            variable: variable.into(),
            attribute: attribute.into(),
        }
    }

    /// Report grouping: `global_attributes`, `root_variables`, or the enclosing group path.
    pub fn group_label(&self) -> String {
        let path = match self {
            Self::GlobalAttribute(path) => {
                return match path.rsplit_once('/') {
                    Some((group, _)) => group.to_string(),
                    None => "global_attributes".to_string(),
                };
            }
            Self::Variable(path) => path,
            Self::VariableAttribute { variable, .. } => variable,
        };
        match path.rsplit_once('/') {
            Some((group, _)) => group.to_string(),
            None => "root_variables".to_string(),
        }
    }

    /// The variable a field belongs to, if any.
    pub fn variable_path(&self) -> Option<&str> {
        match self {
            Self::GlobalAttribute(_) => None,
            Self::Variable(path) => Some(path),
            Self::VariableAttribute { variable, .. } => Some(variable),
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::GlobalAttribute(_) => "attribute",
            Self::Variable(_) => "variable",
            Self::VariableAttribute { .. } => "variable attribute",
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GlobalAttribute(name) => f.write_str(name),
            Self::Variable(path) => f.write_str(path),
            Self::VariableAttribute {
                variable,
                attribute,
            } => write!(f, "{variable}:{attribute}"),
        }
    }
}

/// Value carried by an attribute, or the representative value of a variable.
#[derive(Debug, Clone, PartialEq)]
pub enum ObservedValue {
    Text(String),
    Integer(i128),
    Real(f64),
    List(Vec<ObservedValue>),
}

impl ObservedValue {
    /// Elements checked against an allowed-value set. Scalars are a list of one.
    pub fn elements(&self) -> Vec<&ObservedValue> {
        match self {
            Self::List(items) => items.iter().flat_map(ObservedValue::elements).collect(),
            other => vec![other],
        }
    }

    /// Text held in a fixed-width `char` buffer: cut at the first NUL, then trimmed.
    pub fn from_char_bytes(bytes: &[u8]) -> Self {
        let end = bytes.iter().position(|&byte| byte == 0).unwrap_or(bytes.len());
        Self::Text(String::from_utf8_lossy(&bytes[..end]).trim().to_string())
    }
}

impl fmt::Display for ObservedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Real(value) => write!(f, "{value}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// A field actually present in the dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedField {
    pub key: FieldKey,
    pub datatype: StorageType,
    /// `None` when the reader cannot provide a value (e.g. metadata-only dumps).
    pub value: Option<ObservedValue>,
}

impl ObservedField {
    pub fn new(key: FieldKey, datatype: StorageType, value: Option<ObservedValue>) -> Self {
        Self {
            key,
            datatype,
            value,
        }
    }

    /// Present in the file, but its type or value could not be decoded.
    pub fn undecodable(key: FieldKey, type_name: &str) -> Self {
        Self::new(key, StorageType::Other(type_name.to_string()), None)
    }
}
