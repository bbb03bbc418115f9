//! Storage types observed in a dataset and the datatype constraints a rule can declare.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// Broad family a storage type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeClass {
    Text,
    Integer,
    Real,
}

impl TypeClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Real => "real",
        }
    }
}

/// Concrete netCDF storage type of an attribute or variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageType {
    Char,
    String,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    /// Compound, opaque, enum or vlen types; never compatible with a rule.
    Other(String),
}

impl StorageType {
    /// Parse a netCDF type name as printed by ncdump/ncks (`char`, `short`, `double`, ...).
    pub fn from_nc_name(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "char" => Self::Char,
            "string" => Self::String,
            "byte" | "int8" => Self::Int8,
            "ubyte" | "uint8" => Self::UInt8,
            "short" | "int16" => Self::Int16,
            "ushort" | "uint16" => Self::UInt16,
            "int" | "int32" => Self::Int32,
            "uint" | "uint32" => Self::UInt32,
            "int64" => Self::Int64,
            "uint64" => Self::UInt64,
            "float" | "float32" => Self::Float32,
            "double" | "float64" => Self::Float64,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn class(&self) -> Option<TypeClass> {
        match self {
            Self::Char | Self::String => Some(TypeClass::Text),
            Self::Int8
            | Self::UInt8
            | Self::Int16
            | Self::UInt16
            | Self::Int32
            | Self::UInt32
            | Self::Int64
            | Self::UInt64 => Some(TypeClass::Integer),
            Self::Float32 | Self::Float64 => Some(TypeClass::Real),
            Self::Other(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Char => "char",
            Self::String => "string",
            Self::Int8 => "byte",
            Self::UInt8 => "ubyte",
            Self::Int16 => "short",
            Self::UInt16 => "ushort",
            Self::Int32 => "int",
            Self::UInt32 => "uint",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Float32 => "float",
            Self::Float64 => "double",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StorageType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Datatype a rule expects. Exact storage types match one type; classes match a family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedType {
    Text,
    Exact(StorageType),
    Class(TypeClass),
}

impl ExpectedType {
    /// Compatibility table: text accepts `char` and `string`, exact numeric types
    /// accept only themselves, classes accept every member of the family.
    pub fn accepts(&self, observed: &StorageType) -> bool {
        match self {
            Self::Text => observed.class() == Some(TypeClass::Text),
            Self::Exact(expected) => expected == observed,
            Self::Class(class) => observed.class() == Some(*class),
        }
    }

    pub fn class(&self) -> TypeClass {
        match self {
            Self::Text => TypeClass::Text,
            Self::Exact(storage) => storage.class().unwrap_or(TypeClass::Text),
            Self::Class(class) => *class,
        }
    }
}

impl FromStr for ExpectedType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let token = raw.trim().to_ascii_lowercase();
        match token.as_str() {
            "string" | "text" | "char" => Ok(Self::Text),
            "integer" => Ok(Self::Class(TypeClass::Integer)),
            "real" => Ok(Self::Class(TypeClass::Real)),
            _ => match StorageType::from_nc_name(&token) {
                StorageType::Other(_) => Err(format!("unknown datatype token '{raw}'")),
                storage => Ok(Self::Exact(storage)),
            },
        }
    }
}

impl fmt::Display for ExpectedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("string"),
            Self::Exact(storage) => write!(f, "{storage}"),
            Self::Class(class) => f.write_str(class.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_accepts_char_and_string_only() {
        assert!(ExpectedType::Text.accepts(&StorageType::Char));
        assert!(ExpectedType::Text.accepts(&StorageType::String));
        assert!(!ExpectedType::Text.accepts(&StorageType::Float32));
    }

    #[test]
    fn exact_numeric_types_do_not_widen() {
        let float: ExpectedType = "float".parse().unwrap();
        assert!(float.accepts(&StorageType::Float32));
        assert!(!float.accepts(&StorageType::Float64));
        let int: ExpectedType = "int".parse().unwrap();
        assert!(!int.accepts(&StorageType::Int16));
    }

    #[test]
    fn class_tokens_accept_whole_family() {
        let integer: ExpectedType = "integer".parse().unwrap();
        assert!(integer.accepts(&StorageType::UInt8));
        assert!(integer.accepts(&StorageType::Int64));
        assert!(!integer.accepts(&StorageType::Float64));
        let real: ExpectedType = "real".parse().unwrap();
        assert!(real.accepts(&StorageType::Float32));
        assert!(real.accepts(&StorageType::Float64));
    }

    #[test]
    fn unknown_tokens_are_rejected() {
        assert!("complex128".parse::<ExpectedType>().is_err());
        assert!(!ExpectedType::Text.accepts(&StorageType::Other("compound".to_string())));
    }
}
