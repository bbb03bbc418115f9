//! Parses the declarative schema document into typed [FieldRule]s.
//!
//! Everything that can be wrong with a schema (unknown keys, duplicate fields,
//! unknown datatype tokens, bad literals, bad patterns) is rejected here, so the
//! evaluator never sees a malformed rule.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::Path;

use regex::Regex;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;

use crate::dataset::FieldKey;
use crate::datatype::{ExpectedType, TypeClass};
use crate::error::SchemaError;

use super::rule::{sweep_template, AllowedValue, FieldRule, SWEEP_PLACEHOLDER};
use super::Schema;

/// Encoding of a schema document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
    Json,
    Yaml,
}

impl SchemaFormat {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

/// Map entries in document order. Duplicate keys are kept so they can be reported.
#[derive(Debug)]
struct Entries<T>(Vec<(String, T)>);

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Entries<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
            type Value = Entries<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field identifiers to field entries")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, T>()? {
                    entries.push((key, value));
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSchema {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    mandatory: Entries<RawEntry>,
    optional: Entries<RawEntry>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawKind {
    #[default]
    Attribute,
    Variable,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntry {
    datatype: String,
    #[serde(default)]
    kind: RawKind,
    #[serde(default)]
    values: Option<Vec<Value>>,
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    required: Option<bool>,
    #[serde(default)]
    attributes: Option<Entries<RawEntry>>,
}

pub fn load_schema(path: &Path) -> Result<Schema, SchemaError> {
    let raw = fs::read_to_string(path).map_err(|source| SchemaError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_schema(&raw, SchemaFormat::from_path(path))
}

pub fn parse_schema(raw: &str, format: SchemaFormat) -> Result<Schema, SchemaError> {
    let document: RawSchema = match format {
        SchemaFormat::Json => {
            serde_json::from_str(raw).map_err(|err| SchemaError::Parse(err.to_string()))?
        }
        SchemaFormat::Yaml => {
            serde_yaml::from_str(raw).map_err(|err| SchemaError::Parse(err.to_string()))?
        }
    };

    let mut builder = RuleBuilder::default();
    for (identifier, entry) in &document.mandatory.0 {
        builder.top_level(identifier, entry, true)?;
    }
    for (identifier, entry) in &document.optional.0 {
        builder.top_level(identifier, entry, false)?;
    }

    Ok(Schema {
        name: document.name,
        version: document.version,
        rules: builder.rules,
    })
}

#[derive(Default)]
struct RuleBuilder {
    rules: Vec<FieldRule>,
    seen: HashSet<FieldKey>,
    sweep_templates: HashSet<FieldKey>,
    /// Template form of rules naming a concrete sweep group.
    concrete_sweep_fields: HashSet<FieldKey>,
}

impl RuleBuilder {
    fn top_level(
        &mut self,
        identifier: &str,
        entry: &RawEntry,
        section_required: bool,
    ) -> Result<(), SchemaError> {
        if entry.required.is_some() {
            return Err(invalid_entry(
                identifier,
                "`required` is only allowed on nested attributes; use the mandatory/optional sections",
            ));
        }

        let key = parse_identifier(identifier, entry.kind)?;
        let rule = build_rule(identifier, key.clone(), entry, section_required)?;
        self.push(rule)?;

        let Some(attributes) = &entry.attributes else {
            return Ok(());
        };
        let FieldKey::Variable(variable) = &key else {
            return Err(invalid_entry(
                identifier,
                "nested attributes are only allowed on entries with kind \"variable\"",
            ));
        };

        for (name, nested) in &attributes.0 {
            let field = format!("{variable}:{name}");
            validate_attribute_name(&field, name)?;
            if nested.kind != RawKind::Attribute || nested.attributes.is_some() {
                return Err(invalid_entry(&field, "nested entries must be plain attributes"));
            }
            let required = nested.required.unwrap_or(section_required);
            let rule = build_rule(
                &field,
                FieldKey::variable_attribute(variable.as_str(), name.as_str()),
                nested,
                required,
            )?
            .with_parent(key.clone());
            self.push(rule)?;
        }
        Ok(())
    }

    fn push(&mut self, rule: FieldRule) -> Result<(), SchemaError> {
        if !self.seen.insert(rule.key.clone()) {
            return Err(SchemaError::DuplicateField(rule.key.to_string()));
        }
        // A concrete `sweep_0/x` and a `sweep_<n>/x` rule would both evaluate `sweep_0/x`.
        if rule.has_sweep_placeholder() {
            if self.concrete_sweep_fields.contains(&rule.key) {
                return Err(SchemaError::DuplicateField(rule.key.to_string()));
            }
            self.sweep_templates.insert(rule.key.clone());
        } else if let Some(template) = sweep_template(&rule.key) {
            if self.sweep_templates.contains(&template) {
                return Err(SchemaError::DuplicateField(format!(
                    "{} (also covered by {template})",
                    rule.key
                )));
            }
            self.concrete_sweep_fields.insert(template);
        }
        self.rules.push(rule);
        Ok(())
    }
}

fn build_rule(
    field: &str,
    key: FieldKey,
    entry: &RawEntry,
    required: bool,
) -> Result<FieldRule, SchemaError> {
    let expected: ExpectedType =
        entry
            .datatype
            .parse()
            .map_err(|_: String| SchemaError::UnknownDatatype {
                field: field.to_string(),
                token: entry.datatype.clone(),
            })?;

    let allowed = entry
        .values
        .iter()
        .flatten()
        .map(|literal| allowed_value(field, literal, &expected))
        .collect::<Result<Vec<_>, _>>()?;

    let mut rule = FieldRule::new(key, required, expected).with_allowed_values(allowed);
    if let Some(pattern) = &entry.pattern {
        let regex = Regex::new(&format!("^(?:{pattern})")).map_err(|source| {
            SchemaError::InvalidPattern {
                field: field.to_string(),
                source,
            }
        })?;
        rule = rule.with_pattern(regex);
    }
    rule.description = entry.description.clone();
    Ok(rule)
}

fn allowed_value(
    field: &str,
    literal: &Value,
    expected: &ExpectedType,
) -> Result<AllowedValue, SchemaError> {
    let invalid = || SchemaError::InvalidAllowedValue {
        field: field.to_string(),
        literal: literal.to_string(),
        datatype: expected.to_string(),
    };

    match expected.class() {
        TypeClass::Text => match literal {
            Value::String(text) => Ok(AllowedValue::Text(text.clone())),
            Value::Number(number) => Ok(AllowedValue::Text(number.to_string())),
            Value::Bool(flag) => Ok(AllowedValue::Text(flag.to_string())),
            _ => Err(invalid()),
        },
        TypeClass::Integer => match literal {
            Value::Number(number) => number
                .as_i64()
                .map(i128::from)
                .or_else(|| number.as_u64().map(i128::from))
                .map(AllowedValue::Integer)
                .ok_or_else(invalid),
            Value::String(text) => text
                .trim()
                .parse::<i128>()
                .map(AllowedValue::Integer)
                .map_err(|_| invalid()),
            _ => Err(invalid()),
        },
        TypeClass::Real => match literal {
            Value::Number(number) => number.as_f64().map(AllowedValue::Real).ok_or_else(invalid),
            Value::String(text) => text
                .trim()
                .parse::<f64>()
                .map(AllowedValue::Real)
                .map_err(|_| invalid()),
            _ => Err(invalid()),
        },
    }
}

/// `name` / `group/name` is an attribute, `path/var:attr` a variable attribute,
/// `path/var` with kind `variable` a variable.
fn parse_identifier(identifier: &str, kind: RawKind) -> Result<FieldKey, SchemaError> {
    let invalid = |message: &str| SchemaError::InvalidIdentifier {
        field: identifier.to_string(),
        message: message.to_string(),
    };

    if identifier.trim() != identifier || identifier.is_empty() {
        return Err(invalid("identifier must be non-empty without surrounding whitespace"));
    }

    let mut parts = identifier.split(':');
    let path = parts.next().unwrap_or_default();
    let attribute = parts.next();
    if parts.next().is_some() {
        return Err(invalid("identifier has more than one ':'"));
    }
    validate_path(identifier, path)?;

    match (attribute, kind) {
        (Some(_), RawKind::Variable) => {
            Err(invalid("a variable entry cannot name an attribute"))
        }
        (Some(attribute), RawKind::Attribute) => {
            validate_attribute_name(identifier, attribute)?;
            Ok(FieldKey::variable_attribute(path, attribute))
        }
        (None, RawKind::Variable) => Ok(FieldKey::variable(path)),
        (None, RawKind::Attribute) => Ok(FieldKey::global(path)),
    }
}

fn validate_path(identifier: &str, path: &str) -> Result<(), SchemaError> {
    for (index, segment) in path.split('/').enumerate() {
        if segment.is_empty() {
            return Err(SchemaError::InvalidIdentifier {
                field: identifier.to_string(),
                message: "empty path segment".to_string(),
            });
        }
        let placeholder_like = segment.contains('<') || segment.contains('>');
        if placeholder_like && (segment != SWEEP_PLACEHOLDER || index != 0) {
            return Err(SchemaError::InvalidIdentifier {
                field: identifier.to_string(),
                message: format!("only a leading '{SWEEP_PLACEHOLDER}' segment may use a placeholder"),
            });
        }
    }
    Ok(())
}

fn validate_attribute_name(field: &str, name: &str) -> Result<(), SchemaError> {
    if name.is_empty() || name.contains('/') || name.contains(':') {
        return Err(SchemaError::InvalidIdentifier {
            field: field.to_string(),
            message: format!("invalid attribute name '{name}'"),
        });
    }
    Ok(())
}

fn invalid_entry(field: &str, message: &str) -> SchemaError {
    SchemaError::InvalidEntry {
        field: field.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json(raw: &str) -> Result<Schema, SchemaError> {
        parse_schema(raw, SchemaFormat::Json)
    }

    #[test]
    fn parses_sections_in_document_order() {
        let schema = json(
            r#"{
                "name": "test",
                "mandatory": {
                    "title": { "datatype": "string" },
                    "instrument_name": { "datatype": "text" },
                    "sweep_<n>/sweep_mode": {
                        "kind": "variable",
                        "datatype": "string",
                        "values": ["rhi", "sector"]
                    }
                },
                "optional": {
                    "latitude:units": { "datatype": "string", "values": ["degrees_north"] }
                }
            }"#,
        )
        .unwrap();

        let keys: Vec<String> = schema.rules.iter().map(|rule| rule.key.to_string()).collect();
        assert_eq!(
            keys,
            vec!["title", "instrument_name", "sweep_<n>/sweep_mode", "latitude:units"]
        );
        assert_eq!(schema.mandatory().count(), 3);
        assert_eq!(schema.optional().count(), 1);
        assert_eq!(schema.rules[2].key, FieldKey::variable("sweep_<n>/sweep_mode"));
        assert_eq!(schema.rules[2].allowed_values.len(), 2);
    }

    #[test]
    fn nested_attributes_inherit_section_and_parent() {
        let schema = json(
            r#"{
                "mandatory": {
                    "time": {
                        "kind": "variable",
                        "datatype": "double",
                        "attributes": {
                            "units": { "datatype": "string", "pattern": "seconds since" },
                            "calendar": { "datatype": "string", "required": false }
                        }
                    }
                },
                "optional": {}
            }"#,
        )
        .unwrap();

        let units = &schema.rules[1];
        assert_eq!(units.key, FieldKey::variable_attribute("time", "units"));
        assert!(units.required);
        assert_eq!(units.parent, Some(FieldKey::variable("time")));
        assert!(units.pattern.as_ref().unwrap().is_match("seconds since 2024-01-01"));
        assert!(!schema.rules[2].required);
    }

    #[test]
    fn duplicate_fields_are_rejected_across_sections_and_nesting() {
        let err = json(
            r#"{
                "mandatory": { "title": { "datatype": "string" } },
                "optional": { "title": { "datatype": "string" } }
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField(field) if field == "title"));

        let err = json(
            r#"{
                "mandatory": {
                    "time": { "kind": "variable", "datatype": "double",
                              "attributes": { "units": { "datatype": "string" } } },
                    "time:units": { "datatype": "string" }
                },
                "optional": {}
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField(field) if field == "time:units"));

        let err = json(
            r#"{ "mandatory": { "a": { "datatype": "int" }, "a": { "datatype": "int" } }, "optional": {} }"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField(_)));
    }

    #[test]
    fn concrete_sweep_fields_cannot_shadow_placeholder_rules() {
        let err = json(
            r#"{
                "mandatory": { "sweep_<n>/sweep_mode": { "kind": "variable", "datatype": "string" } },
                "optional": { "sweep_0/sweep_mode": { "kind": "variable", "datatype": "string" } }
            }"#,
        )
        .unwrap_err();
        assert!(
            matches!(&err, SchemaError::DuplicateField(field) if field.starts_with("sweep_0/sweep_mode")),
            "{err}"
        );

        let err = json(
            r#"{
                "mandatory": { "sweep_1/azimuth:units": { "datatype": "string" } },
                "optional": {
                    "sweep_<n>/azimuth": {
                        "kind": "variable",
                        "datatype": "real",
                        "attributes": { "units": { "datatype": "string" } }
                    }
                }
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField(field) if field == "sweep_<n>/azimuth:units"));

        let schema = json(
            r#"{
                "mandatory": {
                    "sweep_0/sweep_mode": { "kind": "variable", "datatype": "string" },
                    "sweep_1/sweep_mode": { "kind": "variable", "datatype": "string" }
                },
                "optional": {}
            }"#,
        )
        .unwrap();
        assert_eq!(schema.rules.len(), 2);
    }

    #[test]
    fn malformed_documents_are_schema_errors() {
        assert!(matches!(
            json(r#"{ "mandatory": {} }"#).unwrap_err(),
            SchemaError::Parse(_)
        ));
        assert!(matches!(
            json(r#"{ "mandatory": { "title": { "values": ["x"] } }, "optional": {} }"#).unwrap_err(),
            SchemaError::Parse(_)
        ));
        assert!(matches!(
            json(r#"{ "mandatory": { "title": { "datatype": "string", "colour": 1 } }, "optional": {} }"#)
                .unwrap_err(),
            SchemaError::Parse(_)
        ));
        assert!(matches!(
            json(r#"{ "mandatory": { "title": { "datatype": "quaternion" } }, "optional": {} }"#)
                .unwrap_err(),
            SchemaError::UnknownDatatype { .. }
        ));
    }

    #[test]
    fn literals_must_fit_numeric_datatypes() {
        let err = json(
            r#"{ "mandatory": { "volume_number": { "datatype": "int", "values": ["one"] } }, "optional": {} }"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidAllowedValue { .. }));

        let schema = json(
            r#"{ "mandatory": { "volume_number": { "datatype": "int", "values": [1, "2"] } }, "optional": {} }"#,
        )
        .unwrap();
        assert_eq!(
            schema.rules[0].allowed_values,
            vec![AllowedValue::Integer(1), AllowedValue::Integer(2)]
        );
    }

    #[test]
    fn rejects_bad_identifiers_and_patterns() {
        for identifier in ["", "a::b", "sweep/<x>/mode", "radar//gain", "group/sweep_<n>/x"] {
            let raw = format!(
                r#"{{ "mandatory": {{ "{identifier}": {{ "datatype": "string" }} }}, "optional": {{}} }}"#
            );
            assert!(
                matches!(json(&raw).unwrap_err(), SchemaError::InvalidIdentifier { .. }),
                "identifier '{identifier}' should be rejected"
            );
        }

        let err = json(
            r#"{ "mandatory": { "title": { "datatype": "string", "pattern": "(" } }, "optional": {} }"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidPattern { .. }));

        let err = json(
            r#"{ "mandatory": { "title": { "datatype": "string",
                 "attributes": { "units": { "datatype": "string" } } } }, "optional": {} }"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidEntry { .. }));
    }

    #[test]
    fn yaml_schemas_are_supported() {
        let schema = parse_schema(
            "mandatory:\n  instrument_name:\n    datatype: string\noptional:\n  polarization:\n    datatype: string\n    values: [H, V, HV]\n",
            SchemaFormat::Yaml,
        )
        .unwrap();
        assert_eq!(schema.rules.len(), 2);
        assert_eq!(schema.rules[1].allowed_values.len(), 3);
        assert_eq!(SchemaFormat::from_path(Path::new("fm301.yml")), SchemaFormat::Yaml);
    }
}
