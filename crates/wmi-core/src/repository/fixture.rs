//! Repository fixtures
//!
//! A fixture is a JSON description of namespaces, classes and instances:
//!
//! ```json
//! {
//!   "namespaces": [{
//!     "path": "ROOT\\CIMV2",
//!     "classes": [{
//!       "name": "Win32_Service",
//!       "properties": [
//!         { "name": "Name", "type": "string", "key": true },
//!         { "name": "ProcessId", "type": "uint32" }
//!       ],
//!       "methods": [{
//!         "name": "StopService",
//!         "outputs": [{ "name": "ReturnValue", "type": "uint32" }],
//!         "returns": { "ReturnValue": 0 }
//!       }]
//!     }],
//!     "instances": [
//!       { "class": "Win32_Service", "properties": { "Name": "Spooler", "ProcessId": 1640 } }
//!     ]
//!   }]
//! }
//! ```
//!
//! Methods with `returns` answer every call with those output values.
//! Embedded objects are written as nested `{ "class": ..., "properties": ... }`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{ProviderError, WmiError};
use crate::value::{PropertyType, Variant};

use super::{ClassDef, MethodDef, Repository, StoredValue};

/// Errors that can occur while loading a fixture
#[derive(Debug, Error)]
pub enum FixtureError {
    /// Fixture file could not be read
    #[error("Failed to read fixture {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Fixture is not valid JSON or does not match the format
    #[error("Invalid fixture: {0}")]
    Parse(#[from] serde_json::Error),

    /// A declared type name is unknown
    #[error("Invalid type: {0}")]
    Type(#[from] WmiError),

    /// The repository rejected a definition
    #[error("Repository error: {0}")]
    Provider(#[from] ProviderError),

    /// A property value does not fit its declared type
    #[error("Invalid value for '{property}': {detail}")]
    InvalidValue {
        /// Property name
        property: String,
        /// What went wrong
        detail: String,
    },
}

/// Top-level fixture document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    /// Namespaces, created in order (parents are created implicitly)
    #[serde(default)]
    pub namespaces: Vec<NamespaceFixture>,
}

/// One namespace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceFixture {
    /// Full path (e.g. `ROOT\CIMV2`)
    pub path: String,

    /// Refuse connections to this namespace
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub denied: bool,

    /// Classes, superclasses first
    #[serde(default)]
    pub classes: Vec<ClassFixture>,

    /// Instances
    #[serde(default)]
    pub instances: Vec<InstanceFixture>,
}

/// A class definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassFixture {
    /// Class name
    pub name: String,

    /// Superclass in the same namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superclass: Option<String>,

    /// Singleton class (`Class=@`)
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub singleton: bool,

    /// Declared properties
    #[serde(default)]
    pub properties: Vec<PropertyFixture>,

    /// Declared methods
    #[serde(default)]
    pub methods: Vec<MethodFixture>,
}

/// A property or method parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyFixture {
    /// Name
    pub name: String,

    /// MOF type name such as `uint32` or `string[]`
    #[serde(rename = "type")]
    pub ty: String,

    /// Key qualifier
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub key: bool,
}

/// A method definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodFixture {
    /// Method name
    pub name: String,

    /// Input parameters
    #[serde(default)]
    pub inputs: Vec<PropertyFixture>,

    /// Output parameters
    #[serde(default)]
    pub outputs: Vec<PropertyFixture>,

    /// Canned output values; methods without them are not implemented
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<BTreeMap<String, serde_json::Value>>,
}

/// An instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceFixture {
    /// Class name
    pub class: String,

    /// Property values by name
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl Repository {
    /// Build a repository from a fixture
    pub fn from_fixture(fixture: &Fixture) -> Result<Repository, FixtureError> {
        let repo = Repository::new();
        for ns in &fixture.namespaces {
            repo.add_namespace(&ns.path);
            for class in &ns.classes {
                repo.add_class(&ns.path, class_def(class)?)?;
            }
            for instance in &ns.instances {
                let values = instance_values(&repo, &ns.path, instance)?;
                let values = values.iter().map(|(n, v)| (n.as_str(), v.clone())).collect();
                repo.add_instance(&ns.path, &instance.class, values)?;
            }
            if ns.denied {
                repo.deny_access(&ns.path);
            }
        }
        tracing::debug!(namespaces = fixture.namespaces.len(), "loaded fixture");
        Ok(repo)
    }

    /// Parse a JSON fixture
    pub fn from_json_str(text: &str) -> Result<Repository, FixtureError> {
        let fixture: Fixture = serde_json::from_str(text)?;
        Self::from_fixture(&fixture)
    }

    /// Load a JSON fixture file
    pub fn load_json(path: impl AsRef<Path>) -> Result<Repository, FixtureError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}

fn class_def(fixture: &ClassFixture) -> Result<ClassDef, FixtureError> {
    let mut class = ClassDef::new(&fixture.name);
    if let Some(parent) = &fixture.superclass {
        class = class.superclass(parent);
    }
    if fixture.singleton {
        class = class.singleton();
    }
    for property in &fixture.properties {
        let ty = PropertyType::parse(&property.ty)?;
        class = if property.key {
            class.key(&property.name, ty)
        } else {
            class.property(&property.name, ty)
        };
    }
    for method in &fixture.methods {
        class = class.method(method_def(method)?);
    }
    Ok(class)
}

fn method_def(fixture: &MethodFixture) -> Result<MethodDef, FixtureError> {
    let mut method = MethodDef::new(&fixture.name);
    for input in &fixture.inputs {
        method = method.input(&input.name, PropertyType::parse(&input.ty)?);
    }
    for output in &fixture.outputs {
        method = method.output(&output.name, PropertyType::parse(&output.ty)?);
    }

    if let Some(returns) = &fixture.returns {
        let mut canned = Vec::with_capacity(returns.len());
        for (name, json) in returns {
            let param = method
                .outputs
                .iter()
                .find(|p| p.name.eq_ignore_ascii_case(name))
                .ok_or_else(|| FixtureError::InvalidValue {
                    property: name.clone(),
                    detail: format!("'{}' is not an output of '{}'", name, fixture.name),
                })?;
            canned.push((param.name.clone(), scalar_or_array(name, param.ty, json)?));
        }
        method = method.handler(move |call| {
            for (name, value) in &canned {
                call.set_output(name, value.clone())?;
            }
            Ok(())
        });
    }
    Ok(method)
}

fn instance_values(
    repo: &Repository,
    namespace: &str,
    fixture: &InstanceFixture,
) -> Result<Vec<(String, StoredValue)>, FixtureError> {
    let class = repo.class_object(namespace, &fixture.class)?;
    let mut values = Vec::with_capacity(fixture.properties.len());
    for (name, json) in &fixture.properties {
        let ty = class.property_type(name)?;
        let value = if ty.base == crate::value::CimType::Object && !ty.is_array {
            embedded(repo, namespace, name, json)?
        } else {
            scalar_or_array(name, ty, json)?
        };
        values.push((name.clone(), value));
    }
    Ok(values)
}

fn embedded(
    repo: &Repository,
    namespace: &str,
    property: &str,
    json: &serde_json::Value,
) -> Result<StoredValue, FixtureError> {
    if json.is_null() {
        return Ok(Variant::Null);
    }
    let fixture: InstanceFixture =
        serde_json::from_value(json.clone()).map_err(|e| FixtureError::InvalidValue {
            property: property.to_string(),
            detail: e.to_string(),
        })?;

    let mut object = repo.spawn(namespace, &fixture.class)?;
    for (name, value) in instance_values(repo, namespace, &fixture)? {
        object.set(&name, value)?;
    }
    Ok(object.into())
}

/// Convert plain JSON into a value of the declared type.
fn scalar_or_array(
    property: &str,
    ty: PropertyType,
    json: &serde_json::Value,
) -> Result<StoredValue, FixtureError> {
    let invalid = |detail: String| FixtureError::InvalidValue {
        property: property.to_string(),
        detail,
    };

    let value = match json {
        serde_json::Value::Array(items) if ty.is_array => {
            let items = items
                .iter()
                .map(|item| {
                    plain(item).ok_or_else(|| invalid(format!("unsupported element {}", item)))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Variant::Array(ty.base, items)
        }
        other => plain(other).ok_or_else(|| invalid(format!("unsupported value {}", other)))?,
    };

    crate::convert::coerce(value, ty).map_err(|e| invalid(e.to_string()))
}

fn plain(json: &serde_json::Value) -> Option<StoredValue> {
    match json {
        serde_json::Value::Null => Some(Variant::Null),
        serde_json::Value::Bool(b) => Some(Variant::Bool(*b)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Variant::I64)
            .or_else(|| n.as_u64().map(Variant::U64))
            .or_else(|| n.as_f64().map(Variant::F64)),
        serde_json::Value::String(s) => Some(Variant::String(s.clone())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Status;

    const FIXTURE: &str = r#"{
        "namespaces": [{
            "path": "ROOT\\Test",
            "classes": [
                {
                    "name": "Thing",
                    "properties": [
                        { "name": "Id", "type": "string", "key": true },
                        { "name": "Size", "type": "uint16" },
                        { "name": "Tags", "type": "string[]" },
                        { "name": "Data", "type": "uint8[]" },
                        { "name": "Inner", "type": "object" }
                    ],
                    "methods": [{
                        "name": "Poke",
                        "outputs": [{ "name": "ReturnValue", "type": "uint32" }],
                        "returns": { "ReturnValue": 7 }
                    }]
                }
            ],
            "instances": [{
                "class": "Thing",
                "properties": {
                    "Id": "one",
                    "Size": 12,
                    "Tags": ["a", "b"],
                    "Data": [1, 2, 255],
                    "Inner": { "class": "Thing", "properties": { "Id": "nested" } }
                }
            }]
        }]
    }"#;

    #[test]
    fn test_load_fixture() {
        let repo = Repository::from_json_str(FIXTURE).unwrap();
        let things = repo.instances("ROOT\\Test", "Thing").unwrap();
        assert_eq!(things.len(), 1);

        let thing = &things[0];
        assert_eq!(thing.get("Size"), Some(&Variant::U16(12)));
        assert_eq!(thing.get("Data"), Some(&Variant::Bytes(vec![1, 2, 255])));
        assert_eq!(
            thing.get("Tags"),
            Some(&Variant::from(vec!["a", "b"]))
        );
        match thing.get("Inner") {
            Some(Variant::Object(inner)) => assert_eq!(inner.get_str("Id"), Some("nested")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_value_rejected() {
        let text = FIXTURE.replace("\"Size\": 12", "\"Size\": 70000");
        let err = Repository::from_json_str(&text).unwrap_err();
        assert!(matches!(err, FixtureError::InvalidValue { ref property, .. } if property == "Size"));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let text = FIXTURE.replace("\"uint16\"", "\"uint128\"");
        let err = Repository::from_json_str(&text).unwrap_err();
        assert!(matches!(err, FixtureError::Type(WmiError::UnsupportedType(_))));
    }

    #[test]
    fn test_unknown_property_rejected() {
        let text = FIXTURE.replace("\"Size\": 12", "\"Weight\": 12");
        let err = Repository::from_json_str(&text).unwrap_err();
        match err {
            FixtureError::Provider(e) => assert_eq!(e.status, Status::NOT_FOUND),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_load_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repo.json");
        fs::write(&path, FIXTURE).unwrap();
        let repo = Repository::load_json(&path).unwrap();
        assert!(repo.namespaces().contains(&"ROOT\\Test".to_string()));

        let err = Repository::load_json(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, FixtureError::Io { .. }));
    }
}
