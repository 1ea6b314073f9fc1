//! Object data held by the repository

use std::cmp::Ordering;

use crate::convert::coerce;
use crate::error::{ProviderError, Status};
use crate::provider::ProviderResult;
use crate::value::{CimType, Origin, PropertyType, Variant};

/// Value stored in the repository; embedded objects are owned copies.
pub type StoredValue = Variant<Box<ObjectData>>;

/// Class of method parameter objects
pub const PARAMETERS_CLASS: &str = "__PARAMETERS";

/// Server name used in full object paths
pub const SERVER: &str = ".";

const STRING: PropertyType = PropertyType::scalar(CimType::String);

const SYSTEM_PROPERTIES: [(&str, PropertyType); 6] = [
    ("__GENUS", PropertyType::scalar(CimType::Sint32)),
    ("__CLASS", STRING),
    ("__SUPERCLASS", STRING),
    ("__NAMESPACE", STRING),
    ("__RELPATH", STRING),
    ("__PATH", STRING),
];

/// Whether an object is a class definition or an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Genus {
    /// Class definition
    Class,
    /// Class instance
    Instance,
}

/// One property of an object.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    /// Declared name
    pub name: String,
    /// Declared type
    pub ty: PropertyType,
    /// Part of the object's key
    pub key: bool,
    /// Declaring origin
    pub origin: Origin,
    /// Current value
    pub value: StoredValue,
}

/// A class definition or instance as the repository stores it.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectData {
    pub(crate) class: String,
    pub(crate) superclass: Option<String>,
    pub(crate) namespace: String,
    pub(crate) genus: Genus,
    pub(crate) singleton: bool,
    pub(crate) slots: Vec<Slot>,
}

impl From<ObjectData> for StoredValue {
    fn from(object: ObjectData) -> Self {
        Variant::Object(Box::new(object))
    }
}

impl ObjectData {
    /// Class name
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Namespace the object belongs to
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Class or instance
    pub fn genus(&self) -> Genus {
        self.genus
    }

    /// Declared properties, system properties excluded
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    fn not_found(&self, name: &str) -> ProviderError {
        ProviderError::new(
            Status::NOT_FOUND,
            format!("property '{}' not found on '{}'", name, self.class),
        )
    }

    /// Value of a declared property
    pub fn get(&self, name: &str) -> Option<&StoredValue> {
        self.slot(name).map(|s| &s.value)
    }

    /// String value of a declared property
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Variant::as_str)
    }

    /// Full property, system properties included.
    pub fn property(&self, name: &str) -> ProviderResult<Slot> {
        if let Some(slot) = self.slot(name) {
            return Ok(slot.clone());
        }
        let (system, ty) = SYSTEM_PROPERTIES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .ok_or_else(|| self.not_found(name))?;

        Ok(Slot {
            name: system.to_string(),
            ty: *ty,
            key: false,
            origin: Origin::System,
            value: self.system_value(system),
        })
    }

    fn system_value(&self, name: &str) -> StoredValue {
        let text = |s: Option<String>| s.map(Variant::String).unwrap_or(Variant::Null);
        match name {
            "__GENUS" => Variant::I32(match self.genus {
                Genus::Class => 1,
                Genus::Instance => 2,
            }),
            "__CLASS" => Variant::String(self.class.clone()),
            "__SUPERCLASS" => text(self.superclass.clone()),
            "__NAMESPACE" => Variant::String(self.namespace.clone()),
            "__RELPATH" => text(self.relative_path()),
            "__PATH" => text(self.path()),
            _ => Variant::Null,
        }
    }

    /// Declared type of a property, system properties included
    pub fn property_type(&self, name: &str) -> ProviderResult<PropertyType> {
        self.property(name).map(|slot| slot.ty)
    }

    /// System property names followed by declared ones
    pub fn property_names(&self) -> Vec<String> {
        SYSTEM_PROPERTIES
            .iter()
            .map(|(name, _)| name.to_string())
            .chain(self.slots.iter().map(|s| s.name.clone()))
            .collect()
    }

    /// Write a declared property, coercing to its declared type.
    pub fn set(&mut self, name: &str, value: StoredValue) -> ProviderResult<()> {
        if name.starts_with("__") && self.slot(name).is_none() {
            return Err(ProviderError::new(
                Status::NOT_SUPPORTED,
                format!("system property '{}' is read-only", name),
            ));
        }
        let class = self.class.clone();
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                ProviderError::new(
                    Status::NOT_FOUND,
                    format!("property '{}' not found on '{}'", name, class),
                )
            })?;

        slot.value = coerce(value, slot.ty)
            .map_err(|e| ProviderError::new(Status::TYPE_MISMATCH, e.to_string()))?;
        Ok(())
    }

    /// Blank instance of this object's class
    pub fn spawn(&self) -> ObjectData {
        let mut spawned = self.clone();
        spawned.genus = Genus::Instance;
        for slot in &mut spawned.slots {
            slot.value = Variant::Null;
        }
        spawned
    }

    /// Keep only the slots `keep` accepts
    pub(crate) fn retain(&mut self, keep: impl Fn(&Slot) -> bool) {
        self.slots.retain(|slot| keep(slot));
    }

    /// Key properties, in declaration order
    pub fn keys(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter().filter(|s| s.key)
    }

    // ========================================================================
    // Paths
    // ========================================================================

    /// Relative path: `Class`, `Class=@` or `Class.Key="value"`.
    ///
    /// `None` for instances without a complete key.
    pub fn relative_path(&self) -> Option<String> {
        if self.genus == Genus::Class {
            return Some(self.class.clone());
        }
        if self.singleton {
            return Some(format!("{}=@", self.class));
        }

        let mut keys: Vec<&Slot> = self.keys().collect();
        if keys.is_empty() {
            return None;
        }
        keys.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

        let mut parts = Vec::with_capacity(keys.len());
        for slot in keys {
            parts.push(format!("{}={}", slot.name, key_literal(&slot.value)?));
        }
        Some(format!("{}.{}", self.class, parts.join(",")))
    }

    /// Full path including server and namespace
    pub fn path(&self) -> Option<String> {
        if self.class == PARAMETERS_CLASS {
            return None;
        }
        self.relative_path()
            .map(|rel| format!("\\\\{}\\{}:{}", SERVER, self.namespace, rel))
    }
}

/// Render a key value the way it appears in an object path.
fn key_literal(value: &StoredValue) -> Option<String> {
    match value {
        Variant::String(s) => Some(format!(
            "\"{}\"",
            s.replace('\\', "\\\\").replace('"', "\\\"")
        )),
        Variant::Bool(true) => Some("TRUE".to_string()),
        Variant::Bool(false) => Some("FALSE".to_string()),
        other => other.integer().map(|n| n.to_string()),
    }
}

/// Compare two key values. Strings compare case-insensitively; a string and
/// an integer compare by the integer's text.
pub(crate) fn key_eq(stored: &StoredValue, wanted: &StoredValue) -> bool {
    match (stored, wanted) {
        (Variant::String(a), Variant::String(b)) => a.eq_ignore_ascii_case(b),
        (Variant::Bool(a), Variant::Bool(b)) => a == b,
        (Variant::String(a), other) | (other, Variant::String(a)) => other
            .integer()
            .map(|n| n.to_string() == a.trim())
            .unwrap_or(false),
        (a, b) => match (a.integer(), b.integer()) {
            (Some(a), Some(b)) => a.cmp(&b) == Ordering::Equal,
            _ => false,
        },
    }
}

/// Parameter object for a method signature
pub(crate) fn parameters_object(namespace: &str, params: &[Slot]) -> ObjectData {
    ObjectData {
        class: PARAMETERS_CLASS.to_string(),
        superclass: None,
        namespace: namespace.to_string(),
        genus: Genus::Class,
        singleton: false,
        slots: params.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process() -> ObjectData {
        ObjectData {
            class: "Win32_Process".to_string(),
            superclass: Some("CIM_Process".to_string()),
            namespace: "ROOT\\CIMV2".to_string(),
            genus: Genus::Instance,
            singleton: false,
            slots: vec![
                Slot {
                    name: "Handle".to_string(),
                    ty: STRING,
                    key: true,
                    origin: Origin::Propagated,
                    value: Variant::String("4".to_string()),
                },
                Slot {
                    name: "ThreadCount".to_string(),
                    ty: PropertyType::scalar(CimType::Uint32),
                    key: false,
                    origin: Origin::Local,
                    value: Variant::U32(100),
                },
            ],
        }
    }

    #[test]
    fn test_paths() {
        let p = process();
        assert_eq!(p.relative_path().unwrap(), "Win32_Process.Handle=\"4\"");
        assert_eq!(
            p.path().unwrap(),
            "\\\\.\\ROOT\\CIMV2:Win32_Process.Handle=\"4\""
        );

        let blank = p.spawn();
        assert!(blank.relative_path().is_none());
    }

    #[test]
    fn test_key_literal_escapes() {
        let v: StoredValue = Variant::String("c:\\windows\\\"x\"".to_string());
        assert_eq!(key_literal(&v).unwrap(), "\"c:\\\\windows\\\\\\\"x\\\"\"");
    }

    #[test]
    fn test_system_properties() {
        let p = process();
        let class = p.property("__class").unwrap();
        assert_eq!(class.value, Variant::String("Win32_Process".to_string()));
        assert_eq!(class.origin, Origin::System);
        assert_eq!(p.property("__GENUS").unwrap().value, Variant::I32(2));
        assert_eq!(p.property_names()[0], "__GENUS");
    }

    #[test]
    fn test_set_coerces_and_rejects() {
        let mut p = process();
        p.set("threadcount", Variant::I64(5)).unwrap();
        assert_eq!(p.get("ThreadCount"), Some(&Variant::U32(5)));

        let err = p.set("ThreadCount", Variant::I64(-1)).unwrap_err();
        assert_eq!(err.status, Status::TYPE_MISMATCH);
        assert_eq!(p.get("ThreadCount"), Some(&Variant::U32(5)));

        let err = p.set("__CLASS", Variant::String("x".into())).unwrap_err();
        assert_eq!(err.status, Status::NOT_SUPPORTED);

        let err = p.set("Missing", Variant::Null).unwrap_err();
        assert_eq!(err.status, Status::NOT_FOUND);
    }

    #[test]
    fn test_key_eq() {
        let s: StoredValue = Variant::String("Abc".into());
        assert!(key_eq(&s, &Variant::String("aBC".into())));
        assert!(key_eq(&Variant::String("4".into()), &Variant::I64(4)));
        assert!(key_eq(&Variant::U32(7), &Variant::I64(7)));
        assert!(!key_eq(&Variant::U32(7), &Variant::Bool(true)));
    }
}
