//! In-memory repository
//!
//! A [`Repository`] holds namespaces, class definitions and instances behind a
//! shared lock. [`MemoryProvider`] serves it through the [`Provider`] trait,
//! so the whole object model can run without an operating-system backend.
//!
//! [`Provider`]: crate::Provider

mod fixture;
mod object;
mod path;
mod provider;
pub mod sample;
mod wql;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{ProviderError, Status};
use crate::provider::ProviderResult;
use crate::value::{CimType, Origin, PropertyType, Variant};

pub use fixture::{
    ClassFixture, Fixture, FixtureError, InstanceFixture, MethodFixture, NamespaceFixture,
    PropertyFixture,
};
pub use object::{Genus, ObjectData, Slot, StoredValue, PARAMETERS_CLASS, SERVER};
pub use provider::MemoryProvider;

use object::key_eq;
use path::{ObjectPath, Selector};

/// Class of the synthetic child-namespace instances
pub const NAMESPACE_CLASS: &str = "__NAMESPACE";

/// Method implementation
pub type MethodHandler = Arc<dyn Fn(&mut MethodCall<'_>) -> ProviderResult<()> + Send + Sync>;

// ============================================================================
// Class definitions
// ============================================================================

/// A declared property or method parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    /// Name
    pub name: String,
    /// Declared type
    pub ty: PropertyType,
    /// Part of the class key
    pub key: bool,
}

impl PropertyDef {
    fn slot(&self, origin: Origin) -> Slot {
        Slot {
            name: self.name.clone(),
            ty: self.ty,
            key: self.key,
            origin,
            value: Variant::Null,
        }
    }
}

/// A declared method.
#[derive(Clone)]
pub struct MethodDef {
    /// Name
    pub name: String,
    /// Input parameters
    pub inputs: Vec<PropertyDef>,
    /// Output parameters, `ReturnValue` included
    pub outputs: Vec<PropertyDef>,
    handler: Option<MethodHandler>,
}

impl MethodDef {
    /// Declare a method with no parameters and no implementation
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            handler: None,
        }
    }

    /// Add an input parameter
    pub fn input(mut self, name: impl Into<String>, ty: PropertyType) -> Self {
        self.inputs.push(PropertyDef {
            name: name.into(),
            ty,
            key: false,
        });
        self
    }

    /// Add an output parameter
    pub fn output(mut self, name: impl Into<String>, ty: PropertyType) -> Self {
        self.outputs.push(PropertyDef {
            name: name.into(),
            ty,
            key: false,
        });
        self
    }

    /// Implement the method
    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut MethodCall<'_>) -> ProviderResult<()> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    fn input_slots(&self) -> Vec<Slot> {
        self.inputs.iter().map(|p| p.slot(Origin::Local)).collect()
    }

    fn output_slots(&self) -> Vec<Slot> {
        self.outputs.iter().map(|p| p.slot(Origin::Local)).collect()
    }
}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("implemented", &self.handler.is_some())
            .finish()
    }
}

/// A class definition.
#[derive(Debug, Clone)]
pub struct ClassDef {
    name: String,
    superclass: Option<String>,
    singleton: bool,
    properties: Vec<PropertyDef>,
    methods: Vec<MethodDef>,
}

impl ClassDef {
    /// Start a class definition
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superclass: None,
            singleton: false,
            properties: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Derive from another class in the same namespace
    pub fn superclass(mut self, name: impl Into<String>) -> Self {
        self.superclass = Some(name.into());
        self
    }

    /// Mark the class as a singleton (`Class=@`)
    pub fn singleton(mut self) -> Self {
        self.singleton = true;
        self
    }

    /// Add a property
    pub fn property(mut self, name: impl Into<String>, ty: PropertyType) -> Self {
        self.properties.push(PropertyDef {
            name: name.into(),
            ty,
            key: false,
        });
        self
    }

    /// Add a key property
    pub fn key(mut self, name: impl Into<String>, ty: PropertyType) -> Self {
        self.properties.push(PropertyDef {
            name: name.into(),
            ty,
            key: true,
        });
        self
    }

    /// Add a method
    pub fn method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }
}

// ============================================================================
// Namespaces
// ============================================================================

/// Contents of one namespace.
#[derive(Debug, Clone)]
pub(crate) struct NamespaceData {
    path: String,
    denied: bool,
    classes: Vec<ClassDef>,
    instances: Vec<ObjectData>,
}

impl NamespaceData {
    fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            denied: false,
            classes: vec![
                ClassDef::new(NAMESPACE_CLASS).key("Name", PropertyType::scalar(CimType::String))
            ],
            instances: Vec::new(),
        }
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    fn class(&self, name: &str) -> Option<&ClassDef> {
        self.classes.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    fn invalid_class(name: &str) -> ProviderError {
        ProviderError::new(Status::INVALID_CLASS, format!("class '{}' does not exist", name))
    }

    /// Class chain, root class first
    fn lineage(&self, name: &str) -> ProviderResult<Vec<&ClassDef>> {
        let mut chain = Vec::new();
        let mut current = Some(name.to_string());
        while let Some(name) = current {
            let class = self.class(&name).ok_or_else(|| Self::invalid_class(&name))?;
            if chain.iter().any(|c: &&ClassDef| c.name.eq_ignore_ascii_case(&class.name)) {
                return Err(ProviderError::new(
                    Status::INVALID_CLASS,
                    format!("class '{}' derives from itself", class.name),
                ));
            }
            chain.push(class);
            current = class.superclass.clone();
        }
        chain.reverse();
        Ok(chain)
    }

    fn is_a(&self, class: &str, ancestor: &str) -> bool {
        self.lineage(class)
            .map(|chain| chain.iter().any(|c| c.name.eq_ignore_ascii_case(ancestor)))
            .unwrap_or(false)
    }

    /// Class definition object with inherited properties
    pub(crate) fn class_object(&self, name: &str) -> ProviderResult<ObjectData> {
        let chain = self.lineage(name)?;
        let last = chain.len() - 1;
        let own = chain[last];

        let mut slots: Vec<Slot> = Vec::new();
        for (depth, class) in chain.iter().enumerate() {
            let origin = if depth == last {
                Origin::Local
            } else {
                Origin::Propagated
            };
            for property in &class.properties {
                match slots.iter_mut().find(|s| s.name.eq_ignore_ascii_case(&property.name)) {
                    Some(existing) => {
                        existing.ty = property.ty;
                        existing.key |= property.key;
                    }
                    None => slots.push(property.slot(origin)),
                }
            }
        }

        Ok(ObjectData {
            class: own.name.clone(),
            superclass: own.superclass.clone(),
            namespace: self.path.clone(),
            genus: Genus::Class,
            singleton: chain.iter().any(|c| c.singleton),
            slots,
        })
    }

    /// Resolve a method, searching superclasses.
    pub(crate) fn method(&self, class: &str, name: &str) -> ProviderResult<&MethodDef> {
        let chain = self.lineage(class)?;
        chain
            .iter()
            .rev()
            .find_map(|c| c.methods.iter().find(|m| m.name.eq_ignore_ascii_case(name)))
            .ok_or_else(|| {
                ProviderError::new(
                    Status::INVALID_METHOD,
                    format!("method '{}' not found on '{}'", name, class),
                )
            })
    }

    pub(crate) fn method_names(&self, class: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        if let Ok(chain) = self.lineage(class) {
            for class in chain.iter().rev() {
                for method in &class.methods {
                    if !names.iter().any(|n| n.eq_ignore_ascii_case(&method.name)) {
                        names.push(method.name.clone());
                    }
                }
            }
        }
        names
    }

    fn add_class(&mut self, class: ClassDef) -> ProviderResult<()> {
        if self.class(&class.name).is_some() {
            return Err(ProviderError::new(
                Status::ALREADY_EXISTS,
                format!("class '{}' already exists in '{}'", class.name, self.path),
            ));
        }
        if let Some(parent) = &class.superclass {
            if self.class(parent).is_none() {
                return Err(Self::invalid_class(parent));
            }
        }
        self.classes.push(class);
        Ok(())
    }

    /// Build an instance of `class` from property values.
    pub(crate) fn build_instance(
        &self,
        class: &str,
        values: Vec<(&str, StoredValue)>,
    ) -> ProviderResult<ObjectData> {
        let mut instance = self.class_object(class)?.spawn();
        for (name, value) in values {
            instance.set(name, value)?;
        }
        Ok(instance)
    }

    /// Register an instance; its path must be unique.
    pub(crate) fn insert_instance(&mut self, instance: ObjectData) -> ProviderResult<()> {
        if let Some(path) = instance.relative_path() {
            let taken = self
                .instances
                .iter()
                .any(|i| i.relative_path().is_some_and(|p| p.eq_ignore_ascii_case(&path)));
            if taken {
                return Err(ProviderError::new(
                    Status::ALREADY_EXISTS,
                    format!("instance '{}' already exists", path),
                ));
            }
        }
        self.instances.push(instance);
        Ok(())
    }

    fn replace_instance(&mut self, updated: ObjectData) {
        let path = updated.relative_path();
        if let Some(slot) = self
            .instances
            .iter_mut()
            .find(|i| path.is_some() && i.relative_path() == path)
        {
            *slot = updated;
        }
    }

    fn remove_instance(&mut self, path: &str) {
        self.instances
            .retain(|i| i.relative_path().map_or(true, |p| !p.eq_ignore_ascii_case(path)));
    }
}

// ============================================================================
// Method calls
// ============================================================================

/// Context handed to a method handler.
pub struct MethodCall<'a> {
    namespace: &'a mut NamespaceData,
    target: Option<ObjectData>,
    input: &'a ObjectData,
    output: &'a mut ObjectData,
    delete_target: bool,
}

impl MethodCall<'_> {
    /// Namespace the method runs in
    pub fn namespace(&self) -> &str {
        self.namespace.path()
    }

    /// Instance the method was invoked on; `None` for class-level calls
    pub fn target(&self) -> Option<&ObjectData> {
        self.target.as_ref()
    }

    /// Mutable target; changes are stored when the handler succeeds
    pub fn target_mut(&mut self) -> Option<&mut ObjectData> {
        self.target.as_mut()
    }

    /// Remove the target instance when the handler succeeds
    pub fn delete_target(&mut self) {
        self.delete_target = true;
    }

    /// Input parameter, `None` when absent or null
    pub fn arg(&self, name: &str) -> Option<&StoredValue> {
        self.input.get(name).filter(|v| !v.is_null())
    }

    /// String input parameter
    pub fn arg_str(&self, name: &str) -> Option<&str> {
        self.arg(name).and_then(Variant::as_str)
    }

    /// Integer input parameter
    pub fn arg_u32(&self, name: &str) -> Option<u32> {
        self.arg(name)
            .and_then(Variant::integer)
            .and_then(|n| u32::try_from(n).ok())
    }

    /// Set an output parameter
    pub fn set_output(&mut self, name: &str, value: impl Into<StoredValue>) -> ProviderResult<()> {
        self.output.set(name, value.into())
    }

    /// Create and register an instance in the method's namespace
    pub fn create_instance(
        &mut self,
        class: &str,
        values: Vec<(&str, StoredValue)>,
    ) -> ProviderResult<ObjectData> {
        let instance = self.namespace.build_instance(class, values)?;
        self.namespace.insert_instance(instance.clone())?;
        Ok(instance)
    }

    pub(crate) fn namespace_data(&self) -> &NamespaceData {
        self.namespace
    }
}

// ============================================================================
// Repository
// ============================================================================

fn namespace_key(path: &str) -> String {
    crate::service::normalize_namespace(path).to_lowercase()
}

#[derive(Debug, Default)]
pub(crate) struct Store {
    namespaces: BTreeMap<String, NamespaceData>,
}

impl Store {
    pub(crate) fn namespace(&self, path: &str) -> ProviderResult<&NamespaceData> {
        self.namespaces.get(&namespace_key(path)).ok_or_else(|| {
            ProviderError::new(
                Status::INVALID_NAMESPACE,
                format!("namespace '{}' does not exist", path),
            )
        })
    }

    pub(crate) fn namespace_mut(&mut self, path: &str) -> ProviderResult<&mut NamespaceData> {
        self.namespaces.get_mut(&namespace_key(path)).ok_or_else(|| {
            ProviderError::new(
                Status::INVALID_NAMESPACE,
                format!("namespace '{}' does not exist", path),
            )
        })
    }

    /// Names of the direct children of a namespace
    pub(crate) fn children(&self, path: &str) -> Vec<String> {
        let prefix = format!("{}\\", namespace_key(path));
        self.namespaces
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix) && !key[prefix.len()..].contains('\\'))
            .filter_map(|(_, ns)| ns.path.rsplit('\\').next().map(str::to_string))
            .collect()
    }

    /// Every instance of `class`, subclasses included
    pub(crate) fn instances(&self, path: &str, class: &str) -> ProviderResult<Vec<ObjectData>> {
        let ns = self.namespace(path)?;
        ns.lineage(class)?;

        let mut found: Vec<ObjectData> = ns
            .instances
            .iter()
            .filter(|i| ns.is_a(&i.class, class))
            .cloned()
            .collect();

        if class.eq_ignore_ascii_case(NAMESPACE_CLASS) {
            for child in self.children(path) {
                found.push(ns.build_instance(NAMESPACE_CLASS, vec![("Name", child.into())])?);
            }
        }
        Ok(found)
    }

    /// Resolve an object path to a class definition or instance
    pub(crate) fn find(&self, path: &str, object: &ObjectPath) -> ProviderResult<ObjectData> {
        let path = object.namespace.as_deref().unwrap_or(path);
        let ns = self.namespace(path)?;
        let class = ns.class_object(&object.class)?;

        let not_found = || {
            ProviderError::new(
                Status::NOT_FOUND,
                format!("object '{}' not found", object),
            )
        };

        match &object.selector {
            Selector::Class => Ok(class),
            Selector::Singleton => {
                if !class.singleton {
                    return Err(ProviderError::new(
                        Status::INVALID_OBJECT_PATH,
                        format!("'{}' is not a singleton class", class.class),
                    ));
                }
                self.instances(path, &object.class)?
                    .into_iter()
                    .next()
                    .ok_or_else(not_found)
            }
            Selector::Keys(wanted) => {
                let key_count = class.keys().count();
                if key_count == 0 || wanted.len() != key_count {
                    return Err(ProviderError::new(
                        Status::INVALID_OBJECT_PATH,
                        format!("'{}' does not name every key of '{}'", object, class.class),
                    ));
                }
                self.instances(path, &object.class)?
                    .into_iter()
                    .find(|instance| {
                        wanted.iter().all(|(name, value)| {
                            let slot = match name {
                                Some(name) => instance
                                    .keys()
                                    .find(|s| s.name.eq_ignore_ascii_case(name)),
                                None => instance.keys().next(),
                            };
                            slot.is_some_and(|s| key_eq(&s.value, value))
                        })
                    })
                    .ok_or_else(not_found)
            }
        }
    }
}

/// Shared, thread-safe object store.
///
/// Cloning a repository shares its contents.
#[derive(Clone)]
pub struct Repository {
    store: Arc<RwLock<Store>>,
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("namespaces", &self.namespaces())
            .finish()
    }
}

impl Repository {
    /// Repository holding only the `ROOT` namespace
    pub fn new() -> Self {
        let mut store = Store::default();
        store
            .namespaces
            .insert(namespace_key(crate::ROOT), NamespaceData::new(crate::ROOT));
        Self {
            store: Arc::new(RwLock::new(store)),
        }
    }

    pub(crate) fn read(&self) -> parking_lot::RwLockReadGuard<'_, Store> {
        self.store.read()
    }

    pub(crate) fn write(&self) -> parking_lot::RwLockWriteGuard<'_, Store> {
        self.store.write()
    }

    /// Create a namespace and any missing parents
    pub fn add_namespace(&self, path: &str) {
        let path = crate::service::normalize_namespace(path);
        let mut store = self.store.write();
        let mut current = String::new();
        for part in path.split('\\').filter(|p| !p.is_empty()) {
            if !current.is_empty() {
                current.push('\\');
            }
            current.push_str(part);
            store
                .namespaces
                .entry(current.to_lowercase())
                .or_insert_with(|| NamespaceData::new(&current));
        }
    }

    /// Full paths of every namespace
    pub fn namespaces(&self) -> Vec<String> {
        self.store
            .read()
            .namespaces
            .values()
            .map(|ns| ns.path.clone())
            .collect()
    }

    /// Refuse connections to a namespace
    pub fn deny_access(&self, path: &str) {
        if let Ok(ns) = self.store.write().namespace_mut(path) {
            ns.denied = true;
        }
    }

    /// Define a class
    pub fn add_class(&self, namespace: &str, class: ClassDef) -> ProviderResult<()> {
        self.store.write().namespace_mut(namespace)?.add_class(class)
    }

    /// Create an instance from property values
    pub fn add_instance(
        &self,
        namespace: &str,
        class: &str,
        values: Vec<(&str, StoredValue)>,
    ) -> ProviderResult<()> {
        let mut store = self.store.write();
        let ns = store.namespace_mut(namespace)?;
        let instance = ns.build_instance(class, values)?;
        ns.insert_instance(instance)
    }

    /// Blank instance of a class, not registered anywhere
    pub fn spawn(&self, namespace: &str, class: &str) -> ProviderResult<ObjectData> {
        let store = self.store.read();
        Ok(store.namespace(namespace)?.class_object(class)?.spawn())
    }

    /// Class definition object
    pub fn class_object(&self, namespace: &str, class: &str) -> ProviderResult<ObjectData> {
        self.store.read().namespace(namespace)?.class_object(class)
    }

    /// Snapshot of every instance of a class, subclasses included
    pub fn instances(&self, namespace: &str, class: &str) -> ProviderResult<Vec<ObjectData>> {
        self.store.read().instances(namespace, class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string() -> PropertyType {
        PropertyType::scalar(CimType::String)
    }

    fn repo() -> Repository {
        let repo = Repository::new();
        repo.add_namespace("ROOT\\Test\\Child");
        repo.add_class(
            "ROOT\\Test",
            ClassDef::new("Base")
                .key("Id", string())
                .property("Label", string())
                .method(
                    MethodDef::new("Ping")
                        .output("ReturnValue", PropertyType::scalar(CimType::Uint32)),
                ),
        )
        .unwrap();
        repo.add_class(
            "ROOT\\Test",
            ClassDef::new("Derived")
                .superclass("Base")
                .property("Extra", PropertyType::scalar(CimType::Uint32)),
        )
        .unwrap();
        repo.add_instance("ROOT\\Test", "Base", vec![("Id", "a".into())])
            .unwrap();
        repo.add_instance(
            "ROOT\\Test",
            "Derived",
            vec![("Id", "b".into()), ("Extra", 3u32.into())],
        )
        .unwrap();
        repo
    }

    #[test]
    fn test_add_namespace_creates_parents() {
        let repo = repo();
        let names = repo.namespaces();
        assert!(names.contains(&"ROOT\\Test".to_string()));
        assert!(names.contains(&"ROOT\\Test\\Child".to_string()));
    }

    #[test]
    fn test_inherited_properties() {
        let repo = repo();
        let class = repo.class_object("root\\test", "derived").unwrap();
        let origins: Vec<(&str, Origin)> = class
            .slots()
            .iter()
            .map(|s| (s.name.as_str(), s.origin))
            .collect();
        assert_eq!(
            origins,
            vec![
                ("Id", Origin::Propagated),
                ("Label", Origin::Propagated),
                ("Extra", Origin::Local)
            ]
        );
        assert_eq!(class.superclass.as_deref(), Some("Base"));
    }

    #[test]
    fn test_deep_instances() {
        let repo = repo();
        assert_eq!(repo.instances("ROOT\\Test", "Base").unwrap().len(), 2);
        assert_eq!(repo.instances("ROOT\\Test", "Derived").unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_instance_rejected() {
        let repo = repo();
        let err = repo
            .add_instance("ROOT\\Test", "Base", vec![("Id", "A".into())])
            .unwrap_err();
        assert_eq!(err.status, Status::ALREADY_EXISTS);
    }

    #[test]
    fn test_unknown_superclass_rejected() {
        let repo = repo();
        let err = repo
            .add_class("ROOT\\Test", ClassDef::new("Orphan").superclass("Missing"))
            .unwrap_err();
        assert_eq!(err.status, Status::INVALID_CLASS);
    }

    #[test]
    fn test_namespace_instances() {
        let repo = repo();
        let children = repo.instances("ROOT", NAMESPACE_CLASS).unwrap();
        let names: Vec<&str> = children.iter().filter_map(|c| c.get_str("Name")).collect();
        assert_eq!(names, vec!["Test"]);
    }

    #[test]
    fn test_inherited_method() {
        let repo = repo();
        let store = repo.read();
        let ns = store.namespace("ROOT\\Test").unwrap();
        assert_eq!(ns.method("Derived", "ping").unwrap().name, "Ping");
        assert_eq!(ns.method_names("Derived"), vec!["Ping".to_string()]);
        assert_eq!(
            ns.method("Derived", "Nope").unwrap_err().status,
            Status::INVALID_METHOD
        );
    }
}
