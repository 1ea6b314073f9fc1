//! [`Provider`] implementation over a [`Repository`]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

use crate::error::{ProviderError, Status};
use crate::provider::{Handle, Provider, ProviderResult, RawProperty, RawSignature, RawValue};
use crate::value::PropertyType;

use super::object::parameters_object;
use super::path::ObjectPath;
use super::wql::Query;
use super::{MethodCall, ObjectData, Repository, StoredValue};

enum Entry {
    Namespace(String),
    Enumerator(VecDeque<ObjectData>),
    Object(ObjectData),
}

#[derive(Default)]
struct HandleTable {
    next: u64,
    entries: HashMap<Handle, Entry>,
}

/// Serves a [`Repository`] through the handle-based provider API.
///
/// Enumerators snapshot their results when the query runs, and objects are
/// copies: writing a property of a fetched instance does not change the
/// repository. Handles are local to this provider, so each thread that
/// wants its own services creates its own provider over a shared
/// repository.
pub struct MemoryProvider {
    repo: Repository,
    handles: RefCell<HandleTable>,
    fetch_budget: Cell<Option<usize>>,
}

impl MemoryProvider {
    /// Create a provider over a repository
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            handles: RefCell::new(HandleTable::default()),
            fetch_budget: Cell::new(None),
        }
    }

    /// Repository being served
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Number of handles issued and not yet released
    pub fn open_handles(&self) -> usize {
        self.handles.borrow().entries.len()
    }

    /// Make every enumerator fetch after the next `n` fail with
    /// `WBEM_E_FAILED`.
    pub fn fail_fetch_after(&self, n: usize) {
        self.fetch_budget.set(Some(n));
    }

    // ========================================================================
    // Handle table
    // ========================================================================

    fn insert(&self, entry: Entry) -> ProviderResult<Handle> {
        let mut table = self.handles.borrow_mut();
        table.next += 1;
        let handle = Handle::new(table.next)
            .ok_or_else(|| ProviderError::new(Status::FAILED, "handle space exhausted"))?;
        table.entries.insert(handle, entry);
        tracing::trace!(handle = handle.get(), "issued handle");
        Ok(handle)
    }

    fn namespace_path(&self, handle: Handle) -> ProviderResult<String> {
        match self.handles.borrow().entries.get(&handle) {
            Some(Entry::Namespace(path)) => Ok(path.clone()),
            _ => Err(ProviderError::invalid_handle()),
        }
    }

    fn with_object<R>(
        &self,
        handle: Handle,
        f: impl FnOnce(&ObjectData) -> ProviderResult<R>,
    ) -> ProviderResult<R> {
        match self.handles.borrow().entries.get(&handle) {
            Some(Entry::Object(object)) => f(object),
            _ => Err(ProviderError::invalid_handle()),
        }
    }

    fn with_object_mut<R>(
        &self,
        handle: Handle,
        f: impl FnOnce(&mut ObjectData) -> ProviderResult<R>,
    ) -> ProviderResult<R> {
        match self.handles.borrow_mut().entries.get_mut(&handle) {
            Some(Entry::Object(object)) => f(object),
            _ => Err(ProviderError::invalid_handle()),
        }
    }

    fn object(&self, handle: Handle) -> ProviderResult<ObjectData> {
        self.with_object(handle, |object| Ok(object.clone()))
    }

    fn open(&self, path: String) -> ProviderResult<Handle> {
        {
            let store = self.repo.read();
            let ns = store.namespace(&path)?;
            if ns.denied {
                return Err(ProviderError::new(
                    Status::ACCESS_DENIED,
                    format!("access to '{}' denied", ns.path()),
                ));
            }
        }
        self.insert(Entry::Namespace(path))
    }

    /// Hand embedded objects out as new handles
    fn to_raw(&self, value: StoredValue) -> ProviderResult<RawValue> {
        value.try_map_objects(&mut |object| self.insert(Entry::Object(*object)))
    }

    /// Resolve borrowed handles into owned object copies
    fn from_raw(&self, value: &RawValue) -> ProviderResult<StoredValue> {
        value.try_map_objects_ref(&mut |handle| self.object(*handle).map(Box::new))
    }
}

impl Provider for MemoryProvider {
    fn connect(&self, namespace: &str) -> ProviderResult<Handle> {
        self.open(crate::service::normalize_namespace(namespace))
    }

    fn open_namespace(&self, namespace: Handle, child: &str) -> ProviderResult<Handle> {
        let parent = self.namespace_path(namespace)?;
        let child = crate::service::normalize_namespace(child);
        self.open(format!("{}\\{}", parent, child))
    }

    fn exec_query(&self, namespace: Handle, query: &str) -> ProviderResult<Handle> {
        let path = self.namespace_path(namespace)?;
        let query = Query::parse(query)?;

        let rows = {
            let store = self.repo.read();
            let class = store.namespace(&path)?.class_object(&query.class)?;
            query.validate(&class)?;
            store
                .instances(&path, &query.class)?
                .into_iter()
                .filter(|object| query.matches(object))
                .map(|object| query.project(object))
                .collect::<VecDeque<_>>()
        };

        tracing::trace!(namespace = %path, rows = rows.len(), "query evaluated");
        self.insert(Entry::Enumerator(rows))
    }

    fn create_instance_enum(&self, namespace: Handle, class: &str) -> ProviderResult<Handle> {
        let path = self.namespace_path(namespace)?;
        let rows = self.repo.read().instances(&path, class)?;
        self.insert(Entry::Enumerator(rows.into()))
    }

    fn get_object(&self, namespace: Handle, path: &str) -> ProviderResult<Handle> {
        let ns = self.namespace_path(namespace)?;
        let parsed = ObjectPath::parse(path)?;
        let object = self.repo.read().find(&ns, &parsed)?;
        self.insert(Entry::Object(object))
    }

    fn exec_method(
        &self,
        namespace: Handle,
        path: &str,
        method: &str,
        input: Option<Handle>,
    ) -> ProviderResult<Handle> {
        let ns_path = self.namespace_path(namespace)?;
        let input = input.map(|h| self.object(h)).transpose()?;
        let parsed = ObjectPath::parse(path)?;

        let output = {
            let mut store = self.repo.write();
            let target = store.find(&ns_path, &parsed)?;
            let ns = store.namespace_mut(target.namespace())?;

            let def = ns.method(target.class(), method)?.clone();
            let handler = def.handler.clone().ok_or_else(|| {
                ProviderError::new(
                    Status::NOT_SUPPORTED,
                    format!("method '{}' has no implementation", def.name),
                )
            })?;

            let input = match input {
                Some(input) => input,
                None => parameters_object(ns.path(), &def.input_slots()).spawn(),
            };
            let mut output = parameters_object(ns.path(), &def.output_slots()).spawn();

            let is_instance = target.genus() == super::Genus::Instance;
            let original = target.relative_path();
            let mut call = MethodCall {
                namespace: ns,
                target: is_instance.then_some(target),
                input: &input,
                output: &mut output,
                delete_target: false,
            };
            handler(&mut call)?;

            let MethodCall {
                namespace: ns,
                target,
                delete_target,
                ..
            } = call;
            if let (Some(target), Some(original)) = (target, original) {
                if delete_target {
                    ns.remove_instance(&original);
                } else {
                    ns.replace_instance(target);
                }
            }
            output
        };

        self.insert(Entry::Object(output))
    }

    fn next(&self, enumerator: Handle) -> ProviderResult<Option<Handle>> {
        let object = match self.handles.borrow_mut().entries.get_mut(&enumerator) {
            Some(Entry::Enumerator(rows)) => {
                if rows.is_empty() {
                    return Ok(None);
                }
                if let Some(budget) = self.fetch_budget.get() {
                    if budget == 0 {
                        rows.clear();
                        return Err(ProviderError::new(Status::FAILED, "fetch failed"));
                    }
                    self.fetch_budget.set(Some(budget - 1));
                }
                rows.pop_front()
            }
            _ => return Err(ProviderError::invalid_handle()),
        };

        object.map(|o| self.insert(Entry::Object(o))).transpose()
    }

    fn get(&self, object: Handle, name: &str) -> ProviderResult<RawProperty> {
        let slot = self.with_object(object, |o| o.property(name))?;
        Ok(RawProperty {
            name: slot.name,
            value: self.to_raw(slot.value)?,
            ty: slot.ty,
            origin: slot.origin,
        })
    }

    fn property_type(&self, object: Handle, name: &str) -> ProviderResult<PropertyType> {
        self.with_object(object, |o| o.property_type(name))
    }

    fn put(&self, object: Handle, name: &str, value: &RawValue) -> ProviderResult<()> {
        let value = self.from_raw(value)?;
        self.with_object_mut(object, |o| o.set(name, value))
    }

    fn property_names(&self, object: Handle) -> ProviderResult<Vec<String>> {
        self.with_object(object, |o| Ok(o.property_names()))
    }

    fn class_name(&self, object: Handle) -> ProviderResult<String> {
        self.with_object(object, |o| Ok(o.class().to_string()))
    }

    fn method_names(&self, object: Handle) -> ProviderResult<Vec<String>> {
        let object = self.object(object)?;
        let store = self.repo.read();
        let ns = store.namespace(object.namespace())?;
        Ok(ns.method_names(object.class()))
    }

    fn method(&self, object: Handle, name: &str) -> ProviderResult<RawSignature> {
        let object = self.object(object)?;
        let (input, output) = {
            let store = self.repo.read();
            let ns = store.namespace(object.namespace())?;
            let def = ns.method(object.class(), name)?;
            let side = |slots: Vec<super::Slot>| {
                (!slots.is_empty()).then(|| parameters_object(ns.path(), &slots))
            };
            (side(def.input_slots()), side(def.output_slots()))
        };

        Ok(RawSignature {
            input: input.map(|o| self.insert(Entry::Object(o))).transpose()?,
            output: output.map(|o| self.insert(Entry::Object(o))).transpose()?,
        })
    }

    fn spawn_instance(&self, object: Handle) -> ProviderResult<Handle> {
        let spawned = self.with_object(object, |o| Ok(o.spawn()))?;
        self.insert(Entry::Object(spawned))
    }

    fn clone_object(&self, object: Handle) -> ProviderResult<Handle> {
        let copy = self.object(object)?;
        self.insert(Entry::Object(copy))
    }

    fn release(&self, handle: Handle) -> ProviderResult<()> {
        match self.handles.borrow_mut().entries.remove(&handle) {
            Some(_) => {
                tracing::trace!(handle = handle.get(), "released handle");
                Ok(())
            }
            None => Err(ProviderError::invalid_handle()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{sample, ClassDef};
    use crate::value::Variant;

    fn cimv2(provider: &MemoryProvider) -> Handle {
        provider.connect("ROOT\\CIMV2").unwrap()
    }

    #[test]
    fn test_release_twice_is_invalid_handle() {
        let provider = MemoryProvider::new(sample::repository());
        let ns = cimv2(&provider);
        provider.release(ns).unwrap();
        assert_eq!(
            provider.release(ns).unwrap_err().status,
            Status::INVALID_HANDLE
        );
        assert_eq!(provider.open_handles(), 0);
    }

    #[test]
    fn test_wrong_handle_kind() {
        let provider = MemoryProvider::new(sample::repository());
        let ns = cimv2(&provider);
        assert_eq!(
            provider.get(ns, "Name").unwrap_err().status,
            Status::INVALID_HANDLE
        );
        assert_eq!(
            provider.next(ns).unwrap_err().status,
            Status::INVALID_HANDLE
        );
    }

    #[test]
    fn test_fetched_objects_are_copies() {
        let provider = MemoryProvider::new(sample::repository());
        let ns = cimv2(&provider);
        let os = provider.get_object(ns, "Win32_OperatingSystem=@").unwrap();
        provider
            .put(os, "Caption", &Variant::String("changed".to_string()))
            .unwrap();

        let again = provider.get_object(ns, "Win32_OperatingSystem=@").unwrap();
        let caption = provider.get(again, "Caption").unwrap();
        assert_ne!(caption.value, Variant::String("changed".to_string()));
    }

    #[test]
    fn test_embedded_objects_become_handles() {
        let provider = MemoryProvider::new(sample::repository());
        let ns = cimv2(&provider);
        let class = provider.get_object(ns, "Win32_ProcessStartup").unwrap();
        let startup = provider.spawn_instance(class).unwrap();
        provider.put(startup, "Title", &Variant::String("t".into())).unwrap();

        let sample_class = provider.get_object(ns, "Wmi_TypeSample").unwrap();
        let holder = provider.spawn_instance(sample_class).unwrap();
        provider
            .put(holder, "Nested", &Variant::Object(startup))
            .unwrap();

        let before = provider.open_handles();
        let nested = match provider.get(holder, "Nested").unwrap().value {
            Variant::Object(handle) => handle,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(provider.open_handles(), before + 1);
        assert_ne!(nested, startup);
        assert_eq!(provider.class_name(nested).unwrap(), "Win32_ProcessStartup");
    }

    #[test]
    fn test_method_without_outputs_returns_empty_parameters() {
        let provider = MemoryProvider::new(sample::repository());
        let ns = cimv2(&provider);
        let out = provider
            .exec_method(ns, "Win32_Process.Handle=\"1234\"", "Terminate", None)
            .unwrap();
        assert_eq!(provider.class_name(out).unwrap(), "__PARAMETERS");

        let gone = provider.get_object(ns, "Win32_Process.Handle=\"1234\"");
        assert_eq!(gone.unwrap_err().status, Status::NOT_FOUND);
    }

    #[test]
    fn test_unimplemented_method() {
        let provider = MemoryProvider::new(sample::repository());
        let ns = cimv2(&provider);
        let err = provider
            .exec_method(ns, "Win32_NetworkAdapter.DeviceID=\"0\"", "Reset", None)
            .unwrap_err();
        assert_eq!(err.status, Status::NOT_SUPPORTED);
    }

    #[test]
    fn test_method_names_needs_the_namespace() {
        let other = Repository::new();
        other.add_namespace("ROOT\\Detached");
        other
            .add_class("ROOT\\Detached", ClassDef::new("Thing"))
            .unwrap();
        let thing = other.class_object("ROOT\\Detached", "Thing").unwrap();

        let provider = MemoryProvider::new(sample::repository());
        let handle = provider.insert(Entry::Object(thing)).unwrap();
        assert_eq!(
            provider.method_names(handle).unwrap_err().status,
            Status::INVALID_NAMESPACE
        );

        let ns = cimv2(&provider);
        let process = provider.get_object(ns, "Win32_Process").unwrap();
        assert!(provider
            .method_names(process)
            .unwrap()
            .iter()
            .any(|m| m == "Create"));
    }
}
