//! Instance - owned handle to one object
//!
//! An `Instance` is either a class definition or a class instance. It keeps
//! its service's connection alive through an `Rc`, which also makes it
//! `!Send`: handles stay on the thread that created them.

use std::fmt;
use std::rc::Rc;

use crate::convert::{coerce, FromValue, ToValue};
use crate::error::{ProviderError, Status, WmiError, WmiResult};
use crate::provider::{Handle, RawProperty};
use crate::service::Connection;
use crate::value::{Origin, PropertyType, Variant};

/// Host-side dynamic value; embedded objects are owned [`Instance`]s.
pub type Value = Variant<Instance>;

/// Snapshot of one property.
#[derive(Debug, PartialEq)]
pub struct Property {
    /// Canonical property name
    pub name: String,
    /// Value at the time of the read
    pub value: Value,
    /// Declared type
    pub ty: PropertyType,
    /// Declaring origin
    pub origin: Origin,
}

impl Property {
    /// Render the value for display
    pub fn value_as_string(&self) -> String {
        self.value.to_string()
    }
}

/// Input and output parameter objects of a method.
#[derive(Debug)]
pub struct MethodSignature {
    /// Input parameters; `None` when the method takes no input
    pub input: Option<Instance>,
    /// Output parameters; `None` when the method produces no output
    pub output: Option<Instance>,
}

/// Owned handle to a class definition or instance.
pub struct Instance {
    handle: Option<Handle>,
    conn: Rc<Connection>,
}

impl Instance {
    pub(crate) fn from_raw(conn: Rc<Connection>, handle: Handle) -> Self {
        Self {
            handle: Some(handle),
            conn,
        }
    }

    pub(crate) fn live(&self) -> WmiResult<Handle> {
        match self.handle {
            Some(handle) if self.conn.is_open() => Ok(handle),
            _ => Err(WmiError::HandleInvalid),
        }
    }

    fn wrap(&self, handle: Handle) -> Instance {
        Instance::from_raw(self.conn.clone(), handle)
    }

    fn property_from_raw(&self, raw: RawProperty) -> Property {
        Property {
            name: raw.name,
            value: raw.value.map_objects(&mut |h| self.wrap(h)),
            ty: raw.ty,
            origin: raw.origin,
        }
    }

    fn property_error(&self, err: ProviderError, name: &str) -> WmiError {
        err.lift(|err| match err.status {
            Status::NOT_FOUND => WmiError::PropertyNotFound {
                name: name.to_string(),
                class: self.class_name().unwrap_or_default(),
            },
            _ => WmiError::Provider(err),
        })
    }

    /// Whether `close()` has been called or the service was closed
    pub fn is_closed(&self) -> bool {
        self.live().is_err()
    }

    // ========================================================================
    // Properties
    // ========================================================================

    /// Read a property (case-insensitive name).
    pub fn get(&self, name: &str) -> WmiResult<Property> {
        let handle = self.live()?;
        let raw = self
            .conn
            .provider
            .get(handle, name)
            .map_err(|e| self.property_error(e, name))?;
        Ok(self.property_from_raw(raw))
    }

    /// Read a property and convert it to `T`.
    pub fn get_as<T: FromValue>(&self, name: &str) -> WmiResult<T> {
        T::from_value(self.get(name)?.value)
    }

    /// Declared type of a property.
    pub fn property_type(&self, name: &str) -> WmiResult<PropertyType> {
        let handle = self.live()?;
        self.conn
            .provider
            .property_type(handle, name)
            .map_err(|e| self.property_error(e, name))
    }

    /// Write a property.
    ///
    /// The value is checked against the declared type first; on
    /// `TypeMismatch` the property keeps its previous value.
    pub fn put<V: ToValue>(&self, name: &str, value: V) -> WmiResult<()> {
        self.put_value(name, value.to_value()?)
    }

    /// Write an already-built dynamic value.
    pub fn put_value(&self, name: &str, value: Value) -> WmiResult<()> {
        let handle = self.live()?;
        let declared = self.property_type(name)?;
        let value = coerce(value, declared)?;
        let raw = value.try_map_objects_ref(&mut |instance: &Instance| instance.live())?;

        self.conn
            .provider
            .put(handle, name, &raw)
            .map_err(|e| match e.status {
                Status::TYPE_MISMATCH => WmiError::type_mismatch(declared.to_string(), e.message),
                _ => self.property_error(e, name),
            })
    }

    /// Snapshot of every property at call time.
    pub fn properties(&self) -> WmiResult<Vec<Property>> {
        let handle = self.live()?;
        let names = self.conn.provider.property_names(handle)?;
        names.iter().map(|name| self.get(name)).collect()
    }

    /// Names of every property
    pub fn property_names(&self) -> WmiResult<Vec<String>> {
        let handle = self.live()?;
        Ok(self.conn.provider.property_names(handle)?)
    }

    // ========================================================================
    // Class information
    // ========================================================================

    /// Class name
    pub fn class_name(&self) -> WmiResult<String> {
        let handle = self.live()?;
        Ok(self.conn.provider.class_name(handle)?)
    }

    /// Relative object path (`__RELPATH`), if the object has one
    pub fn relative_path(&self) -> WmiResult<Option<String>> {
        self.get_as("__RELPATH")
    }

    /// Full object path (`__PATH`), if the object has one
    pub fn path(&self) -> WmiResult<Option<String>> {
        self.get_as("__PATH")
    }

    /// Method names, inherited methods included
    pub fn methods(&self) -> WmiResult<Vec<String>> {
        let handle = self.live()?;
        Ok(self.conn.provider.method_names(handle)?)
    }

    /// Input/output signature of a method.
    pub fn method(&self, name: &str) -> WmiResult<MethodSignature> {
        let handle = self.live()?;
        let raw = self.conn.provider.method(handle, name).map_err(|e| {
            e.lift(|e| match e.status {
                Status::NOT_FOUND | Status::INVALID_METHOD => WmiError::MethodNotFound {
                    name: name.to_string(),
                    class: self.class_name().unwrap_or_default(),
                },
                _ => WmiError::Provider(e),
            })
        })?;

        Ok(MethodSignature {
            input: raw.input.map(|h| self.wrap(h)),
            output: raw.output.map(|h| self.wrap(h)),
        })
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Blank instance of this object's class.
    ///
    /// The new instance is not registered with any namespace; it is a
    /// template for method parameters or embedded objects.
    pub fn spawn_instance(&self) -> WmiResult<Instance> {
        let handle = self.live()?;
        let spawned = self.conn.provider.spawn_instance(handle)?;
        Ok(self.wrap(spawned))
    }

    /// Independent copy of this object
    pub fn try_clone(&self) -> WmiResult<Instance> {
        let handle = self.live()?;
        let cloned = self.conn.provider.clone_object(handle)?;
        Ok(self.wrap(cloned))
    }

    // ========================================================================
    // Lifetime
    // ========================================================================

    /// Release the handle. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            tracing::trace!(handle = handle.get(), "releasing object");
            if let Err(err) = self.conn.provider.release(handle) {
                tracing::warn!(handle = handle.get(), "failed to release object: {}", err);
            }
        }
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        self.close();
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle && Rc::ptr_eq(&self.conn, &other.conn)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("handle", &self.handle.map(Handle::get))
            .field("namespace", &self.conn.path())
            .finish()
    }
}
