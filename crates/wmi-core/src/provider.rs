//! Provider - the handle-based object system below the core
//!
//! A provider hands out opaque [`Handle`]s for namespaces, enumerators and
//! objects. Every handle it returns must be given back through
//! [`Provider::release`] exactly once; the core's RAII wrappers
//! ([`Service`](crate::Service), [`Enum`](crate::Enum),
//! [`Instance`](crate::Instance)) take care of that.
//!
//! Calls are synchronous and block until the provider answers.

use std::num::NonZeroU64;

use crate::error::ProviderError;
use crate::value::{Origin, PropertyType, Variant};

/// Result type for provider calls
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Opaque handle issued by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(NonZeroU64);

impl Handle {
    /// Create a handle from a raw non-zero id
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Handle)
    }

    /// Raw id
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

/// Value at the provider boundary; embedded objects are handles the caller
/// now owns.
pub type RawValue = Variant<Handle>;

/// Property as reported by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct RawProperty {
    /// Canonical property name (as declared by the class)
    pub name: String,
    /// Current value
    pub value: RawValue,
    /// Declared type
    pub ty: PropertyType,
    /// Declaring origin
    pub origin: Origin,
}

/// Input/output parameter objects of a method. Either side is absent when the
/// method has no parameters in that direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSignature {
    /// Input parameters object
    pub input: Option<Handle>,
    /// Output parameters object
    pub output: Option<Handle>,
}

/// Handle-based object model API.
///
/// Lookups by name are case-insensitive. Unknown or released handles fail with
/// [`Status::INVALID_HANDLE`](crate::Status::INVALID_HANDLE).
pub trait Provider {
    // ========================================================================
    // Namespaces
    // ========================================================================

    /// Open a namespace by full path (e.g. `ROOT\CIMV2`)
    fn connect(&self, namespace: &str) -> ProviderResult<Handle>;

    /// Open a child namespace relative to an open one
    fn open_namespace(&self, namespace: Handle, child: &str) -> ProviderResult<Handle>;

    // ========================================================================
    // Queries and lookups
    // ========================================================================

    /// Execute a query; returns an enumerator handle
    fn exec_query(&self, namespace: Handle, query: &str) -> ProviderResult<Handle>;

    /// Enumerate all instances of a class; returns an enumerator handle
    fn create_instance_enum(&self, namespace: Handle, class: &str) -> ProviderResult<Handle>;

    /// Fetch a class definition or instance by object path
    fn get_object(&self, namespace: Handle, path: &str) -> ProviderResult<Handle>;

    /// Execute a method; returns the output parameters object
    fn exec_method(
        &self,
        namespace: Handle,
        path: &str,
        method: &str,
        input: Option<Handle>,
    ) -> ProviderResult<Handle>;

    // ========================================================================
    // Enumerators
    // ========================================================================

    /// Advance an enumerator; `None` at end of sequence
    fn next(&self, enumerator: Handle) -> ProviderResult<Option<Handle>>;

    // ========================================================================
    // Objects
    // ========================================================================

    /// Read a property
    fn get(&self, object: Handle, name: &str) -> ProviderResult<RawProperty>;

    /// Declared type of a property
    fn property_type(&self, object: Handle, name: &str) -> ProviderResult<PropertyType>;

    /// Write a property; embedded object handles are borrowed, not consumed
    fn put(&self, object: Handle, name: &str, value: &RawValue) -> ProviderResult<()>;

    /// Names of all properties, system properties first
    fn property_names(&self, object: Handle) -> ProviderResult<Vec<String>>;

    /// Class name of the object
    fn class_name(&self, object: Handle) -> ProviderResult<String>;

    /// Method names declared on the object's class, inherited ones included
    fn method_names(&self, object: Handle) -> ProviderResult<Vec<String>>;

    /// Method signature objects
    fn method(&self, object: Handle, name: &str) -> ProviderResult<RawSignature>;

    /// Blank instance of the object's class
    fn spawn_instance(&self, object: Handle) -> ProviderResult<Handle>;

    /// Independent copy of the object
    fn clone_object(&self, object: Handle) -> ProviderResult<Handle>;

    // ========================================================================
    // Lifetime
    // ========================================================================

    /// Release any handle
    fn release(&self, handle: Handle) -> ProviderResult<()>;
}
