//! wmi-core - typed access to the WMI management object model
//!
//! Connect a [`Service`] to a namespace of a [`Provider`], run WQL queries,
//! enumerate class instances, read and write properties through
//! [`Instance`], map objects into host records with `#[derive(Record)]` and
//! invoke methods with a staged [`MethodExecutor`].
//!
//! [`MemoryProvider`] serves an in-memory [`Repository`], loaded from a JSON
//! fixture or built in code.
//!
//! # Example
//!
//! ```ignore
//! use wmi_core::{repository::sample, Record, Service, ROOT_CIMV2};
//!
//! #[derive(Debug, Default, Record)]
//! struct Adapter {
//!     name: String,
//!     interface_index: Option<u32>,
//!     #[wmi(rename = "MACAddress")]
//!     mac: Option<String>,
//! }
//!
//! let service = Service::connect(sample::provider(), ROOT_CIMV2)?;
//! let mut adapters: Vec<Adapter> = Vec::new();
//! service.query("SELECT * FROM Win32_NetworkAdapter", &mut adapters)?;
//! ```

// Lets `#[derive(Record)]` name `::wmi_core` from inside this crate.
extern crate self as wmi_core;

mod convert;
mod enumerator;
mod error;
mod instance;
mod mapper;
mod method;
mod provider;
mod service;
mod value;

pub mod records;
pub mod registry;
pub mod repository;

pub use convert::{coerce, FromValue, ToValue};
pub use enumerator::Enum;
pub use error::{ProviderError, Status, WmiError, WmiResult};
pub use instance::{Instance, MethodSignature, Property, Value};
pub use mapper::{collect, populate, write, FieldBinding, QueryTarget, Record};
pub use method::{MethodExecutor, Stage};
pub use provider::{Handle, Provider, ProviderResult, RawProperty, RawSignature, RawValue};
pub use registry::{RegType, Registry, RegistryData, RegistryValue};
pub use repository::{FixtureError, MemoryProvider, Repository};
pub use service::{normalize_namespace, Service, ROOT, ROOT_CIMV2};
pub use value::{CimType, Origin, PropertyType, Variant, CIM_FLAG_ARRAY};

pub use wmi_derive::Record;
