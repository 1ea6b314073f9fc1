//! Object Mapper - declared field/property tables for host records
//!
//! A [`Record`] lists its fields once, as a static table of
//! [`FieldBinding`]s. `#[derive(Record)]` generates the table:
//!
//! ```ignore
//! #[derive(Debug, Default, Record)]
//! #[wmi(class = "Win32_NetworkAdapter")]
//! struct Adapter {
//!     interface_index: Option<u32>,     // -> InterfaceIndex
//!     #[wmi(rename = "MACAddress")]
//!     mac_address: Option<String>,
//!     #[wmi(skip)]
//!     seen: bool,
//! }
//! ```
//!
//! Property names match case-insensitively. Properties the record does not
//! declare are ignored, and fields whose property the object lacks keep
//! their default, so a projected query maps into the full record.

use crate::enumerator::Enum;
use crate::error::{WmiError, WmiResult};
use crate::instance::{Instance, Value};

// ============================================================================
// Mapping tables
// ============================================================================

/// One field of a record bound to a property.
pub struct FieldBinding<T> {
    /// Rust field name
    pub field: &'static str,
    /// Property name (matched case-insensitively)
    pub property: &'static str,
    /// Convert a value and store it in the field
    pub assign: fn(&mut T, Value) -> WmiResult<()>,
    /// Read the field as a value
    pub extract: fn(&T) -> WmiResult<Value>,
}

impl<T> std::fmt::Debug for FieldBinding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldBinding")
            .field("field", &self.field)
            .field("property", &self.property)
            .finish()
    }
}

/// Host type populated from object properties.
pub trait Record: Default + 'static {
    /// Class this record maps, when declared with `#[wmi(class = "...")]`
    const CLASS: Option<&'static str> = None;

    /// Field table, built once per type
    fn bindings() -> &'static [FieldBinding<Self>];

    /// Look up the binding for a property name
    fn binding(property: &str) -> Option<&'static FieldBinding<Self>> {
        Self::bindings()
            .iter()
            .find(|b| b.property.eq_ignore_ascii_case(property))
    }
}

// ============================================================================
// Instance -> record
// ============================================================================

/// Build a record from an instance.
///
/// Either every bound field converts or nothing is returned.
pub fn populate<T: Record>(instance: &Instance) -> WmiResult<T> {
    let mut record = T::default();
    for binding in T::bindings() {
        let value = match instance.get(binding.property) {
            Ok(property) => property.value,
            Err(WmiError::PropertyNotFound { .. }) => continue,
            Err(err) => return Err(err),
        };
        (binding.assign)(&mut record, value)?;
    }
    Ok(record)
}

/// Map every remaining row of a cursor. The first failing row aborts.
pub fn collect<T: Record>(rows: &mut Enum) -> WmiResult<Vec<T>> {
    let mut records = Vec::new();
    for row in rows {
        records.push(populate(&row?)?);
    }
    Ok(records)
}

// ============================================================================
// Record -> instance
// ============================================================================

/// Write a record's fields into an instance.
///
/// Every field is converted and checked against its declared property type
/// before the first property is written. Fields whose property the instance
/// lacks are skipped.
pub fn write<T: Record>(record: &T, instance: &Instance) -> WmiResult<()> {
    let mut staged = Vec::new();
    for binding in T::bindings() {
        let declared = match instance.property_type(binding.property) {
            Ok(ty) => ty,
            Err(WmiError::PropertyNotFound { .. }) => continue,
            Err(err) => return Err(err),
        };
        let value = crate::convert::coerce((binding.extract)(record)?, declared)?;
        staged.push((binding.property, value));
    }

    for (property, value) in staged {
        instance.put_value(property, value)?;
    }
    Ok(())
}

// ============================================================================
// Query targets
// ============================================================================

/// Destination of [`Service::query`](crate::Service::query).
pub trait QueryTarget {
    /// Consume rows from the cursor into `self`.
    fn fill(&mut self, rows: &mut Enum) -> WmiResult<()>;
}

impl<T: Record> QueryTarget for T {
    fn fill(&mut self, rows: &mut Enum) -> WmiResult<()> {
        let first = match rows.next() {
            Some(row) => row?,
            None => {
                return Err(WmiError::ObjectNotFound {
                    path: rows.query().to_string(),
                })
            }
        };
        let record = populate(&first)?;

        if let Some(extra) = rows.next() {
            extra?;
            tracing::debug!(
                query = %rows.query(),
                "query matched more than one row; using the first"
            );
        }

        *self = record;
        Ok(())
    }
}

impl<T: Record> QueryTarget for Vec<T> {
    fn fill(&mut self, rows: &mut Enum) -> WmiResult<()> {
        let records = collect(rows)?;
        self.extend(records);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{FromValue, ToValue};
    use crate::repository::sample;
    use crate::service::{Service, ROOT_CIMV2};

    #[derive(Debug, Default, PartialEq)]
    struct Adapter {
        name: String,
        index: Option<u32>,
    }

    impl Record for Adapter {
        fn bindings() -> &'static [FieldBinding<Self>] {
            static BINDINGS: [FieldBinding<Adapter>; 2] = [
                FieldBinding {
                    field: "name",
                    property: "Name",
                    assign: |r, v| {
                        r.name = String::from_value(v)?;
                        Ok(())
                    },
                    extract: |r| r.name.to_value(),
                },
                FieldBinding {
                    field: "index",
                    property: "InterfaceIndex",
                    assign: |r, v| {
                        r.index = Option::<u32>::from_value(v)?;
                        Ok(())
                    },
                    extract: |r| r.index.to_value(),
                },
            ];
            &BINDINGS
        }
    }

    #[derive(Debug, Default)]
    struct Wrong {
        name: u32,
    }

    impl Record for Wrong {
        fn bindings() -> &'static [FieldBinding<Self>] {
            static BINDINGS: [FieldBinding<Wrong>; 1] = [FieldBinding {
                field: "name",
                property: "name",
                assign: |r, v| {
                    r.name = u32::from_value(v)?;
                    Ok(())
                },
                extract: |r| r.name.to_value(),
            }];
            &BINDINGS
        }
    }

    fn cimv2() -> Service {
        Service::connect(sample::provider(), ROOT_CIMV2).unwrap()
    }

    #[test]
    fn test_binding_lookup_is_case_insensitive() {
        assert_eq!(Adapter::binding("interfaceindex").unwrap().field, "index");
        assert!(Adapter::binding("MACAddress").is_none());
    }

    #[test]
    fn test_populate_is_idempotent() {
        let service = cimv2();
        let row = service
            .create_instance_enum("Win32_NetworkAdapter")
            .unwrap()
            .next()
            .unwrap()
            .unwrap();

        let a: Adapter = populate(&row).unwrap();
        let b: Adapter = populate(&row).unwrap();
        assert_eq!(a, b);
        assert!(!a.name.is_empty());
    }

    #[test]
    fn test_projection_leaves_defaults() {
        let service = cimv2();
        let mut adapters: Vec<Adapter> = Vec::new();
        service
            .query("SELECT Name FROM Win32_NetworkAdapter", &mut adapters)
            .unwrap();
        assert_eq!(adapters.len(), 2);
        assert!(adapters.iter().all(|a| a.index.is_none()));
    }

    #[test]
    fn test_failing_row_aborts_collection() {
        let service = cimv2();
        let mut out: Vec<Wrong> = Vec::new();
        let err = service
            .query("SELECT * FROM Win32_NetworkAdapter", &mut out)
            .unwrap_err();
        assert!(matches!(err, WmiError::TypeMismatch { .. }));
        assert!(out.is_empty());
    }

    #[test]
    fn test_single_target_zero_rows() {
        let service = cimv2();
        let mut adapter = Adapter::default();
        let err = service
            .query(
                "SELECT * FROM Win32_NetworkAdapter WHERE Name = 'missing'",
                &mut adapter,
            )
            .unwrap_err();
        assert!(matches!(err, WmiError::ObjectNotFound { .. }));
        assert_eq!(adapter, Adapter::default());
    }

    #[test]
    fn test_single_target_takes_first_row() {
        let service = cimv2();
        let mut all: Vec<Adapter> = Vec::new();
        service
            .query("SELECT * FROM Win32_NetworkAdapter", &mut all)
            .unwrap();

        let mut single = Adapter::default();
        service
            .query("SELECT * FROM Win32_NetworkAdapter", &mut single)
            .unwrap();
        assert_eq!(single, all[0]);
    }

    #[test]
    fn test_write_is_atomic() {
        let service = cimv2();
        let target = service
            .get_object("Win32_NetworkAdapter")
            .unwrap()
            .spawn_instance()
            .unwrap();
        target.put("Name", "before").unwrap();

        #[derive(Default)]
        struct TooBig {
            name: String,
            index: i64,
        }

        impl Record for TooBig {
            fn bindings() -> &'static [FieldBinding<Self>] {
                static BINDINGS: [FieldBinding<TooBig>; 2] = [
                    FieldBinding {
                        field: "name",
                        property: "Name",
                        assign: |_, _| Ok(()),
                        extract: |r| r.name.to_value(),
                    },
                    FieldBinding {
                        field: "index",
                        property: "InterfaceIndex",
                        assign: |_, _| Ok(()),
                        extract: |r| r.index.to_value(),
                    },
                ];
                &BINDINGS
            }
        }

        let record = TooBig {
            name: "after".to_string(),
            index: 1 << 40,
        };
        let err = write(&record, &target).unwrap_err();
        assert!(matches!(err, WmiError::TypeMismatch { .. }));
        assert_eq!(target.get_as::<String>("Name").unwrap(), "before");

        let ok = TooBig {
            name: "after".to_string(),
            index: 7,
        };
        write(&ok, &target).unwrap();
        assert_eq!(target.get_as::<String>("Name").unwrap(), "after");
        assert_eq!(target.get_as::<u32>("InterfaceIndex").unwrap(), 7);
    }
}
