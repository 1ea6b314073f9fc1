// wmi-derive: declared property mappings for WMI records
//
// Provides:
// - #[derive(Record)] - Builds the static field/property table of a struct
//
// Example:
// ```
// use wmi_core::Record;
//
// #[derive(Debug, Default, Record)]
// #[wmi(class = "Win32_NetworkAdapter")]
// struct Adapter {
//     name: Option<String>,
//     interface_index: Option<u32>,
//     #[wmi(rename = "MACAddress")]
//     mac: Option<String>,
//     #[wmi(skip)]
//     selected: bool,
// }
// ```

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod record;

/// Derives `wmi_core::Record` for a struct with named fields.
///
/// Each field is bound to the property named by the PascalCase form of the
/// field name (`interface_index` -> `InterfaceIndex`); property names match
/// case-insensitively.
///
/// Field attributes:
/// - `#[wmi(rename = "Prop")]` binds the field to `Prop`
/// - `#[wmi(skip)]` leaves the field out of the table
///
/// Container attributes:
/// - `#[wmi(class = "Class")]` sets `Record::CLASS`
///
/// Every bound field type must implement `FromValue` and `ToValue`, and the
/// struct must implement `Default`.
#[proc_macro_derive(Record, attributes(wmi))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand_record(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
