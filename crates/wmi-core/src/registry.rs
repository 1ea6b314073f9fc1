//! Registry access through the `StdRegProv` provider class
//!
//! Every call goes through a [`MethodExecutor`]; a non-zero `ReturnValue`
//! from the provider becomes a `MethodInvocation` error carrying that code.

use std::fmt;

use crate::error::{ProviderError, Status, WmiError, WmiResult};
use crate::instance::Instance;
use crate::method::MethodExecutor;
use crate::service::Service;
use crate::value::{CimType, Variant};

/// Class implementing the registry methods
pub const REGISTRY_CLASS: &str = "StdRegProv";

// ============================================================================
// Hives and value types
// ============================================================================

/// `HKEY_CLASSES_ROOT`
pub const HKEY_CLASSES_ROOT: u32 = 0x8000_0000;
/// `HKEY_CURRENT_USER`
pub const HKEY_CURRENT_USER: u32 = 0x8000_0001;
/// `HKEY_LOCAL_MACHINE`
pub const HKEY_LOCAL_MACHINE: u32 = 0x8000_0002;
/// `HKEY_USERS`
pub const HKEY_USERS: u32 = 0x8000_0003;
/// `HKEY_CURRENT_CONFIG`
pub const HKEY_CURRENT_CONFIG: u32 = 0x8000_0005;

/// Registry value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegType {
    /// `REG_SZ`
    String,
    /// `REG_EXPAND_SZ`
    ExpandString,
    /// `REG_BINARY`
    Binary,
    /// `REG_DWORD`
    Dword,
    /// `REG_MULTI_SZ`
    MultiString,
    /// `REG_QWORD`
    Qword,
}

impl RegType {
    /// Numeric type code as reported by `EnumValues`
    pub const fn code(self) -> i32 {
        match self {
            RegType::String => 1,
            RegType::ExpandString => 2,
            RegType::Binary => 3,
            RegType::Dword => 4,
            RegType::MultiString => 7,
            RegType::Qword => 11,
        }
    }

    /// Decode a type code
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(RegType::String),
            2 => Some(RegType::ExpandString),
            3 => Some(RegType::Binary),
            4 => Some(RegType::Dword),
            7 => Some(RegType::MultiString),
            11 => Some(RegType::Qword),
            _ => None,
        }
    }

    /// `REG_*` name
    pub const fn name(self) -> &'static str {
        match self {
            RegType::String => "REG_SZ",
            RegType::ExpandString => "REG_EXPAND_SZ",
            RegType::Binary => "REG_BINARY",
            RegType::Dword => "REG_DWORD",
            RegType::MultiString => "REG_MULTI_SZ",
            RegType::Qword => "REG_QWORD",
        }
    }
}

impl fmt::Display for RegType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name and type of a value, as listed by [`Registry::enum_values`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryValue {
    /// Value name; empty for the key's default value
    pub name: String,
    /// Value type
    pub ty: RegType,
}

/// Data of a registry value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryData {
    /// `REG_SZ`
    String(String),
    /// `REG_EXPAND_SZ`, unexpanded
    ExpandString(String),
    /// `REG_BINARY`
    Binary(Vec<u8>),
    /// `REG_DWORD`
    Dword(u32),
    /// `REG_MULTI_SZ`
    MultiString(Vec<String>),
    /// `REG_QWORD`
    Qword(u64),
}

impl RegistryData {
    /// Type of the data
    pub fn reg_type(&self) -> RegType {
        match self {
            RegistryData::String(_) => RegType::String,
            RegistryData::ExpandString(_) => RegType::ExpandString,
            RegistryData::Binary(_) => RegType::Binary,
            RegistryData::Dword(_) => RegType::Dword,
            RegistryData::MultiString(_) => RegType::MultiString,
            RegistryData::Qword(_) => RegType::Qword,
        }
    }

    /// The data as a method parameter value
    pub fn to_variant<O>(&self) -> Variant<O> {
        match self {
            RegistryData::String(s) | RegistryData::ExpandString(s) => Variant::String(s.clone()),
            RegistryData::Binary(b) => Variant::Bytes(b.clone()),
            RegistryData::Dword(n) => Variant::U32(*n),
            RegistryData::MultiString(items) => Variant::Array(
                CimType::String,
                items.iter().cloned().map(Variant::String).collect(),
            ),
            RegistryData::Qword(n) => Variant::U64(*n),
        }
    }
}

impl fmt::Display for RegistryData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryData::String(s) | RegistryData::ExpandString(s) => f.write_str(s),
            RegistryData::Binary(bytes) => {
                for (i, b) in bytes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            RegistryData::Dword(n) => write!(f, "{:#010x} ({})", n, n),
            RegistryData::MultiString(items) => f.write_str(&items.join("; ")),
            RegistryData::Qword(n) => write!(f, "{:#018x} ({})", n, n),
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Registry client bound to a service.
pub struct Registry<'a> {
    service: &'a Service,
    class: Instance,
}

impl<'a> Registry<'a> {
    /// Fetch the `StdRegProv` class from the service's namespace
    pub fn open(service: &'a Service) -> WmiResult<Self> {
        let class = service.get_object(REGISTRY_CLASS)?;
        Ok(Self { service, class })
    }

    /// Run one provider method and check its `ReturnValue`.
    fn invoke<R>(
        &self,
        method: &str,
        hive: u32,
        key: &str,
        inputs: impl FnOnce(&mut MethodExecutor<'_>),
        outputs: impl FnOnce(&mut MethodExecutor<'_>) -> R,
    ) -> WmiResult<R> {
        let mut executor = self
            .service
            .begin_method_on(&self.class, REGISTRY_CLASS, method);
        executor.set("hDefKey", hive).set("sSubKeyName", key);
        inputs(&mut executor);

        let mut code = 0u32;
        executor.execute()?.get("ReturnValue", &mut code);
        if code != 0 {
            executor.end()?;
            tracing::debug!(method, hive, key, code, "registry call returned an error");
            return Err(WmiError::MethodInvocation {
                path: REGISTRY_CLASS.to_string(),
                method: method.to_string(),
                source: ProviderError::new(
                    Status(code),
                    format!("{} on '{}' returned {}", method, key, code),
                ),
            });
        }

        let result = outputs(&mut executor);
        executor.end()?;
        Ok(result)
    }

    /// Names of the subkeys of a key
    pub fn enum_keys(&self, hive: u32, key: &str) -> WmiResult<Vec<String>> {
        self.invoke("EnumKey", hive, key, |_| {}, |e| {
            let mut names: Option<Vec<String>> = None;
            e.get("sNames", &mut names);
            names.unwrap_or_default()
        })
    }

    /// Names and types of the values of a key
    pub fn enum_values(&self, hive: u32, key: &str) -> WmiResult<Vec<RegistryValue>> {
        let (names, types) = self.invoke("EnumValues", hive, key, |_| {}, |e| {
            let mut names: Option<Vec<String>> = None;
            let mut types: Option<Vec<i32>> = None;
            e.get("sNames", &mut names).get("Types", &mut types);
            (names.unwrap_or_default(), types.unwrap_or_default())
        })?;

        names
            .into_iter()
            .zip(types)
            .map(|(name, code)| {
                let ty = RegType::from_code(code).ok_or_else(|| {
                    WmiError::UnsupportedType(format!("registry type {} of '{}'", code, name))
                })?;
                Ok(RegistryValue { name, ty })
            })
            .collect()
    }

    /// Read a value of a known type
    pub fn get_value(
        &self,
        hive: u32,
        key: &str,
        ty: RegType,
        name: &str,
    ) -> WmiResult<RegistryData> {
        let method = match ty {
            RegType::String => "GetStringValue",
            RegType::ExpandString => "GetExpandedStringValue",
            RegType::Binary => "GetBinaryValue",
            RegType::Dword => "GetDWORDValue",
            RegType::MultiString => "GetMultiStringValue",
            RegType::Qword => "GetQWORDValue",
        };
        self.invoke(
            method,
            hive,
            key,
            |e| {
                e.set("sValueName", name);
            },
            |e| read_data(e, ty),
        )
    }

    /// Create a key and any missing parents
    pub fn create_key(&self, hive: u32, key: &str) -> WmiResult<()> {
        self.invoke("CreateKey", hive, key, |_| {}, |_| ())
    }

    /// Write a `REG_SZ` value
    pub fn set_string_value(&self, hive: u32, key: &str, name: &str, value: &str) -> WmiResult<()> {
        self.invoke(
            "SetStringValue",
            hive,
            key,
            |e| {
                e.set("sValueName", name).set("sValue", value);
            },
            |_| (),
        )
    }

    /// Write a `REG_DWORD` value
    pub fn set_dword_value(&self, hive: u32, key: &str, name: &str, value: u32) -> WmiResult<()> {
        self.invoke(
            "SetDWORDValue",
            hive,
            key,
            |e| {
                e.set("sValueName", name).set("uValue", value);
            },
            |_| (),
        )
    }
}

fn read_data(e: &mut MethodExecutor<'_>, ty: RegType) -> RegistryData {
    match ty {
        RegType::String | RegType::ExpandString => {
            let mut s = String::new();
            e.get("sValue", &mut s);
            if ty == RegType::String {
                RegistryData::String(s)
            } else {
                RegistryData::ExpandString(s)
            }
        }
        RegType::Binary => {
            let mut bytes = Vec::new();
            e.get("uValue", &mut bytes);
            RegistryData::Binary(bytes)
        }
        RegType::Dword => {
            let mut n = 0u32;
            e.get("uValue", &mut n);
            RegistryData::Dword(n)
        }
        RegType::MultiString => {
            let mut items = Vec::new();
            e.get("sValue", &mut items);
            RegistryData::MultiString(items)
        }
        RegType::Qword => {
            let mut n = 0u64;
            e.get("uValue", &mut n);
            RegistryData::Qword(n)
        }
    }
}

impl fmt::Debug for Registry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("namespace", &self.service.namespace())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::sample;
    use crate::service::ROOT_CIMV2;

    const CONTROL: &str = "SYSTEM\\CurrentControlSet\\Control";

    fn cimv2() -> Service {
        Service::connect(sample::provider(), ROOT_CIMV2).unwrap()
    }

    #[test]
    fn test_reg_type_codes() {
        for ty in [
            RegType::String,
            RegType::ExpandString,
            RegType::Binary,
            RegType::Dword,
            RegType::MultiString,
            RegType::Qword,
        ] {
            assert_eq!(RegType::from_code(ty.code()), Some(ty));
        }
        assert_eq!(RegType::from_code(0), None);
        assert_eq!(RegType::MultiString.to_string(), "REG_MULTI_SZ");
    }

    #[test]
    fn test_enum_keys() {
        let service = cimv2();
        let registry = Registry::open(&service).unwrap();
        let keys = registry.enum_keys(HKEY_LOCAL_MACHINE, "SOFTWARE").unwrap();
        assert!(keys.iter().any(|k| k == "Microsoft"));
    }

    #[test]
    fn test_every_listed_value_is_readable() {
        let service = cimv2();
        let registry = Registry::open(&service).unwrap();
        let values = registry.enum_values(HKEY_LOCAL_MACHINE, CONTROL).unwrap();
        assert!(!values.is_empty());

        for value in &values {
            let data = registry
                .get_value(HKEY_LOCAL_MACHINE, CONTROL, value.ty, &value.name)
                .unwrap();
            assert_eq!(data.reg_type(), value.ty, "{}", value.name);
        }
    }

    #[test]
    fn test_missing_key_carries_return_value() {
        let service = cimv2();
        let registry = Registry::open(&service).unwrap();
        let err = registry
            .enum_values(HKEY_LOCAL_MACHINE, "SOFTWARE\\NoSuchVendor")
            .unwrap_err();
        assert_eq!(err.status(), Some(Status(2)));
    }

    #[test]
    fn test_create_and_write() {
        let service = cimv2();
        let registry = Registry::open(&service).unwrap();
        registry
            .create_key(HKEY_CURRENT_USER, "Software\\Acme\\Tool")
            .unwrap();
        registry
            .set_string_value(HKEY_CURRENT_USER, "Software\\Acme\\Tool", "Path", "C:\\Acme")
            .unwrap();
        registry
            .set_dword_value(HKEY_CURRENT_USER, "Software\\Acme\\Tool", "Runs", 3)
            .unwrap();

        assert_eq!(
            registry
                .get_value(HKEY_CURRENT_USER, "Software\\Acme\\Tool", RegType::Dword, "runs")
                .unwrap(),
            RegistryData::Dword(3)
        );
        assert_eq!(
            registry.enum_keys(HKEY_CURRENT_USER, "Software\\Acme").unwrap(),
            vec!["Tool".to_string()]
        );
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        let service = cimv2();
        let registry = Registry::open(&service).unwrap();
        let err = registry
            .get_value(
                HKEY_LOCAL_MACHINE,
                "SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion",
                RegType::Dword,
                "ProductName",
            )
            .unwrap_err();
        assert!(matches!(err, WmiError::MethodInvocation { .. }));
    }

    #[test]
    fn test_binary_display() {
        let data = RegistryData::Binary(vec![0x01, 0xab]);
        assert_eq!(data.to_string(), "01 ab");
    }
}
