//! Sample repository
//!
//! A small, self-consistent picture of a Windows machine: the usual namespace
//! tree, a CIM class hierarchy with processes, network adapters, files and an
//! operating system singleton, and `StdRegProv` backed by an in-memory
//! registry. Tests, the CLI and the integration suite run against it.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{ProviderError, Status};
use crate::provider::{Provider, ProviderResult};
use crate::registry::{
    RegType, RegistryData, HKEY_CLASSES_ROOT, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, HKEY_USERS,
};
use crate::value::{CimType, PropertyType, Variant};

use super::{ClassDef, MethodCall, MethodDef, MemoryProvider, Repository, StoredValue};

const STRING: PropertyType = PropertyType::scalar(CimType::String);
const STRINGS: PropertyType = PropertyType::array(CimType::String);
const BOOLEAN: PropertyType = PropertyType::scalar(CimType::Boolean);
const UINT16: PropertyType = PropertyType::scalar(CimType::Uint16);
const UINT32: PropertyType = PropertyType::scalar(CimType::Uint32);
const UINT64: PropertyType = PropertyType::scalar(CimType::Uint64);
const SINT32S: PropertyType = PropertyType::array(CimType::Sint32);
const BYTES: PropertyType = PropertyType::array(CimType::Uint8);
const DATETIME: PropertyType = PropertyType::scalar(CimType::Datetime);
const OBJECT: PropertyType = PropertyType::scalar(CimType::Object);

const CIMV2: &str = "ROOT\\CIMV2";
const DEFAULT: &str = "ROOT\\default";

/// First process id handed out by `Win32_Process.Create`
const FIRST_PID: u32 = 5000;

/// Provider over a fresh sample repository
pub fn provider() -> Rc<dyn Provider> {
    Rc::new(MemoryProvider::new(repository()))
}

/// Build a fresh sample repository
pub fn repository() -> Repository {
    let repo = Repository::new();
    for ns in [CIMV2, "ROOT\\CIMV2\\Security", DEFAULT, "ROOT\\SecurityCenter2"] {
        repo.add_namespace(ns);
    }

    // The sample data is static; a failure here is a bug in this module.
    if let Err(err) = populate(&repo) {
        panic!("sample repository is inconsistent: {}", err);
    }
    repo
}

fn populate(repo: &Repository) -> ProviderResult<()> {
    cim_hierarchy(repo)?;
    processes(repo)?;
    network_adapters(repo)?;
    computer(repo)?;
    files(repo)?;
    type_sample(repo)?;

    let registry = Arc::new(Mutex::new(seed_registry()));
    for ns in [CIMV2, DEFAULT] {
        repo.add_class(ns, std_reg_prov(&registry))?;
    }
    Ok(())
}

// ============================================================================
// CIM hierarchy
// ============================================================================

fn cim_hierarchy(repo: &Repository) -> ProviderResult<()> {
    repo.add_class(
        CIMV2,
        ClassDef::new("CIM_ManagedSystemElement")
            .property("Caption", STRING)
            .property("Description", STRING)
            .property("InstallDate", DATETIME)
            .property("Name", STRING)
            .property("Status", STRING),
    )?;
    repo.add_class(
        CIMV2,
        ClassDef::new("CIM_LogicalElement").superclass("CIM_ManagedSystemElement"),
    )?;
    repo.add_class(
        CIMV2,
        ClassDef::new("CIM_LogicalDevice")
            .superclass("CIM_LogicalElement")
            .key("DeviceID", STRING)
            .method(MethodDef::new("Reset").output("ReturnValue", UINT32)),
    )
}

// ============================================================================
// Processes
// ============================================================================

fn processes(repo: &Repository) -> ProviderResult<()> {
    repo.add_class(
        CIMV2,
        ClassDef::new("CIM_Process")
            .superclass("CIM_LogicalElement")
            .key("Handle", STRING)
            .property("CreationDate", DATETIME)
            .method(
                MethodDef::new("Terminate")
                    .input("Reason", UINT32)
                    .handler(|call| {
                        if call.target().is_none() {
                            return Err(instance_required("Terminate"));
                        }
                        call.delete_target();
                        Ok(())
                    }),
            ),
    )?;

    let pids = Arc::new(AtomicU32::new(FIRST_PID));
    repo.add_class(
        CIMV2,
        ClassDef::new("Win32_Process")
            .superclass("CIM_Process")
            .property("ProcessId", UINT32)
            .property("ParentProcessId", UINT32)
            .property("CommandLine", STRING)
            .property("ExecutablePath", STRING)
            .property("ThreadCount", UINT32)
            .property("WorkingSetSize", UINT64)
            .method(
                MethodDef::new("Create")
                    .input("CommandLine", STRING)
                    .input("CurrentDirectory", STRING)
                    .input("ProcessStartupInformation", OBJECT)
                    .output("ProcessId", UINT32)
                    .output("ReturnValue", UINT32)
                    .handler(move |call| create_process(call, &pids)),
            )
            .method(
                MethodDef::new("GetOwner")
                    .output("Domain", STRING)
                    .output("User", STRING)
                    .output("ReturnValue", UINT32)
                    .handler(get_owner),
            ),
    )?;

    repo.add_class(
        CIMV2,
        ClassDef::new("Win32_ProcessStartup")
            .property("CreateFlags", UINT32)
            .property("EnvironmentVariables", STRINGS)
            .property("PriorityClass", UINT32)
            .property("ShowWindow", UINT16)
            .property("Title", STRING),
    )?;

    for (pid, name, threads) in [
        (0u32, "System Idle Process", 8u32),
        (4, "System", 226),
        (1234, "explorer.exe", 74),
    ] {
        let mut values: Vec<(&str, StoredValue)> = vec![
            ("Handle", pid.to_string().into()),
            ("ProcessId", pid.into()),
            ("Name", name.into()),
            ("Caption", name.into()),
            ("ThreadCount", threads.into()),
            ("CreationDate", "20261015081200.000000+000".into()),
        ];
        if pid == 1234 {
            values.push(("ParentProcessId", 4u32.into()));
            values.push(("ExecutablePath", "C:\\Windows\\explorer.exe".into()));
            values.push(("CommandLine", "C:\\Windows\\Explorer.EXE".into()));
        }
        repo.add_instance(CIMV2, "Win32_Process", values)?;
    }
    Ok(())
}

fn instance_required(method: &str) -> ProviderError {
    ProviderError::new(
        Status::INVALID_PARAMETER,
        format!("'{}' must be invoked on an instance", method),
    )
}

/// Image name of a command line: its first token without directories.
fn image_name(command: &str) -> String {
    let command = command.trim();
    let first = match command.strip_prefix('"') {
        Some(rest) => rest.split('"').next().unwrap_or(rest),
        None => command.split_whitespace().next().unwrap_or(command),
    };
    first
        .rsplit(['\\', '/'])
        .next()
        .unwrap_or(first)
        .to_string()
}

fn create_process(call: &mut MethodCall<'_>, pids: &AtomicU32) -> ProviderResult<()> {
    let Some(command) = call.arg_str("CommandLine").map(str::to_string) else {
        // Invalid parameter
        return call.set_output("ReturnValue", 21u32);
    };

    let pid = pids.fetch_add(4, Ordering::Relaxed);
    let name = image_name(&command);
    call.create_instance(
        "Win32_Process",
        vec![
            ("Handle", pid.to_string().into()),
            ("ProcessId", pid.into()),
            ("ParentProcessId", 1234u32.into()),
            ("Name", name.as_str().into()),
            ("Caption", name.as_str().into()),
            ("CommandLine", command.into()),
            ("ThreadCount", 1u32.into()),
        ],
    )?;
    tracing::debug!(pid, image = %name, "created process");

    call.set_output("ProcessId", pid)?;
    call.set_output("ReturnValue", 0u32)
}

fn get_owner(call: &mut MethodCall<'_>) -> ProviderResult<()> {
    let pid = call
        .target()
        .ok_or_else(|| instance_required("GetOwner"))?
        .get("ProcessId")
        .and_then(Variant::integer);

    let (domain, user) = match pid {
        Some(0) | Some(4) => ("NT AUTHORITY", "SYSTEM"),
        _ => ("WORKSTATION", "operator"),
    };
    call.set_output("Domain", domain)?;
    call.set_output("User", user)?;
    call.set_output("ReturnValue", 0u32)
}

// ============================================================================
// Network adapters
// ============================================================================

fn network_adapters(repo: &Repository) -> ProviderResult<()> {
    repo.add_class(
        CIMV2,
        ClassDef::new("CIM_NetworkAdapter")
            .superclass("CIM_LogicalDevice")
            .property("PermanentAddress", STRING)
            .property("Speed", UINT64),
    )?;

    repo.add_class(
        CIMV2,
        ClassDef::new("Win32_NetworkAdapter")
            .superclass("CIM_NetworkAdapter")
            .property("AdapterType", STRING)
            .property("InterfaceIndex", UINT32)
            .property("MACAddress", STRING)
            .property("Manufacturer", STRING)
            .property("NetConnectionID", STRING)
            .property("NetEnabled", BOOLEAN)
            .property("PhysicalAdapter", BOOLEAN)
            .method(
                MethodDef::new("Enable")
                    .output("ReturnValue", UINT32)
                    .handler(set_enabled(true)),
            )
            .method(
                MethodDef::new("Disable")
                    .output("ReturnValue", UINT32)
                    .handler(set_enabled(false)),
            ),
    )?;

    repo.add_instance(
        CIMV2,
        "Win32_NetworkAdapter",
        vec![
            ("DeviceID", "0".into()),
            ("Name", "Intel(R) Ethernet Connection I219-V".into()),
            ("InterfaceIndex", 7u32.into()),
            ("Manufacturer", "Intel Corporation".into()),
            ("MACAddress", "3C:52:82:1A:9F:04".into()),
            ("AdapterType", "Ethernet 802.3".into()),
            ("NetConnectionID", "Ethernet".into()),
            ("NetEnabled", true.into()),
            ("PhysicalAdapter", true.into()),
            ("Speed", 1_000_000_000u64.into()),
        ],
    )?;
    repo.add_instance(
        CIMV2,
        "Win32_NetworkAdapter",
        vec![
            ("DeviceID", "1".into()),
            ("Name", "Microsoft Kernel Debug Network Adapter".into()),
            ("InterfaceIndex", 12u32.into()),
            ("Manufacturer", "Microsoft".into()),
            ("NetEnabled", false.into()),
            ("PhysicalAdapter", false.into()),
        ],
    )
}

/// `Enable`/`Disable` on a network adapter instance
fn set_enabled(
    enabled: bool,
) -> impl Fn(&mut MethodCall<'_>) -> ProviderResult<()> + Send + Sync + 'static {
    move |call| {
        let method = if enabled { "Enable" } else { "Disable" };
        let target = call.target_mut().ok_or_else(|| instance_required(method))?;
        target.set("NetEnabled", Variant::Bool(enabled))?;
        call.set_output("ReturnValue", 0u32)
    }
}

// ============================================================================
// Computer system and operating system
// ============================================================================

fn computer(repo: &Repository) -> ProviderResult<()> {
    repo.add_class(
        CIMV2,
        ClassDef::new("Win32_ComputerSystem")
            .superclass("CIM_LogicalElement")
            .key("Name", STRING)
            .property("Domain", STRING)
            .property("Manufacturer", STRING)
            .property("Model", STRING)
            .property("NumberOfLogicalProcessors", UINT32)
            .property("NumberOfProcessors", UINT32)
            .property("PartOfDomain", BOOLEAN)
            .property("SystemType", STRING)
            .property("TotalPhysicalMemory", UINT64)
            .property("UserName", STRING),
    )?;
    repo.add_instance(
        CIMV2,
        "Win32_ComputerSystem",
        vec![
            ("Name", "WORKSTATION".into()),
            ("Caption", "WORKSTATION".into()),
            ("Domain", "WORKGROUP".into()),
            ("Manufacturer", "Contoso".into()),
            ("Model", "Virtual Machine".into()),
            ("NumberOfLogicalProcessors", 8u32.into()),
            ("NumberOfProcessors", 1u32.into()),
            ("PartOfDomain", false.into()),
            ("SystemType", "x64-based PC".into()),
            ("TotalPhysicalMemory", 17_179_869_184u64.into()),
            ("UserName", "WORKSTATION\\operator".into()),
        ],
    )?;

    repo.add_class(
        CIMV2,
        ClassDef::new("Win32_OperatingSystem")
            .superclass("CIM_LogicalElement")
            .singleton()
            .property("BuildNumber", STRING)
            .property("CSName", STRING)
            .property("FreePhysicalMemory", UINT64)
            .property("LastBootUpTime", DATETIME)
            .property("NumberOfProcesses", UINT32)
            .property("OSArchitecture", STRING)
            .property("Version", STRING),
    )?;
    repo.add_instance(
        CIMV2,
        "Win32_OperatingSystem",
        vec![
            ("Caption", "Microsoft Windows 11 Pro".into()),
            ("Name", "Microsoft Windows 11 Pro|C:\\Windows|\\Device\\Harddisk0\\Partition3".into()),
            ("BuildNumber", "22631".into()),
            ("CSName", "WORKSTATION".into()),
            ("FreePhysicalMemory", 9_437_184u64.into()),
            ("LastBootUpTime", "20261015080000.500000+000".into()),
            ("NumberOfProcesses", 3u32.into()),
            ("OSArchitecture", "64-bit".into()),
            ("Version", "10.0.22631".into()),
        ],
    )
}

// ============================================================================
// Files
// ============================================================================

fn files(repo: &Repository) -> ProviderResult<()> {
    repo.add_class(
        CIMV2,
        ClassDef::new("CIM_LogicalFile")
            .superclass("CIM_LogicalElement")
            .key("Name", STRING)
            .property("Drive", STRING)
            .property("Path", STRING)
            .property("FileName", STRING)
            .property("Extension", STRING)
            .property("FileSize", UINT64)
            .property("LastModified", DATETIME)
            .property("Hidden", BOOLEAN)
            .property("Readable", BOOLEAN),
    )?;
    repo.add_class(
        CIMV2,
        ClassDef::new("CIM_DataFile").superclass("CIM_LogicalFile"),
    )?;

    for (path, name, ext, size, hidden) in [
        ("\\", "bootmgr", "", 413_738u64, true),
        ("\\", "pagefile", "sys", 4_831_838_208, true),
        ("\\", "readme", "txt", 1_024, false),
        ("\\windows\\", "notepad", "exe", 360_448, false),
    ] {
        let file = if ext.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", name, ext)
        };
        let full = format!("c:{}{}", path, file);
        repo.add_instance(
            CIMV2,
            "CIM_DataFile",
            vec![
                ("Name", full.as_str().into()),
                ("Caption", full.as_str().into()),
                ("Drive", "c:".into()),
                ("Path", path.into()),
                ("FileName", name.into()),
                ("Extension", ext.into()),
                ("FileSize", size.into()),
                ("LastModified", "20260911103000.000000+000".into()),
                ("Hidden", hidden.into()),
                ("Readable", true.into()),
            ],
        )?;
    }
    Ok(())
}

// ============================================================================
// Type sample
// ============================================================================

/// One property per value kind, for conversion tests
fn type_sample(repo: &Repository) -> ProviderResult<()> {
    let scalar = PropertyType::scalar;
    repo.add_class(
        CIMV2,
        ClassDef::new("Wmi_TypeSample")
            .key("Id", STRING)
            .property("S8", scalar(CimType::Sint8))
            .property("U8", scalar(CimType::Uint8))
            .property("S16", scalar(CimType::Sint16))
            .property("U16", UINT16)
            .property("S32", scalar(CimType::Sint32))
            .property("U32", UINT32)
            .property("S64", scalar(CimType::Sint64))
            .property("U64", UINT64)
            .property("R32", scalar(CimType::Real32))
            .property("R64", scalar(CimType::Real64))
            .property("Flag", BOOLEAN)
            .property("Text", STRING)
            .property("When", DATETIME)
            .property("Blob", BYTES)
            .property("Names", STRINGS)
            .property("Numbers", PropertyType::array(CimType::Uint32))
            .property("Nested", OBJECT),
    )
}

// ============================================================================
// Registry
// ============================================================================

/// Registry contents behind `StdRegProv`
#[derive(Debug, Default)]
struct RegistryStore {
    /// Keyed by hive and lowercase path
    keys: BTreeMap<(u32, String), StoredKey>,
}

#[derive(Debug, Default)]
struct StoredKey {
    path: String,
    values: Vec<(String, RegistryData)>,
}

fn key_id(hive: u32, path: &str) -> (u32, String) {
    (hive, path.trim_matches('\\').to_lowercase())
}

impl RegistryStore {
    fn exists(&self, hive: u32, path: &str) -> bool {
        let id = key_id(hive, path);
        id.1.is_empty() || self.keys.contains_key(&id)
    }

    fn create_key(&mut self, hive: u32, path: &str) {
        let mut current = String::new();
        for part in path.split('\\').filter(|p| !p.is_empty()) {
            if !current.is_empty() {
                current.push('\\');
            }
            current.push_str(part);
            self.keys
                .entry(key_id(hive, &current))
                .or_insert_with(|| StoredKey {
                    path: current.clone(),
                    values: Vec::new(),
                });
        }
    }

    fn subkeys(&self, hive: u32, path: &str) -> Option<Vec<String>> {
        if !self.exists(hive, path) {
            return None;
        }
        let (_, parent) = key_id(hive, path);
        let depth = if parent.is_empty() {
            0
        } else {
            parent.matches('\\').count() + 1
        };
        let names = self
            .keys
            .iter()
            .filter(|((h, p), _)| {
                *h == hive
                    && p.matches('\\').count() == depth
                    && (parent.is_empty() || p.starts_with(&format!("{}\\", parent)))
            })
            .filter_map(|(_, key)| key.path.rsplit('\\').next().map(str::to_string))
            .collect();
        Some(names)
    }

    fn values(&self, hive: u32, path: &str) -> Option<&[(String, RegistryData)]> {
        if key_id(hive, path).1.is_empty() {
            return Some(&[]);
        }
        self.keys.get(&key_id(hive, path)).map(|k| k.values.as_slice())
    }

    fn value(&self, hive: u32, path: &str, name: &str) -> Option<&RegistryData> {
        self.values(hive, path)?
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, data)| data)
    }

    /// Returns false when the key does not exist
    fn set_value(&mut self, hive: u32, path: &str, name: &str, data: RegistryData) -> bool {
        let Some(key) = self.keys.get_mut(&key_id(hive, path)) else {
            return false;
        };
        match key.values.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some((_, existing)) => *existing = data,
            None => key.values.push((name.to_string(), data)),
        }
        true
    }
}

fn seed_registry() -> RegistryStore {
    let mut store = RegistryStore::default();
    let hklm = HKEY_LOCAL_MACHINE;

    for (hive, path) in [
        (hklm, "HARDWARE\\DESCRIPTION\\System"),
        (hklm, "SOFTWARE\\Classes"),
        (hklm, "SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion"),
        (hklm, "SOFTWARE\\Policies"),
        (hklm, "SYSTEM\\CurrentControlSet\\Control\\IntegrityServices"),
        (hklm, "SYSTEM\\CurrentControlSet\\Services"),
        (HKEY_CLASSES_ROOT, ".txt"),
        (HKEY_CURRENT_USER, "Software\\Microsoft"),
        (HKEY_USERS, ".DEFAULT\\Software"),
    ] {
        store.create_key(hive, path);
    }

    let current_version = "SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion";
    for (name, data) in [
        ("ProductName", RegistryData::String("Windows 11 Pro".into())),
        ("CurrentBuild", RegistryData::String("22631".into())),
        ("SystemRoot", RegistryData::String("C:\\Windows".into())),
        ("PathName", RegistryData::ExpandString("%SystemRoot%".into())),
        ("CurrentMajorVersionNumber", RegistryData::Dword(10)),
        ("InstallTime", RegistryData::Qword(133_721_568_000_000_000)),
        (
            "DigitalProductId",
            RegistryData::Binary((0u8..48).map(|b| b.wrapping_mul(37)).collect()),
        ),
    ] {
        store.set_value(hklm, current_version, name, data);
    }

    let control = "SYSTEM\\CurrentControlSet\\Control";
    for (name, data) in [
        ("CurrentUser", RegistryData::String("USERNAME".into())),
        (
            "SystemBootDevice",
            RegistryData::String("multi(0)disk(0)rdisk(0)partition(3)".into()),
        ),
        (
            "SystemStartOptions",
            RegistryData::String(" NOEXECUTE=OPTIN".into()),
        ),
        ("WaitToKillServiceTimeout", RegistryData::String("5000".into())),
        ("BootDriverFlags", RegistryData::Dword(0)),
        (
            "PreshutdownOrder",
            RegistryData::MultiString(vec![
                "DeviceInstall".into(),
                "UsoSvc".into(),
                "gpsvc".into(),
            ]),
        ),
        ("FirmwareBootDevice", RegistryData::ExpandString("%SystemDrive%".into())),
    ] {
        store.set_value(hklm, control, name, data);
    }

    store.set_value(
        hklm,
        "SYSTEM\\CurrentControlSet\\Control\\IntegrityServices",
        "WBCL",
        RegistryData::Binary((0u8..64).collect()),
    );
    store.set_value(
        HKEY_CLASSES_ROOT,
        ".txt",
        "",
        RegistryData::String("txtfile".into()),
    );
    store
}

type SharedRegistry = Arc<Mutex<RegistryStore>>;

/// Hive and key path inputs; the hive defaults to `HKEY_LOCAL_MACHINE`
fn key_args(call: &MethodCall<'_>) -> (u32, String) {
    (
        call.arg_u32("hDefKey").unwrap_or(HKEY_LOCAL_MACHINE),
        call.arg_str("sSubKeyName").unwrap_or("").to_string(),
    )
}

/// `ReturnValue` for a missing key or value
const NOT_FOUND: u32 = 2;
/// `ReturnValue` for a value of another type
const WRONG_TYPE: u32 = 1;

fn registry_method(name: &str) -> MethodDef {
    MethodDef::new(name)
        .input("hDefKey", UINT32)
        .input("sSubKeyName", STRING)
}

fn get_value_method(
    name: &str,
    ty: RegType,
    output: (&str, PropertyType),
    registry: &SharedRegistry,
) -> MethodDef {
    let registry = Arc::clone(registry);
    let out_name = output.0.to_string();
    registry_method(name)
        .input("sValueName", STRING)
        .output(output.0, output.1)
        .output("ReturnValue", UINT32)
        .handler(move |call| {
            let (hive, key) = key_args(call);
            let value_name = call.arg_str("sValueName").unwrap_or("").to_string();
            let found = registry.lock().value(hive, &key, &value_name).cloned();
            match found {
                Some(data) if data.reg_type() == ty => {
                    call.set_output(&out_name, data.to_variant::<Box<super::ObjectData>>())?;
                    call.set_output("ReturnValue", 0u32)
                }
                Some(_) => call.set_output("ReturnValue", WRONG_TYPE),
                None => call.set_output("ReturnValue", NOT_FOUND),
            }
        })
}

fn std_reg_prov(registry: &SharedRegistry) -> ClassDef {
    let enum_key = {
        let registry = Arc::clone(registry);
        registry_method("EnumKey")
            .output("sNames", STRINGS)
            .output("ReturnValue", UINT32)
            .handler(move |call| {
                let (hive, key) = key_args(call);
                let names = registry.lock().subkeys(hive, &key);
                match names {
                    Some(names) => {
                        call.set_output("sNames", names)?;
                        call.set_output("ReturnValue", 0u32)
                    }
                    None => call.set_output("ReturnValue", NOT_FOUND),
                }
            })
    };

    let enum_values = {
        let registry = Arc::clone(registry);
        registry_method("EnumValues")
            .output("sNames", STRINGS)
            .output("Types", SINT32S)
            .output("ReturnValue", UINT32)
            .handler(move |call| {
                let (hive, key) = key_args(call);
                let listed = registry.lock().values(hive, &key).map(|values| {
                    let names: Vec<String> = values.iter().map(|(n, _)| n.clone()).collect();
                    let types: Vec<StoredValue> = values
                        .iter()
                        .map(|(_, d)| Variant::I32(d.reg_type().code()))
                        .collect();
                    (names, types)
                });
                match listed {
                    Some((names, types)) => {
                        call.set_output("sNames", names)?;
                        call.set_output("Types", Variant::Array(CimType::Sint32, types))?;
                        call.set_output("ReturnValue", 0u32)
                    }
                    None => call.set_output("ReturnValue", NOT_FOUND),
                }
            })
    };

    let create_key = {
        let registry = Arc::clone(registry);
        registry_method("CreateKey")
            .output("ReturnValue", UINT32)
            .handler(move |call| {
                let (hive, key) = key_args(call);
                registry.lock().create_key(hive, &key);
                call.set_output("ReturnValue", 0u32)
            })
    };

    let set_string = {
        let registry = Arc::clone(registry);
        registry_method("SetStringValue")
            .input("sValueName", STRING)
            .input("sValue", STRING)
            .output("ReturnValue", UINT32)
            .handler(move |call| {
                let (hive, key) = key_args(call);
                let name = call.arg_str("sValueName").unwrap_or("").to_string();
                let data = RegistryData::String(call.arg_str("sValue").unwrap_or("").to_string());
                let stored = registry.lock().set_value(hive, &key, &name, data);
                call.set_output("ReturnValue", if stored { 0u32 } else { NOT_FOUND })
            })
    };

    let set_dword = {
        let registry = Arc::clone(registry);
        registry_method("SetDWORDValue")
            .input("sValueName", STRING)
            .input("uValue", UINT32)
            .output("ReturnValue", UINT32)
            .handler(move |call| {
                let (hive, key) = key_args(call);
                let name = call.arg_str("sValueName").unwrap_or("").to_string();
                let data = RegistryData::Dword(call.arg_u32("uValue").unwrap_or(0));
                let stored = registry.lock().set_value(hive, &key, &name, data);
                call.set_output("ReturnValue", if stored { 0u32 } else { NOT_FOUND })
            })
    };

    ClassDef::new("StdRegProv")
        .method(create_key)
        .method(enum_key)
        .method(enum_values)
        .method(get_value_method(
            "GetStringValue",
            RegType::String,
            ("sValue", STRING),
            registry,
        ))
        .method(get_value_method(
            "GetExpandedStringValue",
            RegType::ExpandString,
            ("sValue", STRING),
            registry,
        ))
        .method(get_value_method(
            "GetBinaryValue",
            RegType::Binary,
            ("uValue", BYTES),
            registry,
        ))
        .method(get_value_method(
            "GetDWORDValue",
            RegType::Dword,
            ("uValue", UINT32),
            registry,
        ))
        .method(get_value_method(
            "GetMultiStringValue",
            RegType::MultiString,
            ("sValue", STRINGS),
            registry,
        ))
        .method(get_value_method(
            "GetQWORDValue",
            RegType::Qword,
            ("uValue", UINT64),
            registry,
        ))
        .method(set_string)
        .method(set_dword)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_builds() {
        let repo = repository();
        assert_eq!(repo.instances(CIMV2, "Win32_Process").unwrap().len(), 3);
        assert_eq!(repo.instances(CIMV2, "CIM_LogicalElement").unwrap().len(), 11);
        assert!(repo.class_object(DEFAULT, "StdRegProv").is_ok());
    }

    #[test]
    fn test_image_name() {
        assert_eq!(image_name("notepad.exe"), "notepad.exe");
        assert_eq!(image_name("netstat.exe -anop tcp"), "netstat.exe");
        assert_eq!(
            image_name("\"C:\\Program Files\\Tool\\tool.exe\" --x"),
            "tool.exe"
        );
    }

    #[test]
    fn test_registry_subkeys() {
        let store = seed_registry();
        let mut roots = store.subkeys(HKEY_LOCAL_MACHINE, "").unwrap();
        roots.sort();
        assert_eq!(roots, vec!["HARDWARE", "SOFTWARE", "SYSTEM"]);
        assert_eq!(
            store.subkeys(HKEY_LOCAL_MACHINE, "software\\microsoft").unwrap(),
            vec!["Windows NT".to_string()]
        );
        assert!(store.subkeys(HKEY_LOCAL_MACHINE, "SOFTWARE\\Missing").is_none());
    }
}
