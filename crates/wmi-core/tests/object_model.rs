//! Integration tests for the object model over the in-memory repository.
//!
//! Tests cover:
//! - Mapping query results into derived records
//! - Method invocation (static and instance methods, embedded inputs)
//! - Registry access through StdRegProv
//! - Type checking on property writes
//! - Sharing one repository between threads

use std::rc::Rc;
use std::thread;

use wmi_core::registry::{RegType, Registry, HKEY_LOCAL_MACHINE};
use wmi_core::repository::sample;
use wmi_core::{
    CimType, MemoryProvider, Provider, Record, Repository, Service, Variant, WmiError, ROOT_CIMV2,
};

#[derive(Debug, Default, PartialEq, Record)]
#[wmi(class = "Win32_NetworkAdapter")]
struct NetworkAdapter {
    name: String,
    interface_index: Option<u32>,
    manufacturer: Option<String>,
    #[wmi(rename = "MACAddress")]
    mac: Option<String>,
    #[wmi(skip)]
    selected: bool,
}

#[derive(Debug, Default, Record)]
struct ProcessRow {
    process_id: u32,
    command_line: Option<String>,
}

fn cimv2() -> Service {
    Service::connect(sample::provider(), ROOT_CIMV2).expect("connect failed")
}

// ────────────────────────────────────────────────────────────────────────────
// Mapping
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_network_adapter_query() {
    let service = cimv2();
    let mut adapters: Vec<NetworkAdapter> = Vec::new();
    service
        .query("SELECT * FROM Win32_NetworkAdapter", &mut adapters)
        .expect("query failed");

    assert_eq!(adapters.len(), 2);
    for adapter in &adapters {
        assert!(!adapter.name.is_empty());
        assert!(adapter.interface_index.is_some());
        assert!(!adapter.selected);
    }
    assert_eq!(adapters.iter().filter(|a| a.mac.is_some()).count(), 1);
}

#[test]
fn test_like_character_sets() {
    let service = cimv2();
    let mut rows: Vec<ProcessRow> = Vec::new();
    service
        .query("SELECT * FROM Win32_Process WHERE Name LIKE '[a-z]%'", &mut rows)
        .expect("query failed");
    assert_eq!(rows.len(), 3);

    let mut rows: Vec<ProcessRow> = Vec::new();
    service
        .query("SELECT * FROM Win32_Process WHERE Name LIKE '[^s]%'", &mut rows)
        .expect("query failed");
    assert_eq!(rows.len(), 1);

    let err = service
        .exec_query("SELECT * FROM Win32_Process WHERE Name LIKE '[a-z'")
        .unwrap_err();
    assert!(matches!(err, WmiError::QueryExecution { .. }));
}

#[test]
fn test_declared_class_enumeration_matches_query() {
    let service = cimv2();
    let mut from_query: Vec<NetworkAdapter> = Vec::new();
    service
        .query("SELECT * FROM Win32_NetworkAdapter", &mut from_query)
        .unwrap();
    let from_class: Vec<NetworkAdapter> = service.instances().unwrap();
    assert_eq!(from_query, from_class);
}

#[test]
fn test_projection_maps_into_full_record() {
    let service = cimv2();
    let mut adapters: Vec<NetworkAdapter> = Vec::new();
    service
        .query(
            "SELECT Name FROM Win32_NetworkAdapter WHERE InterfaceIndex > 10",
            &mut adapters,
        )
        .unwrap();
    assert_eq!(adapters.len(), 1);
    assert_eq!(adapters[0].name, "Microsoft Kernel Debug Network Adapter");
    assert_eq!(adapters[0].interface_index, None);
}

#[test]
fn test_undeclared_class_is_unsupported() {
    let service = cimv2();
    let err = service.instances::<ProcessRow>().unwrap_err();
    assert!(matches!(err, WmiError::UnsupportedType(_)));
}

#[test]
fn test_write_record_into_spawned_instance() {
    let service = cimv2();
    let class = service.get_object("Win32_NetworkAdapter").unwrap();
    let blank = class.spawn_instance().unwrap();

    let adapter = NetworkAdapter {
        name: "Loopback".to_string(),
        interface_index: Some(1),
        manufacturer: None,
        mac: Some("00:00:00:00:00:00".to_string()),
        selected: true,
    };
    wmi_core::write(&adapter, &blank).unwrap();

    let back: NetworkAdapter = wmi_core::populate(&blank).unwrap();
    assert_eq!(back.name, "Loopback");
    assert_eq!(back.interface_index, Some(1));
    assert_eq!(back.mac.as_deref(), Some("00:00:00:00:00:00"));
    assert!(!back.selected);
}

// ────────────────────────────────────────────────────────────────────────────
// Methods
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_create_and_terminate_process() {
    let service = cimv2();
    let startup_class = service.get_object("Win32_ProcessStartup").unwrap();
    let startup = startup_class.spawn_instance().unwrap();
    startup.put("ShowWindow", 1u16).unwrap();

    let mut pid = 0u32;
    let mut code = u32::MAX;
    service
        .begin_method("Win32_Process", "Create")
        .set("CommandLine", "notepad.exe C:\\readme.txt")
        .set("ProcessStartupInformation", &startup)
        .execute()
        .expect("Create failed")
        .get("ProcessId", &mut pid)
        .get("ReturnValue", &mut code)
        .end()
        .unwrap();
    assert_eq!(code, 0);
    assert!(pid >= 5000);

    let mut rows: Vec<ProcessRow> = Vec::new();
    service
        .query(
            &format!("SELECT * FROM Win32_Process WHERE ProcessId = {}", pid),
            &mut rows,
        )
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].command_line.as_deref(),
        Some("notepad.exe C:\\readme.txt")
    );

    let path = format!("Win32_Process.Handle=\"{}\"", pid);
    service
        .begin_method(&path, "Terminate")
        .set("Reason", 0u32)
        .execute()
        .expect("Terminate failed")
        .end()
        .unwrap();
    assert!(matches!(
        service.get_object(&path),
        Err(WmiError::ObjectNotFound { .. })
    ));
}

#[test]
fn test_instance_method_sees_target() {
    let service = cimv2();
    let explorer = service
        .get_object("Win32_Process.Handle=\"1234\"")
        .unwrap();

    let mut user = String::new();
    let mut domain = String::new();
    service
        .begin_method_on(&explorer, "Win32_Process.Handle=\"1234\"", "GetOwner")
        .execute()
        .unwrap()
        .get("User", &mut user)
        .get("Domain", &mut domain)
        .end()
        .unwrap();
    assert_eq!(user, "operator");
    assert_eq!(domain, "WORKSTATION");
}

#[test]
fn test_adapter_disable_writes_back() {
    let service = cimv2();
    let path = "Win32_NetworkAdapter.DeviceID=\"0\"";
    service
        .begin_method(path, "Disable")
        .execute()
        .unwrap()
        .end()
        .unwrap();

    let adapter = service.get_object(path).unwrap();
    assert!(!adapter.get_as::<bool>("NetEnabled").unwrap());
}

#[test]
fn test_unknown_method_is_method_not_found() {
    let service = cimv2();
    let mut exec = service.begin_method("StdRegProv", "NoSuchMethod");
    let err = exec.execute().unwrap_err();
    assert!(matches!(err, WmiError::MethodNotFound { ref name, .. } if name == "NoSuchMethod"));
    assert!(exec.end().is_err());
}

#[test]
fn test_enum_values_signature() {
    let service = cimv2();
    let registry = service.get_object("StdRegProv").unwrap();
    let signature = registry.method("EnumValues").unwrap();

    let input = signature.input.expect("EnumValues takes input");
    let mut inputs: Vec<String> = input
        .property_names()
        .unwrap()
        .into_iter()
        .filter(|name| !name.starts_with("__"))
        .collect();
    inputs.sort();
    assert_eq!(inputs, vec!["hDefKey", "sSubKeyName"]);

    let output = signature.output.expect("EnumValues has output");
    assert_eq!(
        output.property_type("Types").unwrap().base,
        CimType::Sint32
    );
    assert!(output.property_type("sNames").unwrap().is_array);
}

#[test]
fn test_registry_round_trip() {
    let service = cimv2();
    let registry = Registry::open(&service).unwrap();

    let key = "SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion";
    let values = registry.enum_values(HKEY_LOCAL_MACHINE, key).unwrap();
    let product = values
        .iter()
        .find(|v| v.name == "ProductName")
        .expect("ProductName listed");
    assert_eq!(product.ty, RegType::String);

    let data = registry
        .get_value(HKEY_LOCAL_MACHINE, key, RegType::String, "ProductName")
        .unwrap();
    assert_eq!(data.to_string(), "Windows 11 Pro");
}

// ────────────────────────────────────────────────────────────────────────────
// Property writes
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_out_of_range_put_keeps_value() {
    let service = cimv2();
    let adapter = service
        .get_object("Win32_NetworkAdapter.DeviceID=\"0\"")
        .unwrap();

    let err = adapter.put("InterfaceIndex", -1i64).unwrap_err();
    assert!(matches!(err, WmiError::TypeMismatch { .. }));
    assert_eq!(adapter.get_as::<u32>("InterfaceIndex").unwrap(), 7);

    adapter.put("InterfaceIndex", 9i64).unwrap();
    assert_eq!(adapter.get("InterfaceIndex").unwrap().value, Variant::U32(9));
}

#[test]
fn test_empty_enum() {
    let service = cimv2();
    let mut rows = service
        .exec_query("SELECT * FROM Win32_Process WHERE ProcessId = 99999")
        .unwrap();
    assert!(rows.next().is_none());
    assert!(rows.next().is_none());
    assert!(rows.is_exhausted());
}

// ────────────────────────────────────────────────────────────────────────────
// Threads
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_threads_share_repository() {
    let repo: Repository = sample::repository();

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let repo = repo.clone();
            thread::spawn(move || {
                let provider: Rc<dyn Provider> = Rc::new(MemoryProvider::new(repo));
                let service = Service::connect(provider, ROOT_CIMV2).unwrap();
                let mut pid = 0u32;
                service
                    .begin_method("Win32_Process", "Create")
                    .set("CommandLine", format!("worker{}.exe", i))
                    .execute()
                    .unwrap()
                    .get("ProcessId", &mut pid)
                    .end()
                    .unwrap();
                pid
            })
        })
        .collect();

    let mut pids: Vec<u32> = workers.into_iter().map(|w| w.join().unwrap()).collect();
    pids.sort();
    pids.dedup();
    assert_eq!(pids.len(), 4);

    let service = Service::connect(Rc::new(MemoryProvider::new(repo)), ROOT_CIMV2).unwrap();
    let count = service
        .exec_query("SELECT * FROM Win32_Process WHERE Name LIKE 'worker%'")
        .unwrap()
        .count();
    assert_eq!(count, 4);
}
