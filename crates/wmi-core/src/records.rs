//! Common records for frequently queried classes
//!
//! Fields are optional wherever a provider may leave the property NULL.

use crate::Record;

/// `Win32_ComputerSystem`
#[derive(Debug, Clone, Default, PartialEq, Record)]
#[wmi(class = "Win32_ComputerSystem")]
pub struct Win32ComputerSystem {
    pub name: String,
    pub domain: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub number_of_processors: Option<u32>,
    pub number_of_logical_processors: Option<u32>,
    pub total_physical_memory: Option<u64>,
    pub system_type: Option<String>,
    pub part_of_domain: Option<bool>,
    pub user_name: Option<String>,
}

/// `Win32_NetworkAdapter`
#[derive(Debug, Clone, Default, PartialEq, Record)]
#[wmi(class = "Win32_NetworkAdapter")]
pub struct Win32NetworkAdapter {
    #[wmi(rename = "DeviceID")]
    pub device_id: String,
    pub name: Option<String>,
    pub interface_index: Option<u32>,
    pub manufacturer: Option<String>,
    #[wmi(rename = "MACAddress")]
    pub mac_address: Option<String>,
    pub adapter_type: Option<String>,
    #[wmi(rename = "NetConnectionID")]
    pub net_connection_id: Option<String>,
    pub net_enabled: Option<bool>,
    pub physical_adapter: Option<bool>,
    pub speed: Option<u64>,
}

/// `CIM_DataFile`
#[derive(Debug, Clone, Default, PartialEq, Record)]
#[wmi(class = "CIM_DataFile")]
pub struct CimDataFile {
    pub name: String,
    pub drive: Option<String>,
    pub path: Option<String>,
    pub file_name: Option<String>,
    pub extension: Option<String>,
    pub file_size: Option<u64>,
    /// DMTF datetime
    pub last_modified: Option<String>,
    pub hidden: Option<bool>,
}

/// A child namespace (`__NAMESPACE`)
#[derive(Debug, Clone, Default, PartialEq, Record)]
#[wmi(class = "__NAMESPACE")]
pub struct Namespace {
    pub name: String,
}

/// `Win32_OperatingSystem`
#[derive(Debug, Clone, Default, PartialEq, Record)]
#[wmi(class = "Win32_OperatingSystem")]
pub struct Win32OperatingSystem {
    pub caption: Option<String>,
    pub version: Option<String>,
    pub build_number: Option<String>,
    #[wmi(rename = "OSArchitecture")]
    pub os_architecture: Option<String>,
    #[wmi(rename = "CSName")]
    pub cs_name: Option<String>,
    pub free_physical_memory: Option<u64>,
    pub number_of_processes: Option<u32>,
    pub last_boot_up_time: Option<String>,
}

/// `Win32_Process`
#[derive(Debug, Clone, Default, PartialEq, Record)]
#[wmi(class = "Win32_Process")]
pub struct Win32Process {
    pub handle: String,
    pub name: Option<String>,
    pub process_id: u32,
    pub parent_process_id: Option<u32>,
    pub command_line: Option<String>,
    pub executable_path: Option<String>,
    pub thread_count: Option<u32>,
}
