//! `wmiq namespaces` - List child namespaces.

use std::io::Write;

use anyhow::Result;
use wmi_core::records::Namespace;
use wmi_core::Service;

use crate::output::Output;

pub fn execute<W: Write>(service: &Service, recursive: bool, out: &mut Output<W>) -> Result<()> {
    let mut names = Vec::new();
    collect(service, recursive, &mut names)?;
    out.names(&names)
}

fn collect(service: &Service, recursive: bool, names: &mut Vec<String>) -> Result<()> {
    let mut children: Vec<Namespace> = service.instances()?;
    children.sort_by_key(|ns| ns.name.to_lowercase());

    for child in children {
        names.push(format!("{}\\{}", service.namespace(), child.name));
        if recursive {
            let nested = service.open_namespace(&child.name)?;
            collect(&nested, true, names)?;
        }
    }
    Ok(())
}
