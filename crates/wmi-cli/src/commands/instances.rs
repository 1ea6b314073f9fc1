//! `wmiq instances` - List every instance of a class, subclasses included.

use std::io::Write;

use anyhow::Result;
use wmi_core::Service;

use crate::output::Output;

pub fn execute<W: Write>(service: &Service, class: &str, out: &mut Output<W>) -> Result<()> {
    let rows = service.create_instance_enum(class)?;
    super::print_rows(rows, out)
}
