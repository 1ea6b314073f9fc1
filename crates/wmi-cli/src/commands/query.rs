//! `wmiq query` - Run a WQL query.

use std::io::Write;

use anyhow::Result;
use wmi_core::Service;

use crate::output::Output;

pub fn execute<W: Write>(service: &Service, wql: &str, out: &mut Output<W>) -> Result<()> {
    let rows = service.exec_query(wql)?;
    super::print_rows(rows, out)
}
