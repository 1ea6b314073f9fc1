//! `wmiq get` - Show one object by path.

use std::io::Write;

use anyhow::Result;
use wmi_core::Service;

use crate::output::{ObjectView, Output};

pub fn execute<W: Write>(service: &Service, path: &str, out: &mut Output<W>) -> Result<()> {
    let object = service.get_object(path)?;
    out.objects(&[ObjectView::from_instance(&object)?])
}
