//! `wmiq methods` - List the methods of a class with their parameters.

use std::io::Write;

use anyhow::Result;
use wmi_core::Service;

use crate::output::{MethodView, Output};

pub fn execute<W: Write>(service: &Service, path: &str, out: &mut Output<W>) -> Result<()> {
    let object = service.get_object(path)?;
    let mut views = Vec::new();
    for name in object.methods()? {
        let signature = object.method(&name)?;
        views.push(MethodView::new(&name, &signature)?);
    }
    out.methods(&views)
}
