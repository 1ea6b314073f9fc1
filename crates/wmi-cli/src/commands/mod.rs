//! `wmiq` subcommands

pub mod call;
pub mod get;
pub mod instances;
pub mod methods;
pub mod namespaces;
pub mod query;

use std::io::Write;

use anyhow::Result;
use wmi_core::Enum;

use crate::output::{ObjectView, Output};

/// Print every row of a cursor.
fn print_rows<W: Write>(rows: Enum, out: &mut Output<W>) -> Result<()> {
    let mut views = Vec::new();
    for row in rows {
        views.push(ObjectView::from_instance(&row?)?);
    }
    tracing::debug!(rows = views.len(), "fetched rows");
    out.objects(&views)
}
