//! Text and JSON rendering of objects, methods and namespaces.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value as Json;
use wmi_core::{Instance, MethodSignature, Value, Variant};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

// ============================================================================
// Views
// ============================================================================

/// Printable snapshot of an object.
#[derive(Debug, Serialize)]
pub struct ObjectView {
    pub class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub properties: Vec<PropertyView>,
}

#[derive(Debug, Serialize)]
pub struct PropertyView {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub value: Json,
    #[serde(skip)]
    pub text: String,
}

impl ObjectView {
    /// Snapshot the declared (non-system) properties of `instance`.
    pub fn from_instance(instance: &Instance) -> Result<Self> {
        let mut properties = Vec::new();
        for property in instance.properties()? {
            if property.name.starts_with("__") {
                continue;
            }
            properties.push(PropertyView {
                ty: property.ty.to_string(),
                value: value_json(&property.value)?,
                text: property.value_as_string(),
                name: property.name,
            });
        }

        Ok(Self {
            class: instance.class_name()?,
            path: instance.relative_path()?,
            properties,
        })
    }
}

/// Method name with its parameters.
#[derive(Debug, Serialize)]
pub struct MethodView {
    pub name: String,
    pub inputs: Vec<ParameterView>,
    pub outputs: Vec<ParameterView>,
}

#[derive(Debug, Serialize)]
pub struct ParameterView {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl MethodView {
    pub fn new(name: &str, signature: &MethodSignature) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            inputs: parameters(signature.input.as_ref())?,
            outputs: parameters(signature.output.as_ref())?,
        })
    }
}

fn parameters(object: Option<&Instance>) -> Result<Vec<ParameterView>> {
    let Some(object) = object else {
        return Ok(Vec::new());
    };
    let mut params = Vec::new();
    for name in object.property_names()? {
        if name.starts_with("__") {
            continue;
        }
        let ty = object.property_type(&name)?.to_string();
        params.push(ParameterView { name, ty });
    }
    Ok(params)
}

/// JSON form of a value; embedded objects become nested object views.
pub fn value_json(value: &Value) -> Result<Json> {
    Ok(match value {
        Variant::Null => Json::Null,
        Variant::Bool(v) => Json::Bool(*v),
        Variant::I8(v) => Json::from(*v),
        Variant::U8(v) => Json::from(*v),
        Variant::I16(v) => Json::from(*v),
        Variant::U16(v) => Json::from(*v),
        Variant::I32(v) => Json::from(*v),
        Variant::U32(v) => Json::from(*v),
        Variant::I64(v) => Json::from(*v),
        Variant::U64(v) => Json::from(*v),
        Variant::F32(v) => Json::from(*v as f64),
        Variant::F64(v) => Json::from(*v),
        Variant::String(s) => Json::String(s.clone()),
        Variant::Bytes(bytes) => Json::Array(bytes.iter().map(|b| Json::from(*b)).collect()),
        Variant::Object(inner) => serde_json::to_value(ObjectView::from_instance(inner)?)?,
        Variant::Array(_, items) => Json::Array(
            items
                .iter()
                .map(value_json)
                .collect::<Result<Vec<_>>>()?,
        ),
    })
}

// ============================================================================
// Printer
// ============================================================================

/// Writes views in the selected format.
pub struct Output<W: Write> {
    format: Format,
    out: W,
}

impl<W: Write> Output<W> {
    pub fn new(format: Format, out: W) -> Self {
        Self { format, out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn objects(&mut self, objects: &[ObjectView]) -> Result<()> {
        if self.format == Format::Json {
            return self.json(objects);
        }

        for (i, object) in objects.iter().enumerate() {
            if i > 0 {
                writeln!(self.out)?;
            }
            writeln!(self.out, "{}", object.path.as_deref().unwrap_or(&object.class))?;
            let width = object
                .properties
                .iter()
                .map(|p| p.name.len())
                .max()
                .unwrap_or(0);
            for property in &object.properties {
                writeln!(self.out, "  {:<width$} = {}", property.name, property.text)?;
            }
        }
        Ok(())
    }

    pub fn methods(&mut self, methods: &[MethodView]) -> Result<()> {
        if self.format == Format::Json {
            return self.json(methods);
        }

        for method in methods {
            let inputs: Vec<String> = method
                .inputs
                .iter()
                .map(|p| format!("{}: {}", p.name, p.ty))
                .collect();
            write!(self.out, "{}({})", method.name, inputs.join(", "))?;
            if !method.outputs.is_empty() {
                let outputs: Vec<String> = method
                    .outputs
                    .iter()
                    .map(|p| format!("{}: {}", p.name, p.ty))
                    .collect();
                write!(self.out, " -> {}", outputs.join(", "))?;
            }
            writeln!(self.out)?;
        }
        Ok(())
    }

    pub fn names(&mut self, names: &[String]) -> Result<()> {
        if self.format == Format::Json {
            return self.json(names);
        }
        for name in names {
            writeln!(self.out, "{}", name)?;
        }
        Ok(())
    }

    fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.out, value)?;
        writeln!(self.out)?;
        Ok(())
    }
}
