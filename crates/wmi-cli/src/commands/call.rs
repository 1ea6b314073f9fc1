//! `wmiq call` - Invoke a method with `NAME=VALUE` inputs.
//!
//! Values are parsed according to the declared parameter type. Integers may
//! be written in hex (`0x80000002`) and array items are separated by commas.

use std::io::Write;

use anyhow::{anyhow, bail, Context, Result};
use wmi_core::{CimType, PropertyType, Service, Value, Variant};

use crate::output::{ObjectView, Output};

pub fn execute<W: Write>(
    service: &Service,
    path: &str,
    method: &str,
    args: &[String],
    out: &mut Output<W>,
) -> Result<()> {
    let target = service.get_object(path)?;
    let signature = target.method(method)?;

    let mut inputs = Vec::with_capacity(args.len());
    for arg in args {
        let (name, text) = arg
            .split_once('=')
            .ok_or_else(|| anyhow!("expected NAME=VALUE, got '{}'", arg))?;
        let input = signature
            .input
            .as_ref()
            .ok_or_else(|| anyhow!("method '{}' takes no input", method))?;
        let ty = input.property_type(name)?;
        let value = parse_argument(text, ty)
            .with_context(|| format!("invalid value for {} ({})", name, ty))?;
        inputs.push((name, value));
    }

    let mut executor = service.begin_method_on(&target, path, method);
    for (name, value) in inputs {
        executor.set_value(name, value);
    }
    executor.execute()?;

    let view = match executor.output() {
        Some(output) => Some(ObjectView::from_instance(output)?),
        None => None,
    };
    executor.end()?;

    match view {
        Some(view) => out.objects(&[view]),
        None => Ok(()),
    }
}

/// Parse a command-line value as `ty`.
pub fn parse_argument(text: &str, ty: PropertyType) -> Result<Value> {
    if !ty.is_array {
        return parse_scalar(text, ty.base);
    }
    let items = text
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| parse_scalar(item, ty.base))
        .collect::<Result<Vec<_>>>()?;
    Ok(Variant::Array(ty.base, items))
}

fn parse_scalar(text: &str, base: CimType) -> Result<Value> {
    Ok(match base {
        CimType::Boolean => match text.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Variant::Bool(true),
            "false" | "0" | "no" => Variant::Bool(false),
            _ => bail!("'{}' is not a boolean", text),
        },
        CimType::Sint8
        | CimType::Uint8
        | CimType::Sint16
        | CimType::Uint16
        | CimType::Sint32
        | CimType::Uint32
        | CimType::Sint64
        | CimType::Uint64 => parse_integer(text)?,
        CimType::Real32 | CimType::Real64 => Variant::F64(
            text.parse()
                .with_context(|| format!("'{}' is not a number", text))?,
        ),
        CimType::String | CimType::Datetime | CimType::Reference | CimType::Char16 => {
            Variant::String(text.to_string())
        }
        CimType::Object => bail!("object parameters cannot be given on the command line"),
    })
}

/// Widest integer form; the declared type narrows it with a range check.
fn parse_integer(text: &str) -> Result<Value> {
    if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        let v = u64::from_str_radix(hex, 16)
            .with_context(|| format!("'{}' is not a hex integer", text))?;
        return Ok(Variant::U64(v));
    }
    if let Ok(v) = text.parse::<i64>() {
        return Ok(Variant::I64(v));
    }
    let v = text
        .parse::<u64>()
        .with_context(|| format!("'{}' is not an integer", text))?;
    Ok(Variant::U64(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalars() {
        let uint32 = PropertyType::scalar(CimType::Uint32);
        assert_eq!(parse_argument("7", uint32).unwrap(), Variant::I64(7));
        assert_eq!(
            parse_argument("0x80000002", uint32).unwrap(),
            Variant::U64(0x8000_0002)
        );
        assert!(parse_argument("seven", uint32).is_err());

        let boolean = PropertyType::scalar(CimType::Boolean);
        assert_eq!(parse_argument("TRUE", boolean).unwrap(), Variant::Bool(true));
        assert!(parse_argument("maybe", boolean).is_err());

        let string = PropertyType::scalar(CimType::String);
        assert_eq!(
            parse_argument("a=b", string).unwrap(),
            Variant::String("a=b".into())
        );
    }

    #[test]
    fn test_parse_arrays() {
        let names = PropertyType::array(CimType::String);
        assert_eq!(
            parse_argument("a, b,,c", names).unwrap(),
            Variant::from(vec!["a", "b", "c"])
        );

        let empty = parse_argument("", PropertyType::array(CimType::Uint32)).unwrap();
        assert_eq!(empty, Variant::Array(CimType::Uint32, Vec::new()));
    }

    #[test]
    fn test_object_rejected() {
        assert!(parse_argument("x", PropertyType::scalar(CimType::Object)).is_err());
    }
}
