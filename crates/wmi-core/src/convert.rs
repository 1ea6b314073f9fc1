//! Conversion between dynamic values and Rust types.
//!
//! [`FromValue`] and [`ToValue`] are the two directions of the value
//! converter. [`coerce`] narrows a value to a property's declared type before
//! it is written, so an out-of-range integer is rejected instead of truncated.
//!
//! Null converts only into `Option<T>`; a non-optional target rejects it.
//! Embedded objects convert only into [`Instance`].

use crate::error::{WmiError, WmiResult};
use crate::instance::{Instance, Value};
use crate::value::{CimType, PropertyType, Variant};

// ============================================================================
// Conversion traits
// ============================================================================

/// Convert a dynamic value into a Rust type.
pub trait FromValue: Sized {
    /// Convert, returning `TypeMismatch` if the value cannot be represented.
    fn from_value(value: Value) -> WmiResult<Self>;
}

/// Convert a Rust value into a dynamic value.
pub trait ToValue {
    /// CIM type produced by this Rust type (element type for arrays)
    const CIM_TYPE: CimType;

    /// Convert to a dynamic value.
    fn to_value(&self) -> WmiResult<Value>;

    /// Convert a slice of this type to an array value.
    ///
    /// `u8` overrides this to produce a byte sequence.
    fn slice_to_value(items: &[Self]) -> WmiResult<Value>
    where
        Self: Sized,
    {
        let values = items
            .iter()
            .map(ToValue::to_value)
            .collect::<WmiResult<Vec<_>>>()?;
        Ok(Variant::Array(Self::CIM_TYPE, values))
    }
}

// ============================================================================
// Integers
// ============================================================================

fn integer_from<T: TryFrom<i128>>(value: &Value, expected: &str) -> WmiResult<T> {
    match value.integer() {
        Some(n) => T::try_from(n).map_err(|_| {
            WmiError::type_mismatch(expected, format!("{} {} (out of range)", value.type_name(), n))
        }),
        None => Err(WmiError::type_mismatch(expected, value.type_name())),
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> WmiResult<Self> {
                    integer_from(&value, stringify!($ty))
                }
            }
        )*
    };
}

impl_from_integer!(i8, u8, i16, u16, i32, u32, i64, u64);

macro_rules! impl_to_integer {
    ($($ty:ty => $variant:ident, $cim:ident;)*) => {
        $(
            impl ToValue for $ty {
                const CIM_TYPE: CimType = CimType::$cim;

                fn to_value(&self) -> WmiResult<Value> {
                    Ok(Variant::$variant(*self))
                }
            }
        )*
    };
}

impl_to_integer! {
    i8 => I8, Sint8;
    i16 => I16, Sint16;
    u16 => U16, Uint16;
    i32 => I32, Sint32;
    u32 => U32, Uint32;
    i64 => I64, Sint64;
    u64 => U64, Uint64;
}

impl ToValue for u8 {
    const CIM_TYPE: CimType = CimType::Uint8;

    fn to_value(&self) -> WmiResult<Value> {
        Ok(Variant::U8(*self))
    }

    fn slice_to_value(items: &[Self]) -> WmiResult<Value> {
        Ok(Variant::Bytes(items.to_vec()))
    }
}

// ============================================================================
// Floats, booleans, strings
// ============================================================================

impl FromValue for f32 {
    fn from_value(value: Value) -> WmiResult<Self> {
        match value {
            Variant::F32(v) => Ok(v),
            Variant::F64(v) if (v as f32) as f64 == v || v.is_nan() => Ok(v as f32),
            other => Err(WmiError::type_mismatch("f32", other.type_name())),
        }
    }
}

impl ToValue for f32 {
    const CIM_TYPE: CimType = CimType::Real32;

    fn to_value(&self) -> WmiResult<Value> {
        Ok(Variant::F32(*self))
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> WmiResult<Self> {
        value
            .float()
            .ok_or_else(|| WmiError::type_mismatch("f64", value.type_name()))
    }
}

impl ToValue for f64 {
    const CIM_TYPE: CimType = CimType::Real64;

    fn to_value(&self) -> WmiResult<Value> {
        Ok(Variant::F64(*self))
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> WmiResult<Self> {
        match value {
            Variant::Bool(b) => Ok(b),
            other => Err(WmiError::type_mismatch("bool", other.type_name())),
        }
    }
}

impl ToValue for bool {
    const CIM_TYPE: CimType = CimType::Boolean;

    fn to_value(&self) -> WmiResult<Value> {
        Ok(Variant::Bool(*self))
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> WmiResult<Self> {
        match value {
            Variant::String(s) => Ok(s),
            other => Err(WmiError::type_mismatch("String", other.type_name())),
        }
    }
}

impl ToValue for String {
    const CIM_TYPE: CimType = CimType::String;

    fn to_value(&self) -> WmiResult<Value> {
        Ok(Variant::String(self.clone()))
    }
}

impl ToValue for str {
    const CIM_TYPE: CimType = CimType::String;

    fn to_value(&self) -> WmiResult<Value> {
        Ok(Variant::String(self.to_string()))
    }
}

// ============================================================================
// Containers
// ============================================================================

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> WmiResult<Self> {
        match value {
            Variant::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: ToValue> ToValue for Option<T> {
    const CIM_TYPE: CimType = T::CIM_TYPE;

    fn to_value(&self) -> WmiResult<Value> {
        match self {
            Some(v) => v.to_value(),
            None => Ok(Variant::Null),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> WmiResult<Self> {
        match value {
            Variant::Array(_, items) => items.into_iter().map(T::from_value).collect(),
            Variant::Bytes(bytes) => bytes
                .into_iter()
                .map(|b| T::from_value(Variant::U8(b)))
                .collect(),
            other => Err(WmiError::type_mismatch("array", other.type_name())),
        }
    }
}

impl<T: ToValue> ToValue for [T] {
    const CIM_TYPE: CimType = T::CIM_TYPE;

    fn to_value(&self) -> WmiResult<Value> {
        T::slice_to_value(self)
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    const CIM_TYPE: CimType = T::CIM_TYPE;

    fn to_value(&self) -> WmiResult<Value> {
        T::slice_to_value(self)
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    const CIM_TYPE: CimType = T::CIM_TYPE;

    fn to_value(&self) -> WmiResult<Value> {
        (**self).to_value()
    }
}

// ============================================================================
// Objects
// ============================================================================

impl FromValue for Instance {
    fn from_value(value: Value) -> WmiResult<Self> {
        match value {
            Variant::Object(instance) => Ok(instance),
            other => Err(WmiError::type_mismatch("object", other.type_name())),
        }
    }
}

impl ToValue for Instance {
    const CIM_TYPE: CimType = CimType::Object;

    fn to_value(&self) -> WmiResult<Value> {
        self.try_clone().map(Variant::Object)
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> WmiResult<Self> {
        Ok(value)
    }
}

// ============================================================================
// Coercion to a declared type
// ============================================================================

/// Narrow `value` to the declared property type.
///
/// Integers are range checked, byte sequences and `uint8` arrays are
/// interchangeable, and null is accepted for every type.
pub fn coerce<O>(value: Variant<O>, ty: PropertyType) -> WmiResult<Variant<O>> {
    if value.is_null() {
        return Ok(Variant::Null);
    }

    if !ty.is_array {
        return coerce_scalar(value, ty.base);
    }

    let items = match value {
        Variant::Bytes(bytes) if ty.base == CimType::Uint8 => return Ok(Variant::Bytes(bytes)),
        Variant::Bytes(bytes) => bytes.into_iter().map(Variant::U8).collect(),
        Variant::Array(_, items) => items,
        other => {
            return Err(WmiError::type_mismatch(
                ty.to_string(),
                other.type_name(),
            ))
        }
    };

    if ty.base == CimType::Uint8 {
        let bytes = items
            .into_iter()
            .map(|item| match coerce_scalar(item, CimType::Uint8)? {
                Variant::U8(b) => Ok(b),
                other => Err(WmiError::type_mismatch("uint8", other.type_name())),
            })
            .collect::<WmiResult<Vec<u8>>>()?;
        return Ok(Variant::Bytes(bytes));
    }

    let items = items
        .into_iter()
        .map(|item| coerce_scalar(item, ty.base))
        .collect::<WmiResult<Vec<_>>>()?;
    Ok(Variant::Array(ty.base, items))
}

fn coerce_scalar<O>(value: Variant<O>, base: CimType) -> WmiResult<Variant<O>> {
    let mismatch = |value: &Variant<O>| WmiError::type_mismatch(base.name(), value.type_name());

    let narrow = |value: &Variant<O>| -> WmiResult<i128> {
        let n = value.integer().ok_or_else(|| mismatch(value))?;
        let fits = match base {
            CimType::Sint8 => i8::try_from(n).is_ok(),
            CimType::Uint8 => u8::try_from(n).is_ok(),
            CimType::Sint16 => i16::try_from(n).is_ok(),
            CimType::Uint16 | CimType::Char16 => u16::try_from(n).is_ok(),
            CimType::Sint32 => i32::try_from(n).is_ok(),
            CimType::Uint32 => u32::try_from(n).is_ok(),
            CimType::Sint64 => i64::try_from(n).is_ok(),
            CimType::Uint64 => u64::try_from(n).is_ok(),
            _ => false,
        };
        if fits {
            Ok(n)
        } else {
            Err(WmiError::type_mismatch(
                base.name(),
                format!("{} {} (out of range)", value.type_name(), n),
            ))
        }
    };

    Ok(match base {
        CimType::Sint8 => Variant::I8(narrow(&value)? as i8),
        CimType::Uint8 => Variant::U8(narrow(&value)? as u8),
        CimType::Sint16 => Variant::I16(narrow(&value)? as i16),
        CimType::Uint16 | CimType::Char16 => Variant::U16(narrow(&value)? as u16),
        CimType::Sint32 => Variant::I32(narrow(&value)? as i32),
        CimType::Uint32 => Variant::U32(narrow(&value)? as u32),
        CimType::Sint64 => Variant::I64(narrow(&value)? as i64),
        CimType::Uint64 => Variant::U64(narrow(&value)? as u64),
        CimType::Real32 => match value {
            Variant::F32(v) => Variant::F32(v),
            Variant::F64(v) if (v as f32) as f64 == v || v.is_nan() => Variant::F32(v as f32),
            ref other => match other.integer() {
                Some(n) if (n as f32) as i128 == n => Variant::F32(n as f32),
                _ => return Err(mismatch(other)),
            },
        },
        CimType::Real64 => match value {
            Variant::F32(v) => Variant::F64(v as f64),
            Variant::F64(v) => Variant::F64(v),
            ref other => match other.integer() {
                Some(n) if (n as f64) as i128 == n => Variant::F64(n as f64),
                _ => return Err(mismatch(other)),
            },
        },
        CimType::Boolean => match value {
            Variant::Bool(b) => Variant::Bool(b),
            ref other => return Err(mismatch(other)),
        },
        CimType::String | CimType::Datetime | CimType::Reference => match value {
            Variant::String(s) => Variant::String(s),
            ref other => return Err(mismatch(other)),
        },
        CimType::Object => match value {
            Variant::Object(o) => Variant::Object(o),
            ref other => return Err(mismatch(other)),
        },
    })
}
