//! Variant - the dynamic value model
//!
//! Every property value, method parameter and query literal is a [`Variant`].
//! The union is closed: one tag per CIM value kind, so conversions match
//! exhaustively.
//!
//! `Variant` is generic over the representation of embedded objects:
//!
//! ```text
//! Variant<Handle>           provider boundary (RawValue)
//! Variant<Instance>         host side (Value)
//! Variant<Box<ObjectData>>  inside the in-memory repository
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{WmiError, WmiResult};

// ============================================================================
// CIM types
// ============================================================================

/// Array flag OR-ed into a CIM type code
pub const CIM_FLAG_ARRAY: u16 = 0x2000;

/// Base CIM type of a property or parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CimType {
    /// Signed 8-bit integer
    Sint8,
    /// Unsigned 8-bit integer
    Uint8,
    /// Signed 16-bit integer
    Sint16,
    /// Unsigned 16-bit integer
    Uint16,
    /// Signed 32-bit integer
    Sint32,
    /// Unsigned 32-bit integer
    Uint32,
    /// Signed 64-bit integer
    Sint64,
    /// Unsigned 64-bit integer
    Uint64,
    /// 32-bit float
    Real32,
    /// 64-bit float
    Real64,
    /// Boolean
    Boolean,
    /// String
    String,
    /// DMTF datetime, carried as a string
    Datetime,
    /// Object path reference, carried as a string
    Reference,
    /// UTF-16 code unit
    Char16,
    /// Embedded object
    Object,
}

impl CimType {
    const ALL: [CimType; 16] = [
        CimType::Sint8,
        CimType::Uint8,
        CimType::Sint16,
        CimType::Uint16,
        CimType::Sint32,
        CimType::Uint32,
        CimType::Sint64,
        CimType::Uint64,
        CimType::Real32,
        CimType::Real64,
        CimType::Boolean,
        CimType::String,
        CimType::Datetime,
        CimType::Reference,
        CimType::Char16,
        CimType::Object,
    ];

    /// CIMTYPE code
    pub const fn code(self) -> u16 {
        match self {
            CimType::Sint8 => 16,
            CimType::Uint8 => 17,
            CimType::Sint16 => 2,
            CimType::Uint16 => 18,
            CimType::Sint32 => 3,
            CimType::Uint32 => 19,
            CimType::Sint64 => 20,
            CimType::Uint64 => 21,
            CimType::Real32 => 4,
            CimType::Real64 => 5,
            CimType::Boolean => 11,
            CimType::String => 8,
            CimType::Datetime => 101,
            CimType::Reference => 102,
            CimType::Char16 => 103,
            CimType::Object => 13,
        }
    }

    /// MOF type name
    pub const fn name(self) -> &'static str {
        match self {
            CimType::Sint8 => "sint8",
            CimType::Uint8 => "uint8",
            CimType::Sint16 => "sint16",
            CimType::Uint16 => "uint16",
            CimType::Sint32 => "sint32",
            CimType::Uint32 => "uint32",
            CimType::Sint64 => "sint64",
            CimType::Uint64 => "uint64",
            CimType::Real32 => "real32",
            CimType::Real64 => "real64",
            CimType::Boolean => "boolean",
            CimType::String => "string",
            CimType::Datetime => "datetime",
            CimType::Reference => "ref",
            CimType::Char16 => "char16",
            CimType::Object => "object",
        }
    }

    /// Look up a base type by CIMTYPE code (without the array flag)
    pub fn from_code(code: u16) -> WmiResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|ty| ty.code() == code)
            .ok_or_else(|| WmiError::UnsupportedType(format!("CIM type code {}", code)))
    }

    /// Look up a base type by MOF name (case-insensitive)
    pub fn from_name(name: &str) -> WmiResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|ty| ty.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| WmiError::UnsupportedType(name.to_string()))
    }

    /// Whether values of this type are integers
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            CimType::Sint8
                | CimType::Uint8
                | CimType::Sint16
                | CimType::Uint16
                | CimType::Sint32
                | CimType::Uint32
                | CimType::Sint64
                | CimType::Uint64
                | CimType::Char16
        )
    }
}

impl fmt::Display for CimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared type of a property: base type plus array flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyType {
    /// Element type
    pub base: CimType,
    /// Whether the property holds an array of `base`
    pub is_array: bool,
}

impl PropertyType {
    /// Scalar property type
    pub const fn scalar(base: CimType) -> Self {
        Self {
            base,
            is_array: false,
        }
    }

    /// Array property type
    pub const fn array(base: CimType) -> Self {
        Self {
            base,
            is_array: true,
        }
    }

    /// CIMTYPE code including the array flag
    pub const fn code(self) -> u16 {
        if self.is_array {
            self.base.code() | CIM_FLAG_ARRAY
        } else {
            self.base.code()
        }
    }

    /// Decode a CIMTYPE code
    pub fn from_code(code: u16) -> WmiResult<Self> {
        Ok(Self {
            base: CimType::from_code(code & !CIM_FLAG_ARRAY)?,
            is_array: code & CIM_FLAG_ARRAY != 0,
        })
    }

    /// Parse a MOF-style type name such as `uint32` or `string[]`
    pub fn parse(name: &str) -> WmiResult<Self> {
        let name = name.trim();
        match name.strip_suffix("[]") {
            Some(base) => Ok(Self::array(CimType::from_name(base.trim())?)),
            None => Ok(Self::scalar(CimType::from_name(name)?)),
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_array {
            write!(f, "{}[]", self.base)
        } else {
            write!(f, "{}", self.base)
        }
    }
}

/// Where a property was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Declared on the object's own class
    Local,
    /// Inherited from a superclass
    Propagated,
    /// System property (`__CLASS`, `__PATH`, ...)
    System,
}

// ============================================================================
// Variant
// ============================================================================

/// Dynamically-typed value.
///
/// `Null` is distinct from every zero/empty value, and `Array` keeps its
/// element type so an empty array still knows what it holds.
#[derive(Debug, Clone, PartialEq)]
pub enum Variant<O> {
    /// No value
    Null,
    /// Boolean
    Bool(bool),
    /// Signed 8-bit integer
    I8(i8),
    /// Unsigned 8-bit integer
    U8(u8),
    /// Signed 16-bit integer
    I16(i16),
    /// Unsigned 16-bit integer (also char16)
    U16(u16),
    /// Signed 32-bit integer
    I32(i32),
    /// Unsigned 32-bit integer
    U32(u32),
    /// Signed 64-bit integer
    I64(i64),
    /// Unsigned 64-bit integer
    U64(u64),
    /// 32-bit float
    F32(f32),
    /// 64-bit float
    F64(f64),
    /// String (also datetime and reference)
    String(String),
    /// Byte sequence (`uint8[]`)
    Bytes(Vec<u8>),
    /// Embedded object
    Object(O),
    /// Array of the given element type
    Array(CimType, Vec<Variant<O>>),
}

impl<O> Variant<O> {
    /// Type name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Variant::Null => "null",
            Variant::Bool(_) => "boolean",
            Variant::I8(_) => "sint8",
            Variant::U8(_) => "uint8",
            Variant::I16(_) => "sint16",
            Variant::U16(_) => "uint16",
            Variant::I32(_) => "sint32",
            Variant::U32(_) => "uint32",
            Variant::I64(_) => "sint64",
            Variant::U64(_) => "uint64",
            Variant::F32(_) => "real32",
            Variant::F64(_) => "real64",
            Variant::String(_) => "string",
            Variant::Bytes(_) => "uint8[]",
            Variant::Object(_) => "object",
            Variant::Array(..) => "array",
        }
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Variant::Null)
    }

    /// Integer payload widened to `i128`, if this is an integer
    pub fn integer(&self) -> Option<i128> {
        match *self {
            Variant::I8(v) => Some(v as i128),
            Variant::U8(v) => Some(v as i128),
            Variant::I16(v) => Some(v as i128),
            Variant::U16(v) => Some(v as i128),
            Variant::I32(v) => Some(v as i128),
            Variant::U32(v) => Some(v as i128),
            Variant::I64(v) => Some(v as i128),
            Variant::U64(v) => Some(v as i128),
            _ => None,
        }
    }

    /// Float payload, if this is a float
    pub fn float(&self) -> Option<f64> {
        match *self {
            Variant::F32(v) => Some(v as f64),
            Variant::F64(v) => Some(v),
            _ => None,
        }
    }

    /// String payload, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::String(s) => Some(s),
            _ => None,
        }
    }

    /// The type this value naturally carries; `None` for null.
    pub fn natural_type(&self) -> Option<PropertyType> {
        let base = match self {
            Variant::Null => return None,
            Variant::Bool(_) => CimType::Boolean,
            Variant::I8(_) => CimType::Sint8,
            Variant::U8(_) => CimType::Uint8,
            Variant::I16(_) => CimType::Sint16,
            Variant::U16(_) => CimType::Uint16,
            Variant::I32(_) => CimType::Sint32,
            Variant::U32(_) => CimType::Uint32,
            Variant::I64(_) => CimType::Sint64,
            Variant::U64(_) => CimType::Uint64,
            Variant::F32(_) => CimType::Real32,
            Variant::F64(_) => CimType::Real64,
            Variant::String(_) => CimType::String,
            Variant::Object(_) => CimType::Object,
            Variant::Bytes(_) => return Some(PropertyType::array(CimType::Uint8)),
            Variant::Array(ty, _) => return Some(PropertyType::array(*ty)),
        };
        Some(PropertyType::scalar(base))
    }

    /// Convert embedded objects, leaving every other value untouched.
    pub fn map_objects<P>(self, f: &mut impl FnMut(O) -> P) -> Variant<P> {
        match self.try_map_objects(&mut |o| Ok::<P, std::convert::Infallible>(f(o))) {
            Ok(v) => v,
            Err(never) => match never {},
        }
    }

    /// Fallible form of [`Variant::map_objects`]
    pub fn try_map_objects<P, E>(
        self,
        f: &mut impl FnMut(O) -> Result<P, E>,
    ) -> Result<Variant<P>, E> {
        Ok(match self {
            Variant::Null => Variant::Null,
            Variant::Bool(v) => Variant::Bool(v),
            Variant::I8(v) => Variant::I8(v),
            Variant::U8(v) => Variant::U8(v),
            Variant::I16(v) => Variant::I16(v),
            Variant::U16(v) => Variant::U16(v),
            Variant::I32(v) => Variant::I32(v),
            Variant::U32(v) => Variant::U32(v),
            Variant::I64(v) => Variant::I64(v),
            Variant::U64(v) => Variant::U64(v),
            Variant::F32(v) => Variant::F32(v),
            Variant::F64(v) => Variant::F64(v),
            Variant::String(v) => Variant::String(v),
            Variant::Bytes(v) => Variant::Bytes(v),
            Variant::Object(o) => Variant::Object(f(o)?),
            Variant::Array(ty, items) => Variant::Array(
                ty,
                items
                    .into_iter()
                    .map(|item| item.try_map_objects(f))
                    .collect::<Result<_, E>>()?,
            ),
        })
    }

    /// Borrowing form of [`Variant::try_map_objects`]
    pub fn try_map_objects_ref<'a, P, E>(
        &'a self,
        f: &mut impl FnMut(&'a O) -> Result<P, E>,
    ) -> Result<Variant<P>, E> {
        Ok(match self {
            Variant::Null => Variant::Null,
            Variant::Bool(v) => Variant::Bool(*v),
            Variant::I8(v) => Variant::I8(*v),
            Variant::U8(v) => Variant::U8(*v),
            Variant::I16(v) => Variant::I16(*v),
            Variant::U16(v) => Variant::U16(*v),
            Variant::I32(v) => Variant::I32(*v),
            Variant::U32(v) => Variant::U32(*v),
            Variant::I64(v) => Variant::I64(*v),
            Variant::U64(v) => Variant::U64(*v),
            Variant::F32(v) => Variant::F32(*v),
            Variant::F64(v) => Variant::F64(*v),
            Variant::String(v) => Variant::String(v.clone()),
            Variant::Bytes(v) => Variant::Bytes(v.clone()),
            Variant::Object(o) => Variant::Object(f(o)?),
            Variant::Array(ty, items) => Variant::Array(
                *ty,
                items
                    .iter()
                    .map(|item| item.try_map_objects_ref(f))
                    .collect::<Result<_, E>>()?,
            ),
        })
    }
}

impl<O> Default for Variant<O> {
    fn default() -> Self {
        Variant::Null
    }
}

macro_rules! impl_variant_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl<O> From<$ty> for Variant<O> {
                fn from(v: $ty) -> Self {
                    Variant::$variant(v)
                }
            }
        )*
    };
}

impl_variant_from! {
    bool => Bool,
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    Vec<u8> => Bytes,
}

impl<O> From<&str> for Variant<O> {
    fn from(v: &str) -> Self {
        Variant::String(v.to_string())
    }
}

impl<O> From<Vec<String>> for Variant<O> {
    fn from(items: Vec<String>) -> Self {
        Variant::Array(CimType::String, items.into_iter().map(Variant::String).collect())
    }
}

impl<'a, O> From<Vec<&'a str>> for Variant<O> {
    fn from(items: Vec<&'a str>) -> Self {
        Variant::Array(CimType::String, items.into_iter().map(Variant::from).collect())
    }
}

impl<O> fmt::Display for Variant<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Null => f.write_str("<null>"),
            Variant::Bool(v) => write!(f, "{}", v),
            Variant::I8(v) => write!(f, "{}", v),
            Variant::U8(v) => write!(f, "{}", v),
            Variant::I16(v) => write!(f, "{}", v),
            Variant::U16(v) => write!(f, "{}", v),
            Variant::I32(v) => write!(f, "{}", v),
            Variant::U32(v) => write!(f, "{}", v),
            Variant::I64(v) => write!(f, "{}", v),
            Variant::U64(v) => write!(f, "{}", v),
            Variant::F32(v) => write!(f, "{}", v),
            Variant::F64(v) => write!(f, "{}", v),
            Variant::String(v) => f.write_str(v),
            Variant::Bytes(bytes) => {
                f.write_str("[")?;
                for (i, b) in bytes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", b)?;
                }
                f.write_str("]")
            }
            Variant::Object(_) => f.write_str("<object>"),
            Variant::Array(_, items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}
