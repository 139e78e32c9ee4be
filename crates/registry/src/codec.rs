//! Conversion between [`WireValue`]s and application-level [`NativeValue`]s.
//!
//! A [`ValueCodec`] is bound to the variant (and, for arrays, the element
//! count) of the first value a device reported for a register.  Everything
//! the client writes is conformed to that shape; the codec never picks a
//! different variant from the input.
//!
//! Single-element arrays are unwrapped to bare scalars on decode, and bare
//! scalars are wrapped into single-element arrays on encode.

use std::fmt;

use cyd_protocol::{ValueKind, WireValue};
use half::f16;
use serde::Serialize;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// NativeValue
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A register value in application form.
///
/// Integers are widened to `i128` so that every natural64 and integer64
/// element fits without loss.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum NativeValue {
    #[default]
    None,
    Bool(bool),
    Integer(i128),
    Float(f64),
    BoolList(Vec<bool>),
    IntegerList(Vec<i128>),
    FloatList(Vec<f64>),
    Bytes(Vec<u8>),
    String(String),
}

impl NativeValue {
    pub fn is_none(&self) -> bool {
        matches!(self, NativeValue::None)
    }

    /// Short name of the shape, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            NativeValue::None => "none",
            NativeValue::Bool(_) => "bool",
            NativeValue::Integer(_) => "integer",
            NativeValue::Float(_) => "float",
            NativeValue::BoolList(_) => "bool list",
            NativeValue::IntegerList(_) => "integer list",
            NativeValue::FloatList(_) => "float list",
            NativeValue::Bytes(_) => "bytes",
            NativeValue::String(_) => "string",
        }
    }

    /// Equality that treats `x` and `[x]` as the same value.
    pub fn matches(&self, other: &NativeValue) -> bool {
        self == other || self.clone().unwrap_singleton() == other.clone().unwrap_singleton()
    }

    /// Collapse a one-element list into its element.
    pub fn unwrap_singleton(self) -> NativeValue {
        match self {
            NativeValue::BoolList(v) if v.len() == 1 => NativeValue::Bool(v[0]),
            NativeValue::IntegerList(v) if v.len() == 1 => NativeValue::Integer(v[0]),
            NativeValue::FloatList(v) if v.len() == 1 => NativeValue::Float(v[0]),
            other => other,
        }
    }

    /// Wrap a bare scalar into a one-element list; lists pass through.
    /// Returns `None` for shapes that are not array-like.
    fn into_list(self) -> Option<NativeValue> {
        match self {
            NativeValue::Bool(b) => Some(NativeValue::BoolList(vec![b])),
            NativeValue::Integer(i) => Some(NativeValue::IntegerList(vec![i])),
            NativeValue::Float(f) => Some(NativeValue::FloatList(vec![f])),
            list @ (NativeValue::BoolList(_)
            | NativeValue::IntegerList(_)
            | NativeValue::FloatList(_)) => Some(list),
            _ => None,
        }
    }

    fn list_len(&self) -> usize {
        match self {
            NativeValue::BoolList(v) => v.len(),
            NativeValue::IntegerList(v) => v.len(),
            NativeValue::FloatList(v) => v.len(),
            _ => 1,
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    f.write_str("[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str("]")
}

impl fmt::Display for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::None => f.write_str("none"),
            NativeValue::Bool(b) => write!(f, "{b}"),
            NativeValue::Integer(i) => write!(f, "{i}"),
            NativeValue::Float(x) => write!(f, "{x}"),
            NativeValue::BoolList(v) => write_list(f, v),
            NativeValue::IntegerList(v) => write_list(f, v),
            NativeValue::FloatList(v) => write_list(f, v),
            NativeValue::Bytes(b) => {
                f.write_str("b\"")?;
                for byte in b {
                    write!(f, "{}", std::ascii::escape_default(*byte))?;
                }
                f.write_str("\"")
            }
            NativeValue::String(s) => f.write_str(s),
        }
    }
}

macro_rules! native_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for NativeValue {
                fn from(v: $t) -> Self {
                    NativeValue::Integer(i128::from(v))
                }
            }

            impl From<Vec<$t>> for NativeValue {
                fn from(v: Vec<$t>) -> Self {
                    NativeValue::IntegerList(v.into_iter().map(i128::from).collect())
                }
            }
        )*
    };
}

native_from_int!(i8, i16, i32, i64, i128, u16, u32, u64);

impl From<u8> for NativeValue {
    fn from(v: u8) -> Self {
        NativeValue::Integer(i128::from(v))
    }
}

/// `Vec<u8>` is an opaque blob, not a list of integers.
impl From<Vec<u8>> for NativeValue {
    fn from(v: Vec<u8>) -> Self {
        NativeValue::Bytes(v)
    }
}

impl From<&[u8]> for NativeValue {
    fn from(v: &[u8]) -> Self {
        NativeValue::Bytes(v.to_vec())
    }
}

impl From<bool> for NativeValue {
    fn from(v: bool) -> Self {
        NativeValue::Bool(v)
    }
}

impl From<Vec<bool>> for NativeValue {
    fn from(v: Vec<bool>) -> Self {
        NativeValue::BoolList(v)
    }
}

impl From<f64> for NativeValue {
    fn from(v: f64) -> Self {
        NativeValue::Float(v)
    }
}

impl From<f32> for NativeValue {
    fn from(v: f32) -> Self {
        NativeValue::Float(f64::from(v))
    }
}

impl From<Vec<f64>> for NativeValue {
    fn from(v: Vec<f64>) -> Self {
        NativeValue::FloatList(v)
    }
}

impl From<Vec<f32>> for NativeValue {
    fn from(v: Vec<f32>) -> Self {
        NativeValue::FloatList(v.into_iter().map(f64::from).collect())
    }
}

impl From<&str> for NativeValue {
    fn from(v: &str) -> Self {
        NativeValue::String(v.to_string())
    }
}

impl From<String> for NativeValue {
    fn from(v: String) -> Self {
        NativeValue::String(v)
    }
}

impl<T: Into<NativeValue>> From<Option<T>> for NativeValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(NativeValue::None, Into::into)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Errors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Errors raised while converting between wire and native values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    #[error("empty value carries no type")]
    Untyped,

    #[error("variant mismatch: expected {expected}, got {found}")]
    VariantMismatch { expected: ValueKind, found: ValueKind },

    #[error("length mismatch: expected {expected}, got {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("type mismatch: {dtype} cannot hold a {found} value")]
    TypeMismatch { dtype: String, found: &'static str },

    #[error("{value} is out of range for {dtype}")]
    OutOfRange { value: String, dtype: String },

    #[error("{len} elements exceed the capacity of {dtype} ({capacity})")]
    CapacityExceeded {
        len: usize,
        capacity: usize,
        dtype: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ValueCodec
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Converter bound to one register's wire type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueCodec {
    kind: ValueKind,
    /// Element count, for array kinds only.
    length: Option<usize>,
}

impl ValueCodec {
    /// Bind a codec to the shape of `value`.  Fails for `Empty`.
    pub fn from_wire(value: &WireValue) -> Result<Self, CodecError> {
        let kind = value.kind();
        if kind == ValueKind::Empty {
            return Err(CodecError::Untyped);
        }
        let length = kind.is_array().then(|| value.len());
        Ok(Self { kind, length })
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn length(&self) -> Option<usize> {
        self.length
    }

    /// Human-readable type: `"natural16[4]"`, `"string"`, `"unstructured"`.
    pub fn dtype(&self) -> String {
        match self.length {
            Some(n) => format!("{}[{n}]", self.kind),
            None => self.kind.name().to_string(),
        }
    }

    /// Decode with singleton unwrapping.
    pub fn to_native(&self, wire: &WireValue) -> Result<NativeValue, CodecError> {
        self.decode(wire, true)
    }

    /// Decode; arrays always come back as lists when `unpack` is false.
    pub fn decode(&self, wire: &WireValue, unpack: bool) -> Result<NativeValue, CodecError> {
        if wire.is_empty() {
            return Ok(NativeValue::None);
        }
        if wire.kind() != self.kind {
            return Err(CodecError::VariantMismatch {
                expected: self.kind,
                found: wire.kind(),
            });
        }
        if let Some(expected) = self.length {
            if wire.len() != expected {
                return Err(CodecError::LengthMismatch {
                    expected,
                    found: wire.len(),
                });
            }
        }

        let native = match wire {
            WireValue::Empty => NativeValue::None,
            WireValue::String(bytes) => {
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                NativeValue::String(String::from_utf8_lossy(&bytes[..end]).into_owned())
            }
            WireValue::Unstructured(bytes) => NativeValue::Bytes(bytes.clone()),
            WireValue::Bit(v) => NativeValue::BoolList(v.clone()),
            WireValue::Integer64(v) => widen(v),
            WireValue::Integer32(v) => widen(v),
            WireValue::Integer16(v) => widen(v),
            WireValue::Integer8(v) => widen(v),
            WireValue::Natural64(v) => widen(v),
            WireValue::Natural32(v) => widen(v),
            WireValue::Natural16(v) => widen(v),
            WireValue::Natural8(v) => widen(v),
            WireValue::Real64(v) => NativeValue::FloatList(v.clone()),
            WireValue::Real32(v) => NativeValue::FloatList(v.iter().map(|&x| f64::from(x)).collect()),
            WireValue::Real16(v) => NativeValue::FloatList(v.iter().map(|x| x.to_f64()).collect()),
        };

        Ok(if unpack {
            native.unwrap_singleton()
        } else {
            native
        })
    }

    /// Encode `native` into this codec's wire variant.
    pub fn to_wire(&self, native: &NativeValue) -> Result<WireValue, CodecError> {
        if native.is_none() {
            return Ok(WireValue::Empty);
        }

        match self.kind {
            ValueKind::Empty => Err(CodecError::Untyped),
            ValueKind::String => match native {
                NativeValue::String(s) => {
                    self.check_capacity(s.len())?;
                    Ok(WireValue::String(s.as_bytes().to_vec()))
                }
                other => Err(self.type_mismatch(other)),
            },
            ValueKind::Unstructured => match native {
                NativeValue::Bytes(b) => {
                    self.check_capacity(b.len())?;
                    Ok(WireValue::Unstructured(b.clone()))
                }
                other => Err(self.type_mismatch(other)),
            },
            _ => self.encode_array(native),
        }
    }

    /// Canonicalize `native` by passing it through the wire form.
    pub fn normalize(&self, native: &NativeValue) -> Result<NativeValue, CodecError> {
        self.to_native(&self.to_wire(native)?)
    }

    fn encode_array(&self, native: &NativeValue) -> Result<WireValue, CodecError> {
        let list = native
            .clone()
            .into_list()
            .ok_or_else(|| self.type_mismatch(native))?;

        let expected = self.length.unwrap_or(0);
        if list.list_len() != expected {
            return Err(CodecError::LengthMismatch {
                expected,
                found: list.list_len(),
            });
        }

        let wire = match (self.kind, list) {
            (ValueKind::Bit, NativeValue::BoolList(v)) => WireValue::Bit(v),
            (ValueKind::Integer64, NativeValue::IntegerList(v)) => WireValue::Integer64(self.narrow(&v)?),
            (ValueKind::Integer32, NativeValue::IntegerList(v)) => WireValue::Integer32(self.narrow(&v)?),
            (ValueKind::Integer16, NativeValue::IntegerList(v)) => WireValue::Integer16(self.narrow(&v)?),
            (ValueKind::Integer8, NativeValue::IntegerList(v)) => WireValue::Integer8(self.narrow(&v)?),
            (ValueKind::Natural64, NativeValue::IntegerList(v)) => WireValue::Natural64(self.narrow(&v)?),
            (ValueKind::Natural32, NativeValue::IntegerList(v)) => WireValue::Natural32(self.narrow(&v)?),
            (ValueKind::Natural16, NativeValue::IntegerList(v)) => WireValue::Natural16(self.narrow(&v)?),
            (ValueKind::Natural8, NativeValue::IntegerList(v)) => WireValue::Natural8(self.narrow(&v)?),
            (ValueKind::Real64, NativeValue::FloatList(v)) => WireValue::Real64(v),
            (ValueKind::Real64, NativeValue::IntegerList(v)) => {
                WireValue::Real64(v.iter().map(|&i| i as f64).collect())
            }
            (ValueKind::Real32, list @ (NativeValue::FloatList(_) | NativeValue::IntegerList(_))) => {
                WireValue::Real32(
                    floats(&list)
                        .map(|x| self.narrow_float(x, x as f32, |y| y.is_finite()))
                        .collect::<Result<_, _>>()?,
                )
            }
            (ValueKind::Real16, list @ (NativeValue::FloatList(_) | NativeValue::IntegerList(_))) => {
                WireValue::Real16(
                    floats(&list)
                        .map(|x| self.narrow_float(x, f16::from_f64(x), |y| y.is_finite()))
                        .collect::<Result<_, _>>()?,
                )
            }
            (_, list) => return Err(self.type_mismatch(&list)),
        };
        Ok(wire)
    }

    fn narrow<T: TryFrom<i128>>(&self, items: &[i128]) -> Result<Vec<T>, CodecError> {
        items
            .iter()
            .map(|&i| {
                T::try_from(i).map_err(|_| CodecError::OutOfRange {
                    value: i.to_string(),
                    dtype: self.dtype(),
                })
            })
            .collect()
    }

    /// Reject finite inputs that overflow the narrower float type.
    fn narrow_float<T>(&self, x: f64, y: T, is_finite: impl Fn(&T) -> bool) -> Result<T, CodecError> {
        if x.is_finite() && !is_finite(&y) {
            return Err(CodecError::OutOfRange {
                value: x.to_string(),
                dtype: self.dtype(),
            });
        }
        Ok(y)
    }

    fn check_capacity(&self, len: usize) -> Result<(), CodecError> {
        let capacity = self.kind.capacity();
        if len > capacity {
            return Err(CodecError::CapacityExceeded {
                len,
                capacity,
                dtype: self.dtype(),
            });
        }
        Ok(())
    }

    fn type_mismatch(&self, native: &NativeValue) -> CodecError {
        CodecError::TypeMismatch {
            dtype: self.dtype(),
            found: native.kind_name(),
        }
    }
}

fn widen<T: Copy + Into<i128>>(items: &[T]) -> NativeValue {
    NativeValue::IntegerList(items.iter().map(|&x| x.into()).collect())
}

fn floats(list: &NativeValue) -> Box<dyn Iterator<Item = f64> + '_> {
    match list {
        NativeValue::FloatList(v) => Box::new(v.iter().copied()),
        NativeValue::IntegerList(v) => Box::new(v.iter().map(|&i| i as f64)),
        _ => Box::new(std::iter::empty()),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
