//! `uavcan.register.Value`: the closed set of register value encodings.

use std::fmt;

use half::f16;
use serde::{Deserialize, Serialize};

/// A register value as it travels on the wire.
///
/// Every variant except `Empty`, `String` and `Unstructured` is a bounded
/// array of one primitive element type.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireValue {
    #[default]
    Empty,
    /// UTF-8 text; may contain garbage or trailing NULs from the device.
    String(Vec<u8>),
    Unstructured(Vec<u8>),
    Bit(Vec<bool>),
    Integer64(Vec<i64>),
    Integer32(Vec<i32>),
    Integer16(Vec<i16>),
    Integer8(Vec<i8>),
    Natural64(Vec<u64>),
    Natural32(Vec<u32>),
    Natural16(Vec<u16>),
    Natural8(Vec<u8>),
    Real64(Vec<f64>),
    Real32(Vec<f32>),
    Real16(Vec<f16>),
}

impl WireValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            WireValue::Empty => ValueKind::Empty,
            WireValue::String(_) => ValueKind::String,
            WireValue::Unstructured(_) => ValueKind::Unstructured,
            WireValue::Bit(_) => ValueKind::Bit,
            WireValue::Integer64(_) => ValueKind::Integer64,
            WireValue::Integer32(_) => ValueKind::Integer32,
            WireValue::Integer16(_) => ValueKind::Integer16,
            WireValue::Integer8(_) => ValueKind::Integer8,
            WireValue::Natural64(_) => ValueKind::Natural64,
            WireValue::Natural32(_) => ValueKind::Natural32,
            WireValue::Natural16(_) => ValueKind::Natural16,
            WireValue::Natural8(_) => ValueKind::Natural8,
            WireValue::Real64(_) => ValueKind::Real64,
            WireValue::Real32(_) => ValueKind::Real32,
            WireValue::Real16(_) => ValueKind::Real16,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, WireValue::Empty)
    }

    /// Element count of the payload (bytes for string/unstructured, 0 for empty).
    pub fn len(&self) -> usize {
        match self {
            WireValue::Empty => 0,
            WireValue::String(v) | WireValue::Unstructured(v) | WireValue::Natural8(v) => v.len(),
            WireValue::Bit(v) => v.len(),
            WireValue::Integer64(v) => v.len(),
            WireValue::Integer32(v) => v.len(),
            WireValue::Integer16(v) => v.len(),
            WireValue::Integer8(v) => v.len(),
            WireValue::Natural64(v) => v.len(),
            WireValue::Natural32(v) => v.len(),
            WireValue::Natural16(v) => v.len(),
            WireValue::Real64(v) => v.len(),
            WireValue::Real32(v) => v.len(),
            WireValue::Real16(v) => v.len(),
        }
    }

    /// Whether the payload fits the variant's wire capacity.
    pub fn fits_capacity(&self) -> bool {
        self.len() <= self.kind().capacity()
    }
}

/// The variant tag of a [`WireValue`], without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Empty,
    String,
    Unstructured,
    Bit,
    Integer64,
    Integer32,
    Integer16,
    Integer8,
    Natural64,
    Natural32,
    Natural16,
    Natural8,
    Real64,
    Real32,
    Real16,
}

impl ValueKind {
    /// Lowercase DSDL-style name (`"natural16"`, `"string"`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Empty => "empty",
            ValueKind::String => "string",
            ValueKind::Unstructured => "unstructured",
            ValueKind::Bit => "bit",
            ValueKind::Integer64 => "integer64",
            ValueKind::Integer32 => "integer32",
            ValueKind::Integer16 => "integer16",
            ValueKind::Integer8 => "integer8",
            ValueKind::Natural64 => "natural64",
            ValueKind::Natural32 => "natural32",
            ValueKind::Natural16 => "natural16",
            ValueKind::Natural8 => "natural8",
            ValueKind::Real64 => "real64",
            ValueKind::Real32 => "real32",
            ValueKind::Real16 => "real16",
        }
    }

    /// True for the fixed-element numeric/boolean array kinds.
    pub fn is_array(&self) -> bool {
        !matches!(
            self,
            ValueKind::Empty | ValueKind::String | ValueKind::Unstructured
        )
    }

    /// Maximum element count the wire format can carry.
    ///
    /// Every array kind is bounded to 256 bytes of payload (2048 bits).
    pub fn capacity(&self) -> usize {
        match self {
            ValueKind::Empty => 0,
            ValueKind::String | ValueKind::Unstructured => 256,
            ValueKind::Bit => 2048,
            ValueKind::Integer64 | ValueKind::Natural64 | ValueKind::Real64 => 32,
            ValueKind::Integer32 | ValueKind::Natural32 | ValueKind::Real32 => 64,
            ValueKind::Integer16 | ValueKind::Natural16 | ValueKind::Real16 => 128,
            ValueKind::Integer8 | ValueKind::Natural8 => 256,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(WireValue::Empty.kind(), ValueKind::Empty);
        assert_eq!(WireValue::Natural16(vec![1]).kind(), ValueKind::Natural16);
        assert_eq!(
            WireValue::Real16(vec![f16::from_f32(1.0)]).kind(),
            ValueKind::Real16
        );
    }

    #[test]
    fn array_kinds() {
        assert!(!ValueKind::Empty.is_array());
        assert!(!ValueKind::String.is_array());
        assert!(!ValueKind::Unstructured.is_array());
        assert!(ValueKind::Bit.is_array());
        assert!(ValueKind::Real64.is_array());
    }

    #[test]
    fn capacity_limits() {
        assert!(WireValue::Integer64(vec![0; 32]).fits_capacity());
        assert!(!WireValue::Integer64(vec![0; 33]).fits_capacity());
        assert!(WireValue::String(vec![b'a'; 256]).fits_capacity());
        assert!(!WireValue::Unstructured(vec![0; 257]).fits_capacity());
        assert!(WireValue::Bit(vec![false; 2048]).fits_capacity());
    }

    #[test]
    fn len_counts_elements() {
        assert_eq!(WireValue::Empty.len(), 0);
        assert_eq!(WireValue::Real32(vec![1.0, 2.0, 3.0]).len(), 3);
        assert_eq!(WireValue::String(b"abc".to_vec()).len(), 3);
    }

    #[test]
    fn serde_tags_are_lowercase() {
        let json = serde_json::to_string(&WireValue::Natural16(vec![100])).unwrap();
        assert_eq!(json, r#"{"natural16":[100]}"#);
        let empty = serde_json::to_string(&WireValue::Empty).unwrap();
        assert_eq!(empty, r#""empty""#);
    }
}
