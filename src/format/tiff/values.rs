//! TIFF tag values.
//!
//! A [`TagValue`] keeps the field type it was read with, so a tag written
//! back out has the same type and count as in the source file.

use crate::error::TiffError;

use super::parser::ByteOrder;
use super::tags::FieldType;

// =============================================================================
// TagValue
// =============================================================================

/// Decoded value of one IFD entry.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Byte(Vec<u8>),
    /// Raw bytes as stored, NUL terminators and padding included
    Ascii(Vec<u8>),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<(u32, u32)>),
    SByte(Vec<i8>),
    Undefined(Vec<u8>),
    SShort(Vec<i16>),
    SLong(Vec<i32>),
    SRational(Vec<(i32, i32)>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Long8(Vec<u64>),
}

impl TagValue {
    /// Field type this value is written with.
    pub fn field_type(&self) -> FieldType {
        match self {
            TagValue::Byte(_) => FieldType::Byte,
            TagValue::Ascii(_) => FieldType::Ascii,
            TagValue::Short(_) => FieldType::Short,
            TagValue::Long(_) => FieldType::Long,
            TagValue::Rational(_) => FieldType::Rational,
            TagValue::SByte(_) => FieldType::SByte,
            TagValue::Undefined(_) => FieldType::Undefined,
            TagValue::SShort(_) => FieldType::SShort,
            TagValue::SLong(_) => FieldType::SLong,
            TagValue::SRational(_) => FieldType::SRational,
            TagValue::Float(_) => FieldType::Float,
            TagValue::Double(_) => FieldType::Double,
            TagValue::Long8(_) => FieldType::Long8,
        }
    }

    /// Number of values, as stored in the entry's count field.
    pub fn count(&self) -> u64 {
        let n = match self {
            TagValue::Ascii(v) | TagValue::Byte(v) | TagValue::Undefined(v) => v.len(),
            TagValue::Short(v) => v.len(),
            TagValue::Long(v) => v.len(),
            TagValue::Rational(v) => v.len(),
            TagValue::SByte(v) => v.len(),
            TagValue::SShort(v) => v.len(),
            TagValue::SLong(v) => v.len(),
            TagValue::SRational(v) => v.len(),
            TagValue::Float(v) => v.len(),
            TagValue::Double(v) => v.len(),
            TagValue::Long8(v) => v.len(),
        };
        n as u64
    }

    /// First value widened to u64, for integer types.
    pub fn as_u64(&self) -> Option<u64> {
        self.as_u64_vec().and_then(|v| v.first().copied())
    }

    /// First value as u32, for integer types that fit.
    pub fn as_u32(&self) -> Option<u32> {
        self.as_u64().and_then(|v| u32::try_from(v).ok())
    }

    /// All values widened to u64, for unsigned integer types.
    pub fn as_u64_vec(&self) -> Option<Vec<u64>> {
        match self {
            TagValue::Byte(v) => Some(v.iter().map(|&x| x as u64).collect()),
            TagValue::Short(v) => Some(v.iter().map(|&x| x as u64).collect()),
            TagValue::Long(v) => Some(v.iter().map(|&x| x as u64).collect()),
            TagValue::Long8(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// ASCII value holding `text` and a single NUL terminator.
    pub fn ascii(text: &str) -> Self {
        let mut bytes = Vec::with_capacity(text.len() + 1);
        bytes.extend_from_slice(text.as_bytes());
        bytes.push(0);
        TagValue::Ascii(bytes)
    }

    /// Text of an ASCII value up to its first NUL, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::Ascii(bytes) => {
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                std::str::from_utf8(&bytes[..end]).ok()
            }
            _ => None,
        }
    }

    /// Text of an ASCII value stored as one UTF-8 string and a single
    /// terminator. Any other layout returns `None`.
    pub fn as_terminated_str(&self) -> Option<&str> {
        match self {
            TagValue::Ascii(bytes) => match bytes.split_last() {
                Some((&0, text)) if !text.contains(&0) => std::str::from_utf8(text).ok(),
                _ => None,
            },
            _ => None,
        }
    }

    /// Decode `count` values of `field_type` from `bytes`.
    pub fn decode(
        field_type: FieldType,
        count: usize,
        bytes: &[u8],
        order: ByteOrder,
    ) -> Result<Self, TiffError> {
        let needed = field_type.size_in_bytes() * count;
        if bytes.len() < needed {
            return Err(TiffError::InvalidTagValue {
                tag: "unknown",
                message: format!("need {} bytes, have {}", needed, bytes.len()),
            });
        }
        let bytes = &bytes[..needed];

        fn each<T>(bytes: &[u8], size: usize, f: impl Fn(&[u8]) -> T) -> Vec<T> {
            bytes.chunks_exact(size).map(f).collect()
        }

        let value = match field_type {
            FieldType::Byte => TagValue::Byte(bytes.to_vec()),
            FieldType::Undefined => TagValue::Undefined(bytes.to_vec()),
            FieldType::Ascii => TagValue::Ascii(bytes.to_vec()),
            FieldType::SByte => TagValue::SByte(bytes.iter().map(|&b| b as i8).collect()),
            FieldType::Short => TagValue::Short(each(bytes, 2, |b| order.read_u16(b))),
            FieldType::SShort => TagValue::SShort(each(bytes, 2, |b| order.read_i16(b))),
            FieldType::Long => TagValue::Long(each(bytes, 4, |b| order.read_u32(b))),
            FieldType::SLong => TagValue::SLong(each(bytes, 4, |b| order.read_i32(b))),
            FieldType::Float => TagValue::Float(each(bytes, 4, |b| order.read_f32(b))),
            FieldType::Double => TagValue::Double(each(bytes, 8, |b| order.read_f64(b))),
            FieldType::Long8 => TagValue::Long8(each(bytes, 8, |b| order.read_u64(b))),
            FieldType::Rational => TagValue::Rational(each(bytes, 8, |b| {
                (order.read_u32(b), order.read_u32(&b[4..]))
            })),
            FieldType::SRational => TagValue::SRational(each(bytes, 8, |b| {
                (order.read_i32(b), order.read_i32(&b[4..]))
            })),
        };

        Ok(value)
    }

    /// Encode the values in `order`, exactly `field_type().size_in_bytes() * count()` bytes.
    pub fn encode(&self, order: ByteOrder) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.field_type().size_in_bytes() * self.count() as usize);
        match self {
            TagValue::Ascii(v) | TagValue::Byte(v) | TagValue::Undefined(v) => {
                out.extend_from_slice(v)
            }
            TagValue::SByte(v) => out.extend(v.iter().map(|&b| b as u8)),
            TagValue::Short(v) => v.iter().for_each(|&x| order.write_u16(&mut out, x)),
            TagValue::SShort(v) => v.iter().for_each(|&x| order.write_i16(&mut out, x)),
            TagValue::Long(v) => v.iter().for_each(|&x| order.write_u32(&mut out, x)),
            TagValue::SLong(v) => v.iter().for_each(|&x| order.write_i32(&mut out, x)),
            TagValue::Float(v) => v.iter().for_each(|&x| order.write_f32(&mut out, x)),
            TagValue::Double(v) => v.iter().for_each(|&x| order.write_f64(&mut out, x)),
            TagValue::Long8(v) => v.iter().for_each(|&x| order.write_u64(&mut out, x)),
            TagValue::Rational(v) => v.iter().for_each(|&(n, d)| {
                order.write_u32(&mut out, n);
                order.write_u32(&mut out, d);
            }),
            TagValue::SRational(v) => v.iter().for_each(|&(n, d)| {
                order.write_i32(&mut out, n);
                order.write_i32(&mut out, d);
            }),
        }
        out
    }

    /// Unsigned integers as SHORT when they all fit, LONG otherwise.
    pub fn unsigned(values: Vec<u32>) -> Self {
        if values.iter().all(|&v| v <= u16::MAX as u32) {
            TagValue::Short(values.into_iter().map(|v| v as u16).collect())
        } else {
            TagValue::Long(values)
        }
    }

    /// Unsigned integers as `like`'s type if they fit in it, else [`TagValue::unsigned`].
    ///
    /// Keeps a regenerated structural tag (offsets, sizes) in the field type
    /// the source file used.
    pub fn unsigned_like(like: Option<&TagValue>, values: Vec<u32>) -> Self {
        match like {
            Some(TagValue::Short(_)) if values.iter().all(|&v| v <= u16::MAX as u32) => {
                TagValue::Short(values.into_iter().map(|v| v as u16).collect())
            }
            Some(TagValue::Long(_)) => TagValue::Long(values),
            Some(TagValue::Short(_)) => TagValue::Long(values),
            _ => TagValue::unsigned(values),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
