//! JSON sidecar holding the TIFF tags of a compressed image.
//!
//! ```json
//! {
//!   "256": [512],
//!   "270": "<?xml ...?><OME ...>",
//!   "282": [[72, 1]],
//!   "palette": [0, 0, 0, 1, 1, 1],
//!   "fieldtypes": {"256": 3, "270": 2, "282": 5}
//! }
//! ```
//!
//! Every tag id maps to its values: nested pairs for rationals, a flat array
//! otherwise. ASCII tags holding one UTF-8 string and its terminator are
//! written as a JSON string; other ASCII tags (padding, Latin-1 bytes, no
//! terminator) keep their raw bytes as an array. `fieldtypes` records the TIFF field
//! type of each tag so it can be written back exactly. Sidecars without it
//! are still accepted; the type is then taken from the tag's usual type or
//! inferred from the values.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CodecError;
use crate::format::write_atomic;
use crate::format::tiff::{FieldType, Ifd, TagValue, TiffTag};

/// Decoded sidecar document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sidecar {
    /// Flat `r, g, b` triplets of a palette image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub palette: Option<Vec<u8>>,

    /// TIFF field type code per tag id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fieldtypes: BTreeMap<String, u16>,

    /// Tag id to JSON value
    #[serde(flatten)]
    pub tags: BTreeMap<String, Value>,
}

impl Sidecar {
    /// Capture every tag of `ifd`, plus the palette if any.
    pub fn from_tags(ifd: &Ifd, palette: Option<Vec<u8>>) -> Self {
        let mut sidecar = Sidecar {
            palette,
            ..Default::default()
        };
        for (tag, value) in ifd.iter() {
            sidecar.tags.insert(tag.to_string(), to_json(value));
            sidecar
                .fieldtypes
                .insert(tag.to_string(), value.field_type().as_u16());
        }
        sidecar
    }

    /// Rebuild the tag map.
    pub fn to_tags(&self) -> Result<Ifd, CodecError> {
        let mut ifd = Ifd::new();
        for (key, value) in &self.tags {
            let tag: u16 = key.parse().map_err(|_| invalid(key, "key is not a tag id"))?;
            let field_type = match self.fieldtypes.get(key) {
                Some(&code) => Some(
                    FieldType::from_u16(code)
                        .ok_or_else(|| invalid(key, &format!("unknown field type {}", code)))?,
                ),
                None => None,
            };
            ifd.insert(tag, from_json(key, tag, value, field_type)?);
        }
        Ok(ifd)
    }

    pub fn read(path: &Path) -> Result<Self, CodecError> {
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| CodecError::Sidecar {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn write(&self, path: &Path) -> Result<(), CodecError> {
        let text = serde_json::to_string(self).map_err(|source| CodecError::Sidecar {
            path: path.to_path_buf(),
            source,
        })?;
        write_atomic(path, text.as_bytes())?;
        Ok(())
    }
}

fn invalid(key: &str, message: &str) -> CodecError {
    CodecError::InvalidSidecar {
        key: key.to_string(),
        message: message.to_string(),
    }
}

// =============================================================================
// TagValue -> JSON
// =============================================================================

fn to_json(value: &TagValue) -> Value {
    fn flat<T: Copy + Into<Value>>(values: &[T]) -> Value {
        Value::Array(values.iter().map(|&v| v.into()).collect())
    }
    fn pairs<T: Copy + Into<Value>>(values: &[(T, T)]) -> Value {
        Value::Array(
            values
                .iter()
                .map(|&(n, d)| Value::Array(vec![n.into(), d.into()]))
                .collect(),
        )
    }

    match value {
        TagValue::Ascii(v) => match value.as_terminated_str() {
            Some(text) => Value::String(text.to_string()),
            None => flat(v),
        },
        TagValue::Byte(v) | TagValue::Undefined(v) => flat(v),
        TagValue::SByte(v) => flat(v),
        TagValue::Short(v) => flat(v),
        TagValue::SShort(v) => flat(v),
        TagValue::Long(v) => flat(v),
        TagValue::SLong(v) => flat(v),
        TagValue::Long8(v) => flat(v),
        TagValue::Float(v) => flat(v),
        TagValue::Double(v) => flat(v),
        TagValue::Rational(v) => pairs(v),
        TagValue::SRational(v) => pairs(v),
    }
}

// =============================================================================
// JSON -> TagValue
// =============================================================================

fn from_json(
    key: &str,
    tag: u16,
    value: &Value,
    field_type: Option<FieldType>,
) -> Result<TagValue, CodecError> {
    // Single values are accepted as one-element lists
    let items: Vec<Value> = match value {
        Value::String(s) => return Ok(TagValue::ascii(s)),
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    };

    let field_type = match field_type {
        Some(t) => t,
        None => infer_type(tag, &items),
    };

    match field_type {
        FieldType::Ascii => Ok(TagValue::Ascii(integers(key, &items)?)),
        FieldType::Byte => Ok(TagValue::Byte(integers(key, &items)?)),
        FieldType::Undefined => Ok(TagValue::Undefined(integers(key, &items)?)),
        FieldType::SByte => Ok(TagValue::SByte(integers(key, &items)?)),
        FieldType::Short => Ok(TagValue::Short(integers(key, &items)?)),
        FieldType::SShort => Ok(TagValue::SShort(integers(key, &items)?)),
        FieldType::Long => Ok(TagValue::Long(integers(key, &items)?)),
        FieldType::SLong => Ok(TagValue::SLong(integers(key, &items)?)),
        FieldType::Long8 => items
            .iter()
            .map(|v| v.as_u64().ok_or_else(|| invalid(key, "expected unsigned integers")))
            .collect::<Result<_, _>>()
            .map(TagValue::Long8),
        FieldType::Float => Ok(TagValue::Float(
            floats(key, &items)?.into_iter().map(|v| v as f32).collect(),
        )),
        FieldType::Double => Ok(TagValue::Double(floats(key, &items)?)),
        FieldType::Rational => Ok(TagValue::Rational(rationals(key, &items)?)),
        FieldType::SRational => Ok(TagValue::SRational(rationals(key, &items)?)),
    }
}

/// Field type for a sidecar written without `fieldtypes`.
fn infer_type(tag: u16, items: &[Value]) -> FieldType {
    let nested = items.iter().any(Value::is_array);
    let negative = items.iter().flat_map(flatten).any(|v| v.as_i64().is_some_and(|n| n < 0));

    if nested {
        return if negative {
            FieldType::SRational
        } else {
            FieldType::Rational
        };
    }

    if let Some(known) = TiffTag::from_u16(tag) {
        if !negative {
            return known.default_field_type();
        }
    }

    if items.iter().any(|v| v.is_f64()) {
        FieldType::Double
    } else if negative {
        let fits_short = items
            .iter()
            .all(|v| v.as_i64().is_some_and(|n| i16::try_from(n).is_ok()));
        if fits_short {
            FieldType::SShort
        } else {
            FieldType::SLong
        }
    } else if items.iter().all(|v| v.as_u64().is_some_and(|n| n <= u16::MAX as u64)) {
        FieldType::Short
    } else if items.iter().all(|v| v.as_u64().is_some_and(|n| n <= u32::MAX as u64)) {
        FieldType::Long
    } else {
        FieldType::Long8
    }
}

fn flatten(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

fn integers<T: TryFrom<i64>>(key: &str, items: &[Value]) -> Result<Vec<T>, CodecError> {
    items
        .iter()
        .map(|v| {
            v.as_i64()
                .and_then(|n| T::try_from(n).ok())
                .ok_or_else(|| invalid(key, &format!("{} is out of range", v)))
        })
        .collect()
}

fn floats(key: &str, items: &[Value]) -> Result<Vec<f64>, CodecError> {
    items
        .iter()
        .map(|v| match v {
            // serde_json writes NaN and infinities as null
            Value::Null => Ok(f64::NAN),
            _ => v.as_f64().ok_or_else(|| invalid(key, "expected numbers")),
        })
        .collect()
}

fn rationals<T: TryFrom<i64>>(key: &str, items: &[Value]) -> Result<Vec<(T, T)>, CodecError> {
    items
        .iter()
        .map(|pair| match pair.as_array().map(Vec::as_slice) {
            Some([n, d]) => {
                let mut parts = integers::<T>(key, &[n.clone(), d.clone()])?.into_iter();
                match (parts.next(), parts.next()) {
                    (Some(n), Some(d)) => Ok((n, d)),
                    _ => Err(invalid(key, "expected [numerator, denominator]")),
                }
            }
            _ => Err(invalid(key, "expected [numerator, denominator]")),
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
