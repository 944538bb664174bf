//! Streaming TLV reader.
//!
//! A [`TlvReader`] walks a byte slice one element at a time. Containers are
//! surfaced as nested readers scoped to the container's members, so callers
//! decode nested structures with the same API they use at the top level.

use crate::element::{
    ContainerKind, ELEMENT_TYPE_MASK, TAG_ANONYMOUS, TAG_CONTEXT, TAG_CONTROL_MASK, TYPE_BYTES_1,
    TYPE_BYTES_8, TYPE_END_OF_CONTAINER, TYPE_FALSE, TYPE_FLOAT32, TYPE_FLOAT64, TYPE_INT8,
    TYPE_INT16, TYPE_INT32, TYPE_INT64, TYPE_NULL, TYPE_TRUE, TYPE_UINT8, TYPE_UINT16,
    TYPE_UINT32, TYPE_UINT64, TYPE_UTF8_1, TYPE_UTF8_8, Tag,
};
use crate::error::TlvError;

/// Decoded value of a TLV element.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    /// Signed integer of any width.
    Signed(i64),
    /// Unsigned integer of any width.
    Unsigned(u64),
    /// Boolean.
    Bool(bool),
    /// Floating point number of either precision.
    Float(f64),
    /// UTF-8 string borrowed from the input.
    Utf8(&'a str),
    /// Octet string borrowed from the input.
    Bytes(&'a [u8]),
    /// Null.
    Null,
    /// Container and a reader over its members.
    Container(ContainerKind, TlvReader<'a>),
}

impl Value<'_> {
    /// Returns a short human-readable name of the value's type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Signed(_) => "signed integer",
            Self::Unsigned(_) => "unsigned integer",
            Self::Bool(_) => "boolean",
            Self::Float(_) => "float",
            Self::Utf8(_) => "utf-8 string",
            Self::Bytes(_) => "octet string",
            Self::Null => "null",
            Self::Container(kind, _) => kind.name(),
        }
    }
}

/// A single decoded element together with its encoded form.
#[derive(Debug, Clone, PartialEq)]
pub struct Element<'a> {
    tag: Tag,
    element_type: u8,
    value: Value<'a>,
    raw: &'a [u8],
    body: &'a [u8],
}

impl<'a> Element<'a> {
    /// Tag attached to the element.
    #[must_use]
    pub const fn tag(&self) -> Tag {
        self.tag
    }

    /// Decoded value.
    #[must_use]
    pub const fn value(&self) -> &Value<'a> {
        &self.value
    }

    /// Complete encoded element, including control byte and tag.
    #[must_use]
    pub const fn raw(&self) -> &'a [u8] {
        self.raw
    }

    pub(crate) const fn element_type(&self) -> u8 {
        self.element_type
    }

    pub(crate) const fn body(&self) -> &'a [u8] {
        self.body
    }

    /// Returns the value as an unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::TypeMismatch`] for any other element type.
    pub fn as_u64(&self) -> Result<u64, TlvError> {
        match self.value {
            Value::Unsigned(value) => Ok(value),
            ref other => Err(mismatch("unsigned integer", other)),
        }
    }

    /// Returns the value as a `u8`.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::TypeMismatch`] for non-integers and
    /// [`TlvError::OutOfRange`] when the value exceeds `u8::MAX`.
    pub fn as_u8(&self) -> Result<u8, TlvError> {
        narrow_unsigned(self.as_u64()?, "u8")
    }

    /// Returns the value as a `u16`.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::TypeMismatch`] for non-integers and
    /// [`TlvError::OutOfRange`] when the value exceeds `u16::MAX`.
    pub fn as_u16(&self) -> Result<u16, TlvError> {
        narrow_unsigned(self.as_u64()?, "u16")
    }

    /// Returns the value as a `u32`.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::TypeMismatch`] for non-integers and
    /// [`TlvError::OutOfRange`] when the value exceeds `u32::MAX`.
    pub fn as_u32(&self) -> Result<u32, TlvError> {
        narrow_unsigned(self.as_u64()?, "u32")
    }

    /// Returns the value as a signed integer.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::TypeMismatch`] for any other element type.
    pub fn as_i64(&self) -> Result<i64, TlvError> {
        match self.value {
            Value::Signed(value) => Ok(value),
            ref other => Err(mismatch("signed integer", other)),
        }
    }

    /// Returns the value as a boolean.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::TypeMismatch`] for any other element type.
    pub fn as_bool(&self) -> Result<bool, TlvError> {
        match self.value {
            Value::Bool(value) => Ok(value),
            ref other => Err(mismatch("boolean", other)),
        }
    }

    /// Returns the value as a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::TypeMismatch`] for any other element type.
    pub fn as_str(&self) -> Result<&'a str, TlvError> {
        match self.value {
            Value::Utf8(value) => Ok(value),
            ref other => Err(mismatch("utf-8 string", other)),
        }
    }

    /// Returns the value as an octet string.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::TypeMismatch`] for any other element type.
    pub fn as_bytes(&self) -> Result<&'a [u8], TlvError> {
        match self.value {
            Value::Bytes(value) => Ok(value),
            ref other => Err(mismatch("octet string", other)),
        }
    }

    /// Returns `true` when the element is null.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self.value, Value::Null)
    }

    /// Returns a reader over the members of a container of the given kind.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::TypeMismatch`] when the element is not a container
    /// of `kind`.
    pub fn container(&self, kind: ContainerKind) -> Result<TlvReader<'a>, TlvError> {
        match &self.value {
            Value::Container(found, members) if *found == kind => Ok(members.clone()),
            other => Err(mismatch(kind.name(), other)),
        }
    }

    /// Returns a reader over the members of a structure.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::TypeMismatch`] when the element is not a structure.
    pub fn as_structure(&self) -> Result<TlvReader<'a>, TlvError> {
        self.container(ContainerKind::Structure)
    }

    /// Returns a reader over the members of an array.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::TypeMismatch`] when the element is not an array.
    pub fn as_array(&self) -> Result<TlvReader<'a>, TlvError> {
        self.container(ContainerKind::Array)
    }

    /// Returns a reader over the members of a list.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::TypeMismatch`] when the element is not a list.
    pub fn as_list(&self) -> Result<TlvReader<'a>, TlvError> {
        self.container(ContainerKind::List)
    }
}

/// Reads TLV elements sequentially from a byte slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlvReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> TlvReader<'a> {
    /// Creates a reader over `data`.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Decodes `data` as exactly one element.
    ///
    /// # Errors
    ///
    /// Returns any decoding error, [`TlvError::Truncated`] when `data` is
    /// empty, or [`TlvError::TrailingBytes`] when bytes follow the element.
    pub fn read_single(data: &'a [u8]) -> Result<Element<'a>, TlvError> {
        let mut reader = Self::new(data);
        let element = reader.next_element()?.ok_or(TlvError::Truncated)?;
        let remaining = reader.remaining();
        if remaining != 0 {
            return Err(TlvError::TrailingBytes { remaining });
        }
        Ok(element)
    }

    /// Number of unread bytes.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Returns `true` when every element has been read.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Decodes the next element, or returns `None` at the end of the input.
    ///
    /// # Errors
    ///
    /// Returns a [`TlvError`] when the next element is malformed.
    pub fn next_element(&mut self) -> Result<Option<Element<'a>>, TlvError> {
        if self.is_exhausted() {
            return Ok(None);
        }
        let start = self.position;
        let head = parse_head(self.data, start)?;
        if head.element_type == TYPE_END_OF_CONTAINER {
            return Err(TlvError::UnexpectedEndOfContainer);
        }
        let (value, raw_end) = match ContainerKind::from_element_type(head.element_type) {
            Some(kind) => {
                let close = find_container_end(self.data, head.value_start)?;
                let members = slice(self.data, head.value_start, close)?;
                (Value::Container(kind, TlvReader::new(members)), close + 1)
            }
            None => (decode_scalar(self.data, &head)?, head.value_end),
        };
        self.position = raw_end;
        Ok(Some(Element {
            tag: head.tag,
            element_type: head.element_type,
            value,
            raw: slice(self.data, start, raw_end)?,
            body: slice(self.data, head.body_start, raw_end)?,
        }))
    }
}

/// Location of an element's parts within the input.
struct Head {
    tag: Tag,
    element_type: u8,
    /// First byte after the tag (start of any length prefix).
    body_start: usize,
    /// First byte of the value proper.
    value_start: usize,
    /// One past the last value byte; equals `value_start` for containers.
    value_end: usize,
}

fn parse_head(data: &[u8], start: usize) -> Result<Head, TlvError> {
    let control = byte_at(data, start)?;
    let element_type = control & ELEMENT_TYPE_MASK;
    let (tag, body_start) = match control & TAG_CONTROL_MASK {
        TAG_ANONYMOUS => (Tag::Anonymous, start + 1),
        TAG_CONTEXT => (Tag::Context(byte_at(data, start + 1)?), start + 2),
        other => return Err(TlvError::UnsupportedTagControl(other)),
    };
    let (value_start, value_len) = match element_type {
        TYPE_INT8 | TYPE_UINT8 => (body_start, 1),
        TYPE_INT16 | TYPE_UINT16 => (body_start, 2),
        TYPE_INT32 | TYPE_UINT32 | TYPE_FLOAT32 => (body_start, 4),
        TYPE_INT64 | TYPE_UINT64 | TYPE_FLOAT64 => (body_start, 8),
        TYPE_FALSE | TYPE_TRUE | TYPE_NULL | TYPE_END_OF_CONTAINER => (body_start, 0),
        TYPE_UTF8_1..=TYPE_UTF8_8 => sized_value(data, body_start, element_type - TYPE_UTF8_1)?,
        TYPE_BYTES_1..=TYPE_BYTES_8 => {
            sized_value(data, body_start, element_type - TYPE_BYTES_1)?
        }
        other if ContainerKind::from_element_type(other).is_some() => (body_start, 0),
        other => return Err(TlvError::InvalidElementType(other)),
    };
    let value_end = value_start
        .checked_add(value_len)
        .ok_or(TlvError::Truncated)?;
    if value_end > data.len() {
        return Err(TlvError::Truncated);
    }
    Ok(Head {
        tag,
        element_type,
        body_start,
        value_start,
        value_end,
    })
}

/// Reads the length prefix of a string element (`width_code` 0..=3 selects
/// 1, 2, 4 or 8 length bytes) and returns the value start and length.
fn sized_value(data: &[u8], body_start: usize, width_code: u8) -> Result<(usize, usize), TlvError> {
    let width = 1_usize << width_code;
    let encoded = read_unsigned(data, body_start, width)?;
    let length = usize::try_from(encoded).map_err(|_| TlvError::Truncated)?;
    Ok((body_start + width, length))
}

/// Returns the index of the end-of-container byte closing a container whose
/// members start at `members_start`.
fn find_container_end(data: &[u8], members_start: usize) -> Result<usize, TlvError> {
    let mut depth = 0_usize;
    let mut cursor = members_start;
    loop {
        let head = parse_head(data, cursor)?;
        if head.element_type == TYPE_END_OF_CONTAINER {
            if depth == 0 {
                return Ok(cursor);
            }
            depth -= 1;
        } else if ContainerKind::from_element_type(head.element_type).is_some() {
            depth += 1;
        }
        cursor = head.value_end;
    }
}

fn decode_scalar<'a>(data: &'a [u8], head: &Head) -> Result<Value<'a>, TlvError> {
    let width = head.value_end - head.value_start;
    Ok(match head.element_type {
        TYPE_INT8 | TYPE_INT16 | TYPE_INT32 | TYPE_INT64 => {
            Value::Signed(read_signed(data, head.value_start, width)?)
        }
        TYPE_UINT8 | TYPE_UINT16 | TYPE_UINT32 | TYPE_UINT64 => {
            Value::Unsigned(read_unsigned(data, head.value_start, width)?)
        }
        TYPE_FALSE => Value::Bool(false),
        TYPE_TRUE => Value::Bool(true),
        TYPE_NULL => Value::Null,
        TYPE_FLOAT32 => {
            let bytes = fixed::<4>(data, head.value_start)?;
            Value::Float(f64::from(f32::from_le_bytes(bytes)))
        }
        TYPE_FLOAT64 => Value::Float(f64::from_le_bytes(fixed::<8>(data, head.value_start)?)),
        TYPE_UTF8_1..=TYPE_UTF8_8 => {
            let bytes = slice(data, head.value_start, head.value_end)?;
            Value::Utf8(std::str::from_utf8(bytes).map_err(|_| TlvError::InvalidUtf8)?)
        }
        TYPE_BYTES_1..=TYPE_BYTES_8 => {
            Value::Bytes(slice(data, head.value_start, head.value_end)?)
        }
        other => return Err(TlvError::InvalidElementType(other)),
    })
}

fn read_unsigned(data: &[u8], start: usize, width: usize) -> Result<u64, TlvError> {
    Ok(match width {
        1 => u64::from(u8::from_le_bytes(fixed::<1>(data, start)?)),
        2 => u64::from(u16::from_le_bytes(fixed::<2>(data, start)?)),
        4 => u64::from(u32::from_le_bytes(fixed::<4>(data, start)?)),
        _ => u64::from_le_bytes(fixed::<8>(data, start)?),
    })
}

fn read_signed(data: &[u8], start: usize, width: usize) -> Result<i64, TlvError> {
    Ok(match width {
        1 => i64::from(i8::from_le_bytes(fixed::<1>(data, start)?)),
        2 => i64::from(i16::from_le_bytes(fixed::<2>(data, start)?)),
        4 => i64::from(i32::from_le_bytes(fixed::<4>(data, start)?)),
        _ => i64::from_le_bytes(fixed::<8>(data, start)?),
    })
}

fn fixed<const N: usize>(data: &[u8], start: usize) -> Result<[u8; N], TlvError> {
    slice(data, start, start + N)?
        .try_into()
        .map_err(|_| TlvError::Truncated)
}

fn slice(data: &[u8], start: usize, end: usize) -> Result<&[u8], TlvError> {
    data.get(start..end).ok_or(TlvError::Truncated)
}

fn byte_at(data: &[u8], index: usize) -> Result<u8, TlvError> {
    data.get(index).copied().ok_or(TlvError::Truncated)
}

fn narrow_unsigned<T: TryFrom<u64>>(value: u64, target: &'static str) -> Result<T, TlvError> {
    T::try_from(value).map_err(|_| TlvError::OutOfRange {
        value: i128::from(value),
        target,
    })
}

fn mismatch(expected: &'static str, found: &Value<'_>) -> TlvError {
    TlvError::TypeMismatch {
        expected,
        found: found.type_name(),
    }
}

#[cfg(test)]
mod tests;
