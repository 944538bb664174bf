//! Tag forms and element type codes.

/// Mask selecting the tag control bits of a control byte.
pub(crate) const TAG_CONTROL_MASK: u8 = 0xE0;
/// Mask selecting the element type bits of a control byte.
pub(crate) const ELEMENT_TYPE_MASK: u8 = 0x1F;

pub(crate) const TAG_ANONYMOUS: u8 = 0x00;
pub(crate) const TAG_CONTEXT: u8 = 0x20;

pub(crate) const TYPE_INT8: u8 = 0x00;
pub(crate) const TYPE_INT16: u8 = 0x01;
pub(crate) const TYPE_INT32: u8 = 0x02;
pub(crate) const TYPE_INT64: u8 = 0x03;
pub(crate) const TYPE_UINT8: u8 = 0x04;
pub(crate) const TYPE_UINT16: u8 = 0x05;
pub(crate) const TYPE_UINT32: u8 = 0x06;
pub(crate) const TYPE_UINT64: u8 = 0x07;
pub(crate) const TYPE_FALSE: u8 = 0x08;
pub(crate) const TYPE_TRUE: u8 = 0x09;
pub(crate) const TYPE_FLOAT32: u8 = 0x0A;
pub(crate) const TYPE_FLOAT64: u8 = 0x0B;
pub(crate) const TYPE_UTF8_1: u8 = 0x0C;
pub(crate) const TYPE_UTF8_8: u8 = 0x0F;
pub(crate) const TYPE_BYTES_1: u8 = 0x10;
pub(crate) const TYPE_BYTES_8: u8 = 0x13;
pub(crate) const TYPE_NULL: u8 = 0x14;
pub(crate) const TYPE_STRUCTURE: u8 = 0x15;
pub(crate) const TYPE_ARRAY: u8 = 0x16;
pub(crate) const TYPE_LIST: u8 = 0x17;
pub(crate) const TYPE_END_OF_CONTAINER: u8 = 0x18;

/// Tag attached to an element.
///
/// Only the two forms used by Interaction Model messages are supported:
/// anonymous elements and one-byte context-specific tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// No tag; used for top-level messages and array members.
    Anonymous,
    /// Context-specific tag, meaningful within the enclosing structure.
    Context(u8),
}

impl Tag {
    pub(crate) const fn control_bits(self) -> u8 {
        match self {
            Self::Anonymous => TAG_ANONYMOUS,
            Self::Context(_) => TAG_CONTEXT,
        }
    }

    pub(crate) const fn encoded_len(self) -> usize {
        match self {
            Self::Anonymous => 0,
            Self::Context(_) => 1,
        }
    }
}

/// Kind of a TLV container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// Members carry unique tags; order is not significant.
    Structure,
    /// Members are anonymous and ordered.
    Array,
    /// Members are ordered and may be tagged.
    List,
}

impl ContainerKind {
    pub(crate) const fn element_type(self) -> u8 {
        match self {
            Self::Structure => TYPE_STRUCTURE,
            Self::Array => TYPE_ARRAY,
            Self::List => TYPE_LIST,
        }
    }

    pub(crate) const fn from_element_type(element_type: u8) -> Option<Self> {
        match element_type {
            TYPE_STRUCTURE => Some(Self::Structure),
            TYPE_ARRAY => Some(Self::Array),
            TYPE_LIST => Some(Self::List),
            _ => None,
        }
    }

    /// Returns a short human-readable name for diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Structure => "structure",
            Self::Array => "array",
            Self::List => "list",
        }
    }
}
