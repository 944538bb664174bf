//! Bounded TLV writer with checkpoint and rollback support.
//!
//! The writer never grows past its byte limit. Each write is checked against
//! the space that remains after subtracting explicit reservations and one
//! byte per open container, so a rejected write leaves the buffer exactly as
//! it was and closing an open container always succeeds.

use crate::element::{
    ContainerKind, TYPE_BYTES_1, TYPE_END_OF_CONTAINER, TYPE_FALSE, TYPE_INT8, TYPE_INT16,
    TYPE_INT32, TYPE_INT64, TYPE_NULL, TYPE_TRUE, TYPE_UINT8, TYPE_UINT16, TYPE_UINT32,
    TYPE_UINT64, TYPE_UTF8_1, Tag,
};
use crate::error::TlvError;
use crate::reader::Element;

/// Saved writer position produced by [`TlvWriter::checkpoint`].
///
/// Restoring a checkpoint truncates everything written after it and restores
/// the reservations and open containers that were in effect at the time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    len: usize,
    reserved: usize,
    open: Vec<ContainerKind>,
}

impl Checkpoint {
    /// Number of bytes that had been written when the checkpoint was taken.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when the checkpoint was taken on an empty writer.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Encodes TLV elements into a buffer bounded by a byte limit.
#[derive(Debug, Clone)]
pub struct TlvWriter {
    buffer: Vec<u8>,
    limit: usize,
    reserved: usize,
    open: Vec<ContainerKind>,
}

impl TlvWriter {
    /// Creates a writer that accepts at most `limit` bytes.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self::with_buffer(Vec::with_capacity(limit), limit)
    }

    /// Creates a writer with no practical size limit.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            buffer: Vec::new(),
            limit: usize::MAX,
            reserved: 0,
            open: Vec::new(),
        }
    }

    /// Creates a writer reusing `buffer` as storage.
    ///
    /// Any bytes already in the buffer are discarded.
    #[must_use]
    pub fn with_buffer(mut buffer: Vec<u8>, limit: usize) -> Self {
        buffer.clear();
        Self {
            buffer,
            limit,
            reserved: 0,
            open: Vec::new(),
        }
    }

    /// Number of bytes written so far.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` when nothing has been written.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Maximum number of bytes the writer accepts.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Number of containers currently open.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.open.len()
    }

    /// Bytes still available for new elements.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.limit
            .saturating_sub(self.buffer.len() + self.reserved + self.open.len())
    }

    /// Bytes currently set aside by [`TlvWriter::reserve`].
    #[must_use]
    pub const fn reserved(&self) -> usize {
        self.reserved
    }

    /// Encoded bytes written so far.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    /// Sets `bytes` aside so later writes cannot consume them.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::BufferTooSmall`] when fewer than `bytes` remain.
    pub fn reserve(&mut self, bytes: usize) -> Result<(), TlvError> {
        let available = self.remaining();
        if bytes > available {
            return Err(TlvError::BufferTooSmall {
                needed: bytes,
                available,
            });
        }
        self.reserved += bytes;
        Ok(())
    }

    /// Returns previously reserved bytes to the writable space.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::ReservationUnderflow`] when more bytes are released
    /// than are reserved.
    pub fn release(&mut self, bytes: usize) -> Result<(), TlvError> {
        if bytes > self.reserved {
            return Err(TlvError::ReservationUnderflow {
                requested: bytes,
                reserved: self.reserved,
            });
        }
        self.reserved -= bytes;
        Ok(())
    }

    /// Records the current position so it can be restored later.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            len: self.buffer.len(),
            reserved: self.reserved,
            open: self.open.clone(),
        }
    }

    /// Discards everything written after `checkpoint`.
    pub fn rollback(&mut self, checkpoint: &Checkpoint) {
        self.buffer.truncate(checkpoint.len);
        self.reserved = checkpoint.reserved;
        self.open.clone_from(&checkpoint.open);
    }

    /// Writes an unsigned integer at its minimal width.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::BufferTooSmall`] when the element does not fit.
    pub fn put_u64(&mut self, tag: Tag, value: u64) -> Result<(), TlvError> {
        if let Ok(narrow) = u8::try_from(value) {
            self.append(tag, TYPE_UINT8, &[&narrow.to_le_bytes()], 0)
        } else if let Ok(narrow) = u16::try_from(value) {
            self.append(tag, TYPE_UINT16, &[&narrow.to_le_bytes()], 0)
        } else if let Ok(narrow) = u32::try_from(value) {
            self.append(tag, TYPE_UINT32, &[&narrow.to_le_bytes()], 0)
        } else {
            self.append(tag, TYPE_UINT64, &[&value.to_le_bytes()], 0)
        }
    }

    /// Writes a signed integer at its minimal width.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::BufferTooSmall`] when the element does not fit.
    pub fn put_i64(&mut self, tag: Tag, value: i64) -> Result<(), TlvError> {
        if let Ok(narrow) = i8::try_from(value) {
            self.append(tag, TYPE_INT8, &[&narrow.to_le_bytes()], 0)
        } else if let Ok(narrow) = i16::try_from(value) {
            self.append(tag, TYPE_INT16, &[&narrow.to_le_bytes()], 0)
        } else if let Ok(narrow) = i32::try_from(value) {
            self.append(tag, TYPE_INT32, &[&narrow.to_le_bytes()], 0)
        } else {
            self.append(tag, TYPE_INT64, &[&value.to_le_bytes()], 0)
        }
    }

    /// Writes a boolean.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::BufferTooSmall`] when the element does not fit.
    pub fn put_bool(&mut self, tag: Tag, value: bool) -> Result<(), TlvError> {
        let element_type = if value { TYPE_TRUE } else { TYPE_FALSE };
        self.append(tag, element_type, &[], 0)
    }

    /// Writes a null element.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::BufferTooSmall`] when the element does not fit.
    pub fn put_null(&mut self, tag: Tag) -> Result<(), TlvError> {
        self.append(tag, TYPE_NULL, &[], 0)
    }

    /// Writes a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::BufferTooSmall`] when the element does not fit, or
    /// [`TlvError::TooLong`] when the string exceeds a four-byte length.
    pub fn put_str(&mut self, tag: Tag, value: &str) -> Result<(), TlvError> {
        self.put_sized(tag, TYPE_UTF8_1, value.as_bytes())
    }

    /// Writes an octet string.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::BufferTooSmall`] when the element does not fit, or
    /// [`TlvError::TooLong`] when the payload exceeds a four-byte length.
    pub fn put_bytes(&mut self, tag: Tag, value: &[u8]) -> Result<(), TlvError> {
        self.put_sized(tag, TYPE_BYTES_1, value)
    }

    /// Opens a structure container.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::BufferTooSmall`] when the opening element and its
    /// closing byte do not fit.
    pub fn start_structure(&mut self, tag: Tag) -> Result<(), TlvError> {
        self.start_container(tag, ContainerKind::Structure)
    }

    /// Opens an array container.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::BufferTooSmall`] when the opening element and its
    /// closing byte do not fit.
    pub fn start_array(&mut self, tag: Tag) -> Result<(), TlvError> {
        self.start_container(tag, ContainerKind::Array)
    }

    /// Opens a list container.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::BufferTooSmall`] when the opening element and its
    /// closing byte do not fit.
    pub fn start_list(&mut self, tag: Tag) -> Result<(), TlvError> {
        self.start_container(tag, ContainerKind::List)
    }

    /// Opens a container of the given kind.
    ///
    /// One byte stays reserved until the container is closed.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::BufferTooSmall`] when the opening element and its
    /// closing byte do not fit.
    pub fn start_container(&mut self, tag: Tag, kind: ContainerKind) -> Result<(), TlvError> {
        self.append(tag, kind.element_type(), &[], 1)?;
        self.open.push(kind);
        Ok(())
    }

    /// Closes the innermost open container.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::NoOpenContainer`] when no container is open.
    pub fn end_container(&mut self) -> Result<(), TlvError> {
        if self.open.pop().is_none() {
            return Err(TlvError::NoOpenContainer);
        }
        self.buffer.push(TYPE_END_OF_CONTAINER);
        Ok(())
    }

    /// Re-emits a decoded element under a new tag.
    ///
    /// The element body, including any nested container contents, is copied
    /// verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::BufferTooSmall`] when the element does not fit.
    pub fn copy_element(&mut self, tag: Tag, element: &Element<'_>) -> Result<(), TlvError> {
        self.append(tag, element.element_type(), &[element.body()], 0)
    }

    /// Consumes the writer and returns the encoded bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::UnclosedContainer`] when containers are still open.
    pub fn finish(self) -> Result<Vec<u8>, TlvError> {
        if !self.open.is_empty() {
            return Err(TlvError::UnclosedContainer {
                depth: self.open.len(),
            });
        }
        Ok(self.buffer)
    }

    fn put_sized(&mut self, tag: Tag, base_type: u8, payload: &[u8]) -> Result<(), TlvError> {
        let length = payload.len();
        if let Ok(narrow) = u8::try_from(length) {
            self.append(tag, base_type, &[&narrow.to_le_bytes(), payload], 0)
        } else if let Ok(narrow) = u16::try_from(length) {
            self.append(tag, base_type + 1, &[&narrow.to_le_bytes(), payload], 0)
        } else if let Ok(narrow) = u32::try_from(length) {
            self.append(tag, base_type + 2, &[&narrow.to_le_bytes(), payload], 0)
        } else {
            Err(TlvError::TooLong { length })
        }
    }

    fn append(
        &mut self,
        tag: Tag,
        element_type: u8,
        fields: &[&[u8]],
        trailing_reserve: usize,
    ) -> Result<(), TlvError> {
        let body: usize = fields.iter().map(|field| field.len()).sum();
        let needed = 1 + tag.encoded_len() + body + trailing_reserve;
        let available = self.remaining();
        if needed > available {
            return Err(TlvError::BufferTooSmall { needed, available });
        }
        self.buffer.push(tag.control_bits() | element_type);
        if let Tag::Context(number) = tag {
            self.buffer.push(number);
        }
        for field in fields {
            self.buffer.extend_from_slice(field);
        }
        Ok(())
    }
}
