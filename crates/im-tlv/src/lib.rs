//! Tag/length/value codec used by the Interaction Model message layer.
//!
//! Every element starts with a control byte whose upper three bits select the
//! tag form and whose lower five bits select the element type. Integers are
//! little-endian and written at their minimal width. Containers (structures,
//! arrays and lists) are closed by a dedicated end-of-container element.
//!
//! The crate provides two halves:
//!
//! - [`TlvWriter`] encodes into a bounded buffer. Each open container keeps one
//!   byte reserved so closing it never fails, callers may reserve extra bytes
//!   for trailers, and [`TlvWriter::checkpoint`] / [`TlvWriter::rollback`]
//!   restore the writer to an earlier state after a failed partial encode.
//! - [`TlvReader`] walks encoded bytes element by element, exposing containers
//!   as nested readers and the raw bytes of every element so that payloads can
//!   be handed on without re-encoding.
//!
//! # Example
//!
//! ```
//! use im_tlv::{Tag, TlvReader, TlvWriter};
//!
//! let mut writer = TlvWriter::new(64);
//! writer.start_structure(Tag::Anonymous)?;
//! writer.put_u64(Tag::Context(0), 42)?;
//! writer.put_bool(Tag::Context(1), true)?;
//! writer.end_container()?;
//! let bytes = writer.finish()?;
//!
//! let element = TlvReader::read_single(&bytes)?;
//! let mut fields = element.as_structure()?;
//! let first = fields.next_element()?.expect("first field");
//! assert_eq!(first.tag(), Tag::Context(0));
//! assert_eq!(first.as_u64()?, 42);
//! # Ok::<(), im_tlv::TlvError>(())
//! ```

#![expect(
    clippy::little_endian_bytes,
    reason = "TLV integers and floats are little-endian on the wire"
)]

mod element;
mod error;
mod reader;
mod writer;

pub use self::element::{ContainerKind, Tag};
pub use self::error::TlvError;
pub use self::reader::{Element, TlvReader, Value};
pub use self::writer::{Checkpoint, TlvWriter};
