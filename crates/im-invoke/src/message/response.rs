//! Invoke response and status response messages.

use im_tlv::{Element, Tag, TlvError, TlvReader, TlvWriter};

use super::{REVISION_TAG, read_path, required, write_path};
use crate::errors::MessageError;
use crate::path::{CommandId, CommandPath, CommandRef, ConcreteCommandPath};
use crate::status::{Status, StatusIb};

const SUPPRESS_RESPONSE: Tag = Tag::Context(0);
const INVOKE_RESPONSES: Tag = Tag::Context(1);
const MORE_CHUNKED_MESSAGES: Tag = Tag::Context(2);

const RESPONSE_COMMAND: Tag = Tag::Context(0);
const RESPONSE_STATUS: Tag = Tag::Context(1);

const ENTRY_PATH: Tag = Tag::Context(0);
const DATA_FIELDS: Tag = Tag::Context(1);
const STATUS_IB: Tag = Tag::Context(1);
const ENTRY_REF: Tag = Tag::Context(2);

const STATUS_CODE: Tag = Tag::Context(0);
const STATUS_CLUSTER: Tag = Tag::Context(1);

const STATUS_RESPONSE_STATUS: Tag = Tag::Context(0);

/// Bytes kept free in every response message for its trailer: the
/// `MoreChunkedMessages` flag (2) and the revision (3).
pub(crate) const TRAILER_RESERVE: usize = 5;

/// Opens an `InvokeResponseMessage` and its `InvokeResponses` array, and
/// reserves room for the trailer.
pub(crate) fn start_response_message(writer: &mut TlvWriter) -> Result<(), TlvError> {
    writer.start_structure(Tag::Anonymous)?;
    writer.put_bool(SUPPRESS_RESPONSE, false)?;
    writer.start_array(INVOKE_RESPONSES)?;
    writer.reserve(TRAILER_RESERVE)
}

/// Closes a message opened by [`start_response_message`].
pub(crate) fn finish_response_message(
    mut writer: TlvWriter,
    more_chunks: bool,
    revision: u8,
) -> Result<Vec<u8>, TlvError> {
    writer.end_container()?;
    writer.release(TRAILER_RESERVE)?;
    if more_chunks {
        writer.put_bool(MORE_CHUNKED_MESSAGES, true)?;
    }
    writer.put_u64(REVISION_TAG, u64::from(revision))?;
    writer.end_container()?;
    writer.finish()
}

/// Opens a command-data entry and writes its path. The caller writes the
/// fields under `Tag::Context(1)` and then calls [`finish_command_data`].
pub(crate) fn start_command_data(
    writer: &mut TlvWriter,
    path: &ConcreteCommandPath,
    response_command: CommandId,
) -> Result<(), TlvError> {
    writer.start_structure(Tag::Anonymous)?;
    writer.start_structure(RESPONSE_COMMAND)?;
    let response_path = CommandPath::unicast(path.endpoint, path.cluster, response_command);
    write_path(writer, ENTRY_PATH, &response_path)
}

pub(crate) fn finish_command_data(
    writer: &mut TlvWriter,
    command_ref: Option<CommandRef>,
) -> Result<(), TlvError> {
    if let Some(token) = command_ref {
        writer.put_u64(ENTRY_REF, u64::from(token))?;
    }
    writer.end_container()?;
    writer.end_container()
}

/// Writes a complete command-status entry.
pub(crate) fn write_command_status(
    writer: &mut TlvWriter,
    path: &ConcreteCommandPath,
    status: StatusIb,
    command_ref: Option<CommandRef>,
) -> Result<(), TlvError> {
    writer.start_structure(Tag::Anonymous)?;
    writer.start_structure(RESPONSE_STATUS)?;
    write_path(writer, ENTRY_PATH, &CommandPath::from(*path))?;
    writer.start_structure(STATUS_IB)?;
    writer.put_u64(STATUS_CODE, u64::from(status.status.code()))?;
    if let Some(cluster_status) = status.cluster_status {
        writer.put_u64(STATUS_CLUSTER, u64::from(cluster_status))?;
    }
    writer.end_container()?;
    if let Some(token) = command_ref {
        writer.put_u64(ENTRY_REF, u64::from(token))?;
    }
    writer.end_container()?;
    writer.end_container()
}

/// One decoded `InvokeResponseIB`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvokeResponseEntry {
    /// Command response carrying data.
    Command {
        /// Endpoint and cluster of the request, with the response command id.
        path: ConcreteCommandPath,
        /// Correlation token of the request entry.
        command_ref: Option<CommandRef>,
        /// Encoded fields element, including its context tag.
        fields: Option<Vec<u8>>,
    },
    /// Status for a command path.
    Status {
        /// Path of the request entry.
        path: ConcreteCommandPath,
        /// Reported status.
        status: StatusIb,
        /// Correlation token of the request entry.
        command_ref: Option<CommandRef>,
    },
}

impl InvokeResponseEntry {
    /// Path of the entry.
    #[must_use]
    pub const fn path(&self) -> &ConcreteCommandPath {
        match self {
            Self::Command { path, .. } | Self::Status { path, .. } => path,
        }
    }

    /// Correlation token of the entry.
    #[must_use]
    pub const fn command_ref(&self) -> Option<CommandRef> {
        match self {
            Self::Command { command_ref, .. } | Self::Status { command_ref, .. } => *command_ref,
        }
    }

    /// Status of the entry, if it is a status entry.
    #[must_use]
    pub const fn status(&self) -> Option<StatusIb> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Command { .. } => None,
        }
    }

    fn parse(element: &Element<'_>) -> Result<Self, MessageError> {
        let mut members = element.as_structure()?;
        let mut entry = None;
        while let Some(member) = members.next_element()? {
            match member.tag() {
                RESPONSE_COMMAND => entry = Some(parse_command_data(&member)?),
                RESPONSE_STATUS => entry = Some(parse_command_status(&member)?),
                _ => {}
            }
        }
        entry.ok_or(MessageError::EmptyResponseEntry)
    }
}

fn parse_command_data(element: &Element<'_>) -> Result<InvokeResponseEntry, MessageError> {
    let mut members = element.as_structure()?;
    let mut path = None;
    let mut command_ref = None;
    let mut fields = None;
    while let Some(member) = members.next_element()? {
        match member.tag() {
            ENTRY_PATH => path = Some(read_concrete_path(&member)?),
            DATA_FIELDS => fields = Some(member.raw().to_vec()),
            ENTRY_REF => command_ref = Some(member.as_u16()?),
            _ => {}
        }
    }
    Ok(InvokeResponseEntry::Command {
        path: required(path, "CommandPath")?,
        command_ref,
        fields,
    })
}

fn parse_command_status(element: &Element<'_>) -> Result<InvokeResponseEntry, MessageError> {
    let mut members = element.as_structure()?;
    let mut path = None;
    let mut command_ref = None;
    let mut status = None;
    while let Some(member) = members.next_element()? {
        match member.tag() {
            ENTRY_PATH => path = Some(read_concrete_path(&member)?),
            STATUS_IB => status = Some(parse_status_ib(&member)?),
            ENTRY_REF => command_ref = Some(member.as_u16()?),
            _ => {}
        }
    }
    Ok(InvokeResponseEntry::Status {
        path: required(path, "CommandPath")?,
        status: required(status, "StatusIB")?,
        command_ref,
    })
}

fn parse_status_ib(element: &Element<'_>) -> Result<StatusIb, MessageError> {
    let mut members = element.as_structure()?;
    let mut status = None;
    let mut cluster_status = None;
    while let Some(member) = members.next_element()? {
        match member.tag() {
            STATUS_CODE => status = Some(status_from_code(member.as_u8()?)?),
            STATUS_CLUSTER => cluster_status = Some(member.as_u8()?),
            _ => {}
        }
    }
    Ok(StatusIb {
        status: required(status, "Status")?,
        cluster_status,
    })
}

fn read_concrete_path(element: &Element<'_>) -> Result<ConcreteCommandPath, MessageError> {
    read_path(element)?
        .concrete()
        .ok_or(MessageError::MissingField { field: "Endpoint" })
}

fn status_from_code(code: u8) -> Result<Status, MessageError> {
    Status::from_repr(code).ok_or(MessageError::UnknownStatus(code))
}

/// Decoded `InvokeResponseMessage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeResponse {
    /// Echo of the suppress flag; always `false` on messages that are sent.
    pub suppress_response: bool,
    /// Entries in the order they were added.
    pub responses: Vec<InvokeResponseEntry>,
    /// Further messages follow this one.
    pub more_chunks: bool,
    /// Interaction Model revision of the sender, when present.
    pub revision: Option<u8>,
}

impl InvokeResponse {
    /// Decodes a response message.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError`] when the payload is not a well-formed
    /// response.
    pub fn parse(payload: &[u8]) -> Result<Self, MessageError> {
        let message = TlvReader::read_single(payload)?;
        let mut members = message.as_structure()?;
        let mut suppress_response = false;
        let mut responses = None;
        let mut more_chunks = false;
        let mut revision = None;
        while let Some(member) = members.next_element()? {
            match member.tag() {
                SUPPRESS_RESPONSE => suppress_response = member.as_bool()?,
                INVOKE_RESPONSES => responses = Some(parse_entries(&member)?),
                MORE_CHUNKED_MESSAGES => more_chunks = member.as_bool()?,
                REVISION_TAG => revision = Some(member.as_u8()?),
                _ => {}
            }
        }
        Ok(Self {
            suppress_response,
            responses: required(responses, "InvokeResponses")?,
            more_chunks,
            revision,
        })
    }
}

fn parse_entries(element: &Element<'_>) -> Result<Vec<InvokeResponseEntry>, MessageError> {
    let mut entries = element.as_array()?;
    let mut responses = Vec::new();
    while let Some(entry) = entries.next_element()? {
        responses.push(InvokeResponseEntry::parse(&entry)?);
    }
    Ok(responses)
}

/// Encodes a `StatusResponseMessage` reporting a top-level status.
///
/// # Errors
///
/// Never fails in practice; the signature mirrors the other encoders.
pub fn encode_status_response(status: Status, revision: u8) -> Result<Vec<u8>, TlvError> {
    let mut writer = TlvWriter::new(8);
    writer.start_structure(Tag::Anonymous)?;
    writer.put_u64(STATUS_RESPONSE_STATUS, u64::from(status.code()))?;
    writer.put_u64(REVISION_TAG, u64::from(revision))?;
    writer.end_container()?;
    writer.finish()
}

/// Decodes a `StatusResponseMessage` and returns its status.
///
/// # Errors
///
/// Returns [`MessageError`] when the payload is malformed, lacks a status or
/// carries an unknown status code.
pub fn parse_status_response(payload: &[u8]) -> Result<Status, MessageError> {
    let message = TlvReader::read_single(payload)?;
    let mut members = message.as_structure()?;
    let mut status = None;
    while let Some(member) = members.next_element()? {
        if member.tag() == STATUS_RESPONSE_STATUS {
            status = Some(status_from_code(member.as_u8()?)?);
        }
    }
    required(status, "Status")
}
