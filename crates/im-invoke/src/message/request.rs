//! Invoke request decoding and encoding.

use im_config::DEFAULT_INTERACTION_MODEL_REVISION;
use im_tlv::{ContainerKind, Element, Tag, TlvError, TlvReader, TlvWriter};

use super::{REVISION_TAG, read_path, required, write_path};
use crate::errors::MessageError;
use crate::path::{CommandPath, CommandRef};

const SUPPRESS_RESPONSE: Tag = Tag::Context(0);
const TIMED_REQUEST: Tag = Tag::Context(1);
const INVOKE_REQUESTS: Tag = Tag::Context(2);

const DATA_PATH: Tag = Tag::Context(0);
const DATA_FIELDS: Tag = Tag::Context(1);
const DATA_REF: Tag = Tag::Context(2);

/// Fields of one command, borrowed from the request payload.
///
/// An absent fields element reads as an empty structure.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommandFields<'a> {
    element: Option<Element<'a>>,
}

impl<'a> CommandFields<'a> {
    /// Fields of a command sent without a payload.
    #[must_use]
    pub const fn empty() -> Self {
        Self { element: None }
    }

    /// Wraps a decoded fields element.
    #[must_use]
    pub const fn new(element: Element<'a>) -> Self {
        Self {
            element: Some(element),
        }
    }

    /// Returns `true` when the request carried a fields element.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.element.is_some()
    }

    /// The fields element as it appeared in the request.
    #[must_use]
    pub const fn element(&self) -> Option<&Element<'a>> {
        self.element.as_ref()
    }

    /// Returns a reader over the members of the fields structure.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::TypeMismatch`] when the fields element is not a
    /// structure.
    pub fn reader(&self) -> Result<TlvReader<'a>, TlvError> {
        self.element
            .as_ref()
            .map_or_else(|| Ok(TlvReader::new(&[])), Element::as_structure)
    }

    /// Returns `true` when the fields are absent or form a structure.
    #[must_use]
    pub fn is_structure(&self) -> bool {
        self.element.as_ref().is_none_or(|element| {
            matches!(
                element.value(),
                im_tlv::Value::Container(ContainerKind::Structure, _)
            )
        })
    }
}

/// One `CommandDataIB` entry of a request.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandData<'a> {
    /// Addressed command.
    pub path: CommandPath,
    /// Correlation token echoed in the response.
    pub command_ref: Option<CommandRef>,
    /// Command fields.
    pub fields: CommandFields<'a>,
}

impl<'a> CommandData<'a> {
    fn parse(element: &Element<'a>) -> Result<Self, MessageError> {
        let mut members = element.as_structure()?;
        let mut path = None;
        let mut command_ref = None;
        let mut fields = CommandFields::empty();
        while let Some(member) = members.next_element()? {
            match member.tag() {
                DATA_PATH => path = Some(read_path(&member)?),
                DATA_FIELDS => fields = CommandFields::new(member),
                DATA_REF => command_ref = Some(member.as_u16()?),
                _ => {}
            }
        }
        Ok(Self {
            path: required(path, "CommandPath")?,
            command_ref,
            fields,
        })
    }
}

/// Decoded `InvokeRequestMessage`.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeRequest<'a> {
    /// The client does not want a response.
    pub suppress_response: bool,
    /// The client claims the request is part of a timed interaction.
    pub timed_request: bool,
    /// Commands in request order.
    pub commands: Vec<CommandData<'a>>,
    /// Interaction Model revision of the sender, when present.
    pub revision: Option<u8>,
}

impl<'a> InvokeRequest<'a> {
    /// Decodes a request message. Unknown fields are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError`] when the payload is not well-formed or a
    /// required field is missing.
    pub fn parse(payload: &'a [u8]) -> Result<Self, MessageError> {
        let message = TlvReader::read_single(payload)?;
        let mut members = message.as_structure()?;
        let mut suppress_response = None;
        let mut timed_request = None;
        let mut commands = None;
        let mut revision = None;
        while let Some(member) = members.next_element()? {
            match member.tag() {
                SUPPRESS_RESPONSE => suppress_response = Some(member.as_bool()?),
                TIMED_REQUEST => timed_request = Some(member.as_bool()?),
                INVOKE_REQUESTS => commands = Some(parse_commands(&member)?),
                REVISION_TAG => revision = Some(member.as_u8()?),
                _ => {}
            }
        }
        Ok(Self {
            suppress_response: required(suppress_response, "SuppressResponse")?,
            timed_request: required(timed_request, "TimedRequest")?,
            commands: required(commands, "InvokeRequests")?,
            revision,
        })
    }
}

fn parse_commands<'a>(element: &Element<'a>) -> Result<Vec<CommandData<'a>>, MessageError> {
    let mut entries = element.as_array()?;
    let mut commands = Vec::new();
    while let Some(entry) = entries.next_element()? {
        commands.push(CommandData::parse(&entry)?);
    }
    Ok(commands)
}

/// Command entry used to build a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestCommand {
    path: CommandPath,
    command_ref: Option<CommandRef>,
    fields: Option<Vec<u8>>,
}

impl RequestCommand {
    /// Creates an entry without ref or fields.
    #[must_use]
    pub const fn new(path: CommandPath) -> Self {
        Self {
            path,
            command_ref: None,
            fields: None,
        }
    }

    /// Sets the correlation token.
    #[must_use]
    pub const fn with_ref(mut self, command_ref: CommandRef) -> Self {
        self.command_ref = Some(command_ref);
        self
    }

    /// Sets the fields from one encoded TLV element, usually an anonymous
    /// structure. The element is re-tagged when the request is encoded.
    #[must_use]
    pub fn with_fields(mut self, encoded: Vec<u8>) -> Self {
        self.fields = Some(encoded);
        self
    }

    fn encode(&self, writer: &mut TlvWriter) -> Result<(), TlvError> {
        writer.start_structure(Tag::Anonymous)?;
        write_path(writer, DATA_PATH, &self.path)?;
        if let Some(encoded) = &self.fields {
            let element = TlvReader::read_single(encoded)?;
            writer.copy_element(DATA_FIELDS, &element)?;
        }
        if let Some(command_ref) = self.command_ref {
            writer.put_u64(DATA_REF, u64::from(command_ref))?;
        }
        writer.end_container()
    }
}

/// Builds encoded `InvokeRequestMessage` payloads.
///
/// # Example
///
/// ```
/// use im_invoke::message::{InvokeRequest, InvokeRequestBuilder, RequestCommand};
/// use im_invoke::path::CommandPath;
///
/// let payload = InvokeRequestBuilder::new()
///     .command(RequestCommand::new(CommandPath::unicast(1, 0x0006, 0x01)))
///     .encode()?;
/// let request = InvokeRequest::parse(&payload)?;
/// assert_eq!(request.commands.len(), 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeRequestBuilder {
    suppress_response: bool,
    timed_request: bool,
    revision: u8,
    commands: Vec<RequestCommand>,
}

impl Default for InvokeRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InvokeRequestBuilder {
    /// Creates a builder for an untimed request that expects a response.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            suppress_response: false,
            timed_request: false,
            revision: DEFAULT_INTERACTION_MODEL_REVISION,
            commands: Vec::new(),
        }
    }

    /// Sets the `SuppressResponse` flag.
    #[must_use]
    pub const fn suppress_response(mut self, suppress: bool) -> Self {
        self.suppress_response = suppress;
        self
    }

    /// Sets the `TimedRequest` flag.
    #[must_use]
    pub const fn timed_request(mut self, timed: bool) -> Self {
        self.timed_request = timed;
        self
    }

    /// Sets the Interaction Model revision written into the message.
    #[must_use]
    pub const fn revision(mut self, revision: u8) -> Self {
        self.revision = revision;
        self
    }

    /// Appends a command entry.
    #[must_use]
    pub fn command(mut self, command: RequestCommand) -> Self {
        self.commands.push(command);
        self
    }

    /// Encodes the request.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError`] when a fields payload is not a single well-formed
    /// element.
    pub fn encode(&self) -> Result<Vec<u8>, TlvError> {
        let mut writer = TlvWriter::unbounded();
        writer.start_structure(Tag::Anonymous)?;
        writer.put_bool(SUPPRESS_RESPONSE, self.suppress_response)?;
        writer.put_bool(TIMED_REQUEST, self.timed_request)?;
        writer.start_array(INVOKE_REQUESTS)?;
        for command in &self.commands {
            command.encode(&mut writer)?;
        }
        writer.end_container()?;
        writer.put_u64(REVISION_TAG, u64::from(self.revision))?;
        writer.end_container()?;
        writer.finish()
    }
}
