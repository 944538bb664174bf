//! Invoke Interaction Model messages.
//!
//! Requests are decoded without copying: command fields stay borrowed from the
//! request payload and are handed to handlers as TLV elements. Responses are
//! written entry by entry by the response encoder and can be decoded again
//! with [`InvokeResponse::parse`].

mod request;
mod response;

use im_tlv::{Element, Tag, TlvError, TlvWriter};

use crate::errors::MessageError;
use crate::path::CommandPath;

pub use self::request::{
    CommandData, CommandFields, InvokeRequest, InvokeRequestBuilder, RequestCommand,
};
pub use self::response::{
    InvokeResponse, InvokeResponseEntry, encode_status_response, parse_status_response,
};
pub(crate) use self::response::{
    TRAILER_RESERVE, finish_command_data, finish_response_message, start_command_data,
    start_response_message, write_command_status,
};

/// Tag of the Interaction Model revision field present in every message.
pub(crate) const REVISION_TAG: Tag = Tag::Context(0xFF);

const PATH_ENDPOINT: Tag = Tag::Context(0);
const PATH_CLUSTER: Tag = Tag::Context(1);
const PATH_COMMAND: Tag = Tag::Context(2);

/// Writes a `CommandPathIB` list.
fn write_path(writer: &mut TlvWriter, tag: Tag, path: &CommandPath) -> Result<(), TlvError> {
    writer.start_list(tag)?;
    if let Some(endpoint) = path.endpoint {
        writer.put_u64(PATH_ENDPOINT, u64::from(endpoint))?;
    }
    writer.put_u64(PATH_CLUSTER, u64::from(path.cluster))?;
    writer.put_u64(PATH_COMMAND, u64::from(path.command))?;
    writer.end_container()
}

/// Reads a `CommandPathIB` list; unknown members are skipped.
fn read_path(element: &Element<'_>) -> Result<CommandPath, MessageError> {
    let mut members = element.as_list()?;
    let mut endpoint = None;
    let mut cluster = None;
    let mut command = None;
    while let Some(member) = members.next_element()? {
        match member.tag() {
            PATH_ENDPOINT => endpoint = Some(member.as_u16()?),
            PATH_CLUSTER => cluster = Some(member.as_u32()?),
            PATH_COMMAND => command = Some(member.as_u32()?),
            _ => {}
        }
    }
    Ok(CommandPath {
        endpoint,
        cluster: required(cluster, "Cluster")?,
        command: required(command, "Command")?,
    })
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, MessageError> {
    value.ok_or(MessageError::MissingField { field })
}
