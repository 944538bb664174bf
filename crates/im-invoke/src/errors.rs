//! Error types raised while handling an invoke interaction.

use im_tlv::TlvError;
use thiserror::Error;

use crate::path::ConcreteCommandPath;
use crate::state::EngineState;
use crate::status::{Status, StatusIb};

/// Errors raised while building or sending the invoke response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokeError {
    /// The transport could not provide a response buffer.
    #[error("no response buffer available")]
    BufferUnavailable,
    /// An earlier failure discarded the response for this exchange.
    #[error("the response for this exchange was dropped")]
    ResponseDropped,
    /// A status entry did not fit in an empty response message.
    #[error("status for {path} does not fit in an empty response message")]
    StatusTooLarge {
        /// Path whose status could not be encoded.
        path: ConcreteCommandPath,
    },
    /// The command already has a response, or was handed to a
    /// [`CommandHandle`](crate::CommandHandle).
    #[error("command {path} has already been answered")]
    AlreadyAnswered {
        /// Path of the command.
        path: ConcreteCommandPath,
    },
    /// The response was already finalized.
    #[error("cannot add to the response in state {state}")]
    IncorrectState {
        /// State the engine was in.
        state: EngineState,
    },
    /// Encoding failed for a reason other than lack of space.
    #[error("failed to encode response: {0}")]
    Encoding(#[from] TlvError),
}

impl InvokeError {
    /// Protocol status corresponding to the error.
    #[must_use]
    pub const fn status(&self) -> Status {
        match self {
            Self::BufferUnavailable | Self::StatusTooLarge { .. } => Status::ResourceExhausted,
            Self::ResponseDropped
            | Self::AlreadyAnswered { .. }
            | Self::IncorrectState { .. }
            | Self::Encoding(_) => Status::Failure,
        }
    }
}

/// Outcome of a command handler that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandFailure {
    /// The command fields could not be decoded.
    #[error("invalid command fields: {0}")]
    InvalidCommand(#[from] TlvError),
    /// The handler rejected the command with a status.
    #[error("command failed with status {}", .0.status)]
    Status(StatusIb),
}

impl CommandFailure {
    /// Status reported for the failed command.
    #[must_use]
    pub const fn status(&self) -> StatusIb {
        match self {
            Self::InvalidCommand(_) => StatusIb::new(Status::InvalidCommand),
            Self::Status(status) => *status,
        }
    }
}

impl From<Status> for CommandFailure {
    fn from(status: Status) -> Self {
        Self::Status(StatusIb::new(status))
    }
}

/// Errors raised while decoding an Interaction Model message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    /// The message was not well-formed TLV.
    #[error("malformed message: {0}")]
    Tlv(#[from] TlvError),
    /// A required field was absent.
    #[error("missing required field {field}")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },
    /// A status code was not recognised.
    #[error("unknown status code 0x{0:02x}")]
    UnknownStatus(u8),
    /// A response entry carried neither command data nor a status.
    #[error("invoke response entry is empty")]
    EmptyResponseEntry,
}
