//! Exchange transport collaborator.

use thiserror::Error;

use crate::access::SubjectDescriptor;
use crate::path::GroupId;

/// Failure reported by the transport while sending a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to send response message: {message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    /// Creates an error with a description of the failure.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Description of the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Session and messaging layer carrying the invoke exchange.
pub trait ExchangeTransport {
    /// Provides an empty buffer for one response message of at most
    /// `max_size` bytes, or `None` when no buffer is available.
    fn allocate_buffer(&mut self, max_size: usize) -> Option<Vec<u8>>;

    /// Sends one encoded response message.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the message could not be sent.
    fn send(&mut self, message: Vec<u8>) -> Result<(), TransportError>;

    /// Notifies the transport that the response was dropped.
    fn response_dropped(&mut self);

    /// Notifies the transport that the engine is done with the exchange.
    fn on_done(&mut self);
}

/// How the request reached the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Addressing {
    /// Sent to this node over a session.
    Unicast,
    /// Multicast to a group; the id comes from the message destination.
    Group(GroupId),
}

/// Properties of the exchange that delivered the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExchangeContext {
    /// Accessing subject.
    pub subject: SubjectDescriptor,
    /// Addressing mode of the request.
    pub addressing: Addressing,
}

impl ExchangeContext {
    /// Unicast exchange for `subject`.
    #[must_use]
    pub const fn unicast(subject: SubjectDescriptor) -> Self {
        Self {
            subject,
            addressing: Addressing::Unicast,
        }
    }

    /// Group exchange for `group` on the subject's fabric.
    #[must_use]
    pub const fn group(subject: SubjectDescriptor, group: GroupId) -> Self {
        Self {
            subject,
            addressing: Addressing::Group(group),
        }
    }

    /// Group the request was addressed to, if any.
    #[must_use]
    pub const fn group_id(&self) -> Option<GroupId> {
        match self.addressing {
            Addressing::Group(group) => Some(group),
            Addressing::Unicast => None,
        }
    }
}
