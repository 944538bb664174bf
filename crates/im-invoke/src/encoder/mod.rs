//! Response encoding with chunking and rollback.
//!
//! The encoder owns the response message being filled and the finished
//! chunks waiting to be sent. Buffers are requested from the transport only
//! when the first entry is added, so suppressed and group exchanges never
//! allocate. Every entry is written inside a [`ResponseTransaction`]; a
//! partially written entry is rolled back before the next one is attempted.

mod transaction;

use im_tlv::{Tag, TlvError, TlvWriter};
use tracing::{debug, error, warn};

use self::transaction::{OpenMessage, ResponseTransaction};
use crate::cluster::CommandResponse;
use crate::errors::InvokeError;
use crate::limits::EngineLimits;
use crate::message::{
    finish_response_message, start_command_data, start_response_message, write_command_status,
};
use crate::path::{CommandId, ConcreteCommandPath};
use crate::registry::PathRegistryEntry;
use crate::status::{Status, StatusIb};
use crate::transport::ExchangeTransport;

pub(crate) const ENCODER_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::encoder");

/// Tag of the fields element inside a command-data entry.
const RESPONSE_FIELDS: Tag = Tag::Context(1);

#[derive(Debug)]
pub(crate) struct ResponseEncoder {
    max_response_size: usize,
    revision: u8,
    suppressed: bool,
    dropped: bool,
    current: Option<OpenMessage>,
    chunks: Vec<Vec<u8>>,
}

impl ResponseEncoder {
    pub(crate) const fn new(limits: &EngineLimits) -> Self {
        Self {
            max_response_size: limits.max_response_size,
            revision: limits.interaction_model_revision,
            suppressed: false,
            dropped: false,
            current: None,
            chunks: Vec::new(),
        }
    }

    /// Discards every entry added from now on.
    pub(crate) const fn suppress(&mut self) {
        self.suppressed = true;
    }

    pub(crate) const fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    pub(crate) const fn is_dropped(&self) -> bool {
        self.dropped
    }

    /// Opens a command-data entry for `path` in the current message.
    ///
    /// The returned transaction is positioned where the fields element goes;
    /// the entry is discarded unless it is completed with
    /// [`ResponseTransaction::finish_response`].
    pub(crate) fn prepare_response(
        &mut self,
        transport: &mut dyn ExchangeTransport,
        path: &ConcreteCommandPath,
        response_command: CommandId,
    ) -> Result<ResponseTransaction<'_>, InvokeError> {
        let message = self.open_message(transport)?;
        let mut transaction = ResponseTransaction::begin(message);
        start_command_data(transaction.writer(), path, response_command)?;
        Ok(transaction)
    }

    /// Writes a complete status entry into the current message.
    pub(crate) fn prepare_status(
        &mut self,
        transport: &mut dyn ExchangeTransport,
        entry: &PathRegistryEntry,
        status: StatusIb,
    ) -> Result<(), InvokeError> {
        let message = self.open_message(transport)?;
        let mut transaction = ResponseTransaction::begin(message);
        write_command_status(transaction.writer(), &entry.path, status, entry.command_ref)?;
        transaction.commit();
        Ok(())
    }

    /// Adds a data response, chunking or degrading to a `Failure` status
    /// when it does not fit or fails to encode.
    pub(crate) fn add_response(
        &mut self,
        transport: &mut dyn ExchangeTransport,
        entry: &PathRegistryEntry,
        response: &dyn CommandResponse,
    ) -> Result<(), InvokeError> {
        if self.suppressed {
            return Ok(());
        }
        let mut attempt = self.try_response(transport, entry, response)?;
        if matches!(attempt, Attempt::Full) && self.current_entries() > 0 {
            self.start_next_chunk()?;
            attempt = self.try_response(transport, entry, response)?;
        }
        match attempt {
            Attempt::Written => return Ok(()),
            Attempt::Full => warn!(
                target: ENCODER_TARGET,
                path = %entry.path,
                "response does not fit in an empty message, reporting failure instead"
            ),
            Attempt::Malformed(cause) => warn!(
                target: ENCODER_TARGET,
                path = %entry.path,
                error = %cause,
                "response failed to encode, reporting failure instead"
            ),
        }
        self.add_status(transport, entry, StatusIb::new(Status::Failure))
    }

    /// Adds a status entry, chunking when the current message is full.
    ///
    /// A status that does not fit even an empty message drops the whole
    /// response.
    pub(crate) fn add_status(
        &mut self,
        transport: &mut dyn ExchangeTransport,
        entry: &PathRegistryEntry,
        status: StatusIb,
    ) -> Result<(), InvokeError> {
        if self.suppressed {
            return Ok(());
        }
        if fits(self.prepare_status(transport, entry, status))? {
            return Ok(());
        }
        if self.current_entries() > 0 {
            self.start_next_chunk()?;
            if fits(self.prepare_status(transport, entry, status))? {
                return Ok(());
            }
        }
        error!(
            target: ENCODER_TARGET,
            path = %entry.path,
            status = %status.status,
            "status does not fit in an empty response message"
        );
        self.drop_response(transport);
        Err(InvokeError::StatusTooLarge { path: entry.path })
    }

    /// Closes the current message, if any, and queues it for sending.
    pub(crate) fn finalize(&mut self, has_more: bool) -> Result<(), InvokeError> {
        if let Some(message) = self.current.take() {
            if message.entries == 0 {
                debug!(target: ENCODER_TARGET, "discarding empty response message");
                return Ok(());
            }
            let encoded = finish_response_message(message.writer, has_more, self.revision)?;
            debug!(
                target: ENCODER_TARGET,
                entries = message.entries,
                bytes = encoded.len(),
                more_chunks = has_more,
                "finalized response message"
            );
            self.chunks.push(encoded);
        }
        Ok(())
    }

    /// Hands over the finalized messages in the order they were built.
    pub(crate) fn take_messages(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.chunks)
    }

    /// Discards everything encoded so far and refuses further entries.
    pub(crate) fn drop_response(&mut self, transport: &mut dyn ExchangeTransport) {
        if self.dropped {
            return;
        }
        warn!(
            target: ENCODER_TARGET,
            discarded_messages = self.chunks.len() + usize::from(self.current.is_some()),
            "dropping invoke response"
        );
        self.dropped = true;
        self.current = None;
        self.chunks.clear();
        transport.response_dropped();
    }

    fn try_response(
        &mut self,
        transport: &mut dyn ExchangeTransport,
        entry: &PathRegistryEntry,
        response: &dyn CommandResponse,
    ) -> Result<Attempt, InvokeError> {
        let written = self
            .prepare_response(transport, &entry.path, response.command_id())
            .and_then(|mut transaction| {
                response.encode_to(transaction.writer(), RESPONSE_FIELDS)?;
                transaction.finish_response(entry.command_ref)
            });
        match written {
            Ok(()) => Ok(Attempt::Written),
            Err(InvokeError::Encoding(cause)) if cause.is_buffer_exhausted() => Ok(Attempt::Full),
            Err(InvokeError::Encoding(cause)) => Ok(Attempt::Malformed(cause)),
            Err(other) => Err(other),
        }
    }

    fn start_next_chunk(&mut self) -> Result<(), InvokeError> {
        self.finalize(true)?;
        debug!(
            target: ENCODER_TARGET,
            chunks = self.chunks.len(),
            "response message full, continuing in a new chunk"
        );
        Ok(())
    }

    fn current_entries(&self) -> usize {
        self.current.as_ref().map_or(0, |message| message.entries)
    }

    fn open_message(
        &mut self,
        transport: &mut dyn ExchangeTransport,
    ) -> Result<&mut OpenMessage, InvokeError> {
        if self.dropped {
            return Err(InvokeError::ResponseDropped);
        }
        let message = match self.current.take() {
            Some(message) => message,
            None => self.allocate(transport)?,
        };
        Ok(self.current.insert(message))
    }

    fn allocate(
        &mut self,
        transport: &mut dyn ExchangeTransport,
    ) -> Result<OpenMessage, InvokeError> {
        let Some(buffer) = transport.allocate_buffer(self.max_response_size) else {
            error!(
                target: ENCODER_TARGET,
                size = self.max_response_size,
                "transport has no response buffer available"
            );
            self.drop_response(transport);
            return Err(InvokeError::BufferUnavailable);
        };
        let mut writer = TlvWriter::with_buffer(buffer, self.max_response_size);
        start_response_message(&mut writer)?;
        Ok(OpenMessage { writer, entries: 0 })
    }
}

/// Outcome of writing one data response.
#[derive(Debug)]
enum Attempt {
    Written,
    Full,
    Malformed(TlvError),
}

/// Maps buffer exhaustion to `Ok(false)` so the caller can retry elsewhere.
fn fits(written: Result<(), InvokeError>) -> Result<bool, InvokeError> {
    match written {
        Ok(()) => Ok(true),
        Err(InvokeError::Encoding(cause)) if cause.is_buffer_exhausted() => Ok(false),
        Err(other) => Err(other),
    }
}
