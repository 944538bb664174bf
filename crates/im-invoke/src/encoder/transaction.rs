//! Rollback guard for partially written response entries.

use im_tlv::{Checkpoint, TlvWriter};
use tracing::trace;

use super::ENCODER_TARGET;
use crate::errors::InvokeError;
use crate::message::finish_command_data;
use crate::path::CommandRef;

/// Response message currently being filled.
#[derive(Debug)]
pub(crate) struct OpenMessage {
    pub(crate) writer: TlvWriter,
    pub(crate) entries: usize,
}

/// One entry being written into an [`OpenMessage`].
///
/// Dropping the transaction without committing restores the message to the
/// state it had when the transaction began.
#[derive(Debug)]
pub(crate) struct ResponseTransaction<'a> {
    message: &'a mut OpenMessage,
    checkpoint: Checkpoint,
    committed: bool,
}

impl<'a> ResponseTransaction<'a> {
    pub(crate) fn begin(message: &'a mut OpenMessage) -> Self {
        let checkpoint = message.writer.checkpoint();
        Self {
            message,
            checkpoint,
            committed: false,
        }
    }

    pub(crate) const fn writer(&mut self) -> &mut TlvWriter {
        &mut self.message.writer
    }

    /// Writes the ref, closes a command-data entry and commits it.
    pub(crate) fn finish_response(
        mut self,
        command_ref: Option<CommandRef>,
    ) -> Result<(), InvokeError> {
        finish_command_data(self.writer(), command_ref)?;
        self.commit();
        Ok(())
    }

    pub(crate) fn commit(mut self) {
        self.committed = true;
        self.message.entries += 1;
    }
}

impl Drop for ResponseTransaction<'_> {
    fn drop(&mut self) {
        if !self.committed {
            trace!(
                target: ENCODER_TARGET,
                discarded = self.message.writer.len().saturating_sub(self.checkpoint.len()),
                "rolling back partial response entry"
            );
            self.message.writer.rollback(&self.checkpoint);
        }
    }
}
