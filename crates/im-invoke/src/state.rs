//! Lifecycle states of an invoke interaction.

use strum::Display;

/// Phase of the invoke interaction.
///
/// States advance strictly in order, except that `AddedCommand` loops back to
/// `Preparing` for each further command in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum EngineState {
    /// No request has been received.
    #[default]
    Idle,
    /// The request was accepted and no command has been dispatched yet.
    NewResponseMessage,
    /// A command is being checked before dispatch.
    Preparing,
    /// A command handler is running.
    AddingCommand,
    /// The handler for the current command has returned.
    AddedCommand,
    /// Buffered response messages are being finalized and sent.
    DispatchResponses,
    /// The exchange has been released.
    AwaitingDestruction,
}

impl EngineState {
    /// Returns `true` once the interaction has been closed.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::AwaitingDestruction)
    }
}
