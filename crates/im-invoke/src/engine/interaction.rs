//! Shared interaction state reached by the engine, contexts and handles.

use std::collections::HashSet;

use tracing::{debug, error, trace, warn};

use super::INVOKE_TARGET;
use crate::cluster::CommandResponse;
use crate::encoder::ResponseEncoder;
use crate::errors::InvokeError;
use crate::limits::EngineLimits;
use crate::path::ConcreteCommandPath;
use crate::registry::{PathRegistry, PathRegistryEntry};
use crate::state::EngineState;
use crate::status::StatusIb;
use crate::transport::ExchangeTransport;

pub(crate) struct EngineCore {
    state: EngineState,
    registry: PathRegistry,
    encoder: ResponseEncoder,
    transport: Box<dyn ExchangeTransport>,
    outstanding: usize,
    answered: HashSet<ConcreteCommandPath>,
}

impl EngineCore {
    pub(crate) fn new(limits: &EngineLimits, transport: Box<dyn ExchangeTransport>) -> Self {
        Self {
            state: EngineState::Idle,
            registry: PathRegistry::default(),
            encoder: ResponseEncoder::new(limits),
            transport,
            outstanding: 0,
            answered: HashSet::new(),
        }
    }

    pub(crate) const fn state(&self) -> EngineState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: EngineState) {
        trace!(target: INVOKE_TARGET, from = %self.state, to = %state, "state transition");
        self.state = state;
    }

    pub(crate) const fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub(crate) const fn is_response_dropped(&self) -> bool {
        self.encoder.is_dropped()
    }

    /// Installs the validated paths of an accepted request.
    pub(crate) fn accept(&mut self, registry: PathRegistry, suppress: bool) {
        self.registry = registry;
        if suppress {
            self.encoder.suppress();
        }
        self.set_state(EngineState::NewResponseMessage);
    }

    pub(crate) const fn acquire_work(&mut self) {
        self.outstanding += 1;
    }

    /// Releases one unit of work and closes the interaction when none is
    /// left.
    ///
    /// # Panics
    ///
    /// Panics when no work is outstanding.
    pub(crate) fn release_work(&mut self) {
        assert!(
            self.outstanding > 0,
            "invoke work released more often than it was acquired"
        );
        self.outstanding -= 1;
        if self.outstanding == 0 {
            self.close();
        }
    }

    pub(crate) fn add_response(
        &mut self,
        path: &ConcreteCommandPath,
        response: &dyn CommandResponse,
    ) -> Result<(), InvokeError> {
        self.ensure_open()?;
        if self.encoder.is_suppressed() {
            return Ok(());
        }
        let entry = self.registered(path);
        self.claim(path)?;
        self.encoder
            .add_response(self.transport.as_mut(), &entry, response)
    }

    pub(crate) fn add_status(
        &mut self,
        path: &ConcreteCommandPath,
        status: StatusIb,
    ) -> Result<(), InvokeError> {
        self.ensure_open()?;
        if self.encoder.is_suppressed() {
            return Ok(());
        }
        let entry = self.registered(path);
        self.claim(path)?;
        self.encoder.add_status(self.transport.as_mut(), &entry, status)
    }

    /// Finalizes the response, sends every buffered message and releases
    /// the exchange.
    ///
    /// # Panics
    ///
    /// Panics when work is still outstanding or the interaction was already
    /// closed.
    pub(crate) fn close(&mut self) {
        assert!(
            !self.state.is_closed(),
            "invoke interaction closed more than once"
        );
        assert_eq!(
            self.outstanding, 0,
            "invoke interaction closed with outstanding work"
        );
        self.set_state(EngineState::DispatchResponses);
        if let Err(failure) = self.encoder.finalize(false) {
            error!(target: INVOKE_TARGET, error = %failure, "failed to finalize invoke response");
            self.encoder.drop_response(self.transport.as_mut());
        }
        let messages = self.encoder.take_messages();
        let total = messages.len();
        for (index, message) in messages.into_iter().enumerate() {
            if let Err(failure) = self.transport.send(message) {
                warn!(
                    target: INVOKE_TARGET,
                    error = %failure,
                    sent = index,
                    total,
                    "stopped sending invoke response"
                );
                break;
            }
        }
        self.transport.on_done();
        self.set_state(EngineState::AwaitingDestruction);
        debug!(target: INVOKE_TARGET, messages = total, "invoke interaction closed");
    }

    const fn ensure_open(&self) -> Result<(), InvokeError> {
        if self.state.is_closed() {
            return Err(InvokeError::IncorrectState { state: self.state });
        }
        Ok(())
    }

    /// Records the single answer `path` is allowed.
    fn claim(&mut self, path: &ConcreteCommandPath) -> Result<(), InvokeError> {
        if !self.answered.insert(*path) {
            warn!(target: INVOKE_TARGET, %path, "rejecting a second answer for the command");
            return Err(InvokeError::AlreadyAnswered { path: *path });
        }
        Ok(())
    }

    /// Registry entry for `path`.
    ///
    /// # Panics
    ///
    /// Panics when `path` was not part of the request; handlers only respond
    /// to the path they were invoked for.
    fn registered(&self, path: &ConcreteCommandPath) -> PathRegistryEntry {
        let Some(entry) = self.registry.find(path) else {
            panic!("command path {path} is not part of this invoke request");
        };
        *entry
    }
}
