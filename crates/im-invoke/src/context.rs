//! Per-command view of the interaction handed to cluster handlers.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::warn;

use crate::access::SubjectDescriptor;
use crate::cluster::CommandResponse;
use crate::dispatch::DISPATCH_TARGET;
use crate::engine::EngineCore;
use crate::errors::InvokeError;
use crate::handle::CommandHandle;
use crate::path::{ConcreteCommandPath, GroupId};
use crate::status::StatusIb;
use crate::transport::ExchangeContext;

/// Synchronous response surface for one command.
///
/// A handler either responds through the context before returning or calls
/// [`defer`](Self::defer) and responds later through the returned
/// [`CommandHandle`]. Responses are attributed to the path the handler was
/// invoked for.
pub struct CommandContext<'a> {
    core: &'a Rc<RefCell<EngineCore>>,
    path: ConcreteCommandPath,
    exchange: ExchangeContext,
    timed: bool,
    responded: bool,
    deferred: bool,
}

impl<'a> CommandContext<'a> {
    pub(crate) const fn new(
        core: &'a Rc<RefCell<EngineCore>>,
        path: ConcreteCommandPath,
        exchange: ExchangeContext,
        timed: bool,
    ) -> Self {
        Self {
            core,
            path,
            exchange,
            timed,
            responded: false,
            deferred: false,
        }
    }

    /// Path of the command being handled.
    #[must_use]
    pub const fn path(&self) -> &ConcreteCommandPath {
        &self.path
    }

    /// Subject that sent the request.
    #[must_use]
    pub const fn subject(&self) -> &SubjectDescriptor {
        &self.exchange.subject
    }

    /// Returns `true` when the request arrived in a timed interaction.
    #[must_use]
    pub const fn is_timed(&self) -> bool {
        self.timed
    }

    /// Group the request was addressed to, if any. Responses added for
    /// group commands are discarded.
    #[must_use]
    pub const fn group_id(&self) -> Option<GroupId> {
        self.exchange.group_id()
    }

    /// Adds a data response for the command.
    ///
    /// A response that does not fit an empty message is replaced by a
    /// `Failure` status.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError`] when the response could not be recorded or the
    /// command was already answered.
    pub fn add_response(&mut self, response: &dyn CommandResponse) -> Result<(), InvokeError> {
        self.answer()?;
        self.core.borrow_mut().add_response(&self.path, response)
    }

    /// Adds a status for the command, logging when it cannot be recorded.
    pub fn add_status(&mut self, status: impl Into<StatusIb>) {
        let reported: StatusIb = status.into();
        if let Err(error) = self.fallible_add_status(reported) {
            warn!(
                target: DISPATCH_TARGET,
                path = %self.path,
                status = %reported.status,
                %error,
                "failed to record command status"
            );
        }
    }

    /// Adds a status for the command.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError`] when the status could not be recorded or the
    /// command was already answered.
    pub fn fallible_add_status(&mut self, status: impl Into<StatusIb>) -> Result<(), InvokeError> {
        self.answer()?;
        self.core.borrow_mut().add_status(&self.path, status.into())
    }

    /// Reports success with a cluster-specific status code.
    pub fn add_cluster_specific_success(&mut self, cluster_status: u8) {
        self.add_status(StatusIb::cluster_success(cluster_status));
    }

    /// Reports failure with a cluster-specific status code.
    pub fn add_cluster_specific_failure(&mut self, cluster_status: u8) {
        self.add_status(StatusIb::cluster_failure(cluster_status));
    }

    /// Takes over responsibility for responding asynchronously.
    ///
    /// The interaction stays open until the returned handle is released or
    /// dropped.
    #[must_use = "dropping the handle releases the command at once"]
    pub fn defer(&mut self) -> CommandHandle {
        self.deferred = true;
        CommandHandle::new(self.core, self.path)
    }

    /// Claims the single answer the command is allowed.
    const fn answer(&mut self) -> Result<(), InvokeError> {
        if self.responded || self.deferred {
            return Err(InvokeError::AlreadyAnswered { path: self.path });
        }
        self.responded = true;
        Ok(())
    }

    pub(crate) const fn has_responded(&self) -> bool {
        self.responded
    }

    pub(crate) const fn was_deferred(&self) -> bool {
        self.deferred
    }
}
