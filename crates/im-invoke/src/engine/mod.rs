//! The invoke engine: one instance per invoke exchange.
//!
//! [`InvokeEngine::on_invoke_request`] validates the request, dispatches
//! every command and returns. The interaction closes, and the response is
//! sent, once the dispatch pass and every deferred [`CommandHandle`] have
//! finished.
//!
//! [`CommandHandle`]: crate::CommandHandle

mod interaction;

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, error, warn};

pub(crate) use self::interaction::EngineCore;
use crate::dispatch::{Collaborators, dispatch_command};
use crate::group::dispatch_group;
use crate::limits::EngineLimits;
use crate::message::InvokeRequest;
use crate::registry::PathRegistry;
use crate::state::EngineState;
use crate::status::Status;
use crate::transport::{ExchangeContext, ExchangeTransport};

pub(crate) const INVOKE_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::invoke");

/// Server side of one invoke interaction.
///
/// # Example
///
/// ```no_run
/// # use im_invoke::{Collaborators, EngineLimits, ExchangeContext, InvokeEngine};
/// # use im_invoke::access::SubjectDescriptor;
/// # use im_invoke::status::Status;
/// # fn run(
/// #     transport: Box<dyn im_invoke::ExchangeTransport>,
/// #     collaborators: Collaborators,
/// #     payload: &[u8],
/// # ) {
/// let exchange = ExchangeContext::unicast(SubjectDescriptor::case(1, 0x1122));
/// let mut engine =
///     InvokeEngine::new(exchange, EngineLimits::default(), transport, collaborators);
/// let status = engine.on_invoke_request(payload, false);
/// if status != Status::Success {
///     // The caller reports `status` in a status response.
/// }
/// # }
/// ```
pub struct InvokeEngine {
    // Dropped before `collaborators`, so handles they still hold see a dead
    // engine.
    core: Rc<RefCell<EngineCore>>,
    collaborators: Collaborators,
    exchange: ExchangeContext,
    limits: EngineLimits,
    received: bool,
}

impl InvokeEngine {
    /// Creates an engine for the exchange described by `exchange`.
    #[must_use]
    pub fn new(
        exchange: ExchangeContext,
        limits: EngineLimits,
        transport: Box<dyn ExchangeTransport>,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            core: Rc::new(RefCell::new(EngineCore::new(&limits, transport))),
            collaborators,
            exchange,
            limits,
            received: false,
        }
    }

    /// Handles the invoke request carried by `payload`.
    ///
    /// Returns [`Status::Success`] when the request was accepted; responses
    /// are then delivered through the transport. Any other status rejects
    /// the request as a whole: nothing is sent, the exchange is released and
    /// the caller reports the status in a status response.
    ///
    /// # Panics
    ///
    /// Panics when called more than once on the same engine.
    pub fn on_invoke_request(&mut self, payload: &[u8], is_timed_invoke: bool) -> Status {
        assert!(
            !self.received,
            "an invoke engine handles exactly one request"
        );
        self.received = true;

        self.core.borrow_mut().acquire_work();
        let status = match self.accept(payload, is_timed_invoke) {
            Ok(request) => {
                self.dispatch_all(&request, is_timed_invoke);
                Status::Success
            }
            Err(rejection) => rejection,
        };
        self.core.borrow_mut().release_work();
        status
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.core.borrow().state()
    }

    /// Number of units of work keeping the interaction open.
    #[must_use]
    pub fn outstanding_work(&self) -> usize {
        self.core.borrow().outstanding()
    }

    /// Exchange the engine serves.
    #[must_use]
    pub const fn exchange(&self) -> &ExchangeContext {
        &self.exchange
    }

    fn accept<'p>(
        &self,
        payload: &'p [u8],
        is_timed_invoke: bool,
    ) -> Result<InvokeRequest<'p>, Status> {
        let request = InvokeRequest::parse(payload).map_err(|failure| {
            warn!(target: INVOKE_TARGET, error = %failure, "rejecting malformed invoke request");
            Status::InvalidAction
        })?;

        let group = self.exchange.group_id();
        if request.timed_request != is_timed_invoke || (group.is_some() && request.timed_request)
        {
            warn!(
                target: INVOKE_TARGET,
                timed_request = request.timed_request,
                is_timed_invoke,
                group_addressed = group.is_some(),
                "timed flag does not match the exchange"
            );
            return Err(Status::TimedRequestMismatch);
        }

        let registry = PathRegistry::validate(
            &request,
            group.is_some(),
            self.limits.max_paths_per_invoke,
        )
        .map_err(|failure| {
            warn!(target: INVOKE_TARGET, error = %failure, "rejecting invalid invoke request");
            Status::InvalidAction
        })?;

        let suppress = request.suppress_response || group.is_some();
        self.core.borrow_mut().accept(registry, suppress);
        debug!(
            target: INVOKE_TARGET,
            commands = request.commands.len(),
            suppress_response = suppress,
            timed = is_timed_invoke,
            "accepted invoke request"
        );
        Ok(request)
    }

    fn dispatch_all(&mut self, request: &InvokeRequest<'_>, is_timed_invoke: bool) {
        for command in &request.commands {
            if let Some(group) = self.exchange.group_id() {
                dispatch_group(
                    &self.core,
                    &mut self.collaborators,
                    &self.exchange,
                    command,
                    group,
                );
                continue;
            }
            let Some(path) = command.path.concrete() else {
                continue;
            };
            let outcome = dispatch_command(
                &self.core,
                &mut self.collaborators,
                &self.exchange,
                command,
                path,
                is_timed_invoke,
            );
            if let Err(failure) = outcome {
                error!(
                    target: INVOKE_TARGET,
                    %path,
                    error = %failure,
                    "failed to record command outcome"
                );
            }
            if self.core.borrow().is_response_dropped() {
                warn!(
                    target: INVOKE_TARGET,
                    %path,
                    "response dropped, skipping remaining commands"
                );
                break;
            }
        }
    }
}

impl Drop for InvokeEngine {
    fn drop(&mut self) {
        if let Ok(core) = self.core.try_borrow()
            && core.outstanding() > 0
        {
            debug!(
                target: INVOKE_TARGET,
                outstanding = core.outstanding(),
                "engine dropped with outstanding handles, invalidating them"
            );
        }
    }
}

impl std::fmt::Debug for InvokeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvokeEngine")
            .field("exchange", &self.exchange)
            .field("limits", &self.limits)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
