//! Command dispatch: the checks run before a handler and the handling of its
//! outcome.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::access::{AccessControl, SubjectDescriptor};
use crate::cluster::{ClusterTable, CommandMetadata};
use crate::context::CommandContext;
use crate::engine::EngineCore;
use crate::errors::{CommandFailure, InvokeError};
use crate::group::GroupMembership;
use crate::message::CommandData;
use crate::path::ConcreteCommandPath;
use crate::state::EngineState;
use crate::status::Status;
use crate::transport::ExchangeContext;

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::dispatch");

/// Data-model collaborators consulted while dispatching commands.
pub struct Collaborators {
    /// Access-control policy.
    pub access: Box<dyn AccessControl>,
    /// Command table of the node.
    pub clusters: Box<dyn ClusterTable>,
    /// Group membership table.
    pub groups: Box<dyn GroupMembership>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Checks that must pass before the handler for `path` runs.
///
/// Runs, in order: existence, access, timed-only and fabric-scope checks.
/// Group dispatch skips the fabric-scope check because group subjects always
/// carry a fabric.
pub(crate) fn check_command(
    collaborators: &Collaborators,
    subject: &SubjectDescriptor,
    path: &ConcreteCommandPath,
    is_timed: bool,
    check_fabric_scope: bool,
) -> Result<CommandMetadata, Status> {
    let metadata = collaborators.clusters.lookup(path).metadata()?;
    collaborators
        .access
        .check(subject, path, metadata.invoke_privilege)
        .map_err(|denial| {
            debug!(target: DISPATCH_TARGET, %path, %denial, "access check failed");
            denial.status()
        })?;
    if metadata.timed && !is_timed {
        return Err(Status::NeedsTimedInteraction);
    }
    if check_fabric_scope && metadata.fabric_scoped && !subject.has_fabric() {
        return Err(Status::UnsupportedAccess);
    }
    Ok(metadata)
}

/// Dispatches one unicast command and records its outcome.
///
/// # Errors
///
/// Returns [`InvokeError`] when a status the engine adds on the handler's
/// behalf cannot be recorded.
pub(crate) fn dispatch_command(
    core: &Rc<RefCell<EngineCore>>,
    collaborators: &mut Collaborators,
    exchange: &ExchangeContext,
    command: &CommandData<'_>,
    path: ConcreteCommandPath,
    is_timed: bool,
) -> Result<(), InvokeError> {
    core.borrow_mut().set_state(EngineState::Preparing);
    if let Err(status) = check_command(collaborators, &exchange.subject, &path, is_timed, true) {
        debug!(target: DISPATCH_TARGET, %path, %status, "command rejected before dispatch");
        return core.borrow_mut().add_status(&path, status.into());
    }
    if !command.fields.is_structure() {
        debug!(target: DISPATCH_TARGET, %path, "command fields are not a structure");
        return core
            .borrow_mut()
            .add_status(&path, Status::InvalidCommand.into());
    }

    core.borrow_mut().set_state(EngineState::AddingCommand);
    let mut context = CommandContext::new(core, path, *exchange, is_timed);
    let outcome = collaborators.clusters.invoke(&mut context, &command.fields);
    core.borrow_mut().set_state(EngineState::AddedCommand);
    settle(&mut context, outcome)
}

fn settle(
    context: &mut CommandContext<'_>,
    outcome: Result<(), CommandFailure>,
) -> Result<(), InvokeError> {
    let path = *context.path();
    let answered = context.has_responded() || context.was_deferred();
    match outcome {
        Ok(()) => {
            if !answered {
                warn!(
                    target: DISPATCH_TARGET,
                    %path,
                    "handler returned without responding or deferring"
                );
            }
            Ok(())
        }
        Err(failure) if answered => {
            warn!(
                target: DISPATCH_TARGET,
                %path,
                %failure,
                "handler failed after it had already responded"
            );
            Ok(())
        }
        Err(failure) => {
            debug!(target: DISPATCH_TARGET, %path, %failure, "handler rejected command");
            context.fallible_add_status(failure.status())
        }
    }
}
