//! Group-addressed command fan-out.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::context::CommandContext;
use crate::dispatch::{Collaborators, DISPATCH_TARGET, check_command};
use crate::engine::EngineCore;
use crate::message::CommandData;
use crate::path::{EndpointId, FabricIndex, GroupId};
use crate::state::EngineState;
use crate::transport::ExchangeContext;

/// Group membership table of the node.
pub trait GroupMembership {
    /// Endpoints on this node that belong to `group` on `fabric_index`.
    fn endpoints(&self, fabric_index: FabricIndex, group: GroupId) -> Vec<EndpointId>;
}

/// Runs a group command on every member endpoint.
///
/// Each endpoint is checked like a unicast command except for fabric scope.
/// Endpoints that fail a check are skipped and nothing is reported, since
/// group commands never produce a response.
pub(crate) fn dispatch_group(
    core: &Rc<RefCell<EngineCore>>,
    collaborators: &mut Collaborators,
    exchange: &ExchangeContext,
    command: &CommandData<'_>,
    group: GroupId,
) {
    let endpoints = collaborators
        .groups
        .endpoints(exchange.subject.fabric_index, group);
    if endpoints.is_empty() {
        debug!(target: DISPATCH_TARGET, group, "no local endpoints are members of the group");
        return;
    }
    if !command.fields.is_structure() {
        debug!(target: DISPATCH_TARGET, group, "group command fields are not a structure");
        return;
    }

    for endpoint in endpoints {
        let path = command.path.at_endpoint(endpoint);
        core.borrow_mut().set_state(EngineState::Preparing);
        if let Err(status) = check_command(collaborators, &exchange.subject, &path, false, false) {
            debug!(target: DISPATCH_TARGET, %path, group, %status, "skipping group member");
            continue;
        }
        core.borrow_mut().set_state(EngineState::AddingCommand);
        let mut context = CommandContext::new(core, path, *exchange, false);
        if let Err(failure) = collaborators.clusters.invoke(&mut context, &command.fields) {
            warn!(target: DISPATCH_TARGET, %path, group, %failure, "group command failed");
        }
        core.borrow_mut().set_state(EngineState::AddedCommand);
    }
}
