//! Cluster command table collaborator.

use im_tlv::{Tag, TlvError, TlvWriter};

use crate::access::Privilege;
use crate::context::CommandContext;
use crate::errors::CommandFailure;
use crate::message::CommandFields;
use crate::path::{CommandId, ConcreteCommandPath};
use crate::status::Status;

/// Properties of a command that gate its dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandMetadata {
    /// Privilege required to invoke the command.
    pub invoke_privilege: Privilege,
    /// The command may only be sent within a timed interaction.
    pub timed: bool,
    /// The command acts on fabric-scoped data.
    pub fabric_scoped: bool,
}

impl CommandMetadata {
    /// Untimed, unscoped command requiring `Operate`.
    #[must_use]
    pub const fn operate() -> Self {
        Self {
            invoke_privilege: Privilege::Operate,
            timed: false,
            fabric_scoped: false,
        }
    }

    /// Returns the metadata with a different privilege.
    #[must_use]
    pub const fn with_privilege(mut self, privilege: Privilege) -> Self {
        self.invoke_privilege = privilege;
        self
    }

    /// Marks the command as timed-only.
    #[must_use]
    pub const fn timed(mut self) -> Self {
        self.timed = true;
        self
    }

    /// Marks the command as fabric-scoped.
    #[must_use]
    pub const fn fabric_scoped(mut self) -> Self {
        self.fabric_scoped = true;
        self
    }
}

/// Result of looking a path up in the cluster table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandLookup {
    /// The command exists.
    Exists(CommandMetadata),
    /// The endpoint does not exist.
    UnsupportedEndpoint,
    /// The endpoint exists but lacks the cluster.
    UnsupportedCluster,
    /// The cluster exists but does not accept the command.
    UnsupportedCommand,
}

impl CommandLookup {
    /// Metadata of an existing command, or the status reporting its absence.
    ///
    /// # Errors
    ///
    /// Returns the `Unsupported*` status matching the lookup result.
    pub const fn metadata(self) -> Result<CommandMetadata, Status> {
        match self {
            Self::Exists(metadata) => Ok(metadata),
            Self::UnsupportedEndpoint => Err(Status::UnsupportedEndpoint),
            Self::UnsupportedCluster => Err(Status::UnsupportedCluster),
            Self::UnsupportedCommand => Err(Status::UnsupportedCommand),
        }
    }
}

/// Per-cluster command dispatch table.
pub trait ClusterTable {
    /// Reports whether `path` names an existing command.
    fn lookup(&self, path: &ConcreteCommandPath) -> CommandLookup;

    /// Runs the handler for the command in `context`.
    ///
    /// The handler reports its outcome through `context`, either immediately
    /// or later through a [`CommandHandle`](crate::CommandHandle) obtained
    /// with [`CommandContext::defer`].
    ///
    /// # Errors
    ///
    /// Returns a [`CommandFailure`] when the command was rejected without a
    /// response; the engine reports its status for the path.
    fn invoke(
        &mut self,
        context: &mut CommandContext<'_>,
        fields: &CommandFields<'_>,
    ) -> Result<(), CommandFailure>;
}

/// Data-carrying response to a command.
pub trait CommandResponse {
    /// Command id of the response.
    fn command_id(&self) -> CommandId;

    /// Writes the response fields as one element tagged `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError`] when the fields do not fit.
    fn encode_to(&self, writer: &mut TlvWriter, tag: Tag) -> Result<(), TlvError>;
}
