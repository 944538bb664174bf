//! Server side of the Interaction Model invoke interaction.
//!
//! An [`InvokeEngine`] receives one encoded invoke request, validates its
//! command paths, dispatches each command to the node's [`ClusterTable`]
//! after existence, access and timing checks, and streams the responses back
//! through an [`ExchangeTransport`], split into as many messages as the
//! configured buffer size requires. Handlers may respond synchronously
//! through their [`CommandContext`] or defer and respond later through a
//! [`CommandHandle`]; the exchange closes once the last handle is released.
//!
//! Group-addressed requests are fanned out to every member endpoint and never
//! produce a response.
//!
//! [`ClusterTable`]: cluster::ClusterTable

pub mod access;
pub mod cluster;
mod context;
mod dispatch;
mod encoder;
mod engine;
mod errors;
mod group;
mod handle;
mod limits;
pub mod message;
pub mod path;
pub mod registry;
mod state;
pub mod status;
pub mod telemetry;
mod transport;

pub use context::CommandContext;
pub use dispatch::Collaborators;
pub use engine::InvokeEngine;
pub use errors::{CommandFailure, InvokeError, MessageError};
pub use group::GroupMembership;
pub use handle::CommandHandle;
pub use limits::EngineLimits;
pub use state::EngineState;
pub use transport::{Addressing, ExchangeContext, ExchangeTransport, TransportError};

#[cfg(test)]
mod tests;
