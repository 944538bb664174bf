//! Identifiers and command paths.

use std::fmt;

/// Endpoint identifier.
pub type EndpointId = u16;
/// Cluster identifier.
pub type ClusterId = u32;
/// Command identifier.
pub type CommandId = u32;
/// Group identifier carried by a group-addressed exchange.
pub type GroupId = u16;
/// Fabric index of the accessing subject; [`NO_FABRIC`] when none.
pub type FabricIndex = u8;
/// Correlation token ("ref") pairing a request entry with its response.
pub type CommandRef = u16;

/// Fabric index used when the exchange is not associated with a fabric.
pub const NO_FABRIC: FabricIndex = 0;

/// Fully resolved command path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConcreteCommandPath {
    /// Target endpoint.
    pub endpoint: EndpointId,
    /// Target cluster.
    pub cluster: ClusterId,
    /// Command within the cluster.
    pub command: CommandId,
}

impl ConcreteCommandPath {
    /// Creates a path.
    #[must_use]
    pub const fn new(endpoint: EndpointId, cluster: ClusterId, command: CommandId) -> Self {
        Self {
            endpoint,
            cluster,
            command,
        }
    }
}

impl fmt::Display for ConcreteCommandPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/0x{:04x}/0x{:02x}",
            self.endpoint, self.cluster, self.command
        )
    }
}

/// Command path as it appears in a request.
///
/// Unicast requests name an endpoint; group requests leave it out and the
/// group id travels with the exchange instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandPath {
    /// Target endpoint, absent for group-addressed commands.
    pub endpoint: Option<EndpointId>,
    /// Target cluster.
    pub cluster: ClusterId,
    /// Command within the cluster.
    pub command: CommandId,
}

impl CommandPath {
    /// Creates a unicast path.
    #[must_use]
    pub const fn unicast(endpoint: EndpointId, cluster: ClusterId, command: CommandId) -> Self {
        Self {
            endpoint: Some(endpoint),
            cluster,
            command,
        }
    }

    /// Creates a group path, which carries no endpoint.
    #[must_use]
    pub const fn group(cluster: ClusterId, command: CommandId) -> Self {
        Self {
            endpoint: None,
            cluster,
            command,
        }
    }

    /// Returns the concrete path when an endpoint is present.
    #[must_use]
    pub const fn concrete(&self) -> Option<ConcreteCommandPath> {
        match self.endpoint {
            Some(endpoint) => Some(ConcreteCommandPath::new(endpoint, self.cluster, self.command)),
            None => None,
        }
    }

    /// Resolves a group path against one member endpoint.
    #[must_use]
    pub const fn at_endpoint(&self, endpoint: EndpointId) -> ConcreteCommandPath {
        ConcreteCommandPath::new(endpoint, self.cluster, self.command)
    }
}

impl From<ConcreteCommandPath> for CommandPath {
    fn from(path: ConcreteCommandPath) -> Self {
        Self::unicast(path.endpoint, path.cluster, path.command)
    }
}

impl fmt::Display for CommandPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.endpoint {
            Some(endpoint) => write!(f, "{endpoint}")?,
            None => f.write_str("*")?,
        }
        write!(f, "/0x{:04x}/0x{:02x}", self.cluster, self.command)
    }
}
