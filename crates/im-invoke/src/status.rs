//! Interaction Model status codes.

use strum::{Display, FromRepr};

/// Protocol status code carried in status entries and status responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr)]
#[repr(u8)]
#[non_exhaustive]
pub enum Status {
    /// Operation succeeded.
    Success = 0x00,
    /// Operation failed for an unspecified reason.
    Failure = 0x01,
    /// Subject lacks the privilege required by the path.
    UnsupportedAccess = 0x7E,
    /// Endpoint does not exist.
    UnsupportedEndpoint = 0x7F,
    /// Message was malformed or violated protocol rules.
    InvalidAction = 0x80,
    /// Command is not supported by the cluster.
    UnsupportedCommand = 0x81,
    /// Command fields could not be decoded.
    InvalidCommand = 0x85,
    /// A field value violated its constraints.
    ConstraintError = 0x87,
    /// The device ran out of a resource.
    ResourceExhausted = 0x89,
    /// Referenced item does not exist.
    NotFound = 0x8B,
    /// A field had the wrong data type.
    InvalidDataType = 0x8D,
    /// The operation timed out.
    Timeout = 0x94,
    /// The device is busy.
    Busy = 0x9C,
    /// Access was denied by a restriction on the subject.
    AccessRestricted = 0x9D,
    /// Cluster does not exist on the endpoint.
    UnsupportedCluster = 0xC3,
    /// Command must be sent as part of a timed interaction.
    NeedsTimedInteraction = 0xC6,
    /// The timed flag disagrees with how the request was delivered.
    TimedRequestMismatch = 0xC9,
    /// A fail-safe context is required.
    FailsafeRequired = 0xCA,
    /// The target is in a state that does not allow the command.
    InvalidInState = 0xCB,
}

impl Status {
    /// Wire value of the status.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Returns `true` for [`Status::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Status together with an optional cluster-specific status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusIb {
    /// Protocol status.
    pub status: Status,
    /// Cluster-defined status code.
    pub cluster_status: Option<u8>,
}

impl StatusIb {
    /// Creates a status without a cluster-specific code.
    #[must_use]
    pub const fn new(status: Status) -> Self {
        Self {
            status,
            cluster_status: None,
        }
    }

    /// Successful outcome carrying a cluster-specific code.
    #[must_use]
    pub const fn cluster_success(cluster_status: u8) -> Self {
        Self {
            status: Status::Success,
            cluster_status: Some(cluster_status),
        }
    }

    /// Failed outcome carrying a cluster-specific code.
    #[must_use]
    pub const fn cluster_failure(cluster_status: u8) -> Self {
        Self {
            status: Status::Failure,
            cluster_status: Some(cluster_status),
        }
    }
}

impl From<Status> for StatusIb {
    fn from(status: Status) -> Self {
        Self::new(status)
    }
}
