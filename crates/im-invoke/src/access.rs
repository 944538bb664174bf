//! Access-control collaborator.

use thiserror::Error;

use crate::path::{ConcreteCommandPath, FabricIndex, NO_FABRIC};
use crate::status::Status;

/// Privilege levels, from least to most powerful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Privilege {
    /// Read access.
    View,
    /// Read access on behalf of another node.
    ProxyView,
    /// Ordinary operation of the device.
    Operate,
    /// Configuration changes.
    Manage,
    /// Full administrative control.
    Administer,
}

/// How the accessing subject authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMode {
    /// Certificate-authenticated session.
    Case,
    /// Passcode-authenticated session used during commissioning.
    Pase,
    /// Group-keyed multicast message.
    Group,
}

/// Identity of the node issuing the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubjectDescriptor {
    /// Fabric the subject accesses, or [`NO_FABRIC`].
    pub fabric_index: FabricIndex,
    /// Node id or group id of the subject.
    pub subject: u64,
    /// Authentication mode.
    pub auth_mode: AuthMode,
}

impl SubjectDescriptor {
    /// Subject of a certificate-authenticated session.
    #[must_use]
    pub const fn case(fabric_index: FabricIndex, node_id: u64) -> Self {
        Self {
            fabric_index,
            subject: node_id,
            auth_mode: AuthMode::Case,
        }
    }

    /// Subject of a commissioning session, which has no fabric yet.
    #[must_use]
    pub const fn pase() -> Self {
        Self {
            fabric_index: NO_FABRIC,
            subject: 0,
            auth_mode: AuthMode::Pase,
        }
    }

    /// Subject of a group message.
    #[must_use]
    pub fn group(fabric_index: FabricIndex, group_id: u16) -> Self {
        Self {
            fabric_index,
            subject: u64::from(group_id),
            auth_mode: AuthMode::Group,
        }
    }

    /// Returns `true` when the subject accesses a fabric.
    #[must_use]
    pub const fn has_fabric(&self) -> bool {
        self.fabric_index != NO_FABRIC
    }
}

/// Reason an access check did not grant access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessDenial {
    /// No entry grants the privilege.
    #[error("access denied")]
    Denied,
    /// Access would be granted but a restriction applies to the subject.
    #[error("access restricted")]
    Restricted,
    /// The policy engine failed to reach a decision.
    #[error("access check failed: {message}")]
    Failure {
        /// Description of the failure.
        message: String,
    },
}

impl AccessDenial {
    /// Per-path status reported for the denial.
    #[must_use]
    pub const fn status(&self) -> Status {
        match self {
            Self::Denied => Status::UnsupportedAccess,
            Self::Restricted => Status::AccessRestricted,
            Self::Failure { .. } => Status::Failure,
        }
    }
}

/// Access-control policy engine.
pub trait AccessControl {
    /// Checks whether `subject` holds `privilege` on `path`.
    ///
    /// # Errors
    ///
    /// Returns an [`AccessDenial`] when access is not granted.
    fn check(
        &self,
        subject: &SubjectDescriptor,
        path: &ConcreteCommandPath,
        privilege: Privilege,
    ) -> Result<(), AccessDenial>;
}
