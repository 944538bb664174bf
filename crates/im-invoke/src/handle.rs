//! Deferred response handles.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, warn};

use crate::cluster::CommandResponse;
use crate::engine::{EngineCore, INVOKE_TARGET};
use crate::errors::InvokeError;
use crate::path::ConcreteCommandPath;
use crate::status::StatusIb;

/// Keeps an invoke interaction open until an asynchronous handler responds.
///
/// Each live handle counts as one unit of outstanding work and answers its
/// command at most once: every `add_*` method consumes the handle. Releasing
/// or dropping the last one closes the interaction and sends the response.
/// Handles are move-only. Once the engine itself has been dropped, every
/// operation on a handle is a no-op.
#[derive(Debug)]
pub struct CommandHandle {
    core: Weak<RefCell<EngineCore>>,
    path: ConcreteCommandPath,
}

impl CommandHandle {
    pub(crate) fn new(core: &Rc<RefCell<EngineCore>>, path: ConcreteCommandPath) -> Self {
        core.borrow_mut().acquire_work();
        Self {
            core: Rc::downgrade(core),
            path,
        }
    }

    /// Path of the command the handle responds for.
    #[must_use]
    pub const fn path(&self) -> &ConcreteCommandPath {
        &self.path
    }

    /// Returns `true` while the engine that issued the handle still exists.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.core.strong_count() > 0
    }

    /// Adds a data response for the command and releases the handle.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError`] when the response could not be recorded or the
    /// command was already answered.
    pub fn add_response(self, response: &dyn CommandResponse) -> Result<(), InvokeError> {
        let outcome = self.with_core(|core| core.add_response(&self.path, response));
        self.release();
        outcome
    }

    /// Adds a status for the command and releases the handle, logging when
    /// the status cannot be recorded.
    pub fn add_status(self, status: impl Into<StatusIb>) {
        let reported: StatusIb = status.into();
        let path = self.path;
        if let Err(error) = self.fallible_add_status(reported) {
            warn!(
                target: INVOKE_TARGET,
                %path,
                status = %reported.status,
                %error,
                "failed to record deferred command status"
            );
        }
    }

    /// Adds a status for the command and releases the handle.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError`] when the status could not be recorded or the
    /// command was already answered.
    pub fn fallible_add_status(self, status: impl Into<StatusIb>) -> Result<(), InvokeError> {
        let reported: StatusIb = status.into();
        let outcome = self.with_core(|core| core.add_status(&self.path, reported));
        self.release();
        outcome
    }

    /// Reports success with a cluster-specific status code.
    pub fn add_cluster_specific_success(self, cluster_status: u8) {
        self.add_status(StatusIb::cluster_success(cluster_status));
    }

    /// Reports failure with a cluster-specific status code.
    pub fn add_cluster_specific_failure(self, cluster_status: u8) {
        self.add_status(StatusIb::cluster_failure(cluster_status));
    }

    /// Releases the handle without responding, closing the interaction if it
    /// was the last outstanding work.
    pub fn release(self) {
        drop(self);
    }

    fn with_core(
        &self,
        action: impl FnOnce(&mut EngineCore) -> Result<(), InvokeError>,
    ) -> Result<(), InvokeError> {
        let Some(core) = self.core.upgrade() else {
            debug!(
                target: INVOKE_TARGET,
                path = %self.path,
                "ignoring response on a handle whose engine is gone"
            );
            return Ok(());
        };
        action(&mut core.borrow_mut())
    }
}

impl Drop for CommandHandle {
    fn drop(&mut self) {
        let Some(core) = self.core.upgrade() else {
            debug!(
                target: INVOKE_TARGET,
                path = %self.path,
                "released a handle whose engine is gone"
            );
            return;
        };
        core.borrow_mut().release_work();
    }
}
