//! Per-request registry of command paths and their correlation tokens.
//!
//! The [`PathRegistry`] is built once when a request is validated. Every
//! response or status added later is looked up here to recover the ref that
//! must accompany it. Paths and non-empty refs are unique within a request.

use thiserror::Error;

use crate::message::InvokeRequest;
use crate::path::{CommandPath, CommandRef, ConcreteCommandPath};

/// Errors raised while validating the paths of a request.
///
/// Every variant is reported to the client as `InvalidAction`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The request contained no commands.
    #[error("invoke request contains no commands")]
    Empty,
    /// The request named more paths than the registry may hold.
    #[error("invoke request names {count} paths but at most {capacity} are allowed")]
    TooManyPaths {
        /// Number of commands in the request.
        count: usize,
        /// Configured capacity.
        capacity: usize,
    },
    /// A group-addressed request carried more than one command.
    #[error("group invoke requests carry exactly one command, found {count}")]
    GroupCommandCount {
        /// Number of commands in the request.
        count: usize,
    },
    /// A command path did not match the addressing mode.
    #[error("command path {path} does not match the {expected} addressing of the exchange")]
    PathShape {
        /// Offending path.
        path: CommandPath,
        /// Addressing mode of the exchange.
        expected: &'static str,
    },
    /// A multi-command request entry had no ref.
    #[error("command {index} of a multi-command request has no ref")]
    MissingRef {
        /// Position of the command in the request.
        index: usize,
    },
    /// The same path appeared twice.
    #[error("command path {path} appears more than once")]
    DuplicatePath {
        /// Repeated path.
        path: ConcreteCommandPath,
    },
    /// The same ref appeared twice.
    #[error("command ref {command_ref} appears more than once")]
    DuplicateRef {
        /// Repeated ref.
        command_ref: CommandRef,
    },
}

/// One registered path and its optional ref.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathRegistryEntry {
    /// Request path.
    pub path: ConcreteCommandPath,
    /// Ref to echo in the response.
    pub command_ref: Option<CommandRef>,
}

/// Bounded, insertion-ordered collection of request paths.
///
/// # Example
///
/// ```
/// use im_invoke::path::ConcreteCommandPath;
/// use im_invoke::registry::PathRegistry;
///
/// let mut registry = PathRegistry::with_capacity(4);
/// let path = ConcreteCommandPath::new(1, 0x0006, 0x01);
/// registry.add(path, Some(7))?;
/// assert_eq!(registry.find(&path).and_then(|entry| entry.command_ref), Some(7));
/// assert!(registry.add(path, Some(8)).is_err());
/// # Ok::<(), im_invoke::registry::RegistryError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathRegistry {
    entries: Vec<PathRegistryEntry>,
    capacity: usize,
}

impl PathRegistry {
    /// Creates an empty registry holding at most `capacity` paths.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Validates the commands of `request` and registers their paths.
    ///
    /// Group-addressed requests must carry exactly one command without an
    /// endpoint; nothing is registered for them because they never produce
    /// a response. Unicast requests must name an endpoint on every path, and
    /// once there is more than one command every entry needs a ref, with
    /// paths and refs unique.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistryError`] describing the first violation found.
    pub fn validate(
        request: &InvokeRequest<'_>,
        group_addressed: bool,
        capacity: usize,
    ) -> Result<Self, RegistryError> {
        let count = request.commands.len();
        if count == 0 {
            return Err(RegistryError::Empty);
        }
        if group_addressed {
            return validate_group(request);
        }
        if count > capacity {
            return Err(RegistryError::TooManyPaths { count, capacity });
        }

        let mut registry = Self::with_capacity(capacity);
        for (index, command) in request.commands.iter().enumerate() {
            let path = command
                .path
                .concrete()
                .ok_or(RegistryError::PathShape {
                    path: command.path,
                    expected: "unicast",
                })?;
            if count > 1 && command.command_ref.is_none() {
                return Err(RegistryError::MissingRef { index });
            }
            registry.add(path, command.command_ref)?;
        }
        Ok(registry)
    }

    /// Registers a path and its ref.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicatePath`] or
    /// [`RegistryError::DuplicateRef`] when either is already registered, and
    /// [`RegistryError::TooManyPaths`] when the registry is full.
    pub fn add(
        &mut self,
        path: ConcreteCommandPath,
        command_ref: Option<CommandRef>,
    ) -> Result<(), RegistryError> {
        if self.entries.iter().any(|entry| entry.path == path) {
            return Err(RegistryError::DuplicatePath { path });
        }
        if let Some(token) = command_ref
            && self
                .entries
                .iter()
                .any(|entry| entry.command_ref == Some(token))
        {
            return Err(RegistryError::DuplicateRef { command_ref: token });
        }
        if self.entries.len() >= self.capacity {
            return Err(RegistryError::TooManyPaths {
                count: self.entries.len() + 1,
                capacity: self.capacity,
            });
        }
        self.entries.push(PathRegistryEntry { path, command_ref });
        Ok(())
    }

    /// Looks up the entry registered for `path`.
    #[must_use]
    pub fn find(&self, path: &ConcreteCommandPath) -> Option<&PathRegistryEntry> {
        self.entries.iter().find(|entry| entry.path == *path)
    }

    /// Iterates over the entries in request order.
    pub fn iter(&self) -> impl Iterator<Item = &PathRegistryEntry> {
        self.entries.iter()
    }

    /// Number of registered paths.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no paths are registered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of paths.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

fn validate_group(request: &InvokeRequest<'_>) -> Result<PathRegistry, RegistryError> {
    let [command] = request.commands.as_slice() else {
        return Err(RegistryError::GroupCommandCount {
            count: request.commands.len(),
        });
    };
    if command.path.endpoint.is_some() {
        return Err(RegistryError::PathShape {
            path: command.path,
            expected: "group",
        });
    }
    Ok(PathRegistry::default())
}
