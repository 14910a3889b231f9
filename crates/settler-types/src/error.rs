//! Error types for the settler-types crate.

use crate::enums::Resource;

/// Errors raised by resource arithmetic on shared types.
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    /// Attempted to remove more of a resource than the set holds.
    #[error("insufficient resource: wanted {requested} of {resource:?} but only have {available}")]
    InsufficientResource {
        /// The resource being removed.
        resource: Resource,
        /// The quantity the caller attempted to remove.
        requested: u32,
        /// The quantity actually held.
        available: u32,
    },
}
