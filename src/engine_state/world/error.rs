//! Error taxonomy for the world core.
//!
//! Every mutation on the domain stores returns a synchronous `Result` with one
//! of these variants. A failed call leaves the voxel store, the app registry,
//! and the instance mirrors untouched; callers at the input layer decide
//! whether to log, ignore, or surface the error.

use thiserror::Error;

/// Errors produced by the world stores and the instance mirror contract.
#[derive(Debug, Error)]
pub enum WorldError {
    /// A coordinate fell outside the fixed cubic region.
    #[error("coordinate ({x}, {y}, {z}) is outside the region [0, {region})")]
    OutOfBounds {
        /// X coordinate of the rejected cell
        x: i32,
        /// Y coordinate of the rejected cell
        y: i32,
        /// Z coordinate of the rejected cell
        z: i32,
        /// Region dimension the coordinate was checked against
        region: i32,
    },

    /// A fixed slot namespace (voxel or app) is exhausted.
    ///
    /// The placement was rejected; nothing was silently dropped.
    #[error("slot capacity of {capacity} reached")]
    CapacityExceeded {
        /// The capacity that was hit
        capacity: u32,
    },

    /// The application handle is already anchored somewhere in the world.
    #[error("application handle {0} is already placed")]
    DuplicateHandle(u32),

    /// A mirror write targeted a slot beyond the reserved buffer region.
    ///
    /// This indicates the capacity pre-check on the owning store was skipped:
    /// the domain stores and their mirrors are sized together, so this variant
    /// is an internal invariant breach rather than a user-facing condition.
    #[error("slot {slot} is outside the mirror capacity {capacity}")]
    SlotOutOfCapacity {
        /// The offending slot index
        slot: u32,
        /// The mirror's reserved capacity
        capacity: u32,
    },

    /// A snapshot could not be read or written.
    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl From<std::io::Error> for WorldError {
    fn from(err: std::io::Error) -> Self {
        WorldError::Snapshot(err.to_string())
    }
}

impl From<serde_json::Error> for WorldError {
    fn from(err: serde_json::Error) -> Self {
        WorldError::Snapshot(err.to_string())
    }
}
