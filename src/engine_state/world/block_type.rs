//! # Block Type Module
//!
//! Defines the block types a voxel can carry and their render colors.
//! The empty sentinel is deliberately *not* a `BlockType` variant: an empty
//! cell has no record in the store, and the mirror encodes emptiness with
//! [`EMPTY_TYPE_TAG`](super::EMPTY_TYPE_TAG) instead.

use std::fmt;

use num_derive::FromPrimitive;

/// The underlying integer type used to represent block types in memory.
/// This is the storage and snapshot encoding of a block type.
pub type BlockTypeSize = u8;

/// Enumerates all block types that can occupy a voxel cell.
///
/// The `FromPrimitive` derive allows conversion from the compact integer
/// encoding used by snapshots and the GPU mirror.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum BlockType {
    /// Plain grey building block.
    SLATE,

    /// Purple road block used for walkways between app clusters.
    ROAD,

    /// Speckled grey variant of the building block.
    SPECKLE,

    /// Grass block for ground cover.
    GRASS,

    /// Tall pillar block.
    PILLAR,
}

/// Render color for each block type, RGB in linear space.
///
/// Static perfect-hash map so the render palette lookup is a compile-time
/// table rather than a runtime match.
pub static BLOCK_TYPE_COLORS: phf::Map<BlockTypeSize, [f32; 3]> = phf::phf_map! {
    0u8 => [0.55, 0.55, 0.58], // SLATE
    1u8 => [0.45, 0.20, 0.60], // ROAD
    2u8 => [0.62, 0.60, 0.64], // SPECKLE
    3u8 => [0.25, 0.55, 0.22], // GRASS
    4u8 => [0.78, 0.74, 0.66], // PILLAR
};

impl BlockType {
    /// Decodes a `BlockTypeSize` back into a `BlockType`.
    ///
    /// Used when replaying snapshots or interpreting mirror records.
    ///
    /// # Returns
    /// `Some(BlockType)` for a known encoding, `None` otherwise.
    pub fn from_int(btype: BlockTypeSize) -> Option<Self> {
        num::FromPrimitive::from_u8(btype)
    }

    /// The compact integer encoding of this block type.
    pub fn as_int(self) -> BlockTypeSize {
        self as BlockTypeSize
    }

    /// The next type in palette order, wrapping at the end. Drives the
    /// block picker hotkey.
    pub fn next(self) -> Self {
        Self::from_int((self.as_int() + 1) % BLOCK_TYPE_COLORS.len() as BlockTypeSize)
            .unwrap_or(BlockType::SLATE)
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
