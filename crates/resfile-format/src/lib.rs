//! Parsers and builders for the LG resource container format
//!
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::doc_markdown)] // Format terms don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
//! A container file holds many independently addressable resources plus a
//! directory describing them:
//!
//! ```text
//! +-------------------+ 0x00
//! | FileHeader (128)  |  signature, comment, directory offset
//! +-------------------+ 0x80 = data offset
//! | resource data     |  each region 4-byte aligned, in directory order
//! | ...               |
//! +-------------------+ directory offset
//! | DirHeader (6)     |  entry count, data offset
//! | DirEntry (12) * n |  id, size/flags, csize/type
//! +-------------------+
//! ```
//!
//! Offsets of individual resources are not stored; they are recomputed by
//! walking the directory in order (see [`layout`]).

#![warn(missing_docs)]

pub mod directory;
pub mod error;
pub mod flags;
pub mod header;
pub mod layout;

pub use directory::{
    DIR_ENTRY_SIZE, DIR_HEADER_SIZE, DirEntry, DirHeader, Directory, ENTRY_BATCH,
    MAX_RESOURCE_SIZE, read_entry_batch,
};
pub use error::{FormatError, FormatResult};
pub use flags::{ResourceFlags, ResourceType};
pub use header::{COMMENT_SIZE, FileHeader, HEADER_SIZE, MAX_COMMENT_LEN, SIGNATURE};
pub use layout::{
    DIR_GROWTH_QUANTUM, EntryOffsets, RES_ALIGNMENT, align_offset, compute_layout,
    decode_offset, encode_offset, grow_capacity, next_data_offset, padding_for,
};

/// Numeric resource identifier. Id 0 marks a deleted directory entry.
pub type ResourceId = u16;
