//! Resource container file manager.
//!
//! This crate opens, reads, creates and closes LG resource container files
//! and keeps the shared resource table in step with them. The pieces are:
//!
//! - **Path resolution** ([`caseless`]): case-insensitive fallback when a
//!   direct open fails
//! - **Slot registry** ([`registry`]): fixed-capacity table of open files,
//!   addressed by small file numbers
//! - **Directory codec** ([`codec`]): reads and writes headers and
//!   directories against an open slot and projects entries into the table
//! - **Resource table** ([`table`]): descriptors keyed by resource id plus
//!   the LRU list of resident resources
//! - **Session workflow** ([`ResourceManager`]): open modes, eager loading,
//!   flush-on-close
//!
//! # Example
//!
//! ```rust,no_run
//! use resfile_storage::{OpenMode, ResConfig, ResourceManager};
//! use resfile_format::{ResourceFlags, ResourceType};
//!
//! # fn example() -> resfile_storage::Result<()> {
//! let mut manager = ResourceManager::new(ResConfig::default())?;
//!
//! let file = manager.open("gamescr.res", OpenMode::Create, false)?;
//! manager.write_resource(file, 1000, b"hello", ResourceType::String, ResourceFlags::default())?;
//! manager.close(file)?;
//!
//! let file = manager.open("gamescr.res", OpenMode::Read, false)?;
//! assert_eq!(manager.resource(1000)?, b"hello");
//! manager.close(file)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![allow(clippy::must_use_candidate)]

use resfile_format::{FormatError, ResourceId};
use std::path::PathBuf;
use thiserror::Error;

// Case-insensitive path fallback
pub mod caseless;

// Open file slots
pub mod registry;

// Writable per-file state
pub mod edit;

// Header and directory I/O against open slots
pub mod codec;

// Resource descriptors and the resident list
pub mod table;
pub mod lru;

// Configuration
pub mod config;

// Open/close workflow
mod session;

pub use caseless::{WantKind, caseless_path, open_caseless};
pub use config::ResConfig;
pub use edit::{EditFlags, EditState};
pub use registry::{FileNum, ResFile, SlotRegistry};
pub use session::{OpenMode, ResourceManager};
pub use table::{DescriptorTable, ProjectOutcome, Projection, ResDesc, ResourceTable};

/// Result type for resource file operations.
pub type Result<T> = std::result::Result<T, ResError>;

/// Errors that can occur while managing resource files.
#[derive(Debug, Error)]
pub enum ResError {
    /// Every file slot is in use.
    #[error("no free file slot ({0} files open)")]
    NoFreeSlot(usize),

    /// An existing file could not be opened.
    #[error("cannot open {}: {source}", path.display())]
    CannotOpen {
        /// Path as requested
        path: PathBuf,
        /// Underlying failure
        source: std::io::Error,
    },

    /// A file could not be created.
    #[error("cannot create {}: {source}", path.display())]
    CannotCreate {
        /// Path as requested
        path: PathBuf,
        /// Underlying failure
        source: std::io::Error,
    },

    /// The file is not a resource container.
    #[error("invalid resource file {}: {reason}", path.display())]
    InvalidFormat {
        /// Path as requested
        path: PathBuf,
        /// Why the file was rejected
        reason: String,
    },

    /// Directory memory could not be reserved.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// The file number does not refer to an open file.
    #[error("file {0} is not open")]
    NotOpen(FileNum),

    /// The file was opened without write access or edit state.
    #[error("file {0} is not open for writing")]
    NotWritable(FileNum),

    /// Resource id 0 is reserved for deleted entries.
    #[error("resource id 0 is reserved")]
    InvalidId,

    /// Resource does not fit the 24-bit size fields.
    #[error("resource {id} is too large: {size} bytes")]
    ResourceTooLarge {
        /// Resource id
        id: ResourceId,
        /// Requested size
        size: usize,
    },

    /// No descriptor exists for the id.
    #[error("unknown resource {0}")]
    UnknownResource(ResourceId),

    /// The resource is stored compressed.
    #[error("resource {0} is compressed")]
    Compressed(ResourceId),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Format error outside of open validation.
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResError {
    /// Numeric status code of an open failure, for callers that still expect one.
    ///
    /// | Code | Meaning |
    /// |------|---------|
    /// | -1   | no free file number |
    /// | -2   | couldn't open, edit, or create |
    /// | -3   | invalid resource file |
    /// | -4   | memory allocation failure |
    pub const fn legacy_code(&self) -> Option<i32> {
        match self {
            Self::NoFreeSlot(_) => Some(-1),
            Self::CannotOpen { .. } | Self::CannotCreate { .. } => Some(-2),
            Self::InvalidFormat { .. } => Some(-3),
            Self::OutOfMemory(_) => Some(-4),
            _ => None,
        }
    }
}

/// Version information for the resource manager.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
