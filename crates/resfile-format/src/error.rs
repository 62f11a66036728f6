//! Error types for resource file format operations

use thiserror::Error;

/// Result type for format operations
pub type FormatResult<T> = Result<T, FormatError>;

/// Errors raised while parsing or building container structures
#[derive(Debug, Error)]
pub enum FormatError {
    /// First 16 bytes do not carry the container signature
    #[error("invalid signature: {}", hex::encode(.0))]
    InvalidSignature([u8; 16]),

    /// Input ended before a fixed-size structure was complete
    #[error("truncated {what}: needed {needed} bytes")]
    Truncated {
        /// Structure being read
        what: &'static str,
        /// Bytes required
        needed: usize,
    },

    /// A size does not fit the 24-bit directory entry fields
    #[error("size {0} exceeds the 24-bit entry limit")]
    SizeOverflow(u64),

    /// Data offset arithmetic left the 32-bit address space
    #[error("data offset overflow at cursor {0:#x}")]
    OffsetOverflow(u32),

    /// Directory already holds the maximum number of entries
    #[error("directory full: {0} entries")]
    DirectoryFull(usize),

    /// Reserving directory capacity failed
    #[error("directory allocation failed: {0}")]
    Allocation(#[from] std::collections::TryReserveError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),
}
