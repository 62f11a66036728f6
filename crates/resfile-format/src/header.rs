//! Container file header
//!
//! Every container starts with a fixed 128-byte header:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0x00   | 16   | Signature `"LG Res File v2\r\n"` |
//! | 0x10   | 96   | Comment, NUL padded |
//! | 0x70   | 4    | Directory offset (LE) |
//! | 0x74   | 12   | Reserved, zero |

use crate::directory::read_full;
use crate::error::{FormatError, FormatResult};
use binrw::io::Cursor;
use binrw::{BinRead, BinWrite};
use std::io::{Read, Write};

/// Signature identifying a resource container.
pub const SIGNATURE: [u8; 16] = *b"LG Res File v2\r\n";

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 0x80;

/// Size of the comment field in bytes.
pub const COMMENT_SIZE: usize = 96;

/// Longest comment that still leaves a terminating NUL.
pub const MAX_COMMENT_LEN: usize = COMMENT_SIZE - 1;

/// Container file header
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct FileHeader {
    /// Format signature, must equal [`SIGNATURE`]
    pub signature: [u8; 16],

    /// Free-form comment, NUL padded
    pub comment: [u8; COMMENT_SIZE],

    /// Offset of the on-disk directory
    pub dir_offset: u32,

    /// Reserved padding
    pub reserved: [u8; 12],
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl FileHeader {
    /// Create a header with the signature set, an empty comment and no directory yet
    pub const fn new() -> Self {
        Self {
            signature: SIGNATURE,
            comment: [0; COMMENT_SIZE],
            dir_offset: 0,
            reserved: [0; 12],
        }
    }

    /// Check the signature bytes
    pub fn validate(&self) -> FormatResult<()> {
        if self.signature != SIGNATURE {
            return Err(FormatError::InvalidSignature(self.signature));
        }
        Ok(())
    }

    /// Parse and validate a header from the start of `data`
    pub fn parse(data: &[u8]) -> FormatResult<Self> {
        if data.len() < HEADER_SIZE {
            return Err(FormatError::Truncated {
                what: "file header",
                needed: HEADER_SIZE,
            });
        }
        let header = Self::read(&mut Cursor::new(&data[..HEADER_SIZE]))?;
        header.validate()?;
        Ok(header)
    }

    /// Read and validate a header from the current position of `reader`
    pub fn read_from<R: Read>(reader: &mut R) -> FormatResult<Self> {
        let mut buf = [0u8; HEADER_SIZE];
        read_full(reader, &mut buf, "file header")?;
        Self::parse(&buf)
    }

    /// Serialize the header
    pub fn to_bytes(&self) -> FormatResult<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::with_capacity(HEADER_SIZE));
        self.write(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Write the header at the current position of `writer`
    pub fn write_to<W: Write>(&self, writer: &mut W) -> FormatResult<()> {
        writer.write_all(&self.to_bytes()?)?;
        Ok(())
    }

    /// Comment text up to the first NUL
    pub fn comment(&self) -> String {
        let end = self
            .comment
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(COMMENT_SIZE);
        String::from_utf8_lossy(&self.comment[..end]).into_owned()
    }

    /// Replace the comment, truncating to [`MAX_COMMENT_LEN`] bytes
    pub fn set_comment(&mut self, text: &str) {
        self.comment = [0; COMMENT_SIZE];
        let bytes = text.as_bytes();
        let len = bytes.len().min(MAX_COMMENT_LEN);
        self.comment[..len].copy_from_slice(&bytes[..len]);
    }
}
