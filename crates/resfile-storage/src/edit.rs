//! Per-file state kept while a container may be modified

use resfile_format::{Directory, FileHeader, FormatResult, HEADER_SIZE};

/// File-level flags of an edit state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditFlags {
    /// Raw flag value
    pub value: u8,
}

impl EditFlags {
    /// Some directory entry is a deleted placeholder
    pub const NEEDS_PACK: u8 = 0x01;

    /// Pack automatically when possible (policy hint for new files)
    pub const AUTOPACK: u8 = 0x02;

    /// Check if flag is set
    pub const fn has(&self, flag: u8) -> bool {
        (self.value & flag) != 0
    }

    /// Set flag
    pub fn set(&mut self, flag: u8) {
        self.value |= flag;
    }
}

/// In-memory header and directory of a writable (or aux-info) container
#[derive(Debug, Clone)]
pub struct EditState {
    /// Copy of the file header; rewritten on close
    pub header: FileHeader,
    /// Full directory, kept in on-disk order
    pub directory: Directory,
    /// Offset where the next resource (or the directory) goes
    pub data_cursor: u32,
    /// File-level flags
    pub flags: EditFlags,
}

impl EditState {
    /// State for an existing file; the cursor is set by the directory walk
    pub fn for_existing(header: FileHeader, directory: Directory) -> Self {
        let data_cursor = directory.data_offset();
        Self {
            header,
            directory,
            data_cursor,
            flags: EditFlags::default(),
        }
    }

    /// State for a brand new file: empty comment and directory, autopack on
    pub fn for_create() -> FormatResult<Self> {
        let mut header = FileHeader::new();
        header.set_comment("");
        Ok(Self {
            header,
            directory: Directory::new()?,
            data_cursor: HEADER_SIZE as u32,
            flags: EditFlags {
                value: EditFlags::AUTOPACK,
            },
        })
    }

    /// Whether a deleted placeholder is present
    pub const fn needs_pack(&self) -> bool {
        self.flags.has(EditFlags::NEEDS_PACK)
    }

    /// Whether the autopack policy flag is set
    pub const fn autopack(&self) -> bool {
        self.flags.has(EditFlags::AUTOPACK)
    }
}
