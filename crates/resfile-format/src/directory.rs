//! Directory header, directory entries and the in-memory directory
//!
//! The directory lives after all resource data. It starts with a 6-byte
//! header followed by `num_entries` packed 12-byte entries:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0x00   | 2    | Resource id (0 = deleted) |
//! | 0x02   | 2    | Padding |
//! | 0x04   | 4    | Size (bits 0-23) + flags (bits 24-31) |
//! | 0x08   | 4    | Stored size (bits 0-23) + type (bits 24-31) |

use crate::error::{FormatError, FormatResult};
use crate::flags::{ResourceFlags, ResourceType};
use crate::layout::{DIR_GROWTH_QUANTUM, EntryOffsets, compute_layout, grow_capacity};
use crate::{HEADER_SIZE, ResourceId};
use binrw::io::Cursor;
use binrw::{BinRead, BinWrite};
use std::io::{ErrorKind, Read, Write};

/// Size of the directory header in bytes.
pub const DIR_HEADER_SIZE: usize = 6;

/// Size of one directory entry in bytes.
pub const DIR_ENTRY_SIZE: usize = 12;

/// Largest size representable in the 24-bit entry fields.
pub const MAX_RESOURCE_SIZE: u32 = 0x00FF_FFFF;

/// Entries read per batch when streaming a directory.
pub const ENTRY_BATCH: usize = 64;

const SIZE_MASK: u32 = MAX_RESOURCE_SIZE;

/// Directory header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, BinRead, BinWrite)]
#[brw(little)]
pub struct DirHeader {
    /// Number of entries, deleted ones included
    pub num_entries: u16,

    /// Offset where the first entry's data starts
    pub data_offset: u32,
}

impl DirHeader {
    /// Header for an empty directory whose data starts right after the file header
    pub const fn empty() -> Self {
        Self {
            num_entries: 0,
            data_offset: HEADER_SIZE as u32,
        }
    }

    /// Read a directory header from the current position of `reader`
    pub fn read_from<R: Read>(reader: &mut R) -> FormatResult<Self> {
        let mut buf = [0u8; DIR_HEADER_SIZE];
        read_full(reader, &mut buf, "directory header")?;
        Ok(Self::read(&mut Cursor::new(&buf[..]))?)
    }
}

/// Packed directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, BinRead, BinWrite)]
#[brw(little)]
pub struct DirEntry {
    /// Resource id, 0 for a deleted placeholder
    #[brw(pad_after = 2)]
    pub id: ResourceId,

    size_flags: u32,

    csize_type: u32,
}

impl DirEntry {
    /// Build an entry, masking sizes to 24 bits
    pub fn new(
        id: ResourceId,
        size: u32,
        csize: u32,
        flags: ResourceFlags,
        rtype: ResourceType,
    ) -> Self {
        Self {
            id,
            size_flags: (size & SIZE_MASK) | (u32::from(flags.value) << 24),
            csize_type: (csize & SIZE_MASK) | (u32::from(u8::from(rtype)) << 24),
        }
    }

    /// Build an entry, rejecting sizes that do not fit 24 bits
    pub fn try_new(
        id: ResourceId,
        size: u64,
        csize: u64,
        flags: ResourceFlags,
        rtype: ResourceType,
    ) -> FormatResult<Self> {
        let size = u32::try_from(size)
            .ok()
            .filter(|s| *s <= MAX_RESOURCE_SIZE)
            .ok_or(FormatError::SizeOverflow(size))?;
        let csize = u32::try_from(csize)
            .ok()
            .filter(|s| *s <= MAX_RESOURCE_SIZE)
            .ok_or(FormatError::SizeOverflow(csize))?;
        Ok(Self::new(id, size, csize, flags, rtype))
    }

    /// Deleted placeholder that still occupies `csize` bytes of data
    pub fn deleted(csize: u32) -> Self {
        Self::new(0, csize, csize, ResourceFlags::default(), ResourceType::Unknown)
    }

    /// Uncompressed size
    pub const fn size(&self) -> u32 {
        self.size_flags & SIZE_MASK
    }

    /// Stored size on disk
    pub const fn csize(&self) -> u32 {
        self.csize_type & SIZE_MASK
    }

    /// Resource flags
    pub const fn flags(&self) -> ResourceFlags {
        ResourceFlags::new((self.size_flags >> 24) as u8)
    }

    /// Resource type
    pub fn resource_type(&self) -> ResourceType {
        ResourceType::from((self.csize_type >> 24) as u8)
    }

    /// Whether this entry is a deleted placeholder
    pub const fn is_deleted(&self) -> bool {
        self.id == 0
    }

    /// Turn this entry into a deleted placeholder, keeping its layout space
    pub const fn mark_deleted(&mut self) {
        self.id = 0;
    }
}

/// Read `count` consecutive entries from the current position of `reader`
pub fn read_entry_batch<R: Read>(reader: &mut R, count: usize) -> FormatResult<Vec<DirEntry>> {
    let mut buf = vec![0u8; count * DIR_ENTRY_SIZE];
    read_full(reader, &mut buf, "directory entries")?;
    let mut cursor = Cursor::new(&buf[..]);
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        entries.push(DirEntry::read(&mut cursor)?);
    }
    Ok(entries)
}

/// Fill `buf` from `reader`, reporting a short read as [`FormatError::Truncated`]
pub(crate) fn read_full<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    what: &'static str,
) -> FormatResult<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => FormatError::Truncated {
            what,
            needed: buf.len(),
        },
        _ => e.into(),
    })
}

/// In-memory directory with an explicitly tracked capacity
///
/// Capacity follows [`grow_capacity`] when read from disk and grows by
/// [`DIR_GROWTH_QUANTUM`] entries whenever an append finds it full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    header: DirHeader,
    entries: Vec<DirEntry>,
    capacity: usize,
}

impl Directory {
    /// Empty directory for a new container
    pub fn new() -> FormatResult<Self> {
        let mut entries = Vec::new();
        entries.try_reserve_exact(DIR_GROWTH_QUANTUM)?;
        Ok(Self {
            header: DirHeader::empty(),
            entries,
            capacity: DIR_GROWTH_QUANTUM,
        })
    }

    /// Read all entries announced by `header` from the current position of `reader`
    pub fn read_from<R: Read>(reader: &mut R, header: DirHeader) -> FormatResult<Self> {
        let count = usize::from(header.num_entries);
        let capacity = grow_capacity(count);
        let mut entries = Vec::new();
        entries.try_reserve_exact(capacity)?;
        entries.extend(read_entry_batch(reader, count)?);
        Ok(Self {
            header,
            entries,
            capacity,
        })
    }

    /// Directory header, kept in sync with the entry count
    pub const fn header(&self) -> &DirHeader {
        &self.header
    }

    /// Offset of the first data region
    pub const fn data_offset(&self) -> u32 {
        self.header.data_offset
    }

    /// All entries in on-disk order
    pub fn entries(&self) -> &[DirEntry] {
        &self.entries
    }

    /// Number of entries, deleted ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the directory has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Allocated entry capacity
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether any entry is a deleted placeholder
    pub fn has_deleted(&self) -> bool {
        self.entries.iter().any(DirEntry::is_deleted)
    }

    /// Index of the live entry with `id`
    pub fn position(&self, id: ResourceId) -> Option<usize> {
        if id == 0 {
            return None;
        }
        self.entries.iter().position(|e| e.id == id)
    }

    /// Whether the entry count has reached the 16-bit limit
    pub fn is_full(&self) -> bool {
        self.entries.len() >= usize::from(u16::MAX)
    }

    /// Append an entry, growing capacity by one quantum when full
    pub fn push(&mut self, entry: DirEntry) -> FormatResult<()> {
        let count = u16::try_from(self.entries.len() + 1)
            .map_err(|_| FormatError::DirectoryFull(self.entries.len()))?;
        if self.entries.len() == self.capacity {
            self.entries.try_reserve_exact(DIR_GROWTH_QUANTUM)?;
            self.capacity += DIR_GROWTH_QUANTUM;
        }
        self.entries.push(entry);
        self.header.num_entries = count;
        Ok(())
    }

    /// Mark the live entry with `id` deleted, returning whether one was found
    pub fn mark_deleted(&mut self, id: ResourceId) -> bool {
        match self.position(id) {
            Some(index) => {
                self.entries[index].mark_deleted();
                true
            }
            None => false,
        }
    }

    /// Walk entries with their data offsets
    pub fn offsets(&self) -> EntryOffsets<'_> {
        EntryOffsets::new(self.header.data_offset, &self.entries)
    }

    /// Data offsets of every entry and the offset following the last one
    pub fn layout(&self) -> FormatResult<(Vec<u32>, u32)> {
        compute_layout(self.header.data_offset, &self.entries)
    }

    /// Serialize the directory header followed by all entries
    pub fn to_bytes(&self) -> FormatResult<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::with_capacity(
            DIR_HEADER_SIZE + self.entries.len() * DIR_ENTRY_SIZE,
        ));
        self.header.write(&mut cursor)?;
        for entry in &self.entries {
            entry.write(&mut cursor)?;
        }
        Ok(cursor.into_inner())
    }

    /// Write the directory at the current position of `writer`
    pub fn write_to<W: Write>(&self, writer: &mut W) -> FormatResult<()> {
        writer.write_all(&self.to_bytes()?)?;
        Ok(())
    }
}
