//! Data-region layout rules
//!
//! Resource data is laid out back to back after the file header, in
//! directory order. Each region starts on a 4-byte boundary: the start of
//! entry `i + 1` is `align(start(i) + csize(i))`. The directory itself
//! follows the last region under the same rule.

use crate::directory::DirEntry;
use crate::error::{FormatError, FormatResult};

/// Alignment stride for every data region and the directory.
pub const RES_ALIGNMENT: u32 = 4;

/// Directory capacity is always a multiple of this many entries.
pub const DIR_GROWTH_QUANTUM: usize = 128;

/// Round `offset` up to the next alignment boundary.
pub const fn align_offset(offset: u32) -> u32 {
    (offset + (RES_ALIGNMENT - 1)) & !(RES_ALIGNMENT - 1)
}

/// Number of zero bytes needed after `size` bytes of data.
pub const fn padding_for(size: u32) -> u32 {
    (RES_ALIGNMENT - (size % RES_ALIGNMENT)) % RES_ALIGNMENT
}

/// Cursor following a region of `csize` bytes that starts at `cursor`.
pub fn next_data_offset(cursor: u32, csize: u32) -> FormatResult<u32> {
    cursor
        .checked_add(csize)
        .and_then(|end| end.checked_add(RES_ALIGNMENT - 1))
        .map(|end| end & !(RES_ALIGNMENT - 1))
        .ok_or(FormatError::OffsetOverflow(cursor))
}

/// Allocated directory capacity for `count` entries.
///
/// Always the next multiple of [`DIR_GROWTH_QUANTUM`] strictly above
/// `count`, so a freshly read directory has room to append at least one
/// entry without growing.
pub const fn grow_capacity(count: usize) -> usize {
    (count + DIR_GROWTH_QUANTUM) & !(DIR_GROWTH_QUANTUM - 1)
}

/// Encode a real file offset for storage in a resource descriptor.
pub const fn encode_offset(real: u32) -> u32 {
    real
}

/// Decode a descriptor offset back to a file offset.
pub const fn decode_offset(encoded: u32) -> u32 {
    encoded
}

/// Walks directory entries alongside the data offset of each.
///
/// Deleted entries (id 0) are yielded too; they still occupy layout space.
pub struct EntryOffsets<'a> {
    entries: std::slice::Iter<'a, DirEntry>,
    cursor: u32,
}

impl<'a> EntryOffsets<'a> {
    /// Start walking `entries` from the directory's data offset
    pub fn new(data_offset: u32, entries: &'a [DirEntry]) -> Self {
        Self {
            entries: entries.iter(),
            cursor: data_offset,
        }
    }

    /// Cursor after every entry yielded so far
    pub const fn cursor(&self) -> u32 {
        self.cursor
    }
}

impl<'a> Iterator for EntryOffsets<'a> {
    type Item = FormatResult<(&'a DirEntry, u32)>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.next()?;
        let offset = self.cursor;
        Some(next_data_offset(offset, entry.csize()).map(|next| {
            self.cursor = next;
            (entry, offset)
        }))
    }
}

/// Data offsets for every entry plus the offset where the directory goes.
pub fn compute_layout(data_offset: u32, entries: &[DirEntry]) -> FormatResult<(Vec<u32>, u32)> {
    let mut walk = EntryOffsets::new(data_offset, entries);
    let mut offsets = Vec::with_capacity(entries.len());
    for item in walk.by_ref() {
        offsets.push(item?.1);
    }
    Ok((offsets, walk.cursor()))
}
