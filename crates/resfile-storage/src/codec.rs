//! Header and directory I/O against open file slots
//!
//! Reading a directory projects every live entry into the resource table
//! and computes each entry's data offset by walking the directory in order.
//! Entries flagged load-on-open are read right away, with the directory
//! stream position saved and restored around each load.
//!
//! A directory is checked to be complete before its first entry reaches the
//! table, so a rejected file never replaces descriptors of other files.

use crate::edit::{EditFlags, EditState};
use crate::registry::{FileNum, ResFile, SlotRegistry};
use crate::table::{ProjectOutcome, Projection, ResourceTable};
use crate::{ResError, Result};
use resfile_format::{
    DIR_ENTRY_SIZE, DIR_HEADER_SIZE, DirEntry, DirHeader, Directory, FileHeader, FormatError,
    HEADER_SIZE, ResourceId, encode_offset, next_data_offset, read_entry_batch,
};
use std::io::{Read, Seek, SeekFrom, Write};
use tracing::{debug, warn};

/// Read and validate the file header at offset 0
///
/// # Errors
///
/// Returns `ResError::Format` if the header is short or the signature is wrong
pub fn read_header<R: Read + Seek>(reader: &mut R) -> Result<FileHeader> {
    reader.seek(SeekFrom::Start(0))?;
    Ok(FileHeader::read_from(reader)?)
}

/// Read the directory of slot `num` without keeping it.
///
/// Entries are read `batch` at a time. Returns the data cursor following the
/// last entry, which is where the directory itself starts.
///
/// # Errors
///
/// Returns error if the directory is truncated or cannot be read
pub fn read_directory_streaming<T: ResourceTable>(
    files: &mut SlotRegistry,
    num: FileNum,
    header: &FileHeader,
    table: &mut T,
    batch: usize,
) -> Result<u32> {
    let dir_header = {
        let file = &mut files.file_mut(num)?.file;
        file.seek(SeekFrom::Start(u64::from(header.dir_offset)))?;
        let dir_header = DirHeader::read_from(file)?;
        check_entries_present(file.metadata()?.len(), header.dir_offset, &dir_header)?;
        dir_header
    };
    debug!(
        "Streaming {} directory entries of file {}",
        dir_header.num_entries, num
    );

    let mut cursor = dir_header.data_offset;
    let mut remaining = usize::from(dir_header.num_entries);
    while remaining > 0 {
        let count = remaining.min(batch.max(1));
        let entries = read_entry_batch(&mut files.file_mut(num)?.file, count)?;
        remaining -= count;

        for entry in &entries {
            let offset = cursor;
            cursor = next_data_offset(cursor, entry.csize())?;
            if entry.is_deleted() {
                continue;
            }
            project_entry(table, num, entry, offset);
            if entry.flags().load_on_open() {
                eager_load(files, num, table, entry.id)?;
            }
        }
    }
    Ok(cursor)
}

/// Read the full directory of slot `num` into a fresh edit state
///
/// Deleted placeholders set `NEEDS_PACK` and still advance the cursor. The
/// returned state's data cursor is the append point.
///
/// # Errors
///
/// Returns error if the directory cannot be read or its offsets overflow
pub fn read_directory_edit<T: ResourceTable>(
    files: &mut SlotRegistry,
    num: FileNum,
    header: FileHeader,
    table: &mut T,
) -> Result<EditState> {
    let directory = {
        let file = &mut files.file_mut(num)?.file;
        file.seek(SeekFrom::Start(u64::from(header.dir_offset)))?;
        let dir_header = DirHeader::read_from(file)?;
        Directory::read_from(file, dir_header)?
    };
    debug!(
        "Read {} directory entries of file {} (capacity {})",
        directory.len(),
        num,
        directory.capacity()
    );

    let (offsets, cursor) = directory.layout()?;
    let mut edit = EditState::for_existing(header, directory);
    for (entry, offset) in edit.directory.entries().iter().zip(offsets) {
        if entry.is_deleted() {
            edit.flags.set(EditFlags::NEEDS_PACK);
            continue;
        }
        project_entry(table, num, entry, offset);
        if entry.flags().load_on_open() {
            eager_load(files, num, table, entry.id)?;
        }
    }
    edit.data_cursor = cursor;
    Ok(edit)
}

/// Fail unless a file of `file_len` bytes holds every entry `dir_header` announces
fn check_entries_present(file_len: u64, dir_offset: u32, dir_header: &DirHeader) -> Result<()> {
    let needed = usize::from(dir_header.num_entries) * DIR_ENTRY_SIZE;
    let start = u64::from(dir_offset) + DIR_HEADER_SIZE as u64;
    if file_len < start + needed as u64 {
        return Err(FormatError::Truncated {
            what: "directory entries",
            needed,
        }
        .into());
    }
    Ok(())
}

/// Initialise an empty directory for a newly created file in slot `num`
///
/// # Errors
///
/// Returns error if directory memory cannot be reserved or the seek fails
pub fn create_directory(files: &mut SlotRegistry, num: FileNum) -> Result<EditState> {
    let edit = EditState::for_create()?;
    files
        .file_mut(num)?
        .file
        .seek(SeekFrom::Start(HEADER_SIZE as u64))?;
    Ok(edit)
}

/// Write the directory at the data cursor
///
/// # Errors
///
/// Returns `ResError::NotWritable` if the file has no edit state
pub fn write_directory(res: &mut ResFile, num: FileNum) -> Result<()> {
    let edit = res.edit.as_ref().ok_or(ResError::NotWritable(num))?;
    res.file
        .seek(SeekFrom::Start(u64::from(edit.data_cursor)))?;
    edit.directory.write_to(&mut res.file)?;
    Ok(())
}

/// Point the header at the data cursor and write it at offset 0
///
/// # Errors
///
/// Returns `ResError::NotWritable` if the file has no edit state
pub fn write_header(res: &mut ResFile, num: FileNum) -> Result<()> {
    let edit = res.edit.as_mut().ok_or(ResError::NotWritable(num))?;
    edit.header.dir_offset = edit.data_cursor;
    res.file.seek(SeekFrom::Start(0))?;
    edit.header.write_to(&mut res.file)?;
    Ok(())
}

/// Write directory and header, then flush the handle
///
/// # Errors
///
/// Returns error if any write fails
pub fn flush(res: &mut ResFile, num: FileNum) -> Result<()> {
    write_directory(res, num)?;
    write_header(res, num)?;
    res.file.flush()?;
    Ok(())
}

/// Project one live directory entry owned by `num` into the table
pub fn project_entry<T: ResourceTable>(
    table: &mut T,
    num: FileNum,
    entry: &DirEntry,
    offset: u32,
) -> ProjectOutcome {
    table.extend(entry.id);
    let outcome = table.project(
        entry.id,
        Projection {
            size: entry.size(),
            filenum: num,
            offset: encode_offset(offset),
            flags: entry.flags(),
            rtype: entry.resource_type(),
        },
    );
    if let ProjectOutcome::Replaced { previous } = outcome {
        warn!(
            "Resource {} from file {} replaces the one from file {}",
            entry.id, num, previous
        );
    }
    outcome
}

/// Load `id` now and put it at the LRU tail, keeping the stream position of `num`
///
/// A failed load only logs a warning and leaves the resource to be loaded
/// on demand. Compressed resources are skipped the same way.
///
/// # Errors
///
/// Returns error if the stream position cannot be saved or restored
pub fn eager_load<T: ResourceTable>(
    files: &mut SlotRegistry,
    num: FileNum,
    table: &mut T,
    id: ResourceId,
) -> Result<()> {
    let saved = files.file_mut(num)?.file.stream_position()?;
    match table.load(id, files) {
        Ok(()) => table.append_to_tail(id),
        Err(ResError::Compressed(_)) => {
            warn!("Skipping load-on-open of compressed resource {}", id);
        }
        Err(e) => warn!("Load-on-open of resource {} from file {} failed: {}", id, num, e),
    }
    files.file_mut(num)?.file.seek(SeekFrom::Start(saved))?;
    Ok(())
}
