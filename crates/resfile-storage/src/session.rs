//! Open/close workflow over the slot registry and the resource table

use crate::caseless::open_caseless;
use crate::codec;
use crate::config::ResConfig;
use crate::edit::EditFlags;
use crate::registry::{FileNum, ResFile, SlotRegistry};
use crate::table::{DescriptorTable, ResourceTable};
use crate::{ResError, Result};
use resfile_format::{
    DirEntry, Directory, FileHeader, FormatError, MAX_RESOURCE_SIZE, ResourceFlags, ResourceId,
    ResourceType, next_data_offset,
};
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// How a container file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Existing file, read-only
    Read,
    /// Existing file, read-write
    Edit,
    /// Existing file read-write, created when it cannot be opened
    EditOrCreate,
    /// New file, truncating any existing one
    Create,
}

impl OpenMode {
    /// Whether the handle is opened for writing
    pub const fn is_mutable(self) -> bool {
        !matches!(self, Self::Read)
    }
}

/// Manager for open container files and the resources they define
///
/// Owns the slot registry and the resource table. Dropping the manager
/// closes every file still open.
#[derive(Debug)]
pub struct ResourceManager<T: ResourceTable = DescriptorTable> {
    config: ResConfig,
    files: SlotRegistry,
    table: T,
}

impl ResourceManager<DescriptorTable> {
    /// Create a manager with the in-memory descriptor table
    ///
    /// # Errors
    ///
    /// Returns `ResError::Config` if the configuration is invalid
    pub fn new(config: ResConfig) -> Result<Self> {
        Self::with_table(config, DescriptorTable::new())
    }

    /// Bytes of resource `id`, loaded on first use
    ///
    /// # Errors
    ///
    /// Returns error if the id is unknown, compressed, or cannot be read
    pub fn resource(&mut self, id: ResourceId) -> Result<&[u8]> {
        self.table.resource(id, &mut self.files)
    }
}

impl<T: ResourceTable> ResourceManager<T> {
    /// Create a manager around a caller-supplied resource table
    ///
    /// # Errors
    ///
    /// Returns `ResError::Config` if the configuration is invalid
    pub fn with_table(config: ResConfig, table: T) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            files: SlotRegistry::new(config.max_files),
            config,
            table,
        })
    }

    /// Active configuration
    pub const fn config(&self) -> &ResConfig {
        &self.config
    }

    /// Resource table
    pub const fn table(&self) -> &T {
        &self.table
    }

    /// Mutable resource table
    pub fn table_mut(&mut self) -> &mut T {
        &mut self.table
    }

    /// Open file slots
    pub const fn files(&self) -> &SlotRegistry {
        &self.files
    }

    /// Open a container file and project its directory into the table.
    ///
    /// With `aux_info` a read-only open keeps the header and directory in
    /// memory as well.
    ///
    /// # Errors
    ///
    /// - `NoFreeSlot` when every file number is taken
    /// - `CannotOpen` / `CannotCreate` when the file cannot be opened, created or read
    /// - `InvalidFormat` when the header or directory is malformed
    /// - `OutOfMemory` when directory memory cannot be reserved
    pub fn open(
        &mut self,
        path: impl AsRef<Path>,
        mode: OpenMode,
        aux_info: bool,
    ) -> Result<FileNum> {
        let path = path.as_ref();
        let num = self.files.allocate()?;
        let (file, opened, existing) = self.open_handle(path, mode)?;
        let mut res = ResFile::new(file, opened, mode.is_mutable());

        // Rejected files never occupy the slot
        let header = if existing {
            Some(codec::read_header(&mut res.file).map_err(|e| open_failure(path, e))?)
        } else {
            None
        };

        let writable = res.writable;
        self.files.insert(num, res);
        if let Err(e) = self.populate(num, header, writable || aux_info) {
            self.purge(num);
            self.files.release(num);
            return Err(open_failure(path, e));
        }

        debug!("Opened {} as file {} ({:?})", path.display(), num, mode);
        Ok(num)
    }

    /// Close file `num`, writing back its directory and header if it was
    /// opened for writing. Closing a number that is not open does nothing.
    ///
    /// Every descriptor owned by the file is deleted and the slot is
    /// released even when writing fails; the write error is returned
    /// afterwards.
    ///
    /// # Errors
    ///
    /// Returns the error of the directory or header write
    pub fn close(&mut self, num: FileNum) -> Result<()> {
        let Some(res) = self.files.get_mut(num) else {
            return Ok(());
        };

        let flushed = if res.writable && res.edit.is_some() {
            codec::flush(res, num)
        } else {
            Ok(())
        };
        if let Err(e) = &flushed {
            warn!("Failed to write back file {}: {}", num, e);
        }

        self.purge(num);
        if let Some(res) = self.files.release(num) {
            debug!("Closed file {} ({})", num, res.path().display());
        }
        flushed
    }

    /// Close every open file, returning the first error
    ///
    /// # Errors
    ///
    /// Returns the first write-back error; all files are closed regardless
    pub fn close_all(&mut self) -> Result<()> {
        let mut first = Ok(());
        for num in self.files.open_files() {
            let result = self.close(num);
            if first.is_ok() {
                first = result;
            }
        }
        first
    }

    /// Whether `num` refers to an open file
    pub fn is_open(&self, num: FileNum) -> bool {
        self.files.is_open(num)
    }

    /// In-memory directory of `num`, present for writable and aux-info opens
    pub fn directory(&self, num: FileNum) -> Option<&Directory> {
        self.files
            .get(num)?
            .edit
            .as_ref()
            .map(|edit| &edit.directory)
    }

    /// Whether `num` holds deleted directory entries awaiting a repack
    pub fn needs_pack(&self, num: FileNum) -> bool {
        self.files
            .get(num)
            .and_then(|res| res.edit.as_ref())
            .is_some_and(|edit| edit.needs_pack())
    }

    /// Header comment of `num`
    ///
    /// # Errors
    ///
    /// Returns error if the file is not open or its header cannot be read
    pub fn comment(&mut self, num: FileNum) -> Result<String> {
        let res = self.files.file_mut(num)?;
        match &res.edit {
            Some(edit) => Ok(edit.header.comment()),
            None => Ok(codec::read_header(&mut res.file)?.comment()),
        }
    }

    /// Replace the header comment of `num`; written on close
    ///
    /// # Errors
    ///
    /// Returns `ResError::NotWritable` unless the file was opened for writing
    pub fn set_comment(&mut self, num: FileNum, text: &str) -> Result<()> {
        let res = self.files.file_mut(num)?;
        if !res.writable {
            return Err(ResError::NotWritable(num));
        }
        let edit = res.edit.as_mut().ok_or(ResError::NotWritable(num))?;
        edit.header.set_comment(text);
        Ok(())
    }

    /// Append resource `id` to file `num` and make it the current definition.
    ///
    /// An earlier entry for `id` in the same file becomes a deleted
    /// placeholder. The data is stored uncompressed.
    ///
    /// # Errors
    ///
    /// - `InvalidId` for id 0
    /// - `ResourceTooLarge` when the data does not fit the 24-bit size field
    /// - `NotWritable` unless the file was opened for writing
    /// - `Format(DirectoryFull)` when the directory already holds 65535
    ///   entries; the file and any earlier entry for `id` are left untouched
    pub fn write_resource(
        &mut self,
        num: FileNum,
        id: ResourceId,
        data: &[u8],
        rtype: ResourceType,
        flags: ResourceFlags,
    ) -> Result<()> {
        if id == 0 {
            return Err(ResError::InvalidId);
        }
        let size = u32::try_from(data.len())
            .ok()
            .filter(|size| *size <= MAX_RESOURCE_SIZE)
            .ok_or(ResError::ResourceTooLarge {
                id,
                size: data.len(),
            })?;

        let res = self.files.file_mut(num)?;
        if !res.writable {
            return Err(ResError::NotWritable(num));
        }
        let edit = res.edit.as_mut().ok_or(ResError::NotWritable(num))?;
        if edit.directory.is_full() {
            return Err(FormatError::DirectoryFull(edit.directory.len()).into());
        }

        let offset = edit.data_cursor;
        let next = next_data_offset(offset, size)?;
        res.file.seek(SeekFrom::Start(u64::from(offset)))?;
        res.file.write_all(data)?;
        res.file.write_all(&vec![0u8; (next - offset - size) as usize])?;

        let mut flags = flags;
        flags.clear(ResourceFlags::COMPRESSED);
        let entry = DirEntry::new(id, size, size, flags, rtype);
        let previous = edit.directory.position(id);
        edit.directory.push(entry)?;
        edit.data_cursor = next;
        // The earlier entry comes first, so this never hits the new one
        if previous.is_some() && edit.directory.mark_deleted(id) {
            edit.flags.set(EditFlags::NEEDS_PACK);
        }

        if self.table.filenum_of(id) == Some(num) {
            self.table.delete(id);
        }
        codec::project_entry(&mut self.table, num, &entry, offset);
        debug!("Wrote resource {} ({} bytes) to file {} at {}", id, size, num, offset);
        Ok(())
    }

    /// Mark resource `id` of file `num` deleted.
    ///
    /// The entry keeps its data space until the file is repacked. The
    /// descriptor is dropped if this file currently defines `id`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownResource` if the file has no live entry for `id`
    pub fn remove_resource(&mut self, num: FileNum, id: ResourceId) -> Result<()> {
        let res = self.files.file_mut(num)?;
        if !res.writable {
            return Err(ResError::NotWritable(num));
        }
        let edit = res.edit.as_mut().ok_or(ResError::NotWritable(num))?;
        if !edit.directory.mark_deleted(id) {
            return Err(ResError::UnknownResource(id));
        }
        edit.flags.set(EditFlags::NEEDS_PACK);

        if self.table.filenum_of(id) == Some(num) {
            self.table.delete(id);
        }
        info!("Removed resource {} from file {}", id, num);
        Ok(())
    }

    fn open_handle(&self, path: &Path, mode: OpenMode) -> Result<(File, PathBuf, bool)> {
        if mode == OpenMode::Create {
            let (file, path) = create_file(path)?;
            return Ok((file, path, false));
        }

        let mut options = OpenOptions::new();
        options.read(true).write(mode.is_mutable());
        match self.open_existing(path, &options) {
            Ok((file, opened)) => Ok((file, opened, true)),
            Err(e) if mode == OpenMode::EditOrCreate => {
                debug!("Creating {} after failed open: {}", path.display(), e);
                let (file, path) = create_file(path)?;
                Ok((file, path, false))
            }
            Err(source) => Err(ResError::CannotOpen {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn open_existing(
        &self,
        path: &Path,
        options: &OpenOptions,
    ) -> std::io::Result<(File, PathBuf)> {
        if self.config.caseless_fallback {
            open_caseless(path, options)
        } else {
            options.open(path).map(|file| (file, path.to_path_buf()))
        }
    }

    /// Read or initialise the directory of a file already in slot `num`
    fn populate(&mut self, num: FileNum, header: Option<FileHeader>, keep: bool) -> Result<()> {
        let edit = match header {
            None => codec::create_directory(&mut self.files, num)?,
            Some(header) if keep => {
                codec::read_directory_edit(&mut self.files, num, header, &mut self.table)?
            }
            Some(header) => {
                codec::read_directory_streaming(
                    &mut self.files,
                    num,
                    &header,
                    &mut self.table,
                    self.config.entry_batch,
                )?;
                return Ok(());
            }
        };
        self.files.file_mut(num)?.edit = Some(edit);
        Ok(())
    }

    /// Delete every descriptor owned by `num`, in ascending id order
    fn purge(&mut self, num: FileNum) {
        for id in 1..=self.table.max_id() {
            if self.table.in_use(id) && self.table.filenum_of(id) == Some(num) {
                self.table.delete(id);
            }
        }
    }
}

impl<T: ResourceTable> Drop for ResourceManager<T> {
    fn drop(&mut self) {
        if let Err(e) = self.close_all() {
            warn!("Error closing resource files: {}", e);
        }
    }
}

fn create_file(path: &Path) -> Result<(File, PathBuf)> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map(|file| (file, path.to_path_buf()))
        .map_err(|source| ResError::CannotCreate {
            path: path.to_path_buf(),
            source,
        })
}

/// Classify a failure while reading on-disk structures during open
///
/// Every outcome carries one of the legacy open codes.
fn open_failure(path: &Path, err: ResError) -> ResError {
    match err {
        ResError::Format(FormatError::Allocation(e)) => ResError::OutOfMemory(e.to_string()),
        ResError::Format(FormatError::Io(source)) | ResError::Io(source) => ResError::CannotOpen {
            path: path.to_path_buf(),
            source,
        },
        ResError::Format(e) => ResError::InvalidFormat {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
        other => other,
    }
}
