//! Resource descriptor table
//!
//! The file manager never owns resource bytes itself. It projects directory
//! entries into a table keyed by resource id, asks the table to load
//! load-on-open resources, and on close asks it to delete every descriptor
//! the closing file owns. [`ResourceTable`] is that contract;
//! [`DescriptorTable`] is the in-memory implementation used by default.

use crate::lru::LruList;
use crate::registry::{FileNum, SlotRegistry};
use crate::{ResError, Result};
use resfile_format::{ResourceFlags, ResourceId, ResourceType, decode_offset};
use std::io::{Read, Seek, SeekFrom};
use tracing::debug;

/// Ids the table grows by when it has to cover a new id
const TABLE_GROW: usize = 1024;

/// Highest number of descriptor rows (every u16 id)
const TABLE_MAX: usize = ResourceId::MAX as usize + 1;

/// Directory entry as seen by the descriptor table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projection {
    /// Uncompressed size
    pub size: u32,
    /// File that holds the data
    pub filenum: FileNum,
    /// Encoded data offset within that file
    pub offset: u32,
    /// Resource flags
    pub flags: ResourceFlags,
    /// Resource type
    pub rtype: ResourceType,
}

/// Result of projecting an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectOutcome {
    /// The id had no descriptor
    Inserted,
    /// An existing descriptor was overwritten (collision)
    Replaced {
        /// File that owned the id before
        previous: FileNum,
    },
}

/// Operations the file manager needs from the resource table
pub trait ResourceTable {
    /// Grow the table so it can hold `id`
    fn extend(&mut self, id: ResourceId);

    /// Write a directory entry into the descriptor for `id`.
    ///
    /// Overwrites an existing descriptor; the newest projection wins.
    fn project(&mut self, id: ResourceId, projection: Projection) -> ProjectOutcome;

    /// Read the bytes of `id` into memory.
    ///
    /// May reposition the stream of any open file; callers that depend on a
    /// file position must save and restore it around this call.
    ///
    /// # Errors
    ///
    /// Returns error if the id is unknown, its file is not open, or the read fails
    fn load(&mut self, id: ResourceId, files: &mut SlotRegistry) -> Result<()>;

    /// Put `id` at the tail of the eviction list
    fn append_to_tail(&mut self, id: ResourceId);

    /// Drop the descriptor for `id` and any resident bytes
    fn delete(&mut self, id: ResourceId);

    /// Whether a descriptor exists for `id`
    fn in_use(&self, id: ResourceId) -> bool;

    /// File that owns `id`
    fn filenum_of(&self, id: ResourceId) -> Option<FileNum>;

    /// Highest id the table currently covers
    fn max_id(&self) -> ResourceId;
}

/// Descriptor of one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResDesc {
    /// Resident bytes, absent until loaded
    pub data: Option<Box<[u8]>>,
    /// Uncompressed size
    pub size: u32,
    /// Owning file
    pub filenum: FileNum,
    /// Encoded data offset
    pub offset: u32,
    /// Resource flags
    pub flags: ResourceFlags,
    /// Resource type
    pub rtype: ResourceType,
    /// How many times a projection replaced an earlier descriptor for this id
    pub overwrites: u32,
}

impl ResDesc {
    /// Whether the bytes are resident
    pub const fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    /// Real offset of the data within the owning file
    pub const fn file_offset(&self) -> u32 {
        decode_offset(self.offset)
    }
}

/// In-memory descriptor table indexed by resource id
#[derive(Debug, Default)]
pub struct DescriptorTable {
    descs: Vec<Option<ResDesc>>,
    lru: LruList,
}

impl DescriptorTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor for `id`
    pub fn get(&self, id: ResourceId) -> Option<&ResDesc> {
        self.descs.get(usize::from(id))?.as_ref()
    }

    /// Number of live descriptors
    pub fn len(&self) -> usize {
        self.descs.iter().filter(|d| d.is_some()).count()
    }

    /// Whether the table has no live descriptors
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids with a live descriptor, ascending
    pub fn ids(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.descs
            .iter()
            .enumerate()
            .filter(|(_, d)| d.is_some())
            .filter_map(|(id, _)| ResourceId::try_from(id).ok())
    }

    /// Resident list, least recently used first
    pub const fn lru(&self) -> &LruList {
        &self.lru
    }

    /// Bytes of `id`, loading them on first use
    ///
    /// # Errors
    ///
    /// Returns error if the resource cannot be loaded
    pub fn resource(&mut self, id: ResourceId, files: &mut SlotRegistry) -> Result<&[u8]> {
        let loaded = self
            .get(id)
            .ok_or(ResError::UnknownResource(id))?
            .is_loaded();
        if loaded {
            self.lru.touch(id);
        } else {
            self.load(id, files)?;
            self.append_to_tail(id);
        }
        self.get(id)
            .and_then(|d| d.data.as_deref())
            .ok_or(ResError::UnknownResource(id))
    }

    fn slot_mut(&mut self, id: ResourceId) -> Option<&mut Option<ResDesc>> {
        self.descs.get_mut(usize::from(id))
    }
}

impl ResourceTable for DescriptorTable {
    fn extend(&mut self, id: ResourceId) {
        let needed = usize::from(id) + 1;
        if needed > self.descs.len() {
            let new_len = needed.div_ceil(TABLE_GROW) * TABLE_GROW;
            self.descs.resize_with(new_len.min(TABLE_MAX), || None);
        }
    }

    fn project(&mut self, id: ResourceId, projection: Projection) -> ProjectOutcome {
        self.extend(id);
        let previous = self.slot_mut(id).and_then(Option::take);
        if previous.as_ref().is_some_and(ResDesc::is_loaded) {
            self.lru.remove(id);
        }

        let desc = ResDesc {
            data: None,
            size: projection.size,
            filenum: projection.filenum,
            offset: projection.offset,
            flags: projection.flags,
            rtype: projection.rtype,
            overwrites: previous.as_ref().map_or(0, |p| p.overwrites + 1),
        };
        if let Some(slot) = self.slot_mut(id) {
            *slot = Some(desc);
        }

        match previous {
            Some(prev) => ProjectOutcome::Replaced {
                previous: prev.filenum,
            },
            None => ProjectOutcome::Inserted,
        }
    }

    fn load(&mut self, id: ResourceId, files: &mut SlotRegistry) -> Result<()> {
        let desc = self.get(id).ok_or(ResError::UnknownResource(id))?;
        if desc.is_loaded() {
            return Ok(());
        }
        if desc.flags.is_compressed() {
            return Err(ResError::Compressed(id));
        }
        let (filenum, offset, size) = (desc.filenum, desc.file_offset(), desc.size);

        let file = &mut files.file_mut(filenum)?.file;
        file.seek(SeekFrom::Start(u64::from(offset)))?;
        let mut data = vec![0u8; size as usize];
        file.read_exact(&mut data)?;
        debug!("Loaded resource {} ({} bytes) from file {}", id, size, filenum);

        if let Some(Some(desc)) = self.slot_mut(id) {
            desc.data = Some(data.into_boxed_slice());
        }
        Ok(())
    }

    fn append_to_tail(&mut self, id: ResourceId) {
        if self.get(id).is_some_and(ResDesc::is_loaded) {
            self.lru.append_tail(id);
        }
    }

    fn delete(&mut self, id: ResourceId) {
        if let Some(slot) = self.slot_mut(id) {
            *slot = None;
        }
        self.lru.remove(id);
    }

    fn in_use(&self, id: ResourceId) -> bool {
        self.get(id).is_some()
    }

    fn filenum_of(&self, id: ResourceId) -> Option<FileNum> {
        self.get(id).map(|d| d.filenum)
    }

    fn max_id(&self) -> ResourceId {
        ResourceId::try_from(self.descs.len().saturating_sub(1)).unwrap_or(ResourceId::MAX)
    }
}
