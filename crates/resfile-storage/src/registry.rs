//! Open file slots
//!
//! Each open container occupies one slot, addressed by a small file number.
//! Number 0 is never handed out so "no file" needs no sentinel. A slot is
//! free exactly when it holds no file.

use crate::edit::EditState;
use crate::{ResError, Result};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Number identifying an open container file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileNum(u8);

impl FileNum {
    /// Wrap a raw number, rejecting the reserved 0
    pub const fn new(raw: u8) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    /// Raw slot number
    pub const fn get(self) -> u8 {
        self.0
    }

    const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FileNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An open container file
#[derive(Debug)]
pub struct ResFile {
    /// Underlying handle
    pub file: File,
    /// Path that was actually opened (after case correction)
    pub path: PathBuf,
    /// Whether the handle was opened for writing
    pub writable: bool,
    /// Directory and header state, present for writable or aux-info opens
    pub edit: Option<EditState>,
}

impl ResFile {
    /// Wrap a freshly opened handle with no edit state yet
    pub const fn new(file: File, path: PathBuf, writable: bool) -> Self {
        Self {
            file,
            path,
            writable,
            edit: None,
        }
    }

    /// Path that was opened
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Fixed-capacity table of open container files
#[derive(Debug)]
pub struct SlotRegistry {
    /// Index 0 is permanently empty
    slots: Vec<Option<ResFile>>,
}

impl SlotRegistry {
    /// Create a registry with file numbers `1..=max_files`
    pub fn new(max_files: u8) -> Self {
        let mut slots = Vec::with_capacity(usize::from(max_files) + 1);
        slots.resize_with(usize::from(max_files) + 1, || None);
        Self { slots }
    }

    /// Highest usable file number
    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }

    /// Number of open files
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Whether no file is open
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lowest free file number
    ///
    /// The slot stays free until a file is [`insert`](Self::insert)ed.
    ///
    /// # Errors
    ///
    /// Returns `ResError::NoFreeSlot` if every slot holds a file
    pub fn allocate(&self) -> Result<FileNum> {
        self.slots
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, slot)| slot.is_none())
            .and_then(|(index, _)| u8::try_from(index).ok())
            .and_then(FileNum::new)
            .ok_or_else(|| ResError::NoFreeSlot(self.len()))
    }

    /// Occupy slot `num`, returning any file it held before
    pub fn insert(&mut self, num: FileNum, file: ResFile) -> Option<ResFile> {
        self.slots.get_mut(num.index())?.replace(file)
    }

    /// Free slot `num`, handing back the file it held
    pub fn release(&mut self, num: FileNum) -> Option<ResFile> {
        self.slots.get_mut(num.index())?.take()
    }

    /// Whether slot `num` holds a file
    pub fn is_open(&self, num: FileNum) -> bool {
        self.get(num).is_some()
    }

    /// File in slot `num`
    pub fn get(&self, num: FileNum) -> Option<&ResFile> {
        self.slots.get(num.index())?.as_ref()
    }

    /// Mutable file in slot `num`
    pub fn get_mut(&mut self, num: FileNum) -> Option<&mut ResFile> {
        self.slots.get_mut(num.index())?.as_mut()
    }

    /// Mutable file in slot `num`, or `NotOpen`
    ///
    /// # Errors
    ///
    /// Returns `ResError::NotOpen` if the slot is free
    pub fn file_mut(&mut self, num: FileNum) -> Result<&mut ResFile> {
        self.get_mut(num).ok_or(ResError::NotOpen(num))
    }

    /// File numbers of all open files, ascending
    pub fn open_files(&self) -> Vec<FileNum> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .filter_map(|(index, _)| u8::try_from(index).ok().and_then(FileNum::new))
            .collect()
    }
}
