//! Subcommand implementations

use crate::cli::{Cli, Command};
use anyhow::{Context, Result, bail};
use resfile_format::{DirEntry, ResourceFlags, ResourceId, ResourceType};
use resfile_storage::{FileNum, OpenMode, ResourceManager};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// One directory entry as printed by `list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryRow {
    /// Resource id, 0 for a deleted placeholder
    pub id: ResourceId,
    /// Resource type name
    pub rtype: String,
    /// Uncompressed size
    pub size: u32,
    /// Stored size
    pub csize: u32,
    /// Flag names
    pub flags: String,
    /// Data offset within the file
    pub offset: u32,
}

impl EntryRow {
    fn new(entry: &DirEntry, offset: u32) -> Self {
        Self {
            id: entry.id,
            rtype: entry.resource_type().to_string(),
            size: entry.size(),
            csize: entry.csize(),
            flags: entry.flags().to_string(),
            offset,
        }
    }
}

/// Run the parsed command line, writing human-readable output to `out`
///
/// # Errors
///
/// Returns error if the container cannot be opened or the command fails
pub fn run(cli: &Cli, out: &mut impl Write) -> Result<()> {
    let config = cli.resolve_config()?;
    debug!("Using configuration {:?}", config);
    let mut manager = ResourceManager::new(config)?;

    match &cli.command {
        Command::List { file, json } => list(&mut manager, file, *json, out),
        Command::Info { file } => show_info(&mut manager, file, out),
        Command::Extract {
            file,
            id,
            output,
            hex,
        } => extract(&mut manager, file, *id, output.as_deref(), *hex, out),
        Command::Add {
            file,
            id,
            input,
            rtype,
            load_on_open,
        } => add(&mut manager, file, *id, input, *rtype, *load_on_open),
        Command::Remove { file, id } => remove(&mut manager, file, *id),
        Command::Comment { file, text } => comment(&mut manager, file, text.as_deref(), out),
    }
}

fn open(manager: &mut ResourceManager, file: &Path, mode: OpenMode, aux: bool) -> Result<FileNum> {
    manager
        .open(file, mode, aux)
        .with_context(|| format!("opening {}", file.display()))
}

/// Directory rows of an open file with their computed offsets
fn rows(manager: &ResourceManager, num: FileNum) -> Result<Vec<EntryRow>> {
    let Some(directory) = manager.directory(num) else {
        bail!("file {num} has no directory in memory");
    };
    let mut rows = Vec::with_capacity(directory.len());
    for item in directory.offsets() {
        let (entry, offset) = item?;
        rows.push(EntryRow::new(entry, offset));
    }
    Ok(rows)
}

fn list(manager: &mut ResourceManager, file: &Path, json: bool, out: &mut impl Write) -> Result<()> {
    let num = open(manager, file, OpenMode::Read, true)?;
    let rows = rows(manager, num)?;
    manager.close(num)?;

    if json {
        serde_json::to_writer_pretty(&mut *out, &rows)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(
        out,
        "{:>6}  {:<12} {:>8} {:>8}  {:>8}  flags",
        "id", "type", "size", "csize", "offset"
    )?;
    for row in &rows {
        let id = if row.id == 0 {
            "-".to_string()
        } else {
            row.id.to_string()
        };
        writeln!(
            out,
            "{:>6}  {:<12} {:>8} {:>8}  {:>8}  {}",
            id, row.rtype, row.size, row.csize, row.offset, row.flags
        )?;
    }
    Ok(())
}

fn show_info(manager: &mut ResourceManager, file: &Path, out: &mut impl Write) -> Result<()> {
    let num = open(manager, file, OpenMode::Read, true)?;
    let comment = manager.comment(num)?;
    let needs_pack = manager.needs_pack(num);
    let Some(directory) = manager.directory(num) else {
        bail!("file {num} has no directory in memory");
    };
    let (_, dir_offset) = directory.layout()?;
    let deleted = directory.entries().iter().filter(|e| e.is_deleted()).count();
    let live = directory.len() - deleted;
    let data_offset = directory.data_offset();
    let capacity = directory.capacity();
    let path = manager
        .files()
        .get(num)
        .map(|res| res.path().display().to_string())
        .unwrap_or_default();
    manager.close(num)?;

    writeln!(out, "file:        {path}")?;
    writeln!(out, "comment:     {comment}")?;
    writeln!(out, "resources:   {live}")?;
    writeln!(out, "deleted:     {deleted}")?;
    writeln!(out, "data offset: {data_offset}")?;
    writeln!(out, "directory:   {dir_offset}")?;
    writeln!(out, "capacity:    {capacity}")?;
    writeln!(out, "needs pack:  {}", if needs_pack { "yes" } else { "no" })?;
    Ok(())
}

fn extract(
    manager: &mut ResourceManager,
    file: &Path,
    id: ResourceId,
    output: Option<&Path>,
    as_hex: bool,
    out: &mut impl Write,
) -> Result<()> {
    let num = open(manager, file, OpenMode::Read, false)?;
    let data = manager
        .resource(id)
        .with_context(|| format!("reading resource {id}"))?
        .to_vec();
    manager.close(num)?;

    match output {
        Some(path) => {
            std::fs::write(path, &data)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("Extracted resource {} ({} bytes) to {}", id, data.len(), path.display());
        }
        None if as_hex => {
            for (index, chunk) in data.chunks(16).enumerate() {
                writeln!(out, "{:08x}  {}", index * 16, hex::encode(chunk))?;
            }
        }
        None => out.write_all(&data)?,
    }
    Ok(())
}

fn add(
    manager: &mut ResourceManager,
    file: &Path,
    id: ResourceId,
    input: &Path,
    rtype: u8,
    load_on_open: bool,
) -> Result<()> {
    let data = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let mut flags = ResourceFlags::default();
    if load_on_open {
        flags.set(ResourceFlags::LOAD_ON_OPEN);
    }

    let num = open(manager, file, OpenMode::EditOrCreate, false)?;
    manager
        .write_resource(num, id, &data, ResourceType::from(rtype), flags)
        .with_context(|| format!("adding resource {id}"))?;
    manager.close(num)?;
    info!("Added resource {} ({} bytes) to {}", id, data.len(), file.display());
    Ok(())
}

fn remove(manager: &mut ResourceManager, file: &Path, id: ResourceId) -> Result<()> {
    let num = open(manager, file, OpenMode::Edit, false)?;
    manager
        .remove_resource(num, id)
        .with_context(|| format!("removing resource {id}"))?;
    manager.close(num)?;
    Ok(())
}

fn comment(
    manager: &mut ResourceManager,
    file: &Path,
    text: Option<&str>,
    out: &mut impl Write,
) -> Result<()> {
    match text {
        Some(text) => {
            let num = open(manager, file, OpenMode::Edit, false)?;
            manager.set_comment(num, text)?;
            manager.close(num)?;
        }
        None => {
            let num = open(manager, file, OpenMode::Read, false)?;
            let comment = manager.comment(num)?;
            manager.close(num)?;
            writeln!(out, "{comment}")?;
        }
    }
    Ok(())
}
