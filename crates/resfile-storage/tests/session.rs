//! End-to-end tests of opening, writing and closing container files

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use pretty_assertions::assert_eq;
use resfile_format::{
    FileHeader, FormatError, HEADER_SIZE, ResourceFlags, ResourceId, ResourceType,
};
use resfile_storage::{
    DescriptorTable, FileNum, OpenMode, ProjectOutcome, Projection, ResConfig, ResError,
    ResourceManager, ResourceTable, SlotRegistry,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn manager() -> ResourceManager {
    ResourceManager::new(ResConfig::default()).unwrap()
}

fn plain() -> ResourceFlags {
    ResourceFlags::default()
}

/// Create `name` holding `resources`, closing it again
fn create_file(dir: &TempDir, name: &str, resources: &[(ResourceId, &[u8], u8)]) -> PathBuf {
    let path = dir.path().join(name);
    let mut manager = manager();
    let file = manager.open(&path, OpenMode::Create, false).unwrap();
    for &(id, data, flags) in resources {
        manager
            .write_resource(file, id, data, ResourceType::String, ResourceFlags::new(flags))
            .unwrap();
    }
    manager.close(file).unwrap();
    path
}

#[test]
fn test_create_then_read_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("round.res");

    let mut manager = manager();
    let file = manager.open(&path, OpenMode::Create, false).unwrap();
    manager
        .write_resource(file, 10, b"palette bytes", ResourceType::Palette, plain())
        .unwrap();
    manager
        .write_resource(
            file,
            11,
            &[7u8; 33],
            ResourceType::Image,
            ResourceFlags::new(ResourceFlags::NO_DROP),
        )
        .unwrap();
    manager.close(file).unwrap();
    assert!(manager.table().is_empty());

    let file = manager.open(&path, OpenMode::Read, false).unwrap();
    let desc = manager.table().get(10).unwrap();
    assert_eq!(desc.size, 13);
    assert_eq!(desc.rtype, ResourceType::Palette);
    assert_eq!(desc.filenum, file);
    let desc = manager.table().get(11).unwrap();
    assert_eq!(desc.size, 33);
    assert_eq!(desc.rtype, ResourceType::Image);
    assert!(desc.flags.has(ResourceFlags::NO_DROP));

    assert_eq!(manager.resource(10).unwrap(), b"palette bytes");
    assert_eq!(manager.resource(11).unwrap(), &[7u8; 33][..]);
    assert!(matches!(
        manager.resource(12),
        Err(ResError::UnknownResource(12))
    ));
    manager.close(file).unwrap();
}

#[test]
fn test_two_resource_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_file(&dir, "scenario.res", &[(1, &[0xAA; 100], 0), (2, &[0xBB; 50], 0)]);

    let bytes = std::fs::read(&path).unwrap();
    let header = FileHeader::parse(&bytes).unwrap();
    assert_eq!(header.dir_offset, 280);
    assert_eq!(bytes.len(), 280 + 6 + 2 * 12);
    assert_eq!(&bytes[128..228], &[0xAA; 100][..]);
    assert_eq!(&bytes[228..278], &[0xBB; 50][..]);
    assert_eq!(&bytes[278..280], &[0u8, 0][..]);

    let mut manager = manager();
    manager.open(&path, OpenMode::Read, false).unwrap();
    assert_eq!(manager.table().get(1).unwrap().offset, 128);
    assert_eq!(manager.table().get(2).unwrap().offset, 228);
}

#[test]
fn test_slot_exhaustion_and_reuse() {
    let dir = tempfile::tempdir().unwrap();
    let a = create_file(&dir, "a.res", &[]);
    let b = create_file(&dir, "b.res", &[]);
    let c = create_file(&dir, "c.res", &[]);

    let mut manager = ResourceManager::new(ResConfig::default().with_max_files(2)).unwrap();
    let first = manager.open(&a, OpenMode::Read, false).unwrap();
    let second = manager.open(&b, OpenMode::Read, false).unwrap();
    assert_eq!((first.get(), second.get()), (1, 2));

    let err = manager.open(&c, OpenMode::Read, false).unwrap_err();
    assert!(matches!(err, ResError::NoFreeSlot(2)));
    assert_eq!(err.legacy_code(), Some(-1));

    manager.close(first).unwrap();
    assert_eq!(manager.open(&c, OpenMode::Read, false).unwrap(), first);
}

#[test]
fn test_bad_header_leaves_no_slot() {
    let dir = tempfile::tempdir().unwrap();
    let junk = dir.path().join("junk.res");
    std::fs::write(&junk, [0x55u8; 200]).unwrap();
    let short = dir.path().join("short.res");
    std::fs::write(&short, b"LG Res File v2\r\n").unwrap();

    let mut manager = manager();
    for path in [&junk, &short] {
        let err = manager.open(path, OpenMode::Read, false).unwrap_err();
        assert!(matches!(err, ResError::InvalidFormat { .. }), "{err}");
        assert_eq!(err.legacy_code(), Some(-3));
    }
    let err = manager.open(&junk, OpenMode::Edit, false).unwrap_err();
    assert!(matches!(err, ResError::InvalidFormat { .. }));
    assert!(manager.files().is_empty());
}

#[test]
fn test_truncated_directory_releases_slot() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_file(&dir, "cut.res", &[(1, b"one", 0), (2, b"two", 0)]);
    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() - 5]).unwrap();

    let mut manager = ResourceManager::new(ResConfig::default().with_entry_batch(1)).unwrap();
    let err = manager.open(&path, OpenMode::Read, false).unwrap_err();
    assert!(matches!(err, ResError::InvalidFormat { .. }), "{err}");
    assert!(manager.files().is_empty());
    // Nothing from the rejected file reaches the table
    assert!(manager.table().is_empty());
}

#[test]
fn test_truncated_directory_keeps_other_files_definitions() {
    let dir = tempfile::tempdir().unwrap();
    let a = create_file(&dir, "a.res", &[(1, b"from-a", 0)]);
    let b = create_file(&dir, "b.res", &[(1, b"from-b", 0), (2, b"tail", 0)]);
    let bytes = std::fs::read(&b).unwrap();
    std::fs::write(&b, &bytes[..bytes.len() - 5]).unwrap();

    for mode in [OpenMode::Read, OpenMode::Edit] {
        let mut manager =
            ResourceManager::new(ResConfig::default().with_entry_batch(1)).unwrap();
        let fa = manager.open(&a, OpenMode::Read, false).unwrap();

        let err = manager.open(&b, mode, false).unwrap_err();
        assert!(matches!(err, ResError::InvalidFormat { .. }), "{err}");
        assert!(manager.is_open(fa));
        assert_eq!(manager.files().len(), 1);

        let desc = manager.table().get(1).unwrap();
        assert_eq!(desc.filenum, fa);
        assert_eq!(desc.overwrites, 0);
        assert!(!manager.table().in_use(2));
        assert_eq!(manager.resource(1).unwrap(), b"from-a");
    }
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.res");
    let mut manager = manager();

    for mode in [OpenMode::Read, OpenMode::Edit] {
        let err = manager.open(&missing, mode, false).unwrap_err();
        assert!(matches!(err, ResError::CannotOpen { .. }));
        assert_eq!(err.legacy_code(), Some(-2));
    }

    let file = manager.open(&missing, OpenMode::EditOrCreate, false).unwrap();
    assert!(manager.directory(file).unwrap().is_empty());
    manager.close(file).unwrap();
    assert_eq!(
        std::fs::metadata(&missing).unwrap().len(),
        (HEADER_SIZE + 6) as u64
    );

    let err = manager
        .open(dir.path().join("no/such/dir.res"), OpenMode::Create, false)
        .unwrap_err();
    assert!(matches!(err, ResError::CannotCreate { .. }));
}

#[test]
fn test_collision_later_file_wins() {
    let dir = tempfile::tempdir().unwrap();
    let a = create_file(&dir, "a.res", &[(5, b"aaa", 0), (6, b"only a", 0)]);
    let b = create_file(&dir, "b.res", &[(5, b"bbbbb", 0)]);

    let mut manager = manager();
    let fa = manager.open(&a, OpenMode::Read, false).unwrap();
    let fb = manager.open(&b, OpenMode::Read, false).unwrap();

    let desc = manager.table().get(5).unwrap();
    assert_eq!(desc.filenum, fb);
    assert_eq!(desc.size, 5);
    assert_eq!(desc.overwrites, 1);
    assert_eq!(manager.table().len(), 2);
    assert_eq!(manager.resource(5).unwrap(), b"bbbbb");

    // Closing the first file leaves the winner alone
    manager.close(fa).unwrap();
    assert!(!manager.table().in_use(6));
    assert_eq!(manager.table().filenum_of(5), Some(fb));

    manager.close(fb).unwrap();
    assert!(manager.table().is_empty());
}

#[test]
fn test_eager_load_across_batches() {
    let dir = tempfile::tempdir().unwrap();
    let payloads: Vec<(ResourceId, Vec<u8>, u8)> = (1..=70u16)
        .map(|id| {
            let flags = if id % 7 == 0 {
                ResourceFlags::LOAD_ON_OPEN
            } else {
                0
            };
            (id, vec![id as u8; usize::from(id % 9) + 1], flags)
        })
        .collect();
    let resources: Vec<(ResourceId, &[u8], u8)> = payloads
        .iter()
        .map(|(id, data, flags)| (*id, data.as_slice(), *flags))
        .collect();
    let path = create_file(&dir, "eager.res", &resources);

    for batch in [1, 4, 64] {
        let mut manager =
            ResourceManager::new(ResConfig::default().with_entry_batch(batch)).unwrap();
        manager.open(&path, OpenMode::Read, false).unwrap();

        for (id, data, flags) in &payloads {
            let desc = manager.table().get(*id).unwrap();
            if *flags == 0 {
                assert!(!desc.is_loaded(), "resource {id} loaded early");
            } else {
                assert_eq!(desc.data.as_deref(), Some(data.as_slice()));
            }
        }
        let loaded: Vec<ResourceId> = manager.table().lru().iter().collect();
        assert_eq!(loaded, vec![7, 14, 21, 28, 35, 42, 49, 56, 63, 70]);

        // Lazily loaded bytes agree with the computed offsets
        for (id, data, _) in &payloads {
            assert_eq!(manager.resource(*id).unwrap(), data.as_slice());
        }
    }
}

#[test]
fn test_edit_reopen_appends() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_file(&dir, "grow.res", &[(1, b"first", 0)]);

    let mut manager = manager();
    let file = manager.open(&path, OpenMode::Edit, false).unwrap();
    assert!(!manager.needs_pack(file));
    manager
        .write_resource(file, 2, b"second", ResourceType::Font, plain())
        .unwrap();
    manager.close(file).unwrap();

    let file = manager.open(&path, OpenMode::Read, false).unwrap();
    assert_eq!(manager.resource(1).unwrap(), b"first");
    assert_eq!(manager.resource(2).unwrap(), b"second");
    assert_eq!(manager.table().get(2).unwrap().offset, 136);
    manager.close(file).unwrap();
}

#[test]
fn test_rewrite_leaves_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rewrite.res");

    let mut manager = manager();
    let file = manager.open(&path, OpenMode::Create, false).unwrap();
    manager
        .write_resource(file, 3, b"old", ResourceType::String, plain())
        .unwrap();
    manager
        .write_resource(file, 3, b"newer", ResourceType::String, plain())
        .unwrap();
    assert!(manager.needs_pack(file));
    assert_eq!(manager.table().get(3).unwrap().overwrites, 0);

    let ids: Vec<ResourceId> = manager
        .directory(file)
        .unwrap()
        .entries()
        .iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec![0, 3]);
    manager.close(file).unwrap();

    let file = manager.open(&path, OpenMode::Edit, false).unwrap();
    assert!(manager.needs_pack(file));
    assert_eq!(manager.resource(3).unwrap(), b"newer");
    assert_eq!(manager.table().get(3).unwrap().offset, 132);
}

#[test]
fn test_rewrite_in_full_directory_keeps_resource() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("full.res");

    let mut manager = manager();
    let file = manager.open(&path, OpenMode::Create, false).unwrap();
    for id in 1..=u16::MAX {
        let data: &[u8] = if id == 5 { b"x" } else { b"" };
        manager
            .write_resource(file, id, data, ResourceType::String, plain())
            .unwrap();
    }

    let err = manager
        .write_resource(file, 5, b"replacement", ResourceType::String, plain())
        .unwrap_err();
    assert!(
        matches!(err, ResError::Format(FormatError::DirectoryFull(65535))),
        "{err}"
    );
    assert!(!manager.needs_pack(file));
    assert!(manager.directory(file).unwrap().position(5).is_some());
    assert_eq!(manager.resource(5).unwrap(), b"x");
    manager.close(file).unwrap();

    let file = manager.open(&path, OpenMode::Read, false).unwrap();
    assert_eq!(manager.resource(5).unwrap(), b"x");
    assert!(manager.table().in_use(u16::MAX));
    manager.close(file).unwrap();
}

#[test]
fn test_remove_resource() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_file(&dir, "rm.res", &[(1, b"keep", 0), (2, b"drop", 0)]);

    let mut manager = manager();
    let file = manager.open(&path, OpenMode::Edit, false).unwrap();
    manager.remove_resource(file, 2).unwrap();
    assert!(manager.needs_pack(file));
    assert!(!manager.table().in_use(2));
    assert!(matches!(
        manager.remove_resource(file, 2),
        Err(ResError::UnknownResource(2))
    ));
    manager.close(file).unwrap();

    let file = manager.open(&path, OpenMode::Read, false).unwrap();
    assert_eq!(manager.resource(1).unwrap(), b"keep");
    assert!(!manager.table().in_use(2));
    manager.close(file).unwrap();
}

#[test]
fn test_write_rejections() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_file(&dir, "ro.res", &[(1, b"x", 0)]);

    let mut manager = manager();
    let file = manager.open(&path, OpenMode::Read, true).unwrap();
    assert!(matches!(
        manager.write_resource(file, 2, b"y", ResourceType::String, plain()),
        Err(ResError::NotWritable(_))
    ));
    assert!(matches!(
        manager.set_comment(file, "nope"),
        Err(ResError::NotWritable(_))
    ));
    manager.close(file).unwrap();

    let file = manager.open(&path, OpenMode::Edit, false).unwrap();
    assert!(matches!(
        manager.write_resource(file, 0, b"y", ResourceType::String, plain()),
        Err(ResError::InvalidId)
    ));
    let huge = vec![0u8; 0x0100_0000];
    assert!(matches!(
        manager.write_resource(file, 2, &huge, ResourceType::String, plain()),
        Err(ResError::ResourceTooLarge { id: 2, .. })
    ));

    let closed = FileNum::new(9).unwrap();
    assert!(matches!(
        manager.write_resource(closed, 2, b"y", ResourceType::String, plain()),
        Err(ResError::NotOpen(_))
    ));
}

#[test]
fn test_aux_info_read_keeps_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_file(&dir, "aux.res", &[(1, b"abc", 0), (2, b"defg", 0)]);
    let before = std::fs::read(&path).unwrap();

    let mut manager = manager();
    let file = manager.open(&path, OpenMode::Read, true).unwrap();
    let directory = manager.directory(file).unwrap();
    assert_eq!(directory.len(), 2);
    assert_eq!(directory.layout().unwrap(), (vec![128, 132], 136));
    manager.close(file).unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), before);

    let file = manager.open(&path, OpenMode::Read, false).unwrap();
    assert!(manager.directory(file).is_none());
}

#[test]
fn test_comment_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("comment.res");

    let mut manager = manager();
    let file = manager.open(&path, OpenMode::Create, false).unwrap();
    assert_eq!(manager.comment(file).unwrap(), "");
    manager.set_comment(file, "level one strings").unwrap();
    manager.close(file).unwrap();

    let file = manager.open(&path, OpenMode::Read, false).unwrap();
    assert_eq!(manager.comment(file).unwrap(), "level one strings");
}

#[test]
fn test_drop_writes_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dropped.res");
    {
        let mut manager = manager();
        let file = manager.open(&path, OpenMode::Create, false).unwrap();
        manager
            .write_resource(file, 4, b"kept", ResourceType::Shape, plain())
            .unwrap();
    }

    let mut manager = manager();
    manager.open(&path, OpenMode::Read, false).unwrap();
    assert_eq!(manager.resource(4).unwrap(), b"kept");
}

#[cfg(target_os = "linux")]
#[test]
fn test_caseless_open() {
    let dir = tempfile::tempdir().unwrap();
    create_file(&dir, "GameScr.RES", &[(1, b"x", 0)]);
    let query = dir.path().join("gamescr.res");

    let mut manager = manager();
    let file = manager.open(&query, OpenMode::Read, false).unwrap();
    assert_eq!(
        manager.files().get(file).unwrap().path(),
        dir.path().join("GameScr.RES")
    );
    manager.close(file).unwrap();

    let mut strict =
        ResourceManager::new(ResConfig::default().with_caseless_fallback(false)).unwrap();
    assert!(matches!(
        strict.open(&query, OpenMode::Read, false),
        Err(ResError::CannotOpen { .. })
    ));
}

/// Descriptor table that records the order of deletions
#[derive(Debug, Default)]
struct RecordingTable {
    inner: DescriptorTable,
    deleted: Vec<ResourceId>,
    fail_loads: bool,
}

impl ResourceTable for RecordingTable {
    fn extend(&mut self, id: ResourceId) {
        self.inner.extend(id);
    }

    fn project(&mut self, id: ResourceId, projection: Projection) -> ProjectOutcome {
        self.inner.project(id, projection)
    }

    fn load(&mut self, id: ResourceId, files: &mut SlotRegistry) -> resfile_storage::Result<()> {
        if self.fail_loads {
            return Err(ResError::Io(std::io::Error::other("read failed")));
        }
        self.inner.load(id, files)
    }

    fn append_to_tail(&mut self, id: ResourceId) {
        self.inner.append_to_tail(id);
    }

    fn delete(&mut self, id: ResourceId) {
        self.deleted.push(id);
        self.inner.delete(id);
    }

    fn in_use(&self, id: ResourceId) -> bool {
        self.inner.in_use(id)
    }

    fn filenum_of(&self, id: ResourceId) -> Option<FileNum> {
        self.inner.filenum_of(id)
    }

    fn max_id(&self) -> ResourceId {
        self.inner.max_id()
    }
}

fn open_with_recorder(path: &Path) -> (ResourceManager<RecordingTable>, FileNum) {
    let mut manager =
        ResourceManager::with_table(ResConfig::default(), RecordingTable::default()).unwrap();
    let file = manager.open(path, OpenMode::Read, false).unwrap();
    (manager, file)
}

#[test]
fn test_close_deletes_owned_ids_ascending() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_file(
        &dir,
        "order.res",
        &[(900, b"c", 0), (5, b"a", 0), (300, b"b", 0)],
    );

    let (mut manager, file) = open_with_recorder(&path);
    manager.close(file).unwrap();
    assert_eq!(manager.table().deleted, vec![5, 300, 900]);
    assert!(!manager.is_open(file));

    // Closing again is a no-op
    manager.close(file).unwrap();
    assert_eq!(manager.table().deleted.len(), 3);
}

#[test]
fn test_failed_eager_load_keeps_file_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_file(
        &dir,
        "eager.res",
        &[(1, b"early", ResourceFlags::LOAD_ON_OPEN), (2, b"late", 0)],
    );

    for mode in [OpenMode::Read, OpenMode::Edit] {
        let table = RecordingTable {
            fail_loads: true,
            ..RecordingTable::default()
        };
        let mut manager = ResourceManager::with_table(ResConfig::default(), table).unwrap();
        let file = manager.open(&path, mode, false).unwrap();

        assert!(manager.table().in_use(1));
        assert!(manager.table().in_use(2));
        assert!(!manager.table().inner.get(1).unwrap().is_loaded());
        assert!(manager.table().inner.lru().is_empty());
        manager.close(file).unwrap();
    }
}
