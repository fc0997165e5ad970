//! End-to-end pipeline scenarios from spec.md §8, run directly against
//! [`run_guess`] without scheduler wiring (the guesser's input is already
//! the resolver's flat `retrievers` picture, so these construct that
//! picture by hand instead of running the full pipeline).

use std::collections::BTreeMap;
use std::io::Write;

use summon_archive::ArchiveRegistry;
use summon_archive_index::{Archive, ArchiveDigest, ArchiveIndex, FileInArchive};
use summon_guesser::{run_guess, GuessInputs};
use summon_paths::{AbsoluteSystemPathBuf, AnchoredSystemPathBuf, IntraArchivePath};

fn anchored(path: &str) -> AnchoredSystemPathBuf {
    AnchoredSystemPathBuf::from_str(path).unwrap()
}

/// S1 Empty VFS: a mod with zero files produces an entry whose every field
/// is empty, and never touches the archive index.
#[test]
fn s1_empty_vfs_produces_an_all_empty_mod() {
    let scratch = tempfile::tempdir().unwrap();
    let archive_index = ArchiveIndex::new();
    let archive_registry = ArchiveRegistry::new();

    let mut retrievers = BTreeMap::new();
    retrievers.insert("EmptyMod".to_string(), BTreeMap::new());

    let inputs = GuessInputs {
        retrievers,
        target_digests: BTreeMap::new(),
        mod_roots: BTreeMap::new(),
        archive_index: &archive_index,
        archive_registry: &archive_registry,
        archive_paths_on_disk: BTreeMap::new(),
        scratch_root: AbsoluteSystemPathBuf::new(scratch.path().to_path_buf()).unwrap(),
        ignore_patterns: Vec::new(),
        installer_plugins: Default::default(),
        mod_tool_plugins: Default::default(),
        global_tool_plugins: Default::default(),
        patch_plugins: Default::default(),
    };

    let mods = run_guess(inputs);

    let m = &mods.mods["EmptyMod"];
    assert!(m.zero_files.is_empty());
    assert!(m.github_files.is_empty());
    assert!(m.archive_files.is_empty());
    assert!(m.unknown_files.is_empty());
    assert!(m.install_from.is_empty());
    assert!(m.remaining_after_install_from.is_empty());
}

/// S6 Modified-since-install JSON patch: the archive's `x.json` differs
/// from the VFS's `x.json` only in key `b`. Expect it classified
/// `modified_since_install`, then patched away by the `SORTEDJSON` plugin
/// with a payload overwriting just that key, and dropped from `skip`.
#[test]
fn s6_json_patch_overwrites_the_changed_key() {
    let downloads = tempfile::tempdir().unwrap();
    let mod_root = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();

    let archive_json = br#"{"a":1,"b":2}"#;
    let vfs_json = br#"{"a":1,"b":3}"#;

    let archive_path = downloads.path().join("A.zip");
    {
        let file = std::fs::File::create(&archive_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer.start_file("data/x.json", zip::write::FileOptions::default()).unwrap();
        writer.write_all(archive_json).unwrap();
        writer.finish().unwrap();
    }
    let archive_digest_hex = summon_hash::hash_file(&archive_path, &[]).unwrap().0.primary;
    let archive_digest = ArchiveDigest::from_hex(&archive_digest_hex).unwrap();

    let archive_file_digest =
        summon_hash::hash_reader(archive_json.as_slice(), "archive x.json", &[]).unwrap().0.primary;
    let archive_file_truncated =
        ArchiveDigest::from_hex(&archive_file_digest).unwrap().truncate();

    let mut archive = Archive::new(archive_digest, std::fs::metadata(&archive_path).unwrap().len(), "A".to_string());
    archive.files.push(FileInArchive {
        intra_path: IntraArchivePath::new("data\\x.json").unwrap(),
        file_hash: archive_file_truncated,
        file_size: archive_json.len() as u64,
    });
    let mut archive_index = ArchiveIndex::new();
    archive_index.insert(archive);

    std::fs::create_dir_all(mod_root.path().join("data")).unwrap();
    std::fs::write(mod_root.path().join("data").join("x.json"), vfs_json).unwrap();
    let vfs_digest_hex = summon_hash::hash_reader(vfs_json.as_slice(), "vfs x.json", &[]).unwrap().0.primary;
    let vfs_truncated = ArchiveDigest::from_hex(&vfs_digest_hex).unwrap().truncate();

    let mut target = BTreeMap::new();
    target.insert(anchored("data/x.json"), vfs_truncated);
    let mut target_digests = BTreeMap::new();
    target_digests.insert("Mod".to_string(), target);

    let mut mod_roots = BTreeMap::new();
    mod_roots.insert("Mod".to_string(), AbsoluteSystemPathBuf::new(mod_root.path().to_path_buf()).unwrap());

    let mut archive_paths_on_disk = BTreeMap::new();
    archive_paths_on_disk.insert(archive_digest, AbsoluteSystemPathBuf::new(archive_path).unwrap());

    let retrieval = summon_resolver::ArchiveRetrieval {
        target_hash: archive_digest,
        target_size: archive_json.len() as u64,
        hops: vec![summon_resolver::ArchiveHop {
            archive_hash: archive_digest,
            archive_size: std::fs::metadata(downloads.path().join("A.zip")).map(|m| m.len()).unwrap_or(0),
            file_in_archive: FileInArchive {
                intra_path: IntraArchivePath::new("data\\x.json").unwrap(),
                file_hash: archive_file_truncated,
                file_size: archive_json.len() as u64,
            },
        }],
    };
    let mut files = BTreeMap::new();
    files.insert(anchored("data/x.json"), vec![summon_resolver::FileRetriever::Archive(retrieval)]);
    let mut retrievers = BTreeMap::new();
    retrievers.insert("Mod".to_string(), files);

    let archive_registry = ArchiveRegistry::new();
    let inputs = GuessInputs {
        retrievers,
        target_digests,
        mod_roots,
        archive_index: &archive_index,
        archive_registry: &archive_registry,
        archive_paths_on_disk,
        scratch_root: AbsoluteSystemPathBuf::new(scratch.path().to_path_buf()).unwrap(),
        ignore_patterns: Vec::new(),
        installer_plugins: Default::default(),
        mod_tool_plugins: Default::default(),
        global_tool_plugins: Default::default(),
        patch_plugins: Default::default(),
    };

    let mods = run_guess(inputs);
    let m = &mods.mods["Mod"];
    assert_eq!(m.install_from.len(), 1);
    let details = &m.install_from[0].details;
    assert!(details.modified_since_install.is_empty(), "patch should have cleared it");
    assert!(!details.skip.contains(&anchored("data/x.json")));
    let (kind, payload) = &m.patched[&anchored("data/x.json")];
    assert_eq!(kind, "SORTEDJSON");
    assert_eq!(payload, &serde_json::json!({"b": 3}));
}
