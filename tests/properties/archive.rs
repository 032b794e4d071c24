//! Property tests for archive determinism.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use proptest::prelude::*;
use tempfile::tempdir;

use archive_relay::ArchiveBuilder;

fn tree() -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    let name = proptest::string::string_regex("(pkg/|pkg/sub/|cmd/)?[a-z]{1,8}\\.(go|txt)").unwrap();
    proptest::collection::btree_map(name, proptest::collection::vec(any::<u8>(), 0..64), 0..8)
}

fn write_tree<'a>(root: &Path, files: impl Iterator<Item = (&'a String, &'a Vec<u8>)>) {
    for (name, content) in files {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 32,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: The same contents archive to the same bytes whatever order
    /// the files were created in.
    #[test]
    fn property_archive_is_deterministic(files in tree()) {
        let forward = tempdir().unwrap();
        let backward = tempdir().unwrap();
        write_tree(forward.path(), files.iter());
        write_tree(backward.path(), files.iter().rev());

        let a = ArchiveBuilder::default().build(forward.path()).unwrap();
        let b = ArchiveBuilder::default().build(backward.path()).unwrap();

        prop_assert_eq!(a.file_count(), files.len());
        prop_assert_eq!(a.hash(), b.hash());
        prop_assert_eq!(a.bytes(), b.bytes());
    }
}
