//! Tests for bundle assembly: layering loader archives, source archives,
//! datasets, and the payload tree in the order the pipeline applies them.

use crate::common::{BundleProject, zip_bytes, zip_entry, zip_names};
use relpack::archive::{ConflictPolicy, MergedArchive};

const MANIFEST: &str = r#"
[bundle]
name = "Pack"
repo = "me/pack"
version = "1.0.0"

[loader]
repo = "owner/loader"
platforms = ["win_x64"]
"#;

#[test]
fn full_layering_gives_payload_the_last_word() {
    let project = BundleProject::new(MANIFEST);
    project.write_payload("core/loader.cfg", b"payload");
    project.write_payload("plugins/local.dll", b"local");

    let loader = zip_bytes(&[
        ("core/loader.dll", b"loader"),
        ("core/loader.cfg", b"loader-default"),
    ]);
    let source = zip_bytes(&[("plugins/extra.dll", b"extra"), ("core/loader.cfg", b"source")]);
    let dataset = zip_bytes(&[("managed/mscorlib.dll", b"corlib"), ("docs/readme.md", b"doc")]);

    let mut merged = MergedArchive::new();
    merged.merge_zip(&loader, ConflictPolicy::Overwrite).unwrap();
    merged.merge_zip(&source, ConflictPolicy::Overwrite).unwrap();
    merged
        .merge_zip_filtered(&dataset, "corlibs", &["managed".to_string()])
        .unwrap();
    merged
        .embed_tree(&project.root().join("payload"))
        .unwrap();

    // Source overwrote the loader default, then the payload overwrote both.
    assert_eq!(merged.get("core/loader.cfg"), Some(b"payload".as_slice()));
    assert_eq!(merged.get("core/loader.dll"), Some(b"loader".as_slice()));
    assert_eq!(merged.get("plugins/extra.dll"), Some(b"extra".as_slice()));
    assert_eq!(merged.get("plugins/local.dll"), Some(b"local".as_slice()));
    assert_eq!(
        merged.get("corlibs/managed/mscorlib.dll"),
        Some(b"corlib".as_slice())
    );
    assert!(merged.get("corlibs/docs/readme.md").is_none());
}

#[test]
fn payload_overrides_survive_skip_policy() {
    let project = BundleProject::new(MANIFEST);
    project.write_payload("core/loader.cfg", b"payload");

    let first = zip_bytes(&[("core/loader.cfg", b"first")]);
    let second = zip_bytes(&[("core/loader.cfg", b"second")]);

    let mut merged = MergedArchive::new();
    merged.merge_zip(&first, ConflictPolicy::Skip).unwrap();
    merged.merge_zip(&second, ConflictPolicy::Skip).unwrap();
    merged
        .embed_tree(&project.root().join("payload"))
        .unwrap();

    // Skip keeps the first archive's entry, but the payload still replaces it.
    assert_eq!(merged.get("core/loader.cfg"), Some(b"payload".as_slice()));
}

#[test]
fn serialized_bundle_is_identical_across_runs() {
    let build = || {
        let project = BundleProject::new(MANIFEST);
        project.write_payload("b/second.txt", b"2");
        project.write_payload("a/first.txt", b"1");

        let mut merged = MergedArchive::new();
        merged
            .merge_zip(
                &zip_bytes(&[("z.txt", b"z"), ("core/loader.dll", b"dll")]),
                ConflictPolicy::Overwrite,
            )
            .unwrap();
        merged
            .embed_tree(&project.root().join("payload"))
            .unwrap();
        merged.into_zip_bytes().unwrap()
    };

    let first = build();
    let second = build();
    assert_eq!(first, second);

    assert_eq!(
        zip_names(&first),
        vec!["a/first.txt", "b/second.txt", "core/loader.dll", "z.txt"]
    );
    assert_eq!(zip_entry(&first, "a/first.txt"), Some(b"1".to_vec()));
}

#[test]
fn dataset_prefix_keeps_entries_apart_from_loader_files() {
    let loader = zip_bytes(&[("readme.md", b"loader readme")]);
    let dataset = zip_bytes(&[("readme.md", b"dataset readme")]);

    let mut merged = MergedArchive::new();
    merged.merge_zip(&loader, ConflictPolicy::Overwrite).unwrap();
    merged.merge_zip_filtered(&dataset, "data", &[]).unwrap();

    assert_eq!(merged.get("readme.md"), Some(b"loader readme".as_slice()));
    assert_eq!(merged.get("data/readme.md"), Some(b"dataset readme".as_slice()));
}
