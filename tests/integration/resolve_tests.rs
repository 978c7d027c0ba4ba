//! Tests for the resolve phase: picking releases, comparing the candidate
//! compound against the recorded state, and drift-driven payload bumps.
//!
//! Resolution performs metadata-only API calls, so every test also pins down
//! that no archive bytes move during this phase.

use anyhow::Result;
use semver::Version;

use relpack::core::RelpackError;
use relpack::pipeline::Pipeline;
use relpack::version::Recorded;

use crate::common::{BundleProject, FakeHost, FakeVcs, prerelease, release, ts};

fn basic_manifest(version: &str) -> String {
    format!(
        r#"
[bundle]
name = "TestPack"
repo = "owner/pack"
version = "{version}"

[loader]
repo = "Loader/Loader"
platforms = ["x64"]
"#
    )
}

fn manifest_with_source(version: &str) -> String {
    format!(
        r#"
[bundle]
name = "TestPack"
repo = "owner/pack"
version = "{version}"

[loader]
repo = "Loader/Loader"
platforms = ["x64"]

[[sources]]
repo = "owner/extras"
"#
    )
}

fn pipeline(project: &BundleProject, host: &FakeHost) -> Pipeline<FakeHost, FakeVcs> {
    Pipeline::new(
        host.clone(),
        FakeVcs::new(),
        project.manifest(),
        project.context(false, None),
    )
}

#[tokio::test]
async fn skips_when_recorded_matches_latest() -> Result<()> {
    let project = BundleProject::new(&basic_manifest("1.0.0"));
    project.write_metadata(r#"{"dependency":"1.2.0","payload":"1.0.0"}"#);

    let host = FakeHost::new();
    host.put_releases("Loader/Loader", vec![release(1, "Loader/Loader", "v1.2.0", vec![])]);

    let resolution = pipeline(&project, &host).resolve().await?;

    assert!(resolution.skip);
    assert_eq!(resolution.candidate.to_string(), "1.2.0-payload.1.0.0");
    assert_eq!(
        resolution.recorded,
        Recorded::Version(Version::parse("1.2.0-payload.1.0.0")?)
    );
    assert_eq!(host.downloads(), 0);
    assert_eq!(host.url_fetches(), 0);
    Ok(())
}

#[tokio::test]
async fn first_run_never_skips() -> Result<()> {
    let project = BundleProject::new(&basic_manifest("1.0.0"));

    let host = FakeHost::new();
    host.put_releases("Loader/Loader", vec![release(1, "Loader/Loader", "v1.2.0", vec![])]);

    let resolution = pipeline(&project, &host).resolve().await?;

    assert!(!resolution.skip);
    assert_eq!(resolution.recorded, Recorded::Initial);
    assert!(resolution.drifted.is_empty());
    Ok(())
}

#[tokio::test]
async fn newer_upstream_release_beats_the_record() -> Result<()> {
    let project = BundleProject::new(&basic_manifest("1.0.0"));
    project.write_metadata(r#"{"dependency":"1.2.0","payload":"1.0.0"}"#);

    let host = FakeHost::new();
    host.put_releases("Loader/Loader", vec![release(1, "Loader/Loader", "v1.3.0", vec![])]);

    let resolution = pipeline(&project, &host).resolve().await?;

    assert!(!resolution.skip);
    assert_eq!(resolution.upstream, Version::new(1, 3, 0));
    assert_eq!(resolution.candidate.to_string(), "1.3.0-payload.1.0.0");
    Ok(())
}

#[tokio::test]
async fn manual_payload_bump_beats_the_record() -> Result<()> {
    let project = BundleProject::new(&basic_manifest("1.0.1"));
    project.write_metadata(r#"{"dependency":"1.2.0","payload":"1.0.0"}"#);

    let host = FakeHost::new();
    host.put_releases("Loader/Loader", vec![release(1, "Loader/Loader", "v1.2.0", vec![])]);

    let resolution = pipeline(&project, &host).resolve().await?;

    assert!(!resolution.skip);
    assert!(!resolution.bumped);
    assert_eq!(resolution.candidate.to_string(), "1.2.0-payload.1.0.1");
    Ok(())
}

#[tokio::test]
async fn prerelease_tags_skip_when_the_manifest_excludes_them() -> Result<()> {
    let manifest = r#"
[bundle]
name = "TestPack"
repo = "owner/pack"
version = "1.0.0"

[loader]
repo = "Loader/Loader"
platforms = ["x64"]
prereleases = "exclude"
"#;
    let project = BundleProject::new(manifest);

    let host = FakeHost::new();
    host.put_releases(
        "Loader/Loader",
        vec![release(1, "Loader/Loader", "v2.0.0-rc.1", vec![])],
    );

    let resolution = pipeline(&project, &host).resolve().await?;
    assert!(resolution.skip);
    Ok(())
}

#[tokio::test]
async fn prerelease_tags_bundle_under_the_default_mode() -> Result<()> {
    let project = BundleProject::new(&basic_manifest("1.0.0"));

    let host = FakeHost::new();
    host.put_releases(
        "Loader/Loader",
        vec![release(1, "Loader/Loader", "v2.0.0-rc.1", vec![])],
    );

    let resolution = pipeline(&project, &host).resolve().await?;
    assert!(!resolution.skip);
    assert_eq!(resolution.upstream.to_string(), "2.0.0-rc.1");
    Ok(())
}

#[tokio::test]
async fn source_without_stable_release_uses_newest_prerelease() -> Result<()> {
    let project = BundleProject::new(&manifest_with_source("1.0.0"));

    let host = FakeHost::new();
    host.put_releases("Loader/Loader", vec![release(1, "Loader/Loader", "v1.2.0", vec![])]);
    host.put_releases(
        "owner/extras",
        vec![
            prerelease(10, "owner/extras", "v0.9.0", ts(8), vec![]),
            prerelease(11, "owner/extras", "v1.0.0-rc.2", ts(10), vec![]),
        ],
    );

    let resolution = pipeline(&project, &host).resolve().await?;

    assert_eq!(resolution.source_releases.len(), 1);
    assert_eq!(resolution.source_releases[0].tag_name, "v1.0.0-rc.2");
    // Loader latest, source latest (404), source listing.
    assert_eq!(host.api_calls(), 3);
    Ok(())
}

#[tokio::test]
async fn source_drift_bumps_the_payload_patch() -> Result<()> {
    let project = BundleProject::new(&manifest_with_source("1.0.0"));
    project.write_metadata(
        r#"{"dependency":"1.2.0","payload":"1.0.0","sources":[
            "https://github.com/Loader/Loader/releases/tag/v1.2.0",
            "https://github.com/owner/extras/releases/tag/v2.0.0"]}"#,
    );

    let host = FakeHost::new();
    host.put_releases("Loader/Loader", vec![release(1, "Loader/Loader", "v1.2.0", vec![])]);
    host.put_releases("owner/extras", vec![release(10, "owner/extras", "v2.1.0", vec![])]);

    let resolution = pipeline(&project, &host).resolve().await?;

    assert_eq!(resolution.drifted.len(), 1);
    assert_eq!(resolution.drifted[0].repo.slug(), "owner/extras");
    assert!(resolution.bumped);
    assert_eq!(resolution.payload, Version::new(1, 0, 1));
    assert_eq!(resolution.candidate.to_string(), "1.2.0-payload.1.0.1");
    assert!(!resolution.skip);
    Ok(())
}

#[tokio::test]
async fn hand_edited_payload_version_suppresses_the_auto_bump() -> Result<()> {
    let project = BundleProject::new(&manifest_with_source("1.5.0"));
    project.write_metadata(
        r#"{"dependency":"1.2.0","payload":"1.0.0","sources":[
            "https://github.com/Loader/Loader/releases/tag/v1.2.0",
            "https://github.com/owner/extras/releases/tag/v2.0.0"]}"#,
    );

    let host = FakeHost::new();
    host.put_releases("Loader/Loader", vec![release(1, "Loader/Loader", "v1.2.0", vec![])]);
    host.put_releases("owner/extras", vec![release(10, "owner/extras", "v2.1.0", vec![])]);

    let resolution = pipeline(&project, &host).resolve().await?;

    assert_eq!(resolution.drifted.len(), 1);
    assert!(!resolution.bumped);
    assert_eq!(resolution.payload, Version::new(1, 5, 0));
    assert_eq!(resolution.candidate.to_string(), "1.2.0-payload.1.5.0");
    Ok(())
}

#[tokio::test]
async fn loader_drift_alone_does_not_bump_the_payload() -> Result<()> {
    let project = BundleProject::new(&basic_manifest("1.0.0"));
    project.write_metadata(
        r#"{"dependency":"1.2.0","payload":"1.0.0","sources":[
            "https://github.com/Loader/Loader/releases/tag/v1.2.0"]}"#,
    );

    let host = FakeHost::new();
    host.put_releases("Loader/Loader", vec![release(1, "Loader/Loader", "v1.3.0", vec![])]);

    let resolution = pipeline(&project, &host).resolve().await?;

    assert_eq!(resolution.drifted.len(), 1);
    assert_eq!(resolution.drifted[0].repo.slug(), "Loader/Loader");
    assert!(!resolution.bumped);
    assert_eq!(resolution.payload, Version::new(1, 0, 0));
    Ok(())
}

#[tokio::test]
async fn next_metadata_records_the_fresh_state() -> Result<()> {
    let project = BundleProject::new(&manifest_with_source("1.0.0"));

    let host = FakeHost::new();
    host.put_releases("Loader/Loader", vec![release(1, "Loader/Loader", "v1.3.0", vec![])]);
    host.put_releases("owner/extras", vec![release(10, "owner/extras", "v2.0.0", vec![])]);

    let resolution = pipeline(&project, &host).resolve().await?;

    assert_eq!(resolution.next_metadata.dependency, "1.3.0");
    assert_eq!(resolution.next_metadata.payload.as_deref(), Some("1.0.0"));
    assert_eq!(
        resolution.next_metadata.sources,
        Some(vec![
            "https://github.com/Loader/Loader/releases/tag/v1.3.0".to_string(),
            "https://github.com/owner/extras/releases/tag/v2.0.0".to_string(),
        ])
    );
    Ok(())
}

#[tokio::test]
async fn missing_loader_release_is_fatal() -> Result<()> {
    let project = BundleProject::new(&basic_manifest("1.0.0"));
    let host = FakeHost::new();

    let err = pipeline(&project, &host).resolve().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RelpackError>(),
        Some(RelpackError::ReleaseNotFound { repo }) if repo == "Loader/Loader"
    ));
    Ok(())
}
