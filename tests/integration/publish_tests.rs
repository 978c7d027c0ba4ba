//! Tests for CI-mode runs: committing the metadata record, bumping the
//! manifest on drift, and publishing the tagged release with its assets.

use anyhow::Result;

use relpack::core::RelpackError;
use relpack::metadata::Metadata;
use relpack::pipeline::{Pipeline, RunOutcome};

use crate::common::{
    BundleProject, FakeHost, FakeVcs, asset, asset_with_type, release, zip_bytes,
};

const ONE_PLATFORM: &str = r#"
[bundle]
name = "TestPack"
repo = "owner/pack"
version = "1.0.0"

[loader]
repo = "Loader/Loader"
platforms = ["x64"]
"#;

fn pipeline(
    project: &BundleProject,
    host: &FakeHost,
    vcs: &FakeVcs,
    ci: bool,
    token: Option<&str>,
) -> Pipeline<FakeHost, FakeVcs> {
    Pipeline::new(
        host.clone(),
        vcs.clone(),
        project.manifest(),
        project.context(ci, token),
    )
}

#[tokio::test]
async fn ci_run_commits_metadata_and_publishes() -> Result<()> {
    let project = BundleProject::new(ONE_PLATFORM);
    project.write_metadata(r#"{"dependency":"1.2.0","payload":"1.0.0"}"#);

    let host = FakeHost::new();
    host.put_releases(
        "Loader/Loader",
        vec![release(1, "Loader/Loader", "v1.3.0", vec![asset(101, "Loader-x64.zip")])],
    );
    host.put_asset(101, zip_bytes(&[("core/loader.dll", b"dll")]));

    let vcs = FakeVcs::with_changes(&[".metadata.json"]);
    let outcome = pipeline(&project, &host, &vcs, true, Some("ghp_token"))
        .run()
        .await?;
    assert_eq!(outcome, RunOutcome::DoneRemote);

    // The committed record reflects the freshly published state.
    let metadata = Metadata::load(&project.root().join(".metadata.json"));
    assert_eq!(metadata.dependency, "1.3.0");
    assert_eq!(metadata.payload.as_deref(), Some("1.0.0"));
    assert_eq!(
        metadata.sources,
        Some(vec![
            "https://github.com/Loader/Loader/releases/tag/v1.3.0".to_string()
        ])
    );

    // Repository-local git configuration, then stage, commit, push.
    let configured = vcs.configured();
    let workspace = project.root().display().to_string();
    assert!(configured.contains(&("safe.directory".to_string(), workspace)));
    assert!(configured.contains(&("user.name".to_string(), "octocat".to_string())));
    assert!(configured.contains(&(
        "user.email".to_string(),
        "octocat@users.noreply.github.com".to_string()
    )));
    assert!(configured.contains(&("core.ignorecase".to_string(), "false".to_string())));
    assert_eq!(vcs.added(), vec![".metadata.json"]);
    assert_eq!(vcs.commits(), vec!["Update metadata"]);
    assert_eq!(vcs.pushes(), 1);

    // One release on the bundle repository, tagged with the compound and
    // pointed at the metadata commit.
    let created = host.created_releases();
    assert_eq!(created.len(), 1);
    let (repo, new_release) = &created[0];
    assert_eq!(repo, "owner/pack");
    assert_eq!(new_release.tag_name, "v1.3.0-payload.1.0.0");
    assert_eq!(new_release.name, "v1.3.0-payload.1.0.0");
    assert_eq!(new_release.target_commitish, FakeVcs::COMMIT);
    assert_eq!(new_release.body, "# Payload auto-update\n\n");

    // The dist archive is attached byte-for-byte.
    let uploads = host.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].name, "TestPack.zip");
    assert_eq!(uploads[0].content_type, "application/x-zip-compressed");
    assert_eq!(uploads[0].bytes, std::fs::read(project.dist_file("TestPack"))?);
    Ok(())
}

#[tokio::test]
async fn drift_bump_rewrites_the_manifest_in_ci() -> Result<()> {
    let manifest = r#"
[bundle]
name = "TestPack"
repo = "owner/pack"
version = "1.0.0"

[loader]
repo = "Loader/Loader"
platforms = ["x64"]

[[sources]]
repo = "owner/extras"
"#;
    let project = BundleProject::new(manifest);
    project.write_metadata(
        r#"{"dependency":"1.2.0","payload":"1.0.0","sources":[
            "https://github.com/Loader/Loader/releases/tag/v1.2.0",
            "https://github.com/owner/extras/releases/tag/v2.0.0"]}"#,
    );

    let host = FakeHost::new();
    host.put_releases(
        "Loader/Loader",
        vec![release(1, "Loader/Loader", "v1.2.0", vec![asset(101, "Loader-x64.zip")])],
    );
    let mut extras = release(10, "owner/extras", "v2.1.0", vec![asset(201, "extras.zip")]);
    extras.body = Some("Fixed crash on load".to_string());
    host.put_releases("owner/extras", vec![extras]);
    host.put_asset(101, zip_bytes(&[("core/loader.dll", b"dll")]));
    host.put_asset(201, zip_bytes(&[("plugins/extra.dll", b"new")]));

    let vcs = FakeVcs::with_changes(&[".metadata.json", "relpack.toml"]);
    let outcome = pipeline(&project, &host, &vcs, true, Some("ghp_token"))
        .run()
        .await?;
    assert_eq!(outcome, RunOutcome::DoneRemote);

    // The auto-bump landed in the manifest and was staged with the metadata.
    assert!(project.read_manifest().contains(r#"version = "1.0.1""#));
    assert_eq!(vcs.added(), vec![".metadata.json", "relpack.toml"]);

    let metadata = Metadata::load(&project.root().join(".metadata.json"));
    assert_eq!(metadata.dependency, "1.2.0");
    assert_eq!(metadata.payload.as_deref(), Some("1.0.1"));

    let created = host.created_releases();
    assert_eq!(created.len(), 1);
    let new_release = &created[0].1;
    assert_eq!(new_release.tag_name, "v1.2.0-payload.1.0.1");
    assert!(new_release.body.contains("Update owner/extras to v2.1.0"));
    assert!(new_release.body.contains("> Fixed crash on load"));
    Ok(())
}

#[tokio::test]
async fn missing_token_fails_before_any_api_call() -> Result<()> {
    let project = BundleProject::new(ONE_PLATFORM);
    let host = FakeHost::new();
    let vcs = FakeVcs::new();

    let err = pipeline(&project, &host, &vcs, true, None)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<RelpackError>(),
        Some(RelpackError::MissingToken)
    ));
    assert_eq!(host.api_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn unchanged_metadata_aborts_before_git_mutation() -> Result<()> {
    let project = BundleProject::new(ONE_PLATFORM);
    project.write_metadata(r#"{"dependency":"1.2.0","payload":"1.0.0"}"#);

    let host = FakeHost::new();
    host.put_releases(
        "Loader/Loader",
        vec![release(1, "Loader/Loader", "v1.3.0", vec![asset(101, "Loader-x64.zip")])],
    );
    host.put_asset(101, zip_bytes(&[("core/loader.dll", b"dll")]));

    let vcs = FakeVcs::with_changes(&[]);
    let err = pipeline(&project, &host, &vcs, true, Some("ghp_token"))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<RelpackError>(),
        Some(RelpackError::MetadataUnchanged)
    ));
    assert!(vcs.configured().is_empty());
    assert!(vcs.added().is_empty());
    assert_eq!(vcs.pushes(), 0);
    assert!(host.created_releases().is_empty());
    assert!(host.uploads().is_empty());
    Ok(())
}

#[tokio::test]
async fn upload_content_type_follows_the_loader_asset() -> Result<()> {
    let project = BundleProject::new(ONE_PLATFORM);

    let host = FakeHost::new();
    host.put_releases(
        "Loader/Loader",
        vec![release(
            1,
            "Loader/Loader",
            "v1.3.0",
            vec![
                asset(101, "Loader-x64.zip"),
                asset_with_type(102, "TestPack.zip", "application/zip"),
            ],
        )],
    );
    host.put_asset(101, zip_bytes(&[("core/loader.dll", b"dll")]));

    let vcs = FakeVcs::with_changes(&[".metadata.json"]);
    pipeline(&project, &host, &vcs, true, Some("ghp_token"))
        .run()
        .await?;

    let uploads = host.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].content_type, "application/zip");
    Ok(())
}

#[tokio::test]
async fn local_run_performs_no_git_or_release_calls() -> Result<()> {
    let project = BundleProject::new(ONE_PLATFORM);

    let host = FakeHost::new();
    host.put_releases(
        "Loader/Loader",
        vec![release(1, "Loader/Loader", "v1.3.0", vec![asset(101, "Loader-x64.zip")])],
    );
    host.put_asset(101, zip_bytes(&[("core/loader.dll", b"dll")]));

    let vcs = FakeVcs::new();
    let outcome = pipeline(&project, &host, &vcs, false, None).run().await?;

    assert_eq!(outcome, RunOutcome::DoneLocal);
    assert!(vcs.configured().is_empty());
    assert!(vcs.commits().is_empty());
    assert_eq!(vcs.pushes(), 0);
    assert!(host.created_releases().is_empty());
    assert!(host.uploads().is_empty());
    Ok(())
}
