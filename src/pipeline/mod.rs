//! Bundle orchestration from version resolution through release publication.
//!
//! [`Pipeline`] drives one run end to end: resolve the latest loader and
//! source releases, decide whether anything is newer than the recorded state,
//! fetch every archive concurrently, merge them with the payload tree, write
//! the dist archive, and in CI commit the metadata record and publish a tagged
//! release.
//!
//! The release host and the version control client are generic parameters,
//! so the whole pipeline runs against in-memory fakes in tests. Everything
//! else the pipeline touches (manifest, run context) is passed in by the CLI
//! layer; no environment variables are read here.
//!
//! A run moves strictly forward through its phases. Nothing is written to
//! disk before every required download has succeeded, and nothing is pushed
//! or published before the dist archive is on disk, so a failed run leaves
//! the repository unchanged apart from a possible stale dist directory.

mod notes;

pub use notes::DriftedSource;

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use futures::future::join_all;
use semver::Version;
use tracing::{debug, error, warn};

use crate::archive::MergedArchive;
use crate::config::RunContext;
use crate::core::RelpackError;
use crate::git::Vcs;
use crate::github::{NewRelease, Release, ReleaseHost, RepoRef, select_asset, select_named};
use crate::manifest::{MANIFEST_FILE, Manifest};
use crate::metadata::{METADATA_FILE, Metadata};
use crate::utils::{atomic_write, ensure_dir, walk_files};
use crate::version::{self, PrereleaseMode, Recorded};

/// Content type used for uploads when the loader release has no like-named
/// asset to inherit one from.
const FALLBACK_CONTENT_TYPE: &str = "application/x-zip-compressed";

/// Terminal state of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing newer than the recorded state; no work was performed.
    Skipped,
    /// Bundle written to dist without publishing (non-CI mode).
    DoneLocal,
    /// Metadata committed and a tagged release published.
    DoneRemote,
}

/// Everything the resolve phase learns before any archive is downloaded.
///
/// The `check` subcommand stops here; `bundle` carries it through the fetch,
/// merge, and publish phases.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The loader release the bundle would be built from.
    pub loader_release: Release,
    /// One resolved release per manifest source, in manifest order.
    pub source_releases: Vec<Release>,
    /// Normalized loader version.
    pub upstream: Version,
    /// Effective payload version, after any automatic patch bump.
    pub payload: Version,
    /// Candidate compound version for this run.
    pub candidate: Version,
    /// Compound recorded by the previous successful run.
    pub recorded: Recorded,
    /// Recorded sources whose repositories have newer releases.
    pub drifted: Vec<DriftedSource>,
    /// Whether the payload version was patch-bumped automatically.
    pub bumped: bool,
    /// Whether the candidate fails to beat the recorded compound.
    pub skip: bool,
    /// Fresh metadata record to persist after a successful build.
    pub next_metadata: Metadata,
}

/// One bundling run wired to a release host and a version control client.
pub struct Pipeline<H, V> {
    host: H,
    vcs: V,
    manifest: Manifest,
    ctx: RunContext,
}

impl<H: ReleaseHost, V: Vcs> Pipeline<H, V> {
    /// Creates a pipeline over an already-loaded manifest and run context.
    pub fn new(host: H, vcs: V, manifest: Manifest, ctx: RunContext) -> Self {
        Self {
            host,
            vcs,
            manifest,
            ctx,
        }
    }

    /// Executes one full run and reports how it ended.
    ///
    /// # Errors
    ///
    /// Fails when the token is missing in CI mode, when release resolution or
    /// any required download fails, when the merged archive cannot be written,
    /// or when any git or release-publication step fails.
    pub async fn run(&self) -> Result<RunOutcome> {
        if self.ctx.ci {
            self.ctx.require_token()?;
        }

        let resolution = self.resolve().await?;
        if resolution.skip {
            println!("No updates since last check.");
            return Ok(RunOutcome::Skipped);
        }

        let merged = self.fetch_and_merge(&resolution).await?;
        let dist_file = self.write_dist(merged)?;
        debug!("Wrote {}", dist_file.display());

        if !self.ctx.ci {
            return Ok(RunOutcome::DoneLocal);
        }

        let commit = self.commit_metadata(&resolution).await?;
        self.publish(&resolution, &commit).await?;
        Ok(RunOutcome::DoneRemote)
    }

    /// Resolves releases and versions, and decides whether the run can skip.
    ///
    /// Performs metadata-only API calls. Neither assets nor datasets are
    /// downloaded, and nothing on disk changes.
    pub async fn resolve(&self) -> Result<Resolution> {
        let loader_repo = &self.manifest.loader.repo;

        println!("{}", "Getting latest releases...".cyan());
        let loader_release = self.host.latest_release(loader_repo).await?;

        let mut source_releases = Vec::with_capacity(self.manifest.sources.len());
        for source in &self.manifest.sources {
            source_releases.push(self.resolve_source(&source.repo).await?);
        }

        let upstream = version::normalize(&loader_release.tag_name)?;
        let metadata = Metadata::load(&self.ctx.metadata_path);
        let recorded = metadata.recorded_compound();

        let drifted = detect_drift(&metadata, &loader_release, &source_releases);
        for source in &drifted {
            println!(
                "Updated source: {} {}",
                source.repo.slug().bold(),
                source.tag_name
            );
        }

        let manifest_payload = self.manifest.payload_version()?;
        let non_loader_drift = drifted.iter().any(|d| !d.repo.matches(loader_repo));
        let bumped =
            non_loader_drift && metadata.recorded_payload().as_ref() == Some(&manifest_payload);
        let payload = if bumped {
            version::bump_patch(&manifest_payload)
        } else {
            manifest_payload
        };

        let candidate = version::compound(&upstream, &payload)?;
        let skip = if self.manifest.loader.prereleases == PrereleaseMode::Exclude
            && !upstream.pre.is_empty()
        {
            debug!("Prerelease {upstream} excluded by manifest");
            true
        } else {
            !version::is_newer(&candidate, &recorded, PrereleaseMode::Include)
        };

        println!(
            "Latest {} release: {}",
            loader_repo.slug(),
            upstream.to_string().bold()
        );
        println!("Recorded version: {recorded}");
        println!("New version: {}", candidate.to_string().bold());

        let next_metadata = Metadata {
            dependency: upstream.to_string(),
            payload: Some(payload.to_string()),
            sources: Some(
                std::iter::once(loader_release.html_url.clone())
                    .chain(source_releases.iter().map(|r| r.html_url.clone()))
                    .collect(),
            ),
        };

        Ok(Resolution {
            loader_release,
            source_releases,
            upstream,
            payload,
            candidate,
            recorded,
            drifted,
            bumped,
            skip,
            next_metadata,
        })
    }

    /// Resolves a source repository's release, falling back to the most
    /// recently created release when no stable release exists.
    async fn resolve_source(&self, repo: &RepoRef) -> Result<Release> {
        match self.host.latest_release(repo).await {
            Ok(release) => Ok(release),
            Err(err) => {
                let not_found = matches!(
                    err.downcast_ref::<RelpackError>(),
                    Some(RelpackError::ReleaseNotFound { .. })
                );
                if !not_found {
                    return Err(err);
                }

                debug!("No stable release in {}, checking prereleases", repo.slug());
                self.host
                    .list_releases(repo)
                    .await?
                    .into_iter()
                    .max_by_key(|release| release.created_at)
                    .ok_or_else(|| {
                        RelpackError::ReleaseNotFound {
                            repo: repo.slug(),
                        }
                        .into()
                    })
            }
        }
    }

    /// Downloads every archive concurrently and merges them with the payload.
    ///
    /// All downloads are issued together and awaited as one group. Once they
    /// settle, any required failure aborts the run; optional dataset failures
    /// are logged and the dataset omitted.
    async fn fetch_and_merge(&self, resolution: &Resolution) -> Result<MergedArchive> {
        let loader = &self.manifest.loader;
        let release = &resolution.loader_release;

        let required_datasets = self.manifest.datasets.iter().filter(|d| !d.optional).count();
        let total = loader.platforms.len() + self.manifest.sources.len() + required_datasets;
        let mut failed = 0usize;

        // Select assets up front so every missing one is reported, not just
        // the first.
        let mut loader_futures = Vec::new();
        for platform in &loader.platforms {
            match select_asset(&release.assets, platform, loader.prefer_variant.as_deref()) {
                Some(asset) => {
                    println!("Downloading archive {}...", asset.name);
                    loader_futures.push(async move {
                        self.host.download_asset(&loader.repo, asset).await
                    });
                }
                None => {
                    error!(
                        "{}",
                        RelpackError::AssetNotFound {
                            repo: loader.repo.slug(),
                            platform: platform.clone(),
                        }
                    );
                    failed += 1;
                }
            }
        }

        let mut source_futures = Vec::new();
        for (spec, release) in self.manifest.sources.iter().zip(&resolution.source_releases) {
            match select_named(&release.assets, spec.asset.as_deref(), &spec.repo) {
                Some(asset) => {
                    println!("Downloading archive {}...", asset.name);
                    source_futures.push(async move {
                        self.host.download_asset(&spec.repo, asset).await
                    });
                }
                None => {
                    error!(
                        "{}",
                        RelpackError::AssetNotFound {
                            repo: spec.repo.slug(),
                            platform: spec
                                .asset
                                .clone()
                                .unwrap_or_else(|| format!("{}.zip", spec.repo.name)),
                        }
                    );
                    failed += 1;
                }
            }
        }

        let mut dataset_futures = Vec::new();
        for dataset in &self.manifest.datasets {
            println!("Downloading dataset {}...", dataset.url);
            dataset_futures.push(self.host.fetch_url(&dataset.url));
        }

        let (loader_results, source_results, dataset_results) = futures::join!(
            join_all(loader_futures),
            join_all(source_futures),
            join_all(dataset_futures),
        );

        let mut loader_archives = Vec::new();
        for result in loader_results {
            match result {
                Ok(bytes) => loader_archives.push(bytes),
                Err(err) => {
                    error!("Failed to get archive: {err:#}");
                    failed += 1;
                }
            }
        }

        let mut source_archives = Vec::new();
        for result in source_results {
            match result {
                Ok(bytes) => source_archives.push(bytes),
                Err(err) => {
                    error!("Failed to get archive: {err:#}");
                    failed += 1;
                }
            }
        }

        let mut datasets = Vec::new();
        for (spec, result) in self.manifest.datasets.iter().zip(dataset_results) {
            match result {
                Ok(bytes) => datasets.push((spec, bytes)),
                Err(err) if spec.optional => {
                    warn!("Skipping optional dataset {}: {err:#}", spec.url);
                }
                Err(err) => {
                    error!("Failed to get dataset {}: {err:#}", spec.url);
                    failed += 1;
                }
            }
        }

        if total > 0 && failed == total {
            return Err(RelpackError::TotalFetchFailure {
                repo: loader.repo.slug(),
            }
            .into());
        }
        if failed > 0 {
            return Err(RelpackError::PartialFetchFailure {
                failed,
                total,
            }
            .into());
        }

        let mut merged = MergedArchive::new();
        for bytes in &loader_archives {
            let count = merged.merge_zip(bytes, loader.conflict_policy)?;
            debug!("Merged {count} loader entries");
        }
        for bytes in &source_archives {
            let count = merged.merge_zip(bytes, loader.conflict_policy)?;
            debug!("Merged {count} source entries");
        }
        for (spec, bytes) in &datasets {
            println!("Embedding dataset {} in archive...", spec.prefix);
            merged.merge_zip_filtered(bytes, &spec.prefix, &spec.include)?;
        }

        println!("Embedding payload in archive...");
        merged.embed_tree(&self.ctx.payload_dir)?;

        Ok(merged)
    }

    /// Serializes the merged archive and writes it atomically under dist.
    fn write_dist(&self, merged: MergedArchive) -> Result<PathBuf> {
        let bytes = merged.into_zip_bytes()?;
        ensure_dir(&self.ctx.dist_dir)?;
        let path = self.ctx.dist_path(&self.manifest.bundle.name);
        println!("Writing archive to disk: {}", path.display());
        atomic_write(&path, &bytes)?;
        Ok(path)
    }

    /// Persists the new metadata record and commits it, returning the commit
    /// hash the release tag should target.
    ///
    /// Aborts with [`RelpackError::MetadataUnchanged`] before any git mutation
    /// when the record on disk is identical to the previous run's.
    async fn commit_metadata(&self, resolution: &Resolution) -> Result<String> {
        resolution.next_metadata.save(&self.ctx.metadata_path)?;
        if resolution.bumped {
            self.manifest.write_payload_version(&resolution.payload)?;
            println!(
                "Payload version bumped to {}",
                resolution.payload.to_string().bold()
            );
        }

        let changed = self.vcs.changed_paths().await?;
        let metadata_path = changed
            .iter()
            .find(|path| path.ends_with(METADATA_FILE))
            .cloned()
            .ok_or(RelpackError::MetadataUnchanged)?;

        let mut entries = Vec::new();
        if let Some(workspace) = &self.ctx.workspace {
            entries.push(("safe.directory".to_string(), workspace.clone()));
        }
        let (name, email) = self.ctx.git_identity();
        entries.push(("user.name".to_string(), name));
        entries.push(("user.email".to_string(), email));
        entries.push(("core.ignorecase".to_string(), "false".to_string()));
        self.vcs.configure(&entries).await?;

        println!("{}", "Committing metadata...".cyan());
        let mut staged = vec![metadata_path];
        if resolution.bumped {
            if let Some(manifest_path) = changed
                .iter()
                .find(|path| path.ends_with(MANIFEST_FILE))
            {
                staged.push(manifest_path.clone());
            }
        }
        self.vcs.add(&staged).await?;
        let commit = self.vcs.commit("Update metadata").await?;
        self.vcs.push().await?;
        Ok(commit)
    }

    /// Creates the tagged release and uploads everything under dist.
    async fn publish(&self, resolution: &Resolution, commit: &str) -> Result<()> {
        let repo = &self.manifest.bundle.repo;
        let tag = format!("v{}", resolution.candidate);

        println!("{}", "Creating release...".cyan());
        let release = self
            .host
            .create_release(
                repo,
                &NewRelease {
                    tag_name: tag.clone(),
                    target_commitish: commit.to_string(),
                    name: tag.clone(),
                    body: notes::render(&resolution.drifted),
                },
            )
            .await?;

        println!("{}", "Uploading assets...".cyan());
        for path in walk_files(&self.ctx.dist_dir)? {
            let name = path
                .file_name()
                .and_then(|name| name.to_str())
                .map(str::to_string)
                .ok_or_else(|| RelpackError::FileSystemError {
                    operation: "resolve upload name".to_string(),
                    path: path.display().to_string(),
                })?;
            let content_type = upload_content_type(&resolution.loader_release, &name);
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            self.host
                .upload_asset(repo, release.id, &name, content_type, bytes)
                .await?;
        }

        println!("{} Published release {}", "✓".green(), tag.bold());
        Ok(())
    }
}

/// Compares each recorded source URL against the freshly resolved release for
/// the same repository.
///
/// Recorded URLs that do not parse, or whose repository no longer appears in
/// the manifest, are ignored rather than treated as drift. A vanished source
/// means the manifest changed shape, which calls for a manual version bump.
fn detect_drift(
    metadata: &Metadata,
    loader_release: &Release,
    source_releases: &[Release],
) -> Vec<DriftedSource> {
    let Some(recorded_sources) = metadata.sources.as_ref() else {
        return Vec::new();
    };

    let fresh: Vec<&Release> = std::iter::once(loader_release)
        .chain(source_releases)
        .collect();

    let mut drifted = Vec::new();
    for recorded_url in recorded_sources {
        let Some((repo, recorded_tag)) = RepoRef::from_release_url(recorded_url) else {
            debug!("Ignoring unrecognized recorded source URL: {recorded_url}");
            continue;
        };
        let Some(release) = fresh.iter().find(|release| {
            RepoRef::from_release_url(&release.html_url)
                .is_some_and(|(fresh_repo, _)| fresh_repo.matches(&repo))
        }) else {
            continue;
        };
        let Ok(baseline) = version::normalize(&recorded_tag) else {
            continue;
        };
        let Ok(fresh_version) = version::normalize(&release.tag_name) else {
            continue;
        };

        if version::is_newer(
            &fresh_version,
            &Recorded::Version(baseline),
            PrereleaseMode::Include,
        ) {
            drifted.push(DriftedSource {
                repo,
                tag_name: release.tag_name.clone(),
                html_url: release.html_url.clone(),
                body: release.body.clone(),
            });
        }
    }
    drifted
}

/// Picks the upload content type: inherited from the loader release's
/// like-named asset when one exists.
fn upload_content_type<'a>(loader_release: &'a Release, name: &str) -> &'a str {
    loader_release
        .assets
        .iter()
        .find(|asset| asset.name == name)
        .map_or(FALLBACK_CONTENT_TYPE, |asset| asset.content_type.as_str())
}
