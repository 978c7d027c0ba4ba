//! relpack - release bundling for plugin-loader payloads
//!
//! A CI automation tool that watches an upstream plugin loader's GitHub
//! releases, merges its platform archives with additional source repositories,
//! optional direct-URL datasets, and a local payload tree, and publishes the
//! merged archive as a tagged GitHub release.
//!
//! # How a Run Works
//!
//! 1. **Resolve**: look up the loader's latest release and one release per
//!    configured source repository, then compute the candidate compound
//!    version `<loader>-payload.<payload>`.
//! 2. **Skip or proceed**: compare the candidate against the version recorded
//!    in `.metadata.json`; when nothing is newer the run ends with exit 0.
//! 3. **Fetch**: download every platform asset, source asset, and dataset
//!    concurrently.
//! 4. **Merge**: compose the archives in manifest order under the configured
//!    conflict policy, embed filtered datasets under their prefixes, and embed
//!    the payload tree last so local files always win.
//! 5. **Write**: serialize the merged archive deterministically to
//!    `dist/<name>.zip`. Local runs stop here.
//! 6. **Publish** (CI only): commit the new metadata record, create the
//!    release `v<compound>` targeting that commit, and upload everything
//!    under dist.
//!
//! # Core Modules
//!
//! - [`cli`] - Command-line interface (`bundle`, `check`)
//! - [`config`] - Run context assembled from flags and environment
//! - [`core`] - Error taxonomy and user-facing error reporting
//! - [`pipeline`] - Run orchestration from resolve through publish
//!
//! ## External Interfaces
//! - [`github`] - Release host trait and the GitHub REST implementation
//! - [`git`] - System git wrapper for the commit-and-push stage
//!
//! ## Data Handling
//! - [`archive`] - In-memory zip merging with deterministic output
//! - [`manifest`] - `relpack.toml` parsing and validation
//! - [`metadata`] - The `.metadata.json` record carried between runs
//! - [`version`] - Tag normalization and compound version derivation
//!
//! ## Supporting Modules
//! - [`utils`] - Filesystem helpers (atomic writes, directory walks)
//!
//! # Manifest Format (relpack.toml)
//!
//! ```toml
//! [bundle]
//! name = "BepInEx-Subnautica"     # dist archive stem
//! repo = "owner/my-pack"          # repo that receives the release
//! version = "1.1.0"               # local payload version
//!
//! [loader]
//! repo = "BepInEx/BepInEx"
//! platforms = ["linux_x64", "win_x64"]
//! prefer_variant = "unitymono"
//!
//! [[sources]]
//! repo = "toebeann/Tobey.FileTree"
//!
//! [[datasets]]
//! url = "https://unity.bepinex.dev/corlibs/2019.4.36.zip"
//! prefix = "corlibs"
//! include = ["netstandard.dll"]
//! ```
//!
//! # Command-Line Usage
//!
//! ```bash
//! # Build dist/<name>.zip without publishing
//! relpack bundle
//!
//! # Full CI run: commit metadata, tag, publish
//! relpack bundle --ci
//!
//! # Report whether a run would build or skip
//! relpack check
//! ```

// Core functionality modules
pub mod cli;
pub mod config;
pub mod core;
pub mod pipeline;

// External interfaces
pub mod git;
pub mod github;

// Data handling
pub mod archive;
pub mod manifest;
pub mod metadata;
pub mod version;

// Supporting modules
pub mod utils;
