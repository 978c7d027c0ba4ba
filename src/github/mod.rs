//! GitHub release resolution, asset selection, and publishing.
//!
//! The module splits into three layers:
//!
//! - [`models`] holds the deserialized wire types ([`Release`], [`Asset`])
//!   and the [`RepoRef`] repository reference.
//! - [`locator`] picks assets off a release by platform key or name pattern.
//! - [`client`] defines the [`ReleaseHost`] trait and its reqwest-backed
//!   [`GithubClient`] implementation.
//!
//! Everything above this module depends on [`ReleaseHost`] rather than on the
//! concrete client, so tests drive the pipeline with an in-memory host.

pub mod client;
pub mod locator;
pub mod models;

pub use client::{GithubClient, NewRelease, ReleaseHost};
pub use locator::{select_asset, select_named};
pub use models::{Asset, Release, RepoRef};
