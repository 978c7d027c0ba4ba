//! Asset selection against a release's attachment list.
//!
//! Loader releases attach one archive per platform, with names like
//! `BepInEx_win_x64_5.4.23.zip` or `BepInEx_unix_unitymono_5.4.23.zip`.
//! Selection is a case-insensitive substring test so manifests can use short
//! platform keys without tracking upstream naming churn.

use super::models::{Asset, RepoRef};

/// Picks the release asset for a platform key.
///
/// When `prefer_variant` is given, an asset whose name contains both the
/// platform key and the variant wins over a platform-only match. Ties resolve
/// to the first asset in listing order, which keeps selection deterministic
/// across runs.
#[must_use]
pub fn select_asset<'a>(
    assets: &'a [Asset],
    platform_key: &str,
    prefer_variant: Option<&str>,
) -> Option<&'a Asset> {
    let platform = platform_key.to_lowercase();
    let matches_platform = |asset: &Asset| asset.name.to_lowercase().contains(&platform);

    if let Some(variant) = prefer_variant {
        let variant = variant.to_lowercase();
        if let Some(asset) = assets
            .iter()
            .find(|a| matches_platform(a) && a.name.to_lowercase().contains(&variant))
        {
            return Some(asset);
        }
    }

    assets.iter().find(|a| matches_platform(a))
}

/// Picks the single archive asset for a source repository.
///
/// With an explicit `pattern` the match is a case-insensitive substring test.
/// Without one, the conventional name `<repo name>.zip` must match exactly.
#[must_use]
pub fn select_named<'a>(
    assets: &'a [Asset],
    pattern: Option<&str>,
    repo: &RepoRef,
) -> Option<&'a Asset> {
    match pattern {
        Some(pattern) => {
            let needle = pattern.to_lowercase();
            assets
                .iter()
                .find(|a| a.name.to_lowercase().contains(&needle))
        }
        None => {
            let conventional = format!("{}.zip", repo.name);
            assets.iter().find(|a| a.name == conventional)
        }
    }
}
