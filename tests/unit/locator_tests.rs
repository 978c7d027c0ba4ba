//! Tests for asset selection against realistic upstream release listings.

use crate::common::asset;
use relpack::github::{Asset, RepoRef, select_asset, select_named};

/// Asset names as BepInEx 5 actually publishes them.
fn stable_listing() -> Vec<Asset> {
    vec![
        asset(1, "BepInEx_linux_x64_5.4.23.2.zip"),
        asset(2, "BepInEx_macos_x64_5.4.23.2.zip"),
        asset(3, "BepInEx_unix_5.4.23.2.zip"),
        asset(4, "BepInEx_win_x64_5.4.23.2.zip"),
        asset(5, "BepInEx_win_x86_5.4.23.2.zip"),
    ]
}

/// Asset names in the BepInEx 6 prerelease scheme, where one platform ships
/// in several runtime variants.
fn variant_listing() -> Vec<Asset> {
    vec![
        asset(1, "BepInEx-Unity.IL2CPP-win-x64-6.0.0-pre.2.zip"),
        asset(2, "BepInEx-Unity.Mono-win-x64-6.0.0-pre.2.zip"),
        asset(3, "BepInEx-Unity.Mono-linux-x64-6.0.0-pre.2.zip"),
    ]
}

#[test]
fn platform_keys_match_current_upstream_names() {
    let assets = stable_listing();

    assert_eq!(select_asset(&assets, "win_x64", None).unwrap().id, 4);
    assert_eq!(select_asset(&assets, "unix", None).unwrap().id, 3);
    assert_eq!(select_asset(&assets, "linux_x64", None).unwrap().id, 1);
    assert!(select_asset(&assets, "win_arm64", None).is_none());
}

#[test]
fn variant_preference_separates_runtime_builds() {
    let assets = variant_listing();

    let mono = select_asset(&assets, "win-x64", Some("Unity.Mono")).unwrap();
    assert_eq!(mono.id, 2);

    let il2cpp = select_asset(&assets, "win-x64", Some("Unity.IL2CPP")).unwrap();
    assert_eq!(il2cpp.id, 1);

    // Without a preference the first listing-order match wins.
    assert_eq!(select_asset(&assets, "win-x64", None).unwrap().id, 1);
}

#[test]
fn variant_preference_degrades_to_platform_match() {
    let assets = stable_listing();

    // A variant that upstream stopped shipping must not lose the platform.
    let found = select_asset(&assets, "win_x64", Some("Unity.Mono")).unwrap();
    assert_eq!(found.id, 4);
}

#[test]
fn source_assets_resolve_by_convention_or_pattern() {
    let repo = RepoRef::parse("owner/ExtraPlugins").unwrap();
    let assets = vec![
        asset(1, "Source code (zip)"),
        asset(2, "ExtraPlugins.zip"),
        asset(3, "ExtraPlugins-debug-symbols.zip"),
    ];

    assert_eq!(select_named(&assets, None, &repo).unwrap().id, 2);
    assert_eq!(select_named(&assets, Some("debug-symbols"), &repo).unwrap().id, 3);
    assert!(select_named(&assets, Some("missing"), &repo).is_none());
}
