//! Integration tests for group-filter precedence and project filters.
//!
//! Batches of `group-filter:` directives are replayed so that a batch
//! recorded earlier during resolution overrides a later one. These tests
//! pin that order down for the root manifest, self imports and sibling
//! project imports.

use west_manifest::config::Configuration;
use west_manifest::{ImportMode, Manifest, ManifestBuilder, MemoryProvider};

fn provider_with(files: &[(&str, &str)]) -> MemoryProvider {
    let mut provider = MemoryProvider::new();
    for (project, content) in files {
        provider.add_file(project, "west.yml", content);
    }
    provider
}

fn disabled(manifest: &Manifest) -> Vec<String> {
    manifest.group_filter().to_vec()
}

const GROUPED: &str = "manifest:\n  group-filter: [+foo]\n  projects:\n    - {name: grouped, url: https://x/g, groups: [foo]}\n";

#[test]
fn test_root_disable_beats_imported_enable() {
    let provider = provider_with(&[("lib", GROUPED)]);
    let root = r#"
manifest:
  group-filter: [-foo]
  projects:
    - {name: lib, url: https://x/lib, import: true}
"#;
    let manifest = ManifestBuilder::new().provider(provider).load_data(root).unwrap();
    assert_eq!(disabled(&manifest), vec!["-foo"]);
    assert!(!manifest.is_active(manifest.project("grouped").unwrap()));
}

#[test]
fn test_root_enable_beats_imported_disable() {
    let provider = provider_with(&[(
        "lib",
        "manifest:\n  group-filter: [-foo, -bar]\n  projects:\n    - {name: grouped, url: https://x/g, groups: [foo]}\n",
    )]);
    let root = r#"
manifest:
  group-filter: [+foo]
  projects:
    - {name: lib, url: https://x/lib, import: true}
"#;
    let manifest = ManifestBuilder::new().provider(provider).load_data(root).unwrap();
    assert_eq!(disabled(&manifest), vec!["-bar"]);
    assert!(manifest.is_active(manifest.project("grouped").unwrap()));
}

#[test]
fn test_earlier_sibling_import_wins() {
    let provider = provider_with(&[
        ("first", "manifest:\n  group-filter: [-foo]\n"),
        ("second", "manifest:\n  group-filter: [+foo, -bar]\n"),
    ]);
    let root = r#"
manifest:
  projects:
    - {name: first, url: https://x/first, import: true}
    - {name: second, url: https://x/second, import: true}
"#;
    let manifest = ManifestBuilder::new().provider(provider).load_data(root).unwrap();
    assert_eq!(disabled(&manifest), vec!["-bar", "-foo"]);
}

#[test]
fn test_nested_import_loses_to_its_parent() {
    let provider = provider_with(&[
        (
            "outer",
            "manifest:\n  group-filter: [+foo]\n  projects:\n    - {name: inner, url: https://x/inner, import: true}\n",
        ),
        ("inner", "manifest:\n  group-filter: [-foo, -baz]\n"),
    ]);
    let root = "manifest:\n  projects:\n    - {name: outer, url: https://x/outer, import: true}\n";
    let manifest = ManifestBuilder::new().provider(provider).load_data(root).unwrap();
    assert_eq!(disabled(&manifest), vec!["-baz"]);
}

#[test]
fn test_group_filter_is_sorted_and_deduplicated() {
    let root = "manifest:\n  group-filter: [-zeta, -alpha, -zeta, +beta]\n";
    let manifest = Manifest::from_data(root).unwrap();
    assert_eq!(disabled(&manifest), vec!["-alpha", "-zeta"]);
}

#[test]
fn test_projects_without_groups_are_always_active() {
    let root = r#"
manifest:
  group-filter: [-x]
  projects:
    - {name: plain, url: https://x/plain}
    - {name: tagged, url: https://x/tagged, groups: [x, y]}
"#;
    let config = Configuration::from_layers("", "", "[manifest]\ngroup-filter = -y\n").unwrap();
    let manifest = ManifestBuilder::new().config(config).load_data(root).unwrap();
    assert!(manifest.is_active(manifest.project("plain").unwrap()));
    assert!(!manifest.is_active(manifest.project("tagged").unwrap()));
    assert!(manifest
        .is_active_with(manifest.project("tagged").unwrap(), &["+y"])
        .unwrap());
}

#[test]
fn test_project_filter_overrides_groups() {
    let root = r#"
manifest:
  group-filter: [-x]
  projects:
    - {name: a, url: https://x/a, groups: [x]}
    - {name: b, url: https://x/b, groups: [y]}
"#;
    let config =
        Configuration::from_layers("", "[manifest]\nproject-filter = +a,-b\n", "").unwrap();
    let manifest = ManifestBuilder::new().config(config).load_data(root).unwrap();
    assert!(manifest.is_active(manifest.project("a").unwrap()));
    assert!(!manifest.is_active(manifest.project("b").unwrap()));
    assert!(!manifest
        .is_active_with(manifest.project("b").unwrap(), &["+y"])
        .unwrap());
    assert!(manifest.is_active(manifest.manifest_project()));
}

#[test]
fn test_project_filter_skips_imports_of_inactive_projects() {
    let root = "manifest:\n  projects:\n    - {name: lib, url: https://x/lib, import: true}\n";
    let config = Configuration::from_layers("", "", "[manifest]\nproject-filter = -lib\n").unwrap();

    // FailingImporter would fail if the import were attempted
    let manifest = ManifestBuilder::new().config(config).load_data(root).unwrap();
    assert_eq!(manifest.projects().len(), 2);
    assert!(!manifest.has_imports());
}

#[test]
fn test_invalid_group_filter_in_manifest_is_fatal() {
    for root in [
        "manifest:\n  group-filter: [foo]\n",
        "manifest:\n  group-filter: [\"+a b\"]\n",
        "manifest:\n  group-filter: []\n",
    ] {
        assert!(Manifest::from_data(root).unwrap_err().is_malformed(), "{root}");
    }
}

#[test]
fn test_legacy_version_uses_only_top_level_filter() {
    let provider = provider_with(&[("lib", "manifest:\n  group-filter: [-imported]\n")]);
    let root = r#"
manifest:
  version: "0.9"
  group-filter: [-top]
  projects:
    - {name: lib, url: https://x/lib, import: true}
    - {name: tagged, url: https://x/t, groups: [imported]}
"#;
    let manifest = ManifestBuilder::new()
        .provider(provider)
        .import_mode(ImportMode::Default)
        .load_data(root)
        .unwrap();
    assert_eq!(disabled(&manifest), vec!["-top"]);
    assert!(manifest.is_active(manifest.project("tagged").unwrap()));
}
