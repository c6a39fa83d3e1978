//! Manifest fixture tests using datatest-stable for test data discovery
//!
//! Every file under `testdata/valid` must resolve, and resolving its
//! `as_yaml()` output again must give back the same manifest. Every file
//! under `testdata/invalid` must be rejected.

use std::path::Path;

use west_manifest::{ImportMode, ManifestBuilder};

fn read_fixture(path: &Path) -> datatest_stable::Result<String> {
    Ok(std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read test file {}: {}", path.display(), e))?)
}

fn test_valid_manifest(path: &Path) -> datatest_stable::Result<()> {
    let content = read_fixture(path)?;

    let manifest = ManifestBuilder::new()
        .import_mode(ImportMode::Ignore)
        .load_data(&content)
        .map_err(|e| format!("Failed to resolve {}: {}", path.display(), e))?;
    assert!(
        !manifest.projects().is_empty(),
        "{} should contain at least the manifest project",
        path.display()
    );

    let yaml = manifest.as_yaml()?;
    let again = ManifestBuilder::new()
        .import_mode(ImportMode::Ignore)
        .load_data(&yaml)
        .map_err(|e| format!("Failed to resolve as_yaml() of {}: {}\n{}", path.display(), e, yaml))?;
    assert_eq!(
        again.as_value(),
        manifest.as_value(),
        "as_yaml() of {} is not a fixed point",
        path.display()
    );
    Ok(())
}

fn test_invalid_manifest(path: &Path) -> datatest_stable::Result<()> {
    let content = read_fixture(path)?;
    let result = ManifestBuilder::new()
        .import_mode(ImportMode::Ignore)
        .load_data(&content);
    assert!(result.is_err(), "{} should be rejected", path.display());
    Ok(())
}

datatest_stable::harness!(
    test_valid_manifest,
    "tests/testdata/valid",
    r".*\.yml$",
    test_invalid_manifest,
    "tests/testdata/invalid",
    r".*\.yml$"
);
