//! # Schema Version Checking
//!
//! A manifest may declare the minimum schema version it needs in
//! `manifest: version:`. The check runs before anything else in the
//! document is looked at, so that a manifest written for a newer release
//! fails with "upgrade" rather than a confusing schema complaint.
//!
//! Versions are compared with `semver`. Schema versions are written with one
//! to three numeric components (`"0.10"`, `"0.6.99"`); missing components are
//! padded with zero before parsing.

use semver::Version;
use serde_yaml::Value;
use std::path::Path;

use crate::defaults::{SCHEMA_VERSION, VALID_SCHEMA_VERSIONS};
use crate::error::{Error, Result};

/// Parses a schema version string such as `"0.10"` or `"0.6.99"`.
pub fn parse_schema_version(raw: &str) -> Result<Version> {
    let parts: Vec<&str> = raw.trim().split('.').collect();
    if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
        // Let semver produce the error text.
        return Ok(Version::parse(raw)?);
    }
    let mut padded = parts.join(".");
    for _ in parts.len()..3 {
        padded.push_str(".0");
    }
    Ok(Version::parse(&padded)?)
}

/// Returns the newest supported schema version.
pub fn max_schema_version() -> Version {
    parse_schema_version(SCHEMA_VERSION).unwrap_or_else(|_| Version::new(1, 2, 0))
}

/// Validates a raw `manifest: version:` value.
///
/// Returns the version as a string on success. A version newer than
/// [`SCHEMA_VERSION`] is [`Error::UnsupportedVersion`]; anything else that
/// is not a known version is a malformed manifest.
pub fn check_schema_version(value: &Value, location: &str, file: Option<&Path>) -> Result<String> {
    let (raw, was_number) = match value {
        Value::String(s) => (s.clone(), false),
        Value::Number(n) => (n.to_string(), true),
        other => {
            return Err(Error::malformed(
                location,
                format!("version must be a string, not {:?}", other),
            ))
        }
    };

    let parsed = parse_schema_version(&raw).map_err(|_| {
        Error::malformed(location, format!("invalid version {}", raw))
    })?;

    if parsed > max_schema_version() {
        return Err(Error::UnsupportedVersion {
            version: raw,
            file: file.map(Path::to_path_buf),
        });
    }

    if !VALID_SCHEMA_VERSIONS.contains(&raw.as_str()) {
        let hint = if was_number {
            Some(format!(
                "the version was read as the number {}; quote it, e.g. version: \"{}\"",
                raw, raw
            ))
        } else {
            None
        };
        return Err(Error::MalformedManifest {
            location: location.to_string(),
            message: format!(
                "invalid version {}; the lowest schema version is {}",
                raw, VALID_SCHEMA_VERSIONS[0]
            ),
            hint,
        });
    }

    Ok(raw)
}
