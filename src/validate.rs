//! # Name and Path Validation
//!
//! Pure checks shared by every stage of resolution. Each check returns a
//! plain complaint string on failure; the caller knows which document is
//! being resolved and turns the complaint into an
//! [`Error::MalformedManifest`](crate::error::Error::MalformedManifest) with
//! that location attached.
//!
//! ## Grammar
//!
//! - **Group names**: non-empty, no leading `+` or `-`, and no whitespace,
//!   `,` or `:` anywhere. Non-negative numbers are accepted too, since YAML
//!   turns `groups: [1]` into an integer.
//! - **Project names**: no `/` or `\`, no whitespace or `,`, and not the
//!   reserved name `manifest`.
//! - **Project paths**: after lexical normalization, relative, not escaping
//!   the workspace with `..`, and not inside the `.west` control directory.

use std::path::Path;

use crate::defaults::{CONTROL_DIR, MANIFEST_PROJECT_NAME};
use crate::document::Scalar;

/// Returns true if `name` may be used as a group name.
pub fn is_group_name(name: &str) -> bool {
    match name.chars().next() {
        None | Some('+') | Some('-') => false,
        Some(_) => !name.chars().any(|c| c.is_whitespace() || c == ',' || c == ':'),
    }
}

/// Returns true if a raw `groups:` or `group-filter:` item is a valid group.
pub fn is_group(value: &Scalar) -> bool {
    match value {
        Scalar::Str(s) => is_group_name(s),
        Scalar::Int(i) => *i >= 0,
        Scalar::Float(f) => f.is_finite() && *f >= 0.0,
    }
}

/// Checks a project name.
pub fn check_project_name(name: &str) -> Result<(), String> {
    if name.contains('/') || name.contains('\\') {
        return Err(format!(
            "project name {} contains a path separator; use \"path:\" to set a project's location",
            name
        ));
    }
    if name == MANIFEST_PROJECT_NAME {
        return Err(format!(
            "the name \"{}\" is reserved for the manifest repository",
            MANIFEST_PROJECT_NAME
        ));
    }
    if name.chars().any(|c| c.is_whitespace() || c == ',') {
        return Err(format!(
            "project name \"{}\" may not contain whitespace or commas",
            name
        ));
    }
    if name.is_empty() {
        return Err("project names may not be empty".to_string());
    }
    Ok(())
}

/// Lexically normalizes a `/`-separated path.
///
/// Collapses repeated separators and `.` components and resolves `a/..`
/// pairs. Leading `..` components of a relative path are kept. An empty
/// result is `.`.
pub fn normalize_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut stack: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => match stack.last() {
                Some(&last) if last != ".." => {
                    stack.pop();
                }
                // ".." at the root of an absolute path stays at the root
                _ if absolute => {}
                _ => stack.push(".."),
            },
            other => stack.push(other),
        }
    }
    let joined = stack.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Joins path segments the way a POSIX path join would.
///
/// Empty and `.` components disappear, and a segment starting with `/`
/// discards everything before it. Unlike [`normalize_path`], `..` is kept
/// as written; legality is checked separately.
pub fn compose_path(segments: &[&str]) -> String {
    let mut parts: Vec<&str> = Vec::new();
    let mut absolute = false;
    for segment in segments {
        if segment.starts_with('/') {
            parts.clear();
            absolute = true;
        }
        parts.extend(segment.split('/').filter(|p| !p.is_empty() && *p != "."));
    }
    let joined = parts.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

fn has_drive_prefix(path: &str) -> bool {
    let mut chars = path.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic()
    )
}

/// Returns true for paths that are absolute on any host this runs on.
pub fn is_absolute_like(path: &str) -> bool {
    path.starts_with('/')
        || path.starts_with('\\')
        || has_drive_prefix(path)
        || Path::new(path).is_absolute()
}

/// Checks the resolved path of project `name`.
pub fn check_project_path(name: &str, path: &str) -> Result<(), String> {
    if is_absolute_like(path) {
        return Err(format!(
            "project {} has absolute path {}; it must be relative to the workspace top directory",
            name, path
        ));
    }
    let normalized = normalize_path(path);
    let first = normalized.split('/').next().unwrap_or_default();
    if first == ".." {
        return Err(format!(
            "project {} path {} is outside the workspace top directory",
            name, path
        ));
    }
    if first == CONTROL_DIR {
        return Err(format!(
            "project {} path {} is inside the {} directory",
            name, path, CONTROL_DIR
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_names() {
        assert!(is_group_name("foo"));
        assert!(is_group_name("foo-bar_1"));
        assert!(is_group_name("a+b"));
        assert!(!is_group_name(""));
        assert!(!is_group_name("+foo"));
        assert!(!is_group_name("-foo"));
        assert!(!is_group_name("foo bar"));
        assert!(!is_group_name("foo,bar"));
        assert!(!is_group_name("foo:bar"));
        assert!(!is_group_name("foo\tbar"));
    }

    #[test]
    fn test_numeric_groups() {
        assert!(is_group(&Scalar::Int(0)));
        assert!(is_group(&Scalar::Int(7)));
        assert!(!is_group(&Scalar::Int(-1)));
        assert!(is_group(&Scalar::Float(1.5)));
        assert!(!is_group(&Scalar::Float(-0.5)));
    }

    #[test]
    fn test_project_names() {
        assert!(check_project_name("zephyr").is_ok());
        assert!(check_project_name("hal_nordic").is_ok());
        assert!(check_project_name("a/b").is_err());
        assert!(check_project_name("a\\b").is_err());
        assert!(check_project_name("manifest").is_err());
        assert!(check_project_name("two words").is_err());
        assert!(check_project_name("a,b").is_err());
        assert!(check_project_name("").is_err());
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("a/b"), "a/b");
        assert_eq!(normalize_path("a//b/./c/"), "a/b/c");
        assert_eq!(normalize_path("a/../b"), "b");
        assert_eq!(normalize_path("a/.."), ".");
        assert_eq!(normalize_path("../a"), "../a");
        assert_eq!(normalize_path("a/../../b"), "../b");
        assert_eq!(normalize_path("/a/../.."), "/");
        assert_eq!(normalize_path(""), ".");
    }

    #[test]
    fn test_compose_path() {
        assert_eq!(compose_path(&["", "", "foo"]), "foo");
        assert_eq!(compose_path(&["pfx", "sub/", "foo"]), "pfx/sub/foo");
        assert_eq!(compose_path(&[".", "./foo"]), "foo");
        assert_eq!(compose_path(&["pfx", "/abs"]), "/abs");
        assert_eq!(compose_path(&["pfx", "../up"]), "pfx/../up");
    }

    #[test]
    fn test_project_paths() {
        assert!(check_project_path("p", "modules/p").is_ok());
        assert!(check_project_path("p", "a/../b").is_ok());
        assert!(check_project_path("p", "/abs").is_err());
        assert!(check_project_path("p", "\\abs").is_err());
        assert!(check_project_path("p", "C:/abs").is_err());
        assert!(check_project_path("p", "../outside").is_err());
        assert!(check_project_path("p", "a/../../outside").is_err());
        assert!(check_project_path("p", ".west/p").is_err());
        assert!(check_project_path("p", "./.west").is_err());
        assert!(check_project_path("p", ".westish/p").is_ok());
    }
}
