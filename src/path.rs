//! Path segment validation, instance escaping, and hierarchical joins.
//!
//! Device management APIs address objects through an ordered hierarchy of
//! path segments. This module holds the pure helpers the request builder
//! uses to keep that hierarchy well formed:
//!
//! | Helper | Purpose |
//! |--------|---------|
//! | [`validate_segment`] | Reject illegal plain segments (`.`, `..`, `/`, `%`) |
//! | [`validate_segment_prefix`] | Substring checks only, for partial input |
//! | [`escape_instance_path`] | Tilde-escape a full object path |
//! | [`join_path`] | Join segments into a normalized absolute path |
//!
//! # Examples
//!
//! ```
//! use mgmt_rest::path::{escape_instance_path, join_path, validate_segment};
//!
//! assert!(validate_segment("pool").is_empty());
//! assert!(!validate_segment("a/b").is_empty());
//!
//! assert_eq!(escape_instance_path("/Common/my-object"), "~Common~my-object");
//! assert_eq!(join_path(&["/mgmt", "tm", "ltm"]), "/mgmt/tm/ltm");
//! ```

/// Validate a plain path segment.
///
/// Returns the list of violations; an empty list means the segment is valid.
/// A segment is invalid if it equals `.` or `..` exactly, or contains `/`
/// or `%` anywhere.
pub fn validate_segment(name: &str) -> Vec<String> {
    let mut violations = validate_segment_prefix(name);
    if name == "." {
        violations.push("may not be '.'".to_string());
    }
    if name == ".." {
        violations.push("may not be '..'".to_string());
    }
    violations
}

/// Validate a partial path segment.
///
/// Applies only the substring checks (`/`, `%`). The exact-match checks are
/// skipped because a prefix is allowed to later grow into a longer, valid
/// segment.
pub fn validate_segment_prefix(name: &str) -> Vec<String> {
    let mut violations = Vec::new();
    if name.contains('/') {
        violations.push("may not contain '/'".to_string());
    }
    if name.contains('%') {
        violations.push("may not contain '%'".to_string());
    }
    violations
}

/// Tilde-escape a full object path so it survives transport as a single
/// path segment.
///
/// Every `/` in the identifier is replaced with `~`, matching the device's
/// own path-mangling convention for partitioned object names:
/// `/Common/my-object` renders `~Common~my-object`, while an identifier
/// without separators is returned unchanged.
pub fn escape_instance_path(full_path: &str) -> String {
    full_path.replace('/', "~")
}

/// Join path parts into a single normalized absolute path.
///
/// Empty parts are skipped and duplicate separators at part boundaries are
/// collapsed; the result always begins with `/`.
pub fn join_path(parts: &[&str]) -> String {
    let mut out = String::new();
    for part in parts {
        for segment in part.split('/').filter(|s| !s.is_empty()) {
            out.push('/');
            out.push_str(segment);
        }
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}
