//! Ref name validation following git-style conventions.
//!
//! Valid ref names:
//! - Must start with `refs/` and have at least one component after it
//! - Must not contain whitespace, `~`, `^`, `:`, `?`, `*`, `[`, `\`
//! - Must not contain `..` or `@{`
//! - Must not end with `/`, `.`, or `.lock`
//! - Components between slashes must be non-empty and not start with `.`

use crate::error::{RefError, Result};

/// Characters that are forbidden anywhere in a ref name.
const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];

fn invalid(name: &str, reason: impl Into<String>) -> RefError {
    RefError::InvalidRefName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate a full ref name such as `refs/changes/34/1234/meta`.
///
/// # Examples
///
/// ```
/// use notedb_refs::names::validate_ref_name;
///
/// assert!(validate_ref_name("refs/changes/34/1234/meta").is_ok());
/// assert!(validate_ref_name("HEAD").is_err());
/// assert!(validate_ref_name("refs/bad..name").is_err());
/// ```
pub fn validate_ref_name(name: &str) -> Result<()> {
    let Some(rest) = name.strip_prefix("refs/") else {
        return Err(invalid(name, "must start with 'refs/'"));
    };
    if rest.is_empty() {
        return Err(invalid(name, "must name a ref below 'refs/'"));
    }

    for ch in FORBIDDEN_CHARS {
        if name.contains(*ch) {
            return Err(invalid(name, format!("contains forbidden character: {ch:?}")));
        }
    }

    if name.contains("..") {
        return Err(invalid(name, "must not contain '..'"));
    }
    if name.contains("@{") {
        return Err(invalid(name, "must not contain '@{'"));
    }
    if name.ends_with('/') || name.ends_with('.') {
        return Err(invalid(name, "must not end with '/' or '.'"));
    }
    if name.ends_with(".lock") {
        return Err(invalid(name, "must not end with '.lock'"));
    }

    for component in rest.split('/') {
        if component.is_empty() {
            return Err(invalid(name, "path components must not be empty"));
        }
        if component.starts_with('.') {
            return Err(invalid(
                name,
                format!("component must not start with '.': {component:?}"),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(validate_ref_name("refs/changes/34/1234/meta").is_ok());
        assert!(validate_ref_name("refs/changes/34/1234/robot-comments").is_ok());
        assert!(validate_ref_name("refs/draft-comments/34/1234/1000001").is_ok());
        assert!(validate_ref_name("refs/heads/master").is_ok());
    }

    #[test]
    fn reject_outside_refs() {
        assert!(validate_ref_name("HEAD").is_err());
        assert!(validate_ref_name("refs/").is_err());
        assert!(validate_ref_name("heads/master").is_err());
    }

    #[test]
    fn reject_forbidden_chars() {
        for bad in ["refs/a b", "refs/a~b", "refs/a^b", "refs/a:b", "refs/a?b", "refs/a*b", "refs/a[b", "refs/a\\b"] {
            assert!(validate_ref_name(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn reject_bad_shapes() {
        assert!(validate_ref_name("refs/a..b").is_err());
        assert!(validate_ref_name("refs/a@{0}").is_err());
        assert!(validate_ref_name("refs/a//b").is_err());
        assert!(validate_ref_name("refs/a/").is_err());
        assert!(validate_ref_name("refs/a.").is_err());
        assert!(validate_ref_name("refs/meta.lock").is_err());
        assert!(validate_ref_name("refs/changes/.hidden").is_err());
    }
}
