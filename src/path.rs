//! Parsing and canonicalization of virtual file system paths.

use std::path::{Component, Path as StdPath};

/// A normalized, forward-slash path inside the virtual file system.
///
/// Parsing splits on `/`, discards empty, `.` and literal `/` segments, and
/// lets `..` pop the last segment (silently dropped if there is none). The
/// canonical form joins the remaining segments with a single `/`, without a
/// leading or trailing slash.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Path(Vec<String>);

impl Path {
    /// Parses a raw path into its canonical segments.
    pub fn parse<T: AsRef<StdPath>>(raw: T) -> Self {
        let mut parts: Vec<String> = Vec::new();
        for component in raw.as_ref().components() {
            match component {
                Component::Normal(segment) => {
                    if let Some(segment) = segment.to_str() {
                        parts.push(segment.to_string());
                    }
                }
                Component::ParentDir => {
                    parts.pop();
                }
                // RootDir, CurDir, Prefix are all discarded, matching the
                // "discard '.', the literal '/' segment" rule.
                _ => {}
            }
        }
        Path(parts)
    }

    /// Joins the first `limit` segments (all of them if `limit` is negative
    /// or exceeds the segment count) into the canonical string form.
    pub fn absolute(&self, limit: Option<i64>) -> String {
        let take = match limit {
            Some(limit) if limit >= 0 => (limit as usize).min(self.0.len()),
            _ => self.0.len(),
        };
        self.0[..take].join("/")
    }

    /// Whether this path has zero segments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> From<T> for Path
where
    T: AsRef<StdPath>,
{
    fn from(raw: T) -> Self {
        Path::parse(raw)
    }
}

impl<T> PartialEq<T> for Path
where
    T: AsRef<str>,
{
    fn eq(&self, other: &T) -> bool {
        self.absolute(None) == other.as_ref()
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.absolute(None))
    }
}

#[cfg(test)]
mod tests {
    use super::Path;

    #[test]
    fn test_special() {
        assert_eq!(Path::parse("/"), "");
        assert_eq!(Path::parse("."), "");
        assert_eq!(Path::parse(".."), "");
        assert!(Path::parse("").is_empty());
    }

    #[test]
    fn test_multiple() {
        assert_eq!(Path::parse("42"), "42");
        assert_eq!(Path::parse("/42"), "42");
        assert_eq!(Path::parse("42/"), "42");
        assert_eq!(Path::parse("/42/"), "42");
    }

    #[test]
    fn test_multiple_parts() {
        assert_eq!(Path::parse("42/PI"), "42/PI");
        assert_eq!(Path::parse("/42/PI/"), "42/PI");
        assert_eq!(Path::parse("/42/PI"), "42/PI");
    }

    #[test]
    fn test_current_dir() {
        assert_eq!(Path::parse("/42/."), "42");
        assert_eq!(Path::parse("/42/./"), "42");
        assert_eq!(Path::parse("/42/./PI"), "42/PI");
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(Path::parse("/42/.."), "");
        assert_eq!(Path::parse("42/.."), "");
        assert_eq!(Path::parse("./.."), "");
        assert_eq!(Path::parse("42/../"), "");
        assert_eq!(Path::parse("42/../PI"), "PI");
        assert_eq!(Path::parse("42/./../PI/"), "PI");
        assert_eq!(Path::parse("42/43/../PI/"), "42/PI");
    }

    #[test]
    fn test_absolute_limit() {
        let path = Path::parse("a/b/c");
        assert_eq!(path.absolute(Some(0)), "");
        assert_eq!(path.absolute(Some(1)), "a");
        assert_eq!(path.absolute(Some(2)), "a/b");
        assert_eq!(path.absolute(Some(100)), "a/b/c");
        assert_eq!(path.absolute(Some(-1)), "a/b/c");
        assert_eq!(path.absolute(None), "a/b/c");
    }
}
