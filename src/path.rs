//! Remote paths as segment lists.
//!
//! Remote paths are always `/` separated regardless of the local platform, so
//! they are kept apart from `std::path`.

use std::fmt;

/// A normalized remote path.
///
/// Duplicate separators and `.` segments are dropped when parsing, `..` is
/// kept as is since the server decides what it resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RemotePath {
    absolute: bool,
    segments: Vec<String>,
}

impl RemotePath {
    pub fn parse(path: &str) -> RemotePath {
        RemotePath {
            absolute: path.starts_with('/'),
            segments: path
                .split('/')
                .filter(|s| !s.is_empty() && *s != ".")
                .map(String::from)
                .collect(),
        }
    }

    pub fn root() -> RemotePath {
        RemotePath { absolute: true, segments: Vec::new() }
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// `true` for `/`, `.` and the empty path.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// The path without its last segment. The parent of a root is itself.
    pub fn parent(&self) -> RemotePath {
        let mut segments = self.segments.clone();
        segments.pop();
        RemotePath { absolute: self.absolute, segments }
    }

    /// Appends `other`. An absolute `other` replaces `self` entirely.
    pub fn join<P: Into<RemotePath>>(&self, other: P) -> RemotePath {
        let other = other.into();
        if other.absolute {
            return other;
        }
        let mut segments = self.segments.clone();
        segments.extend(other.segments);
        RemotePath { absolute: self.absolute, segments }
    }

    /// Segments of `self` below `base`, or `None` if `base` is not a prefix.
    pub fn relative_to(&self, base: &RemotePath) -> Option<RemotePath> {
        if self.absolute != base.absolute || !self.segments.starts_with(&base.segments) {
            return None;
        }
        Some(RemotePath {
            absolute: false,
            segments: self.segments[base.segments.len()..].to_vec(),
        })
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl From<&str> for RemotePath {
    fn from(path: &str) -> RemotePath {
        RemotePath::parse(path)
    }
}

impl From<&String> for RemotePath {
    fn from(path: &String) -> RemotePath {
        RemotePath::parse(path)
    }
}

impl From<String> for RemotePath {
    fn from(path: String) -> RemotePath {
        RemotePath::parse(&path)
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.absolute, self.segments.is_empty()) {
            (true, true) => write!(f, "/"),
            (false, true) => write!(f, "."),
            (true, false) => write!(f, "/{}", self.segments.join("/")),
            (false, false) => write!(f, "{}", self.segments.join("/")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn duplicate_separators_collapse() {
        assert_eq!(RemotePath::parse("//pub///docs/").to_string(), "/pub/docs");
        assert_eq!(RemotePath::parse("./a/./b").to_string(), "a/b");
        assert_eq!(RemotePath::parse("").to_string(), ".");
        assert_eq!(RemotePath::parse("/").to_string(), "/");
    }

    #[test]
    fn join_and_parent() {
        let base = RemotePath::parse("/pub/");
        assert_eq!(base.join("docs/a.txt").to_string(), "/pub/docs/a.txt");
        assert_eq!(base.join("/etc").to_string(), "/etc");
        assert_eq!(RemotePath::parse("/pub/a.txt").parent().to_string(), "/pub");
        assert_eq!(RemotePath::parse("a.txt").parent().to_string(), ".");
        assert_eq!(RemotePath::root().parent(), RemotePath::root());
    }

    #[test]
    fn relative_to_requires_segment_prefix() {
        let base = RemotePath::parse("/pub/doc");
        let child = RemotePath::parse("/pub/doc/x/y.txt");
        assert_eq!(child.relative_to(&base).unwrap().to_string(), "x/y.txt");
        // string prefix but not segment prefix
        assert_eq!(RemotePath::parse("/pub/docs/y").relative_to(&base), None);
        assert_eq!(RemotePath::parse("pub/doc/y").relative_to(&base), None);
    }

    #[test]
    fn file_name() {
        assert_eq!(RemotePath::parse("/a/b.txt").file_name(), Some("b.txt"));
        assert_eq!(RemotePath::root().file_name(), None);
    }
}
