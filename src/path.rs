//! Immutable slash-delimited paths and the total order the lock protocol relies on.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors constructing a [`Path`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// A path string did not start with `/`.
    #[error("path must start with '/'")]
    MissingRoot,
    /// A component contained a forbidden character or was empty when explicitly delimited.
    #[error("invalid path component")]
    InvalidComponent,
}

/// An ordered sequence of non-empty components, none of which contain `/` or `:`.
///
/// The empty sequence is the root path, written `/`. Two paths are equal iff their
/// component sequences are equal; [`Path::cmp`] defines the total order used by the
/// lock table to acquire lock chains deadlock-free (ancestors always precede descendants).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path {
    components: Vec<String>,
}

impl Path {
    /// The root path.
    pub fn root() -> Self {
        Path { components: Vec::new() }
    }

    /// Parses a `/`-delimited string. Must start with `/`; empty components
    /// (including a trailing slash) are dropped silently; `:` anywhere in a
    /// component is rejected.
    pub fn parse(s: &str) -> Result<Self, PathError> {
        if !s.starts_with('/') {
            return Err(PathError::MissingRoot);
        }
        let mut components = Vec::new();
        for part in s.split('/') {
            if part.is_empty() {
                continue;
            }
            if part.contains(':') {
                return Err(PathError::InvalidComponent);
            }
            components.push(part.to_string());
        }
        Ok(Path { components })
    }

    /// Appends a single component to `self`, returning a new path.
    pub fn join(&self, component: &str) -> Result<Self, PathError> {
        if component.is_empty() || component.contains('/') || component.contains(':') {
            return Err(PathError::InvalidComponent);
        }
        let mut components = self.components.clone();
        components.push(component.to_string());
        Ok(Path { components })
    }

    /// `true` iff this is the root path.
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// The parent path, or `None` if `self` is root.
    pub fn parent(&self) -> Option<Path> {
        if self.is_root() {
            return None;
        }
        let mut components = self.components.clone();
        components.pop();
        Some(Path { components })
    }

    /// The last component, or `None` if `self` is root.
    pub fn last(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    /// Component iterator, root-to-leaf.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(String::as_str)
    }

    pub fn depth(&self) -> usize {
        self.components.len()
    }

    /// `true` iff `other` is a prefix of `self` (every path is a subpath of itself).
    pub fn is_subpath_of(&self, other: &Path) -> bool {
        if other.components.len() > self.components.len() {
            return false;
        }
        self.components[..other.components.len()] == other.components[..]
    }

    /// `self` and every strict ancestor, root last-to-first in traversal order
    /// meaning index 0 is `self` and the last element is root. Callers that need
    /// root-first order should reverse, or use [`Path::lock_chain`] directly.
    pub fn ancestors(&self) -> Vec<Path> {
        let mut chain = Vec::with_capacity(self.components.len() + 1);
        let mut cur = self.clone();
        loop {
            let is_root = cur.is_root();
            chain.push(cur.clone());
            if is_root {
                break;
            }
            cur = cur.parent().unwrap();
        }
        chain
    }

    /// The lock chain for this path: `self` plus every strict ancestor, ordered
    /// root-first per the global path order (see [`Path::cmp`]).
    pub fn lock_chain(&self) -> Vec<Path> {
        let mut chain = self.ancestors();
        chain.sort();
        chain
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, "/");
        }
        for c in &self.components {
            write!(f, "/{c}")?;
        }
        Ok(())
    }
}

impl PartialOrd for Path {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Path {
    /// Ancestors strictly precede descendants; siblings order lexicographically
    /// by component at the first point of difference. This is the single source
    /// of truth the lock table uses to avoid deadlock: every lock chain is
    /// acquired in this order.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        if self == other {
            return Ordering::Equal;
        }
        let n = self.components.len().min(other.components.len());
        for i in 0..n {
            match self.components[i].cmp(&other.components[i]) {
                Ordering::Equal => continue,
                other_order => return other_order,
            }
        }
        self.components.len().cmp(&other.components.len())
    }
}

impl std::str::FromStr for Path {
    type Err = PathError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_root() {
        let p = Path::parse("/").unwrap();
        assert!(p.is_root());
        assert_eq!(p.to_string(), "/");
    }

    #[test]
    fn round_trips_normal_path() {
        let p = Path::parse("/a/b/c").unwrap();
        assert_eq!(p.to_string(), "/a/b/c");
        assert_eq!(Path::parse(&p.to_string()).unwrap(), p);
    }

    #[test]
    fn drops_empty_components() {
        let p = Path::parse("/a//b/").unwrap();
        assert_eq!(p.to_string(), "/a/b");
    }

    #[test]
    fn rejects_missing_root() {
        assert_eq!(Path::parse("a/b"), Err(PathError::MissingRoot));
    }

    #[test]
    fn rejects_colon() {
        assert_eq!(Path::parse("/a:b"), Err(PathError::InvalidComponent));
    }

    #[test]
    fn parent_and_last() {
        let p = Path::parse("/a/b/c").unwrap();
        assert_eq!(p.last(), Some("c"));
        assert_eq!(p.parent().unwrap().to_string(), "/a/b");
        assert_eq!(Path::root().parent(), None);
        assert_eq!(Path::root().last(), None);
    }

    #[test]
    fn subpath_includes_self() {
        let a = Path::parse("/a/b").unwrap();
        assert!(a.is_subpath_of(&a));
        assert!(a.is_subpath_of(&Path::parse("/a").unwrap()));
        assert!(!a.is_subpath_of(&Path::parse("/a/b/c").unwrap()));
    }

    #[test]
    fn ordering_is_ancestor_before_descendant() {
        let root = Path::root();
        let a = Path::parse("/a").unwrap();
        let ab = Path::parse("/a/b").unwrap();
        assert!(root < a);
        assert!(a < ab);
    }

    #[test]
    fn ordering_is_lexicographic_among_siblings() {
        let a = Path::parse("/a").unwrap();
        let b = Path::parse("/b").unwrap();
        assert!(a < b);
    }

    #[test]
    fn lock_chain_is_root_first() {
        let p = Path::parse("/a/b").unwrap();
        let chain = p.lock_chain();
        assert_eq!(
            chain.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["/".to_string(), "/a".to_string(), "/a/b".to_string()]
        );
    }
}
