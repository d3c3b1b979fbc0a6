//! The in-memory directory tree (§3 "Tree node").
//!
//! The whole tree is guarded by a single, short-held [`std::sync::Mutex`]: every
//! operation here is synchronous and never awaits, so the critical section is
//! always short. Semantic serialization between concurrent clients comes from
//! the path lock table (§4.2), not from this mutex; this mutex exists only to
//! make the physical child-map mutations atomic, per the "retain shared
//! ancestor locks, rely on per-map mutation atomicity" design decision
//! recorded in `DESIGN.md`.

mod storage_id;

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Mutex;

use rand::seq::IteratorRandom;

pub use storage_id::StorageId;

use crate::path::Path;

/// A directory node: a name (unused for the root) and its children by name.
#[derive(Debug, Default)]
pub struct DirNode {
    pub children: HashMap<String, Node>,
}

/// A file node: a non-empty (while visible) set of storage replicas.
#[derive(Debug, Default)]
pub struct FileNode {
    pub replicas: HashSet<StorageId>,
}

/// One entry of a directory's child map.
#[derive(Debug)]
pub enum Node {
    Directory(DirNode),
    File(FileNode),
}

impl Node {
    pub fn is_directory(&self) -> bool {
        matches!(self, Node::Directory(_))
    }
}

/// Outcome of resolving a path for registration: either it's a fresh path (and
/// a file node has been inserted with the registering storage as its sole
/// replica) or it collided with an already-known object, in which case the
/// path goes on the registration's duplicate list.
#[derive(Debug, PartialEq, Eq)]
pub enum RegisterOutcome {
    Inserted,
    Duplicate,
}

/// What `delete` needs to report and to notify storage nodes about.
pub struct Deleted {
    /// Every storage identity that held a replica of some file under the
    /// deleted subtree (the node itself if a file).
    pub file_replicas: Vec<(Path, HashSet<StorageId>)>,
}

/// Errors raised by tree operations; distinct from the naming coordinator's
/// wire-level error so the tree stays a plain data structure.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("path does not resolve")]
    NotFound,
    #[error("parent is not a directory")]
    ParentNotDirectory,
}

pub struct Tree {
    root: Mutex<DirNode>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Tree { root: Mutex::new(DirNode::default()) }
    }

    fn navigate<'a>(dir: &'a DirNode, components: &[&str]) -> Option<&'a Node> {
        match components.split_first() {
            None => None,
            Some((head, rest)) => {
                let child = dir.children.get(*head)?;
                if rest.is_empty() {
                    Some(child)
                } else {
                    match child {
                        Node::Directory(d) => Self::navigate(d, rest),
                        Node::File(_) => None,
                    }
                }
            }
        }
    }

    fn navigate_parent_mut<'a>(
        dir: &'a mut DirNode,
        components: &[&str],
    ) -> Result<&'a mut DirNode, TreeError> {
        match components.split_first() {
            None => Ok(dir),
            Some((head, rest)) => match dir.children.get_mut(*head) {
                Some(Node::Directory(d)) => Self::navigate_parent_mut(d, rest),
                Some(Node::File(_)) => Err(TreeError::ParentNotDirectory),
                None => Err(TreeError::NotFound),
            },
        }
    }

    /// `Some(true)`/`Some(false)` for directory/file; `None` if unresolvable.
    pub fn is_directory(&self, path: &Path) -> Option<bool> {
        let components: Vec<&str> = path.components().collect();
        let root = self.root.lock().unwrap();
        if components.is_empty() {
            return Some(true);
        }
        Self::navigate(&root, &components).map(Node::is_directory)
    }

    /// Sorted child names of a directory, or `None` if `path` isn't a directory.
    pub fn list(&self, path: &Path) -> Option<Vec<String>> {
        let components: Vec<&str> = path.components().collect();
        let root = self.root.lock().unwrap();
        let dir = if components.is_empty() {
            &*root
        } else {
            match Self::navigate(&root, &components)? {
                Node::Directory(d) => d,
                Node::File(_) => return None,
            }
        };
        let mut names: Vec<String> = dir.children.keys().cloned().collect();
        names.sort();
        Some(names)
    }

    /// Inserts a directory node at `path` if nothing is there yet. `path`'s
    /// parent must already exist and be a directory. Returns `false` (not an
    /// error) if anything already exists at `path`, including root.
    pub fn create_directory(&self, path: &Path) -> Result<bool, TreeError> {
        if path.is_root() {
            return Ok(false);
        }
        let name = path.last().unwrap().to_string();
        let parent_components: Vec<&str> = path.parent().unwrap().components().collect();
        let mut root = self.root.lock().unwrap();
        let parent = Self::navigate_parent_mut(&mut root, &parent_components)?;
        if parent.children.contains_key(&name) {
            return Ok(false);
        }
        parent.children.insert(name, Node::Directory(DirNode::default()));
        Ok(true)
    }

    /// Inserts a file node at `path` with `storage` as its sole replica,
    /// requiring the parent directory to already exist. `false` if anything
    /// already exists at `path`, including root.
    pub fn create_file(&self, path: &Path, storage: StorageId) -> Result<bool, TreeError> {
        if path.is_root() {
            return Ok(false);
        }
        let name = path.last().unwrap().to_string();
        let parent_components: Vec<&str> = path.parent().unwrap().components().collect();
        let mut root = self.root.lock().unwrap();
        let parent = Self::navigate_parent_mut(&mut root, &parent_components)?;
        if parent.children.contains_key(&name) {
            return Ok(false);
        }
        let mut replicas = HashSet::new();
        replicas.insert(storage);
        parent.children.insert(name, Node::File(FileNode { replicas }));
        Ok(true)
    }

    /// Registration variant of file insertion: creates any missing
    /// intermediate directories along the way. Returns
    /// [`RegisterOutcome::Duplicate`] without mutation if `path` already
    /// names a known object (file or directory).
    pub fn register_file(&self, path: &Path, storage: StorageId) -> RegisterOutcome {
        if path.is_root() {
            return RegisterOutcome::Duplicate;
        }
        let name = path.last().unwrap().to_string();
        let parent_components: Vec<&str> = path.parent().unwrap().components().collect();
        let mut root = self.root.lock().unwrap();
        let mut dir = &mut *root;
        for component in parent_components {
            let entry = dir.children.entry(component.to_string()).or_insert_with(|| {
                Node::Directory(DirNode::default())
            });
            match entry {
                Node::Directory(d) => dir = d,
                Node::File(_) => return RegisterOutcome::Duplicate,
            }
        }
        if dir.children.contains_key(&name) {
            return RegisterOutcome::Duplicate;
        }
        let mut replicas = HashSet::new();
        replicas.insert(storage);
        dir.children.insert(name, Node::File(FileNode { replicas }));
        RegisterOutcome::Inserted
    }

    /// Removes the node at `path` from its parent. Root deletion always
    /// returns `Ok(false)`. Returns the replica sets of every file that was
    /// under the removed subtree (the node itself if it was a file), so the
    /// caller can notify storage nodes.
    pub fn delete(&self, path: &Path) -> Result<(bool, Deleted), TreeError> {
        if path.is_root() {
            return Ok((false, Deleted { file_replicas: Vec::new() }));
        }
        let name = path.last().unwrap().to_string();
        let parent_components: Vec<&str> = path.parent().unwrap().components().collect();
        let mut root = self.root.lock().unwrap();
        let parent = Self::navigate_parent_mut(&mut root, &parent_components)?;
        let node = parent.children.remove(&name).ok_or(TreeError::NotFound)?;
        let mut file_replicas = Vec::new();
        collect_file_replicas(path, &node, &mut file_replicas);
        Ok((true, Deleted { file_replicas }))
    }

    /// A copy of the replica set for the file at `path`, or `None` if `path`
    /// doesn't resolve to a file.
    pub fn replicas(&self, path: &Path) -> Option<HashSet<StorageId>> {
        let components: Vec<&str> = path.components().collect();
        let root = self.root.lock().unwrap();
        match Self::navigate(&root, &components)? {
            Node::File(f) => Some(f.replicas.clone()),
            Node::Directory(_) => None,
        }
    }

    /// A uniformly random replica of the file at `path`.
    pub fn random_replica(&self, path: &Path) -> Option<StorageId> {
        let components: Vec<&str> = path.components().collect();
        let root = self.root.lock().unwrap();
        match Self::navigate(&root, &components)? {
            Node::File(f) => f.replicas.iter().copied().choose(&mut rand::thread_rng()),
            Node::Directory(_) => None,
        }
    }

    /// Adds `storage` to the file at `path`'s replica set; `false` if `path`
    /// is no longer a file (e.g. deleted concurrently).
    pub fn add_replica(&self, path: &Path, storage: StorageId) -> bool {
        let components: Vec<&str> = path.components().collect();
        let mut root = self.root.lock().unwrap();
        match Self::navigate_mut(&mut root, &components) {
            Some(Node::File(f)) => {
                f.replicas.insert(storage);
                true
            }
            _ => false,
        }
    }

    /// Removes `storage` from the file at `path`'s replica set; `false` if
    /// `path` is no longer a file.
    pub fn remove_replica(&self, path: &Path, storage: &StorageId) -> bool {
        let components: Vec<&str> = path.components().collect();
        let mut root = self.root.lock().unwrap();
        match Self::navigate_mut(&mut root, &components) {
            Some(Node::File(f)) => {
                f.replicas.remove(storage);
                true
            }
            _ => false,
        }
    }

    fn navigate_mut<'a>(dir: &'a mut DirNode, components: &[&str]) -> Option<&'a mut Node> {
        match components.split_first() {
            None => None,
            Some((head, rest)) => {
                let child = dir.children.get_mut(*head)?;
                if rest.is_empty() {
                    Some(child)
                } else {
                    match child {
                        Node::Directory(d) => Self::navigate_mut(d, rest),
                        Node::File(_) => None,
                    }
                }
            }
        }
    }
}

fn collect_file_replicas(path: &Path, node: &Node, out: &mut Vec<(Path, HashSet<StorageId>)>) {
    match node {
        Node::File(f) => out.push((path.clone(), f.replicas.clone())),
        Node::Directory(d) => {
            for (name, child) in &d.children {
                let child_path = path.join(name).expect("child names are valid components");
                collect_file_replicas(&child_path, child, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    fn sid(port: u16) -> StorageId {
        let addr: SocketAddr = format!("127.0.0.1:{port}").parse().unwrap();
        StorageId::new(addr, addr)
    }

    #[test]
    fn create_directory_idempotence_law() {
        let tree = Tree::new();
        let p = Path::parse("/a").unwrap();
        assert_eq!(tree.create_directory(&p).unwrap(), true);
        assert_eq!(tree.create_directory(&p).unwrap(), false);
    }

    #[test]
    fn create_file_requires_existing_parent() {
        let tree = Tree::new();
        let p = Path::parse("/a/f").unwrap();
        assert_eq!(tree.create_file(&p, sid(1)), Err(TreeError::NotFound));
        tree.create_directory(&Path::parse("/a").unwrap()).unwrap();
        assert_eq!(tree.create_file(&p, sid(1)).unwrap(), true);
        assert_eq!(tree.create_file(&p, sid(1)).unwrap(), false);
    }

    #[test]
    fn create_file_root_is_false() {
        let tree = Tree::new();
        assert_eq!(tree.create_file(&Path::root(), sid(1)).unwrap(), false);
    }

    #[test]
    fn register_creates_intermediate_directories() {
        let tree = Tree::new();
        let p = Path::parse("/a/b/f").unwrap();
        assert_eq!(tree.register_file(&p, sid(1)), RegisterOutcome::Inserted);
        assert_eq!(tree.is_directory(&Path::parse("/a").unwrap()), Some(true));
        assert_eq!(tree.is_directory(&Path::parse("/a/b").unwrap()), Some(true));
        assert_eq!(tree.register_file(&p, sid(2)), RegisterOutcome::Duplicate);
    }

    #[test]
    fn delete_root_returns_false() {
        let tree = Tree::new();
        assert_eq!(tree.delete(&Path::root()).unwrap().0, false);
    }

    #[test]
    fn delete_cascades_file_replicas() {
        let tree = Tree::new();
        tree.create_directory(&Path::parse("/d").unwrap()).unwrap();
        tree.create_file(&Path::parse("/d/f1").unwrap(), sid(1)).unwrap();
        tree.create_file(&Path::parse("/d/f2").unwrap(), sid(2)).unwrap();
        let (removed, deleted) = tree.delete(&Path::parse("/d").unwrap()).unwrap();
        assert!(removed);
        assert_eq!(deleted.file_replicas.len(), 2);
        assert_eq!(tree.is_directory(&Path::parse("/d").unwrap()), None);
    }

    #[test]
    fn create_file_then_delete_then_create_succeeds_both_times() {
        let tree = Tree::new();
        let p = Path::parse("/f").unwrap();
        assert!(tree.create_file(&p, sid(1)).unwrap());
        tree.delete(&p).unwrap();
        assert!(tree.create_file(&p, sid(1)).unwrap());
    }
}
