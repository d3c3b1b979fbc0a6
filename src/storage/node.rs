//! Local-disk implementation of a storage node, rooted at a directory on the
//! host filesystem (§4.4).

use std::io::SeekFrom;
use std::path::PathBuf;

use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::path::Path;

use super::client::DataStub;
use super::error::StorageError;

/// Bounds the chunk size used by [`StorageNode::copy`], so replicating a file
/// larger than process memory still works.
pub const COPY_CHUNK_BYTES: i64 = 8 * 1024;

pub struct StorageNode {
    root: PathBuf,
}

impl StorageNode {
    pub fn new(root: PathBuf) -> Self {
        StorageNode { root }
    }

    fn local_path(&self, path: &Path) -> PathBuf {
        let mut local = self.root.clone();
        for component in path.components() {
            local.push(component);
        }
        local
    }

    pub async fn size(&self, path: &Path) -> Result<u64, StorageError> {
        let local = self.local_path(path);
        let meta = tokio::fs::metadata(&local).await?;
        if meta.is_dir() {
            return Err(StorageError::NotFound);
        }
        Ok(meta.len())
    }

    /// Reads `length` bytes starting at `offset`. An `offset` beyond the
    /// current end of file is `InvalidArgument`; a request that runs past
    /// the end of file from a valid `offset` is clamped to the bytes
    /// actually available, so `offset == size` returns an empty result
    /// rather than erroring (see `DESIGN.md` for the boundary-case choice).
    pub async fn read(&self, path: &Path, offset: i64, length: i64) -> Result<Vec<u8>, StorageError> {
        if offset < 0 || length < 0 {
            return Err(StorageError::InvalidArgument("offset and length must be non-negative".into()));
        }
        let local = self.local_path(path);
        let mut file = tokio::fs::File::open(&local).await?;
        let meta = file.metadata().await?;
        if meta.is_dir() {
            return Err(StorageError::NotFound);
        }
        let size = meta.len() as i64;
        if offset > size {
            return Err(StorageError::InvalidArgument("offset beyond end of file".into()));
        }
        let available = size - offset;
        let to_read = length.min(available) as usize;
        file.seek(SeekFrom::Start(offset as u64)).await?;
        let mut buf = vec![0u8; to_read];
        file.read_exact(&mut buf).await?;
        Ok(buf)
    }

    /// Writes `data` at `offset`, growing the file if `offset` is past its
    /// current end (the OS sparse-fills the gap with zero bytes).
    pub async fn write(&self, path: &Path, offset: i64, data: &[u8]) -> Result<(), StorageError> {
        if offset < 0 {
            return Err(StorageError::InvalidArgument("offset must be non-negative".into()));
        }
        let local = self.local_path(path);
        let mut file = tokio::fs::OpenOptions::new().write(true).open(&local).await?;
        let meta = file.metadata().await?;
        if meta.is_dir() {
            return Err(StorageError::NotFound);
        }
        file.seek(SeekFrom::Start(offset as u64)).await?;
        file.write_all(data).await?;
        Ok(())
    }

    /// Creates an empty file at `path`, creating intermediate directories as
    /// needed. `false` (not an error) if the file already exists.
    pub async fn create(&self, path: &Path) -> Result<bool, StorageError> {
        if path.is_root() {
            return Err(StorageError::InvalidArgument("cannot create the root".into()));
        }
        let local = self.local_path(path);
        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        match tokio::fs::OpenOptions::new().write(true).create_new(true).open(&local).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes the file or directory (recursively) at `path`. `false` for
    /// the root. Deleting a path this node never created locally is a
    /// silent no-op success, since a directory delete fans out to every
    /// registered storage node regardless of which ones actually host
    /// anything under it.
    pub async fn delete(&self, path: &Path) -> Result<bool, StorageError> {
        if path.is_root() {
            return Ok(false);
        }
        let local = self.local_path(path);
        match tokio::fs::metadata(&local).await {
            Ok(meta) if meta.is_dir() => {
                tokio::fs::remove_dir_all(&local).await?;
                Ok(true)
            }
            Ok(_) => {
                tokio::fs::remove_file(&local).await?;
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e.into()),
        }
    }

    /// Pulls `path` from `source`'s data endpoint in bounded chunks,
    /// overwriting any existing local file.
    pub async fn copy(&self, path: &Path, source: std::net::SocketAddr) -> Result<(), StorageError> {
        let local = self.local_path(path);
        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::OpenOptions::new().write(true).create(true).truncate(true).open(&local).await?;

        let remote = DataStub::new(source);
        let size = remote.size(path).await? as i64;
        let mut offset = 0i64;
        while offset < size {
            let chunk = COPY_CHUNK_BYTES.min(size - offset);
            let data = remote.read(path, offset, chunk).await?;
            self.write(path, offset, &data).await?;
            offset += data.len() as i64;
            if data.is_empty() {
                break;
            }
        }
        Ok(())
    }

    /// Recursively lists every regular file under this node's root, relative
    /// to the root, for reporting to the naming server at registration time.
    pub async fn scan_local_files(&self) -> std::io::Result<Vec<Path>> {
        self.scan_dir(Path::root()).await
    }

    fn scan_dir<'a>(
        &'a self,
        rel: Path,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = std::io::Result<Vec<Path>>> + Send + 'a>> {
        Box::pin(async move {
            let local = self.local_path(&rel);
            let mut out = Vec::new();
            let mut entries = match tokio::fs::read_dir(&local).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
                Err(e) => return Err(e),
            };
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                let child = match rel.join(&name) {
                    Ok(child) => child,
                    Err(err) => {
                        tracing::warn!(%err, %rel, name, "skipping on-disk entry with an invalid path component");
                        continue;
                    }
                };
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    out.extend(self.scan_dir(child).await?);
                } else if file_type.is_file() {
                    out.push(child);
                }
            }
            Ok(out)
        })
    }

    /// Removes now-empty directories from `path`'s parent upward, stopping
    /// at the first non-empty directory or the root. Used after deleting
    /// the files named in a registration's duplicate list.
    pub async fn prune_empty_ancestors(&self, path: &Path) -> std::io::Result<()> {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir.is_root() {
                break;
            }
            let local = self.local_path(&dir);
            let mut entries = match tokio::fs::read_dir(&local).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    current = dir.parent();
                    continue;
                }
                Err(e) => return Err(e),
            };
            if entries.next_entry().await?.is_some() {
                break;
            }
            tokio::fs::remove_dir(&local).await?;
            current = dir.parent();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> (StorageNode, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        (StorageNode::new(dir.path().to_path_buf()), dir)
    }

    #[tokio::test]
    async fn create_then_read_write_round_trip() {
        let (node, _dir) = node();
        let p = Path::parse("/a/f").unwrap();
        assert_eq!(node.create(&p).await.unwrap(), true);
        assert_eq!(node.create(&p).await.unwrap(), false);
        node.write(&p, 0, b"hello").await.unwrap();
        assert_eq!(node.size(&p).await.unwrap(), 5);
        let got = node.read(&p, 0, 5).await.unwrap();
        assert_eq!(got, b"hello");
    }

    #[tokio::test]
    async fn read_at_eof_returns_empty() {
        let (node, _dir) = node();
        let p = Path::parse("/f").unwrap();
        node.create(&p).await.unwrap();
        node.write(&p, 0, b"abc").await.unwrap();
        let got = node.read(&p, 3, 10).await.unwrap();
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn read_past_eof_offset_is_invalid() {
        let (node, _dir) = node();
        let p = Path::parse("/f").unwrap();
        node.create(&p).await.unwrap();
        let err = node.read(&p, 5, 1).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn write_past_end_extends_file() {
        let (node, _dir) = node();
        let p = Path::parse("/f").unwrap();
        node.create(&p).await.unwrap();
        node.write(&p, 0, b"ab").await.unwrap();
        node.write(&p, 2, b"cd").await.unwrap();
        assert_eq!(node.size(&p).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn delete_root_is_false() {
        let (node, _dir) = node();
        assert_eq!(node.delete(&Path::root()).await.unwrap(), false);
    }

    #[tokio::test]
    async fn delete_missing_path_is_a_silent_success() {
        let (node, _dir) = node();
        assert_eq!(node.delete(&Path::parse("/nope").unwrap()).await.unwrap(), true);
    }

    #[tokio::test]
    async fn scan_local_files_finds_nested_files() {
        let (node, _dir) = node();
        node.create(&Path::parse("/a/b/f").unwrap()).await.unwrap();
        node.create(&Path::parse("/g").unwrap()).await.unwrap();
        let mut found = node.scan_local_files().await.unwrap();
        found.sort();
        let mut want = vec![Path::parse("/a/b/f").unwrap(), Path::parse("/g").unwrap()];
        want.sort();
        assert_eq!(found, want);
    }

    #[tokio::test]
    async fn prune_removes_empty_ancestors() {
        let (node, _dir) = node();
        let p = Path::parse("/a/b/f").unwrap();
        node.create(&p).await.unwrap();
        node.delete(&p).await.unwrap();
        node.prune_empty_ancestors(&p).await.unwrap();
        assert!(tokio::fs::metadata(node.local_path(&Path::parse("/a").unwrap())).await.is_err());
    }
}
