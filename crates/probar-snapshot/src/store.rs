//! Baseline snapshot storage.

use crate::codec::ImageCodec;
use crate::pixel_buffer::PixelBuffer;
use crate::result::{SnapshotError, SnapshotResult};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Logical snapshot name made of one or more path segments
///
/// The last segment carries whatever extension the caller chose; it is used
/// verbatim for both baselines and artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotName {
    segments: Vec<String>,
}

impl SnapshotName {
    /// Create a name from path segments
    #[must_use]
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Path segments
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Segments joined into a relative path
    #[must_use]
    pub fn relative_path(&self) -> PathBuf {
        self.segments.iter().collect()
    }
}

impl From<&str> for SnapshotName {
    fn from(name: &str) -> Self {
        Self::new([name])
    }
}

impl From<String> for SnapshotName {
    fn from(name: String) -> Self {
        Self::new([name])
    }
}

impl From<&[&str]> for SnapshotName {
    fn from(segments: &[&str]) -> Self {
        Self::new(segments.iter().copied())
    }
}

impl From<Vec<String>> for SnapshotName {
    fn from(segments: Vec<String>) -> Self {
        Self { segments }
    }
}

impl fmt::Display for SnapshotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// Read/write access to baseline images under a root directory
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    /// Create a store rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of a snapshot
    #[must_use]
    pub fn path(&self, name: &SnapshotName) -> PathBuf {
        self.root.join(name.relative_path())
    }

    /// Whether a baseline file exists
    #[must_use]
    pub fn exists(&self, name: &SnapshotName) -> bool {
        self.path(name).is_file()
    }

    /// Read the stored bytes of a snapshot
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::NotFound`] if the file is absent, or an I/O error
    pub fn read_bytes(&self, name: &SnapshotName) -> SnapshotResult<Vec<u8>> {
        let path = self.path(name);
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => SnapshotError::NotFound { path: path.clone() },
            _ => SnapshotError::io(&path, e),
        })
    }

    /// Read and decode a snapshot
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::NotFound`] if absent, [`SnapshotError::Decode`]
    /// if the bytes are not an image
    pub fn read(&self, name: &SnapshotName, codec: &dyn ImageCodec) -> SnapshotResult<PixelBuffer> {
        let bytes = self.read_bytes(name)?;
        codec
            .decode(&bytes)
            .map_err(|e| e.with_decode_context(&self.path(name).display().to_string()))
    }

    /// Write raw bytes, creating parent directories and overwriting
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory or file cannot be written
    pub fn write_bytes(&self, name: &SnapshotName, bytes: &[u8]) -> SnapshotResult<PathBuf> {
        let path = self.path(name);
        write_file(&path, bytes)?;
        Ok(path)
    }

    /// Encode and write a pixel buffer
    ///
    /// # Errors
    ///
    /// Returns error if encoding or writing fails
    pub fn write(
        &self,
        name: &SnapshotName,
        buffer: &PixelBuffer,
        codec: &dyn ImageCodec,
    ) -> SnapshotResult<PathBuf> {
        self.write_bytes(name, &codec.encode(buffer)?)
    }
}

/// Write a file, creating its parent directories first
pub(crate) fn write_file(path: &Path, bytes: &[u8]) -> SnapshotResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| SnapshotError::io(parent, e))?;
    }
    fs::write(path, bytes).map_err(|e| SnapshotError::io(path, e))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::codec::PngCodec;
    use tempfile::TempDir;

    #[test]
    fn test_name_joins_segments() {
        let name = SnapshotName::from(&["home", "header.png"][..]);
        assert_eq!(name.relative_path(), PathBuf::from("home").join("header.png"));
        assert_eq!(name.to_string(), "home/header.png");
        assert_eq!(SnapshotName::from("a.png").segments(), &["a.png".to_string()]);
    }

    #[test]
    fn test_missing_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());
        let name = SnapshotName::from("nope.png");
        assert!(!store.exists(&name));
        assert!(matches!(
            store.read(&name, &PngCodec),
            Err(SnapshotError::NotFound { .. })
        ));
    }

    #[test]
    fn test_write_creates_directories_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());
        let name = SnapshotName::new(["deep", "nested", "shot.png"]);

        let first = PixelBuffer::filled(2, 2, [1, 2, 3, 255]);
        let path = store.write(&name, &first, &PngCodec).unwrap();
        assert_eq!(path, dir.path().join("deep/nested/shot.png"));
        assert!(store.exists(&name));
        assert_eq!(store.read(&name, &PngCodec).unwrap(), first);

        let second = PixelBuffer::filled(3, 1, [9, 9, 9, 255]);
        store.write(&name, &second, &PngCodec).unwrap();
        assert_eq!(store.read(&name, &PngCodec).unwrap(), second);
    }

    #[test]
    fn test_corrupt_snapshot_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());
        let name = SnapshotName::from("broken.png");
        store.write_bytes(&name, b"not a png").unwrap();
        let err = store.read(&name, &PngCodec).unwrap_err();
        assert!(matches!(err, SnapshotError::Decode { .. }));
        assert!(err.to_string().contains("broken.png"));
    }

    #[test]
    fn test_directory_is_not_a_snapshot() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("folder.png")).unwrap();
        let store = SnapshotStore::new(dir.path());
        assert!(!store.exists(&SnapshotName::from("folder.png")));
    }
}
