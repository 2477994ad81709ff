//! Diff artifact naming and persistence.
//!
//! Path helpers are pure string transformations; only [`ArtifactWriter`]
//! touches the filesystem.

use crate::result::{SnapshotError, SnapshotResult};
use crate::store::{write_file, SnapshotName};
use regex::Regex;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Suffix of the baseline copy
pub const EXPECTED_SUFFIX: &str = "-expected";
/// Suffix of the captured copy
pub const ACTUAL_SUFFIX: &str = "-actual";
/// Suffix of the rendered diff
pub const DIFF_SUFFIX: &str = "-diff";

fn unsafe_run() -> &'static Regex {
    static UNSAFE_RUN: OnceLock<Regex> = OnceLock::new();
    UNSAFE_RUN.get_or_init(|| {
        Regex::new(r"[\x00-\x2C\x2E-\x2F\x3A-\x40\x5B-\x60\x7B-\x7F]+")
            .expect("static pattern is valid")
    })
}

/// Replace every run of ASCII characters outside `[A-Za-z0-9-]` with a
/// single `-`; non-ASCII characters are kept
#[must_use]
pub fn sanitize_for_file_path(s: &str) -> String {
    unsafe_run().replace_all(s, "-").into_owned()
}

/// Insert `suffix` between a path's file stem and its extension
///
/// `custom_extension` (including its leading dot) replaces the original
/// extension when given. With `sanitize`, the stem is passed through
/// [`sanitize_for_file_path`]; the directory part is kept as is.
#[must_use]
pub fn add_suffix_to_file_path(
    path: &Path,
    suffix: &str,
    custom_extension: Option<&str>,
    sanitize: bool,
) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = match custom_extension {
        Some(ext) => ext.to_string(),
        None => path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default(),
    };
    let stem = if sanitize {
        sanitize_for_file_path(&stem)
    } else {
        stem
    };
    let file_name = format!("{stem}{suffix}{extension}");
    match path.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// The three artifact paths of one snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Copy of the baseline
    pub expected: PathBuf,
    /// Copy of the captured image
    pub actual: PathBuf,
    /// Rendered diff
    pub diff: PathBuf,
}

impl ArtifactPaths {
    /// Derive the artifact paths of an output file
    #[must_use]
    pub fn for_output(output_file: &Path, sanitize: bool) -> Self {
        Self {
            expected: add_suffix_to_file_path(output_file, EXPECTED_SUFFIX, None, sanitize),
            actual: add_suffix_to_file_path(output_file, ACTUAL_SUFFIX, None, sanitize),
            diff: add_suffix_to_file_path(output_file, DIFF_SUFFIX, None, sanitize),
        }
    }

    /// Paths in `expected`, `actual`, `diff` order
    #[must_use]
    pub fn all(&self) -> [&Path; 3] {
        [&self.expected, &self.actual, &self.diff]
    }
}

/// Writes failure artifacts under an output root
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_root: PathBuf,
    sanitize: bool,
}

impl ArtifactWriter {
    /// Create a writer rooted at `output_root`
    #[must_use]
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            sanitize: false,
        }
    }

    /// Sanitize artifact file names
    #[must_use]
    pub const fn with_sanitize(mut self, sanitize: bool) -> Self {
        self.sanitize = sanitize;
        self
    }

    /// Output root
    #[must_use]
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Unsuffixed output path of a snapshot
    #[must_use]
    pub fn output_path(&self, name: &SnapshotName) -> PathBuf {
        self.output_root.join(name.relative_path())
    }

    /// Artifact paths of a snapshot
    #[must_use]
    pub fn paths(&self, name: &SnapshotName) -> ArtifactPaths {
        ArtifactPaths::for_output(&self.output_path(name), self.sanitize)
    }

    /// Remove artifacts left over from an earlier run
    ///
    /// Only the suffixed files are touched; the unsuffixed output path may be
    /// the baseline itself when both roots coincide.
    ///
    /// # Errors
    ///
    /// Returns an I/O error for anything other than a missing file
    pub fn clear(&self, name: &SnapshotName) -> SnapshotResult<()> {
        let paths = self.paths(name);
        for path in paths.all() {
            match fs::remove_file(path) {
                Ok(()) => tracing::debug!(path = %path.display(), "removed stale artifact"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(SnapshotError::io(path, e)),
            }
        }
        Ok(())
    }

    /// Write the expected, actual and diff files of a failed comparison
    ///
    /// # Errors
    ///
    /// Returns the first I/O error encountered
    pub fn write(
        &self,
        name: &SnapshotName,
        expected: &[u8],
        actual: &[u8],
        diff: &[u8],
    ) -> SnapshotResult<ArtifactPaths> {
        let paths = self.paths(name);
        write_file(&paths.expected, expected)?;
        write_file(&paths.actual, actual)?;
        write_file(&paths.diff, diff)?;
        Ok(paths)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    mod paths {
        use super::*;

        #[test]
        fn test_suffix_before_extension() {
            let path = add_suffix_to_file_path(Path::new("out/home/page.png"), "-diff", None, false);
            assert_eq!(path, PathBuf::from("out/home/page-diff.png"));
        }

        #[test]
        fn test_suffix_without_extension() {
            let path = add_suffix_to_file_path(Path::new("out/page"), "-actual", None, false);
            assert_eq!(path, PathBuf::from("out/page-actual"));
        }

        #[test]
        fn test_custom_extension() {
            let path =
                add_suffix_to_file_path(Path::new("out/page.jpeg"), "-diff", Some(".png"), false);
            assert_eq!(path, PathBuf::from("out/page-diff.png"));
        }

        #[test]
        fn test_sanitized_stem() {
            let path =
                add_suffix_to_file_path(Path::new("out/my page (v2).png"), "-diff", None, true);
            assert_eq!(path, PathBuf::from("out/my-page-v2--diff.png"));
        }

        #[test]
        fn test_bare_file_name() {
            let path = add_suffix_to_file_path(Path::new("shot.png"), "-expected", None, false);
            assert_eq!(path, PathBuf::from("shot-expected.png"));
        }

        #[test]
        fn test_sanitize_collapses_runs() {
            assert_eq!(sanitize_for_file_path("a  b//c"), "a-b-c");
            assert_eq!(sanitize_for_file_path("keep-dash_underscore"), "keep-dash-underscore");
            assert_eq!(sanitize_for_file_path("Ünïcode ok"), "Ünïcode-ok");
            assert_eq!(sanitize_for_file_path("plain123"), "plain123");
        }

        #[test]
        fn test_artifact_paths_are_distinct() {
            let paths = ArtifactPaths::for_output(Path::new("o/x.png"), false);
            assert_eq!(paths.expected, PathBuf::from("o/x-expected.png"));
            assert_eq!(paths.actual, PathBuf::from("o/x-actual.png"));
            assert_eq!(paths.diff, PathBuf::from("o/x-diff.png"));
        }
    }

    #[test]
    fn test_write_and_clear() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let name = SnapshotName::new(["suite", "case.png"]);

        let paths = writer.write(&name, b"e", b"a", b"d").unwrap();
        assert_eq!(fs::read(&paths.expected).unwrap(), b"e");
        assert_eq!(fs::read(&paths.actual).unwrap(), b"a");
        assert_eq!(fs::read(&paths.diff).unwrap(), b"d");
        assert!(paths.diff.starts_with(dir.path().join("suite")));

        writer.clear(&name).unwrap();
        assert!(paths.all().iter().all(|p| !p.exists()));
        // clearing twice is fine
        writer.clear(&name).unwrap();
    }

    #[test]
    fn test_clear_leaves_unsuffixed_output() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let name = SnapshotName::from("page.png");
        let output = writer.output_path(&name);
        fs::write(&output, b"baseline").unwrap();
        writer.write(&name, b"e", b"a", b"d").unwrap();

        writer.clear(&name).unwrap();
        assert_eq!(fs::read(&output).unwrap(), b"baseline");
        assert!(writer.paths(&name).all().iter().all(|p| !p.exists()));
    }

    #[test]
    fn test_clear_ignores_output_directory() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let name = SnapshotName::new(["suite", "case"]);
        let output = writer.output_path(&name);
        fs::create_dir_all(output.join("trace")).unwrap();

        writer.clear(&name).unwrap();
        assert!(output.join("trace").is_dir());
    }

    #[test]
    fn test_sanitizing_writer() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path()).with_sanitize(true);
        let paths = writer.paths(&SnapshotName::from("a b.png"));
        assert_eq!(paths.diff, dir.path().join("a-b-diff.png"));
    }
}
