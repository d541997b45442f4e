//! Remote file descriptors produced by the listing parser.

use std::path::{Component, Path, PathBuf};

use crate::download::DownloadError;

/// One file named in a remote directory listing.
///
/// Immutable once produced. `expected_size` comes from the human-readable
/// size column of the listing and is advisory only: resume decisions always
/// re-query the authoritative size from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// File name as shown in the listing; also the local file name.
    pub name: String,
    /// Absolute URL of the file.
    pub url: String,
    /// Approximate size in bytes parsed from the listing (0 when unknown).
    pub expected_size: u64,
}

impl FileDescriptor {
    /// Creates a descriptor.
    pub fn new(name: impl Into<String>, url: impl Into<String>, expected_size: u64) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            expected_size,
        }
    }

    /// Local path this descriptor is published to inside `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::UnsafeName`] when the name is not a single
    /// plain file name, since joining it would leave `output_dir`.
    pub fn output_path(&self, output_dir: &Path) -> Result<PathBuf, DownloadError> {
        if !is_safe_file_name(&self.name) {
            return Err(DownloadError::unsafe_name(&self.name));
        }
        Ok(output_dir.join(&self.name))
    }
}

/// True when `name` is exactly one normal path component.
///
/// Rejects empty names, `.` and `..`, absolute paths, drive prefixes and any
/// name containing a `/` or `\` separator.
#[must_use]
pub fn is_safe_file_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Sum of the advisory sizes of `files`.
#[must_use]
pub fn total_expected_size(files: &[FileDescriptor]) -> u64 {
    files
        .iter()
        .fold(0u64, |acc, file| acc.saturating_add(file.expected_size))
}
