use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use crate::descriptor::DocumentDescriptor;

/// Text files on disk, one per document.
///
/// A file only appears at its target path once it is fully written, content
/// first goes to a sibling `.part` file that is then renamed.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Relative target paths live under the store root.
    pub fn path_of(&self, descriptor: &DocumentDescriptor) -> PathBuf {
        self.root.join(&descriptor.target_path)
    }

    pub fn exists(&self, descriptor: &DocumentDescriptor) -> bool {
        self.path_of(descriptor).is_file()
    }

    pub fn save(&self, descriptor: &DocumentDescriptor, content: &str) -> io::Result<PathBuf> {
        let path = self.path_of(descriptor);
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let part = part_path(&path);
        fs_err::write(&part, content)?;
        fs_err::rename(&part, &path)?;

        Ok(path)
    }
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}
