//! Filesystem helpers for scenario materialization.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Recursively copies `source` into `destination`, creating it.
///
/// Everything is copied, including `.git`; scenario isolation depends on
/// each working copy carrying its own full clone. Fails fast on the first
/// I/O error.
pub async fn copy_dir(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Result<()> {
    let source = source.into();
    let destination = destination.into();

    tokio::task::spawn_blocking(move || copy_dir_sync(&source, &destination))
        .await
        .map_err(|e| Error::Io(std::io::Error::other(format!("copy task panicked: {}", e))))?
}

fn copy_dir_sync(source: &Path, destination: &Path) -> Result<()> {
    std::fs::create_dir_all(destination)?;

    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let target = destination.join(entry.file_name());
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            copy_dir_sync(&entry.path(), &target)?;
        } else if file_type.is_symlink() {
            #[cfg(unix)]
            {
                let link = std::fs::read_link(entry.path())?;
                std::os::unix::fs::symlink(link, &target)?;
            }
            #[cfg(not(unix))]
            {
                std::fs::copy(entry.path(), &target)?;
            }
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}
