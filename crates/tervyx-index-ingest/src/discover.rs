// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::artifact::ENTRY_FILE;
use crate::IngestError;

/// Every directory under `root` that holds a primary descriptor, sorted.
pub fn find_entry_dirs(root: &Path) -> Result<Vec<PathBuf>, IngestError> {
    if !root.is_dir() {
        return Err(IngestError::MissingRoot(root.to_path_buf()));
    }
    info!(root = %root.display(), "scanning for entries");
    let mut dirs = Vec::new();
    for item in WalkDir::new(root).follow_links(false) {
        let item = item.map_err(|e| IngestError::Io(e.to_string()))?;
        if item.file_type().is_file() && item.file_name() == ENTRY_FILE {
            if let Some(parent) = item.path().parent() {
                debug!(entry_dir = %parent.display(), "found entry");
                dirs.push(parent.to_path_buf());
            }
        }
    }
    dirs.sort();
    info!(entries = dirs.len(), "entry scan complete");
    Ok(dirs)
}
