//! Staging directory scanner.

use std::collections::BTreeSet;
use std::path::Path;

use tf_core::media::is_input_file;

/// List the allow-listed media files in `staging_dir`.
///
/// Names are deduplicated and sorted so that the assembled batch command is
/// identical across runs over the same directory contents. Symlinks are
/// followed. Directories, dangling links and names that are not valid UTF-8
/// are skipped.
///
/// # Errors
///
/// Returns [`tf_core::Error::Io`] if the directory cannot be read.
pub fn scan_staging(staging_dir: &Path) -> tf_core::Result<Vec<String>> {
    let mut found = BTreeSet::new();

    for entry in std::fs::read_dir(staging_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !is_input_file(&path) || !path.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => {
                found.insert(name);
            }
            Err(name) => {
                tracing::warn!("Skipping staged file with non UTF-8 name: {:?}", name);
            }
        }
    }

    tracing::debug!(
        staging = %staging_dir.display(),
        count = found.len(),
        "Scanned staging directory"
    );
    Ok(found.into_iter().collect())
}
