//! Post-send archival — staged documents move to the processed tree.

use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::group::RecipientGroups;

/// Move one sent group's attachments from staging into
/// `{processed}/{tax_id}/`. Returns the number of files moved.
///
/// Move failures are logged per file and skipped. The email has already
/// gone out at this point, so the remaining files still archive.
pub async fn archive_group(
    processed_dir: &Path,
    attachments: &[PathBuf],
    groups: &RecipientGroups,
) -> usize {
    let mut moved = 0;
    for path in attachments {
        let Some(tax_id) = groups.owning_tax_id(path) else {
            error!(path = %path.display(), "No owning identifier for sent attachment; leaving in staging");
            continue;
        };

        let target_dir = processed_dir.join(tax_id.as_str());
        if let Err(e) = tokio::fs::create_dir_all(&target_dir).await {
            error!(path = %target_dir.display(), error = %e, "Failed to create processed directory");
            continue;
        }

        let Some(file_name) = path.file_name() else {
            error!(path = %path.display(), "Sent attachment path has no file name");
            continue;
        };
        let target = target_dir.join(file_name);

        match move_file(path, &target).await {
            Ok(()) => {
                debug!(from = %path.display(), to = %target.display(), "Document archived");
                moved += 1;
            }
            Err(e) => {
                error!(from = %path.display(), to = %target.display(), error = %e, "Failed to archive document");
            }
        }
    }
    moved
}

/// Rename, falling back to copy + delete for cross-device moves.
async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(_) => {
            tokio::fs::copy(from, to).await?;
            tokio::fs::remove_file(from).await
        }
    }
}
