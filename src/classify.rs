//! Document classification — extract, resolve, stage.
//!
//! Each source PDF is read, its identifier extracted, the recipient
//! resolved from the roster, and the file copied into an
//! identifier-keyed staging directory. Classification failures drop the
//! document from the batch; they never abort the run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::task;
use tracing::{debug, error, info, warn};

use crate::extract::{self, TaxId};
use crate::roster::Roster;

/// A successfully classified document, ready for grouping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Identifier extracted from the document.
    pub tax_id: TaxId,
    /// Recipient resolved from the roster.
    pub email: String,
    /// Where the staged copy of the document lives.
    pub stored_path: PathBuf,
}

/// Number of classification workers: twice the available processing units.
pub fn worker_count() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1) * 2
}

/// Classify one document: extract → resolve → copy into staging.
///
/// Returns `None` when the identifier cannot be extracted, the roster
/// has no matching recipient, or a filesystem step fails. Every failure
/// is logged; none aborts the batch.
pub async fn classify_document(
    file_name: &str,
    source_dir: &Path,
    staging_dir: &Path,
    roster: &Roster,
) -> Option<Classification> {
    let source_path = source_dir.join(file_name);

    let bytes = match tokio::fs::read(&source_path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(path = %source_path.display(), error = %e, "Failed to read document");
            return None;
        }
    };

    // PDF parsing is CPU-bound; keep it off the async workers.
    let parse_path = source_path.clone();
    let parsed = task::spawn_blocking(move || extract::tax_id_from_pdf(&parse_path, &bytes)).await;
    let tax_id = match parsed {
        Ok(tax_id) => tax_id?,
        Err(e) => {
            error!(path = %source_path.display(), error = %e, "Document parsing task failed");
            return None;
        }
    };

    let Some(email) = roster.resolve(&tax_id) else {
        warn!(tax_id = %tax_id, path = %source_path.display(), "No recipient on roster for identifier");
        return None;
    };
    let email = email.to_string();

    let stage_dir = staging_dir.join(tax_id.as_str());
    if let Err(e) = tokio::fs::create_dir_all(&stage_dir).await {
        error!(path = %stage_dir.display(), error = %e, "Failed to create staging directory");
        return None;
    }

    let stored_path = stage_dir.join(file_name);
    if let Err(e) = tokio::fs::copy(&source_path, &stored_path).await {
        error!(from = %source_path.display(), to = %stored_path.display(), error = %e, "Failed to stage document");
        return None;
    }

    debug!(tax_id = %tax_id, email = %email, path = %stored_path.display(), "Document classified");
    Some(Classification {
        tax_id,
        email,
        stored_path,
    })
}

/// Classify a batch of documents on a bounded worker pool.
///
/// The returned vec has one slot per input file, `None` for documents
/// that dropped out. Slot order follows completion order, not input
/// order.
pub async fn classify_batch(
    files: Vec<String>,
    source_dir: &Path,
    staging_dir: &Path,
    roster: Arc<Roster>,
) -> Vec<Option<Classification>> {
    let total = files.len();
    let workers = worker_count();
    info!(documents = total, workers, "Classifying batch");

    let results: Vec<Option<Classification>> = stream::iter(files)
        .map(|file_name| {
            let roster = Arc::clone(&roster);
            let source_dir = source_dir.to_path_buf();
            let staging_dir = staging_dir.to_path_buf();
            async move { classify_document(&file_name, &source_dir, &staging_dir, &roster).await }
        })
        .buffer_unordered(workers)
        .collect()
        .await;

    let classified = results.iter().filter(|r| r.is_some()).count();
    info!(classified, dropped = total - classified, "Batch classification complete");
    results
}
