//! End-to-end batch run: classify → group → dispatch → archive.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::archive;
use crate::classify;
use crate::config::Config;
use crate::dispatch::DispatchEngine;
use crate::error::Result;
use crate::group::RecipientGroups;
use crate::roster::Roster;

/// Counters reported at the end of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Source PDFs considered.
    pub documents_seen: usize,
    /// Documents classified and staged.
    pub documents_classified: usize,
    /// Documents dropped (no identifier, no recipient, or an I/O failure).
    pub documents_dropped: usize,
    /// Recipient groups successfully emailed.
    pub emails_sent: usize,
    /// Recipient groups that exhausted their attempts.
    pub emails_failed: usize,
    /// Staged files moved into the processed tree.
    pub files_archived: usize,
}

/// Execute one batch run against the production SMTP transport.
pub async fn run(config: &Config) -> Result<RunSummary> {
    let engine = DispatchEngine::from_config(config)?;
    run_with_engine(config, &engine).await
}

/// Execute one batch run with the given engine.
///
/// The engine is injected so tests can drive a whole run through a
/// recording mailer.
pub async fn run_with_engine(config: &Config, engine: &DispatchEngine) -> Result<RunSummary> {
    let roster = Arc::new(Roster::from_csv_path(&config.directories.roster_file)?);

    tokio::fs::create_dir_all(&config.directories.staging).await?;
    tokio::fs::create_dir_all(&config.directories.processed).await?;

    let files = pdf_files(&config.directories.source).await?;
    let mut summary = RunSummary {
        documents_seen: files.len(),
        ..Default::default()
    };

    let results = classify::classify_batch(
        files,
        &config.directories.source,
        &config.directories.staging,
        Arc::clone(&roster),
    )
    .await;

    summary.documents_classified = results.iter().filter(|r| r.is_some()).count();
    summary.documents_dropped = summary.documents_seen - summary.documents_classified;

    let groups = RecipientGroups::build(results);
    info!(recipients = groups.recipient_count(), "Dispatching recipient groups");

    for (recipient, attachments) in groups.recipients() {
        if engine.deliver(recipient, attachments).await {
            summary.emails_sent += 1;
            summary.files_archived +=
                archive::archive_group(&config.directories.processed, attachments, &groups).await;
        } else {
            summary.emails_failed += 1;
            warn!(
                recipient = %recipient,
                attachments = attachments.len(),
                "Leaving group in staging for a later re-run"
            );
        }
    }

    info!(
        documents_seen = summary.documents_seen,
        classified = summary.documents_classified,
        dropped = summary.documents_dropped,
        emails_sent = summary.emails_sent,
        emails_failed = summary.emails_failed,
        files_archived = summary.files_archived,
        "Run complete"
    );
    Ok(summary)
}

/// List `.pdf` files (case-insensitive) directly in the source directory.
async fn pdf_files(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if let Some(name) = name.to_str()
            && name.to_ascii_lowercase().ends_with(".pdf")
        {
            files.push(name.to_string());
        }
    }
    Ok(files)
}
