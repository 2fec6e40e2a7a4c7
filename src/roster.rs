//! Donor roster — the identifier → recipient lookup table.
//!
//! Loaded once at startup from the CSV export of the donor register and
//! read-only for the rest of the run. Rows keep file order; the first
//! row matching an identifier wins, including when the export carries
//! duplicates.

use std::path::Path;

use tracing::{info, warn};

use crate::error::RosterError;
use crate::extract::TaxId;

/// Column headers of the donor register export.
const TAX_ID_COLUMN: &str = "PAN";
const EMAIL_COLUMN: &str = "eMail ID";

#[derive(Debug, Clone)]
struct RosterEntry {
    tax_id: String,
    email: String,
}

/// Identifier → email lookup table, in file order.
#[derive(Debug, Clone)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    /// Load the roster from a CSV file.
    ///
    /// The file must carry `PAN` and `eMail ID` headers. Rows that fail
    /// to parse are skipped with a warning; the rest still load.
    pub fn from_csv_path(path: &Path) -> Result<Self, RosterError> {
        let read_err = |source| RosterError::Read {
            path: path.display().to_string(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(read_err)?;

        let headers = reader.headers().map_err(read_err)?;
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| RosterError::MissingColumn {
                    path: path.display().to_string(),
                    column: name.to_string(),
                })
        };
        let tax_id_idx = column(TAX_ID_COLUMN)?;
        let email_idx = column(EMAIL_COLUMN)?;

        let mut entries = Vec::new();
        for (index, record) in reader.records().enumerate() {
            // header is line 1, first record line 2
            let line = index + 2;
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    warn!(path = %path.display(), line, error = %e, "Skipping malformed roster row");
                    continue;
                }
            };

            match (record.get(tax_id_idx), record.get(email_idx)) {
                (Some(tax_id), Some(email)) if !tax_id.is_empty() && !email.is_empty() => {
                    entries.push(RosterEntry {
                        tax_id: tax_id.to_string(),
                        email: email.to_string(),
                    });
                }
                _ => {
                    warn!(path = %path.display(), line, "Skipping roster row with empty fields");
                }
            }
        }

        info!(path = %path.display(), entries = entries.len(), "Roster loaded");
        Ok(Self { entries })
    }

    /// Email address for an identifier — first matching row wins.
    pub fn resolve(&self, tax_id: &TaxId) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.tax_id == tax_id.as_str())
            .map(|entry| entry.email.as_str())
    }
}
