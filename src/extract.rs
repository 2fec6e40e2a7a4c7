//! Tax identifier extraction from receipt PDFs.
//!
//! Receipts carry a line of the form
//! `Unique Identification Number ABCDE1234F`. The identifier is five
//! uppercase letters, four digits, one uppercase letter. Extraction
//! failures collapse to `None` with a log line; a document that cannot
//! be read drops out of the batch without aborting it.

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{error, warn};

/// Label preceding the identifier in receipt text, identifier captured.
static LABELED_TAX_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Unique Identification Number\s+([A-Z]{5}[0-9]{4}[A-Z])").unwrap()
});

/// Shape of an identifier standing on its own.
static TAX_ID_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").unwrap());

/// A 10-character tax identifier: five letters, four digits, one letter.
///
/// The key that routes a document through staging, grouping and
/// archival.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaxId(String);

impl TaxId {
    /// Validate and wrap a candidate identifier.
    pub fn parse(candidate: &str) -> Option<Self> {
        TAX_ID_SHAPE
            .is_match(candidate)
            .then(|| Self(candidate.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Find the first labeled identifier in extracted document text.
pub fn find_tax_id(text: &str) -> Option<TaxId> {
    LABELED_TAX_ID
        .captures(text)
        .map(|caps| TaxId(caps[1].to_string()))
}

/// Extract the identifier from raw PDF bytes.
///
/// Returns `None` for unreadable PDFs and for documents with no labeled
/// identifier; both cases are logged, never propagated.
pub fn tax_id_from_pdf(path: &Path, bytes: &[u8]) -> Option<TaxId> {
    let text = match pdf_extract::extract_text_from_mem(bytes) {
        Ok(text) => text,
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to extract text from PDF");
            return None;
        }
    };

    let tax_id = find_tax_id(&text);
    if tax_id.is_none() {
        warn!(path = %path.display(), "No identification number found in document");
    }
    tax_id
}
