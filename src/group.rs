//! Recipient grouping — one outbound message per email address.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::classify::Classification;
use crate::extract::TaxId;

/// Classified documents bucketed for dispatch and archival.
///
/// `by_email` drives dispatch (one message per key); `by_tax_id` routes
/// archival after a successful send. Paths within a bucket keep
/// classification completion order.
#[derive(Debug, Default)]
pub struct RecipientGroups {
    by_email: HashMap<String, Vec<PathBuf>>,
    by_tax_id: HashMap<TaxId, Vec<PathBuf>>,
}

impl RecipientGroups {
    /// Bucket a batch of classification results, skipping dropped slots.
    pub fn build(results: Vec<Option<Classification>>) -> Self {
        let mut groups = Self::default();
        for classification in results.into_iter().flatten() {
            groups
                .by_email
                .entry(classification.email)
                .or_default()
                .push(classification.stored_path.clone());
            groups
                .by_tax_id
                .entry(classification.tax_id)
                .or_default()
                .push(classification.stored_path);
        }
        groups
    }

    /// Iterate (recipient, attachments) pairs. Iteration order is
    /// unspecified.
    pub fn recipients(&self) -> impl Iterator<Item = (&str, &[PathBuf])> {
        self.by_email
            .iter()
            .map(|(email, paths)| (email.as_str(), paths.as_slice()))
    }

    /// The identifier whose staging bucket holds `path`.
    pub fn owning_tax_id(&self, path: &Path) -> Option<&TaxId> {
        self.by_tax_id
            .iter()
            .find(|(_, paths)| paths.iter().any(|p| p == path))
            .map(|(tax_id, _)| tax_id)
    }

    pub fn recipient_count(&self) -> usize {
        self.by_email.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_email.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classified(tax_id: &str, email: &str, path: &str) -> Option<Classification> {
        Some(Classification {
            tax_id: TaxId::parse(tax_id).unwrap(),
            email: email.to_string(),
            stored_path: PathBuf::from(path),
        })
    }

    #[test]
    fn groups_by_email_and_identifier() {
        let groups = RecipientGroups::build(vec![
            classified("AAAAA1111A", "a@example.org", "/staging/AAAAA1111A/jan.pdf"),
            classified("BBBBB2222B", "b@example.org", "/staging/BBBBB2222B/jan.pdf"),
            classified("AAAAA1111A", "a@example.org", "/staging/AAAAA1111A/feb.pdf"),
        ]);

        assert_eq!(groups.recipient_count(), 2);
        let a_paths: Vec<_> = groups
            .recipients()
            .find(|(email, _)| *email == "a@example.org")
            .map(|(_, paths)| paths.to_vec())
            .unwrap();
        assert_eq!(
            a_paths,
            vec![
                PathBuf::from("/staging/AAAAA1111A/jan.pdf"),
                PathBuf::from("/staging/AAAAA1111A/feb.pdf"),
            ]
        );
    }

    #[test]
    fn dropped_slots_are_skipped() {
        let groups = RecipientGroups::build(vec![
            None,
            classified("AAAAA1111A", "a@example.org", "/staging/AAAAA1111A/jan.pdf"),
            None,
        ]);

        assert_eq!(groups.recipient_count(), 1);
        assert!(!groups.is_empty());
    }

    #[test]
    fn empty_batch_builds_empty_groups() {
        let groups = RecipientGroups::build(vec![None, None]);

        assert_eq!(groups.recipient_count(), 0);
        assert!(groups.is_empty());
    }

    #[test]
    fn same_email_spanning_identifiers_shares_one_message() {
        let groups = RecipientGroups::build(vec![
            classified("AAAAA1111A", "donor@example.org", "/staging/AAAAA1111A/a.pdf"),
            classified("BBBBB2222B", "donor@example.org", "/staging/BBBBB2222B/b.pdf"),
        ]);

        assert_eq!(groups.recipient_count(), 1);
        let (_, paths) = groups.recipients().next().unwrap();
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn owning_tax_id_reverse_lookup() {
        let groups = RecipientGroups::build(vec![
            classified("AAAAA1111A", "a@example.org", "/staging/AAAAA1111A/jan.pdf"),
            classified("BBBBB2222B", "b@example.org", "/staging/BBBBB2222B/jan.pdf"),
        ]);

        let owner = groups
            .owning_tax_id(Path::new("/staging/BBBBB2222B/jan.pdf"))
            .unwrap();
        assert_eq!(owner.as_str(), "BBBBB2222B");
        assert!(groups.owning_tax_id(Path::new("/staging/other.pdf")).is_none());
    }

    #[test]
    fn grouping_is_input_order_independent() {
        let forward = RecipientGroups::build(vec![
            classified("AAAAA1111A", "a@example.org", "/staging/AAAAA1111A/jan.pdf"),
            classified("AAAAA1111A", "a@example.org", "/staging/AAAAA1111A/feb.pdf"),
        ]);
        let reverse = RecipientGroups::build(vec![
            classified("AAAAA1111A", "a@example.org", "/staging/AAAAA1111A/feb.pdf"),
            classified("AAAAA1111A", "a@example.org", "/staging/AAAAA1111A/jan.pdf"),
        ]);

        let collect = |groups: &RecipientGroups| {
            let mut paths: Vec<_> = groups
                .recipients()
                .flat_map(|(_, paths)| paths.iter().cloned())
                .collect();
            paths.sort();
            paths
        };
        assert_eq!(collect(&forward), collect(&reverse));
    }
}
