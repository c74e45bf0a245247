//! Claimed regions within one resolution batch.
//!
//! A batch (e.g. all evidence refs of one check) must not produce nested or
//! duplicate targets. When two matches overlap by containment the more
//! specific (descendant) one survives.

use crate::domain::document::{Document, NodeId};

/// What happened to a region offered to a [`ClaimSet`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Claimed; nothing displaced
    Accepted,
    /// Claimed; these broader regions were released
    Replaced(Vec<NodeId>),
    /// Already claimed, or an ancestor of a claimed region
    Skipped,
}

#[derive(Debug, Clone, Default)]
pub struct ClaimSet {
    claimed: Vec<NodeId>,
}

impl ClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a region, applying the containment rule
    pub fn offer(&mut self, doc: &Document, region: NodeId) -> ClaimOutcome {
        if self
            .claimed
            .iter()
            .any(|c| *c == region || doc.contains(region, *c))
        {
            return ClaimOutcome::Skipped;
        }

        let displaced: Vec<NodeId> = self
            .claimed
            .iter()
            .copied()
            .filter(|c| doc.contains(*c, region))
            .collect();
        self.claimed.retain(|c| !displaced.contains(c));
        self.claimed.push(region);

        if displaced.is_empty() {
            ClaimOutcome::Accepted
        } else {
            ClaimOutcome::Replaced(displaced)
        }
    }

    /// Whether `region` overlaps any claim by containment either way
    pub fn overlaps(&self, doc: &Document, region: NodeId) -> bool {
        self.claimed
            .iter()
            .any(|c| doc.contains(*c, region) || doc.contains(region, *c))
    }

    pub fn claimed(&self) -> &[NodeId] {
        &self.claimed
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::Viewport;

    fn nested() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new(Viewport::default());
        let section = doc.create_element("div");
        let para = doc.create_element("p");
        let other = doc.create_element("p");
        let root = doc.root();
        doc.append_child(root, section);
        doc.append_child(section, para);
        doc.append_child(root, other);
        (doc, section, para, other)
    }

    #[test]
    fn test_ancestor_after_descendant_is_skipped() {
        let (doc, section, para, _) = nested();
        let mut claims = ClaimSet::new();
        assert_eq!(claims.offer(&doc, para), ClaimOutcome::Accepted);
        assert_eq!(claims.offer(&doc, section), ClaimOutcome::Skipped);
        assert_eq!(claims.claimed(), &[para]);
    }

    #[test]
    fn test_descendant_after_ancestor_replaces() {
        let (doc, section, para, other) = nested();
        let mut claims = ClaimSet::new();
        claims.offer(&doc, section);
        claims.offer(&doc, other);
        assert_eq!(claims.offer(&doc, para), ClaimOutcome::Replaced(vec![section]));
        assert_eq!(claims.claimed(), &[other, para]);
    }

    #[test]
    fn test_duplicate_is_skipped() {
        let (doc, _, para, _) = nested();
        let mut claims = ClaimSet::new();
        claims.offer(&doc, para);
        assert_eq!(claims.offer(&doc, para), ClaimOutcome::Skipped);
        assert!(claims.overlaps(&doc, doc.root()));
    }
}
