//! Finding connection targets for a check.
//!
//! Sources are tried strictly in order and never merged: explicit evidence
//! references, then quoted phrases from the detail text, then known section
//! keywords. Within one source, overlapping regions are reduced to the most
//! specific one.

use serde::Serialize;
use tracing::debug;

use crate::domain::document::{Document, NodeId};
use crate::resolver::normalize::{char_len, truncate_label};
use crate::resolver::phrases::{
    extract_highlight_phrase, extract_quoted_phrases, extract_section_keywords,
};
use crate::resolver::{AnchorResolver, ClaimOutcome, ClaimSet, ResolveMode};

use super::palette::{swatch, Swatch};
use super::ConnectionRequest;

/// Class applied to every target region while its session is active
pub const TARGET_HIGHLIGHT_CLASS: &str = "al-conn-highlight-body";

/// Evidence references shorter than this are ignored
pub const MIN_REF_CHARS: usize = 2;

/// Long references that miss are retried with this many leading characters
pub const REF_RETRY_CHARS: usize = 20;

/// Quoted phrases shorter than this are ignored
pub const MIN_QUOTED_CHARS: usize = 3;

/// Target labels are cut to this many characters
pub const LABEL_MAX_CHARS: usize = 15;

/// One endpoint of a connection overlay
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnTarget {
    pub region: NodeId,
    pub label: String,
    pub swatch: Swatch,
    pub highlight_class: &'static str,
}

/// Which source produced the targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSource {
    EvidenceRefs,
    QuotedPhrases,
    SectionKeywords,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Discovery {
    Found {
        source: TargetSource,
        targets: Vec<ConnTarget>,
    },
    /// Nothing to connect; scroll to this phrase instead, if any
    Fallback(Option<String>),
}

/// Accumulates targets for one source under the containment rule
struct Batch {
    claims: ClaimSet,
    targets: Vec<ConnTarget>,
}

impl Batch {
    fn new() -> Self {
        Self {
            claims: ClaimSet::new(),
            targets: Vec::new(),
        }
    }

    fn offer(&mut self, doc: &Document, region: NodeId, label: String, index: usize) {
        match self.claims.offer(doc, region) {
            ClaimOutcome::Skipped => {}
            outcome => {
                if let ClaimOutcome::Replaced(displaced) = outcome {
                    self.targets.retain(|t| !displaced.contains(&t.region));
                }
                self.targets.push(ConnTarget {
                    region,
                    label,
                    swatch: swatch(index),
                    highlight_class: TARGET_HIGHLIGHT_CLASS,
                });
            }
        }
    }
}

fn from_evidence_refs(
    resolver: &AnchorResolver,
    doc: &Document,
    ctx: NodeId,
    refs: &[String],
) -> Vec<ConnTarget> {
    let mut batch = Batch::new();
    for (i, raw) in refs.iter().enumerate() {
        let reference = raw.trim();
        if char_len(reference) < MIN_REF_CHARS {
            continue;
        }
        let found = resolver
            .resolve_excluding(doc, ctx, reference, ResolveMode::Body, &batch.claims)
            .or_else(|| {
                if char_len(reference) <= REF_RETRY_CHARS {
                    return None;
                }
                let head: String = reference.chars().take(REF_RETRY_CHARS).collect();
                resolver.resolve_excluding(doc, ctx, &head, ResolveMode::Body, &batch.claims)
            });
        if let Some(m) = found {
            batch.offer(doc, m.region, truncate_label(reference, LABEL_MAX_CHARS), i);
        }
    }
    batch.targets
}

fn from_quoted_phrases(
    resolver: &AnchorResolver,
    doc: &Document,
    ctx: NodeId,
    detail: &str,
) -> Vec<ConnTarget> {
    let mut batch = Batch::new();
    for (i, phrase) in extract_quoted_phrases(detail).iter().enumerate() {
        if char_len(phrase) < MIN_QUOTED_CHARS {
            continue;
        }
        let found = resolver
            .resolve_excluding(doc, ctx, phrase, ResolveMode::Body, &batch.claims)
            .or_else(|| {
                (ctx != doc.root())
                    .then(|| {
                        resolver.resolve_excluding(
                            doc,
                            doc.root(),
                            phrase,
                            ResolveMode::Body,
                            &batch.claims,
                        )
                    })
                    .flatten()
            });
        if let Some(m) = found {
            batch.offer(doc, m.region, truncate_label(phrase, LABEL_MAX_CHARS), i);
        }
    }
    batch.targets
}

fn from_section_keywords(
    resolver: &AnchorResolver,
    doc: &Document,
    ctx: NodeId,
    detail: &str,
) -> Vec<ConnTarget> {
    let keywords = extract_section_keywords(detail, &resolver.settings().section_names);
    let mut batch = Batch::new();
    for (i, keyword) in keywords.iter().enumerate() {
        let found = resolver
            .resolve_excluding(doc, ctx, keyword, ResolveMode::Section, &batch.claims)
            .or_else(|| {
                (ctx != doc.root())
                    .then(|| {
                        resolver.resolve_excluding(
                            doc,
                            doc.root(),
                            keyword,
                            ResolveMode::Title,
                            &batch.claims,
                        )
                    })
                    .flatten()
            });
        if let Some(m) = found {
            batch.offer(doc, m.region, keyword.clone(), i);
        }
    }
    batch.targets
}

/// Run the discovery cascade for a connection request
pub fn discover_targets(
    resolver: &AnchorResolver,
    doc: &Document,
    request: &ConnectionRequest,
) -> Discovery {
    let ctx = resolver.context_root(doc);

    let sources = [
        TargetSource::EvidenceRefs,
        TargetSource::QuotedPhrases,
        TargetSource::SectionKeywords,
    ];
    for source in sources {
        let targets = match source {
            TargetSource::EvidenceRefs => {
                from_evidence_refs(resolver, doc, ctx, &request.evidence_refs)
            }
            TargetSource::QuotedPhrases => from_quoted_phrases(resolver, doc, ctx, &request.detail),
            TargetSource::SectionKeywords => {
                from_section_keywords(resolver, doc, ctx, &request.detail)
            }
        };
        if !targets.is_empty() {
            debug!(?source, count = targets.len(), item = %request.item, "Connection targets found");
            return Discovery::Found { source, targets };
        }
    }

    debug!(item = %request.item, "No connection targets");
    Discovery::Fallback(extract_highlight_phrase(&request.detail))
}
