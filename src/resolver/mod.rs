//! Text-anchor resolution: mapping short analyzer fragments to regions of
//! the live document.
//!
//! Fragments are natural-language quotes, section keywords or topic phrases.
//! Resolution runs a fixed cascade of strategies per [`ResolveMode`], from
//! precise to fuzzy, and stops at the first one that yields a region. A miss
//! is a normal outcome: callers degrade to a best-effort scroll or nothing.
//!
//! # Modes
//!
//! - `Body`: exact containment, section header, text-run scan, token overlap
//! - `Title`: exact containment, heading affinity, text-run scan, token overlap
//! - `Section`: section header first, then the title cascade

pub mod claims;
pub mod normalize;
pub mod phrases;
pub mod strategy;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::document::{Document, NodeId};
use crate::domain::selector::Selector;

pub use claims::{ClaimOutcome, ClaimSet};
pub use normalize::Normalized;
pub use strategy::{MatchContext, SelectorSet, Strategy};

/// Fragments shorter than this (in characters) are rejected outright
pub const MIN_FRAGMENT_CHARS: usize = 2;

/// Kind of search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveMode {
    /// Prefer headings and short labeled nodes
    Title,
    /// Plain body text
    Body,
    /// Section-label keyword: label containers first, then the title cascade
    Section,
}

impl ResolveMode {
    /// Strategies tried, in order
    pub fn pipeline(&self) -> &'static [Strategy] {
        match self {
            ResolveMode::Body => &[
                Strategy::ExactContainment,
                Strategy::SectionHeader,
                Strategy::TextRunScan,
                Strategy::TokenOverlap,
            ],
            ResolveMode::Title => &[
                Strategy::ExactContainment,
                Strategy::HeadingAffinity,
                Strategy::TextRunScan,
                Strategy::TokenOverlap,
            ],
            ResolveMode::Section => &[
                Strategy::SectionHeader,
                Strategy::ExactContainment,
                Strategy::HeadingAffinity,
                Strategy::TextRunScan,
                Strategy::TokenOverlap,
            ],
        }
    }
}

/// A resolved region
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnchorMatch {
    pub region: NodeId,
    /// Higher is better; comparable only within one strategy
    pub score: f64,
    pub strategy: Strategy,
}

/// A section-header tier: candidates matching `selector` with at most `max_chars` of text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionTier {
    pub selector: String,
    pub max_chars: usize,
}

/// Vocabulary the resolver searches with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Selectors for the main document container, most specific first
    pub context_selectors: Vec<String>,
    /// Heading-like selectors used by heading affinity
    pub label_selectors: Vec<String>,
    /// Section-header tiers, searched in order
    pub section_tiers: Vec<SectionTier>,
    /// Known section labels looked for in analyzer details
    pub section_names: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            context_selectors: strings(&[
                ".document-body",
                ".doc-content",
                ".view-content",
                "#docBody",
                "#contents",
                ".approval-content",
                ".doc_contents",
                ".editor-content",
                ".doc-view",
                "#divFormBind",
                ".div_form_bind",
                "[data-role=\"doc-body\"]",
                ".doc-body",
                "article",
                "main",
                ".content-wrap",
            ]),
            label_selectors: strings(&[
                "h1",
                "h2",
                "h3",
                "h4",
                ".doc-title",
                ".subject",
                "[class*=\"title\"]",
                "[class*=\"subject\"]",
                "strong",
                "b",
                "th",
                "td",
            ]),
            section_tiers: vec![
                SectionTier {
                    selector: "h1, h2, h3, h4, h5, h6, strong, b, th, dt, label, em".to_string(),
                    max_chars: 150,
                },
                SectionTier {
                    selector: "td".to_string(),
                    max_chars: 100,
                },
                SectionTier {
                    selector: "p, div, span, li, a".to_string(),
                    max_chars: 300,
                },
            ],
            section_names: strings(&[
                "세부추진계획",
                "추진일정",
                "소요예산",
                "추진경과",
                "추진 경과",
                "향후계획",
                "향후 계획",
                "기대효과",
                "세부내용",
                "기안내용",
                "기안 내용",
                "추진방안",
                "추진 방안",
                "필요성",
                "문제점",
                "목적",
                "배경",
                "현황",
                "효과",
                "근거",
                "결론",
                "비용",
                "일정",
                "방안",
                "대안",
                "개요",
                "내용",
                "취지",
                "경과",
                "성과",
                "계획",
                "대상",
                "범위",
                "방법",
            ]),
        }
    }
}

/// Compile selectors, dropping (and logging) any that fail to parse
fn compile(sources: &[String]) -> Vec<Selector> {
    sources
        .iter()
        .filter_map(|s| match Selector::parse(s) {
            Ok(sel) => Some(sel),
            Err(e) => {
                warn!(selector = %s, error = %e, "Skipping unusable selector");
                None
            }
        })
        .collect()
}

/// The strategy cascade plus its compiled vocabulary
#[derive(Debug, Clone)]
pub struct AnchorResolver {
    settings: ResolverSettings,
    selectors: SelectorSet,
    context: Vec<Selector>,
}

impl Default for AnchorResolver {
    fn default() -> Self {
        Self::new(ResolverSettings::default())
    }
}

impl AnchorResolver {
    pub fn new(settings: ResolverSettings) -> Self {
        let labels = compile(&settings.label_selectors);
        let section_tiers = settings
            .section_tiers
            .iter()
            .filter_map(|tier| match Selector::parse(&tier.selector) {
                Ok(sel) => Some((sel, tier.max_chars)),
                Err(e) => {
                    warn!(selector = %tier.selector, error = %e, "Skipping unusable section tier");
                    None
                }
            })
            .collect();
        let context = compile(&settings.context_selectors);
        Self {
            settings,
            selectors: SelectorSet {
                labels,
                section_tiers,
            },
            context,
        }
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// The main document container: first context selector with a match,
    /// else the document root
    pub fn context_root(&self, doc: &Document) -> NodeId {
        self.context
            .iter()
            .find_map(|sel| sel.query(doc, doc.root()).filter(|id| !doc.is_overlay(*id)))
            .unwrap_or_else(|| doc.root())
    }

    /// Resolve a fragment to the single best region under `root`
    pub fn resolve(
        &self,
        doc: &Document,
        root: NodeId,
        fragment: &str,
        mode: ResolveMode,
    ) -> Option<AnchorMatch> {
        self.resolve_excluding(doc, root, fragment, mode, &ClaimSet::new())
    }

    /// Resolve, keeping label strategies away from regions already claimed
    /// earlier in the same batch
    pub fn resolve_excluding(
        &self,
        doc: &Document,
        root: NodeId,
        fragment: &str,
        mode: ResolveMode,
        claims: &ClaimSet,
    ) -> Option<AnchorMatch> {
        let trimmed = fragment.trim();
        if normalize::char_len(trimmed) < MIN_FRAGMENT_CHARS || !doc.exists(root) {
            return None;
        }
        let normalized = Normalized::new(trimmed);
        let cx = MatchContext {
            doc,
            root,
            fragment: &normalized,
            claims,
            selectors: &self.selectors,
        };

        for strategy in mode.pipeline() {
            if let Some(found) = strategy.try_match(&cx) {
                debug!(
                    fragment = %trimmed,
                    strategy = strategy.name(),
                    score = found.score,
                    "Fragment resolved"
                );
                return Some(found);
            }
        }

        debug!(fragment = %trimmed, ?mode, "Fragment unresolved");
        None
    }
}
