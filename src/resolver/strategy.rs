//! The individual matching strategies.
//!
//! Each strategy is self-contained: given a search root and a normalized
//! fragment it either produces one [`AnchorMatch`] or nothing. The resolver
//! runs them in a fixed order per mode and stops at the first hit.

use serde::Serialize;

use crate::domain::document::{Document, NodeId};
use crate::domain::selector::Selector;

use super::claims::ClaimSet;
use super::normalize::{char_len, Normalized};
use super::AnchorMatch;

/// Minimum score for a heading-affinity candidate
pub const HEADING_AFFINITY_THRESHOLD: f64 = 0.3;

/// Share of fragment tokens a text run must hold for the fuzzy fallback
pub const TOKEN_OVERLAP_RATIO: f64 = 0.5;

/// Discount applied to token-overlap scores relative to containment
const TOKEN_SCORE_FACTOR: f64 = 0.8;

/// Shortest text run the fuzzy fallback will consider
const MIN_FUZZY_RUN_CHARS: usize = 4;

/// Tags whose text is never a meaningful anchor
const IGNORED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Whitespace-free containment against every element, either direction
    ExactContainment,
    /// Headings and short emphasized labels, by containment or token overlap
    HeadingAffinity,
    /// Short label-like containers holding the keyword; shortest wins
    SectionHeader,
    /// First text run in document order holding the fragment
    TextRunScan,
    /// First text run sharing at least half of the fragment's tokens
    TokenOverlap,
}

/// Compiled selector groups the label strategies search
#[derive(Debug, Clone, Default)]
pub struct SelectorSet {
    pub labels: Vec<Selector>,
    /// Section-header tiers: selector plus maximum text length
    pub section_tiers: Vec<(Selector, usize)>,
}

/// Everything a strategy needs for one attempt
pub struct MatchContext<'a> {
    pub doc: &'a Document,
    pub root: NodeId,
    pub fragment: &'a Normalized,
    pub claims: &'a ClaimSet,
    pub selectors: &'a SelectorSet,
}

impl MatchContext<'_> {
    fn usable(&self, id: NodeId) -> bool {
        !self.doc.is_overlay(id)
            && !self
                .doc
                .tag(id)
                .is_some_and(|t| IGNORED_TAGS.contains(&t))
    }

    fn unclaimed(&self, id: NodeId) -> bool {
        !self.claims.overlaps(self.doc, id)
    }
}

/// Running best candidate: highest score, then shortest text, then most
/// deeply nested
struct Best {
    node: NodeId,
    score: f64,
    len: usize,
}

impl Best {
    fn consider(best: &mut Option<Best>, doc: &Document, node: NodeId, score: f64, len: usize) {
        let better = match best {
            None => true,
            Some(b) => {
                if (score - b.score).abs() > f64::EPSILON {
                    score > b.score
                } else if len != b.len {
                    len < b.len
                } else {
                    doc.contains(b.node, node) && b.node != node
                }
            }
        };
        if better {
            *best = Some(Best { node, score, len });
        }
    }
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::ExactContainment => "exact_containment",
            Strategy::HeadingAffinity => "heading_affinity",
            Strategy::SectionHeader => "section_header",
            Strategy::TextRunScan => "text_run_scan",
            Strategy::TokenOverlap => "token_overlap",
        }
    }

    pub fn try_match(&self, cx: &MatchContext<'_>) -> Option<AnchorMatch> {
        let found = match self {
            Strategy::ExactContainment => exact_containment(cx),
            Strategy::HeadingAffinity => heading_affinity(cx),
            Strategy::SectionHeader => section_header(cx),
            Strategy::TextRunScan => text_run_scan(cx),
            Strategy::TokenOverlap => token_overlap(cx),
        };
        found.map(|(region, score)| AnchorMatch {
            region,
            score,
            strategy: *self,
        })
    }
}

/// Score for two-way containment, or `None` if neither side holds the other.
/// Reverse containment only counts when the region covers at least half of
/// the fragment, so stray short runs cannot match long quotes.
fn containment_score(region: &Normalized, fragment: &Normalized) -> Option<f64> {
    if region.is_empty() || fragment.is_empty() {
        return None;
    }
    let (r, f) = (region.len() as f64, fragment.len() as f64);
    if region.contains(fragment) {
        Some(f / r)
    } else if fragment.contains(region) && region.len() >= 2 && r * 2.0 >= f {
        Some(r / f)
    } else {
        None
    }
}

fn exact_containment(cx: &MatchContext<'_>) -> Option<(NodeId, f64)> {
    let mut best = None;
    for el in cx.doc.elements_under(cx.root) {
        if !cx.usable(el) {
            continue;
        }
        let text = Normalized::new(&cx.doc.text_content(el));
        if let Some(score) = containment_score(&text, cx.fragment) {
            Best::consider(&mut best, cx.doc, el, score, text.len());
        }
    }
    best.map(|b| (b.node, b.score))
}

/// Fragment tokens related by containment to some region token
fn token_overlap_count(fragment_tokens: &[&str], region_tokens: &[&str]) -> usize {
    fragment_tokens
        .iter()
        .filter(|w| region_tokens.iter().any(|ew| ew.contains(**w) || w.contains(*ew)))
        .count()
}

fn heading_affinity(cx: &MatchContext<'_>) -> Option<(NodeId, f64)> {
    let fragment_tokens = cx.fragment.tokens(2);
    let mut best = None;

    for selector in &cx.selectors.labels {
        for el in selector.query_all(cx.doc, cx.root) {
            if !cx.usable(el) || !cx.unclaimed(el) {
                continue;
            }
            let text = Normalized::new(&cx.doc.text_content(el));
            let len = char_len(&text.collapsed);
            if !(2..=200).contains(&len) {
                continue;
            }

            if text.compact.contains(&cx.fragment.compact) || cx.fragment.compact.contains(&text.compact) {
                let (a, b) = (text.len() as f64, cx.fragment.len() as f64);
                Best::consider(&mut best, cx.doc, el, a.min(b) / a.max(b), text.len());
            }

            let region_tokens = text.tokens(2);
            if fragment_tokens.is_empty() || region_tokens.is_empty() {
                continue;
            }
            let overlap = token_overlap_count(&fragment_tokens, &region_tokens);
            if overlap >= 2 || (overlap >= 1 && fragment_tokens.len() <= 2) {
                let ratio = overlap as f64 / fragment_tokens.len() as f64;
                Best::consider(&mut best, cx.doc, el, ratio * TOKEN_SCORE_FACTOR, text.len());
            }
        }
    }

    best.filter(|b| b.score >= HEADING_AFFINITY_THRESHOLD)
        .map(|b| (b.node, b.score))
}

fn section_header(cx: &MatchContext<'_>) -> Option<(NodeId, f64)> {
    let keyword_len = cx.fragment.len();

    for (selector, max_chars) in &cx.selectors.section_tiers {
        let mut best = None;
        for el in selector.query_all(cx.doc, cx.root) {
            if !cx.usable(el) || !cx.unclaimed(el) {
                continue;
            }
            let raw = cx.doc.text_content(el);
            let len = char_len(raw.trim());
            if len > *max_chars || len < keyword_len {
                continue;
            }
            let text = Normalized::new(&raw);
            if !text.compact.contains(&cx.fragment.compact) {
                continue;
            }
            let score = keyword_len as f64 / text.len().max(1) as f64;
            Best::consider(&mut best, cx.doc, el, score, text.len());
        }
        // Shortest container within the first tier that has any match
        if let Some(b) = best {
            return Some((b.node, b.score));
        }
    }
    None
}

fn text_run_scan(cx: &MatchContext<'_>) -> Option<(NodeId, f64)> {
    for run in cx.doc.text_nodes(cx.root) {
        if !cx.usable(run) {
            continue;
        }
        let Some(text) = cx.doc.text(run) else {
            continue;
        };
        let text = Normalized::new(text);
        if let Some(score) = containment_score(&text, cx.fragment) {
            if let Some(parent) = cx.doc.parent(run) {
                return Some((parent, score));
            }
        }
    }
    None
}

fn token_overlap(cx: &MatchContext<'_>) -> Option<(NodeId, f64)> {
    let tokens = cx.fragment.tokens(2);
    if tokens.len() < 2 {
        return None;
    }
    let needed = (tokens.len() as f64 * TOKEN_OVERLAP_RATIO).ceil() as usize;

    for run in cx.doc.text_nodes(cx.root) {
        if !cx.usable(run) {
            continue;
        }
        let Some(text) = cx.doc.text(run) else {
            continue;
        };
        let text = Normalized::new(text);
        if char_len(&text.collapsed) < MIN_FUZZY_RUN_CHARS {
            continue;
        }
        let hits = tokens.iter().filter(|w| text.collapsed.contains(**w)).count();
        if hits >= needed {
            if let Some(parent) = cx.doc.parent(run) {
                return Some((parent, hits as f64 / tokens.len() as f64));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::Viewport;

    fn add(doc: &mut Document, tag: &str, text: &str) -> NodeId {
        let root = doc.root();
        let el = doc.create_element(tag);
        let run = doc.create_text(text);
        doc.append_child(el, run);
        doc.append_child(root, el);
        el
    }

    fn selectors() -> SelectorSet {
        let parse = |s: &str| Selector::parse(s).unwrap();
        SelectorSet {
            labels: ["h1", "h2", "h3", "strong", "th", "td"]
                .into_iter()
                .map(parse)
                .collect(),
            section_tiers: vec![
                (parse("h1, h2, h3, strong, th"), 150),
                (parse("td"), 100),
                (parse("p, div"), 300),
            ],
        }
    }

    fn run(strategy: Strategy, doc: &Document, fragment: &str, claims: &ClaimSet) -> Option<AnchorMatch> {
        let fragment = Normalized::new(fragment);
        let selectors = selectors();
        let cx = MatchContext {
            doc,
            root: doc.root(),
            fragment: &fragment,
            claims,
            selectors: &selectors,
        };
        strategy.try_match(&cx)
    }

    #[test]
    fn test_containment_score_directions() {
        let region = Normalized::new("향후 3년간 약 15% 절감 효과가 예상됩니다");
        let fragment = Normalized::new("향후 3년간 약 15% 절감");
        let score = containment_score(&region, &fragment).unwrap();
        assert!(score > 0.5 && score < 1.0);

        // Short run inside a long quote does not count
        let tiny = Normalized::new("3년");
        assert!(containment_score(&tiny, &fragment).is_none());

        // A run covering most of the quote does
        let most = Normalized::new("3년간 약 15% 절감");
        assert!(containment_score(&most, &fragment).is_some());
    }

    #[test]
    fn test_token_overlap_count() {
        assert_eq!(token_overlap_count(&["예산", "집행", "계획"], &["예산안", "계획"]), 2);
        assert_eq!(token_overlap_count(&["예산"], &["인력"]), 0);
    }

    #[test]
    fn test_heading_affinity_two_shared_tokens() {
        let mut doc = Document::new(Viewport::default());
        let h2 = add(&mut doc, "h2", "예산 집행 현황");
        let claims = ClaimSet::new();

        // 2 of 5 tokens: 0.4 * 0.8 = 0.32
        let found = run(Strategy::HeadingAffinity, &doc, "예산 집행 계획 검토 결과", &claims).unwrap();
        assert_eq!(found.region, h2);
        assert!((found.score - 0.32).abs() < 1e-9);

        // 2 of 6 tokens scores 0.267, under the threshold
        assert!(run(Strategy::HeadingAffinity, &doc, "예산 집행 계획 검토 결과 보고", &claims).is_none());

        // One shared token is not enough for a long fragment
        assert!(run(Strategy::HeadingAffinity, &doc, "예산 편성 계획 검토 결과", &claims).is_none());
    }

    #[test]
    fn test_heading_affinity_single_token_for_short_fragment() {
        let mut doc = Document::new(Viewport::default());
        let h3 = add(&mut doc, "h3", "집행 결과");
        let claims = ClaimSet::new();

        let found = run(Strategy::HeadingAffinity, &doc, "집행 현황", &claims).unwrap();
        assert_eq!(found.region, h3);
        assert!((found.score - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_heading_affinity_containment_threshold() {
        // "류센" only matches by compact containment, never by tokens
        let mut doc = Document::new(Viewport::default());
        add(&mut doc, "h1", "물류 센터 통합 추진 계획");
        let claims = ClaimSet::new();
        // 2 / 10 chars
        assert!(run(Strategy::HeadingAffinity, &doc, "류센", &claims).is_none());

        let h3 = add(&mut doc, "h3", "물류 센터");
        // 2 / 4 chars
        let found = run(Strategy::HeadingAffinity, &doc, "류센", &claims).unwrap();
        assert_eq!(found.region, h3);
        assert!((found.score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_heading_affinity_skips_claimed_regions() {
        let mut doc = Document::new(Viewport::default());
        let h2 = add(&mut doc, "h2", "예산 집행 현황");
        let mut claims = ClaimSet::new();
        claims.offer(&doc, h2);

        assert!(run(Strategy::HeadingAffinity, &doc, "예산 집행 계획 검토 결과", &claims).is_none());
    }

    #[test]
    fn test_section_header_tier_order() {
        let mut doc = Document::new(Viewport::default());
        let para = add(&mut doc, "p", "배경 설명");
        let cell = add(&mut doc, "td", "배경");
        let long_th = add(&mut doc, "th", "사업 배경 및 목적");
        let th = add(&mut doc, "th", "배경");

        // First tier wins over the table cell; shortest within the tier
        let mut claims = ClaimSet::new();
        let found = run(Strategy::SectionHeader, &doc, "배경", &claims).unwrap();
        assert_eq!(found.region, th);
        assert_eq!(found.score, 1.0);

        claims.offer(&doc, th);
        assert_eq!(run(Strategy::SectionHeader, &doc, "배경", &claims).unwrap().region, long_th);

        claims.offer(&doc, long_th);
        assert_eq!(run(Strategy::SectionHeader, &doc, "배경", &claims).unwrap().region, cell);

        claims.offer(&doc, cell);
        assert_eq!(run(Strategy::SectionHeader, &doc, "배경", &claims).unwrap().region, para);
    }

    #[test]
    fn test_section_header_respects_tier_length_cap() {
        let mut doc = Document::new(Viewport::default());
        let long = format!("배경 {}", "가".repeat(120));
        add(&mut doc, "td", &long);
        let para = add(&mut doc, "p", &long);
        let claims = ClaimSet::new();

        // Too long for the td tier, fine for the block tier
        assert_eq!(run(Strategy::SectionHeader, &doc, "배경", &claims).unwrap().region, para);
    }

    #[test]
    fn test_token_overlap_needs_half_the_tokens() {
        let mut doc = Document::new(Viewport::default());
        let p = add(&mut doc, "p", "물류 거점이 분산되어 운송비가 증가함");
        let claims = ClaimSet::new();

        // 2 of 3 tokens; ceil(1.5) = 2
        let found = run(Strategy::TokenOverlap, &doc, "운송비 증가 문제", &claims).unwrap();
        assert_eq!(found.region, p);
        assert!(found.score >= TOKEN_OVERLAP_RATIO);

        // 1 of 3 tokens
        assert!(run(Strategy::TokenOverlap, &doc, "운송비 절감 대책", &claims).is_none());

        // Single-token fragments are left to the exact strategies
        assert!(run(Strategy::TokenOverlap, &doc, "운송비", &claims).is_none());
    }

    #[test]
    fn test_token_overlap_skips_short_runs() {
        let mut doc = Document::new(Viewport::default());
        add(&mut doc, "p", "운송비");
        let later = add(&mut doc, "p", "운송비가 늘었다");
        let claims = ClaimSet::new();

        let found = run(Strategy::TokenOverlap, &doc, "운송비 증가", &claims).unwrap();
        assert_eq!(found.region, later);
    }

    #[test]
    fn test_exact_containment_prefers_tightest_region() {
        let mut doc = Document::new(Viewport::default());
        let p = add(&mut doc, "p", "통합 시 향후 3년간 약 15% 절감 효과가 예상됩니다.");
        let claims = ClaimSet::new();

        let found = run(Strategy::ExactContainment, &doc, "향후 3년간 약 15% 절감", &claims).unwrap();
        assert_eq!(found.region, p);
        assert!(run(Strategy::ExactContainment, &doc, "5년간 절감", &claims).is_none());
    }

    #[test]
    fn test_text_run_scan_returns_first_run_parent() {
        let mut doc = Document::new(Viewport::default());
        let first = add(&mut doc, "p", "예산 근거는 별첨 자료를 참조.");
        add(&mut doc, "p", "예산 근거 재검토");
        let claims = ClaimSet::new();

        let found = run(Strategy::TextRunScan, &doc, "예산 근거", &claims).unwrap();
        assert_eq!(found.region, first);
        assert!(run(Strategy::TextRunScan, &doc, "인력 계획", &claims).is_none());
    }
}
