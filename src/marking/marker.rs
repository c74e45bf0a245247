//! Marker elements and their categories.

use serde::{Deserialize, Serialize};

use crate::domain::analysis::Verdict;
use crate::domain::document::{Document, NodeId};
use crate::resolver::normalize::{char_len, find_case_insensitive};

/// Tag used for marker wrappers
pub const MARK_TAG: &str = "mark";

/// Attribute identifying a marker created by a marking pass
pub const MARK_ATTR: &str = "data-al-mark";

/// Attribute identifying a temporary scroll-to marker
pub const TEMP_ATTR: &str = "data-al-temp";

/// Class carried by a marker while it pulses
pub const ACTIVE_CLASS: &str = "al-hl-active";

/// Keywords shorter than this are never marked
pub const MIN_KEYWORD_CHARS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Topic,
    Pass,
    Warn,
    Fail,
}

impl Category {
    pub fn class_name(&self) -> &'static str {
        match self {
            Category::Topic => "al-hl-keyword",
            Category::Pass => "al-hl-pass",
            Category::Warn => "al-hl-warn",
            Category::Fail => "al-hl-fail",
        }
    }

    /// Category for a style class; unknown classes mark as topics
    pub fn from_class_name(class: &str) -> Self {
        match class {
            "al-hl-pass" => Category::Pass,
            "al-hl-warn" => Category::Warn,
            "al-hl-fail" => Category::Fail,
            _ => Category::Topic,
        }
    }

    pub fn from_verdict(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Pass => Category::Pass,
            Verdict::Warn => Category::Warn,
            Verdict::Fail => Category::Fail,
        }
    }

    /// Badge text shown in the tooltip
    pub fn badge(&self) -> &'static str {
        match self {
            Category::Topic => "주제",
            Category::Pass => "Pass",
            Category::Warn => "Warn",
            Category::Fail => "Fail",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Category::Topic => "keyword",
            Category::Pass => "pass",
            Category::Warn => "warn",
            Category::Fail => "fail",
        }
    }

    /// Category of a marker element, read from its classes
    pub fn of(doc: &Document, marker: NodeId) -> Self {
        [Category::Pass, Category::Warn, Category::Fail]
            .into_iter()
            .find(|c| doc.has_class(marker, c.class_name()))
            .unwrap_or(Category::Topic)
    }
}

pub fn is_marker(doc: &Document, id: NodeId) -> bool {
    doc.attr(id, MARK_ATTR).is_some()
}

pub fn is_temp_marker(doc: &Document, id: NodeId) -> bool {
    doc.attr(id, TEMP_ATTR).is_some()
}

/// Nearest marker at or above `id`
pub fn enclosing_marker(doc: &Document, id: NodeId) -> Option<NodeId> {
    doc.closest(id, |e| e.attrs.contains_key(MARK_ATTR))
}

fn inside_any_marker(doc: &Document, id: NodeId) -> bool {
    doc.closest(id, |e| {
        e.attrs.contains_key(MARK_ATTR) || e.attrs.contains_key(TEMP_ATTR)
    })
    .is_some()
}

/// Every marker under `root` in document order
pub fn markers_under(doc: &Document, root: NodeId) -> Vec<NodeId> {
    doc.elements_under(root)
        .into_iter()
        .filter(|id| is_marker(doc, *id))
        .collect()
}

/// Wrap every case-insensitive occurrence of `keyword` in text under `root`.
///
/// Text already inside a marker or an overlay is left alone. Returns the new
/// markers in document order.
pub fn mark_keyword(
    doc: &mut Document,
    root: NodeId,
    keyword: &str,
    category: Category,
) -> Vec<NodeId> {
    let keyword = keyword.trim();
    let mut marks = Vec::new();
    if char_len(keyword) < MIN_KEYWORD_CHARS {
        return marks;
    }

    for run in doc.text_nodes(root) {
        if !doc.exists(run) || doc.is_overlay(run) || inside_any_marker(doc, run) {
            continue;
        }
        let mut current = Some(run);
        while let Some(node) = current.take() {
            let Some(text) = doc.text(node) else {
                break;
            };
            let Some(&(start, end)) = find_case_insensitive(text, keyword).first() else {
                break;
            };
            let has_tail = end < text.len();
            let Some(mark) = doc.wrap_text_range(node, start, end, MARK_TAG) else {
                break;
            };
            doc.set_attr(mark, MARK_ATTR, category.key());
            doc.add_class(mark, category.class_name());
            marks.push(mark);
            if has_tail {
                current = doc.next_sibling(mark);
            }
        }
    }
    marks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::Viewport;

    fn doc_with(texts: &[&str]) -> Document {
        let mut doc = Document::new(Viewport::default());
        let root = doc.root();
        for t in texts {
            let p = doc.create_element("p");
            let run = doc.create_text(t);
            doc.append_child(p, run);
            doc.append_child(root, p);
        }
        doc
    }

    #[test]
    fn test_marks_every_occurrence() {
        let mut doc = doc_with(&["예산 집행과 예산 편성", "무관한 문단", "Budget 예산"]);
        let root = doc.root();
        let marks = mark_keyword(&mut doc, root, "예산", Category::Warn);
        assert_eq!(marks.len(), 3);
        assert!(marks.iter().all(|m| doc.text_content(*m) == "예산"));
        assert_eq!(Category::of(&doc, marks[0]), Category::Warn);
        assert_eq!(
            doc.text_content(root),
            "예산 집행과 예산 편성무관한 문단Budget 예산"
        );
    }

    #[test]
    fn test_case_insensitive_and_no_double_marking() {
        let mut doc = doc_with(&["Cost reduction plan"]);
        let root = doc.root();
        assert_eq!(mark_keyword(&mut doc, root, "cost", Category::Topic).len(), 1);
        // Already inside a marker
        assert!(mark_keyword(&mut doc, root, "cost", Category::Fail).is_empty());
        assert_eq!(mark_keyword(&mut doc, root, "plan", Category::Pass).len(), 1);
        assert_eq!(markers_under(&doc, root).len(), 2);
    }

    #[test]
    fn test_short_keyword_ignored() {
        let mut doc = doc_with(&["a b c"]);
        let root = doc.root();
        assert!(mark_keyword(&mut doc, root, "a", Category::Topic).is_empty());
    }

    #[test]
    fn test_category_from_class_name() {
        assert_eq!(Category::from_class_name("al-hl-fail"), Category::Fail);
        assert_eq!(Category::from_class_name("whatever"), Category::Topic);
    }
}
