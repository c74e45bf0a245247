//! Text normalization used by every matching strategy.
//!
//! Matching is case-insensitive and tolerant of whitespace differences:
//! documents often break a label like "추진 경과" across runs or pad it with
//! layout spaces, so most comparisons use the whitespace-stripped form.

/// Collapse runs of whitespace to a single space and trim
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove all whitespace
pub fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Length in characters (not bytes)
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Truncate to `max` characters, appending an ellipsis when cut
pub fn truncate_label(text: &str, max: usize) -> String {
    if char_len(text) > max {
        let head: String = text.chars().take(max).collect();
        format!("{}…", head)
    } else {
        text.to_string()
    }
}

/// A fragment or region text in the forms the strategies compare
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    /// Trimmed, lowercased, whitespace collapsed
    pub collapsed: String,
    /// Lowercased with all whitespace removed
    pub compact: String,
}

impl Normalized {
    pub fn new(text: &str) -> Self {
        let lower = text.to_lowercase();
        Self {
            collapsed: collapse_whitespace(&lower),
            compact: strip_whitespace(&lower),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.compact.is_empty()
    }

    /// Character count of the compact form
    pub fn len(&self) -> usize {
        char_len(&self.compact)
    }

    /// Whitespace-tolerant containment of `other` in `self`
    pub fn contains(&self, other: &Normalized) -> bool {
        !other.is_empty()
            && (self.collapsed.contains(&other.collapsed) || self.compact.contains(&other.compact))
    }

    /// Word tokens of at least `min_chars` characters
    pub fn tokens(&self, min_chars: usize) -> Vec<&str> {
        self.collapsed
            .split(' ')
            .filter(|w| char_len(w) >= min_chars)
            .collect()
    }
}

/// Find all case-insensitive occurrences of `needle` in `haystack`,
/// returning byte ranges into `haystack`. Matches do not overlap.
pub fn find_case_insensitive(haystack: &str, needle: &str) -> Vec<(usize, usize)> {
    let needle: Vec<char> = needle.chars().flat_map(char::to_lowercase).collect();
    if needle.is_empty() {
        return Vec::new();
    }

    // Lowercase per source char so that offsets map back to the original
    let chars: Vec<(usize, Vec<char>)> = haystack
        .char_indices()
        .map(|(i, c)| (i, c.to_lowercase().collect()))
        .collect();

    let mut out = Vec::new();
    let mut start = 0;
    'outer: while start < chars.len() {
        let mut matched = 0;
        let mut idx = start;
        while matched < needle.len() {
            let Some((_, lowered)) = chars.get(idx) else {
                break 'outer;
            };
            if needle.len() - matched < lowered.len()
                || lowered[..] != needle[matched..matched + lowered.len()]
            {
                start += 1;
                continue 'outer;
            }
            matched += lowered.len();
            idx += 1;
        }
        let begin = chars[start].0;
        let end = chars.get(idx).map(|(i, _)| *i).unwrap_or(haystack.len());
        out.push((begin, end));
        start = idx;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_forms() {
        let n = Normalized::new("  추진   경과 Report ");
        assert_eq!(n.collapsed, "추진 경과 report");
        assert_eq!(n.compact, "추진경과report");
        assert_eq!(n.len(), 10);
    }

    #[test]
    fn test_whitespace_tolerant_containment() {
        let region = Normalized::new("1. 추진경과 및 향후계획");
        assert!(region.contains(&Normalized::new("추진 경과")));
        assert!(!region.contains(&Normalized::new("")));
    }

    #[test]
    fn test_find_case_insensitive_offsets() {
        let text = "Cost cut: COST down, 비용 절감";
        let hits = find_case_insensitive(text, "cost");
        assert_eq!(hits, vec![(0, 4), (10, 14)]);

        let hits = find_case_insensitive(text, "비용");
        assert_eq!(hits.len(), 1);
        let (s, e) = hits[0];
        assert_eq!(&text[s..e], "비용");
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("짧은 문구", 15), "짧은 문구");
        assert_eq!(truncate_label("abcdefghijklmnopq", 15), "abcdefghijklmno…");
    }
}
