//! Pulling searchable fragments out of analyzer detail text.
//!
//! Analyzer details are free prose such as
//! `기안번호 '재경팀-2026-0075'가 비정상적` or
//! `목적, 배경, 세부내용이 모두 포함되어 있습니다`. Quoted spans are the most
//! precise references to document content; known section labels are the next
//! best thing.

use std::sync::OnceLock;

use regex::Regex;

use super::normalize::{char_len, collapse_whitespace, strip_whitespace};

fn highlight_quote_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new("['\u{201C}\u{201D}]([^'\u{201C}\u{201D}]{2,20})['\u{201C}\u{201D}]|\u{2018}([^\u{2019}]{2,20})\u{2019}")
            .expect("static pattern")
    })
}

fn quoted_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new("['\"\u{201C}]([^'\"\u{201C}\u{201D}]{2,60})['\"\u{201D}]").expect("static pattern")
    })
}

fn single_curly_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("\u{2018}([^\u{2019}]{2,60})\u{2019}").expect("static pattern"))
}

/// First clause of the detail, up to the first comma or full stop
fn first_clause(detail: &str) -> Option<String> {
    let segment = detail
        .split([',', '。', '.'])
        .next()
        .map(str::trim)
        .unwrap_or_default();
    let len = char_len(segment);
    (2..=30).contains(&len).then(|| segment.to_string())
}

/// One representative phrase for passive highlighting: the first quoted
/// span of 2-20 characters, else the first clause if it is 2-30 characters.
pub fn extract_highlight_phrase(detail: &str) -> Option<String> {
    if detail.is_empty() {
        return None;
    }
    if let Some(caps) = highlight_quote_re().captures(detail) {
        if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
            return Some(m.as_str().to_string());
        }
    }
    first_clause(detail)
}

/// Every quoted span of 2-60 characters, straight quotes first, then
/// single curly quotes
pub fn extract_quoted_phrases(detail: &str) -> Vec<String> {
    let mut phrases: Vec<String> = quoted_re()
        .captures_iter(detail)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .collect();
    phrases.extend(
        single_curly_re()
            .captures_iter(detail)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string()),
    );
    phrases
}

/// Known section labels mentioned in the detail, longest first.
///
/// Labels are compared without whitespace and returned in that compact
/// form; a label already covered by a longer match is skipped.
pub fn extract_section_keywords(detail: &str, section_names: &[String]) -> Vec<String> {
    if detail.is_empty() {
        return Vec::new();
    }
    let collapsed = collapse_whitespace(detail);
    let compact = strip_whitespace(detail);

    let mut names: Vec<&String> = section_names.iter().collect();
    names.sort_by_key(|n| std::cmp::Reverse(char_len(&strip_whitespace(n))));

    let mut found: Vec<String> = Vec::new();
    for name in names {
        let key = strip_whitespace(name);
        if key.is_empty() {
            continue;
        }
        if !collapsed.contains(name.as_str()) && !compact.contains(&key) {
            continue;
        }
        if found.iter().any(|f| f.contains(&key)) {
            continue;
        }
        found.push(key);
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        ["세부추진계획", "추진 경과", "기대효과", "목적", "배경", "효과", "계획"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_highlight_phrase_prefers_quotes() {
        assert_eq!(
            extract_highlight_phrase("본문의 '예산 근거'가 명확하지 않습니다."),
            Some("예산 근거".to_string())
        );
        assert_eq!(
            extract_highlight_phrase("\u{2018}원가 절감\u{2019} 효과가 제시됨"),
            Some("원가 절감".to_string())
        );
    }

    #[test]
    fn test_highlight_phrase_first_clause() {
        assert_eq!(
            extract_highlight_phrase("제목과 본문이 일치함, 추가 검토 불필요"),
            Some("제목과 본문이 일치함".to_string())
        );
        assert_eq!(extract_highlight_phrase("가"), None);
        assert_eq!(extract_highlight_phrase(""), None);
    }

    #[test]
    fn test_quoted_phrases() {
        let detail = "기안번호 '공업사스토어-재경팀-2026-0075'가 비정상적이며 \"결재일\"이 누락";
        assert_eq!(
            extract_quoted_phrases(detail),
            vec!["공업사스토어-재경팀-2026-0075".to_string(), "결재일".to_string()]
        );
        assert!(extract_quoted_phrases("인용 없음").is_empty());
    }

    #[test]
    fn test_section_keywords_longest_first() {
        let detail = "목적, 배경, 기대효과 등이 모두 포함되어 있습니다";
        assert_eq!(
            extract_section_keywords(detail, &names()),
            vec!["기대효과".to_string(), "목적".to_string(), "배경".to_string()]
        );
    }

    #[test]
    fn test_section_keywords_whitespace_tolerant() {
        let detail = "추진경과 설명이 부족하고 세부 추진계획이 없음";
        assert_eq!(
            extract_section_keywords(detail, &names()),
            vec!["세부추진계획".to_string(), "추진경과".to_string()]
        );
    }

    #[test]
    fn test_section_keywords_none() {
        assert!(extract_section_keywords("전반적으로 양호합니다", &names()).is_empty());
    }
}
