//! Phrase and keyword lookup tables behind marker tooltips and panels.
//!
//! Tables are keyed by the literal text used for marking, not by a stable
//! check identifier. Two checks sharing a phrase are ambiguous; the first one
//! registered keeps the key and the collision is logged.

use tracing::warn;

use crate::domain::analysis::{CausalChain, CheckInfo};

/// Chains shorter than this carry no causal story and are not registered
pub const MIN_CHAIN_STEPS: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct LookupTables {
    checks: Vec<(String, CheckInfo)>,
    chains: Vec<(String, CausalChain)>,
}

impl LookupTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.checks.clear();
        self.chains.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty() && self.chains.is_empty()
    }

    /// Register the check a marked phrase came from
    pub fn insert_check(&mut self, phrase: &str, info: CheckInfo) {
        if let Some((_, existing)) = self.checks.iter().find(|(p, _)| p == phrase) {
            if existing.item != info.item {
                warn!(
                    phrase,
                    kept = %existing.item,
                    dropped = %info.item,
                    "Phrase shared by two checks; keeping the first"
                );
            }
            return;
        }
        self.checks.push((phrase.to_string(), info));
    }

    /// Register a causal chain under its keyword. Returns false when the
    /// chain is unusable or the keyword is taken.
    pub fn insert_chain(&mut self, chain: CausalChain) -> bool {
        if chain.keyword.trim().is_empty() || chain.chain.len() < MIN_CHAIN_STEPS {
            return false;
        }
        if self.chains.iter().any(|(k, _)| *k == chain.keyword) {
            warn!(keyword = %chain.keyword, "Duplicate chain keyword; keeping the first");
            return false;
        }
        self.chains.push((chain.keyword.clone(), chain));
        true
    }

    /// Check whose phrase contains, or is contained by, the marker text
    pub fn check_for(&self, marker_text: &str) -> Option<(&str, &CheckInfo)> {
        if marker_text.is_empty() {
            return None;
        }
        self.checks
            .iter()
            .find(|(phrase, _)| marker_text.contains(phrase.as_str()) || phrase.contains(marker_text))
            .map(|(phrase, info)| (phrase.as_str(), info))
    }

    /// Chain whose keyword contains, or is contained by, the marker text
    /// (case-insensitive)
    pub fn chain_for(&self, marker_text: &str) -> Option<&CausalChain> {
        let text = marker_text.to_lowercase();
        if text.is_empty() {
            return None;
        }
        self.chains
            .iter()
            .find(|(keyword, _)| {
                let keyword = keyword.to_lowercase();
                text.contains(&keyword) || keyword.contains(&text)
            })
            .map(|(_, chain)| chain)
    }

    pub fn check_count(&self) -> usize {
        self.checks.len()
    }

    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::Impact;

    fn info(item: &str) -> CheckInfo {
        CheckInfo {
            item: item.to_string(),
            result: "WARN".to_string(),
            detail: format!("{} 상세", item),
        }
    }

    fn chain(keyword: &str, steps: &[&str]) -> CausalChain {
        CausalChain {
            keyword: keyword.to_string(),
            chain: steps.iter().map(|s| s.to_string()).collect(),
            kpis: vec![],
            impact: Impact::Medium,
        }
    }

    #[test]
    fn test_first_registered_phrase_wins() {
        let mut tables = LookupTables::new();
        tables.insert_check("예산 근거", info("근거 충실성"));
        tables.insert_check("예산 근거", info("예산 적정성"));
        assert_eq!(tables.check_count(), 1);
        assert_eq!(tables.check_for("예산 근거").unwrap().1.item, "근거 충실성");
    }

    #[test]
    fn test_lookup_both_directions() {
        let mut tables = LookupTables::new();
        tables.insert_check("예산 근거", info("근거 충실성"));
        assert!(tables.check_for("예산").is_some());
        assert!(tables.check_for("예산 근거 부족").is_some());
        assert!(tables.check_for("인력").is_none());
    }

    #[test]
    fn test_chain_rules() {
        let mut tables = LookupTables::new();
        assert!(!tables.insert_chain(chain("원가", &["원가 절감"])));
        assert!(tables.insert_chain(chain("Cost", &["원가 절감", "이익 개선"])));
        assert!(!tables.insert_chain(chain("Cost", &["a", "b"])));
        assert!(tables.chain_for("COST cut").is_some());
        assert!(tables.chain_for("인력").is_none());

        tables.clear();
        assert!(tables.is_empty());
    }
}
