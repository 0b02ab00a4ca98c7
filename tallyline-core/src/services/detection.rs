//! Format detection
//!
//! Scores every registered definition against a file's header row and name.
//! A definition only qualifies when all of its required headers are present;
//! beyond that, matched optional headers and file/wallet affinity add weight.

use std::collections::HashSet;

use serde::Serialize;

use crate::domain::mapping::normalize_header;
use crate::domain::MappingDefinition;

use super::registry::MappingRegistry;

const REQUIRED_HEADER_WEIGHT: u32 = 10;
const OPTIONAL_HEADER_WEIGHT: u32 = 3;
const FILE_NAME_WEIGHT: u32 = 5;
const WALLET_TAG_WEIGHT: u32 = 8;

/// A qualifying definition and its score
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub mapping_id: String,
    pub score: u32,
}

/// Outcome of choosing among candidates. Never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    Unknown,
    /// Several definitions tie at the top score
    Ambiguous(Vec<String>),
    Matched(String),
}

pub struct FormatDetector<'a> {
    registry: &'a MappingRegistry,
    wallet_tag: Option<String>,
}

impl<'a> FormatDetector<'a> {
    pub fn new(registry: &'a MappingRegistry) -> Self {
        Self {
            registry,
            wallet_tag: None,
        }
    }

    /// Wallet service the file was uploaded for
    pub fn with_wallet_tag(mut self, tag: Option<&str>) -> Self {
        self.wallet_tag = tag.map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty());
        self
    }

    /// Qualifying definitions, highest score first. Equal scores keep
    /// registration order.
    pub fn detect(&self, headers: &[String], file_name: &str) -> Vec<Candidate> {
        let observed: HashSet<String> = headers.iter().map(|h| normalize_header(h)).collect();
        let file_name = file_name.to_lowercase();

        let mut candidates: Vec<Candidate> = self
            .registry
            .iter()
            .filter_map(|def| {
                let score = self.score(def, &observed, &file_name);
                (score > 0).then(|| Candidate {
                    mapping_id: def.id.to_string(),
                    score,
                })
            })
            .collect();

        // stable sort
        candidates.sort_by(|a, b| b.score.cmp(&a.score));
        candidates
    }

    fn score(&self, def: &MappingDefinition, observed: &HashSet<String>, file_name: &str) -> u32 {
        if def.required_headers.is_empty() {
            return 0;
        }
        let has = |h: &&str| observed.contains(&normalize_header(h));
        if !def.required_headers.iter().all(has) {
            return 0;
        }

        let required = def.required_headers.len() as u32;
        let optional = def.optional_headers.iter().filter(|h| has(*h)).count() as u32;
        let mut score = REQUIRED_HEADER_WEIGHT * required + OPTIONAL_HEADER_WEIGHT * optional;

        let name_hit = def
            .file_name_hints
            .iter()
            .chain(def.tag.iter())
            .map(|hint| hint.to_lowercase())
            .any(|hint| {
                file_name.contains(&hint) || file_name.contains(&hint.replace('_', ""))
            });
        if name_hit {
            score += FILE_NAME_WEIGHT;
        }

        if let (Some(tag), Some(wallet)) = (def.tag, &self.wallet_tag) {
            if tag == wallet.as_str() {
                score += WALLET_TAG_WEIGHT;
            }
        }

        score
    }
}

/// Pick the winner. A top-score tie is only resolved by an explicitly
/// requested mapping id that is part of the tie.
pub fn select(candidates: &[Candidate], requested: Option<&str>) -> Detection {
    let Some(best) = candidates.first() else {
        return Detection::Unknown;
    };

    let tied: Vec<&Candidate> = candidates.iter().filter(|c| c.score == best.score).collect();
    if tied.len() == 1 {
        return Detection::Matched(best.mapping_id.clone());
    }

    match requested {
        Some(id) if tied.iter().any(|c| c.mapping_id == id) => Detection::Matched(id.to_string()),
        _ => Detection::Ambiguous(tied.iter().map(|c| c.mapping_id.clone()).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> MappingRegistry {
        MappingRegistry::new(vec![
            MappingDefinition {
                required_headers: &["Date", "Amount", "Currency"],
                optional_headers: &["Note"],
                ..MappingDefinition::new("amounts")
            },
            MappingDefinition {
                required_headers: &["Date", "Amount", "Asset"],
                ..MappingDefinition::new("assets")
            },
            MappingDefinition {
                tag: Some("acme"),
                required_headers: &["Date", "Amount", "Asset"],
                ..MappingDefinition::new("acme-assets")
            },
        ])
        .unwrap()
    }

    fn headers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_unique_match() {
        let reg = registry();
        let found = FormatDetector::new(&reg).detect(&headers(&[" date", "AMOUNT", "Currency", "Extra"]), "x.csv");
        assert_eq!(
            found,
            vec![Candidate {
                mapping_id: "amounts".into(),
                score: 30
            }]
        );
        assert_eq!(select(&found, None), Detection::Matched("amounts".into()));
    }

    #[test]
    fn test_optional_headers_add_weight() {
        let reg = registry();
        let found = FormatDetector::new(&reg).detect(&headers(&["Date", "Amount", "Currency", "Note"]), "x.csv");
        assert_eq!(found[0].score, 33);
    }

    #[test]
    fn test_tie_is_ambiguous() {
        let reg = registry();
        let found = FormatDetector::new(&reg).detect(&headers(&["Date", "Amount", "Asset"]), "x.csv");
        assert_eq!(
            select(&found, None),
            Detection::Ambiguous(vec!["assets".into(), "acme-assets".into()])
        );
        assert_eq!(
            select(&found, Some("acme-assets")),
            Detection::Matched("acme-assets".into())
        );
        assert_eq!(
            select(&found, Some("amounts")),
            Detection::Ambiguous(vec!["assets".into(), "acme-assets".into()])
        );
    }

    #[test]
    fn test_affinity_breaks_ties() {
        let reg = registry();
        let cols = headers(&["Date", "Amount", "Asset"]);

        let by_name = FormatDetector::new(&reg).detect(&cols, "ACME_export_2021.csv");
        assert_eq!(select(&by_name, None), Detection::Matched("acme-assets".into()));

        let by_wallet = FormatDetector::new(&reg)
            .with_wallet_tag(Some("acme"))
            .detect(&cols, "export.csv");
        assert_eq!(by_wallet[0].score, 38);
        assert_eq!(select(&by_wallet, None), Detection::Matched("acme-assets".into()));
    }

    #[test]
    fn test_no_match() {
        let reg = registry();
        let found = FormatDetector::new(&reg).detect(&headers(&["Foo", "Bar"]), "x.csv");
        assert!(found.is_empty());
        assert_eq!(select(&found, Some("amounts")), Detection::Unknown);
    }
}
