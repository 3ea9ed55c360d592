//! Entity extraction: capitalized-run heuristic.
//!
//! A placeholder-grade extractor. Runs of capitalized alphabetic words are
//! collected as candidate entities with a fixed low confidence and an
//! UNKNOWN type; no classification is attempted.

use serde::Serialize;

/// A candidate entity found in text.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExtractedEntity {
    pub text: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub confidence: f32,
}

/// Default entity types callers typically request.
pub const DEFAULT_ENTITY_TYPES: [&str; 4] = ["PERSON", "ORG", "LOCATION", "DATE"];

fn is_capitalized_word(word: &str) -> bool {
    word.chars().next().map_or(false, |c| c.is_uppercase())
        && word.chars().all(|c| c.is_alphabetic())
}

/// Extract candidate entities as maximal runs of capitalized words.
///
/// The first word of a run must be longer than two characters; duplicates
/// are dropped, first occurrence wins.
pub fn extract_entities(content: &str) -> Vec<ExtractedEntity> {
    let words: Vec<&str> = content.split_whitespace().collect();
    let mut entities: Vec<ExtractedEntity> = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    let mut i = 0;
    while i < words.len() {
        let word = words[i];
        if word.len() > 2 && is_capitalized_word(word) {
            let mut entity = word.to_string();
            let mut j = i + 1;
            while j < words.len() && is_capitalized_word(words[j]) {
                entity.push(' ');
                entity.push_str(words[j]);
                j += 1;
            }
            if !seen.contains(&entity) {
                seen.push(entity.clone());
                entities.push(ExtractedEntity {
                    text: entity,
                    entity_type: "UNKNOWN".to_string(),
                    confidence: 0.5,
                });
            }
        }
        i += 1;
    }

    log::info!("Extracted {} potential entities", entities.len());
    entities
}
