//! Free-text request parsing.
//!
//! Resolves a natural-language request into a start node and context
//! filters using regex/keyword matching only. This is deliberately not
//! natural-language understanding; the recognized vocabulary is the demo
//! domain's.

use regex::Regex;

use crate::graph::ContextFilters;

/// Default start node for underwriting requests.
pub const DEFAULT_START_NODE: &str = "Loan Application";

/// Structured reading of a free-text request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedQuery {
    pub loan_type: Option<String>,
    pub location: Option<String>,
    pub property_type: Option<String>,
    pub first_time_buyer: bool,
    pub veteran: bool,
}

impl ParsedQuery {
    /// Context filters usable by the procedure generator.
    pub fn filters(&self) -> ContextFilters {
        let mut filters = ContextFilters::new();
        if let Some(location) = &self.location {
            filters.insert("location", location.clone());
        }
        if let Some(property_type) = &self.property_type {
            filters.insert("property_type", property_type.clone());
        }
        filters
    }
}

/// Parse a request like "Underwrite home loan for a first-time buyer in
/// New Mexico with rural property".
pub fn parse_free_text_query(text: &str) -> ParsedQuery {
    let lower = text.to_lowercase();

    let nm_abbrev = Regex::new(r"\bnm\b").expect("Invalid regex pattern");
    let tx_abbrev = Regex::new(r"\btx\b").expect("Invalid regex pattern");

    let loan_type = if lower.contains("home loan") || lower.contains("mortgage") {
        Some("home_loan".to_string())
    } else {
        None
    };

    let location = if lower.contains("new mexico") || nm_abbrev.is_match(&lower) {
        Some("New Mexico".to_string())
    } else if lower.contains("texas") || tx_abbrev.is_match(&lower) {
        Some("Texas".to_string())
    } else {
        None
    };

    let property_type = if lower.contains("rural") {
        Some("rural".to_string())
    } else if lower.contains("urban") {
        Some("urban".to_string())
    } else {
        None
    };

    let first_time_buyer = lower.contains("first-time") || lower.contains("first time");
    let veteran = lower.contains("veteran") || Regex::new(r"\bva\b").expect("Invalid regex pattern").is_match(&lower);

    ParsedQuery {
        loan_type,
        location,
        property_type,
        first_time_buyer,
        veteran,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_request() {
        let parsed = parse_free_text_query(
            "Underwrite home loan for a first-time buyer in New Mexico with rural property",
        );
        assert_eq!(parsed.loan_type.as_deref(), Some("home_loan"));
        assert_eq!(parsed.location.as_deref(), Some("New Mexico"));
        assert_eq!(parsed.property_type.as_deref(), Some("rural"));
        assert!(parsed.first_time_buyer);
        assert!(!parsed.veteran);
    }

    #[test]
    fn test_parse_abbreviations() {
        let parsed = parse_free_text_query("Mortgage in NM, urban, VA eligible");
        assert_eq!(parsed.location.as_deref(), Some("New Mexico"));
        assert_eq!(parsed.property_type.as_deref(), Some("urban"));
        assert!(parsed.veteran);
    }

    #[test]
    fn test_abbreviation_requires_word_boundary() {
        // "warm" contains "rm" but not the word "nm"
        let parsed = parse_free_text_query("a warm welcome");
        assert!(parsed.location.is_none());
    }

    #[test]
    fn test_parse_texas() {
        let parsed = parse_free_text_query("Home loan Texas urban veteran");
        assert_eq!(parsed.location.as_deref(), Some("Texas"));
        assert!(parsed.veteran);
    }

    #[test]
    fn test_parse_empty() {
        let parsed = parse_free_text_query("hello world");
        assert_eq!(parsed, ParsedQuery::default());
        assert!(parsed.filters().is_empty());
    }

    #[test]
    fn test_filters_mapping() {
        let parsed = parse_free_text_query("home loan new mexico rural");
        let filters = parsed.filters();
        assert_eq!(filters.len(), 2);
        assert!(filters.matches_label("New Mexico"));
        assert!(filters.matches_label("Rural Property"));
    }
}
