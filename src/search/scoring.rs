//! Relevance scoring.
//!
//! For every weighted field and every term that the field value contains:
//!
//! ```text
//! contribution = weight * (match_bonus + length_ratio_weight * term_len / value_len)
//! match_bonus  = exact_match_bonus | prefix_bonus | contains_bonus
//! ```
//!
//! Array fields contribute their best-matching element.

use serde::Serialize;

use crate::config::{FieldWeight, SearchConfig};
use crate::store::{FieldValue, Record};

/// A record and its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRecord {
    pub record: Record,
    pub score: f64,
}

/// Weighted multi-field scorer.
#[derive(Debug, Clone)]
pub struct Scorer {
    fields: Vec<FieldWeight>,
    exact_match_bonus: f64,
    prefix_bonus: f64,
    contains_bonus: f64,
    length_ratio_weight: f64,
}

impl Scorer {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            fields: config.fields.clone(),
            exact_match_bonus: config.exact_match_bonus,
            prefix_bonus: config.prefix_bonus,
            contains_bonus: config.contains_bonus,
            length_ratio_weight: config.length_ratio_weight,
        }
    }

    pub fn fields(&self) -> &[FieldWeight] {
        &self.fields
    }

    /// Unweighted score of one term against one value. Zero if the value
    /// does not contain the term.
    pub fn term_score(&self, term: &str, value: &str) -> f64 {
        let value = value.to_lowercase();
        let bonus = if value == term {
            self.exact_match_bonus
        } else if value.starts_with(term) {
            self.prefix_bonus
        } else if value.contains(term) {
            self.contains_bonus
        } else {
            return 0.0;
        };
        let value_len = value.chars().count().max(1) as f64;
        let term_len = term.chars().count() as f64;
        bonus + self.length_ratio_weight * (term_len / value_len)
    }

    fn field_term_score(&self, field: &FieldWeight, record: &Record, term: &str) -> f64 {
        match record.get(&field.field) {
            Some(FieldValue::Text(text)) if !field.array => self.term_score(term, text),
            Some(FieldValue::List(items)) if field.array => items
                .iter()
                .filter_map(FieldValue::as_text)
                .map(|item| self.term_score(term, item))
                .fold(0.0, f64::max),
            _ => 0.0,
        }
    }

    /// Total score of `record` for lowercase `terms`.
    pub fn score(&self, record: &Record, terms: &[String]) -> f64 {
        self.fields
            .iter()
            .map(|field| {
                let per_field: f64 = terms
                    .iter()
                    .map(|term| self.field_term_score(field, record, term))
                    .sum();
                per_field * field.weight
            })
            .sum()
    }

    /// Score, drop non-matches, sort by descending score (ties by id) and truncate.
    pub fn rank(&self, records: impl IntoIterator<Item = Record>, terms: &[String], limit: usize) -> Vec<ScoredRecord> {
        let mut scored: Vec<ScoredRecord> = records
            .into_iter()
            .map(|record| {
                let score = self.score(&record, terms);
                ScoredRecord { record, score }
            })
            .filter(|s| s.score > 0.0)
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
        scored.truncate(limit);
        scored
    }
}
