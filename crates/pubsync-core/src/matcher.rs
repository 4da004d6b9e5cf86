//! Deduplication: intra-batch collapse by composite key, then cross-corpus
//! classification into new / enhance / dropped.
//!
//! Both passes are pure functions of their inputs, so running them twice on
//! the same batch and corpus yields the same classification.

use std::collections::HashSet;

use crate::model::{Candidate, ProposedAction, Publication};

/// Hard cutoff for the fuzzy title comparison. Anything above is a match
/// regardless of margin; there are no graded actions.
pub const SIMILARITY_THRESHOLD: f64 = 0.85;

/// Longest input considered by the title comparison; longer titles are
/// truncated first to bound cost.
const MAX_COMPARE_CHARS: usize = 1000;

const TITLE_KEY_PREFIX_CHARS: usize = 50;

/// Collapse duplicates within one fetch batch. First seen wins.
pub fn dedup_batch(batch: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for candidate in batch {
        if seen.insert(dedup_key(&candidate)) {
            out.push(candidate);
        }
    }
    out
}

/// Composite dedup key: DOI when available, else the source identifier,
/// else a normalized title prefix.
pub fn dedup_key(candidate: &Candidate) -> String {
    if let Some(doi) = candidate
        .doi
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
    {
        return format!("doi:{}", doi.to_lowercase());
    }
    if !candidate.external_id.trim().is_empty() {
        return format!("pmid:{}", candidate.external_id.trim());
    }
    let normalized = normalize_title(&candidate.title);
    let prefix: String = normalized.chars().take(TITLE_KEY_PREFIX_CHARS).collect();
    format!("title:{prefix}")
}

/// Lowercase, strip non-word/non-space characters, collapse whitespace.
/// Inputs over 1000 characters are truncated before normalization.
pub fn normalize_title(title: &str) -> String {
    let truncated: String = title.chars().take(MAX_COMPARE_CHARS).collect();
    let lowered = truncated.to_lowercase();
    let stripped: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Jaccard similarity over normalized word sets. Identical normalized
/// strings short-circuit to 1.0.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let na = normalize_title(a);
    let nb = normalize_title(b);
    if na.is_empty() || nb.is_empty() {
        return 0.0;
    }
    if na == nb {
        return 1.0;
    }

    let words_a: HashSet<&str> = na.split_whitespace().collect();
    let words_b: HashSet<&str> = nb.split_whitespace().collect();
    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();
    intersection as f64 / union as f64
}

/// Classify each candidate against the canonical corpus. Candidates that
/// match a record with nothing left to contribute are dropped entirely.
pub fn classify(batch: Vec<Candidate>, corpus: &[Publication]) -> Vec<Candidate> {
    batch
        .into_iter()
        .filter_map(|candidate| classify_one(candidate, corpus))
        .collect()
}

fn classify_one(mut candidate: Candidate, corpus: &[Publication]) -> Option<Candidate> {
    match find_match(&candidate, corpus) {
        Some(existing) => {
            if existing.needs_enhancement() {
                candidate.proposed_action = ProposedAction::Enhance;
                candidate.matched_existing_id = Some(existing.id.clone());
                Some(candidate)
            } else {
                None
            }
        }
        None => {
            candidate.proposed_action = ProposedAction::New;
            candidate.matched_existing_id = None;
            Some(candidate)
        }
    }
}

fn find_match<'a>(candidate: &Candidate, corpus: &'a [Publication]) -> Option<&'a Publication> {
    if let Some(doi) = candidate
        .doi
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
    {
        let by_doi = corpus.iter().find(|record| {
            record
                .doi
                .as_deref()
                .is_some_and(|existing| existing.eq_ignore_ascii_case(doi))
        });
        if by_doi.is_some() {
            return by_doi;
        }
    }

    corpus
        .iter()
        .find(|record| title_similarity(&candidate.title, &record.title) > SIMILARITY_THRESHOLD)
}
