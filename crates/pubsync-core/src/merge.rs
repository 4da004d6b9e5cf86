//! Applies approved candidates to the corpus: field-patching matched
//! records and appending new ones.
//!
//! The one rule that matters here: a curator-authored value is never
//! overwritten. Enhancement fills gaps and replaces placeholders, nothing
//! else.

use tracing::warn;

use crate::classify::{infer_projects, infer_tags};
use crate::config::PipelineConfig;
use crate::model::{
    Candidate, ProposedAction, Publication, AUTHORS_PLACEHOLDER, JOURNAL_PLACEHOLDER,
};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub enhanced: usize,
    pub added: usize,
    /// Enhance candidates whose target record no longer exists.
    pub skipped_missing_target: usize,
}

/// Merge approved candidates into a copy of the corpus. The input corpus is
/// untouched; the caller decides whether to persist the result.
pub fn apply_candidates(
    corpus: &[Publication],
    approved: &[Candidate],
    config: &PipelineConfig,
) -> (Vec<Publication>, MergeReport) {
    let mut merged: Vec<Publication> = corpus.to_vec();
    let mut report = MergeReport::default();

    for candidate in approved {
        match candidate.proposed_action {
            ProposedAction::Enhance => {
                let target = candidate
                    .matched_existing_id
                    .as_deref()
                    .and_then(|id| merged.iter_mut().find(|record| record.id == id));
                match target {
                    Some(record) => {
                        enhance(record, candidate, config);
                        report.enhanced += 1;
                    }
                    None => {
                        warn!(
                            title = %candidate.title,
                            target = candidate.matched_existing_id.as_deref().unwrap_or("<none>"),
                            "enhance target no longer in corpus, skipping"
                        );
                        report.skipped_missing_target += 1;
                    }
                }
            }
            ProposedAction::New => {
                let record = build_new(candidate, &merged, config);
                merged.push(record);
                report.added += 1;
            }
        }
    }

    (merged, report)
}

fn enhance(record: &mut Publication, candidate: &Candidate, config: &PipelineConfig) {
    let authors = candidate.authors.trim();
    if !authors.is_empty()
        && authors != AUTHORS_PLACEHOLDER
        && (record.authors.trim().is_empty() || record.authors == AUTHORS_PLACEHOLDER)
    {
        record.authors = authors.to_string();
    }

    let journal = candidate.journal.trim();
    if !journal.is_empty()
        && journal != JOURNAL_PLACEHOLDER
        && (record.journal.trim().is_empty() || record.journal == JOURNAL_PLACEHOLDER)
    {
        record.journal = journal.to_string();
    }

    fill_if_absent(&mut record.doi, candidate.doi.as_deref());
    fill_if_absent(&mut record.url, candidate.url.as_deref());
    fill_if_absent(&mut record.abstract_text, candidate.abstract_text.as_deref());

    if record.projects.is_empty() {
        record.projects = infer_projects(
            &record.title,
            record.abstract_text.as_deref().unwrap_or(""),
            &config.fallback_project,
        );
    }
    if record.tags.is_empty() {
        record.tags = infer_tags(
            &record.title,
            record.abstract_text.as_deref().unwrap_or(""),
            &config.fallback_tag,
        );
    }
}

fn fill_if_absent(slot: &mut Option<String>, value: Option<&str>) {
    let absent = slot.as_deref().map_or(true, |v| v.trim().is_empty());
    if absent {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            *slot = Some(value.to_string());
        }
    }
}

fn build_new(candidate: &Candidate, corpus: &[Publication], config: &PipelineConfig) -> Publication {
    let abstract_text = candidate
        .abstract_text
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string);

    let authors = if candidate.authors.trim().is_empty() {
        AUTHORS_PLACEHOLDER.to_string()
    } else {
        candidate.authors.trim().to_string()
    };
    let journal = if candidate.journal.trim().is_empty() {
        JOURNAL_PLACEHOLDER.to_string()
    } else {
        candidate.journal.trim().to_string()
    };

    Publication {
        id: unique_id(&candidate.authors, &candidate.year, corpus),
        title: candidate.title.trim().to_string(),
        authors,
        journal,
        year: candidate.year.clone(),
        doi: candidate.doi.clone(),
        url: candidate.url.clone(),
        projects: infer_projects(
            &candidate.title,
            abstract_text.as_deref().unwrap_or(""),
            &config.fallback_project,
        ),
        tags: infer_tags(
            &candidate.title,
            abstract_text.as_deref().unwrap_or(""),
            &config.fallback_tag,
        ),
        abstract_text,
        featured: false,
        image_url: None,
        attention_grabber: None,
    }
}

/// `slug(first author surname)-year`, suffixed `-1`, `-2`, … on collision.
fn unique_id(authors: &str, year: &str, corpus: &[Publication]) -> String {
    let base = format!("{}-{}", slugify(&first_author_surname(authors)), year);
    if !corpus.iter().any(|record| record.id == base) {
        return base;
    }
    let mut n = 1;
    loop {
        let id = format!("{base}-{n}");
        if !corpus.iter().any(|record| record.id == id) {
            return id;
        }
        n += 1;
    }
}

/// First whitespace token of the first comma-separated author, skipping
/// honorific "Dr" tokens. PubMed short form puts the surname first.
fn first_author_surname(authors: &str) -> String {
    let first = authors.split(',').next().unwrap_or_default();
    first
        .split_whitespace()
        .find(|token| {
            let t = token.trim_end_matches('.');
            !t.eq_ignore_ascii_case("dr")
        })
        .unwrap_or("unknown")
        .to_string()
}

fn slugify(text: &str) -> String {
    let slug: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    if slug.is_empty() {
        "unknown".to_string()
    } else {
        slug
    }
}
