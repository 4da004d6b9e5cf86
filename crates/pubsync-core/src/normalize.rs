//! Converts raw PubMed records into candidates, applying the per-member
//! relevance filter.
//!
//! The relevance heuristic is name-based: PubMed author lists rarely carry
//! stable person identifiers, so a record is attributed to a member when
//! some author name contains the member's surname and either their first
//! initial or full first name. This is knowingly imprecise for common
//! surnames; false negatives are preferred over wrong-person attribution,
//! and the behavior is preserved as-is.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::TeamMember;
use crate::model::{Approval, Candidate, CandidateSource, ProposedAction, JOURNAL_PLACEHOLDER};
use crate::sources::PubMedRecord;

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19|20)\d{2}\b").expect("valid regex"));

/// True when the record's author list plausibly includes the member.
pub fn is_relevant(record: &PubMedRecord, member: &TeamMember) -> bool {
    let surname = member.surname.to_lowercase();
    let first_name = member.first_name.to_lowercase();
    let initial: String = first_name.chars().take(1).collect();
    if surname.is_empty() {
        return false;
    }

    record.authors.iter().any(|name| {
        let name = name.to_lowercase();
        name.contains(&surname)
            && (!initial.is_empty() && name.contains(&initial) || name.contains(&first_name))
    })
}

/// Normalize a raw record into a candidate for `member`, or `None` when the
/// relevance filter rejects it.
pub fn normalize(record: &PubMedRecord, member: &TeamMember) -> Option<Candidate> {
    if !is_relevant(record, member) {
        return None;
    }

    let journal = if record.journal.trim().is_empty() {
        JOURNAL_PLACEHOLDER.to_string()
    } else {
        record.journal.trim().to_string()
    };

    Some(Candidate {
        source: CandidateSource::PubMed,
        external_id: record.pmid.clone(),
        title: clean_title(&record.title),
        authors: record.authors.join(", "),
        journal,
        year: year_from_pubdate(&record.pub_date),
        doi: record.doi(),
        url: Some(format!(
            "https://pubmed.ncbi.nlm.nih.gov/{}/",
            record.pmid
        )),
        abstract_text: None,
        found_for: member.display_name(),
        proposed_action: ProposedAction::New,
        matched_existing_id: None,
        approval: Approval::Pending,
        notes: String::new(),
    })
}

fn clean_title(title: &str) -> String {
    let trimmed = title.trim();
    trimmed.strip_suffix('.').unwrap_or(trimmed).to_string()
}

fn year_from_pubdate(pub_date: &str) -> String {
    YEAR_RE
        .find(pub_date)
        .map(|found| found.as_str().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(surname: &str, first_name: &str) -> TeamMember {
        TeamMember {
            surname: surname.to_string(),
            first_name: first_name.to_string(),
            affiliation: None,
        }
    }

    fn record(authors: &[&str]) -> PubMedRecord {
        PubMedRecord {
            pmid: "36000001".to_string(),
            title: "HIV prevention in young adults: a model.".to_string(),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            journal: "The Lancet Public Health".to_string(),
            pub_date: "2023 Mar 14".to_string(),
            article_ids: Vec::new(),
            elocation_id: String::new(),
        }
    }

    #[test]
    fn surname_and_initial_match() {
        assert!(is_relevant(&record(&["Smith J", "Doe A"]), &member("Smith", "Jane")));
    }

    #[test]
    fn surname_without_matching_initial_is_rejected() {
        // "Smith K" carries the surname but neither the initial "j" nor "jane"
        assert!(!is_relevant(&record(&["Smith K"]), &member("Smith", "Jane")));
    }

    #[test]
    fn full_first_name_matches_without_initial_form() {
        assert!(is_relevant(
            &record(&["Jane Smith"]),
            &member("Smith", "Jane")
        ));
    }

    #[test]
    fn wrong_surname_is_rejected() {
        assert!(!is_relevant(&record(&["Jones J"]), &member("Smith", "Jane")));
    }

    #[test]
    fn normalize_builds_candidate_with_pubmed_url_and_year() {
        let candidate = normalize(&record(&["Smith J"]), &member("Smith", "Jane")).unwrap();
        assert_eq!(candidate.title, "HIV prevention in young adults: a model");
        assert_eq!(candidate.year, "2023");
        assert_eq!(candidate.found_for, "Jane Smith");
        assert_eq!(
            candidate.url.as_deref(),
            Some("https://pubmed.ncbi.nlm.nih.gov/36000001/")
        );
        assert_eq!(candidate.approval, Approval::Pending);
    }

    #[test]
    fn empty_journal_becomes_placeholder() {
        let mut raw = record(&["Smith J"]);
        raw.journal = String::new();
        let candidate = normalize(&raw, &member("Smith", "Jane")).unwrap();
        assert_eq!(candidate.journal, JOURNAL_PLACEHOLDER);
    }

    #[test]
    fn unparsable_pubdate_yields_unknown_year() {
        let mut raw = record(&["Smith J"]);
        raw.pub_date = "Spring".to_string();
        let candidate = normalize(&raw, &member("Smith", "Jane")).unwrap();
        assert_eq!(candidate.year, "unknown");
    }
}
