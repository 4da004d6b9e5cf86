//! The two operator-facing phases: `fetch` (search → normalize → match →
//! review file) and `apply` (review file → merge → backup → corpus
//! rewrite).
//!
//! Everything is sequential and single-process. A failed search term is
//! reported and skipped; structural problems with the review file, corpus,
//! or backup abort before the corpus is touched.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{Datelike, Utc};
use tracing::{info, warn};

use crate::codec::{parse_corpus, serialize_corpus};
use crate::config::{PipelineConfig, TeamMember};
use crate::error::{Result, SyncError};
use crate::matcher::{classify, dedup_batch};
use crate::merge::apply_candidates;
use crate::model::{Candidate, ProposedAction, Publication};
use crate::normalize::normalize;
use crate::review::ReviewFile;
use crate::sources::PubMedClient;

#[derive(Debug)]
pub struct FetchSummary {
    /// Relevant records found across all members, before dedup.
    pub found: usize,
    pub new: usize,
    pub enhance: usize,
    pub errors: Vec<String>,
    pub review_path: PathBuf,
}

#[derive(Debug)]
pub struct ApplySummary {
    pub approved: usize,
    pub rejected: usize,
    pub pending: usize,
    pub enhanced: usize,
    pub added: usize,
    pub skipped_missing_target: usize,
    pub corpus_path: PathBuf,
    pub backup_path: PathBuf,
}

pub async fn run_fetch(config: &PipelineConfig) -> Result<FetchSummary> {
    let client = PubMedClient::new(Duration::from_millis(config.request_delay_ms));
    run_fetch_with_client(config, &client).await
}

pub(crate) async fn run_fetch_with_client(
    config: &PipelineConfig,
    client: &PubMedClient,
) -> Result<FetchSummary> {
    let corpus = read_corpus(config)?;

    let to_year = Utc::now().year();
    let from_year = to_year - config.lookback_years as i32;

    let mut candidates: Vec<Candidate> = Vec::new();
    let mut errors = Vec::new();

    for member in &config.members {
        let term = build_search_term(member);
        match fetch_member(client, member, &term, from_year, to_year, config).await {
            Ok(mut found) => {
                info!(member = %member.display_name(), count = found.len(), "fetched candidates");
                candidates.append(&mut found);
            }
            Err(e) => {
                warn!(member = %member.display_name(), error = %e, "fetch failed, continuing");
                errors.push(format!("{}: {e}", member.display_name()));
            }
        }
    }

    let found = candidates.len();
    let classified = classify(dedup_batch(candidates), &corpus);
    let new = classified
        .iter()
        .filter(|c| c.proposed_action == ProposedAction::New)
        .count();
    let enhance = classified.len() - new;

    let review = ReviewFile::new(classified, errors.clone());
    review.write(&config.review_path)?;

    Ok(FetchSummary {
        found,
        new,
        enhance,
        errors,
        review_path: config.review_path.clone(),
    })
}

async fn fetch_member(
    client: &PubMedClient,
    member: &TeamMember,
    term: &str,
    from_year: i32,
    to_year: i32,
    config: &PipelineConfig,
) -> Result<Vec<Candidate>> {
    let ids = client
        .search(term, from_year, to_year, config.max_results_per_query)
        .await?;
    let records = client.fetch_details(&ids).await?;
    Ok(records
        .iter()
        .filter_map(|record| normalize(record, member))
        .collect())
}

/// PubMed query for one member: `Surname I[Author]`, restricted by
/// affiliation when configured.
fn build_search_term(member: &TeamMember) -> String {
    let initial: String = member
        .first_name
        .chars()
        .take(1)
        .flat_map(char::to_uppercase)
        .collect();
    let base = format!("{} {initial}[Author]", member.surname);
    match member.affiliation.as_deref().filter(|a| !a.is_empty()) {
        Some(affiliation) => format!("({base}) AND ({affiliation}[Affiliation])"),
        None => base,
    }
}

pub fn run_apply(config: &PipelineConfig) -> Result<ApplySummary> {
    let review = ReviewFile::read(&config.review_path)?;
    let partition = review.partition();
    if partition.pending > 0 {
        warn!(
            count = partition.pending,
            "pending candidates left undecided, excluding them"
        );
    }

    let corpus = read_corpus(config)?;
    let approved = partition.approved.len();
    let (merged, report) = apply_candidates(&corpus, &partition.approved, config);

    let backup_path = config.backup_path();
    fs::copy(&config.corpus_path, &backup_path)
        .map_err(|e| SyncError::Backup(backup_path.clone(), e))?;

    let module = serialize_corpus(&merged);
    fs::write(&config.corpus_path, module).map_err(|source| SyncError::Io {
        action: "write corpus",
        path: config.corpus_path.clone(),
        source,
    })?;

    Ok(ApplySummary {
        approved,
        rejected: partition.rejected,
        pending: partition.pending,
        enhanced: report.enhanced,
        added: report.added,
        skipped_missing_target: report.skipped_missing_target,
        corpus_path: config.corpus_path.clone(),
        backup_path,
    })
}

fn read_corpus(config: &PipelineConfig) -> Result<Vec<Publication>> {
    let text = fs::read_to_string(&config.corpus_path).map_err(|source| SyncError::Io {
        action: "read corpus",
        path: config.corpus_path.clone(),
        source,
    })?;
    parse_corpus(&text)
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use serde_json::json;

    use super::*;
    use crate::model::{Approval, CandidateSource};
    use crate::sources::PubMedClient;

    fn member(surname: &str, first_name: &str, affiliation: Option<&str>) -> TeamMember {
        TeamMember {
            surname: surname.to_string(),
            first_name: first_name.to_string(),
            affiliation: affiliation.map(str::to_string),
        }
    }

    fn seed_corpus(dir: &std::path::Path, records: &[Publication]) -> PathBuf {
        let path = dir.join("publications.js");
        fs::write(&path, serialize_corpus(records)).unwrap();
        path
    }

    fn publication(id: &str, title: &str) -> Publication {
        Publication {
            id: id.to_string(),
            title: title.to_string(),
            authors: "Smith J".to_string(),
            journal: "The Lancet".to_string(),
            year: "2020".to_string(),
            doi: Some("10.1000/existing".to_string()),
            url: None,
            abstract_text: Some("Background.".to_string()),
            projects: vec!["hiv-prevention".to_string()],
            tags: vec!["HIV".to_string()],
            featured: false,
            image_url: None,
            attention_grabber: None,
        }
    }

    #[test]
    fn search_term_includes_initial_and_affiliation() {
        assert_eq!(
            build_search_term(&member("Smith", "jane", None)),
            "Smith J[Author]"
        );
        assert_eq!(
            build_search_term(&member("Doe", "Alex", Some("University of Cape Town"))),
            "(Doe A[Author]) AND (University of Cape Town[Affiliation])"
        );
    }

    #[tokio::test]
    async fn fetch_writes_review_file_with_relevant_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let corpus_path = seed_corpus(dir.path(), &[]);

        let mut server = Server::new_async().await;
        let _search = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_body(
                json!({"esearchresult": {"count": "2", "idlist": ["1", "2"]}}).to_string(),
            )
            .create_async()
            .await;
        let _summary = server
            .mock("GET", "/esummary.fcgi")
            .match_query(Matcher::Any)
            .with_body(
                json!({"result": {
                    "uids": ["1", "2"],
                    "1": {
                        "title": "PrEP uptake among young women.",
                        "source": "Lancet HIV",
                        "pubdate": "2024 Jan",
                        "authors": [{"name": "Smith J"}],
                        "articleids": [{"idtype": "doi", "value": "10.1016/x"}]
                    },
                    "2": {
                        "title": "Unrelated authorship.",
                        "source": "BMJ",
                        "pubdate": "2023",
                        "authors": [{"name": "Jones K"}],
                        "articleids": []
                    }
                }})
                .to_string(),
            )
            .create_async()
            .await;

        let config = PipelineConfig {
            corpus_path: corpus_path.clone(),
            review_path: dir.path().join("review.json"),
            members: vec![member("Smith", "Jane", None)],
            ..PipelineConfig::default()
        };
        let client = PubMedClient::new_for_tests(&server.url());

        let summary = run_fetch_with_client(&config, &client).await.unwrap();
        assert_eq!(summary.found, 1);
        assert_eq!(summary.new, 1);
        assert_eq!(summary.enhance, 0);
        assert!(summary.errors.is_empty());

        let review = ReviewFile::read(&config.review_path).unwrap();
        assert_eq!(review.publications.len(), 1);
        assert_eq!(review.publications[0].title, "PrEP uptake among young women");
        assert_eq!(review.publications[0].approval, Approval::Pending);
    }

    #[tokio::test]
    async fn failed_member_search_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let corpus_path = seed_corpus(dir.path(), &[]);

        let mut server = Server::new_async().await;
        let _search = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .expect_at_least(1)
            .create_async()
            .await;

        let config = PipelineConfig {
            corpus_path,
            review_path: dir.path().join("review.json"),
            members: vec![member("Smith", "Jane", None)],
            ..PipelineConfig::default()
        };
        let client = PubMedClient::new_for_tests(&server.url());

        let summary = run_fetch_with_client(&config, &client).await.unwrap();
        assert_eq!(summary.found, 0);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].starts_with("Jane Smith:"));

        // errors are carried into the review file metadata
        let review = ReviewFile::read(&config.review_path).unwrap();
        assert_eq!(review.metadata.errors.len(), 1);
    }

    fn approved_new_candidate(title: &str) -> Candidate {
        Candidate {
            source: CandidateSource::PubMed,
            external_id: "9".to_string(),
            title: title.to_string(),
            authors: "Doe A".to_string(),
            journal: "BMJ".to_string(),
            year: "2024".to_string(),
            doi: Some("10.1136/new".to_string()),
            url: None,
            abstract_text: None,
            found_for: "Alex Doe".to_string(),
            proposed_action: ProposedAction::New,
            matched_existing_id: None,
            approval: Approval::Approved,
            notes: String::new(),
        }
    }

    #[test]
    fn apply_backs_up_then_rewrites_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let existing = publication("smith-2020", "An existing record");
        let corpus_path = seed_corpus(dir.path(), &[existing]);
        let original_bytes = fs::read(&corpus_path).unwrap();

        let config = PipelineConfig {
            corpus_path: corpus_path.clone(),
            review_path: dir.path().join("review.json"),
            ..PipelineConfig::default()
        };

        let mut pending = approved_new_candidate("Left undecided");
        pending.approval = Approval::Pending;
        let mut rejected = approved_new_candidate("Turned down");
        rejected.approval = Approval::Rejected;
        let review = ReviewFile {
            metadata: crate::review::ReviewMetadata {
                generated_at: "2024-01-01T00:00:00Z".to_string(),
                total: 3,
                new: 3,
                enhance: 0,
                errors: Vec::new(),
            },
            instructions: String::new(),
            publications: vec![approved_new_candidate("A fresh study"), pending, rejected],
        };
        review.write(&config.review_path).unwrap();

        let summary = run_apply(&config).unwrap();
        assert_eq!(summary.approved, 1);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.added, 1);
        assert_eq!(summary.enhanced, 0);

        // backup is a byte-for-byte copy of the pre-merge corpus
        assert_eq!(fs::read(config.backup_path()).unwrap(), original_bytes);

        let merged = parse_corpus(&fs::read_to_string(&corpus_path).unwrap()).unwrap();
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().any(|r| r.id == "doe-2024"));
        assert!(merged.iter().any(|r| r.id == "smith-2020"));
    }

    #[test]
    fn apply_without_review_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let corpus_path = seed_corpus(dir.path(), &[]);
        let config = PipelineConfig {
            corpus_path,
            review_path: dir.path().join("absent.json"),
            ..PipelineConfig::default()
        };
        assert!(run_apply(&config).is_err());
    }

    #[test]
    fn apply_with_unreadable_corpus_is_fatal_before_backup() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            corpus_path: dir.path().join("absent.js"),
            review_path: dir.path().join("review.json"),
            ..PipelineConfig::default()
        };
        let review = ReviewFile::new(Vec::new(), Vec::new());
        review.write(&config.review_path).unwrap();

        assert!(run_apply(&config).is_err());
        assert!(!config.backup_path().exists());
    }
}
