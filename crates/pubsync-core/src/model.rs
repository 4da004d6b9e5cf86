use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Sentinel string a curator leaves in `authors` when the list was never
/// verified. Safe to overwrite during an enhance merge.
pub const AUTHORS_PLACEHOLDER: &str = "Author list to be verified";

/// Sentinel string for an unverified journal name.
pub const JOURNAL_PLACEHOLDER: &str = "Journal to be verified";

/// A curated, authoritative publication record as stored in the corpus
/// module. Curator-supplied fields (`projects`, `tags`, `featured`,
/// `image_url`, `attention_grabber`) are never overwritten by automated
/// merges, only filled in when previously absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub id: String,
    pub title: String,
    pub authors: String,
    pub journal: String,
    pub year: String,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub abstract_text: Option<String>,
    pub projects: Vec<String>,
    pub tags: Vec<String>,
    pub featured: bool,
    pub image_url: Option<String>,
    pub attention_grabber: Option<String>,
}

impl Publication {
    /// Numeric sort key for year-descending ordering. Non-numeric or missing
    /// years sort as 0 (unordered).
    pub fn year_sort_key(&self) -> i32 {
        self.year.trim().parse().unwrap_or(0)
    }

    /// True when an incoming candidate could still contribute something:
    /// a missing abstract or DOI, or a placeholder author/journal value.
    pub fn needs_enhancement(&self) -> bool {
        self.abstract_text
            .as_deref()
            .map_or(true, |a| a.trim().is_empty())
            || self.doi.as_deref().map_or(true, |d| d.trim().is_empty())
            || self.authors.trim().is_empty()
            || self.authors == AUTHORS_PLACEHOLDER
            || self.journal.trim().is_empty()
            || self.journal == JOURNAL_PLACEHOLDER
    }
}

/// External API a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    PubMed,
}

/// What the matcher proposes doing with a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposedAction {
    New,
    Enhance,
}

/// Human decision on a candidate. On the wire this is the hand-editable
/// `approved` field: `null` pending, `true` approved, `false` rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Approval {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl Serialize for Approval {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Approval::Pending => serializer.serialize_none(),
            Approval::Approved => serializer.serialize_bool(true),
            Approval::Rejected => serializer.serialize_bool(false),
        }
    }
}

impl<'de> Deserialize<'de> for Approval {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<bool>::deserialize(deserializer)? {
            None => Approval::Pending,
            Some(true) => Approval::Approved,
            Some(false) => Approval::Rejected,
        })
    }
}

/// An externally-sourced, provisional record awaiting a human decision in
/// the review file. Candidates are consumed by the apply phase and not
/// retained afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub source: CandidateSource,
    pub external_id: String,
    pub title: String,
    pub authors: String,
    pub journal: String,
    pub year: String,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "abstract", default)]
    pub abstract_text: Option<String>,
    /// The team-member query that produced this candidate.
    pub found_for: String,
    pub proposed_action: ProposedAction,
    #[serde(default)]
    pub matched_existing_id: Option<String>,
    #[serde(rename = "approved", default)]
    pub approval: Approval,
    #[serde(default)]
    pub notes: String,
}
