use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// A team member whose publications the fetch phase searches for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub surname: String,
    pub first_name: String,
    /// Optional institutional qualifier appended to the search expression.
    #[serde(default)]
    pub affiliation: Option<String>,
}

impl TeamMember {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.surname)
    }
}

/// Pipeline configuration, loaded from a TOML file (`pubsync.toml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// The canonical corpus module consumed by the website.
    pub corpus_path: PathBuf,
    /// The human-editable review file produced by `fetch`.
    pub review_path: PathBuf,
    /// Suffix appended to the corpus path for the pre-write backup copy.
    pub backup_suffix: String,
    /// Search window: publications from the last N years.
    pub lookback_years: u32,
    /// Result cap per search query.
    pub max_results_per_query: u32,
    /// Fixed delay between outbound API requests.
    pub request_delay_ms: u64,
    /// Project slug assigned when no keyword matches.
    pub fallback_project: String,
    /// Tag assigned when no keyword matches.
    pub fallback_tag: String,
    pub members: Vec<TeamMember>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            corpus_path: PathBuf::from("data/publications.js"),
            review_path: PathBuf::from("data/publication_review.json"),
            backup_suffix: ".bak".to_string(),
            lookback_years: 10,
            max_results_per_query: 50,
            request_delay_ms: 350,
            fallback_project: "general-health".to_string(),
            fallback_tag: "Other".to_string(),
            members: Vec::new(),
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| SyncError::Io {
            action: "read config",
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&text)
            .map_err(|e| SyncError::Config(format!("invalid config {}: {e}", path.display())))
    }

    /// Backup destination: the corpus path with the backup suffix appended.
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.corpus_path.as_os_str().to_owned();
        name.push(&self.backup_suffix);
        PathBuf::from(name)
    }
}
