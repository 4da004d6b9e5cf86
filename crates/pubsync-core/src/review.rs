//! The review file: the single human-in-the-loop control point between the
//! fetch and apply phases.
//!
//! Fetch writes every surviving candidate here with `approved: null`; a
//! curator hand-edits the JSON (flipping `approved` to `true`/`false`,
//! optionally correcting fields); apply reads the decisions back. The file
//! is disposable; each fetch run overwrites it.

use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SyncError};
use crate::model::{Approval, Candidate, ProposedAction};

const INSTRUCTIONS: &str = "Review each entry below. Set \"approved\" to true to accept it, \
false to reject it, or leave it null to defer. You may correct any field \
before approving. Then run `pubsync apply`.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewMetadata {
    pub generated_at: String,
    pub total: usize,
    pub new: usize,
    pub enhance: usize,
    /// Per-member fetch errors, e.g. a search term that failed. Informational.
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewFile {
    pub metadata: ReviewMetadata,
    pub instructions: String,
    pub publications: Vec<Candidate>,
}

/// Human decisions split out of a review file.
#[derive(Debug, Default)]
pub struct ReviewPartition {
    pub approved: Vec<Candidate>,
    pub rejected: usize,
    pub pending: usize,
}

impl ReviewFile {
    pub fn new(mut candidates: Vec<Candidate>, errors: Vec<String>) -> Self {
        for candidate in &mut candidates {
            candidate.approval = Approval::Pending;
            candidate.notes.clear();
        }
        let new = candidates
            .iter()
            .filter(|c| c.proposed_action == ProposedAction::New)
            .count();
        let enhance = candidates.len() - new;

        Self {
            metadata: ReviewMetadata {
                generated_at: Utc::now().to_rfc3339(),
                total: candidates.len(),
                new,
                enhance,
                errors,
            },
            instructions: INSTRUCTIONS.to_string(),
            publications: candidates,
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SyncError::Review(format!("serializing review file: {e}")))?;
        fs::write(path, json).map_err(|source| SyncError::Io {
            action: "write",
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read back a (possibly hand-edited) review file. Any structural
    /// problem is fatal: a damaged file must never silently drop decisions.
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| SyncError::Io {
            action: "read",
            path: path.to_path_buf(),
            source,
        })?;

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| SyncError::Review(format!("{}: not valid JSON: {e}", path.display())))?;
        match value.get("publications") {
            Some(Value::Array(_)) => {}
            Some(_) => {
                return Err(SyncError::Review(format!(
                    "{}: \"publications\" is not a list",
                    path.display()
                )))
            }
            None => {
                return Err(SyncError::Review(format!(
                    "{}: missing \"publications\" list",
                    path.display()
                )))
            }
        }

        serde_json::from_value(value)
            .map_err(|e| SyncError::Review(format!("{}: {e}", path.display())))
    }

    pub fn partition(self) -> ReviewPartition {
        let mut out = ReviewPartition::default();
        for candidate in self.publications {
            match candidate.approval {
                Approval::Approved => out.approved.push(candidate),
                Approval::Rejected => out.rejected += 1,
                Approval::Pending => out.pending += 1,
            }
        }
        out
    }
}
