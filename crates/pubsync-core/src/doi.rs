use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

static DOI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"10\.\d{4,9}/[-._;()/:A-Za-z0-9]+").expect("valid regex"));

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Doi {
    pub raw: String,
    pub normalized: String,
}

impl Doi {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        let stripped = if let Some(s) = input.strip_prefix("https://doi.org/") {
            s
        } else if let Some(s) = input.strip_prefix("http://doi.org/") {
            s
        } else if let Some(s) = input.strip_prefix("https://dx.doi.org/") {
            s
        } else if let Some(s) = input.strip_prefix("http://dx.doi.org/") {
            s
        } else if let Some(s) = input.strip_prefix("doi:") {
            s.trim_start()
        } else if let Some(s) = input.strip_prefix("DOI:") {
            s.trim_start()
        } else {
            input
        };

        // Must start with "10.", contain "/", and have a non-empty suffix
        if !stripped.starts_with("10.") {
            return Err(SyncError::InvalidDoi(input.to_string()));
        }
        let slash_pos = stripped
            .find('/')
            .ok_or_else(|| SyncError::InvalidDoi(input.to_string()))?;
        if stripped[slash_pos + 1..].is_empty() {
            return Err(SyncError::InvalidDoi(input.to_string()));
        }

        Ok(Self {
            raw: input.to_string(),
            normalized: stripped.to_lowercase(),
        })
    }
}

/// Pull a DOI out of free text, e.g. a PubMed `elocationid` like
/// `"doi: 10.1016/j.puhe.2023.01.001. eCollection 2023."`.
pub fn find_doi_in_text(text: &str) -> Option<Doi> {
    let found = DOI_RE.find(text)?;
    let raw = found.as_str().trim_end_matches(['.', ';', ',']);
    Doi::parse(raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_doi() {
        let doi = Doi::parse("10.1000/xyz123").unwrap();
        assert_eq!(doi.normalized, "10.1000/xyz123");
    }

    #[test]
    fn doi_with_url_prefix() {
        let doi = Doi::parse("https://doi.org/10.1000/xyz123").unwrap();
        assert_eq!(doi.normalized, "10.1000/xyz123");
    }

    #[test]
    fn doi_with_colon_prefix_and_uppercase() {
        let doi = Doi::parse("DOI: 10.1000/XYZ123").unwrap();
        assert_eq!(doi.normalized, "10.1000/xyz123");
    }

    #[test]
    fn reject_not_a_doi() {
        assert!(Doi::parse("not-a-doi").is_err());
        assert!(Doi::parse("10.1000").is_err());
        assert!(Doi::parse("").is_err());
    }

    #[test]
    fn finds_doi_in_elocationid() {
        let doi = find_doi_in_text("doi: 10.1016/j.puhe.2023.01.001. eCollection 2023.").unwrap();
        assert_eq!(doi.normalized, "10.1016/j.puhe.2023.01.001");
    }

    #[test]
    fn find_returns_none_without_doi() {
        assert!(find_doi_in_text("pii: S0033-3506(23)00001-2").is_none());
    }
}
