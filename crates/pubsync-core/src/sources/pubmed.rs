use std::time::Duration;

use reqwest::Url;
use serde_json::Value;
use tracing::debug;

use crate::doi::{find_doi_in_text, Doi};
use crate::error::{Result, SyncError};
use crate::http::RateLimitedClient;

const ESEARCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";
const ESUMMARY_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esummary.fcgi";
const USER_AGENT: &str = "pubsync/0.1";

/// Raw PubMed DocSum as returned by the esummary endpoint.
#[derive(Debug, Clone, Default)]
pub struct PubMedRecord {
    pub pmid: String,
    pub title: String,
    /// Author names in PubMed short form, e.g. "Smith J".
    pub authors: Vec<String>,
    pub journal: String,
    pub pub_date: String,
    /// Typed cross-referenced identifiers: (idtype, value) pairs.
    pub article_ids: Vec<(String, String)>,
    /// Free-text location string, sometimes carrying an embedded DOI.
    pub elocation_id: String,
}

impl PubMedRecord {
    pub fn from_json(pmid: &str, v: &Value) -> Self {
        let title = v
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();

        let journal = v
            .get("fulljournalname")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| v.get("source").and_then(Value::as_str).map(str::trim))
            .unwrap_or_default()
            .to_string();

        let pub_date = v
            .get("pubdate")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();

        let elocation_id = v
            .get("elocationid")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();

        let authors = v
            .get("authors")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|author| author.get("name").and_then(Value::as_str))
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(ToOwned::to_owned)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let article_ids = v
            .get("articleids")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|entry| {
                        let idtype = entry.get("idtype").and_then(Value::as_str)?;
                        let value = entry.get("value").and_then(Value::as_str)?;
                        Some((idtype.to_string(), value.trim().to_string()))
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        Self {
            pmid: pmid.to_string(),
            title,
            authors,
            journal,
            pub_date,
            article_ids,
            elocation_id,
        }
    }

    /// Typed DOI from `articleids` when present; otherwise a regex probe
    /// over the location string.
    pub fn doi(&self) -> Option<String> {
        for (idtype, value) in &self.article_ids {
            if idtype.eq_ignore_ascii_case("doi") {
                if let Ok(doi) = Doi::parse(value) {
                    return Some(doi.normalized);
                }
            }
        }
        find_doi_in_text(&self.elocation_id).map(|doi| doi.normalized)
    }
}

/// Client for the PubMed E-utilities search + summary endpoints.
pub struct PubMedClient {
    client: RateLimitedClient,
    esearch_url: String,
    esummary_url: String,
}

impl PubMedClient {
    pub fn new(request_delay: Duration) -> Self {
        Self::with_base_urls(
            ESEARCH_URL.to_string(),
            ESUMMARY_URL.to_string(),
            request_delay,
        )
    }

    fn with_base_urls(esearch_url: String, esummary_url: String, request_delay: Duration) -> Self {
        Self {
            client: RateLimitedClient::new(request_delay, 3, USER_AGENT),
            esearch_url,
            esummary_url,
        }
    }

    #[cfg(test)]
    pub(crate) fn new_for_tests(server_url: &str) -> Self {
        Self::with_base_urls(
            format!("{server_url}/esearch.fcgi"),
            format!("{server_url}/esummary.fcgi"),
            Duration::from_millis(1),
        )
    }

    /// Id-search: free-text term plus a publication-date window, capped at
    /// `retmax` results. Returns PMIDs in PubMed's result order.
    pub async fn search(
        &self,
        term: &str,
        from_year: i32,
        to_year: i32,
        retmax: u32,
    ) -> Result<Vec<String>> {
        let mut url = parse_base_url(&self.esearch_url)?;
        url.query_pairs_mut()
            .append_pair("db", "pubmed")
            .append_pair("term", term)
            .append_pair("retmode", "json")
            .append_pair("retmax", &retmax.to_string())
            .append_pair("datetype", "pdat")
            .append_pair("mindate", &from_year.to_string())
            .append_pair("maxdate", &to_year.to_string());

        let json: Value = self.client.get_json(url.as_str()).await?;
        let result = json
            .get("esearchresult")
            .ok_or_else(|| SyncError::Parse("missing esearchresult in response".to_string()))?;

        let count = result
            .get("count")
            .and_then(Value::as_str)
            .unwrap_or_default();
        debug!(term, count, "pubmed search");

        let ids = result
            .get("idlist")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(ToOwned::to_owned)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        Ok(ids)
    }

    /// Detail fetch: batched DocSums for a list of PMIDs.
    pub async fn fetch_details(&self, ids: &[String]) -> Result<Vec<PubMedRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        for chunk in ids.chunks(200) {
            let mut url = parse_base_url(&self.esummary_url)?;
            url.query_pairs_mut()
                .append_pair("db", "pubmed")
                .append_pair("retmode", "json")
                .append_pair("id", &chunk.join(","));

            let json: Value = self.client.get_json(url.as_str()).await?;
            let result = json
                .get("result")
                .ok_or_else(|| SyncError::Parse("missing result in esummary response".to_string()))?;

            let uids = result
                .get("uids")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(ToOwned::to_owned)
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();

            for uid in &uids {
                if let Some(doc) = result.get(uid.as_str()) {
                    out.push(PubMedRecord::from_json(uid, doc));
                }
            }
        }

        Ok(out)
    }
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    Url::parse(base_url).map_err(|e| SyncError::Parse(format!("invalid URL {base_url}: {e}")))
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_docsum_with_typed_doi() {
        let value = json!({
            "uid": "36000001",
            "title": "HIV prevention in young adults: a model.",
            "fulljournalname": "The Lancet Public Health",
            "pubdate": "2023 Mar 14",
            "elocationid": "doi: 10.1016/s2468-2667(23)00001-1",
            "authors": [
                {"name": "Smith J", "authtype": "Author"},
                {"name": "Doe A", "authtype": "Author"}
            ],
            "articleids": [
                {"idtype": "pubmed", "value": "36000001"},
                {"idtype": "doi", "value": "10.1016/S2468-2667(23)00001-1"}
            ]
        });

        let record = PubMedRecord::from_json("36000001", &value);
        assert_eq!(record.pmid, "36000001");
        assert_eq!(record.authors, vec!["Smith J", "Doe A"]);
        assert_eq!(record.journal, "The Lancet Public Health");
        assert_eq!(record.doi().as_deref(), Some("10.1016/s2468-2667(23)00001-1"));
    }

    #[test]
    fn doi_falls_back_to_elocation_string() {
        let value = json!({
            "title": "A study",
            "source": "PLoS One",
            "pubdate": "2022",
            "elocationid": "e0123456. doi: 10.1371/journal.pone.0123456.",
            "authors": [],
            "articleids": [{"idtype": "pubmed", "value": "35000001"}]
        });

        let record = PubMedRecord::from_json("35000001", &value);
        assert_eq!(record.journal, "PLoS One");
        assert_eq!(record.doi().as_deref(), Some("10.1371/journal.pone.0123456"));
    }

    #[tokio::test]
    async fn search_returns_id_list() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("db".into(), "pubmed".into()),
                Matcher::UrlEncoded("term".into(), "Smith J[Author]".into()),
                Matcher::UrlEncoded("retmax".into(), "50".into()),
            ]))
            .with_status(200)
            .with_body(
                json!({
                    "esearchresult": {
                        "count": "2",
                        "idlist": ["36000001", "36000002"]
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = PubMedClient::new_for_tests(&server.url());
        let ids = client.search("Smith J[Author]", 2014, 2024, 50).await.unwrap();
        assert_eq!(ids, vec!["36000001", "36000002"]);
    }

    #[tokio::test]
    async fn fetch_details_reads_docsums_in_uid_order() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/esummary.fcgi")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                json!({
                    "result": {
                        "uids": ["1", "2"],
                        "1": {"title": "First", "source": "J One", "pubdate": "2021", "authors": [], "articleids": []},
                        "2": {"title": "Second", "source": "J Two", "pubdate": "2020", "authors": [], "articleids": []}
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = PubMedClient::new_for_tests(&server.url());
        let records = client
            .fetch_details(&["1".to_string(), "2".to_string()])
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "First");
        assert_eq!(records[1].pmid, "2");
    }

    #[tokio::test]
    async fn fetch_details_with_no_ids_makes_no_request() {
        let client = PubMedClient::new_for_tests("http://127.0.0.1:1");
        let records = client.fetch_details(&[]).await.unwrap();
        assert!(records.is_empty());
    }
}
