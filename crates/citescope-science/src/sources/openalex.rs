use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use citescope_core::config::OpenAlexConfig;
use citescope_core::{
    ErrorResult, FetchOutcome, NO_ABSTRACT, NO_TITLE, TopicHierarchy, UNKNOWN_AUTHOR,
    UNKNOWN_DOMAIN, UNKNOWN_FIELD, UNKNOWN_SUBFIELD, UNKNOWN_TOPIC, WorkRecord,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{Result, ScienceError};
use crate::http::RateLimitedClient;
use crate::identifiers::WorkIdentifier;
use crate::sources::MetadataFetcher;

static SMALL_CAPS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<scp>(.*?)</scp>").expect("valid regex"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenAlexTopic {
    pub display_name: Option<String>,
    pub subfield: Option<String>,
    pub field: Option<String>,
    pub domain: Option<String>,
}

/// The subset of an OpenAlex work document that citescope consumes.
#[derive(Debug, Clone, Default)]
pub struct OpenAlexWork {
    pub id: String,
    pub title: Option<String>,
    pub publication_year: Option<i32>,
    /// Author display names in authorship order; `None` where the entry had no name.
    pub authors: Vec<Option<String>>,
    pub cited_by_count: u32,
    pub primary_topic: OpenAlexTopic,
    pub referenced_works: Vec<String>,
    pub abstract_inverted_index: Option<HashMap<String, Vec<u32>>>,
}

impl OpenAlexWork {
    pub fn from_json(v: &Value) -> Result<Self> {
        if !v.is_object() {
            return Err(ScienceError::Parse("work is not a JSON object".to_string()));
        }

        let id = v
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let title = v
            .get("title")
            .or_else(|| v.get("display_name"))
            .and_then(Value::as_str)
            .map(ToOwned::to_owned);

        let publication_year = v
            .get("publication_year")
            .and_then(Value::as_i64)
            .and_then(|n| i32::try_from(n).ok());

        let authors = v
            .get("authorships")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .map(|a| {
                        a.get("author")
                            .and_then(|author| author.get("display_name"))
                            .and_then(Value::as_str)
                            .map(ToOwned::to_owned)
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let cited_by_count = v
            .get("cited_by_count")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0);

        let primary_topic = parse_topic(v.get("primary_topic"));

        let referenced_works = v
            .get("referenced_works")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(ToOwned::to_owned)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let abstract_inverted_index = v
            .get("abstract_inverted_index")
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .filter_map(|(token, positions)| {
                        let values = positions
                            .as_array()?
                            .iter()
                            .filter_map(Value::as_u64)
                            .filter_map(|n| u32::try_from(n).ok())
                            .collect::<Vec<_>>();
                        if values.is_empty() {
                            None
                        } else {
                            Some((token.clone(), values))
                        }
                    })
                    .collect::<HashMap<_, _>>()
            });

        Ok(Self {
            id,
            title,
            publication_year,
            authors,
            cited_by_count,
            primary_topic,
            referenced_works,
            abstract_inverted_index,
        })
    }

    /// Rebuild reading order from the inverted index by sorting every
    /// `(position, word)` pair. A stray `Abstract` heading token is dropped.
    pub fn reconstruct_abstract(&self) -> Option<String> {
        let index = self.abstract_inverted_index.as_ref()?;

        let mut words_with_positions = index
            .iter()
            .flat_map(|(word, positions)| positions.iter().map(move |&pos| (pos, word.as_str())))
            .collect::<Vec<_>>();
        words_with_positions.sort_unstable();

        let abstract_text = words_with_positions
            .into_iter()
            .map(|(_, word)| word)
            .filter(|word| !word.eq_ignore_ascii_case("abstract"))
            .collect::<Vec<_>>()
            .join(" ");

        if abstract_text.is_empty() {
            None
        } else {
            Some(abstract_text)
        }
    }

    /// Normalize into a `WorkRecord`, applying sentinels and text cleanup.
    /// `fallback_id` is used when the document carries no `id`.
    pub fn into_record(self, fallback_id: &str) -> WorkRecord {
        let abstract_text = self
            .reconstruct_abstract()
            .map(|text| clean_text(&text))
            .unwrap_or_else(|| NO_ABSTRACT.to_string());

        let title = self
            .title
            .as_deref()
            .map(clean_text)
            .unwrap_or_else(|| NO_TITLE.to_string());

        let authors = self
            .authors
            .into_iter()
            .map(|name| name.unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()))
            .collect();

        let OpenAlexTopic {
            display_name,
            subfield,
            field,
            domain,
        } = self.primary_topic;

        WorkRecord {
            id: if self.id.is_empty() {
                fallback_id.to_string()
            } else {
                self.id
            },
            title,
            abstract_text,
            authors,
            publication_year: self.publication_year,
            cited_by_count: self.cited_by_count,
            topics: TopicHierarchy {
                primary_topic: display_name.unwrap_or_else(|| UNKNOWN_TOPIC.to_string()),
                subfield_topic: subfield.unwrap_or_else(|| UNKNOWN_SUBFIELD.to_string()),
                field_topic: field.unwrap_or_else(|| UNKNOWN_FIELD.to_string()),
                domain_topic: domain.unwrap_or_else(|| UNKNOWN_DOMAIN.to_string()),
            },
            referenced_work_ids: self.referenced_works,
        }
    }
}

/// Map typographic hyphen (U+2010) and en dash (U+2013) to `-` and unwrap
/// `<scp>…</scp>` small-caps markup.
pub fn clean_text(text: &str) -> String {
    let dashed = text.replace(['\u{2010}', '\u{2013}'], "-");
    SMALL_CAPS_RE.replace_all(&dashed, "$1").into_owned()
}

// ─── OpenAlexSource ───────────────────────────────────────────────────────────

pub struct OpenAlexSource {
    client: RateLimitedClient,
    base_url: String,
    polite_email: Option<String>,
}

impl OpenAlexSource {
    pub fn new(polite_email: Option<String>) -> Result<Self> {
        Self::from_config(&OpenAlexConfig {
            polite_email,
            ..Default::default()
        })
    }

    pub fn from_config(config: &OpenAlexConfig) -> Result<Self> {
        Self::with_params(
            &config.base_url,
            Duration::from_millis(config.request_interval_ms),
            Duration::from_secs(config.timeout_secs),
            config.max_retries,
            config.polite_email.clone(),
        )
    }

    pub fn with_params(
        base_url: &str,
        min_interval: Duration,
        timeout: Duration,
        max_retries: u32,
        polite_email: Option<String>,
    ) -> Result<Self> {
        let user_agent = match &polite_email {
            Some(email) => format!("citescope/0.1 (mailto:{email})"),
            None => "citescope/0.1".to_string(),
        };

        Ok(Self {
            client: RateLimitedClient::new(min_interval, timeout, max_retries, &user_agent)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            polite_email,
        })
    }

    /// Resolve one identifier to the raw provider document.
    pub async fn fetch_work(&self, id: &WorkIdentifier) -> Result<OpenAlexWork> {
        let mut query: Vec<(&str, &str)> = Vec::with_capacity(2);
        let filter;

        let json: Value = match id {
            WorkIdentifier::OpenAlex(key) => {
                if let Some(email) = &self.polite_email {
                    query.push(("mailto", email.as_str()));
                }
                let url = format!("{}/works/{}", self.base_url, key);
                self.client.get_json(&url, &query).await?
            }
            WorkIdentifier::Doi(doi) => {
                filter = format!("doi:{doi}");
                query.push(("filter", filter.as_str()));
                if let Some(email) = &self.polite_email {
                    query.push(("mailto", email.as_str()));
                }
                let url = format!("{}/works", self.base_url);
                let body: Value = self.client.get_json(&url, &query).await?;
                body.get("results")
                    .and_then(Value::as_array)
                    .and_then(|results| results.first())
                    .cloned()
                    .ok_or(ScienceError::NotFound)?
            }
        };

        OpenAlexWork::from_json(&json)
    }

    pub async fn fetch_record(&self, identifier: &str) -> Result<WorkRecord> {
        let id = WorkIdentifier::parse(identifier);
        let work = self.fetch_work(&id).await?;
        Ok(work.into_record(&id.to_string()))
    }
}

#[async_trait]
impl MetadataFetcher for OpenAlexSource {
    fn name(&self) -> &str {
        "openalex"
    }

    async fn fetch(&self, identifier: &str) -> FetchOutcome {
        match self.fetch_record(identifier).await {
            Ok(record) => FetchOutcome::Work(record),
            Err(e) => {
                tracing::warn!(identifier, "fetch failed: {e}");
                FetchOutcome::Error(ErrorResult::new(
                    identifier,
                    format!("failed to fetch {identifier}: {e}"),
                ))
            }
        }
    }
}

fn parse_topic(value: Option<&Value>) -> OpenAlexTopic {
    let Some(obj) = value.and_then(Value::as_object) else {
        return OpenAlexTopic::default();
    };

    let nested_name = |key: &str| {
        obj.get(key)
            .and_then(|level| level.get("display_name"))
            .and_then(Value::as_str)
            .map(ToOwned::to_owned)
    };

    OpenAlexTopic {
        display_name: obj
            .get("display_name")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned),
        subfield: nested_name("subfield"),
        field: nested_name("field"),
        domain: nested_name("domain"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn source(base_url: &str, email: Option<&str>) -> OpenAlexSource {
        OpenAlexSource::with_params(
            base_url,
            Duration::from_secs(0),
            Duration::from_secs(5),
            0,
            email.map(ToOwned::to_owned),
        )
        .unwrap()
    }

    fn sample_work() -> Value {
        json!({
            "id": "https://openalex.org/W2741809807",
            "title": "Fish <scp>stock</scp> assessment \u{2010} a review",
            "publication_year": 2023,
            "cited_by_count": 42,
            "authorships": [
                {"author": {"display_name": "Ada Lovelace"}},
                {"author": {}},
                {"author": {"display_name": "Alan Turing"}}
            ],
            "primary_topic": {
                "display_name": "Fisheries Management",
                "subfield": {"display_name": "Aquatic Science"},
                "field": {"display_name": "Agricultural and Biological Sciences"},
                "domain": {"display_name": "Life Sciences"}
            },
            "referenced_works": [
                "https://openalex.org/W1",
                "https://openalex.org/W2"
            ],
            "abstract_inverted_index": {
                "Abstract": [0],
                "Stocks": [1],
                "decline\u{2013}rapidly": [2]
            }
        })
    }

    #[test]
    fn reconstruct_abstract_is_position_ordered() {
        let mut index = HashMap::new();
        index.insert("the".to_string(), vec![0, 3]);
        index.insert("fox".to_string(), vec![1]);

        let work = OpenAlexWork {
            abstract_inverted_index: Some(index),
            ..Default::default()
        };

        assert_eq!(work.reconstruct_abstract().as_deref(), Some("the fox the"));
    }

    #[test]
    fn missing_title_and_abstract_use_sentinels() {
        let work = OpenAlexWork::from_json(&json!({"id": "https://openalex.org/W9"})).unwrap();
        let record = work.into_record("unused");
        assert_eq!(record.title, "No title available");
        assert_eq!(record.abstract_text, "No abstract available");
        assert!(record.authors.is_empty());
        assert_eq!(record.cited_by_count, 0);
        assert_eq!(record.topics, TopicHierarchy::default());
    }

    #[test]
    fn null_title_and_empty_index_use_sentinels() {
        let work = OpenAlexWork::from_json(&json!({
            "id": "https://openalex.org/W9",
            "title": null,
            "abstract_inverted_index": {}
        }))
        .unwrap();
        let record = work.into_record("unused");
        assert_eq!(record.title, NO_TITLE);
        assert_eq!(record.abstract_text, NO_ABSTRACT);
    }

    #[test]
    fn abstract_of_only_heading_is_sentinel() {
        let work = OpenAlexWork::from_json(&json!({
            "id": "W1",
            "abstract_inverted_index": {"ABSTRACT": [0]}
        }))
        .unwrap();
        assert_eq!(work.into_record("W1").abstract_text, NO_ABSTRACT);
    }

    #[test]
    fn clean_text_normalizes_dashes_and_small_caps() {
        assert_eq!(
            clean_text("A<scp>b</scp> and <scp>c</scp>\u{2013}d\u{2010}e"),
            "Ab and c-d-e"
        );
    }

    #[test]
    fn record_normalization() {
        let record = OpenAlexWork::from_json(&sample_work())
            .unwrap()
            .into_record("unused");

        assert_eq!(record.id, "https://openalex.org/W2741809807");
        assert_eq!(record.title, "Fish stock assessment - a review");
        assert_eq!(record.abstract_text, "Stocks decline-rapidly");
        assert_eq!(record.authors, vec!["Ada Lovelace", "Unknown", "Alan Turing"]);
        assert_eq!(record.publication_year, Some(2023));
        assert_eq!(record.cited_by_count, 42);
        assert_eq!(record.topics.subfield_topic, "Aquatic Science");
        assert_eq!(record.topics.domain_topic, "Life Sciences");
        assert_eq!(record.referenced_work_ids.len(), 2);
    }

    #[test]
    fn topic_levels_default_independently() {
        let work = OpenAlexWork::from_json(&json!({
            "id": "W1",
            "primary_topic": {
                "display_name": "Graph Theory",
                "domain": {"display_name": "Physical Sciences"}
            }
        }))
        .unwrap();
        let topics = work.into_record("W1").topics;
        assert_eq!(topics.primary_topic, "Graph Theory");
        assert_eq!(topics.subfield_topic, UNKNOWN_SUBFIELD);
        assert_eq!(topics.field_topic, UNKNOWN_FIELD);
        assert_eq!(topics.domain_topic, "Physical Sciences");
    }

    #[test]
    fn non_object_document_is_parse_error() {
        assert!(matches!(
            OpenAlexWork::from_json(&json!([1, 2])),
            Err(ScienceError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn fetch_by_doi_takes_first_result() {
        let mut server = Server::new_async().await;
        let body = json!({"results": [sample_work(), {"id": "https://openalex.org/W0"}]});
        let _m = server
            .mock("GET", "/works")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("filter".into(), "doi:10.1111/faf.12817".into()),
                Matcher::UrlEncoded("mailto".into(), "me@example.org".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let src = source(&server.url(), Some("me@example.org"));
        let outcome = src.fetch("https://doi.org/10.1111/FAF.12817").await;

        let work = outcome.as_work().expect("record");
        assert_eq!(work.id, "https://openalex.org/W2741809807");
    }

    #[tokio::test]
    async fn polite_email_is_sent_in_user_agent() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/works/W2741809807")
            .match_header(
                "user-agent",
                Matcher::Regex(r"^citescope/\S+ \(mailto:me@example\.org\)$".into()),
            )
            .with_status(200)
            .with_body(sample_work().to_string())
            .create_async()
            .await;

        let src = source(&server.url(), Some("me@example.org"));
        assert!(src.fetch("W2741809807").await.is_ok());
        m.assert_async().await;
    }

    #[tokio::test]
    async fn anonymous_user_agent_has_no_mailto() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/works/W2741809807")
            .match_header("user-agent", Matcher::Regex(r"^citescope/\S+$".into()))
            .with_status(200)
            .with_body(sample_work().to_string())
            .create_async()
            .await;

        let src = source(&server.url(), None);
        assert!(src.fetch("W2741809807").await.is_ok());
        m.assert_async().await;
    }

    #[tokio::test]
    async fn fetch_by_uri_uses_direct_lookup() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/works/W2741809807")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(sample_work().to_string())
            .create_async()
            .await;

        let src = source(&server.url(), None);
        let outcome = src.fetch("https://openalex.org/W2741809807").await;
        assert_eq!(outcome.as_work().unwrap().cited_by_count, 42);
    }

    #[tokio::test]
    async fn empty_results_are_not_found() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/works")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"results": []}"#)
            .create_async()
            .await;

        let src = source(&server.url(), None);
        let err = src.fetch("10.1/missing").await;
        let err = err.as_error().expect("error result");
        assert_eq!(err.identifier, "10.1/missing");
        assert!(err.error_message.contains("10.1/missing"));
        assert!(err.error_message.contains("no results found"));
    }

    #[tokio::test]
    async fn http_failure_becomes_error_result() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/works/W5")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let src = source(&server.url(), None);
        let outcome = src.fetch("https://openalex.org/W5").await;
        let err = outcome.as_error().unwrap();
        assert!(err.error_message.contains("HTTP 500"));
        assert!(err.error_message.contains("https://openalex.org/W5"));
    }

    #[tokio::test]
    async fn malformed_body_becomes_error_result() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/works/W5")
            .with_status(200)
            .with_body("{truncated")
            .create_async()
            .await;

        let src = source(&server.url(), None);
        let outcome = src.fetch("W5").await;
        assert!(outcome.as_error().unwrap().error_message.contains("parse error"));
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    drop(socket);
                });
            }
        });

        let src = OpenAlexSource::with_params(
            &format!("http://{addr}"),
            Duration::from_secs(0),
            Duration::from_millis(200),
            3,
            None,
        )
        .unwrap();
        let outcome = src.fetch("W1").await;
        let err = outcome.as_error().unwrap();
        assert_eq!(err.error_message, "failed to fetch W1: request timed out");
    }

    #[tokio::test]
    async fn long_retry_after_is_cut_off_by_timeout() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/works/W1")
            .with_status(429)
            .with_header("retry-after", "2")
            .create_async()
            .await;

        let src = OpenAlexSource::with_params(
            &server.url(),
            Duration::from_secs(0),
            Duration::from_secs(1),
            3,
            None,
        )
        .unwrap();
        let started = std::time::Instant::now();
        let outcome = src.fetch("W1").await;
        let err = outcome.as_error().unwrap();
        assert_eq!(err.error_message, "failed to fetch W1: request timed out");
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}
