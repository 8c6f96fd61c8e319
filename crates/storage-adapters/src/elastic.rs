//! # Elasticsearch index adapter
//!
//! Talks to the single-document REST API (`/{index}/_doc/{id}`). The primary
//! store stays the source of truth; this index is a materialized view that the
//! services keep converged.

use std::time::Duration;

use async_trait::async_trait;
use domains::{BoardDocument, DomainError, Result, SearchIndex};
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug)]
pub struct ElasticsearchConfig {
    pub url: String,
    pub index: String,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub timeout: Duration,
    /// Ask for a refresh on every write so reads observe it immediately.
    pub refresh: bool,
}

impl ElasticsearchConfig {
    pub fn new(url: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            index: index.into(),
            username: None,
            password: None,
            timeout: Duration::from_secs(5),
            refresh: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    #[serde(default)]
    found: bool,
    #[serde(rename = "_source")]
    source: Option<BoardDocument>,
}

pub struct ElasticsearchIndex {
    client: Client,
    config: ElasticsearchConfig,
}

impl ElasticsearchIndex {
    pub fn new(config: ElasticsearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(DomainError::storage)?;
        Ok(Self { client, config })
    }

    fn doc_url(&self, doc_id: &str) -> String {
        format!(
            "{}/{}/_doc/{}",
            self.config.url.trim_end_matches('/'),
            self.config.index,
            doc_id
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match (&self.config.username, &self.config.password) {
            (Some(user), password) => {
                request.basic_auth(user, password.as_ref().map(|p| p.expose_secret().to_owned()))
            }
            _ => request,
        }
    }

    fn refresh_param(&self) -> &'static str {
        if self.config.refresh {
            "true"
        } else {
            "false"
        }
    }
}

fn unexpected(op: &str, status: StatusCode) -> DomainError {
    DomainError::Storage(format!("elasticsearch {op} returned {status}"))
}

#[async_trait]
impl SearchIndex for ElasticsearchIndex {
    async fn find_by_id(&self, doc_id: &str) -> Result<Option<BoardDocument>> {
        let response = self
            .authorized(self.client.get(self.doc_url(doc_id)))
            .send()
            .await
            .map_err(DomainError::storage)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: GetResponse = response.json().await.map_err(DomainError::storage)?;
                Ok(body.source.filter(|_| body.found))
            }
            status => Err(unexpected("get", status)),
        }
    }

    async fn save(&self, document: &BoardDocument) -> Result<()> {
        let response = self
            .authorized(self.client.put(self.doc_url(&document.id)))
            .query(&[("refresh", self.refresh_param())])
            .json(document)
            .send()
            .await
            .map_err(DomainError::storage)?;

        let status = response.status();
        if !status.is_success() {
            return Err(unexpected("index", status));
        }
        debug!(doc_id = %document.id, "document indexed");
        Ok(())
    }

    async fn delete_by_id(&self, doc_id: &str) -> Result<bool> {
        let response = self
            .authorized(self.client.delete(self.doc_url(doc_id)))
            .query(&[("refresh", self.refresh_param())])
            .send()
            .await
            .map_err(DomainError::storage)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(unexpected("delete", status)),
        }
    }
}
