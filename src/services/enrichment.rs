//! Best-effort metadata enrichment from an external bibliographic source
//!
//! The client never fails: network errors, timeouts and empty results all
//! produce an empty [`BookMetadata`], and the import keeps the spreadsheet
//! values.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    config::EnrichmentConfig,
    error::{AppError, AppResult},
    models::{BookMetadata, NewBook},
};

const USER_AGENT: &str = concat!("readshelf-server/", env!("CARGO_PKG_VERSION"));

/// Enrichment lookup errors
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),
}

impl From<EnrichmentError> for AppError {
    fn from(err: EnrichmentError) -> Self {
        AppError::Enrichment(err.to_string())
    }
}

/// One lookup against the provider, most specific first
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupQuery {
    Isbn(String),
    TitleAuthor { title: String, author: String },
    Title(String),
}

impl LookupQuery {
    /// Lookups to try for a book. Fast mode keeps only the most specific one.
    pub fn plan(book: &NewBook, fast: bool) -> Vec<LookupQuery> {
        let mut queries = Vec::with_capacity(3);
        if let Some(isbn) = book.isbn.as_deref() {
            queries.push(LookupQuery::Isbn(isbn.to_string()));
        }
        queries.push(LookupQuery::TitleAuthor {
            title: book.title.clone(),
            author: book.author.clone(),
        });
        queries.push(LookupQuery::Title(book.title.clone()));
        if fast {
            queries.truncate(1);
        }
        queries
    }
}

/// A source of bibliographic metadata
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// `Ok(None)` when the source has no match.
    async fn lookup(&self, query: &LookupQuery) -> Result<Option<BookMetadata>, EnrichmentError>;
}

// ---------------------------------------------------------------------------
// Google Books volumes API
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    publisher: Option<String>,
    published_date: Option<String>,
    description: Option<String>,
    page_count: Option<i32>,
    #[serde(default)]
    categories: Vec<String>,
    image_links: Option<ImageLinks>,
    #[serde(default)]
    industry_identifiers: Vec<IndustryIdentifier>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageLinks {
    thumbnail: Option<String>,
    small_thumbnail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

impl From<VolumeInfo> for BookMetadata {
    fn from(info: VolumeInfo) -> Self {
        let isbn = ["ISBN_13", "ISBN_10"].iter().find_map(|kind| {
            info.industry_identifiers
                .iter()
                .find(|id| id.kind == *kind)
                .map(|id| id.identifier.clone())
        });
        let cover_url = info
            .image_links
            .and_then(|links| links.thumbnail.or(links.small_thumbnail))
            .map(|url| url.replacen("http://", "https://", 1));

        BookMetadata {
            title: info.title,
            author: (!info.authors.is_empty()).then(|| info.authors.join(", ")),
            isbn,
            cover_url,
            description: info.description.filter(|d| !d.trim().is_empty()),
            genre: info.categories.into_iter().next(),
            page_count: info.page_count.filter(|pages| *pages > 0),
            publisher: info.publisher,
            published_date: info.published_date,
        }
    }
}

/// Client for a Google Books compatible `volumes` endpoint
pub struct GoogleBooksProvider {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl GoogleBooksProvider {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, EnrichmentError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| EnrichmentError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn search_terms(query: &LookupQuery) -> String {
        match query {
            LookupQuery::Isbn(isbn) => format!("isbn:{}", isbn),
            LookupQuery::TitleAuthor { title, author } => format!("intitle:{} inauthor:{}", title, author),
            LookupQuery::Title(title) => format!("intitle:{}", title),
        }
    }
}

#[async_trait]
impl MetadataProvider for GoogleBooksProvider {
    async fn lookup(&self, query: &LookupQuery) -> Result<Option<BookMetadata>, EnrichmentError> {
        let url = format!("{}/volumes", self.base_url);
        let terms = Self::search_terms(query);
        tracing::debug!(url = %url, q = %terms, "Querying volumes API");

        let mut request = self
            .http_client
            .get(&url)
            .query(&[("q", terms.as_str()), ("maxResults", "1"), ("printType", "books")]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EnrichmentError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EnrichmentError::Api(status.as_u16(), error_text));
        }

        let volumes: VolumesResponse = response
            .json()
            .await
            .map_err(|e| EnrichmentError::Parse(e.to_string()))?;

        Ok(volumes
            .items
            .into_iter()
            .next()
            .map(|volume| BookMetadata::from(volume.volume_info)))
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Runs lookups within a latency budget and merges what they return.
#[derive(Clone)]
pub struct EnrichmentClient {
    provider: Option<Arc<dyn MetadataProvider>>,
    fast_timeout: Duration,
    thorough_timeout: Duration,
}

impl EnrichmentClient {
    pub fn new(provider: Arc<dyn MetadataProvider>, fast_timeout: Duration, thorough_timeout: Duration) -> Self {
        Self {
            provider: Some(provider),
            fast_timeout,
            thorough_timeout,
        }
    }

    /// A client that never looks anything up
    pub fn disabled() -> Self {
        Self {
            provider: None,
            fast_timeout: Duration::ZERO,
            thorough_timeout: Duration::ZERO,
        }
    }

    pub fn from_config(config: &EnrichmentConfig) -> AppResult<Self> {
        if !config.enabled {
            tracing::info!("Metadata enrichment disabled");
            return Ok(Self::disabled());
        }
        let provider = GoogleBooksProvider::new(&config.base_url, config.api_key.clone())?;
        Ok(Self::new(
            Arc::new(provider),
            Duration::from_millis(config.fast_timeout_ms),
            Duration::from_millis(config.thorough_timeout_ms),
        ))
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Metadata for `book`, empty when nothing could be found.
    ///
    /// Fast mode issues a single lookup with the short timeout. Thorough mode
    /// falls back from ISBN to title and author to title alone, filling gaps
    /// until the metadata is complete.
    pub async fn enrich(&self, book: &NewBook, fast: bool) -> BookMetadata {
        let Some(provider) = &self.provider else {
            return BookMetadata::default();
        };
        let budget = if fast { self.fast_timeout } else { self.thorough_timeout };

        let mut merged = BookMetadata::default();
        for query in LookupQuery::plan(book, fast) {
            match lookup_within(provider.as_ref(), &query, budget).await {
                Ok(Some(found)) => merged.fill_gaps_from(&found),
                Ok(None) => tracing::debug!(?query, "No enrichment match"),
                Err(e) => tracing::warn!(?query, error = %e, "Enrichment lookup failed"),
            }
            if merged.is_complete() {
                break;
            }
        }
        merged
    }
}

async fn lookup_within(
    provider: &dyn MetadataProvider,
    query: &LookupQuery,
    budget: Duration,
) -> Result<Option<BookMetadata>, EnrichmentError> {
    tokio::time::timeout(budget, provider.lookup(query))
        .await
        .map_err(|_| EnrichmentError::Timeout(budget))?
}
