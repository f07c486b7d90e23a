//! Docs API fetch client.

use thiserror::Error;

use super::model::Document;

const DOCS_API_BASE: &str = "https://docs.googleapis.com/v1/documents";

/// Error type for document fetching
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to fetch document: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Docs API returned HTTP {status} for document {document_id}")]
    Status {
        document_id: String,
        status: reqwest::StatusCode,
    },
}

/// Thin client over an authenticated HTTP client for the Docs API.
pub struct DocsClient {
    http: reqwest::Client,
}

impl DocsClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Fetch a document with all tab content included.
    ///
    /// One definitive network call; retry policy is the caller's concern.
    pub async fn fetch(&self, document_id: &str) -> Result<Document, FetchError> {
        let url = format!("{DOCS_API_BASE}/{document_id}");
        let response = self
            .http
            .get(&url)
            .query(&[("includeTabsContent", "true")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                document_id: document_id.to_string(),
                status,
            });
        }

        Ok(response.json::<Document>().await?)
    }
}
