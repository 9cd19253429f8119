use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::LookupError;
use crate::map::entity::Entity;

/// Large enough to return the whole directory in one page.
pub const DEFAULT_PAGE_SIZE: u32 = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub page_size: Option<u32>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            page_size: None,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }
}

/// A hosted full-text index of members: query in, ranked hits out.
pub trait SearchIndex: Send + Sync {
    fn search(&self, request: SearchRequest) -> BoxFuture<'_, Result<Vec<Entity>, LookupError>>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody<'a> {
    query: &'a str,
    hits_per_page: u32,
}

#[derive(Deserialize)]
struct QueryResponse {
    hits: Vec<Entity>,
}

/// Client for an Algolia index, built once at startup from [`Config`].
#[derive(Debug, Clone)]
pub struct AlgoliaIndex {
    client: reqwest::Client,
    app_id: String,
    api_key: String,
    index_name: String,
}

impl AlgoliaIndex {
    pub fn new(app_id: String, api_key: String, index_name: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            app_id,
            api_key,
            index_name,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.search_app_id.clone(),
            config.search_api_key.clone(),
            config.search_index.clone(),
        )
    }

    pub fn query_url(&self) -> String {
        format!(
            "https://{}-dsn.algolia.net/1/indexes/{}/query",
            self.app_id.to_lowercase(),
            self.index_name
        )
    }

    async fn query(&self, request: SearchRequest) -> Result<Vec<Entity>, LookupError> {
        let body = QueryBody {
            query: &request.query,
            hits_per_page: request.page_size(),
        };
        log::debug!("searching {:?} (page size {})", request.query, body.hits_per_page);

        let response = self
            .client
            .post(self.query_url())
            .header("X-Algolia-Application-Id", &self.app_id)
            .header("X-Algolia-API-Key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LookupError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        parse_hits(&bytes)
    }
}

impl SearchIndex for AlgoliaIndex {
    fn search(&self, request: SearchRequest) -> BoxFuture<'_, Result<Vec<Entity>, LookupError>> {
        Box::pin(self.query(request))
    }
}

fn parse_hits(body: &[u8]) -> Result<Vec<Entity>, LookupError> {
    serde_json::from_slice::<QueryResponse>(body)
        .map(|response| response.hits)
        .map_err(|err| LookupError::Decode(err.to_string()))
}
