//! Typed client for the Help Scout v2 REST API.
//!
//! All calls are sequential awaited requests with no retries; the engine
//! decides which failures are fatal to an export and which are skipped.

use serde_json::Value;
use tracing::warn;

pub mod error;
pub mod filter;
pub mod models;

pub use error::ApiError;
pub use filter::{ExportFilter, Status};
pub use models::{
    AccessToken, Conversation, ConversationEmbedded, ConversationPage, PageInfo, Tag, TagPage,
};

use models::{ConversationListResponse, TagListResponse, ThreadListResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.helpscout.net/v2";

/// Help Scout API client. Cheap to clone; the underlying `reqwest::Client`
/// pools connections.
#[derive(Debug, Clone)]
pub struct HelpScoutClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for HelpScoutClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HelpScoutClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Client against a non-default upstream, used by tests and by the
    /// `SCOUT_UPSTREAM_URL` override.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        HelpScoutClient {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exchange app credentials for a bearer token via the OAuth2
    /// client-credentials grant. Any non-2xx response is an auth failure;
    /// there is no retry.
    pub async fn authenticate(
        &self,
        app_id: &str,
        app_secret: &str,
    ) -> Result<AccessToken, ApiError> {
        let response = self
            .http
            .post(format!("{}/oauth2/token", self.base_url))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", app_id),
                ("client_secret", app_secret),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("token exchange rejected with {}: {}", status, body);
            return Err(ApiError::Auth);
        }

        Ok(response.json().await?)
    }

    /// Fetch a single page of conversations matching the filter. The
    /// upstream accepts at most one tag per call, always the display name.
    pub async fn list_conversations(
        &self,
        token: &str,
        filter: &ExportFilter,
        tag_name: Option<&str>,
        page: u32,
    ) -> Result<ConversationPage, ApiError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(query) = filter.date_query() {
            params.push(("query", query));
        }
        params.push(("status", filter.status.as_str().to_string()));
        if let Some(tag) = tag_name {
            params.push(("tag", tag.to_string()));
        }
        params.push(("page", page.to_string()));

        let response = self
            .http
            .get(format!("{}/conversations", self.base_url))
            .bearer_auth(token)
            .query(&params)
            .send()
            .await?;

        let response = check(response).await?;
        let body: ConversationListResponse = response.json().await?;
        Ok(ConversationPage {
            items: body.embedded.conversations,
            page_number: body.page.number,
            total_pages: body.page.total_pages,
            total_elements: body.page.total_elements,
        })
    }

    /// Fetch a single page of the tag listing.
    pub async fn list_tags(&self, token: &str, page: u32) -> Result<TagPage, ApiError> {
        let response = self
            .http
            .get(format!("{}/tags", self.base_url))
            .bearer_auth(token)
            .query(&[("page", page.to_string())])
            .send()
            .await?;

        let response = check(response).await?;
        let body: TagListResponse = response.json().await?;
        Ok(TagPage {
            items: body.embedded.tags,
            page_number: body.page.number,
            total_pages: body.page.total_pages,
        })
    }

    /// Fetch the thread list for one conversation. Callers treat a failure
    /// here as non-fatal to the export.
    pub async fn get_threads(
        &self,
        conversation_id: u64,
        token: &str,
    ) -> Result<Vec<Value>, ApiError> {
        let response = self
            .http
            .get(format!(
                "{}/conversations/{}/threads",
                self.base_url, conversation_id
            ))
            .bearer_auth(token)
            .send()
            .await?;

        let response = check(response).await?;
        let body: ThreadListResponse = response.json().await?;
        Ok(body.embedded.threads)
    }
}

/// Surface non-2xx responses with the upstream status and body.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Upstream {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn filter_from(from: &str) -> ExportFilter {
        ExportFilter {
            from: Some(from.parse::<NaiveDate>().unwrap()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_authenticate_posts_client_credentials_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=my-app"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-123",
                "token_type": "bearer",
                "expires_in": 172800
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HelpScoutClient::with_base_url(server.uri());
        let token = client.authenticate("my-app", "s3cret").await.unwrap();
        assert_eq!(token.access_token, "tok-123");
        assert_eq!(token.expires_in, 172800);
    }

    #[tokio::test]
    async fn test_authenticate_rejection_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = HelpScoutClient::with_base_url(server.uri());
        let err = client.authenticate("bad", "creds").await.unwrap_err();
        assert!(matches!(err, ApiError::Auth));
    }

    #[tokio::test]
    async fn test_list_conversations_sends_query_status_tag_and_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversations"))
            .and(query_param(
                "query",
                "(createdAt:[2024-01-01T00:00:00Z TO *])",
            ))
            .and(query_param("status", "all"))
            .and(query_param("tag", "Billing Issues"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "_embedded": { "conversations": [{ "id": 10 }] },
                "page": { "size": 25, "totalElements": 30, "totalPages": 2, "number": 2 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HelpScoutClient::with_base_url(server.uri());
        let page = client
            .list_conversations("tok", &filter_from("2024-01-01"), Some("Billing Issues"), 2)
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, 10);
        assert_eq!(page.page_number, 2);
        assert_eq!(page.total_pages, 2);
        assert!(!page.has_more());
    }

    #[tokio::test]
    async fn test_list_conversations_surfaces_upstream_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversations"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let client = HelpScoutClient::with_base_url(server.uri());
        let err = client
            .list_conversations("tok", &filter_from("2024-01-01"), None, 1)
            .await
            .unwrap_err();
        match err {
            ApiError::Upstream { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "slow down");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_threads_unwraps_embedded_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversations/42/threads"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "_embedded": { "threads": [{ "id": 1, "type": "customer" }] }
            })))
            .mount(&server)
            .await;

        let client = HelpScoutClient::with_base_url(server.uri());
        let threads = client.get_threads(42, "tok").await.unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0]["type"], "customer");
    }

    #[tokio::test]
    async fn test_list_tags_parses_page_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tags"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "_embedded": { "tags": [
                    { "id": 1, "name": "Billing", "slug": "billing", "ticketCount": 12 }
                ]},
                "page": { "size": 50, "totalElements": 1, "totalPages": 1, "number": 1 }
            })))
            .mount(&server)
            .await;

        let client = HelpScoutClient::with_base_url(server.uri());
        let page = client.list_tags("tok", 1).await.unwrap();
        assert_eq!(page.items[0].slug, "billing");
        assert_eq!(page.items[0].ticket_count, 12);
        assert!(!page.has_more());
    }
}
