//! Seam between the export engine and the upstream API.
//!
//! The engine is written against this trait so every stage of an export can
//! be exercised without a live upstream.

use async_trait::async_trait;
use serde_json::Value;

use scout_client::{ApiError, ConversationPage, ExportFilter, HelpScoutClient, TagPage};

/// Read access to the upstream conversation store.
#[async_trait]
pub trait ConversationSource: Send + Sync {
    /// One page of conversations matching the filter, optionally scoped to
    /// a single tag display name.
    async fn list_conversations(
        &self,
        token: &str,
        filter: &ExportFilter,
        tag_name: Option<&str>,
        page: u32,
    ) -> Result<ConversationPage, ApiError>;

    /// One page of the tag listing.
    async fn list_tags(&self, token: &str, page: u32) -> Result<TagPage, ApiError>;

    /// Thread detail for one conversation.
    async fn get_threads(&self, conversation_id: u64, token: &str)
        -> Result<Vec<Value>, ApiError>;
}

#[async_trait]
impl ConversationSource for HelpScoutClient {
    async fn list_conversations(
        &self,
        token: &str,
        filter: &ExportFilter,
        tag_name: Option<&str>,
        page: u32,
    ) -> Result<ConversationPage, ApiError> {
        HelpScoutClient::list_conversations(self, token, filter, tag_name, page).await
    }

    async fn list_tags(&self, token: &str, page: u32) -> Result<TagPage, ApiError> {
        HelpScoutClient::list_tags(self, token, page).await
    }

    async fn get_threads(
        &self,
        conversation_id: u64,
        token: &str,
    ) -> Result<Vec<Value>, ApiError> {
        HelpScoutClient::get_threads(self, conversation_id, token).await
    }
}
