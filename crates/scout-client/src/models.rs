//! Wire types for the Help Scout v2 API.
//!
//! Upstream responses are relayed to the UI, so models type the fields the
//! engine needs and keep everything else in a flattened map. Missing page
//! metadata falls back to a single page rather than failing the decode.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Bearer token returned by the upstream token endpoint. Held in memory for
/// the session, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// One helpdesk conversation. Threads are attached lazily after the base
/// fetch via the `_embedded` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: u64,
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub closed_at: Option<String>,
    #[serde(default)]
    pub primary_customer: Option<Value>,
    #[serde(default)]
    pub tags: Vec<Value>,
    #[serde(rename = "_embedded", default, skip_serializing_if = "Option::is_none")]
    pub embedded: Option<ConversationEmbedded>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationEmbedded {
    #[serde(default)]
    pub threads: Vec<Value>,
}

/// A helpdesk tag. `slug` is the stable key; upstream query filtering
/// requires `name`, the human-readable value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub ticket_count: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Upstream page envelope metadata.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub total_elements: u64,
    #[serde(default = "default_page")]
    pub total_pages: u32,
    #[serde(default = "default_page")]
    pub number: u32,
}

fn default_page() -> u32 {
    1
}

impl Default for PageInfo {
    fn default() -> Self {
        PageInfo {
            size: 0,
            total_elements: 0,
            total_pages: 1,
            number: 1,
        }
    }
}

/// One page of a conversation listing.
#[derive(Debug, Clone)]
pub struct ConversationPage {
    pub items: Vec<Conversation>,
    pub page_number: u32,
    pub total_pages: u32,
    pub total_elements: u64,
}

impl ConversationPage {
    /// Whether the upstream reports further pages after this one.
    pub fn has_more(&self) -> bool {
        self.page_number < self.total_pages
    }
}

/// One page of a tag listing.
#[derive(Debug, Clone)]
pub struct TagPage {
    pub items: Vec<Tag>,
    pub page_number: u32,
    pub total_pages: u32,
}

impl TagPage {
    pub fn has_more(&self) -> bool {
        self.page_number < self.total_pages
    }
}

// --- Upstream response envelopes ---

#[derive(Debug, Deserialize)]
pub(crate) struct ConversationListResponse {
    #[serde(rename = "_embedded", default)]
    pub embedded: ConversationListEmbedded,
    #[serde(default)]
    pub page: PageInfo,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ConversationListEmbedded {
    #[serde(default)]
    pub conversations: Vec<Conversation>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TagListResponse {
    #[serde(rename = "_embedded", default)]
    pub embedded: TagListEmbedded,
    #[serde(default)]
    pub page: PageInfo,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TagListEmbedded {
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ThreadListResponse {
    #[serde(rename = "_embedded", default)]
    pub embedded: ThreadListEmbedded,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ThreadListEmbedded {
    #[serde(default)]
    pub threads: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_keeps_unknown_fields() {
        let json = serde_json::json!({
            "id": 42,
            "number": 7,
            "subject": "Refund request",
            "status": "closed",
            "createdAt": "2024-01-05T10:00:00Z",
            "closedAt": "2024-01-06T09:30:00Z",
            "primaryCustomer": { "id": 1, "first": "Acme", "email": "a@b.c" },
            "tags": [{ "id": 3, "tag": "billing" }],
            "mailboxId": 99,
            "customFields": []
        });
        let conv: Conversation = serde_json::from_value(json).unwrap();
        assert_eq!(conv.id, 42);
        assert_eq!(conv.subject.as_deref(), Some("Refund request"));
        assert!(conv.embedded.is_none());
        assert_eq!(conv.extra.get("mailboxId"), Some(&serde_json::json!(99)));

        let back = serde_json::to_value(&conv).unwrap();
        assert_eq!(back["mailboxId"], serde_json::json!(99));
        assert_eq!(back["closedAt"], serde_json::json!("2024-01-06T09:30:00Z"));
    }

    #[test]
    fn test_missing_page_metadata_defaults_to_single_page() {
        let json = serde_json::json!({ "_embedded": { "conversations": [] } });
        let resp: ConversationListResponse = serde_json::from_value(json).unwrap();
        assert_eq!(resp.page.number, 1);
        assert_eq!(resp.page.total_pages, 1);
        assert_eq!(resp.page.total_elements, 0);
    }

    #[test]
    fn test_tag_ticket_count_defaults_to_zero() {
        let json = serde_json::json!({ "id": 1, "name": "Billing", "slug": "billing" });
        let tag: Tag = serde_json::from_value(json).unwrap();
        assert_eq!(tag.ticket_count, 0);
        assert!(tag.color.is_none());
    }
}
