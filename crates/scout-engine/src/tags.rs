//! Tag listing helpers: full pagination, slug resolution, and the
//! count-sorted catalog shown in the UI.

use std::collections::HashMap;

use serde::Serialize;

use scout_client::{ApiError, Tag};

use crate::source::ConversationSource;

/// A tag projected for the UI picker, with `count` sourced from the
/// upstream per-tag ticket count.
#[derive(Debug, Clone, Serialize)]
pub struct TagSummary {
    pub id: u64,
    pub name: String,
    pub slug: String,
    pub color: Option<String>,
    pub count: u64,
}

/// Fetch every page of the tag listing.
pub async fn fetch_all_tags<S: ConversationSource + ?Sized>(
    source: &S,
    token: &str,
) -> Result<Vec<Tag>, ApiError> {
    let mut all = Vec::new();
    let mut page = 1u32;
    loop {
        let batch = source.list_tags(token, page).await?;
        let has_more = batch.has_more();
        all.extend(batch.items);
        if !has_more {
            break;
        }
        page += 1;
    }
    Ok(all)
}

/// Slug → display name map. Upstream query filtering takes the display
/// name, so every tag-scoped call goes through this translation.
pub fn slug_name_map(tags: &[Tag]) -> HashMap<String, String> {
    tags.iter()
        .map(|tag| (tag.slug.clone(), tag.name.clone()))
        .collect()
}

/// Project tags into UI summaries, sorted by ticket count descending.
pub fn tags_with_counts(tags: Vec<Tag>) -> Vec<TagSummary> {
    let mut summaries: Vec<TagSummary> = tags
        .into_iter()
        .map(|tag| TagSummary {
            id: tag.id,
            name: tag.name,
            slug: tag.slug,
            color: tag.color,
            count: tag.ticket_count,
        })
        .collect();
    summaries.sort_by(|a, b| b.count.cmp(&a.count));
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(id: u64, name: &str, slug: &str, count: u64) -> Tag {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": name,
            "slug": slug,
            "ticketCount": count
        }))
        .unwrap()
    }

    #[test]
    fn test_slug_map_uses_display_names() {
        let tags = vec![tag(1, "Billing Issues", "billing-issues", 3)];
        let map = slug_name_map(&tags);
        assert_eq!(map.get("billing-issues").unwrap(), "Billing Issues");
    }

    #[test]
    fn test_catalog_sorted_by_count_descending() {
        let tags = vec![
            tag(1, "Billing", "billing", 3),
            tag(2, "Urgent", "urgent", 17),
            tag(3, "Feedback", "feedback", 5),
        ];
        let catalog = tags_with_counts(tags);
        let counts: Vec<u64> = catalog.iter().map(|t| t.count).collect();
        assert_eq!(counts, vec![17, 5, 3]);
        assert_eq!(catalog[0].slug, "urgent");
    }
}
