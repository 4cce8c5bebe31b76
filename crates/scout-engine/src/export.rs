//! The export pipeline: paginate, merge across tags, attach threads.
//!
//! One run is strictly sequential; every upstream call is awaited before
//! the next. Failures are split the way the UI needs them: auth and tag
//! listing failures abort the run, a failed conversation page ends that
//! tag's pagination with whatever accumulated, and a failed thread fetch
//! keeps the conversation without its detail.

use std::collections::HashSet;

use serde_json::json;
use tracing::{info, warn};

use scout_client::{ApiError, Conversation, ConversationEmbedded, ExportFilter};

use crate::progress::ProgressBroadcaster;
use crate::source::ConversationSource;
use crate::tags::{fetch_all_tags, slug_name_map};

/// Drives one export run against a [`ConversationSource`], broadcasting
/// progress as it goes.
pub struct Exporter<S> {
    source: S,
    progress: ProgressBroadcaster,
}

impl<S: ConversationSource> Exporter<S> {
    pub fn new(source: S, progress: ProgressBroadcaster) -> Self {
        Exporter { source, progress }
    }

    pub fn progress(&self) -> &ProgressBroadcaster {
        &self.progress
    }

    /// Run the full pipeline: fetch/merge, then attach threads, then emit
    /// completion. Progress already broadcast is not retracted on failure.
    pub async fn run(
        &self,
        token: &str,
        filter: &ExportFilter,
    ) -> Result<Vec<Conversation>, ApiError> {
        self.progress.broadcast(
            "Starting export...",
            json!({ "params": {
                "from": filter.from,
                "to": filter.to,
                "tags": filter.tag_slugs,
                "status": filter.status.as_str(),
            }}),
        );

        let result = self.run_inner(token, filter).await;
        if let Err(err) = &result {
            warn!("export failed: {}", err);
            self.progress
                .broadcast("Error during export", json!({ "error": err.to_string() }));
        }
        result
    }

    async fn run_inner(
        &self,
        token: &str,
        filter: &ExportFilter,
    ) -> Result<Vec<Conversation>, ApiError> {
        let mut conversations = if filter.tag_slugs.is_empty() {
            self.progress.broadcast("Fetching conversations...", json!({}));
            self.fetch_all_pages(token, filter, None).await
        } else {
            self.merge_across_tags(token, filter).await?
        };

        self.attach_threads(token, &mut conversations).await;

        info!("export complete: {} conversations", conversations.len());
        self.progress.broadcast(
            format!(
                "Export complete! {} conversations exported.",
                conversations.len()
            ),
            json!({ "complete": true, "total": conversations.len() }),
        );
        Ok(conversations)
    }

    /// Fetch every page for one scope (a tag, or no tag at all), starting
    /// at page 1 and stopping once the upstream reports no further pages.
    /// A failed page halts pagination for this scope and returns what was
    /// accumulated so far.
    pub async fn fetch_all_pages(
        &self,
        token: &str,
        filter: &ExportFilter,
        tag_name: Option<&str>,
    ) -> Vec<Conversation> {
        let mut all = Vec::new();
        let mut page = 1u32;
        loop {
            match self
                .source
                .list_conversations(token, filter, tag_name, page)
                .await
            {
                Ok(batch) => {
                    let has_more = batch.has_more();
                    let page_number = batch.page_number;
                    let total_pages = batch.total_pages.max(1);
                    all.extend(batch.items);
                    self.progress.broadcast(
                        format!("Fetched page {}/{}", page_number, total_pages),
                        json!({
                            "page": page_number,
                            "totalPages": total_pages,
                            "conversationsCount": all.len(),
                            "progress": percent(page_number as usize, total_pages as usize),
                        }),
                    );
                    if !has_more {
                        break;
                    }
                    page += 1;
                }
                Err(err) => {
                    warn!(
                        "failed to fetch conversations page {} (tag: {:?}): {}",
                        page, tag_name, err
                    );
                    self.progress
                        .broadcast(format!("Error fetching page {}: {}", page, err), json!({}));
                    break;
                }
            }
        }
        all
    }

    /// Run the pagination once per selected tag and merge the results,
    /// keeping each conversation id exactly once. Slugs that resolve to no
    /// display name are skipped with a warning; a failed tag listing is
    /// fatal to the run.
    pub async fn merge_across_tags(
        &self,
        token: &str,
        filter: &ExportFilter,
    ) -> Result<Vec<Conversation>, ApiError> {
        self.progress
            .broadcast("Fetching tags information...", json!({}));
        let names = slug_name_map(&fetch_all_tags(&self.source, token).await?);

        let mut merged: Vec<Conversation> = Vec::new();
        let mut seen: HashSet<u64> = HashSet::new();
        let total_tags = filter.tag_slugs.len();

        for (index, slug) in filter.tag_slugs.iter().enumerate() {
            let Some(name) = names.get(slug) else {
                warn!("no display name found for tag slug: {}", slug);
                self.progress.broadcast(
                    format!("Warning: Could not find display name for tag: {}", slug),
                    json!({}),
                );
                continue;
            };

            self.progress.broadcast(
                format!(
                    "Fetching conversations for tag {}/{}: {}",
                    index + 1,
                    total_tags,
                    name
                ),
                json!({}),
            );

            let batch = self.fetch_all_pages(token, filter, Some(name)).await;
            let mut added = 0usize;
            for conversation in batch {
                if seen.insert(conversation.id) {
                    merged.push(conversation);
                    added += 1;
                }
            }
            self.progress.broadcast(
                format!("Added {} unique conversations from tag: {}", added, name),
                json!({ "total": merged.len() }),
            );
        }
        Ok(merged)
    }

    /// Attach thread detail to each conversation in accumulation order. A
    /// failed fetch keeps the conversation without threads and the run
    /// moves on. Emits a progress event roughly every 10 items and on the
    /// last one.
    pub async fn attach_threads(&self, token: &str, conversations: &mut [Conversation]) {
        if conversations.is_empty() {
            return;
        }
        let total = conversations.len();
        self.progress.broadcast(
            "Fetching conversation threads...",
            json!({ "total": total, "progress": 0 }),
        );

        for (index, conversation) in conversations.iter_mut().enumerate() {
            if index % 10 == 0 || index == total - 1 {
                self.progress.broadcast(
                    format!("Fetching threads for conversation {}/{}", index + 1, total),
                    json!({
                        "progress": percent(index, total),
                        "current": index + 1,
                        "total": total,
                    }),
                );
            }

            match self.source.get_threads(conversation.id, token).await {
                Ok(threads) => {
                    conversation.embedded = Some(ConversationEmbedded { threads });
                }
                Err(err) => {
                    warn!(
                        "failed to fetch threads for conversation {}: {}",
                        conversation.id, err
                    );
                }
            }
        }

        self.progress.broadcast(
            "Finished fetching threads",
            json!({ "complete": true, "progress": 100 }),
        );
    }

    /// Pre-export candidate count, read from the first page's
    /// `totalElements`. With multiple tags the per-tag totals are summed
    /// without dedup, so a conversation carrying two selected tags is
    /// counted twice; the export itself dedups.
    pub async fn count_candidates(
        &self,
        token: &str,
        filter: &ExportFilter,
    ) -> Result<u64, ApiError> {
        if filter.tag_slugs.is_empty() {
            let page = self.source.list_conversations(token, filter, None, 1).await?;
            return Ok(page.total_elements);
        }

        let names = slug_name_map(&fetch_all_tags(&self.source, token).await?);
        let mut total = 0u64;
        for slug in &filter.tag_slugs {
            let Some(name) = names.get(slug) else {
                warn!("no display name found for tag slug: {}", slug);
                continue;
            };
            let page = self
                .source
                .list_conversations(token, filter, Some(name), 1)
                .await?;
            total += page.total_elements;
        }
        Ok(total)
    }

    /// Match count for a single tag value passed verbatim, any status, no
    /// date bounds. Backs the UI's per-tag badge.
    pub async fn count_for_tag(&self, token: &str, tag: &str) -> Result<u64, ApiError> {
        let filter = ExportFilter::default();
        let page = self
            .source
            .list_conversations(token, &filter, Some(tag), 1)
            .await?;
        Ok(page.total_elements)
    }

    /// Full tag catalog sorted by ticket count, for the UI picker.
    pub async fn tag_catalog(&self, token: &str) -> Result<Vec<crate::tags::TagSummary>, ApiError> {
        let tags = fetch_all_tags(&self.source, token).await?;
        Ok(crate::tags::tags_with_counts(tags))
    }
}

fn percent(index: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    ((index as f64 / total as f64) * 100.0).round() as u32
}
