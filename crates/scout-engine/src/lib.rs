pub mod credentials;
pub mod export;
pub mod progress;
pub mod source;
pub mod tags;

pub use credentials::{CredentialStore, Credentials, KeyringStore, MemoryStore};
pub use export::Exporter;
pub use progress::{ProgressBroadcaster, ProgressEvent};
pub use source::ConversationSource;
pub use tags::{fetch_all_tags, slug_name_map, tags_with_counts, TagSummary};
