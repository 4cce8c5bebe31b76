//! Export filter criteria and the upstream query expression they translate to.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Conversation status filter, passed through to the upstream verbatim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    All,
    Active,
    Open,
    Pending,
    Closed,
    Spam,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::All => "all",
            Status::Active => "active",
            Status::Open => "open",
            Status::Pending => "pending",
            Status::Closed => "closed",
            Status::Spam => "spam",
        }
    }
}

/// Filter criteria for one export request. Immutable once the run is in flight.
#[derive(Debug, Clone, Default)]
pub struct ExportFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Tag slugs as selected in the UI; resolved to display names before use.
    pub tag_slugs: Vec<String>,
    pub status: Status,
}

impl ExportFilter {
    /// Upstream `query` expression for the date range, or `None` when no
    /// lower bound was given.
    ///
    /// Both bounds: `(createdAt:[<from>T00:00:00Z TO <to>T23:59:59Z])`.
    /// Lower bound only: `(createdAt:[<from>T00:00:00Z TO *])`.
    pub fn date_query(&self) -> Option<String> {
        let from = self.from?;
        Some(match self.to {
            Some(to) => format!(
                "(createdAt:[{}T00:00:00Z TO {}T23:59:59Z])",
                from.format("%Y-%m-%d"),
                to.format("%Y-%m-%d")
            ),
            None => format!("(createdAt:[{}T00:00:00Z TO *])", from.format("%Y-%m-%d")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_open_ended_date_query() {
        let filter = ExportFilter {
            from: Some(date("2024-01-01")),
            ..Default::default()
        };
        assert_eq!(
            filter.date_query().unwrap(),
            "(createdAt:[2024-01-01T00:00:00Z TO *])"
        );
    }

    #[test]
    fn test_bounded_date_query() {
        let filter = ExportFilter {
            from: Some(date("2024-01-01")),
            to: Some(date("2024-02-15")),
            ..Default::default()
        };
        assert_eq!(
            filter.date_query().unwrap(),
            "(createdAt:[2024-01-01T00:00:00Z TO 2024-02-15T23:59:59Z])"
        );
    }

    #[test]
    fn test_no_lower_bound_means_no_query() {
        let filter = ExportFilter {
            to: Some(date("2024-02-15")),
            ..Default::default()
        };
        assert!(filter.date_query().is_none());
    }

    #[test]
    fn test_status_roundtrip() {
        let status: Status = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(status, Status::Pending);
        assert_eq!(status.as_str(), "pending");
        assert_eq!(Status::default(), Status::All);
    }
}
