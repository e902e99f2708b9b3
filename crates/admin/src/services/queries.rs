//! Customer inquiry inbox.
//!
//! The inbox is an in-process list seeded with demo inquiries. It is not
//! persisted and is not part of the live pipeline.

use chosen_one_core::{QueryId, QueryStatus};
use serde::Serialize;

use crate::models::{CustomerQuery, NewQuery, demo_queries};

/// Inquiry counts shown above the inbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryCounts {
    pub total: usize,
    pub new: usize,
    pub in_progress: usize,
    pub resolved: usize,
}

#[derive(Debug, Clone)]
pub struct QueryInbox {
    queries: Vec<CustomerQuery>,
}

impl Default for QueryInbox {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryInbox {
    /// Inbox holding the six demo inquiries.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queries: demo_queries(),
        }
    }

    #[must_use]
    pub fn all(&self) -> &[CustomerQuery] {
        &self.queries
    }

    /// Append an inquiry. Its ID is the inbox length after insertion.
    pub fn add(&mut self, query: NewQuery) -> CustomerQuery {
        let next = u32::try_from(self.queries.len() + 1).unwrap_or(u32::MAX);
        let query = query.with_id(QueryId::new(next));
        self.queries.push(query.clone());
        tracing::info!(query_id = next, "Inquiry added");
        query
    }

    /// Inquiries whose customer, email or subject contains `needle`.
    #[must_use]
    pub fn search(&self, needle: &str) -> Vec<CustomerQuery> {
        self.queries
            .iter()
            .filter(|q| q.matches(needle))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn counts(&self) -> QueryCounts {
        let count = |status| self.queries.iter().filter(|q| q.status == status).count();
        QueryCounts {
            total: self.queries.len(),
            new: count(QueryStatus::New),
            in_progress: count(QueryStatus::InProgress),
            resolved: count(QueryStatus::Resolved),
        }
    }
}
