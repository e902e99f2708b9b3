//! Customer inquiries.
//!
//! Inquiries are a local list seeded with demo data. They are not read from
//! the document store and take no part in aggregation.

use chosen_one_core::{QueryId, QueryPriority, QueryStatus};
use serde::{Deserialize, Serialize};

/// A customer inquiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerQuery {
    pub id: QueryId,
    pub customer: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub status: QueryStatus,
    pub date: String,
    pub priority: QueryPriority,
}

impl CustomerQuery {
    /// Case-insensitive search over customer, email and subject.
    #[must_use]
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [&self.customer, &self.email, &self.subject]
            .into_iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Inquiry submitted through the inbox form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewQuery {
    pub customer: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub status: QueryStatus,
    pub date: String,
    pub priority: QueryPriority,
}

impl NewQuery {
    #[must_use]
    pub fn with_id(self, id: QueryId) -> CustomerQuery {
        CustomerQuery {
            id,
            customer: self.customer,
            email: self.email,
            subject: self.subject,
            message: self.message,
            status: self.status,
            date: self.date,
            priority: self.priority,
        }
    }
}

/// The six demo inquiries the inbox starts with.
#[must_use]
pub fn demo_queries() -> Vec<CustomerQuery> {
    let rows = [
        (
            "John Doe",
            "john@example.com",
            "Product Inquiry",
            "I'm interested in the luxury watch collection. Do you have any discounts available?",
            QueryStatus::New,
            "2023-05-15",
            QueryPriority::High,
        ),
        (
            "Jane Smith",
            "jane@example.com",
            "Order Status",
            "I placed an order last week but haven't received any updates. Can you check the status?",
            QueryStatus::InProgress,
            "2023-05-14",
            QueryPriority::Medium,
        ),
        (
            "Mike Johnson",
            "mike@example.com",
            "Return Request",
            "I received a damaged item and would like to return it. What's the process?",
            QueryStatus::Resolved,
            "2023-05-13",
            QueryPriority::High,
        ),
        (
            "Sarah Wilson",
            "sarah@example.com",
            "Size Availability",
            "Do you have the designer bag in size M? It's showing out of stock online.",
            QueryStatus::New,
            "2023-05-12",
            QueryPriority::Low,
        ),
        (
            "David Brown",
            "david@example.com",
            "Payment Issue",
            "I'm having trouble with the payment gateway. It keeps declining my card.",
            QueryStatus::InProgress,
            "2023-05-11",
            QueryPriority::High,
        ),
        (
            "Emily Davis",
            "emily@example.com",
            "Shipping Question",
            "What are your international shipping rates and delivery times?",
            QueryStatus::Resolved,
            "2023-05-10",
            QueryPriority::Medium,
        ),
    ];

    rows.into_iter()
        .zip(1..)
        .map(
            |((customer, email, subject, message, status, date, priority), id)| CustomerQuery {
                id: QueryId::new(id),
                customer: customer.to_string(),
                email: email.to_string(),
                subject: subject.to_string(),
                message: message.to_string(),
                status,
                date: date.to_string(),
                priority,
            },
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_queries_are_numbered() {
        let queries = demo_queries();
        assert_eq!(queries.len(), 6);
        assert_eq!(queries[0].id, QueryId::new(1));
        assert_eq!(queries[5].id, QueryId::new(6));
        assert_eq!(queries[1].status, QueryStatus::InProgress);
    }

    #[test]
    fn test_new_query_defaults() {
        let query: NewQuery = serde_json::from_str(r#"{"customer": "Ann"}"#).unwrap_or_default();
        assert_eq!(query.status, QueryStatus::New);
        assert_eq!(query.priority, QueryPriority::Medium);
        assert_eq!(query.customer, "Ann");
    }

    #[test]
    fn test_matches() {
        let query = &demo_queries()[3];
        assert!(query.matches("wilson"));
        assert!(query.matches("SARAH@"));
        assert!(query.matches("size"));
        assert!(!query.matches("payment"));
    }
}
