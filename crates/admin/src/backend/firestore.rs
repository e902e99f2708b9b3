//! Firestore REST client.
//!
//! Documents are read and written through the v1 REST API. Field values use
//! Firestore's typed encoding (`{"stringValue": "..."}`, `{"integerValue":
//! "42"}`); this module converts them to and from plain JSON so the rest of
//! the console never sees the wire format.
//!
//! The REST API has no push channel, so subscriptions poll the collection on
//! the configured interval and emit a snapshot only when the result set
//! changed. A failed refresh is logged and the previous snapshot stands.
//!
//! # API Reference
//!
//! - Base URL: `https://firestore.googleapis.com/v1`
//! - Documents: `projects/{project}/databases/{database}/documents/{collection}/{id}`
//! - Authentication: Web API key via the `key` query parameter

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chosen_one_core::DocumentId;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use super::{BackendError, Collection, Document, DocumentStore, Fields, Snapshot, Subscription};
use crate::config::FirebaseConfig;

/// Firestore REST base URL.
const BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Error code for a missing document.
const NOT_FOUND: &str = "not-found";

/// Largest page the list endpoint accepts.
const PAGE_SIZE: u32 = 300;

/// Firestore document store over REST.
#[derive(Clone)]
pub struct FirestoreStore {
    inner: Arc<FirestoreInner>,
}

struct FirestoreInner {
    client: reqwest::Client,
    documents_url: String,
    api_key: SecretString,
    poll_interval: Duration,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &FirebaseConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(FirestoreInner {
                client,
                documents_url: format!(
                    "{BASE_URL}/projects/{}/databases/{}/documents",
                    config.project_id, config.database
                ),
                api_key: config.api_key.clone(),
                poll_interval: config.poll_interval,
            }),
        })
    }

    fn collection_url(&self, collection: Collection) -> String {
        format!("{}/{}", self.inner.documents_url, collection.name())
    }

    fn document_url(&self, collection: Collection, id: &DocumentId) -> String {
        format!("{}/{}/{}", self.inner.documents_url, collection.name(), id)
    }

    fn key(&self) -> (&'static str, String) {
        ("key", self.inner.api_key.expose_secret().to_string())
    }

    /// Read every page of a collection.
    async fn fetch_all(&self, collection: Collection) -> Result<Vec<Document>, BackendError> {
        let url = self.collection_url(collection);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![self.key(), ("pageSize", PAGE_SIZE.to_string())];
            if let Some(token) = page_token.take() {
                params.push(("pageToken", token));
            }

            let response = self
                .inner
                .client
                .get(&url)
                .query(&params)
                .send()
                .await
                .map_err(transport_error)?;
            let page: ListResponse = handle_response(response).await?;

            documents.extend(page.documents.into_iter().map(decode_document));
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!(%collection, count = documents.len(), "Listed documents");
        Ok(documents)
    }

    /// PATCH the listed fields of a document.
    async fn patch(
        &self,
        collection: Collection,
        id: &DocumentId,
        fields: &Fields,
        must_exist: bool,
    ) -> Result<(), BackendError> {
        let mut params = vec![self.key()];
        params.extend(
            fields
                .keys()
                .map(|k| ("updateMask.fieldPaths", field_path(k))),
        );
        if must_exist {
            params.push(("currentDocument.exists", "true".to_string()));
        }

        let response = self
            .inner
            .client
            .patch(self.document_url(collection, id))
            .query(&params)
            .json(&json!({ "fields": encode_fields(fields) }))
            .send()
            .await
            .map_err(transport_error)?;

        match handle_response::<RawDocument>(response).await {
            Err(e) if e.code() == NOT_FOUND => Err(BackendError::NotFound {
                collection,
                id: id.clone(),
            }),
            Err(e) => Err(e),
            Ok(_) => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn list(&self, collection: Collection) -> Result<Vec<Document>, BackendError> {
        self.fetch_all(collection).await
    }

    async fn get(
        &self,
        collection: Collection,
        id: &DocumentId,
    ) -> Result<Option<Document>, BackendError> {
        let response = self
            .inner
            .client
            .get(self.document_url(collection, id))
            .query(&[self.key()])
            .send()
            .await
            .map_err(transport_error)?;

        match handle_response::<RawDocument>(response).await {
            Ok(raw) => Ok(Some(decode_document(raw))),
            Err(e) if e.code() == NOT_FOUND => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create(
        &self,
        collection: Collection,
        fields: Fields,
    ) -> Result<DocumentId, BackendError> {
        let response = self
            .inner
            .client
            .post(self.collection_url(collection))
            .query(&[self.key()])
            .json(&json!({ "fields": encode_fields(&fields) }))
            .send()
            .await
            .map_err(transport_error)?;

        let raw: RawDocument = handle_response(response).await?;
        let id = decode_document(raw).id;
        tracing::debug!(%collection, id = %id, "Created document");
        Ok(id)
    }

    async fn update(
        &self,
        collection: Collection,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<(), BackendError> {
        self.patch(collection, id, &fields, true).await
    }

    async fn set_merge(
        &self,
        collection: Collection,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<(), BackendError> {
        self.patch(collection, id, &fields, false).await
    }

    async fn delete(&self, collection: Collection, id: &DocumentId) -> Result<(), BackendError> {
        let response = self
            .inner
            .client
            .delete(self.document_url(collection, id))
            .query(&[self.key()])
            .send()
            .await
            .map_err(transport_error)?;

        if response.status().is_success() {
            return Ok(());
        }
        Err(parse_error(response).await)
    }

    async fn subscribe(&self, collection: Collection) -> Result<Subscription, BackendError> {
        let initial = self.fetch_all(collection).await?;
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(Snapshot::new(collection, initial.clone()));

        let store = self.clone();
        let period = self.inner.poll_interval;
        let task = tokio::spawn(async move {
            let mut last = initial;
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    break;
                }
                match store.fetch_all(collection).await {
                    Ok(documents) if documents != last => {
                        if tx.send(Snapshot::new(collection, documents.clone())).is_err() {
                            break;
                        }
                        last = documents;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(%collection, error = %e, "Snapshot refresh failed, keeping previous snapshot");
                    }
                }
            }
            tracing::debug!(%collection, "Subscription closed");
        });

        Ok(Subscription::with_task(collection, rx, task))
    }
}

impl std::fmt::Debug for FirestoreStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreStore")
            .field("documents_url", &self.inner.documents_url)
            .field("poll_interval", &self.inner.poll_interval)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Wire helpers
// =============================================================================

fn transport_error(e: reqwest::Error) -> BackendError {
    if e.is_connect() || e.is_timeout() {
        BackendError::Unavailable(format!(
            "Could not reach Firestore, the client is offline: {e}"
        ))
    } else {
        BackendError::Http(e)
    }
}

async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, BackendError> {
    if response.status().is_success() {
        return response
            .json()
            .await
            .map_err(|e| BackendError::Parse(format!("Failed to parse response: {e}")));
    }
    Err(parse_error(response).await)
}

async fn parse_error(response: reqwest::Response) -> BackendError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    error_from_body(status, &text)
}

/// Map a Firestore error body onto [`BackendError`].
fn error_from_body(status: u16, body: &str) -> BackendError {
    let (grpc_status, message) = serde_json::from_str::<ErrorEnvelope>(body).map_or_else(
        |_| (String::new(), body.to_string()),
        |envelope| (envelope.error.status, envelope.error.message),
    );

    match (grpc_status.as_str(), status) {
        ("NOT_FOUND", _) | (_, 404) => BackendError::Provider {
            code: NOT_FOUND.to_string(),
            message,
        },
        ("PERMISSION_DENIED" | "UNAUTHENTICATED", _) | (_, 401 | 403) => {
            BackendError::PermissionDenied(message)
        }
        ("UNAVAILABLE", _) | (_, 503) => BackendError::Unavailable(message),
        (grpc, _) => BackendError::Provider {
            code: if grpc.is_empty() {
                format!("http-{status}")
            } else {
                grpc.to_lowercase().replace('_', "-")
            },
            message,
        },
    }
}

/// Quote a field path segment unless it is a simple identifier.
fn field_path(name: &str) -> String {
    let simple = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

fn decode_document(raw: RawDocument) -> Document {
    let id = raw.name.rsplit('/').next().unwrap_or_default().to_string();
    let fields = raw
        .fields
        .iter()
        .map(|(k, v)| (k.clone(), decode_value(v)))
        .collect();
    Document::new(id, fields)
}

fn encode_fields(fields: &Fields) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), encode_value(v)))
            .collect(),
    )
}

/// Plain JSON to Firestore typed value.
fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => n.as_i64().map_or_else(
            || json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
            |i| json!({ "integerValue": i.to_string() }),
        ),
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            json!({ "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Firestore typed value to plain JSON. Unknown kinds decode to `null`.
fn decode_value(value: &Value) -> Value {
    let Some((kind, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
        return Value::Null;
    };

    match kind.as_str() {
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "booleanValue" | "doubleValue" => inner.clone(),
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map_or_else(|| inner.clone(), Value::from),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(
            inner
                .get("fields")
                .and_then(Value::as_object)
                .map(|fields| {
                    fields
                        .iter()
                        .map(|(k, v)| (k.clone(), decode_value(v)))
                        .collect()
                })
                .unwrap_or_default(),
        ),
        "geoPointValue" => inner.clone(),
        _ => Value::Null,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_scalars() {
        assert_eq!(encode_value(&json!("x")), json!({"stringValue": "x"}));
        assert_eq!(encode_value(&json!(45)), json!({"integerValue": "45"}));
        assert_eq!(encode_value(&json!(1.5)), json!({"doubleValue": 1.5}));
        assert_eq!(encode_value(&json!(true)), json!({"booleanValue": true}));
        assert_eq!(encode_value(&Value::Null), json!({"nullValue": null}));
    }

    #[test]
    fn test_decode_typed_document() {
        let raw: RawDocument = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/products/abc123",
            "fields": {
                "name": {"stringValue": "Luxury Watch"},
                "stock": {"integerValue": "45"},
                "rating": {"doubleValue": 4.5},
                "tags": {"arrayValue": {"values": [{"stringValue": "gold"}]}},
                "meta": {"mapValue": {"fields": {"featured": {"booleanValue": true}}}},
                "createdAt": {"timestampValue": "2024-01-02T03:04:05Z"}
            },
            "createTime": "2024-01-02T03:04:05Z"
        }))
        .unwrap();

        let doc = decode_document(raw);
        assert_eq!(doc.id.as_str(), "abc123");
        assert_eq!(doc.field("name"), Some(&json!("Luxury Watch")));
        assert_eq!(doc.field("stock"), Some(&json!(45)));
        assert_eq!(doc.field("rating"), Some(&json!(4.5)));
        assert_eq!(doc.field("tags"), Some(&json!(["gold"])));
        assert_eq!(doc.field("meta"), Some(&json!({"featured": true})));
        assert_eq!(doc.field("createdAt"), Some(&json!("2024-01-02T03:04:05Z")));
    }

    #[test]
    fn test_nested_values_survive_encoding() {
        let original = json!({"items": [1, "two", {"three": 3.5}], "ok": false});
        let Value::Object(fields) = original.clone() else {
            unreachable!()
        };
        let encoded = encode_fields(&fields);
        let decoded: serde_json::Map<String, Value> = encoded
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), decode_value(v)))
            .collect();
        assert_eq!(Value::Object(decoded), original);
    }

    #[test]
    fn test_field_path_quoting() {
        assert_eq!(field_path("stock"), "stock");
        assert_eq!(field_path("_x1"), "_x1");
        assert_eq!(field_path("user-name"), "`user-name`");
        assert_eq!(field_path("1st"), "`1st`");
    }

    #[test]
    fn test_error_mapping() {
        let body = r#"{"error":{"code":403,"message":"Missing or insufficient permissions.","status":"PERMISSION_DENIED"}}"#;
        assert_eq!(error_from_body(403, body).code(), "permission-denied");

        let body = r#"{"error":{"code":503,"message":"The service is currently unavailable.","status":"UNAVAILABLE"}}"#;
        assert!(error_from_body(503, body).is_offline());

        let body = r#"{"error":{"code":400,"message":"no document","status":"FAILED_PRECONDITION"}}"#;
        assert_eq!(error_from_body(400, body).code(), "failed-precondition");

        assert_eq!(error_from_body(404, "gone").code(), NOT_FOUND);
        assert_eq!(error_from_body(500, "boom").code(), "http-500");
    }

    #[test]
    fn test_urls() {
        let store = FirestoreStore::new(&FirebaseConfig {
            project_id: "first-new-fd74b".to_string(),
            api_key: SecretString::from("k".to_string()),
            database: "(default)".to_string(),
            poll_interval: Duration::from_secs(5),
        })
        .unwrap();
        assert_eq!(
            store.document_url(Collection::Products, &DocumentId::new("p1")),
            "https://firestore.googleapis.com/v1/projects/first-new-fd74b/databases/(default)/documents/products/p1"
        );
        let debug = format!("{store:?}");
        assert!(!debug.contains("api_key"));
    }
}
