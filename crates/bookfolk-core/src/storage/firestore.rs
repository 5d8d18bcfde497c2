//! Firestore document store
//!
//! Talks to the Firestore REST API. Documents are plain JSON objects on our
//! side; Firestore wants every value wrapped in a typed envelope
//! (`{"stringValue": "..."}`), so this module carries the codec for that.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::identity::TokenSource;
use crate::repository::{Document, DocumentStore};

/// Public Firestore REST endpoint
pub const FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";

const PAGE_SIZE: &str = "300";

/// Document store backed by Firestore
pub struct FirestoreStore {
    client: Client,
    base_url: String,
    project_id: String,
    tokens: Arc<dyn TokenSource>,
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    documents: Vec<Value>,
    #[serde(default, rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl FirestoreStore {
    pub fn new(client: Client, project_id: impl Into<String>, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            client,
            base_url: FIRESTORE_URL.to_string(),
            project_id: project_id.into(),
            tokens,
        }
    }

    /// Point at a different endpoint (e.g. the local emulator)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}",
            self.base_url,
            self.project_id,
            collection.trim_matches('/')
        )
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}", self.collection_url(collection), id)
    }

    async fn bearer(&self) -> AppResult<String> {
        Ok(format!("Bearer {}", self.tokens.id_token().await?))
    }
}

/// Turn a non-success response into an error
async fn check(response: Response, what: &str) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(error_for_status(status, &body, what))
}

/// Map an HTTP status and Firestore error body to an application error
pub fn error_for_status(status: StatusCode, body: &str, what: &str) -> AppError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| {
            if e.error.status.is_empty() {
                e.error.message
            } else {
                format!("{}: {}", e.error.status, e.error.message)
            }
        })
        .unwrap_or_else(|_| status.to_string());

    match status {
        StatusCode::NOT_FOUND => AppError::NotFound(what.to_string()),
        StatusCode::UNAUTHORIZED => AppError::Unauthenticated,
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => AppError::Network(detail),
        _ => AppError::Storage(detail),
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn set(&self, collection: &str, id: &str, document: Document) -> AppResult<()> {
        let url = self.document_url(collection, id);
        let response = self
            .client
            .patch(&url)
            .header("Authorization", self.bearer().await?)
            .json(&encode_fields(&document))
            .send()
            .await?;
        check(response, &format!("{}/{}", collection, id)).await?;
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> AppResult<Option<Document>> {
        let url = self.document_url(collection, id);
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.bearer().await?)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check(response, &format!("{}/{}", collection, id)).await?;
        let body: Value = response.json().await?;
        decode_document(&body).map(Some)
    }

    async fn list(&self, collection: &str) -> AppResult<Vec<Document>> {
        let url = self.collection_url(collection);
        let auth = self.bearer().await?;
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", PAGE_SIZE.to_string())];
            if let Some(ref token) = page_token {
                query.push(("pageToken", token.clone()));
            }

            let response = self
                .client
                .get(&url)
                .header("Authorization", auth.clone())
                .query(&query)
                .send()
                .await?;
            let page: ListResponse = check(response, collection).await?.json().await?;

            for raw in &page.documents {
                documents.push(decode_document(raw)?);
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(collection, count = documents.len(), "listed documents");
        Ok(documents)
    }

    async fn merge(&self, collection: &str, id: &str, fields: Document) -> AppResult<()> {
        let url = self.document_url(collection, id);
        let mut query: Vec<(&str, &str)> = fields
            .keys()
            .map(|k| ("updateMask.fieldPaths", k.as_str()))
            .collect();
        query.push(("currentDocument.exists", "true"));

        let response = self
            .client
            .patch(&url)
            .header("Authorization", self.bearer().await?)
            .query(&query)
            .json(&encode_fields(&fields))
            .send()
            .await?;
        check(response, &format!("{}/{}", collection, id)).await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> AppResult<()> {
        let url = self.document_url(collection, id);
        let response = self
            .client
            .delete(&url)
            .header("Authorization", self.bearer().await?)
            .send()
            .await?;

        // Firestore deletes are already idempotent; tolerate a 404 anyway
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        check(response, &format!("{}/{}", collection, id)).await?;
        Ok(())
    }
}

// ==================== Value codec ====================

/// Wrap a document in Firestore's `{"fields": {...}}` form
pub fn encode_fields(document: &Document) -> Value {
    let fields: Map<String, Value> = document
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect();
    json!({ "fields": fields })
}

/// Encode one JSON value as a typed Firestore value
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                // Firestore sends and expects int64 as a string
                json!({ "integerValue": i.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => {
            let fields: Map<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), encode_value(v)))
                .collect();
            json!({ "mapValue": { "fields": fields } })
        }
    }
}

/// Decode a Firestore document resource into a plain document
pub fn decode_document(raw: &Value) -> AppResult<Document> {
    let mut document = Document::new();
    if let Some(fields) = raw.get("fields").and_then(Value::as_object) {
        for (k, v) in fields {
            document.insert(k.clone(), decode_value(v)?);
        }
    }
    Ok(document)
}

/// Decode one typed Firestore value
pub fn decode_value(raw: &Value) -> AppResult<Value> {
    let obj = raw
        .as_object()
        .ok_or_else(|| AppError::Storage(format!("malformed Firestore value: {}", raw)))?;
    let (kind, inner) = obj
        .iter()
        .next()
        .ok_or_else(|| AppError::Storage("empty Firestore value".to_string()))?;

    let value = match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => Value::Bool(inner.as_bool().unwrap_or(false)),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                other => other.as_i64(),
            };
            parsed
                .map(Value::from)
                .ok_or_else(|| AppError::Storage(format!("bad integerValue: {}", inner)))?
        }
        "doubleValue" => inner.clone(),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "arrayValue" => {
            let items = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect::<AppResult<Vec<_>>>())
                .transpose()?
                .unwrap_or_default();
            Value::Array(items)
        }
        "mapValue" => Value::Object(decode_document(inner)?),
        "geoPointValue" => inner.clone(),
        other => {
            return Err(AppError::Storage(format!(
                "unsupported Firestore value type: {}",
                other
            )))
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticToken;

    #[async_trait]
    impl TokenSource for StaticToken {
        async fn id_token(&self) -> AppResult<String> {
            Ok("token".to_string())
        }
    }

    #[test]
    fn test_document_urls() {
        let store = FirestoreStore::new(Client::new(), "book-folk", Arc::new(StaticToken))
            .with_base_url("http://localhost:8080/v1/");

        assert_eq!(
            store.document_url("users/u1/books", "b1"),
            "http://localhost:8080/v1/projects/book-folk/databases/(default)/documents/users/u1/books/b1"
        );
    }

    #[test]
    fn test_encode_book_like_document() {
        let doc = json!({
            "title": "Dune",
            "pages": 412,
            "isCompleted": true,
            "dateRead": null,
            "quotes": [{"id": "q1", "page": 8}]
        });
        let encoded = encode_fields(doc.as_object().unwrap());

        assert_eq!(encoded["fields"]["title"], json!({"stringValue": "Dune"}));
        assert_eq!(encoded["fields"]["pages"], json!({"integerValue": "412"}));
        assert_eq!(encoded["fields"]["isCompleted"], json!({"booleanValue": true}));
        assert_eq!(encoded["fields"]["dateRead"], json!({"nullValue": null}));
        assert_eq!(
            encoded["fields"]["quotes"]["arrayValue"]["values"][0]["mapValue"]["fields"]["page"],
            json!({"integerValue": "8"})
        );
    }

    #[test]
    fn test_decode_firestore_document() {
        let raw = json!({
            "name": "projects/p/databases/(default)/documents/users/u1/books/b1",
            "fields": {
                "title": {"stringValue": "Dune"},
                "pages": {"integerValue": "412"},
                "rating": {"doubleValue": 4.5},
                "isFavorite": {"booleanValue": true},
                "dateRead": {"nullValue": null},
                "quotes": {"arrayValue": {}},
                "meta": {"mapValue": {"fields": {"year": {"integerValue": "1965"}}}}
            },
            "createTime": "2024-03-05T10:00:00Z"
        });

        let doc = decode_document(&raw).unwrap();
        assert_eq!(
            Value::Object(doc),
            json!({
                "title": "Dune",
                "pages": 412,
                "rating": 4.5,
                "isFavorite": true,
                "dateRead": null,
                "quotes": [],
                "meta": {"year": 1965}
            })
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_value(&json!("plain")).is_err());
        assert!(decode_value(&json!({"integerValue": "abc"})).is_err());
        assert!(decode_value(&json!({"mysteryValue": 1})).is_err());
    }

    #[test]
    fn test_error_for_status() {
        let body = r#"{"error":{"code":403,"message":"Missing or insufficient permissions.","status":"PERMISSION_DENIED"}}"#;
        match error_for_status(StatusCode::FORBIDDEN, body, "users/u1/books") {
            AppError::Storage(msg) => assert!(msg.starts_with("PERMISSION_DENIED")),
            other => panic!("unexpected error: {:?}", other),
        }

        assert!(matches!(
            error_for_status(StatusCode::NOT_FOUND, "", "users/u1/books/x"),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::UNAUTHORIZED, "", "x"),
            AppError::Unauthenticated
        ));
        assert!(matches!(
            error_for_status(StatusCode::SERVICE_UNAVAILABLE, "oops", "x"),
            AppError::Network(_)
        ));
    }
}
