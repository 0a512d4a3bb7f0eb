//! Cloud Firestore backend over the v1 REST API.
//!
//! Firestore documents carry typed values (`{"integerValue": "5"}`,
//! `{"mapValue": {"fields": {..}}}`, ...). This module converts them to and
//! from plain JSON so the rest of the crate only sees `Record`s.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Number, Value};
use tracing::{debug, info, warn};

use super::{generate_document_id, DataStore, Document, DocumentId, NewDocument, Record, StoreError};

// ============================================================================
// Constants
// ============================================================================

/// Production Firestore endpoint.
const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Documents requested per list page.
const PAGE_SIZE: u32 = 300;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Server value used for the creation timestamp transform.
const REQUEST_TIME: &str = "REQUEST_TIME";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<FirestoreDocument>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FirestoreDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Serialize)]
struct CommitRequest {
    writes: Vec<Write>,
}

#[derive(Debug, Serialize)]
struct Write {
    update: FirestoreDocument,
    #[serde(rename = "updateTransforms", skip_serializing_if = "Vec::is_empty")]
    update_transforms: Vec<FieldTransform>,
    #[serde(rename = "currentDocument")]
    current_document: Precondition,
}

#[derive(Debug, Serialize)]
struct FieldTransform {
    #[serde(rename = "fieldPath")]
    field_path: String,
    #[serde(rename = "setToServerValue")]
    set_to_server_value: &'static str,
}

#[derive(Debug, Serialize)]
struct Precondition {
    exists: bool,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(rename = "commitTime")]
    commit_time: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

/// Firestore REST client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct FirestoreStore {
    client: Client,
    base_url: String,
    project_id: String,
    database: String,
    token: Option<String>,
}

impl FirestoreStore {
    pub fn new(project_id: &str, database: &str) -> Result<Self, StoreError> {
        if project_id.trim().is_empty() {
            return Err(StoreError::Config("Firestore project id is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: FIRESTORE_BASE_URL.to_string(),
            project_id: project_id.to_string(),
            database: if database.is_empty() {
                "(default)".to_string()
            } else {
                database.to_string()
            },
            token: None,
        })
    }

    /// Set the bearer token sent with every request.
    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }

    /// Talk to a local Firestore emulator (`host:port`) instead of production.
    pub fn with_emulator_host(mut self, host: &str) -> Self {
        self.base_url = format!("http://{}", host.trim_end_matches('/'));
        self
    }

    fn database_path(&self) -> String {
        format!("projects/{}/databases/{}/documents", self.project_id, self.database)
    }

    fn documents_url(&self) -> String {
        format!("{}/v1/{}", self.base_url, self.database_path())
    }

    fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.database_path(), collection, id)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, StoreError> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| StoreError::Config(format!("Invalid access token: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>, StoreError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(StoreError::from_status(status, &body))
        }
    }

    /// Send a request built by `build`, backing off on 429 responses.
    async fn send<T, F>(&self, url: &str, build: F) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        let build = &build;
        let initial_backoff = Duration::from_millis(INITIAL_BACKOFF_MS);
        retry_rate_limited(url, initial_backoff, move || async move {
            let response = build().headers(self.auth_headers()?).send().await?;
            match Self::check_response_for_retry(response).await? {
                Some(response) => response
                    .json()
                    .await
                    .map(Some)
                    .map_err(|e| StoreError::InvalidResponse(format!("{}: {}", url, e))),
                None => Ok(None),
            }
        })
        .await
    }
}

/// Run `attempt` until it yields a value. `Ok(None)` means rate limited:
/// wait, double the delay, and try again, up to `MAX_RATE_LIMIT_RETRIES` times.
async fn retry_rate_limited<T, F, Fut>(
    url: &str,
    initial_backoff: Duration,
    mut attempt: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, StoreError>>,
{
    let mut retries = 0;
    let mut backoff = initial_backoff;

    loop {
        match attempt().await? {
            Some(value) => return Ok(value),
            None => {
                retries += 1;
                if retries > MAX_RATE_LIMIT_RETRIES {
                    return Err(StoreError::RateLimited);
                }
                warn!(url = url, retry = retries, backoff_ms = backoff.as_millis() as u64, "Rate limited, backing off");
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }
    }
}

/// Fetch pages until one comes back without a `nextPageToken`.
/// `fetch_page` receives the token of the page to request (`None` first).
async fn collect_pages<F, Fut>(mut fetch_page: F) -> Result<Vec<FirestoreDocument>, StoreError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<ListDocumentsResponse, StoreError>>,
{
    let mut documents = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let page = fetch_page(page_token.take()).await?;
        documents.extend(page.documents);

        match page.next_page_token.filter(|t| !t.is_empty()) {
            Some(token) => page_token = Some(token),
            None => return Ok(documents),
        }
    }
}

#[async_trait]
impl DataStore for FirestoreStore {
    fn backend_name(&self) -> &'static str {
        "firestore"
    }

    async fn fetch_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let url = format!("{}/{}", self.documents_url(), collection);
        let url = url.as_str();

        let pages = collect_pages(move |page_token| async move {
            let mut query = vec![("pageSize", PAGE_SIZE.to_string())];
            if let Some(token) = page_token {
                query.push(("pageToken", token));
            }

            let page: ListDocumentsResponse = self
                .send(url, || self.client.get(url).query(&query))
                .await?;
            debug!(collection, count = page.documents.len(), "Fetched Firestore page");
            Ok(page)
        })
        .await?;

        let documents: Vec<Document> = pages.into_iter().map(into_document).collect();

        Ok(documents)
    }

    async fn insert(&self, collection: &str, document: NewDocument) -> Result<DocumentId, StoreError> {
        let id = generate_document_id();
        let url = format!("{}:commit", self.documents_url());

        let body = CommitRequest {
            writes: vec![Write {
                update: FirestoreDocument {
                    name: self.document_name(collection, &id),
                    fields: encode_fields(&document.fields),
                },
                update_transforms: document
                    .server_timestamp
                    .into_iter()
                    .map(|field_path| FieldTransform {
                        field_path,
                        set_to_server_value: REQUEST_TIME,
                    })
                    .collect(),
                current_document: Precondition { exists: false },
            }],
        };

        let response: CommitResponse = self
            .send(&url, || self.client.post(&url).json(&body))
            .await?;

        info!(collection, id = %id, commit_time = ?response.commit_time, "Document created");
        Ok(id)
    }
}

// ============================================================================
// Value conversion
// ============================================================================

fn into_document(doc: FirestoreDocument) -> Document {
    let id = doc
        .name
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();
    Document {
        id,
        fields: decode_fields(&doc.fields),
    }
}

/// Convert a Firestore `fields` map to plain JSON.
pub fn decode_fields(fields: &Map<String, Value>) -> Record {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), decode_value(value)))
        .collect()
}

/// Convert one typed Firestore value to plain JSON.
///
/// Unrecognised shapes decode to `null`.
pub fn decode_value(value: &Value) -> Value {
    let Some(typed) = value.as_object() else {
        return Value::Null;
    };
    let Some((kind, inner)) = typed.iter().next() else {
        return Value::Null;
    };

    match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => inner.as_bool().map(Value::Bool).unwrap_or(Value::Null),
        "integerValue" => match inner {
            Value::String(s) => s
                .parse::<i64>()
                .map(|i| Value::Number(i.into()))
                .unwrap_or(Value::Null),
            Value::Number(n) => Value::Number(n.clone()),
            _ => Value::Null,
        },
        // NaN and infinities come back as strings and have no JSON form.
        "doubleValue" => inner
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "geoPointValue" => json!({
            "latitude": inner.get("latitude").cloned().unwrap_or(json!(0.0)),
            "longitude": inner.get("longitude").cloned().unwrap_or(json!(0.0)),
        }),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(
            inner
                .get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .unwrap_or_default(),
        ),
        other => {
            debug!(kind = other, "Unknown Firestore value type");
            Value::Null
        }
    }
}

/// Convert a plain JSON record to a Firestore `fields` map.
pub fn encode_fields(record: &Record) -> Map<String, Value> {
    record
        .iter()
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect()
}

/// Convert plain JSON to a typed Firestore value.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or(0.0) }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(values) => json!({
            "arrayValue": { "values": values.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}
