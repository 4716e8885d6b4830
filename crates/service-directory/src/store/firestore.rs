//! Firestore Document Store
//!
//! `DocumentStore` over the Firestore REST API (v1). Works against the
//! hosted service or against the local emulator. Hosted requests carry
//! either a fixed bearer token or one fetched from the metadata server,
//! cached until shortly before it expires.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use super::{Direction, Document, DocumentStore, FieldValue, Fields, GeoPoint, Query};
use crate::error::{DirectoryError, Result};

const HOSTED_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";
const METADATA_TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

/// Fetched tokens are renewed this long before they expire
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Firestore connection settings
#[derive(Clone, Debug)]
pub struct FirestoreConfig {
    pub project_id: String,

    /// Database id, usually `(default)`
    pub database: String,

    /// `host:port` of a local emulator, if any
    pub emulator_host: Option<String>,

    /// Fixed OAuth access token; it is not refreshed
    pub access_token: Option<String>,

    /// `host[:port]` of the metadata server that issues access tokens
    pub metadata_host: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            database: "(default)".into(),
            emulator_host: None,
            access_token: None,
            metadata_host: None,
            timeout_secs: 30,
        }
    }
}

impl FirestoreConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Default::default()
        }
    }

    /// Read `FIRESTORE_*` variables. Without an emulator or a fixed token,
    /// tokens come from the metadata server (`GCE_METADATA_HOST` overrides it)
    pub fn from_env() -> Result<Self> {
        let project_id = std::env::var("FIRESTORE_PROJECT_ID")
            .or_else(|_| std::env::var("GOOGLE_CLOUD_PROJECT"))
            .map_err(|_| DirectoryError::Config("FIRESTORE_PROJECT_ID is not set".into()))?;
        let database = std::env::var("FIRESTORE_DATABASE").unwrap_or_else(|_| "(default)".into());
        let timeout_secs = std::env::var("FIRESTORE_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(30);

        let emulator_host = std::env::var("FIRESTORE_EMULATOR_HOST").ok();
        let access_token = std::env::var("FIRESTORE_ACCESS_TOKEN").ok();
        let metadata_host = if emulator_host.is_none() && access_token.is_none() {
            let host = std::env::var("GCE_METADATA_HOST");
            Some(host.unwrap_or_else(|_| DEFAULT_METADATA_HOST.into()))
        } else {
            None
        };

        Ok(Self {
            project_id,
            database,
            emulator_host,
            access_token,
            metadata_host,
            timeout_secs,
        })
    }

    /// Resource name prefix of every document
    fn documents_name(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents",
            self.project_id, self.database
        )
    }

    fn base_url(&self) -> String {
        self.emulator_host
            .as_ref()
            .map_or_else(|| HOSTED_BASE_URL.to_string(), |host| format!("http://{host}/v1"))
    }

    fn fixed_bearer(&self) -> Option<&str> {
        match (&self.access_token, &self.emulator_host) {
            (Some(token), _) => Some(token),
            // the emulator treats "owner" as an admin credential
            (None, Some(_)) => Some("owner"),
            (None, None) => None,
        }
    }
}

/// Token issued by the metadata server
#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Firestore REST client
pub struct FirestoreStore {
    client: reqwest::Client,
    config: FirestoreConfig,
    token: Mutex<Option<CachedToken>>,
}

impl FirestoreStore {
    pub fn from_config(config: FirestoreConfig) -> Result<Self> {
        if config.project_id.is_empty() {
            return Err(DirectoryError::Config("Firestore project id is empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config,
            token: Mutex::new(None),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_config(FirestoreConfig::from_env()?)
    }

    fn documents_url(&self) -> String {
        format!("{}/{}", self.config.base_url(), self.config.documents_name())
    }

    /// Token for the next request, if any
    async fn bearer(&self) -> Result<Option<String>> {
        if let Some(token) = self.config.fixed_bearer() {
            return Ok(Some(token.to_string()));
        }
        match &self.config.metadata_host {
            Some(host) => self.metadata_token(host).await.map(Some),
            None => Ok(None),
        }
    }

    async fn metadata_token(&self, host: &str) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached
            .as_ref()
            .filter(|t| Instant::now() + TOKEN_REFRESH_MARGIN < t.expires_at)
        {
            return Ok(token.value.clone());
        }

        let response = self
            .client
            .get(format!("http://{host}{METADATA_TOKEN_PATH}"))
            .header("Metadata-Flavor", "Google")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Store(format!(
                "metadata server refused an access token: {status}"
            )));
        }
        let token: AccessToken = response.json().await?;
        tracing::debug!(expires_in = token.expires_in, "Fetched Firestore access token");

        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(token.access_token)
    }

    async fn request(
        &self,
        method: reqwest::Method,
        url: String,
    ) -> Result<reqwest::RequestBuilder> {
        let builder = self.client.request(method, url);
        Ok(match self.bearer().await? {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<Option<Value>> {
        let response = builder.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Err(DirectoryError::Store(format!("{status}: {body}")));
        }
        Ok(Some(serde_json::from_str(&body)?))
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let url = format!("{}/{collection}/{id}", self.documents_url());
        match self.send(self.request(reqwest::Method::GET, url).await?).await? {
            Some(body) => Ok(Some(decode_document(serde_json::from_value(body)?)?)),
            None => Ok(None),
        }
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>> {
        if query.limit_to_last && query.order_by.is_none() {
            return Err(DirectoryError::InvalidQuery(
                "limit_to_last requires an order_by clause".into(),
            ));
        }

        let (parent, _) = query.parent_and_collection_id();
        let url = if parent.is_empty() {
            format!("{}:runQuery", self.documents_url())
        } else {
            format!("{}/{parent}:runQuery", self.documents_url())
        };

        let body = json!({ "structuredQuery": structured_query(query) });
        let request = self.request(reqwest::Method::POST, url).await?.json(&body);
        let rows: Vec<RunQueryRow> = match self.send(request).await? {
            Some(value) => serde_json::from_value(value)?,
            None => Vec::new(),
        };

        let mut documents = rows
            .into_iter()
            .filter_map(|row| row.document)
            .map(decode_document)
            .collect::<Result<Vec<_>>>()?;

        if query.limit_to_last {
            documents.reverse();
        }
        Ok(documents)
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<String> {
        let url = format!("{}/{collection}", self.documents_url());
        let body = json!({ "fields": encode_fields(&fields) });
        let request = self.request(reqwest::Method::POST, url).await?.json(&body);
        let created = self
            .send(request)
            .await?
            .ok_or_else(|| DirectoryError::not_found("collection", collection))?;

        let document: WireDocument = serde_json::from_value(created)?;
        Ok(document_id(&document.name).to_string())
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        let url = format!("{}/{collection}/{id}", self.documents_url());
        let body = json!({ "fields": encode_fields(&fields) });
        let request = self.request(reqwest::Method::PATCH, url).await?.json(&body);
        self.send(request)
            .await?
            .ok_or_else(|| DirectoryError::not_found("document", format!("{collection}/{id}")))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "Firestore"
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct WireDocument {
    name: String,
    #[serde(default)]
    fields: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RunQueryRow {
    document: Option<WireDocument>,
}

fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Build a `StructuredQuery`; limit-to-last flips the ordering, the caller
/// reverses the rows afterwards
fn structured_query(query: &Query) -> Value {
    let (_, collection_id) = query.parent_and_collection_id();
    let mut structured = json!({ "from": [{ "collectionId": collection_id }] });

    let filters: Vec<Value> = query
        .filters
        .iter()
        .map(|f| {
            json!({ "fieldFilter": {
                "field": { "fieldPath": f.field },
                "op": "EQUAL",
                "value": encode_value(&f.value),
            }})
        })
        .collect();
    match filters.len() {
        0 => {}
        1 => structured["where"] = filters[0].clone(),
        _ => {
            structured["where"] = json!({
                "compositeFilter": { "op": "AND", "filters": filters }
            });
        }
    }

    if let Some(order) = &query.order_by {
        let direction = if query.limit_to_last {
            order.direction.reversed()
        } else {
            order.direction
        };
        let direction = match direction {
            Direction::Ascending => "ASCENDING",
            Direction::Descending => "DESCENDING",
        };
        structured["orderBy"] = json!([{
            "field": { "fieldPath": order.field },
            "direction": direction,
        }]);
    }

    if let Some(limit) = query.limit {
        structured["limit"] = json!(limit);
    }

    structured
}

fn encode_fields(fields: &Fields) -> Value {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect::<serde_json::Map<_, _>>()
        .into()
}

fn encode_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => json!({ "nullValue": null }),
        FieldValue::Boolean(b) => json!({ "booleanValue": b }),
        FieldValue::Integer(i) => json!({ "integerValue": i.to_string() }),
        FieldValue::Double(d) => json!({ "doubleValue": d }),
        FieldValue::Timestamp(t) => json!({ "timestampValue": t.to_rfc3339() }),
        FieldValue::String(s) => json!({ "stringValue": s }),
        FieldValue::GeoPoint(p) => json!({
            "geoPointValue": { "latitude": p.latitude, "longitude": p.longitude }
        }),
        FieldValue::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        FieldValue::Map(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

fn decode_document(wire: WireDocument) -> Result<Document> {
    let fields = decode_fields(&wire.fields).map_err(|reason| DirectoryError::InvalidDocument {
        path: wire.name.clone(),
        reason,
    })?;
    Ok(Document::new(document_id(&wire.name), fields))
}

fn decode_fields(fields: &serde_json::Map<String, Value>) -> std::result::Result<Fields, String> {
    fields
        .iter()
        .map(|(k, v)| decode_value(v).map(|v| (k.clone(), v)))
        .collect()
}

fn decode_value(value: &Value) -> std::result::Result<FieldValue, String> {
    let Some((kind, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
        return Err(format!("malformed value {value}"));
    };

    match kind.as_str() {
        "nullValue" => Ok(FieldValue::Null),
        "booleanValue" => inner.as_bool().map(FieldValue::Boolean).ok_or_else(|| kind.clone()),
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse().ok())
            .or_else(|| inner.as_i64())
            .map(FieldValue::Integer)
            .ok_or_else(|| format!("bad integer {inner}")),
        "doubleValue" => inner
            .as_f64()
            .or_else(|| inner.as_str().and_then(|s| s.parse().ok()))
            .map(FieldValue::Double)
            .ok_or_else(|| format!("bad double {inner}")),
        "timestampValue" => inner
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| FieldValue::Timestamp(t.with_timezone(&Utc)))
            .ok_or_else(|| format!("bad timestamp {inner}")),
        "stringValue" | "referenceValue" | "bytesValue" => inner
            .as_str()
            .map(|s| FieldValue::String(s.to_string()))
            .ok_or_else(|| format!("bad string {inner}")),
        "geoPointValue" => Ok(FieldValue::GeoPoint(GeoPoint {
            latitude: inner["latitude"].as_f64().unwrap_or_default(),
            longitude: inner["longitude"].as_f64().unwrap_or_default(),
        })),
        "arrayValue" => inner["values"]
            .as_array()
            .map_or_else(|| Ok(Vec::new()), |items| items.iter().map(decode_value).collect())
            .map(FieldValue::Array),
        "mapValue" => inner["fields"]
            .as_object()
            .map_or_else(|| Ok(Fields::new()), decode_fields)
            .map(FieldValue::Map),
        other => Err(format!("unsupported value type {other}")),
    }
}
