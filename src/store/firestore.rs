//! Document store over the Firestore REST API.
//!
//! Documents live at `{base}/projects/{project}/databases/(default)/documents/{collection}/{id}`
//! and every value is wrapped in its type (`stringValue`, `mapValue`, ...).
//! A merge write is a PATCH with an update mask listing the leaf field paths
//! of the data being written, an overwrite is a PATCH without mask.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Map, Value};
use spdlog::debug;

use crate::error::{Error, Result};
use crate::store::{Document, DocumentStore, SetOptions};

pub struct FirestoreStore {
    documents_url: String,
    id_token: Option<String>,
    client: reqwest::Client,
}

impl FirestoreStore {
    pub fn new(base_url: &str, project_id: &str, id_token: Option<String>) -> Self {
        FirestoreStore {
            documents_url: format!("{}/projects/{}/databases/(default)/documents",
                                   base_url.trim_end_matches('/'), project_id),
            id_token,
            client: reqwest::Client::new(),
        }
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.documents_url, collection, id)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.id_token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

async fn api_error(response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
    Error::api(status, message)
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let url = self.document_url(collection, id);
        debug!("GET {}", url);
        let response = self.authorized(self.client.get(&url)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: Value = response.json().await?;
        let fields = match body.get("fields") {
            Some(Value::Object(fields)) => decode_fields(fields),
            _ => Map::new(),
        };
        Ok(Some(fields))
    }

    async fn set_document(&self, collection: &str, id: &str, data: Document, options: SetOptions) -> Result<()> {
        let url = self.document_url(collection, id);
        let mut request = self.client.patch(&url);
        if options.merge {
            let mask: Vec<(&str, String)> = leaf_paths(&data).into_iter()
                .map(|p| ("updateMask.fieldPaths", p))
                .collect();
            request = request.query(&mask);
        }

        debug!("PATCH {} (merge: {})", url, options.merge);
        let body = json!({ "fields": encode_fields(&data) });
        let response = self.authorized(request).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }
}

pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) if n.is_i64() || n.is_u64() => json!({ "integerValue": n.to_string() }),
        Value::Number(n) => json!({ "doubleValue": n }),
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

fn encode_fields(map: &Map<String, Value>) -> Value {
    let fields: Map<String, Value> = map.iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect();
    Value::Object(fields)
}

pub fn decode_value(value: &Value) -> Value {
    let Some(typed) = value.as_object() else {
        return Value::Null;
    };
    let Some((kind, inner)) = typed.iter().next() else {
        return Value::Null;
    };

    match kind.as_str() {
        "booleanValue" => inner.clone(),
        "integerValue" => match inner {
            Value::String(s) => s.parse::<i64>().map(Value::from).unwrap_or(Value::Null),
            other => other.clone(),
        },
        "doubleValue" => inner.clone(),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "arrayValue" => {
            let values = inner.get("values")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(decode_value).collect())
                .unwrap_or_default();
            Value::Array(values)
        }
        "mapValue" => match inner.get("fields") {
            Some(Value::Object(fields)) => Value::Object(decode_fields(fields)),
            _ => Value::Object(Map::new()),
        },
        "geoPointValue" => inner.clone(),
        _ => Value::Null,
    }
}

fn decode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields.iter()
        .map(|(k, v)| (k.clone(), decode_value(v)))
        .collect()
}

fn quote_segment(segment: &str) -> String {
    let mut chars = segment.chars();
    let simple = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        segment.to_string()
    } else {
        format!("`{}`", segment.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

/// Field paths touched by a merge write. Non empty maps are descended into,
/// everything else (arrays included) is replaced as a whole.
pub fn leaf_paths(map: &Map<String, Value>) -> Vec<String> {
    let mut paths = vec![];
    for (key, value) in map {
        let segment = quote_segment(key);
        match value {
            Value::Object(inner) if !inner.is_empty() => {
                for path in leaf_paths(inner) {
                    paths.push(format!("{}.{}", segment, path));
                }
            }
            _ => paths.push(segment),
        }
    }
    paths
}
