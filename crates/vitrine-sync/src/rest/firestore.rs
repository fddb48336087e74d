//! Document store over REST.
//!
//! ## Wire Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  document field   │ value                │ Product field               │
//! │  ─────────────────┼──────────────────────┼──────────────────────────── │
//! │  categoria        │ stringValue          │ category                    │
//! │  produto          │ stringValue          │ name                        │
//! │  preco            │ string/int/double    │ price (as typed)            │
//! │  timestamp        │ timestampValue       │ created_at (server time)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `listen` is emulated by polling: a background task lists the collection
//! every `poll_interval` and delivers a snapshot whenever the result
//! differs from the last delivered one. The first poll always delivers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use vitrine_core::{Credentials, NewProduct, Product};

use super::{error_from_response, transport_error, SessionTokens};
use crate::provider::{
    DocumentStore, ProviderError, ProviderResult, Registration, SnapshotCallback, SnapshotEvent,
    StoreConnection,
};

const PAGE_SIZE: &str = "300";

const FIELD_CATEGORY: &str = "categoria";
const FIELD_NAME: &str = "produto";
const FIELD_PRICE: &str = "preco";
const FIELD_TIMESTAMP: &str = "timestamp";

// =============================================================================
// Store
// =============================================================================

/// Document store entry point; `open` is local (no round-trip).
pub struct RestStore {
    http: reqwest::Client,
    tokens: SessionTokens,
    poll_interval: Duration,
    base: String,
}

impl RestStore {
    pub fn new(
        http: reqwest::Client,
        tokens: SessionTokens,
        poll_interval: Duration,
        base: impl Into<String>,
    ) -> Self {
        RestStore {
            http,
            tokens,
            poll_interval,
            base: base.into(),
        }
    }
}

#[async_trait]
impl DocumentStore for RestStore {
    async fn open(&self, credentials: &Credentials) -> ProviderResult<Arc<dyn StoreConnection>> {
        let project = credentials.project_id.trim();
        if project.is_empty() || project.contains('/') {
            return Err(ProviderError::new(
                "invalid-argument",
                format!("Invalid project id: {:?}", credentials.project_id),
            ));
        }

        let database = format!("projects/{}/databases/(default)", project);
        debug!(%database, "Opening REST store");
        Ok(Arc::new(RestConnection {
            http: self.http.clone(),
            tokens: self.tokens.clone(),
            api_key: credentials.api_key.clone(),
            base: self.base.clone(),
            database,
            poll_interval: self.poll_interval,
        }))
    }
}

// =============================================================================
// Connection
// =============================================================================

#[derive(Clone)]
pub struct RestConnection {
    http: reqwest::Client,
    tokens: SessionTokens,
    api_key: String,
    base: String,
    /// `projects/{id}/databases/(default)`
    database: String,
    poll_interval: Duration,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: HashMap<String, Value>,
}

impl RestConnection {
    fn url(&self, suffix: &str, params: &[(&str, &str)]) -> ProviderResult<Url> {
        let mut url = Url::parse(&format!("{}/{}/documents{}", self.base, self.database, suffix))
            .map_err(|e| ProviderError::new("invalid-argument", e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("key", &self.api_key);
            for (k, v) in params {
                query.append_pair(k, v);
            }
        }
        Ok(url)
    }

    async fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.tokens.bearer().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn list_page(&self, collection: &str, page: Option<&str>) -> ProviderResult<ListResponse> {
        let mut params = vec![("pageSize", PAGE_SIZE)];
        if let Some(page) = page {
            params.push(("pageToken", page));
        }
        let url = self.url(&format!("/{}", collection), &params)?;

        let response = self
            .authorize(self.http.get(url))
            .await
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| ProviderError::new("invalid-response", e.to_string()))
    }
}

#[async_trait]
impl StoreConnection for RestConnection {
    fn listen(&self, collection: &str, callback: SnapshotCallback) -> Registration {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            callback(Err(ProviderError::unavailable("No async runtime to poll on")));
            return Registration::noop();
        };

        let this = self.clone();
        let collection = collection.to_string();
        let handle = runtime.spawn(async move {
            let mut last: Option<SnapshotEvent> = None;
            let mut ticker = tokio::time::interval(this.poll_interval);
            loop {
                ticker.tick().await;
                let event = this.get(&collection).await;
                if last.as_ref() != Some(&event) {
                    if let Err(err) = &event {
                        warn!(collection = %collection, error = %err, "Poll failed");
                    }
                    callback(event.clone());
                    last = Some(event);
                }
            }
        });

        Registration::new(move || handle.abort())
    }

    async fn add(&self, collection: &str, record: NewProduct) -> ProviderResult<String> {
        let id = Uuid::new_v4().simple().to_string();
        let body = commit_body(&self.database, collection, &id, &record);
        let url = self.url(":commit", &[])?;

        let response = self
            .authorize(self.http.post(url))
            .await
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(id)
    }

    async fn get(&self, collection: &str) -> ProviderResult<Vec<Product>> {
        let mut products = Vec::new();
        let mut page: Option<String> = None;
        loop {
            let response = self.list_page(collection, page.as_deref()).await?;
            products.extend(response.documents.iter().map(document_to_product));
            match response.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page = Some(next),
                None => break,
            }
        }
        Ok(products)
    }
}

// =============================================================================
// Encoding
// =============================================================================

fn commit_body(database: &str, collection: &str, id: &str, record: &NewProduct) -> Value {
    let mut fields = Map::new();
    fields.insert(FIELD_CATEGORY.into(), json!({ "stringValue": record.category }));
    fields.insert(FIELD_NAME.into(), json!({ "stringValue": record.name }));
    fields.insert(FIELD_PRICE.into(), json!({ "stringValue": record.price }));

    json!({
        "writes": [{
            "update": {
                "name": format!("{}/documents/{}/{}", database, collection, id),
                "fields": fields,
            },
            "currentDocument": { "exists": false },
            "updateTransforms": [{
                "fieldPath": FIELD_TIMESTAMP,
                "setToServerValue": "REQUEST_TIME",
            }],
        }]
    })
}

fn string_field(fields: &HashMap<String, Value>, key: &str) -> String {
    let Some(value) = fields.get(key) else {
        return String::new();
    };
    if let Some(s) = value.get("stringValue").and_then(Value::as_str) {
        return s.to_string();
    }
    if let Some(s) = value.get("integerValue").and_then(Value::as_str) {
        return s.to_string();
    }
    if let Some(n) = value.get("doubleValue").and_then(Value::as_f64) {
        return n.to_string();
    }
    String::new()
}

fn document_to_product(document: &Document) -> Product {
    let id = document
        .name
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let created_at = document
        .fields
        .get(FIELD_TIMESTAMP)
        .and_then(|v| v.get("timestampValue"))
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc));

    Product {
        id,
        category: string_field(&document.fields, FIELD_CATEGORY),
        name: string_field(&document.fields, FIELD_NAME),
        price: string_field(&document.fields, FIELD_PRICE),
        created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::PERMISSION_DENIED;
    use crate::rest::stub::{test_client, StubServer};
    use crate::rest::TokenInfo;
    use vitrine_core::credentials::{resolve, CredentialSource};

    const DATABASE: &str = "projects/demo/databases/(default)";
    const DENIED: &str = r#"{"error":{"code":403,"message":"Missing or insufficient permissions.","status":"PERMISSION_DENIED"}}"#;

    fn listing(names: &[&str], next_page: Option<&str>) -> String {
        let documents: Vec<Value> = names
            .iter()
            .map(|name| {
                json!({
                    "name": format!("{}/documents/produto/{}", DATABASE, name),
                    "fields": { "produto": { "stringValue": name } },
                })
            })
            .collect();
        let mut body = json!({ "documents": documents });
        if let Some(token) = next_page {
            body["nextPageToken"] = json!(token);
        }
        body.to_string()
    }

    fn demo_credentials() -> Credentials {
        let mut source = CredentialSource::default();
        source.api_key = Some("AIzaKey".into());
        source.project_id = Some("demo".into());
        resolve(&source)
    }

    async fn connect(base: &str, poll_interval: Duration) -> (Arc<dyn StoreConnection>, SessionTokens) {
        let tokens = SessionTokens::new(test_client(), "AIzaKey".into(), "http://127.0.0.1:9");
        let store = RestStore::new(test_client(), tokens.clone(), poll_interval, base);
        (store.open(&demo_credentials()).await.unwrap(), tokens)
    }

    #[test]
    fn test_document_decoding() {
        let body = r#"{
            "documents": [
                {
                    "name": "projects/demo/databases/(default)/documents/produto/abc",
                    "fields": {
                        "categoria": {"stringValue": "bebidas"},
                        "produto": {"stringValue": "Suco"},
                        "preco": {"integerValue": "7"},
                        "timestamp": {"timestampValue": "2024-05-01T12:00:00.123456Z"}
                    }
                },
                {
                    "name": "projects/demo/databases/(default)/documents/produto/def",
                    "fields": {"preco": {"doubleValue": 2.5}}
                }
            ]
        }"#;
        let list: ListResponse = serde_json::from_str(body).unwrap();
        let products: Vec<Product> = list.documents.iter().map(document_to_product).collect();

        assert_eq!(products[0].id.as_deref(), Some("abc"));
        assert_eq!(products[0].category, "bebidas");
        assert_eq!(products[0].price, "7");
        assert!(products[0].created_at.is_some());

        assert_eq!(products[1].name, "");
        assert_eq!(products[1].price, "2.5");
        assert!(products[1].created_at.is_none());
    }

    #[test]
    fn test_empty_collection_decodes() {
        let list: ListResponse = serde_json::from_str("{}").unwrap();
        assert!(list.documents.is_empty());
        assert!(list.next_page_token.is_none());
    }

    #[test]
    fn test_commit_body_sets_server_timestamp() {
        let record = NewProduct {
            category: "bebidas".into(),
            name: "Suco".into(),
            price: "7.50".into(),
        };
        let body = commit_body(DATABASE, "produto", "id1", &record);
        let write = &body["writes"][0];

        assert_eq!(
            write["update"]["name"],
            "projects/demo/databases/(default)/documents/produto/id1"
        );
        assert_eq!(write["update"]["fields"]["categoria"]["stringValue"], "bebidas");
        assert!(write["update"]["fields"].get("timestamp").is_none());
        assert_eq!(write["updateTransforms"][0]["fieldPath"], "timestamp");
        assert_eq!(write["updateTransforms"][0]["setToServerValue"], "REQUEST_TIME");
    }

    #[tokio::test]
    async fn test_open_builds_database_path() {
        let tokens = SessionTokens::new(test_client(), "k".into(), "http://127.0.0.1:9");
        let store = RestStore::new(test_client(), tokens, Duration::from_secs(5), "http://127.0.0.1:9");
        let mut source = CredentialSource::default();
        source.project_id = Some("demo".into());
        assert!(store.open(&resolve(&source)).await.is_ok());

        source.project_id = Some("a/b".into());
        let err = store.open(&resolve(&source)).await.err().unwrap();
        assert_eq!(err.code, "invalid-argument");
    }

    #[tokio::test]
    async fn test_get_follows_pages_with_bearer() {
        let server = StubServer::start(vec![
            (200, listing(&["a"], Some("p2"))),
            (200, listing(&["b"], None)),
        ])
        .await;
        let (connection, tokens) = connect(&server.base, Duration::from_secs(5)).await;
        tokens.start(TokenInfo::new("id1".into(), "r1".into(), 3600)).await;

        let products = connection.get("produto").await.unwrap();
        let names: Vec<&str> = products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[0].target,
            "/projects/demo/databases/(default)/documents/produto?key=AIzaKey&pageSize=300"
        );
        assert!(requests[1].target.ends_with("&pageToken=p2"));
        assert_eq!(requests[0].authorization.as_deref(), Some("Bearer id1"));
    }

    #[tokio::test]
    async fn test_add_commits_and_maps_rejection() {
        let server = StubServer::start(vec![(200, "{}".into()), (403, DENIED.into())]).await;
        let (connection, _tokens) = connect(&server.base, Duration::from_secs(5)).await;
        let record = NewProduct {
            category: "bebidas".into(),
            name: "Suco".into(),
            price: "7".into(),
        };

        let id = connection.add("produto", record.clone()).await.unwrap();
        assert_eq!(id.len(), 32);

        let err = connection.add("produto", record).await.unwrap_err();
        assert_eq!(err.code, PERMISSION_DENIED);

        let requests = server.requests();
        assert_eq!(requests[0].method, "POST");
        assert!(requests[0]
            .target
            .starts_with("/projects/demo/databases/(default)/documents:commit?key="));
        assert!(requests[0].body.contains(&id));
        assert!(requests[0].authorization.is_none());
    }

    #[tokio::test]
    async fn test_listen_delivers_changes_only() {
        let one = listing(&["a"], None);
        let two = listing(&["a", "b"], None);
        let server = StubServer::start(vec![
            (200, one.clone()),
            (200, one),
            (200, two.clone()),
            (403, DENIED.into()),
            (200, two),
        ])
        .await;
        let (connection, _tokens) = connect(&server.base, Duration::from_millis(10)).await;

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let registration = connection.listen(
            "produto",
            Arc::new(move |event: SnapshotEvent| {
                let _ = tx.send(event);
            }),
        );

        let mut events = Vec::new();
        for _ in 0..4 {
            let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            events.push(event);
        }

        // The repeated first listing is not delivered twice.
        assert_eq!(events[0].as_ref().unwrap().len(), 1);
        assert_eq!(events[1].as_ref().unwrap().len(), 2);
        assert_eq!(events[2].as_ref().unwrap_err().code, PERMISSION_DENIED);
        // The loop survives the error and delivers the next listing.
        assert_eq!(events[3].as_ref().unwrap().len(), 2);
        assert!(server.requests().len() >= 5);

        registration.release();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let settled = server.requests().len();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(server.requests().len(), settled);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_list_url_contains_collection_and_key() {
        let connection = RestConnection {
            http: test_client(),
            tokens: SessionTokens::new(test_client(), "k".into(), "http://127.0.0.1:9"),
            api_key: "k".into(),
            base: "https://firestore.googleapis.com/v1".into(),
            database: DATABASE.into(),
            poll_interval: Duration::from_secs(5),
        };
        let url = connection.url("/produto", &[("pageSize", PAGE_SIZE)]).unwrap();
        assert!(url.path().ends_with("/documents/produto"));
        assert_eq!(url.query(), Some("key=k&pageSize=300"));
    }
}
