//! Google Cloud Firestore backend over the REST API.
//!
//! # Authentication
//!
//! A service-account key (inline JSON or a key file) is exchanged for an
//! OAuth2 access token with the JWT-bearer grant. The token is cached and
//! refreshed a minute before it expires.
//!
//! # Writes
//!
//! Every payload becomes one `documents:commit` call holding a single
//! `update` write. Its `updateMask` lists `category`, `thumbUrl` and one
//! `content.<lang>` path per language in the payload, so languages absent
//! from this run keep their stored value. `updatedAt` is set by the server
//! through a `REQUEST_TIME` field transform.

use super::{DocumentStore, document_path};
use crate::error::{NewsError, Result};
use crate::models::SubjectPayload;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const TOKEN_LIFETIME_SECS: i64 = 3600;
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// The fields of a Google service-account key file the store needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .finish()
    }
}

impl ServiceAccount {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| NewsError::Config(format!("invalid service account JSON: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            NewsError::Config(format!("cannot read service account key {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    TOKEN_LIFETIME_SECS as u64
}

struct CachedToken {
    token: String,
    refresh_at: Instant,
}

pub struct FirestoreStore {
    http: reqwest::Client,
    account: ServiceAccount,
    encoding_key: EncodingKey,
    base_url: String,
    token: Mutex<Option<CachedToken>>,
}

impl fmt::Debug for FirestoreStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirestoreStore")
            .field("account", &self.account)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl FirestoreStore {
    pub fn new(account: ServiceAccount, timeout: Duration) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            account,
            encoding_key,
            base_url: FIRESTORE_BASE_URL.to_string(),
            token: Mutex::new(None),
        })
    }

    fn database_root(&self) -> String {
        format!("projects/{}/databases/(default)/documents", self.account.project_id)
    }

    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| Instant::now() < t.refresh_at) {
            return Ok(token.token.clone());
        }

        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: &self.account.client_email,
            scope: DATASTORE_SCOPE,
            aud: &self.account.token_uri,
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)?;

        let res = self
            .http
            .post(&self.account.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            return Err(NewsError::Auth(format!(
                "token exchange failed ({}): {}",
                status.as_u16(),
                res.text().await.unwrap_or_default()
            )));
        }
        let token: TokenResponse = res.json().await?;
        debug!(expires_in = token.expires_in, "Obtained Firestore access token");

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }
}

impl DocumentStore for FirestoreStore {
    #[instrument(level = "info", skip_all, fields(%date, %slug))]
    async fn merge_subject(&self, date: &str, slug: &str, payload: &SubjectPayload) -> Result<()> {
        let name = format!("{}/{}", self.database_root(), document_path(date, slug));
        let body = commit_body(&name, payload)?;
        let token = self.access_token().await?;

        let res = self
            .http
            .post(format!("{}/{}:commit", self.base_url, self.database_root()))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(NewsError::Api {
                status: status.as_u16(),
                message: res.text().await.unwrap_or_default(),
            });
        }
        info!(languages = payload.content.len(), "Saved Firestore document");
        Ok(())
    }
}

/// Build the `documents:commit` request body for one merge write.
fn commit_body(document_name: &str, payload: &SubjectPayload) -> Result<Value> {
    let mut fields = Map::new();
    let mut mask = vec!["category".to_string()];
    fields.insert("category".to_string(), json!({ "stringValue": payload.category }));

    if let Some(thumb) = &payload.thumb_url {
        fields.insert("thumbUrl".to_string(), json!({ "stringValue": thumb }));
        mask.push("thumbUrl".to_string());
    }

    let mut content = Map::new();
    for (code, generated) in &payload.content {
        content.insert(code.clone(), to_firestore_value(&serde_json::to_value(generated)?));
        mask.push(format!("content.{}", field_path_segment(code)));
    }
    if !content.is_empty() {
        fields.insert(
            "content".to_string(),
            json!({ "mapValue": { "fields": content } }),
        );
    }

    Ok(json!({
        "writes": [{
            "update": { "name": document_name, "fields": fields },
            "updateMask": { "fieldPaths": mask },
            "updateTransforms": [
                { "fieldPath": "updatedAt", "setToServerValue": "REQUEST_TIME" }
            ]
        }]
    }))
}

/// Quote a map key for use in a Firestore field path when it is not a plain identifier.
fn field_path_segment(key: &str) -> String {
    let mut chars = key.chars();
    let simple = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        key.to_string()
    } else {
        format!("`{}`", key.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

/// Encode plain JSON as a Firestore typed `Value`.
fn to_firestore_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(to_firestore_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => {
            let fields: Map<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), to_firestore_value(v)))
                .collect();
            json!({ "mapValue": { "fields": fields } })
        }
    }
}
