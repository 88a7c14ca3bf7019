//! This module provides clients for the hosted identity service and document store, through their REST APIs

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Map, Number, Value};
use url::Url;

use crate::config::BackendConfig;
use crate::error::IdentityErrorCode;
use crate::identity::Identity;
use crate::traits::{AuthStateHub, AuthStateReceiver, IdentityService};
use crate::traits::{Document, DocumentStore, FieldFilter, StoreError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}


/// The id token of the signed-in user, shared between a [`RestIdentity`] and the [`RestStore`]s it authorizes
#[derive(Clone, Debug, Default)]
pub struct TokenHandle {
    token: Arc<Mutex<Option<String>>>,
}

impl TokenHandle {
    pub fn get(&self) -> Option<String> {
        lock(&self.token).clone()
    }

    fn set(&self, token: Option<String>) {
        *lock(&self.token) = token;
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.get() {
            None => request,
            Some(token) => request.bearer_auth(token),
        }
    }
}


/// An id token issued by a federated provider (e.g. obtained by a browser popup), to be exchanged for a session
#[derive(Clone, Debug)]
pub struct FederatedCredential {
    /// e.g. `google.com`
    pub provider_id: String,
    pub id_token: String,
    /// The URI the provider redirected to
    pub request_uri: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthReply {
    id_token: String,
    local_id: String,
    #[serde(default)]
    email: String,
}

#[derive(Deserialize)]
struct ErrorReply {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}


/// An [`IdentityService`] that talks to the Identity Toolkit REST API
pub struct RestIdentity {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
    federated: Option<FederatedCredential>,
    token: TokenHandle,
    hub: Mutex<AuthStateHub>,
}

impl RestIdentity {
    /// Create a client. This does not start a connection
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.identity_endpoint.clone(),
            api_key: config.api_key.clone(),
            federated: None,
            token: TokenHandle::default(),
            hub: Mutex::new(AuthStateHub::default()),
        }
    }

    /// Use this credential for federated sign-ins. Without one, federated sign-ins are refused
    pub fn with_federated_credential(mut self, credential: FederatedCredential) -> Self {
        self.federated = Some(credential);
        self
    }

    /// A handle on the id token, to give to a [`RestStore`]
    pub fn token(&self) -> TokenHandle {
        self.token.clone()
    }

    async fn call(&self, method: &str, body: Value) -> Result<Identity, IdentityErrorCode> {
        let mut url = self.endpoint.join(&format!("./accounts:{}", method))
            .map_err(|err| IdentityErrorCode::Other(err.to_string()))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);

        let response = self.http.post(url)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                log::warn!("Unable to reach the identity service: {}", err);
                IdentityErrorCode::from_code("auth/network-request-failed")
            })?;

        if response.status().is_success() == false {
            let status = response.status();
            let code = match response.json::<ErrorReply>().await {
                Ok(reply) => reply.error.message,
                Err(_) => format!("http-{}", status.as_u16()),
            };
            return Err(IdentityErrorCode::from_code(&code));
        }

        let reply: AuthReply = response.json().await
            .map_err(|err| IdentityErrorCode::Other(format!("invalid reply ({})", err)))?;
        let identity = Identity::new(reply.local_id, reply.email);

        self.token.set(Some(reply.id_token));
        lock(&self.hub).set(Some(identity.clone()));
        Ok(identity)
    }
}

#[async_trait]
impl IdentityService for RestIdentity {
    async fn create_account_with_password(&self, email: &str, password: &str) -> Result<Identity, IdentityErrorCode> {
        self.call("signUp", json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        })).await
    }

    async fn sign_in_with_federated_popup(&self) -> Result<Identity, IdentityErrorCode> {
        let credential = match &self.federated {
            None => return Err(IdentityErrorCode::OperationNotAllowed),
            Some(credential) => credential,
        };
        let post_body = format!("id_token={}&providerId={}", credential.id_token, credential.provider_id);
        self.call("signInWithIdp", json!({
            "postBody": post_body,
            "requestUri": credential.request_uri,
            "returnSecureToken": true,
        })).await
    }

    async fn sign_out(&self) -> Result<(), IdentityErrorCode> {
        // Id tokens are stateless: forgetting it is all there is to do
        self.token.set(None);
        lock(&self.hub).set(None);
        Ok(())
    }

    fn subscribe(&self) -> AuthStateReceiver {
        lock(&self.hub).subscribe()
    }
}



/// A [`DocumentStore`] that talks to the Firestore REST API
pub struct RestStore {
    http: reqwest::Client,
    /// `.../projects/<id>/databases/(default)/documents/`
    documents_url: Url,
    api_key: String,
    token: TokenHandle,
}

#[derive(Deserialize)]
struct RemoteDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Deserialize)]
struct QueryReply {
    document: Option<RemoteDocument>,
}

impl RemoteDocument {
    fn into_document(self) -> Document {
        let id = self.name.rsplit('/').next().unwrap_or_default().to_string();
        Document { id, fields: decode_fields(&self.fields) }
    }
}

impl RestStore {
    /// Create a client. This does not start a connection.
    ///
    /// Requests are authorized with the id token of `token`, when there is one
    pub fn new(config: &BackendConfig, token: TokenHandle) -> Result<Self, url::ParseError> {
        let documents_url = config.firestore_endpoint
            .join(&format!("./projects/{}/databases/(default)/documents/", config.project_id))?;
        Ok(Self {
            http: reqwest::Client::new(),
            documents_url,
            api_key: config.api_key.clone(),
            token,
        })
    }

    fn document_url(&self, collection: &str, id: Option<&str>) -> Result<Url, StoreError> {
        let path = match id {
            None => format!("./{}", collection),
            Some(id) => format!("./{}/{}", collection, id),
        };
        let mut url = self.documents_url.join(&path)?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = self.token.authorize(request).send().await?;
        if response.status().is_success() == false {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(format!("Unexpected HTTP status code {:?}: {}", status, text).into());
        }
        Ok(response)
    }
}

#[async_trait]
impl DocumentStore for RestStore {
    async fn insert(&self, collection: &str, fields: Map<String, Value>) -> Result<String, StoreError> {
        let url = self.document_url(collection, None)?;
        let body = json!({ "fields": encode_fields(&fields) });
        let response = self.send(self.http.post(url).json(&body)).await?;
        let created: RemoteDocument = response.json().await?;
        Ok(created.into_document().id)
    }

    async fn update(&self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        let mut url = self.document_url(collection, Some(id))?;
        {
            let mut query = url.query_pairs_mut();
            for field in fields.keys() {
                query.append_pair("updateMask.fieldPaths", field);
            }
            query.append_pair("currentDocument.exists", "true");
        }
        let body = json!({ "fields": encode_fields(&fields) });
        self.send(self.http.patch(url).json(&body)).await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let url = self.document_url(collection, Some(id))?;
        self.send(self.http.delete(url)).await?;
        Ok(())
    }

    async fn query(&self, collection: &str, filter: &FieldFilter) -> Result<Vec<Document>, StoreError> {
        // `documents_url` ends with "documents/", and the query endpoint is "documents:runQuery"
        let mut url = self.documents_url.join("../documents:runQuery")?;
        url.query_pairs_mut().append_pair("key", &self.api_key);

        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": filter.field },
                        "op": "EQUAL",
                        "value": encode_value(&filter.value),
                    }
                }
            }
        });
        let response = self.send(self.http.post(url).json(&body)).await?;
        let replies: Vec<QueryReply> = response.json().await?;

        Ok(replies.into_iter()
            .filter_map(|reply| reply.document)
            .map(RemoteDocument::into_document)
            .collect())
    }
}



/// Convert plain JSON fields into Firestore typed values
pub fn encode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields.iter()
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect()
}

pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            // Firestore sends and expects 64-bit integers as strings
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(values) => json!({ "arrayValue": { "values": values.iter().map(encode_value).collect::<Vec<_>>() } }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Convert Firestore typed values into plain JSON fields
pub fn decode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields.iter()
        .map(|(key, value)| (key.clone(), decode_value(value)))
        .collect()
}

pub fn decode_value(value: &Value) -> Value {
    let (kind, inner) = match value.as_object().and_then(|map| map.iter().next()) {
        Some(pair) => pair,
        None => {
            log::warn!("Unexpected Firestore value {}", value);
            return Value::Null;
        },
    };

    match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => Value::Bool(inner.as_bool().unwrap_or_default()),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                other => other.as_i64(),
            };
            parsed.map(|i| Value::Number(i.into())).unwrap_or(Value::Null)
        },
        "doubleValue" => inner.as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "arrayValue" => {
            let values = inner.get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect())
                .unwrap_or_default();
            Value::Array(values)
        },
        "mapValue" => {
            let fields = inner.get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .unwrap_or_default();
            Value::Object(fields)
        },
        other => {
            log::warn!("Unsupported Firestore value type {}, ignoring it", other);
            Value::Null
        },
    }
}
