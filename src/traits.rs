//! The external services this crate relies on
//!
//! Two implementations of each are provided: an in-memory one in [`crate::memory`], and one that talks to
//! the hosted REST services in [`crate::client`].

use std::error::Error;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::identity::Identity;
use crate::error::IdentityErrorCode;

/// Errors reported by a [`DocumentStore`]
pub type StoreError = Box<dyn Error + Send + Sync>;

/// Every time the signed-in identity changes, the identity service sends the new one (or `None` when signed out)
pub type AuthStateSender = tokio::sync::mpsc::UnboundedSender<Option<Identity>>;
/// See [`AuthStateSender`]
pub type AuthStateReceiver = tokio::sync::mpsc::UnboundedReceiver<Option<Identity>>;

/// Create a channel for auth-state notifications
pub fn auth_state_channel() -> (AuthStateSender, AuthStateReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The signed-in identity of an [`IdentityService`], and who wants to know when it changes
#[derive(Debug, Default)]
pub struct AuthStateHub {
    current: Option<Identity>,
    subscribers: Vec<AuthStateSender>,
}

impl AuthStateHub {
    pub fn current(&self) -> Option<&Identity> {
        self.current.as_ref()
    }

    /// Change the signed-in identity. Subscribers are only notified in case it actually changed
    pub fn set(&mut self, identity: Option<Identity>) {
        if self.current == identity {
            return;
        }
        self.current = identity.clone();
        self.subscribers.retain(|sender| sender.send(identity.clone()).is_ok());
    }

    /// A new subscriber immediately receives the current state
    pub fn subscribe(&mut self) -> AuthStateReceiver {
        let (sender, receiver) = auth_state_channel();
        if sender.send(self.current.clone()).is_ok() {
            self.subscribers.push(sender);
        }
        receiver
    }
}


#[async_trait]
pub trait IdentityService {
    /// Create a new account. On success, the service becomes signed in with it
    async fn create_account_with_password(&self, email: &str, password: &str) -> Result<Identity, IdentityErrorCode>;
    /// Sign in through an external (federated) provider
    async fn sign_in_with_federated_popup(&self) -> Result<Identity, IdentityErrorCode>;
    async fn sign_out(&self) -> Result<(), IdentityErrorCode>;

    /// Register for auth-state-changed notifications.
    ///
    /// The current state is sent as soon as it is known, then every change is sent again.
    fn subscribe(&self) -> AuthStateReceiver;
}


/// A stored record: an id assigned by the store, and schemaless fields
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

/// The only kind of query we need: field equality
#[derive(Clone, Debug, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

impl FieldFilter {
    pub fn equals<S: ToString, V: Into<Value>>(field: S, value: V) -> Self {
        Self { field: field.to_string(), value: value.into() }
    }

    pub fn matches(&self, fields: &Map<String, Value>) -> bool {
        fields.get(&self.field) == Some(&self.value)
    }
}


/// A remote service that stores documents in named collections
#[async_trait]
pub trait DocumentStore {
    /// Store a new document and return the id the store assigned to it
    async fn insert(&self, collection: &str, fields: Map<String, Value>) -> Result<String, StoreError>;
    /// Merge `fields` into an existing document
    async fn update(&self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<(), StoreError>;
    /// Remove a document. Removing a document that does not exist is not an error
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
    async fn query(&self, collection: &str, filter: &FieldFilter) -> Result<Vec<Document>, StoreError>;
}
