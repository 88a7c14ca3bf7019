//! In-memory implementations of the external services
//!
//! They mimic the hosted services closely enough to be used in tests and demos, and their
//! failures can be scripted with a [`MockBehaviour`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::IdentityErrorCode;
use crate::identity::Identity;
use crate::mock_behaviour::MockBehaviour;
use crate::traits::{AuthStateHub, AuthStateReceiver, IdentityService};
use crate::traits::{Document, DocumentStore, FieldFilter, StoreError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn new_id() -> String {
    Uuid::new_v4().to_simple().to_string()
}


/// A document store that lives in memory.
///
/// Clones share the same data, so that a test can keep a handle on a store it gave away.
/// Documents of a collection are returned in insertion order.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    collections: Arc<Mutex<HashMap<String, Vec<Document>>>>,
    behaviour: Arc<Mutex<MockBehaviour>>,
    requests: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_behaviour(&self, behaviour: MockBehaviour) {
        *lock(&self.behaviour) = behaviour;
    }

    /// How many requests this store has received, successful or not
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Every document of a collection, regardless of who owns it
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        lock(&self.collections).get(collection).cloned().unwrap_or_default()
    }

    fn count_request(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, fields: Map<String, Value>) -> Result<String, StoreError> {
        self.count_request();
        lock(&self.behaviour).can_insert()?;

        let id = new_id();
        lock(&self.collections)
            .entry(collection.to_string())
            .or_default()
            .push(Document { id: id.clone(), fields });
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        self.count_request();
        lock(&self.behaviour).can_update()?;

        let mut collections = lock(&self.collections);
        let document = collections.get_mut(collection)
            .and_then(|documents| documents.iter_mut().find(|doc| doc.id == id));
        match document {
            None => Err(format!("No document to update: {}/{}", collection, id).into()),
            Some(document) => {
                for (key, value) in fields {
                    document.fields.insert(key, value);
                }
                Ok(())
            },
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.count_request();
        lock(&self.behaviour).can_delete()?;

        if let Some(documents) = lock(&self.collections).get_mut(collection) {
            documents.retain(|doc| doc.id != id);
        }
        Ok(())
    }

    async fn query(&self, collection: &str, filter: &FieldFilter) -> Result<Vec<Document>, StoreError> {
        self.count_request();
        lock(&self.behaviour).can_query()?;

        Ok(lock(&self.collections)
            .get(collection)
            .map(|documents| {
                documents.iter()
                    .filter(|doc| filter.matches(&doc.fields))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}



#[derive(Debug, Default)]
struct MockIdentityState {
    /// Registered accounts, by email
    accounts: HashMap<String, Identity>,
    /// The identity the federated provider signs in, if it accepts to
    federated: Option<Identity>,
    hub: AuthStateHub,
    behaviour: MockBehaviour,
}

/// An identity service that lives in memory.
///
/// Clones share the same state. Like the hosted service, it notifies subscribers only when the
/// signed-in identity actually changes.
#[derive(Clone, Debug, Default)]
pub struct MockIdentityService {
    state: Arc<Mutex<MockIdentityState>>,
}

impl MockIdentityService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let the federated provider sign in `identity`. Without this, federated sign-ins are cancelled
    pub fn with_federated_identity(self, identity: Identity) -> Self {
        lock(&self.state).federated = Some(identity);
        self
    }

    pub fn set_behaviour(&self, behaviour: MockBehaviour) {
        lock(&self.state).behaviour = behaviour;
    }

    pub fn current_identity(&self) -> Option<Identity> {
        lock(&self.state).hub.current().cloned()
    }

    /// Change the signed-in identity from outside the application (e.g. an expired session)
    pub fn force_auth_state(&self, identity: Option<Identity>) {
        lock(&self.state).hub.set(identity);
    }
}

#[async_trait]
impl IdentityService for MockIdentityService {
    async fn create_account_with_password(&self, email: &str, password: &str) -> Result<Identity, IdentityErrorCode> {
        let mut state = lock(&self.state);
        state.behaviour.can_create_account().map_err(IdentityErrorCode::Other)?;

        let is_valid_email = match email.split_once('@') {
            Some((user, domain)) => user.is_empty() == false && domain.contains('.'),
            None => false,
        };
        if is_valid_email == false {
            return Err(IdentityErrorCode::InvalidEmail);
        }
        if password.chars().count() < 6 {
            return Err(IdentityErrorCode::WeakPassword);
        }
        // Emails are case-insensitive
        let key = email.to_lowercase();
        if state.accounts.contains_key(&key) {
            return Err(IdentityErrorCode::EmailAlreadyInUse);
        }

        let identity = Identity::new(new_id(), email);
        log::debug!("Mock identity service: created account {}", identity.uid());
        state.accounts.insert(key, identity.clone());
        state.hub.set(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_in_with_federated_popup(&self) -> Result<Identity, IdentityErrorCode> {
        let mut state = lock(&self.state);
        state.behaviour.can_sign_in_federated().map_err(IdentityErrorCode::Other)?;

        match state.federated.clone() {
            None => Err(IdentityErrorCode::from_code("auth/popup-closed-by-user")),
            Some(identity) => {
                state.hub.set(Some(identity.clone()));
                Ok(identity)
            },
        }
    }

    async fn sign_out(&self) -> Result<(), IdentityErrorCode> {
        let mut state = lock(&self.state);
        state.behaviour.can_sign_out().map_err(IdentityErrorCode::Other)?;
        state.hub.set(None);
        Ok(())
    }

    fn subscribe(&self) -> AuthStateReceiver {
        lock(&self.state).hub.subscribe()
    }
}
