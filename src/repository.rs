//! Tasks of the signed-in identity, stored in a [`DocumentStore`]

use crate::error::Error;
use crate::identity::Identity;
use crate::session::Session;
use crate::task::{Task, TaskDraft, TaskId, TaskPatch};
use crate::traits::{Document, DocumentStore, FieldFilter};

/// The collection every task is stored in
pub const TASKS_COLLECTION: &str = "tasks";
/// The document field that holds the owner of a task
pub const OWNER_FIELD: &str = "userId";

/// Per-identity CRUD on top of a document store.
///
/// Every operation needs a signed-in [`Session`]. When signed out, they fail with
/// [`Error::Unauthenticated`] and the store is not contacted.
pub struct TaskRepository<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> TaskRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S { &self.store }

    pub async fn create(&self, session: &Session, draft: &TaskDraft) -> Result<Task, Error> {
        let owner = signed_in(session)?;
        draft.validate()?;
        let fields = draft.to_fields(owner)?;

        let id = self.store.insert(TASKS_COLLECTION, fields.clone()).await
            .map_err(Error::store)?;
        log::debug!("Created task {} for {}", id, owner.uid());

        Task::from_document(Document { id, fields })
            .map_err(Error::store)
    }

    pub async fn update(&self, session: &Session, id: &TaskId, patch: &TaskPatch) -> Result<(), Error> {
        signed_in(session)?;
        patch.validate()?;
        let fields = patch.to_fields()?;

        self.store.update(TASKS_COLLECTION, id.as_str(), fields).await
            .map_err(Error::store)
    }

    pub async fn delete(&self, session: &Session, id: &TaskId) -> Result<(), Error> {
        signed_in(session)?;
        self.store.delete(TASKS_COLLECTION, id.as_str()).await
            .map_err(Error::store)
    }

    /// Every task owned by the signed-in identity, in the order the store returned them
    pub async fn fetch_all(&self, session: &Session) -> Result<Vec<Task>, Error> {
        let owner = signed_in(session)?;
        let filter = FieldFilter::equals(OWNER_FIELD, owner.uid());
        let documents = self.store.query(TASKS_COLLECTION, &filter).await
            .map_err(Error::store)?;

        let mut tasks = Vec::with_capacity(documents.len());
        for document in documents {
            let doc_id = document.id.clone();
            match Task::from_document(document) {
                Err(err) => {
                    log::warn!("Ignoring malformed task document {}: {}", doc_id, err);
                },
                Ok(task) if task.is_owned_by(owner) == false => {
                    log::warn!("Store returned task {} that belongs to someone else. Ignoring it", doc_id);
                },
                Ok(task) => tasks.push(task),
            }
        }
        Ok(tasks)
    }
}

fn signed_in(session: &Session) -> Result<&Identity, Error> {
    session.identity().ok_or(Error::Unauthenticated)
}
