//! This module combines the session and the task repository into a single state object for the view layer
//!
//! It is also responsible for keeping the in-memory tasks consistent with the store

use crate::board::TaskBoard;
use crate::error::Error;
use crate::identity::Identity;
use crate::notification::{Notification, NotificationSender, Notifier};
use crate::repository::TaskRepository;
use crate::session::{AuthTransition, Session, SessionManager};
use crate::task::{Task, TaskDraft, TaskId, TaskPatch};
use crate::traits::{DocumentStore, IdentityService};

/// The state a to-do view renders: who is signed in, and their tasks.
///
/// `Provider` is created once at startup and handed to the view layer. Its operations never return errors:
/// they report whether they succeeded, and details are sent as [`Notification`]s (and logged using the `log::*` macros).
/// A failed operation leaves the in-memory state untouched, so that it can simply be retried.
///
/// After every successful mutation, the whole task list of the signed-in identity is fetched again and replaces
/// the in-memory list.
pub struct Provider<I, S>
where
    I: IdentityService,
    S: DocumentStore,
{
    sessions: SessionManager<I>,
    repository: TaskRepository<S>,
    tasks: Vec<Task>,
    notifier: Notifier,
}

impl<I, S> Provider<I, S>
where
    I: IdentityService,
    S: DocumentStore,
{
    /// Create a provider. It subscribes to the auth-state notifications of `identity` right away,
    /// and stays in "loading" state until the first one is applied
    pub fn new(identity: I, store: S) -> Self {
        Self::new_with_notifier(identity, store, Notifier::new())
    }

    /// Create a provider that sends its notifications to `sender`
    pub fn new_with_notifications(identity: I, store: S, sender: NotificationSender) -> Self {
        Self::new_with_notifier(identity, store, Notifier::new_with_channel(sender))
    }

    fn new_with_notifier(identity: I, store: S, notifier: Notifier) -> Self {
        Self {
            sessions: SessionManager::new(identity),
            repository: TaskRepository::new(store),
            tasks: Vec::new(),
            notifier,
        }
    }

    pub fn session(&self) -> &Session { self.sessions.session() }
    pub fn identity(&self) -> Option<&Identity> { self.session().identity() }
    pub fn is_loading(&self) -> bool { self.session().is_loading() }
    /// The tasks of the signed-in identity, in the order of the last fetch
    pub fn tasks(&self) -> &[Task] { &self.tasks }
    /// Pending and completed tasks, sorted for display
    pub fn board(&self) -> TaskBoard<'_> { TaskBoard::new(&self.tasks) }
    /// The most recent notification, if any
    pub fn last_notification(&self) -> Option<&Notification> { self.notifier.last() }
    /// How many operations have failed since this provider was created
    pub fn error_count(&self) -> u32 { self.notifier.error_count() }

    pub fn identity_service(&self) -> &I { self.sessions.service() }
    pub fn store(&self) -> &S { self.repository.store() }


    /// Wait until the identity service sends an auth-state notification, and apply it.
    ///
    /// Returns `false` in case the identity service will never send any notification again
    pub async fn wait_for_auth_state(&mut self) -> bool {
        match self.sessions.wait_for_auth_state().await {
            None => false,
            Some(transition) => {
                self.on_auth_transition(transition).await;
                true
            }
        }
    }

    /// Apply every auth-state notification that has arrived already
    pub async fn process_auth_events(&mut self) {
        // The session now reflects the last notification, earlier ones are outdated
        if let Some(transition) = self.sessions.pending_auth_states().pop() {
            self.on_auth_transition(transition).await;
        }
    }

    async fn on_auth_transition(&mut self, transition: AuthTransition) {
        match transition {
            AuthTransition::SignedIn(identity) => {
                // Tasks of another identity must not survive a failed fetch
                if self.tasks.iter().any(|task| task.is_owned_by(&identity) == false) {
                    log::debug!("Identity changed, dropping {} tasks", self.tasks.len());
                    self.tasks.clear();
                }
                self.fetch_tasks().await;
            },
            AuthTransition::SignedOut => self.tasks.clear(),
        }
    }

    pub async fn sign_up_with_password(&mut self, email: &str, password: &str) -> bool {
        match self.sessions.sign_up_with_password(email, password).await {
            Err(err) => {
                self.notifier.failure("Error signing up with email and password", err);
                false
            },
            Ok(_) => {
                self.notifier.success("Successfully signed up");
                self.process_auth_events().await;
                true
            },
        }
    }

    pub async fn sign_in_with_federated_provider(&mut self) -> bool {
        match self.sessions.sign_in_with_federated_provider().await {
            Err(err) => {
                self.notifier.failure("Error signing in with the federated provider", err);
                false
            },
            Ok(_) => {
                self.notifier.success("Signed in with the federated provider");
                self.process_auth_events().await;
                true
            },
        }
    }

    /// Sign out. The task list is cleared immediately, even before the identity service confirms it
    pub async fn sign_out(&mut self) -> bool {
        let result = self.sessions.sign_out().await;
        self.tasks.clear();
        match result {
            Err(err) => {
                self.notifier.failure("Error signing out", err);
                false
            },
            Ok(()) => {
                self.notifier.success("Signed out");
                self.process_auth_events().await;
                true
            },
        }
    }

    /// Store a new task for the signed-in identity, and return it as stored
    pub async fn create_task(&mut self, draft: TaskDraft) -> Option<Task> {
        match self.repository.create(self.sessions.session(), &draft).await {
            Err(err) => {
                self.notifier.failure("Error creating task", err);
                None
            },
            Ok(task) => {
                self.refresh_after_mutation("Task created").await;
                Some(task)
            },
        }
    }

    pub async fn update_task(&mut self, id: &TaskId, patch: TaskPatch) -> bool {
        match self.repository.update(self.sessions.session(), id, &patch).await {
            Err(err) => {
                self.notifier.failure("Error updating task", err);
                false
            },
            Ok(()) => {
                self.refresh_after_mutation("Task updated").await;
                true
            },
        }
    }

    /// Switch a task between pending and completed
    pub async fn toggle_task(&mut self, id: &TaskId) -> bool {
        let new_status = match self.tasks.iter().find(|task| task.id() == id) {
            None => {
                let err = match self.session().is_signed_in() {
                    true => Error::store(format!("no task with id {}", id)),
                    false => Error::Unauthenticated,
                };
                self.notifier.failure("Error updating task", err);
                return false;
            },
            Some(task) => task.status().toggled(),
        };
        self.update_task(id, TaskPatch::status(new_status)).await
    }

    pub async fn delete_task(&mut self, id: &TaskId) -> bool {
        match self.repository.delete(self.sessions.session(), id).await {
            Err(err) => {
                self.notifier.failure("Error deleting task", err);
                false
            },
            Ok(()) => {
                self.refresh_after_mutation("Task deleted").await;
                true
            },
        }
    }

    /// Replace the in-memory tasks with the ones currently in the store
    pub async fn fetch_tasks(&mut self) -> bool {
        match self.repository.fetch_all(self.sessions.session()).await {
            Err(err) => {
                self.notifier.failure("Error fetching tasks", err);
                false
            },
            Ok(tasks) => {
                log::debug!("Fetched {} tasks", tasks.len());
                self.tasks = tasks;
                true
            },
        }
    }

    async fn refresh_after_mutation(&mut self, success_text: &str) {
        self.fetch_tasks().await;
        self.notifier.success(success_text);
    }
}
