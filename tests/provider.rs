//! End-to-end behaviour of a Provider, backed by the in-memory services

use todo_provider::memory::{MemoryStore, MockIdentityService};
use todo_provider::mock_behaviour::MockBehaviour;
use todo_provider::notification::{notification_channel, Notification};
use todo_provider::repository::TASKS_COLLECTION;
use todo_provider::traits::DocumentStore;
use todo_provider::{Error, Identity, IdentityErrorCode, Provider, TaskDraft, TaskId, TaskPatch, TaskStatus};

type TestProvider = Provider<MockIdentityService, MemoryStore>;

const DUE_DATE: &str = "2024-05-01T12:00:00.000Z";

/// A provider whose initial auth state has been resolved (signed out)
async fn resolved_provider(identity: &MockIdentityService, store: &MemoryStore) -> TestProvider {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut provider = Provider::new(identity.clone(), store.clone());
    assert!(provider.wait_for_auth_state().await);
    provider
}

/// A provider signed in with a brand new account
async fn signed_in_provider(email: &str, store: &MemoryStore) -> (TestProvider, MockIdentityService) {
    let identity = MockIdentityService::new();
    let mut provider = resolved_provider(&identity, store).await;
    assert!(provider.sign_up_with_password(email, "secret-password").await);
    (provider, identity)
}

fn last_error(provider: &TestProvider) -> Option<Error> {
    provider.last_notification().and_then(|n| n.error()).cloned()
}


#[tokio::test]
async fn session_starts_loading() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut provider = Provider::new(MockIdentityService::new(), MemoryStore::new());
    assert!(provider.is_loading());
    assert!(provider.identity().is_none());

    assert!(provider.wait_for_auth_state().await);
    assert!(provider.is_loading() == false);
    assert!(provider.identity().is_none());
}

#[tokio::test]
async fn signed_out_operations_do_not_reach_the_store() {
    let store = MemoryStore::new();
    let mut provider = resolved_provider(&MockIdentityService::new(), &store).await;
    let id = TaskId::from("some-task");

    assert!(provider.create_task(TaskDraft::new("x")).await.is_none());
    assert_eq!(last_error(&provider), Some(Error::Unauthenticated));

    assert!(provider.update_task(&id, TaskPatch::status(TaskStatus::Completed)).await == false);
    assert_eq!(last_error(&provider), Some(Error::Unauthenticated));

    assert!(provider.delete_task(&id).await == false);
    assert_eq!(last_error(&provider), Some(Error::Unauthenticated));

    assert!(provider.fetch_tasks().await == false);
    assert_eq!(last_error(&provider), Some(Error::Unauthenticated));

    assert!(provider.toggle_task(&id).await == false);
    assert_eq!(last_error(&provider), Some(Error::Unauthenticated));

    assert_eq!(store.request_count(), 0);
    assert!(provider.tasks().is_empty());
    assert_eq!(provider.error_count(), 5);
}

#[tokio::test]
async fn create_then_fetch_round_trip() {
    let store = MemoryStore::new();
    let (mut provider, _) = signed_in_provider("alice@example.com", &store).await;
    let uid = provider.identity().unwrap().uid().to_string();

    let draft = TaskDraft::new("x").with_priority(1).with_due_date(DUE_DATE);
    let created = provider.create_task(draft).await.unwrap();
    assert!(created.id().as_str().is_empty() == false);

    assert!(provider.fetch_tasks().await);
    assert_eq!(provider.tasks().len(), 1);
    let task = &provider.tasks()[0];
    assert_eq!(task.id(), created.id());
    assert_eq!(task.task(), "x");
    assert_eq!(task.status(), TaskStatus::Pending);
    assert_eq!(task.priority(), 1);
    assert_eq!(task.due_date(), DUE_DATE);
    assert_eq!(task.user_id(), uid);
}

#[tokio::test]
async fn identities_never_see_each_others_tasks() {
    let store = MemoryStore::new();
    let (mut alice, _) = signed_in_provider("alice@example.com", &store).await;
    let (mut bob, _) = signed_in_provider("bob@example.com", &store).await;

    alice.create_task(TaskDraft::new("alice 1")).await.unwrap();
    alice.create_task(TaskDraft::new("alice 2")).await.unwrap();
    bob.create_task(TaskDraft::new("bob 1")).await.unwrap();

    assert!(alice.fetch_tasks().await);
    assert!(bob.fetch_tasks().await);
    assert_eq!(store.documents(TASKS_COLLECTION).len(), 3);

    let alice_uid = alice.identity().unwrap().uid().to_string();
    let bob_uid = bob.identity().unwrap().uid().to_string();
    assert!(alice_uid != bob_uid);

    assert_eq!(alice.tasks().len(), 2);
    assert!(alice.tasks().iter().all(|t| t.user_id() == alice_uid));
    assert_eq!(bob.tasks().len(), 1);
    assert!(bob.tasks().iter().all(|t| t.user_id() == bob_uid));
}

#[tokio::test]
async fn deleting_twice() {
    let store = MemoryStore::new();
    let (mut provider, _) = signed_in_provider("alice@example.com", &store).await;

    let task = provider.create_task(TaskDraft::new("short-lived")).await.unwrap();
    provider.create_task(TaskDraft::new("long-lived")).await.unwrap();
    assert_eq!(provider.tasks().len(), 2);

    assert!(provider.delete_task(task.id()).await);
    assert!(provider.tasks().iter().all(|t| t.id() != task.id()));
    assert_eq!(provider.tasks().len(), 1);

    // The store does not mind deleting a missing document
    assert!(provider.delete_task(task.id()).await);
    assert!(provider.tasks().iter().all(|t| t.id() != task.id()));
    assert_eq!(provider.tasks().len(), 1);
}

#[tokio::test]
async fn sign_out_clears_tasks() {
    let store = MemoryStore::new();
    let (mut provider, identity) = signed_in_provider("alice@example.com", &store).await;
    for name in &["a", "b", "c"] {
        provider.create_task(TaskDraft::new(name)).await.unwrap();
    }
    assert_eq!(provider.tasks().len(), 3);

    assert!(provider.sign_out().await);
    assert!(provider.tasks().is_empty());
    assert!(provider.identity().is_none());
    assert!(identity.current_identity().is_none());

    // Signing out again is harmless
    assert!(provider.sign_out().await);
    assert!(provider.tasks().is_empty());
    // Tasks are still stored, for the next time
    assert_eq!(store.documents(TASKS_COLLECTION).len(), 3);
}

#[tokio::test]
async fn sign_out_is_local_even_if_the_service_fails() {
    let store = MemoryStore::new();
    let (mut provider, identity) = signed_in_provider("alice@example.com", &store).await;
    provider.create_task(TaskDraft::new("a")).await.unwrap();

    identity.set_behaviour(MockBehaviour { sign_out_behaviour: (0, 1), ..MockBehaviour::default() });
    assert!(provider.sign_out().await == false);
    assert!(provider.tasks().is_empty());
    assert!(provider.identity().is_none());
}

#[tokio::test]
async fn external_auth_changes_are_followed() {
    let store = MemoryStore::new();
    let (mut provider, identity) = signed_in_provider("alice@example.com", &store).await;
    let alice = provider.identity().unwrap().clone();
    provider.create_task(TaskDraft::new("a")).await.unwrap();

    // e.g. the session expired
    identity.force_auth_state(None);
    assert!(provider.identity().is_some());
    provider.process_auth_events().await;
    assert!(provider.identity().is_none());
    assert!(provider.tasks().is_empty());

    identity.force_auth_state(Some(alice.clone()));
    assert!(provider.wait_for_auth_state().await);
    assert_eq!(provider.identity(), Some(&alice));
    assert_eq!(provider.tasks().len(), 1);
}

#[tokio::test]
async fn federated_sign_in_fetches_existing_tasks() {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = MemoryStore::new();
    let carol = Identity::new("carol-uid", "carol@example.com");

    let fields = TaskDraft::new("from another device").with_priority(4).to_fields(&carol).unwrap();
    store.insert(TASKS_COLLECTION, fields).await.unwrap();

    let identity = MockIdentityService::new().with_federated_identity(carol.clone());
    let mut provider = resolved_provider(&identity, &store).await;
    assert!(provider.sign_in_with_federated_provider().await);
    assert_eq!(provider.identity(), Some(&carol));
    assert_eq!(provider.tasks().len(), 1);
    assert_eq!(provider.tasks()[0].priority(), 4);
}

#[tokio::test]
async fn cancelled_federated_sign_in() {
    let identity = MockIdentityService::new();
    let mut provider = resolved_provider(&identity, &MemoryStore::new()).await;

    assert!(provider.sign_in_with_federated_provider().await == false);
    assert_eq!(last_error(&provider), Some(Error::Identity(IdentityErrorCode::Other("auth/popup-closed-by-user".to_string()))));
    assert!(provider.identity().is_none());
}

#[tokio::test]
async fn sign_up_errors_are_classified() {
    let store = MemoryStore::new();
    let identity = MockIdentityService::new();
    let mut provider = resolved_provider(&identity, &store).await;

    assert!(provider.sign_up_with_password("not an email", "secret-password").await == false);
    assert_eq!(last_error(&provider), Some(Error::Identity(IdentityErrorCode::InvalidEmail)));

    assert!(provider.sign_up_with_password("alice@example.com", "abc").await == false);
    assert_eq!(last_error(&provider), Some(Error::Identity(IdentityErrorCode::WeakPassword)));
    assert!(provider.identity().is_none());

    assert!(provider.sign_up_with_password("alice@example.com", "secret-password").await);
    assert!(provider.sign_out().await);
    assert!(provider.sign_up_with_password("alice@example.com", "secret-password").await == false);
    assert_eq!(last_error(&provider), Some(Error::Identity(IdentityErrorCode::EmailAlreadyInUse)));
    assert!(provider.identity().is_none());
}

#[tokio::test]
async fn store_failures_leave_tasks_unchanged() {
    let store = MemoryStore::new();
    let (mut provider, _) = signed_in_provider("alice@example.com", &store).await;
    let task = provider.create_task(TaskDraft::new("a")).await.unwrap();
    let before = provider.tasks().to_vec();

    store.set_behaviour(MockBehaviour::fail_now(1));
    assert!(provider.toggle_task(task.id()).await == false);
    assert!(matches!(last_error(&provider), Some(Error::Store{ .. })));
    assert_eq!(provider.tasks(), &before[..]);

    assert!(provider.delete_task(task.id()).await == false);
    assert_eq!(provider.tasks(), &before[..]);

    assert!(provider.create_task(TaskDraft::new("b")).await.is_none());
    assert_eq!(provider.tasks(), &before[..]);

    assert!(provider.fetch_tasks().await == false);
    assert_eq!(provider.tasks(), &before[..]);

    // Failures are not retried automatically, but a manual retry works
    assert!(provider.toggle_task(task.id()).await);
    assert_eq!(provider.tasks()[0].status(), TaskStatus::Completed);
}

#[tokio::test]
async fn mutation_succeeds_even_if_the_refetch_fails() {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = MemoryStore::new();
    let identity = MockIdentityService::new();
    let (sender, mut receiver) = notification_channel();
    let mut provider = Provider::new_with_notifications(identity, store.clone(), sender);
    assert!(provider.sign_up_with_password("alice@example.com", "secret-password").await);

    store.set_behaviour(MockBehaviour { query_behaviour: (0, 1), ..MockBehaviour::default() });
    assert!(provider.create_task(TaskDraft::new("a")).await.is_some());
    assert!(provider.tasks().is_empty());
    assert_eq!(store.documents(TASKS_COLLECTION).len(), 1);

    let mut notifications = Vec::new();
    while let Ok(notification) = receiver.try_recv() {
        notifications.push(notification);
    }
    assert_eq!(notifications.first(), Some(&Notification::Success("Successfully signed up".to_string())));
    assert!(notifications.iter().any(|n| n.to_string().starts_with("Error fetching tasks")));
    assert_eq!(notifications.last(), Some(&Notification::Success("Task created".to_string())));
}

#[tokio::test]
async fn invalid_patches_are_not_submitted() {
    let store = MemoryStore::new();
    let (mut provider, _) = signed_in_provider("alice@example.com", &store).await;
    let task = provider.create_task(TaskDraft::new("a").with_due_date(DUE_DATE)).await.unwrap();
    let requests = store.request_count();

    assert!(provider.update_task(task.id(), TaskPatch::new()).await == false);
    let bad_date = TaskPatch { due_date: Some("next tuesday".to_string()), ..TaskPatch::default() };
    assert!(provider.update_task(task.id(), bad_date).await == false);
    assert!(matches!(last_error(&provider), Some(Error::InvalidTask{ .. })));
    assert!(provider.create_task(TaskDraft::new("   ")).await.is_none());

    assert_eq!(store.request_count(), requests);
    assert_eq!(provider.tasks()[0].due_date(), DUE_DATE);
}

#[tokio::test]
async fn board_follows_updates() {
    let store = MemoryStore::new();
    let (mut provider, _) = signed_in_provider("alice@example.com", &store).await;
    assert_eq!(provider.board().completion_label(), "0.00");

    let low = provider.create_task(TaskDraft::new("low").with_priority(1)).await.unwrap();
    provider.create_task(TaskDraft::new("high").with_priority(3)).await.unwrap();
    provider.create_task(TaskDraft::new("mid").with_priority(2)).await.unwrap();

    let priorities: Vec<i64> = provider.board().pending().iter().map(|t| t.priority()).collect();
    assert_eq!(priorities, vec![3, 2, 1]);

    assert!(provider.toggle_task(low.id()).await);
    let board = provider.board();
    assert_eq!(board.completed().len(), 1);
    assert_eq!(board.completed()[0].id(), low.id());
    assert_eq!(board.pending().len(), 2);
    assert_eq!(board.completion_label(), "33.33");

    assert!(provider.update_task(low.id(), TaskPatch { task: Some("renamed".to_string()), priority: Some(7), ..TaskPatch::default() }).await);
    let renamed = provider.tasks().iter().find(|t| t.id() == low.id()).unwrap();
    assert_eq!(renamed.task(), "renamed");
    assert_eq!(renamed.priority(), 7);
    assert_eq!(renamed.status(), TaskStatus::Completed);

    assert!(provider.toggle_task(low.id()).await);
    assert_eq!(provider.board().completion_label(), "0.00");
}

#[tokio::test]
async fn switching_identity_replaces_tasks() {
    let store = MemoryStore::new();
    let (mut provider, identity) = signed_in_provider("alice@example.com", &store).await;
    provider.create_task(TaskDraft::new("alice's")).await.unwrap();

    let bob = Identity::new("bob-uid", "bob@example.com");
    let fields = TaskDraft::new("bob's").to_fields(&bob).unwrap();
    store.insert(TASKS_COLLECTION, fields).await.unwrap();

    identity.force_auth_state(Some(bob.clone()));
    provider.process_auth_events().await;
    assert_eq!(provider.identity(), Some(&bob));
    assert_eq!(provider.tasks().len(), 1);
    assert_eq!(provider.tasks()[0].task(), "bob's");
    assert!(provider.tasks().iter().all(|t| t.is_owned_by(&bob)));
}

#[tokio::test]
async fn switching_identity_with_a_failed_fetch_hides_previous_tasks() {
    let store = MemoryStore::new();
    let (mut provider, identity) = signed_in_provider("alice@example.com", &store).await;
    provider.create_task(TaskDraft::new("alice's")).await.unwrap();
    assert_eq!(provider.tasks().len(), 1);

    let bob = Identity::new("bob-uid", "bob@example.com");
    let fields = TaskDraft::new("bob's").to_fields(&bob).unwrap();
    store.insert(TASKS_COLLECTION, fields).await.unwrap();

    store.set_behaviour(MockBehaviour { query_behaviour: (0, 1), ..MockBehaviour::default() });
    identity.force_auth_state(Some(bob.clone()));
    provider.process_auth_events().await;
    assert_eq!(provider.identity(), Some(&bob));
    assert!(provider.tasks().is_empty());
    assert!(provider.last_notification().unwrap().to_string().starts_with("Error fetching tasks"));

    // A manual retry brings bob's tasks
    assert!(provider.fetch_tasks().await);
    assert_eq!(provider.tasks().len(), 1);
    assert!(provider.tasks().iter().all(|t| t.is_owned_by(&bob)));
}

#[tokio::test]
async fn signing_up_while_signed_in_switches_tasks() {
    let store = MemoryStore::new();
    let (mut provider, _) = signed_in_provider("alice@example.com", &store).await;
    let alice = provider.identity().unwrap().clone();
    provider.create_task(TaskDraft::new("alice's")).await.unwrap();

    store.set_behaviour(MockBehaviour { query_behaviour: (0, 1), ..MockBehaviour::default() });
    assert!(provider.sign_up_with_password("bob@example.com", "secret-password").await);
    let bob = provider.identity().unwrap().clone();
    assert!(bob != alice);
    assert!(provider.tasks().is_empty());

    provider.create_task(TaskDraft::new("bob's")).await.unwrap();
    assert_eq!(provider.tasks().len(), 1);
    assert!(provider.tasks().iter().all(|t| t.is_owned_by(&bob)));
}

#[tokio::test]
async fn sign_out_ignores_outdated_auth_states() {
    let store = MemoryStore::new();
    let (mut provider, identity) = signed_in_provider("alice@example.com", &store).await;
    let alice = provider.identity().unwrap().clone();

    // Queued but never processed
    identity.force_auth_state(None);
    identity.force_auth_state(Some(alice));
    let requests = store.request_count();
    let errors = provider.error_count();

    assert!(provider.sign_out().await);
    assert!(provider.identity().is_none());
    assert!(provider.tasks().is_empty());
    assert_eq!(store.request_count(), requests);
    assert_eq!(provider.error_count(), errors);
    assert_eq!(provider.last_notification(), Some(&Notification::Success("Signed out".to_string())));
}
