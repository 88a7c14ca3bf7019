//! Runs a short to-do session and prints the resulting board.
//!
//! By default, this uses the in-memory services. Run `todo-demo --remote <email> <password>` to create an account
//! on the hosted services instead (connection parameters are read from `TODO_*` environment variables).
//! Set the RUST_LOG environment variable to display more info about what happens.

use todo_provider::client::{RestIdentity, RestStore};
use todo_provider::config::BackendConfig;
use todo_provider::memory::{MemoryStore, MockIdentityService};
use todo_provider::notification::notification_channel;
use todo_provider::traits::{DocumentStore, IdentityService};
use todo_provider::utils::print_board;
use todo_provider::{Provider, TaskDraft, TaskPatch};

const DEMO_EMAIL: &str = "demo@example.com";
const DEMO_PASSWORD: &str = "correct horse";

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("--remote") => {
            let (email, password) = match (args.get(1), args.get(2)) {
                (Some(email), Some(password)) => (email.clone(), password.clone()),
                _ => {
                    eprintln!("Usage: todo-demo --remote <email> <password>");
                    std::process::exit(2);
                },
            };
            let config = match BackendConfig::from_env() {
                Ok(config) => config,
                Err(err) => {
                    eprintln!("Invalid configuration: {}", err);
                    std::process::exit(1);
                },
            };
            let identity = RestIdentity::new(&config);
            let store = match RestStore::new(&config, identity.token()) {
                Ok(store) => store,
                Err(err) => {
                    eprintln!("Invalid document store URL: {}", err);
                    std::process::exit(1);
                },
            };
            run(identity, store, &email, &password).await;
        },
        _ => run(MockIdentityService::new(), MemoryStore::new(), DEMO_EMAIL, DEMO_PASSWORD).await,
    }
}

async fn run<I, S>(identity: I, store: S, email: &str, password: &str)
where
    I: IdentityService,
    S: DocumentStore,
{
    let (sender, mut receiver) = notification_channel();
    let mut provider = Provider::new_with_notifications(identity, store, sender);

    // Resolve the initial "loading" state
    provider.wait_for_auth_state().await;

    if provider.sign_up_with_password(email, password).await {
        provider.create_task(TaskDraft::new("Buy groceries").with_priority(2)).await;
        provider.create_task(TaskDraft::new("Call the plumber").with_priority(3)).await;
        let report = provider.create_task(TaskDraft::new("Write the monthly report")).await;

        if let Some(task) = report {
            provider.update_task(task.id(), TaskPatch { priority: Some(5), ..TaskPatch::default() }).await;
            provider.toggle_task(task.id()).await;
        }

        println!("---- {} -----", email);
        print_board(&provider.board());

        provider.sign_out().await;
    }

    while let Ok(notification) = receiver.try_recv() {
        println!("  * {}", notification);
    }
}
