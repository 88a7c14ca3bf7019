//! This crate provides the state layer of a to-do list application.
//!
//! Users authenticate against an [`IdentityService`](traits::IdentityService), and their tasks are stored
//! in a remote [`DocumentStore`](traits::DocumentStore). Both are traits: the [`client`] module implements them
//! over the hosted REST APIs, and the [`memory`] module provides in-memory versions for tests and demos.
//!
//! A [`Provider`] combines the two into one state object that a view layer can render: the current
//! [`Session`](session::Session), the tasks of the signed-in user, and operations to sign up, sign in, sign out and
//! create, update or delete tasks. \
//! Its operations never fail loudly: errors are turned into [`Notification`](notification::Notification)s.

pub mod traits;

mod error;
pub use error::{Error, IdentityErrorCode};
mod identity;
pub use identity::Identity;
pub mod task;
pub use task::{Task, TaskDraft, TaskId, TaskPatch, TaskStatus};
pub mod session;
pub mod repository;
pub mod board;
pub use board::TaskBoard;
pub mod notification;
pub mod provider;
pub use provider::Provider;

pub mod client;
pub mod memory;
pub mod mock_behaviour;

pub mod config;
pub mod utils;
