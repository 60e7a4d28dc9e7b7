//! This crate provides the core of a personal task manager.
//!
//! Tasks are kept in a [`TaskList`], that is displayed through named views ([`Category`]). \
//! While a user is signed in, a [`Controller`] owns its collection: it applies user [`Intent`]s, publishes a rendered
//! [`Board`] after each change, and keeps the collection in sync with a remote store through a [`TaskSync`].
//!
//! Collaborators are abstracted by the traits in the [`traits`] module, so that the hosted backends
//! ([`RestStore`](store::rest_store::RestStore) and [`RestAuth`](auth::rest_auth::RestAuth)) can be swapped for
//! in-process ones ([`MemoryStore`] and [`MemoryAuth`]), e.g. to work offline or in tests. \
//! A [`SessionGate`] starts and stops controllers as users sign in and out.

pub mod traits;
pub mod error;
pub use error::{Error, Result, ValidationError};

mod id;
pub use id::TaskId;
pub mod task;
pub use task::{CompletionStatus, Priority, Task, TaskDraft};
pub mod category;
pub use category::Category;
pub mod collection;
pub use collection::{Stats, TaskList};

pub mod controller;
pub use controller::{Board, Controller, ControllerHandle, Intent};
pub mod remote_sync;
pub use remote_sync::TaskSync;
pub mod session;
pub use session::{GateState, SessionGate};
pub mod calendar_export;

pub mod store;
pub use store::memory_store::MemoryStore;
pub mod auth;
pub use auth::memory_auth::MemoryAuth;
pub use auth::{Registration, Session};

pub mod config;
pub mod utils;
pub mod mock_behaviour;
