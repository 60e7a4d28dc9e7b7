//! The link between a task collection and its remote copy
//!
//! Every user's collection is stored as a whole at `<TASKS_ROOT>/<uid>`, and its profile at `<USERS_ROOT>/<uid>`.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::auth::Session;
use crate::config::{root_of, TASKS_ROOT, USERS_ROOT};
use crate::error::{Error, Result};
use crate::store::StorePath;
use crate::task::Task;
use crate::traits::{AuthProvider, RemoteStore, Subscription};

/// Reads, writes and listens to the task collection of the signed-in user
#[derive(Clone)]
pub struct TaskSync {
    store: Arc<dyn RemoteStore>,
    auth: Arc<dyn AuthProvider>,
    /// When set, only this user's data is ever read or written
    owner: Option<Session>,
}

impl TaskSync {
    /// A sync that follows whoever is currently signed in
    pub fn new(store: Arc<dyn RemoteStore>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { store, auth, owner: None }
    }

    /// A sync bound to `session`.
    ///
    /// Once another user signs in (or this one signs out), every operation fails with [`Error::NotAuthenticated`].
    pub fn for_session(&self, session: Session) -> Self {
        Self {
            store: Arc::clone(&self.store),
            auth: Arc::clone(&self.auth),
            owner: Some(session),
        }
    }

    pub fn owner(&self) -> Option<&Session> {
        self.owner.as_ref()
    }

    /// Where the collection of a given user is stored
    pub fn tasks_path(uid: &str) -> StorePath {
        StorePath::new(root_of(&TASKS_ROOT)).child(uid)
    }

    /// Where the profile of a given user is stored
    pub fn profile_path(uid: &str) -> StorePath {
        StorePath::new(root_of(&USERS_ROOT)).child(uid)
    }

    fn session(&self) -> Result<Session> {
        let current = self.auth.current_session().ok_or(Error::NotAuthenticated)?;
        match &self.owner {
            Some(owner) if owner.uid != current.uid => {
                log::debug!("{} is not signed in anymore", owner.email);
                Err(Error::NotAuthenticated)
            },
            _ => Ok(current),
        }
    }

    /// Overwrite the whole remote collection
    pub async fn persist(&self, tasks: &[Task]) -> Result<()> {
        let session = self.session()?;
        let value = serde_json::to_value(tasks)?;
        log::debug!("Saving {} tasks for {}", tasks.len(), session.email);
        self.store.set(&Self::tasks_path(&session.uid), value).await
    }

    /// Read the remote collection once
    pub async fn load(&self) -> Result<Vec<Task>> {
        let session = self.session()?;
        let value = self.store.get(&Self::tasks_path(&session.uid)).await?;
        Ok(decode_collection(value))
    }

    /// Listen to the remote collection.
    ///
    /// The current collection is received at once (empty if nothing is stored yet), then again after every remote change.
    pub async fn subscribe(&self) -> Result<TaskStream> {
        let session = self.session()?;
        log::debug!("Listening to the tasks of {}", session.email);
        let inner = self.store.subscribe(&Self::tasks_path(&session.uid)).await?;
        Ok(TaskStream { inner })
    }

    /// Overwrite a few fields of a single stored task, without touching the rest of the collection
    pub async fn patch_task(&self, position: usize, fields: Map<String, Value>) -> Result<()> {
        let session = self.session()?;
        let path = Self::tasks_path(&session.uid).child(position.to_string());
        self.store.update(&path, fields).await
    }

    /// Overwrite the profile data of the signed-in user
    pub async fn write_profile(&self, profile: Value) -> Result<()> {
        let session = self.session()?;
        self.store.set(&Self::profile_path(&session.uid), profile).await
    }

    /// Listen to the profile data of the signed-in user
    pub async fn subscribe_profile(&self) -> Result<Subscription> {
        let session = self.session()?;
        self.store.subscribe(&Self::profile_path(&session.uid)).await
    }
}

/// Collections received from the remote store
pub struct TaskStream {
    inner: Subscription,
}

impl TaskStream {
    /// Wait for the next remote collection. Returns `None` once the store stops sending
    pub async fn next(&mut self) -> Option<Vec<Task>> {
        self.inner.recv().await.map(decode_collection)
    }
}

/// Turn a stored value into a collection.
///
/// Arrays with holes may be stored as objects keyed by index: their entries are taken in index order.
/// Any other value is an empty collection, and invalid tasks are skipped.
pub fn decode_collection(value: Value) -> Vec<Task> {
    let items = match value {
        Value::Array(items) => items,
        Value::Null => return Vec::new(),
        Value::Object(entries) => indexed_entries(entries),
        other => {
            log::warn!("Expected a list of tasks, got {}. Using an empty list", kind_of(&other));
            return Vec::new();
        }
    };

    items.into_iter()
        .filter(|item| item.is_null() == false)
        .filter_map(|item| match serde_json::from_value::<Task>(item) {
            Ok(task) => Some(task),
            Err(err) => {
                log::warn!("Ignoring an invalid task: {}", err);
                None
            },
        })
        .collect()
}

fn indexed_entries(entries: Map<String, Value>) -> Vec<Value> {
    let mut indexed: Vec<(usize, Value)> = entries.into_iter()
        .filter_map(|(key, item)| match key.parse::<usize>() {
            Ok(index) => Some((index, item)),
            Err(_) => {
                log::warn!("Ignoring the stored entry {:?}, which is not a task position", key);
                None
            },
        })
        .collect();
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, item)| item).collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "nothing",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
