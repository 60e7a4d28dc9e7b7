//! An in-process store, that can optionally be backed by a local JSON file

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::mock_behaviour::MockBehaviour;
use crate::store::{merge_at, set_at, value_at, StorePath};
use crate::traits::{RemoteStore, Subscription};

struct Subscriber {
    path: StorePath,
    sender: mpsc::UnboundedSender<Value>,
    /// The last value this subscriber has been sent
    last_sent: Value,
}

#[derive(Default)]
struct Inner {
    data: Value,
    subscribers: Vec<Subscriber>,
}

/// A [`RemoteStore`] that lives in memory.
///
/// It is used to work offline, and to mock a real backend in tests.
/// When it has a backing file, its whole content is written to it after every change.
#[derive(Default)]
pub struct MemoryStore {
    backing_file: Option<PathBuf>,
    inner: Mutex<Inner>,

    mock_behaviour: Option<Arc<Mutex<MockBehaviour>>>,
}

impl MemoryStore {
    /// An empty store, with no backing file
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize a store from the content of a valid backing file if it exists.
    /// Returns an error otherwise
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = match std::fs::File::open(path) {
            Err(err) => {
                return Err(Error::Persistence(format!("Unable to open file {:?}: {}", path, err)));
            },
            Ok(file) => serde_json::from_reader(file)?,
        };

        Ok(Self {
            backing_file: Some(PathBuf::from(path)),
            inner: Mutex::new(Inner { data, subscribers: Vec::new() }),
            mock_behaviour: None,
        })
    }

    /// An empty store, that will be saved to `path`
    pub fn new_with_file(path: &Path) -> Self {
        Self {
            backing_file: Some(PathBuf::from(path)),
            ..Self::default()
        }
    }

    /// Make this store fail on purpose, as described by `behaviour`
    pub fn with_mock_behaviour(mut self, behaviour: Arc<Mutex<MockBehaviour>>) -> Self {
        self.mock_behaviour = Some(behaviour);
        self
    }

    /// A copy of the whole tree
    pub fn snapshot(&self) -> Value {
        self.lock().data.clone()
    }

    /// How many subscriptions are still listened to
    pub fn subscriber_count(&self) -> usize {
        let mut inner = self.lock();
        inner.subscribers.retain(|sub| sub.sender.is_closed() == false);
        inner.subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn check(&self, allowed: fn(&mut MockBehaviour) -> Result<()>) -> Result<()> {
        match &self.mock_behaviour {
            None => Ok(()),
            Some(behaviour) => {
                let mut behaviour = match behaviour.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                allowed(&mut *behaviour)
            }
        }
    }

    /// Store the current content to the backing file (if any)
    fn save_to_file(&self, data: &Value) {
        let path = match &self.backing_file {
            None => return,
            Some(path) => path,
        };
        let file = match std::fs::File::create(path) {
            Err(err) => {
                log::warn!("Unable to save file {:?}: {}", path, err);
                return;
            },
            Ok(f) => f,
        };

        if let Err(err) = serde_json::to_writer(file, data) {
            log::warn!("Unable to serialize: {}", err);
        };
    }

    /// Apply a change to the tree, then tell every interested subscriber
    fn write(&self, changed: &StorePath, change: impl FnOnce(&mut Value)) {
        let mut inner = self.lock();
        change(&mut inner.data);
        self.save_to_file(&inner.data);

        let Inner { data, subscribers } = &mut *inner;
        subscribers.retain_mut(|sub| {
            if sub.path.overlaps(changed) == false {
                return true;
            }
            let current = value_at(data, &sub.path).cloned().unwrap_or(Value::Null);
            if current == sub.last_sent {
                return true;
            }
            sub.last_sent = current.clone();
            match sub.sender.send(current) {
                Ok(()) => true,
                Err(_) => {
                    log::debug!("Dropping a closed subscription to {}", sub.path);
                    false
                },
            }
        });
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, path: &StorePath) -> Result<Value> {
        self.check(MockBehaviour::can_get)?;
        let inner = self.lock();
        Ok(value_at(&inner.data, path).cloned().unwrap_or(Value::Null))
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<()> {
        self.check(MockBehaviour::can_set)?;
        log::trace!("Setting {}", path);
        self.write(path, |data| set_at(data, path, value));
        Ok(())
    }

    async fn update(&self, path: &StorePath, fields: Map<String, Value>) -> Result<()> {
        self.check(MockBehaviour::can_update)?;
        log::trace!("Updating {} fields of {}", fields.len(), path);
        self.write(path, |data| merge_at(data, path, fields));
        Ok(())
    }

    async fn subscribe(&self, path: &StorePath) -> Result<Subscription> {
        self.check(MockBehaviour::can_subscribe)?;
        let (sender, receiver) = mpsc::unbounded_channel();

        let mut inner = self.lock();
        let current = value_at(&inner.data, path).cloned().unwrap_or(Value::Null);
        // The receiver is still alive, this cannot fail
        let _ = sender.send(current.clone());
        inner.subscribers.push(Subscriber {
            path: path.clone(),
            sender,
            last_sent: current,
        });
        Ok(receiver)
    }
}
