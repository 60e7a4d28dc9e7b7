//! Common building blocks for the integration tests
//!
//! Every scenario runs against in-process collaborators, with a clock stuck on 2024-05-14.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{Local, NaiveDate, TimeZone};
use serde_json::Value;

use taskdeck::controller::{fixed_clock, Clock};
use taskdeck::mock_behaviour::MockBehaviour;
use taskdeck::remote_sync::{decode_collection, TaskSync};
use taskdeck::traits::AuthProvider;
use taskdeck::{Board, Controller, ControllerHandle, MemoryAuth, MemoryStore, Session, Task};

pub const EMAIL: &str = "jan@mail.cz";
pub const PASSWORD: &str = "secret1";

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd(2024, 5, 14)
}

pub fn clock() -> Clock {
    fixed_clock(Local.ymd(2024, 5, 14).and_hms(10, 0, 0))
}

/// The collaborators of a scenario
pub struct Deck {
    pub store: Arc<MemoryStore>,
    pub auth: Arc<MemoryAuth>,
    pub sync: TaskSync,
}

impl Deck {
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    pub fn failing(behaviour: MockBehaviour) -> (Self, Arc<Mutex<MockBehaviour>>) {
        let behaviour = Arc::new(Mutex::new(behaviour));
        let deck = Self::with_store(MemoryStore::new().with_mock_behaviour(Arc::clone(&behaviour)));
        (deck, behaviour)
    }

    fn with_store(store: MemoryStore) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let store = Arc::new(store);
        let auth = Arc::new(MemoryAuth::new());
        let sync = TaskSync::new(store.clone(), auth.clone());
        Self { store, auth, sync }
    }

    pub async fn sign_up(&self) -> Session {
        self.auth.sign_up(EMAIL, PASSWORD).await.unwrap()
    }

    /// A running controller that does not listen to the store, so that only intents change its collection
    pub fn local_controller(&self) -> ControllerHandle {
        let (controller, handle) = Controller::new(self.sync.clone(), clock());
        tokio::spawn(controller.run());
        handle
    }

    /// A running controller that listens to the store
    pub async fn connected_controller(&self) -> ControllerHandle {
        let (handle, _task) = taskdeck::controller::spawn(self.sync.clone(), clock()).await;
        handle
    }

    /// The collection currently stored for `session`
    pub fn stored(&self, session: &Session) -> Vec<Task> {
        let snapshot = self.store.snapshot();
        let stored = snapshot
            .get("tasks")
            .and_then(|tasks| tasks.get(session.uid.as_str()))
            .cloned()
            .unwrap_or(Value::Null);
        decode_collection(stored)
    }

    /// Let background saves run, until the stored collection matches `predicate`
    pub async fn wait_for_stored<F>(&self, session: &Session, predicate: F) -> Vec<Task>
    where
        F: Fn(&[Task]) -> bool,
    {
        for _ in 0..1000 {
            let stored = self.stored(session);
            if predicate(&stored) {
                return stored;
            }
            tokio::task::yield_now().await;
        }
        panic!("The stored collection never reached the expected state");
    }
}

/// Wait until the controller publishes a board that matches `predicate`
pub async fn wait_for_board<F>(handle: &ControllerHandle, predicate: F) -> Board
where
    F: Fn(&Board) -> bool,
{
    let mut board = handle.board();
    loop {
        let current = board.borrow_and_update().clone();
        if predicate(&current) {
            return current;
        }
        board.changed().await.expect("the controller has stopped");
    }
}

pub fn titles(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|t| t.title()).collect()
}
