//! The task controller of a session
//!
//! A [`Controller`] owns the collection of the signed-in user. Everything that changes it (user intents as well as
//! collections received from the remote store) goes through a single ordered queue, that the controller consumes
//! in its [`run`](Controller::run) loop. \
//! After each change, the controller publishes a new [`Board`], and saves the collection without waiting for the
//! save to complete.

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::category::Category;
use crate::collection::TaskList;
use crate::error::{Error, Result};
use crate::id::TaskId;
use crate::remote_sync::TaskSync;
use crate::task::{Task, TaskDraft};

pub mod board;
pub use board::Board;

/// Tells the controller what time it is
pub type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// A [`Clock`] that reads the system time
pub fn system_clock() -> Clock {
    Arc::new(Local::now)
}

/// A [`Clock`] that is stuck at a given time
pub fn fixed_clock(now: DateTime<Local>) -> Clock {
    Arc::new(move || now)
}

/// Something the user asked for
#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
    Create(TaskDraft),
    Update(TaskId, TaskDraft),
    Delete(TaskId),
    ToggleComplete(TaskId),
    SelectCategory(Category),
}

#[derive(Debug)]
pub(crate) enum Event {
    Local(Intent),
    /// A full collection received from the remote store
    Remote(Vec<Task>),
    Shutdown,
}


/// The single writer of a session's collection
pub struct Controller {
    tasks: TaskList,
    category: Category,
    sync: TaskSync,
    clock: Clock,

    events: mpsc::UnboundedReceiver<Event>,
    /// Handed to the remote forwarder once [`connect`](Controller::connect) is called
    remote_events: Option<mpsc::UnboundedSender<Event>>,
    remote_forwarder: Option<JoinHandle<()>>,

    board: watch::Sender<Board>,
}

impl Controller {
    /// Create a controller for an empty collection, that starts on the "today" view
    pub fn new(sync: TaskSync, clock: Clock) -> (Self, ControllerHandle) {
        let tasks = TaskList::new();
        let category = Category::Today;
        let today = clock().naive_local().date();
        let (board_sender, board_receiver) = watch::channel(Board::render(&tasks, category, today));
        let (event_sender, event_receiver) = mpsc::unbounded_channel();

        let controller = Self {
            tasks,
            category,
            sync,
            clock,
            events: event_receiver,
            remote_events: Some(event_sender.clone()),
            remote_forwarder: None,
            board: board_sender,
        };
        let handle = ControllerHandle {
            events: event_sender,
            board: board_receiver,
        };
        (controller, handle)
    }

    /// Start listening to the remote collection.
    ///
    /// Every collection received from the remote store is queued, and replaces the local one when its turn comes.
    pub async fn connect(&mut self) -> Result<()> {
        let sender = match self.remote_events.take() {
            None => {
                log::warn!("This controller is already connected");
                return Ok(());
            },
            Some(sender) => sender,
        };

        let mut stream = self.sync.subscribe().await?;
        self.remote_forwarder = Some(tokio::spawn(async move {
            while let Some(tasks) = stream.next().await {
                if sender.send(Event::Remote(tasks)).is_err() {
                    break;
                }
            }
            log::debug!("Remote collection stream closed");
        }));
        Ok(())
    }

    /// Consume the queue until a shutdown is requested, or every handle is gone
    pub async fn run(mut self) {
        // Only the remote forwarder may keep the queue open
        self.remote_events = None;

        while let Some(event) = self.events.recv().await {
            if self.handle(event) == false {
                break;
            }
        }
        log::debug!("Task controller stopped");
    }

    /// The collection, as currently known by this controller
    pub fn tasks(&self) -> &TaskList {
        &self.tasks
    }

    pub fn category(&self) -> Category {
        self.category
    }

    fn today(&self) -> NaiveDate {
        (self.clock)().naive_local().date()
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)().with_timezone(&Utc)
    }

    /// Process a single event. Returns false if the controller should stop
    pub(crate) fn handle(&mut self, event: Event) -> bool {
        match event {
            Event::Shutdown => return false,
            Event::Remote(tasks) => {
                log::debug!("Received {} tasks from the remote store", tasks.len());
                self.tasks.replace(tasks);
                self.render();
            },
            Event::Local(intent) => self.apply(intent),
        }
        true
    }

    fn apply(&mut self, intent: Intent) {
        let changed = match intent {
            Intent::SelectCategory(category) => {
                self.category = category;
                self.render();
                return;
            },
            Intent::Create(draft) => {
                if let Err(err) = draft.validate() {
                    log::warn!("Not creating a task: {}", err);
                    return;
                }
                let now = self.now();
                self.tasks.create(draft, now);
                true
            },
            Intent::Update(id, draft) => {
                if let Err(err) = draft.validate() {
                    log::warn!("Not updating task {}: {}", id, err);
                    return;
                }
                self.tasks.update(&id, draft)
            },
            Intent::Delete(id) => self.tasks.delete(&id),
            Intent::ToggleComplete(id) => {
                let now = self.now();
                self.tasks.toggle_complete(&id, now)
            },
        };

        if changed {
            self.persist();
            self.render();
        }
    }

    /// Save the collection in the background. Failures are only logged
    fn persist(&self) {
        let sync = self.sync.clone();
        let tasks = self.tasks.tasks().to_vec();
        tokio::spawn(async move {
            if let Err(err) = sync.persist(&tasks).await {
                log::error!("Unable to save the tasks: {}", err);
            }
        });
    }

    fn render(&self) {
        let board = Board::render(&self.tasks, self.category, self.today());
        self.board.send_replace(board);
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        if let Some(forwarder) = self.remote_forwarder.take() {
            forwarder.abort();
        }
    }
}


/// Start a controller in the background, listening to the remote collection.
///
/// If the remote collection cannot be listened to, the controller still runs, on a collection that is only kept locally.
pub async fn spawn(sync: TaskSync, clock: Clock) -> (ControllerHandle, JoinHandle<()>) {
    let (mut controller, handle) = Controller::new(sync, clock);
    if let Err(err) = controller.connect().await {
        log::warn!("Unable to listen to remote tasks: {}", err);
    }
    let task = tokio::spawn(controller.run());
    (handle, task)
}


/// The way to talk to a running [`Controller`]
#[derive(Clone, Debug)]
pub struct ControllerHandle {
    events: mpsc::UnboundedSender<Event>,
    board: watch::Receiver<Board>,
}

impl ControllerHandle {
    /// Queue an intent.
    ///
    /// Drafts are checked here, so that invalid ones are reported to the caller
    pub fn send(&self, intent: Intent) -> Result<()> {
        match &intent {
            Intent::Create(draft) | Intent::Update(_, draft) => draft.validate()?,
            _ => (),
        }
        self.events.send(Event::Local(intent))
            .map_err(|_| Error::ControllerStopped)
    }

    /// A receiver that is notified every time a new board is published
    pub fn board(&self) -> watch::Receiver<Board> {
        self.board.clone()
    }

    /// The last published board
    pub fn current_board(&self) -> Board {
        self.board.borrow().clone()
    }

    /// Ask the controller to stop once the already queued events are processed
    pub fn shutdown(&self) {
        if self.events.send(Event::Shutdown).is_err() {
            log::debug!("Task controller was already stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.events.is_closed()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::auth::memory_auth::MemoryAuth;
    use crate::store::memory_store::MemoryStore;
    use crate::task::Priority;

    fn controller() -> (Controller, ControllerHandle) {
        let sync = TaskSync::new(Arc::new(MemoryStore::new()), Arc::new(MemoryAuth::new()));
        Controller::new(sync, fixed_clock(Local.ymd(2024, 5, 14).and_hms(9, 30, 0)))
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd(2024, 5, 14)
    }

    #[tokio::test]
    async fn intents_are_applied_in_order() {
        let _ = env_logger::builder().is_test(true).try_init();
        let (mut controller, handle) = controller();
        let board = handle.board();
        assert_eq!(board.borrow().category, Category::Today);

        controller.handle(Event::Local(Intent::Create(TaskDraft::new("Buy milk", today()).with_priority(Priority::High))));
        let id = controller.tasks().tasks()[0].id().clone();
        assert_eq!(board.borrow().visible.len(), 1);
        assert_eq!(controller.tasks().tasks()[0].created_at(), &Local.ymd(2024, 5, 14).and_hms(9, 30, 0).with_timezone(&Utc));

        controller.handle(Event::Local(Intent::ToggleComplete(id.clone())));
        assert_eq!(board.borrow().stats.completed, 1);

        controller.handle(Event::Local(Intent::SelectCategory(Category::Priority)));
        assert_eq!(board.borrow().title, "Priority Tasks");
        assert_eq!(board.borrow().visible.len(), 1);

        controller.handle(Event::Local(Intent::Delete(id)));
        assert!(board.borrow().collection.is_empty());
        assert!(controller.handle(Event::Shutdown) == false);
    }

    #[tokio::test]
    async fn lookup_misses_do_not_publish() {
        let (mut controller, handle) = controller();
        let mut board = handle.board();
        board.borrow_and_update();

        controller.handle(Event::Local(Intent::Delete(TaskId::from("nope"))));
        controller.handle(Event::Local(Intent::ToggleComplete(TaskId::from("nope"))));
        controller.handle(Event::Local(Intent::Update(TaskId::from("nope"), TaskDraft::new("x", today()))));
        assert_eq!(board.has_changed().unwrap(), false);
    }

    #[tokio::test]
    async fn remote_collections_replace_local_ones() {
        let (mut controller, handle) = controller();
        controller.handle(Event::Local(Intent::Create(TaskDraft::new("local", today()))));

        let remote = Task::new(TaskId::from("r1"), TaskDraft::new("remote", today()), Utc::now());
        controller.handle(Event::Remote(vec![remote.clone()]));
        assert_eq!(controller.tasks().tasks(), &[remote.clone()]);
        assert_eq!(handle.current_board().visible, vec![remote]);
    }

    #[tokio::test]
    async fn invalid_drafts_are_refused() {
        let (_controller, handle) = controller();
        let err = handle.send(Intent::Create(TaskDraft::new("   ", today()))).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn stopped_controllers() {
        let (controller, handle) = controller();
        handle.shutdown();
        controller.run().await;
        assert!(handle.is_stopped());
        assert!(matches!(handle.send(Intent::Delete(TaskId::from("a"))), Err(Error::ControllerStopped)));
    }
}
