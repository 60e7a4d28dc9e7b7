//! Builds and tears down task controllers as users sign in and out

use std::sync::Arc;

use serde_json::json;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::auth::{Registration, Session};
use crate::controller::{self, Clock, ControllerHandle};
use crate::error::Result;
use crate::remote_sync::TaskSync;
use crate::traits::{AuthProvider, RemoteStore};

/// Whether someone is signed in, and the controller of its tasks
#[derive(Clone, Debug)]
pub enum GateState {
    SignedOut,
    SignedIn {
        session: Session,
        handle: ControllerHandle,
    },
}

impl GateState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            GateState::SignedOut => None,
            GateState::SignedIn { session, .. } => Some(session),
        }
    }

    pub fn handle(&self) -> Option<&ControllerHandle> {
        match self {
            GateState::SignedOut => None,
            GateState::SignedIn { handle, .. } => Some(handle),
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.session().is_some()
    }
}

/// Follows the session of an [`AuthProvider`].
///
/// Each time someone signs in, a fresh [`Controller`](crate::controller::Controller) is started for its tasks.
/// It is stopped when this user signs out.
pub struct SessionGate {
    auth: Arc<dyn AuthProvider>,
    sync: TaskSync,
    state: watch::Receiver<GateState>,
    watcher: JoinHandle<()>,
}

impl SessionGate {
    /// Start following the sessions of `auth`. This must be called from within a tokio runtime
    pub fn start(auth: Arc<dyn AuthProvider>, store: Arc<dyn RemoteStore>, clock: Clock) -> Self {
        let sync = TaskSync::new(store, Arc::clone(&auth));
        let (state_sender, state) = watch::channel(GateState::SignedOut);
        let watcher = tokio::spawn(follow_sessions(auth.session_changes(), sync.clone(), clock, state_sender));

        Self { auth, sync, state, watcher }
    }

    /// A receiver that is notified every time someone signs in or out
    pub fn state(&self) -> watch::Receiver<GateState> {
        self.state.clone()
    }

    pub fn current(&self) -> GateState {
        self.state.borrow().clone()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        self.auth.sign_in(email.trim(), password).await
    }

    /// Check a registration form, then create the account (which also signs it in)
    pub async fn register(&self, registration: &Registration) -> Result<Session> {
        registration.validate()?;
        let session = self.auth.sign_up(registration.email.trim(), &registration.password).await?;

        let profile = json!({ "email": session.email });
        if let Err(err) = self.sync.write_profile(profile).await {
            log::warn!("Unable to save the profile of {}: {}", session.email, err);
        }
        Ok(session)
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.auth.sign_out().await
    }

    /// Wait until the gate is in a state that matches `predicate`, and return that state
    pub async fn wait_for<F>(&self, predicate: F) -> GateState
    where
        F: Fn(&GateState) -> bool,
    {
        let mut state = self.state();
        loop {
            let current = state.borrow_and_update().clone();
            if predicate(&current) {
                return current;
            }
            if state.changed().await.is_err() {
                return current;
            }
        }
    }
}

impl Drop for SessionGate {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}


/// A controller started for a session
struct Running {
    session: Session,
    handle: ControllerHandle,
    _task: JoinHandle<()>,
}

impl Drop for Running {
    fn drop(&mut self) {
        log::debug!("Stopping the task controller of {}", self.session.email);
        self.handle.shutdown();
    }
}

async fn follow_sessions(
    mut changes: watch::Receiver<Option<Session>>,
    sync: TaskSync,
    clock: Clock,
    state: watch::Sender<GateState>,
) {
    let mut running: Option<Running> = None;

    loop {
        let session = changes.borrow_and_update().clone();
        match session {
            None => {
                if running.take().is_some() {
                    state.send_replace(GateState::SignedOut);
                }
            },
            Some(session) => {
                let same_user = running.as_ref().map(|r| r.session.uid == session.uid).unwrap_or(false);
                if same_user == false {
                    // The previous controller must be gone before the next one starts
                    drop(running.take());
                    log::info!("Starting the task controller of {}", session.email);
                    let (handle, task) = controller::spawn(sync.for_session(session.clone()), Arc::clone(&clock)).await;
                    state.send_replace(GateState::SignedIn { session: session.clone(), handle: handle.clone() });
                    running = Some(Running { session, handle, _task: task });
                }
            },
        }

        if changes.changed().await.is_err() {
            break;
        }
    }
}
