//! The external collaborators of this crate: a real-time key-value store and an authentication provider

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, watch};

use crate::auth::Session;
use crate::error::Result;
use crate::store::StorePath;

/// A stream of full values observed at a path of a [`RemoteStore`]
pub type Subscription = mpsc::UnboundedReceiver<Value>;

/// A hierarchical key-value store, that holds JSON values and notifies its subscribers of any change
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Returns the value stored at `path`, or `Value::Null` in case there is none
    async fn get(&self, path: &StorePath) -> Result<Value>;

    /// Overwrites the whole value stored at `path`. Setting `Value::Null` deletes it
    async fn set(&self, path: &StorePath, value: Value) -> Result<()>;

    /// Overwrites only the given children of the value stored at `path`
    async fn update(&self, path: &StorePath, fields: Map<String, Value>) -> Result<()>;

    /// Listen to the value at `path`.
    ///
    /// The current value (possibly `Value::Null`) is sent immediately, then the full value is sent again every time it changes.
    async fn subscribe(&self, path: &StorePath) -> Result<Subscription>;
}

/// An email/password authentication provider
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Create an account, and sign it in
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    async fn sign_out(&self) -> Result<()>;

    /// The currently signed-in session, if any
    fn current_session(&self) -> Option<Session>;

    /// Watch the session state.
    ///
    /// The receiver holds the current state at once, and is notified on every later sign-in or sign-out
    fn session_changes(&self) -> watch::Receiver<Option<Session>>;
}
