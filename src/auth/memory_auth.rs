//! An in-process authentication provider

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::auth::Session;
use crate::error::{Error, Result};
use crate::mock_behaviour::MockBehaviour;
use crate::traits::AuthProvider;

#[derive(Serialize, Deserialize)]
struct Account {
    uid: String,
    password: String,
}

/// An [`AuthProvider`] that keeps its accounts in memory.
///
/// It is used to work offline, and to mock a real provider in tests.
/// When it has a backing file, accounts (passwords included, in clear) are written to it after every registration.
pub struct MemoryAuth {
    backing_file: Option<PathBuf>,
    accounts: Mutex<HashMap<String, Account>>,

    session_sender: watch::Sender<Option<Session>>,
    /// Kept so that the channel never closes
    session_receiver: watch::Receiver<Option<Session>>,

    mock_behaviour: Option<Arc<Mutex<MockBehaviour>>>,
}

impl Default for MemoryAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::with_accounts(HashMap::new(), None)
    }

    fn with_accounts(accounts: HashMap<String, Account>, backing_file: Option<PathBuf>) -> Self {
        let (session_sender, session_receiver) = watch::channel(None);
        Self {
            backing_file,
            accounts: Mutex::new(accounts),
            session_sender,
            session_receiver,
            mock_behaviour: None,
        }
    }

    /// Initialize a provider from the content of a valid backing file if it exists.
    /// Returns an error otherwise
    pub fn from_file(path: &Path) -> Result<Self> {
        let accounts = match std::fs::File::open(path) {
            Err(err) => {
                return Err(Error::Persistence(format!("Unable to open file {:?}: {}", path, err)));
            },
            Ok(file) => serde_json::from_reader(file)?,
        };
        Ok(Self::with_accounts(accounts, Some(PathBuf::from(path))))
    }

    /// A provider with no accounts, that will save them to `path`
    pub fn new_with_file(path: &Path) -> Self {
        Self::with_accounts(HashMap::new(), Some(PathBuf::from(path)))
    }

    /// Register an account without signing it in. Returns its uid
    pub fn add_account(&self, email: &str, password: &str) -> Result<String> {
        let mut accounts = self.accounts();
        let key = normalize(email);
        if accounts.contains_key(&key) {
            return Err(Error::Auth(format!("an account already exists for {}", email)));
        }
        let uid = uuid::Uuid::new_v4().to_simple().to_string();
        accounts.insert(key, Account { uid: uid.clone(), password: password.to_string() });
        self.save_to_file(&accounts);
        Ok(uid)
    }

    fn save_to_file(&self, accounts: &HashMap<String, Account>) {
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

        if let Err(err) = serde_json::to_writer(file, accounts) {
            log::warn!("Unable to serialize: {}", err);
        };
    }

    /// Make this provider fail on purpose, as described by `behaviour`
    pub fn with_mock_behaviour(mut self, behaviour: Arc<Mutex<MockBehaviour>>) -> Self {
        self.mock_behaviour = Some(behaviour);
        self
    }

    fn accounts(&self) -> MutexGuard<'_, HashMap<String, Account>> {
        match self.accounts.lock() {
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

    fn publish(&self, session: Option<Session>) {
        match &session {
            Some(s) => log::info!("Signed in as {}", s.email),
            None => log::info!("Signed out"),
        }
        // We hold a receiver, so that the channel is never closed
        let _ = self.session_sender.send(session);
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session> {
        self.check(MockBehaviour::can_sign_up)?;
        let uid = self.add_account(email, password)?;
        let session = Session::new(uid, email.trim());
        self.publish(Some(session.clone()));
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        self.check(MockBehaviour::can_sign_in)?;
        let uid = {
            let accounts = self.accounts();
            match accounts.get(&normalize(email)) {
                Some(account) if account.password == password => account.uid.clone(),
                _ => return Err(Error::Auth("invalid email or password".to_string())),
            }
        };
        let session = Session::new(uid, email.trim());
        self.publish(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<()> {
        self.publish(None);
        Ok(())
    }

    fn current_session(&self) -> Option<Session> {
        self.session_receiver.borrow().clone()
    }

    fn session_changes(&self) -> watch::Receiver<Option<Session>> {
        self.session_receiver.clone()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_up_then_in_and_out() {
        let auth = MemoryAuth::new();
        let mut changes = auth.session_changes();
        assert_eq!(*changes.borrow(), None);

        let created = auth.sign_up("Jan@Mail.cz", "secret1").await.unwrap();
        changes.changed().await.unwrap();
        assert_eq!(changes.borrow().as_ref(), Some(&created));

        auth.sign_out().await.unwrap();
        assert_eq!(auth.current_session(), None);

        let again = auth.sign_in("jan@mail.cz", "secret1").await.unwrap();
        assert_eq!(again.uid, created.uid);
        assert_eq!(auth.current_session(), Some(again));
    }

    #[tokio::test]
    async fn bad_credentials() {
        let auth = MemoryAuth::new();
        auth.add_account("jan@mail.cz", "secret1").unwrap();
        assert!(matches!(auth.sign_in("jan@mail.cz", "nope").await, Err(Error::Auth(_))));
        assert!(matches!(auth.sign_in("eva@mail.cz", "secret1").await, Err(Error::Auth(_))));
        assert!(matches!(auth.sign_up("jan@mail.cz", "other1").await, Err(Error::Auth(_))));
        assert_eq!(auth.current_session(), None);
    }

    #[tokio::test]
    async fn accounts_survive_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");

        let uid = {
            let auth = MemoryAuth::new_with_file(&path);
            auth.sign_up("jan@mail.cz", "secret1").await.unwrap().uid
        };

        let auth = MemoryAuth::from_file(&path).unwrap();
        assert_eq!(auth.current_session(), None);
        assert_eq!(auth.sign_in("jan@mail.cz", "secret1").await.unwrap().uid, uid);
        assert!(MemoryAuth::from_file(&dir.path().join("nope.json")).is_err());
    }
}
