//! Support for library configuration options

use std::path::Path;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;

/// Root of the remote tree under which every user's task collection is stored (as `<root>/<uid>`).
/// Feel free to override it when initing this library.
pub static TASKS_ROOT: Lazy<Arc<Mutex<String>>> = Lazy::new(|| Arc::new(Mutex::new("tasks".to_string())));

/// Root of the remote tree under which every user's profile is stored (as `<root>/<uid>`).
/// Feel free to override it when initing this library.
pub static USERS_ROOT: Lazy<Arc<Mutex<String>>> = Lazy::new(|| Arc::new(Mutex::new("users".to_string())));

/// Passwords shorter than this are rejected before even asking the auth provider
pub const MIN_PASSWORD_LEN: usize = 6;

/// Reads one of the root statics, tolerating a poisoned lock
pub(crate) fn root_of(setting: &Lazy<Arc<Mutex<String>>>) -> String {
    match setting.lock() {
        Ok(root) => root.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Connection settings of a hosted backend, in the format the web console hands out
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    pub api_key: String,
    #[serde(default)]
    pub auth_domain: Option<String>,
    #[serde(rename = "databaseURL")]
    pub database_url: Url,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl BackendConfig {
    /// Load a configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let config = serde_json::from_reader(file)?;
        log::debug!("Loaded backend configuration from {:?}", path);
        Ok(config)
    }
}
