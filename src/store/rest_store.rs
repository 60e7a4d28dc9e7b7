//! A store that talks to a hosted real-time database, through its REST API

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use url::Url;

use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::store::{merge_at, set_at, StorePath};
use crate::traits::{AuthProvider, RemoteStore, Subscription};

/// A [`RemoteStore`] backed by a hosted real-time database.
///
/// Requests are authenticated with the token of the current session of `auth`, if any.
pub struct RestStore {
    database_url: Url,
    auth: Arc<dyn AuthProvider>,
    http: reqwest::Client,
}

impl RestStore {
    /// Create a store. This does not start a connection
    pub fn new(config: &BackendConfig, auth: Arc<dyn AuthProvider>) -> Self {
        Self::new_with_url(config.database_url.clone(), auth)
    }

    pub fn new_with_url(database_url: Url, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            database_url,
            auth,
            http: reqwest::Client::new(),
        }
    }

    /// The REST endpoint of a path
    fn url_for(&self, path: &StorePath) -> Result<Url> {
        let relative = if path.is_root() {
            "./.json".to_string()
        } else {
            format!("./{}.json", path)
        };
        let mut url = self.database_url.join(&relative)
            .map_err(|err| Error::Persistence(format!("invalid database URL for {}: {}", path, err)))?;

        if let Some(session) = self.auth.current_session() {
            if session.id_token.is_empty() == false {
                url.query_pairs_mut().append_pair("auth", &session.id_token);
            }
        }
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder, path: &StorePath) -> Result<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::NotAuthenticated);
        }
        Err(Error::Persistence(format!("Unexpected HTTP status code {:?} for {}", status, path)))
    }
}

#[async_trait]
impl RemoteStore for RestStore {
    async fn get(&self, path: &StorePath) -> Result<Value> {
        let url = self.url_for(path)?;
        let response = self.send(self.http.get(url), path).await?;
        Ok(response.json().await?)
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<()> {
        let url = self.url_for(path)?;
        self.send(self.http.put(url).json(&value), path).await?;
        Ok(())
    }

    async fn update(&self, path: &StorePath, fields: Map<String, Value>) -> Result<()> {
        let url = self.url_for(path)?;
        self.send(self.http.patch(url).json(&fields), path).await?;
        Ok(())
    }

    async fn subscribe(&self, path: &StorePath) -> Result<Subscription> {
        let url = self.url_for(path)?;
        let response = self.send(self.http.get(url).header(ACCEPT, "text/event-stream"), path).await?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let path = path.clone();
        tokio::spawn(async move {
            if let Err(err) = listen(response, &sender).await {
                log::warn!("Subscription to {} ended: {}", path, err);
            } else {
                log::debug!("Subscription to {} ended", path);
            }
        });
        Ok(receiver)
    }
}

/// Apply the events of a stream to a local copy of the value, and forward the full value after each of them
async fn listen(mut response: reqwest::Response, sender: &mpsc::UnboundedSender<Value>) -> Result<()> {
    let mut parser = EventStreamParser::default();
    let mut snapshot = Value::Null;

    while let Some(chunk) = response.chunk().await? {
        for event in parser.push(&chunk) {
            match event.name.as_str() {
                "put" | "patch" => {
                    let change: ChangeEvent = serde_json::from_str(&event.data)?;
                    let at = StorePath::new(&change.path);
                    if event.name == "put" {
                        set_at(&mut snapshot, &at, change.data);
                    } else if let Value::Object(fields) = change.data {
                        merge_at(&mut snapshot, &at, fields);
                    }
                    if sender.send(snapshot.clone()).is_err() {
                        // Nobody listens anymore
                        return Ok(());
                    }
                },
                "keep-alive" => log::trace!("keep-alive"),
                "cancel" => return Err(Error::Persistence(format!("the server cancelled the subscription ({})", event.data))),
                "auth_revoked" => return Err(Error::NotAuthenticated),
                other => log::debug!("Ignoring an unknown {:?} event", other),
            }
        }
        if sender.is_closed() {
            return Ok(());
        }
    }
    Ok(())
}

#[derive(Deserialize)]
struct ChangeEvent {
    path: String,
    data: Value,
}

#[derive(Debug, Default, PartialEq)]
struct StreamEvent {
    name: String,
    data: String,
}

/// Splits a server-sent event stream into events
#[derive(Default)]
struct EventStreamParser {
    buffer: Vec<u8>,
    name: String,
    data: Vec<String>,
}

impl EventStreamParser {
    fn push(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(eol) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=eol).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(|c: char| c == '\n' || c == '\r');

            if line.is_empty() {
                if self.name.is_empty() == false || self.data.is_empty() == false {
                    events.push(StreamEvent {
                        name: std::mem::take(&mut self.name),
                        data: self.data.drain(..).collect::<Vec<_>>().join("\n"),
                    });
                }
            } else if let Some(name) = line.strip_prefix("event:") {
                self.name = name.trim().to_string();
            } else if let Some(data) = line.strip_prefix("data:") {
                self.data.push(data.trim_start().to_string());
            }
        }
        events
    }
}
