//! An authentication provider that talks to the Identity Toolkit REST API

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use url::Url;

use crate::auth::Session;
use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::traits::AuthProvider;

static IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1/";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    email: String,
    id_token: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}
#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// An [`AuthProvider`] backed by a hosted email/password account service
pub struct RestAuth {
    api_key: String,
    base_url: Url,
    http: reqwest::Client,

    session_sender: watch::Sender<Option<Session>>,
    /// Kept so that the channel never closes
    session_receiver: watch::Receiver<Option<Session>>,
}

impl RestAuth {
    /// Create a provider. This does not start a connection
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let base_url = Url::parse(IDENTITY_TOOLKIT_URL)
            .map_err(|err| Error::Auth(format!("invalid identity service URL: {}", err)))?;
        Ok(Self::new_with_base_url(config.api_key.clone(), base_url))
    }

    /// Create a provider that talks to another account service (e.g. a local emulator)
    pub fn new_with_base_url(api_key: String, base_url: Url) -> Self {
        let (session_sender, session_receiver) = watch::channel(None);
        Self {
            api_key,
            base_url,
            http: reqwest::Client::new(),
            session_sender,
            session_receiver,
        }
    }

    fn endpoint(&self, action: &str) -> Result<Url> {
        let mut url = self.base_url.join(&format!("./accounts:{}", action))
            .map_err(|err| Error::Auth(format!("invalid identity service URL: {}", err)))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    async fn password_request(&self, action: &str, email: &str, password: &str) -> Result<Session> {
        let url = self.endpoint(action)?;
        let body = PasswordRequest { email: email.trim(), password, return_secure_token: true };

        let response = self.http
            .post(url)
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() == false {
            let status = response.status();
            let text = response.text().await?;
            let message = match serde_json::from_str::<ErrorResponse>(&text) {
                Ok(err) => err.error.message,
                Err(_) => format!("unexpected HTTP status code {:?}", status),
            };
            log::debug!("{} refused for {}: {}", action, email, message);
            return Err(Error::Auth(message));
        }

        let reply: PasswordResponse = response.json().await?;
        let session = Session {
            uid: reply.local_id,
            email: reply.email,
            id_token: reply.id_token,
        };
        log::info!("Signed in as {}", session.email);
        // We hold a receiver, so that the channel is never closed
        let _ = self.session_sender.send(Some(session.clone()));
        Ok(session)
    }
}

#[async_trait]
impl AuthProvider for RestAuth {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session> {
        self.password_request("signUp", email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        self.password_request("signInWithPassword", email, password).await
    }

    async fn sign_out(&self) -> Result<()> {
        // Tokens are not revocable from the client, forgetting them is enough
        log::info!("Signed out");
        let _ = self.session_sender.send(None);
        Ok(())
    }

    fn current_session(&self) -> Option<Session> {
        self.session_receiver.borrow().clone()
    }

    fn session_changes(&self) -> watch::Receiver<Option<Session>> {
        self.session_receiver.clone()
    }
}
