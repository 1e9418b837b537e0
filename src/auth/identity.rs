use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use spdlog::{info, warn};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub email: String,
    pub user_id: String,
    pub id_token: String,
    pub refresh_token: String,
}

/// Called with the new session on sign in, `None` on sign out.
pub type SessionListener = Box<dyn Fn(Option<&Session>) + Send + Sync>;

#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    async fn sign_out(&self) -> Result<()>;

    fn current_session(&self) -> Option<Session>;

    fn on_session_change(&self, listener: SessionListener);
}

/// Email and password accounts of the Identity Toolkit REST API.
pub struct PasswordIdentity {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    session: RwLock<Option<Session>>,
    listeners: Mutex<Vec<SessionListener>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    email: String,
    #[serde(default)]
    refresh_token: String,
    local_id: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl PasswordIdentity {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        PasswordIdentity {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client: reqwest::Client::new(),
            session: RwLock::new(None),
            listeners: Mutex::new(vec![]),
        }
    }

    fn set_session(&self, session: Option<Session>) {
        match self.session.write() {
            Ok(mut current) => *current = session.clone(),
            Err(e) => *e.into_inner() = session.clone(),
        }

        let listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        for listener in listeners.iter() {
            listener(session.as_ref());
        }
    }
}

#[async_trait]
impl IdentityService for PasswordIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let url = format!("{}/accounts:signInWithPassword", self.base_url);
        let response = self.client.post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let reason = match serde_json::from_str::<ErrorResponse>(&text) {
                Ok(err) => err.error.message,
                Err(_) => format!("{} {}", status, text),
            };
            warn!("Sign in failed for {}: {}", email, reason);
            return Err(Error::Auth(reason));
        }

        let body: SignInResponse = response.json().await?;
        let session = Session {
            email: body.email,
            user_id: body.local_id,
            id_token: body.id_token,
            refresh_token: body.refresh_token,
        };
        info!("Signed in as {}", session.email);
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<()> {
        self.set_session(None);
        Ok(())
    }

    fn current_session(&self) -> Option<Session> {
        match self.session.read() {
            Ok(session) => session.clone(),
            Err(e) => e.into_inner().clone(),
        }
    }

    fn on_session_change(&self, listener: SessionListener) {
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        listeners.push(listener);
    }
}
