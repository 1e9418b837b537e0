use std::sync::{Arc, Mutex};

use spdlog::{error, info, warn};

use crate::auth::{AuthGate, IdentityService, Panel, Role, Session};
use crate::config::Config;
use crate::error::Result;
use crate::remote_config::RemoteConfig;
use crate::repository::{ContentRepository, GitHubClient};
use crate::store::{DocumentStore, FirestoreStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Error,
}

/// Where user facing messages go (toasts in a UI, stderr in the CLI).
pub trait Notifier: Send + Sync {
    fn notify(&self, level: Level, message: &str);

    fn success(&self, message: &str) {
        self.notify(Level::Success, message);
    }

    fn info(&self, message: &str) {
        self.notify(Level::Info, message);
    }

    fn error(&self, message: &str) {
        self.notify(Level::Error, message);
    }
}

/// Sends notifications to the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, level: Level, message: &str) {
        match level {
            Level::Success | Level::Info => info!("{}", message),
            Level::Error => error!("{}", message),
        }
    }
}

/// Keeps every notification, for front ends that show them later and for tests.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(Level, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(Level, String)> {
        self.messages.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages().into_iter()
            .filter(|(level, _)| *level == Level::Error)
            .map(|(_, msg)| msg)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: Level, message: &str) {
        self.messages.lock().unwrap_or_else(|e| e.into_inner()).push((level, message.to_string()));
    }
}

/// Everything a desk operation needs, built once after sign in.
///
/// All fields are written only here, when the session starts, and read by the
/// components afterwards. Components keep their own state (the grid cache, the
/// editor record), nothing is shared through globals.
pub struct AppContext {
    /// Signed in account and what it may do.
    pub session: Session,
    pub role: Role,
    /// Repository coordinates from `config/main`.
    pub remote: RemoteConfig,
    pub repository: Arc<dyn ContentRepository>,
    pub store: Arc<dyn DocumentStore>,
    pub notifier: Arc<dyn Notifier>,
    /// Frontmatter layout and default page size from the local configuration.
    pub layout: String,
    pub page_size: u32,
}

impl AppContext {
    /// Signs in through the gate, loads the remote config and connects to the repository.
    pub async fn connect(config: &Config, identity: &dyn IdentityService, panel: Panel,
                         email: &str, password: &str, notifier: Arc<dyn Notifier>) -> Result<AppContext> {
        let gate = AuthGate::from_config(&config.identity);
        let (session, role) = match gate.sign_in(identity, panel, email, password).await {
            Ok(x) => x,
            Err(e) => {
                notifier.error(&format!("Sign in failed: {}", e));
                return Err(e);
            }
        };

        let store = Arc::new(FirestoreStore::new(config.store_url(), &config.store.project_id,
                                                 Some(session.id_token.clone())));
        let remote = match RemoteConfig::load(store.as_ref()).await {
            Ok(remote) => remote,
            Err(e) => {
                warn!("Could not load the remote configuration: {}", e);
                notifier.error("Error loading the remote configuration");
                return Err(e);
            }
        };
        let repository = Arc::new(GitHubClient::new(config.github_url(), &remote));

        Ok(AppContext {
            session,
            role,
            remote,
            repository,
            store,
            notifier,
            layout: config.layout().to_string(),
            page_size: config.defaults.page_size,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
