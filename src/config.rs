use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use serde::Deserialize;

use crate::autosave::DEFAULT_INTERVAL;
use crate::content::frontmatter::DEFAULT_LAYOUT;
use crate::error::{Error, Result};

pub const CFG_FILE_NAME: &str = "postdesk.toml";

const IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const STORE_URL: &str = "https://firestore.googleapis.com/v1";
const GITHUB_URL: &str = "https://api.github.com";

#[derive(Deserialize, Debug)]
pub struct Identity {
    pub api_key: String,
    /// Emails allowed to sign in. The admin email is always allowed.
    #[serde(default)]
    pub allowed_emails: Vec<String>,
    pub admin_email: String,
    pub base_url: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct Store {
    pub project_id: String,
    pub base_url: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct GitHub {
    pub api_url: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct Defaults {
    pub page_size: u32,
    pub layout: Option<String>,
    pub autosave_secs: Option<u64>,
    pub author: Option<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Defaults {
            page_size: 12,
            layout: None,
            autosave_secs: None,
            author: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct AuthorEntry {
    pub email: String,
    pub slug: String,
    pub name: String,
    pub role: String,
}

#[derive(Deserialize, Debug)]
pub struct Log {
    pub level: LogLevel,
    pub log_to_console: bool,
    pub location: Option<PathBuf>,
}

#[derive(Deserialize, Copy, Clone, Debug)]
pub enum LogLevel {
    Critical = 0,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Deserialize, Debug)]
pub struct Config {
    pub identity: Identity,
    pub store: Store,
    #[serde(default)]
    pub github: GitHub,
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub authors: Vec<AuthorEntry>,
    pub log: Option<Log>,
}

impl Config {
    pub fn identity_url(&self) -> &str {
        self.identity.base_url.as_deref().unwrap_or(IDENTITY_URL)
    }

    pub fn store_url(&self) -> &str {
        self.store.base_url.as_deref().unwrap_or(STORE_URL)
    }

    pub fn github_url(&self) -> &str {
        self.github.api_url.as_deref().unwrap_or(GITHUB_URL)
    }

    pub fn layout(&self) -> &str {
        self.defaults.layout.as_deref().unwrap_or(DEFAULT_LAYOUT)
    }

    /// Wait after the last change before `post watch` publishes.
    pub fn autosave_interval(&self) -> Duration {
        self.defaults.autosave_secs.map(Duration::from_secs).unwrap_or(DEFAULT_INTERVAL)
    }

    pub fn author_for(&self, email: &str) -> Option<&AuthorEntry> {
        self.authors.iter().find(|a| a.email.eq_ignore_ascii_case(email))
    }
}

fn parse_path(path: PathBuf) -> PathBuf {
    let Some(str_path) = path.to_str() else {
        return path;
    };
    if !str_path.starts_with("${exe_dir}") {
        return path;
    }

    let exe_dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    match exe_dir {
        Some(exe_dir) => PathBuf::from(str_path.replace("${exe_dir}", &exe_dir.to_string_lossy())),
        None => path,
    }
}

pub fn parse_config(cfg_content: &str) -> Result<Config> {
    let mut cfg: Config = match toml::from_str::<Config>(cfg_content) {
        Ok(cfg) => cfg,
        Err(e) => return Err(Error::config(format!("Error parsing configuration file: {}", e))),
    };

    if cfg.defaults.page_size == 0 {
        return Err(Error::config("defaults.page_size has to be greater than 0"));
    }

    if let Some(ref mut log) = cfg.log {
        log.location = log.location.take().map(parse_path);
    }

    Ok(cfg)
}

pub fn read_config(cfg_path: &Path) -> Result<Config> {
    let cfg_content = match fs::read_to_string(cfg_path) {
        Ok(content) => content,
        Err(e) => return Err(Error::config(format!("Error opening configuration file {}: {}", cfg_path.display(), e))),
    };

    parse_config(&cfg_content)
}

/// Looks for the configuration next to the executable, then in the current
/// directory, then in the user config dir.
pub fn find_config() -> Option<PathBuf> {
    let mut candidates = vec![];
    if let Some(exe_dir) = env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        candidates.push(exe_dir.join(CFG_FILE_NAME));
    }
    if let Ok(cur_dir) = env::current_dir() {
        candidates.push(cur_dir.join(CFG_FILE_NAME));
    }
    if let Some(cfg_dir) = dirs::config_dir() {
        candidates.push(cfg_dir.join("postdesk").join(CFG_FILE_NAME));
    }

    candidates.into_iter().find(|p| p.exists())
}

pub const CONFIG_SAMPLE: &str = r#"# For the file locations, If you want it to be relative to the executable directory
# use ${exe_dir}/location
[identity]
api_key = "replace-with-web-api-key"
admin_email = "admin@example.com"
allowed_emails = []

[store]
project_id = "replace-with-project-id"

[defaults]
page_size = 12
layout = "../../layouts/BlogPost.astro"
autosave_secs = 30

# [[authors]]
# email = "admin@example.com"
# slug = "admin"
# name = "Admin"
# role = "Administrator"

[log]
level = "Info"
log_to_console = false
location = "${exe_dir}/log/postdesk.log"
"#;
