use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

use crate::error::Result;

pub mod github;
pub mod memory;

pub use github::GitHubClient;
pub use memory::MemoryRepository;

/// A file as returned by the contents API, content still base64 encoded.
#[derive(Debug, Clone)]
pub struct RepoFile {
    pub content: String,
    pub sha: String,
}

impl RepoFile {
    pub fn text(&self) -> Result<String> {
        decode_content(&self.content)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RepoEntry {
    pub name: String,
    pub path: String,
    pub sha: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl RepoEntry {
    pub fn is_markdown(&self) -> bool {
        self.kind == "file" && self.name.ends_with(".md")
    }
}

/// Files of the content repository. The `sha` is the revision token: writing
/// over an existing file needs its current sha, and every write returns the new one.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn read(&self, path: &str) -> Result<RepoFile>;

    /// Decoded text and sha of the file.
    async fn read_text(&self, path: &str) -> Result<(String, String)> {
        let file = self.read(path).await?;
        let text = file.text()?;
        Ok((text, file.sha))
    }

    /// Creates the file when `sha` is `None`, updates it otherwise. Returns the new sha.
    async fn write(&self, path: &str, text: &str, message: &str, sha: Option<&str>) -> Result<String>;

    async fn delete(&self, path: &str, message: &str, sha: &str) -> Result<()>;

    async fn list(&self, dir: &str) -> Result<Vec<RepoEntry>>;
}

pub fn encode_content(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// The contents API wraps base64 at 60 columns, line breaks are dropped before decoding.
pub fn decode_content(content: &str) -> Result<String> {
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD.decode(compact)?;
    Ok(String::from_utf8(bytes)?)
}
