use serde::Deserialize;
use serde_json::Value;
use spdlog::info;

use crate::error::{Error, Result};
use crate::store::DocumentStore;

pub const CONFIG_COLLECTION: &str = "config";
pub const CONFIG_DOCUMENT: &str = "main";

/// Where the site content lives. Loaded once after sign in and never changed
/// for the rest of the session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    pub repo_owner: String,
    pub repo_name: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    pub posts_path: String,
    #[serde(rename = "githubToken")]
    pub access_token: String,
}

fn default_branch() -> String {
    "main".to_string()
}

impl RemoteConfig {
    /// Reads `config/main`. `postsPath` always ends with `/` afterwards.
    pub async fn load(store: &dyn DocumentStore) -> Result<RemoteConfig> {
        let Some(doc) = store.get_document(CONFIG_COLLECTION, CONFIG_DOCUMENT).await? else {
            return Err(Error::config(format!("Document {}/{} not found", CONFIG_COLLECTION, CONFIG_DOCUMENT)));
        };

        let mut cfg: RemoteConfig = match serde_json::from_value(Value::Object(doc)) {
            Ok(cfg) => cfg,
            Err(e) => return Err(Error::config(format!("Invalid {}/{}: {}", CONFIG_COLLECTION, CONFIG_DOCUMENT, e))),
        };

        if !cfg.posts_path.ends_with('/') {
            cfg.posts_path.push('/');
        }

        info!("Content repository: {}/{}@{} ({})", cfg.repo_owner, cfg.repo_name, cfg.branch, cfg.posts_path);
        Ok(cfg)
    }

    pub fn post_path(&self, file_name: &str) -> String {
        format!("{}{}", self.posts_path, file_name)
    }

    /// Link to the file in the repository web view.
    pub fn blob_url(&self, path: &str) -> String {
        format!("https://github.com/{}/{}/blob/{}/{}", self.repo_owner, self.repo_name, self.branch, path)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::MemoryStore;

    fn store_with(value: Value) -> MemoryStore {
        let Value::Object(doc) = value else { panic!() };
        MemoryStore::new().with_document("config", "main", doc)
    }

    #[tokio::test]
    async fn test_load_normalizes_posts_path() {
        let store = store_with(json!({
            "repoOwner": "trips",
            "repoName": "site",
            "branch": "develop",
            "postsPath": "src/content/blog",
            "githubToken": "t0k3n"
        }));
        let cfg = RemoteConfig::load(&store).await.unwrap();
        assert_eq!(cfg.posts_path, "src/content/blog/");
        assert_eq!(cfg.access_token, "t0k3n");
        assert_eq!(cfg.post_path("a.md"), "src/content/blog/a.md");
        assert_eq!(cfg.blob_url("src/content/blog/a.md"), "https://github.com/trips/site/blob/develop/src/content/blog/a.md");
    }

    #[tokio::test]
    async fn test_load_errors() {
        let err = RemoteConfig::load(&MemoryStore::new()).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let store = store_with(json!({"repoOwner": "trips"}));
        assert!(matches!(RemoteConfig::load(&store).await, Err(Error::Config(_))));

        let store = store_with(json!({
            "repoOwner": "o", "repoName": "r", "postsPath": "p/", "githubToken": "t"
        }));
        assert_eq!(RemoteConfig::load(&store).await.unwrap().branch, "main");
    }
}
