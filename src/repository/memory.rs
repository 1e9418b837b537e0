use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::repository::{encode_content, ContentRepository, RepoEntry, RepoFile};

#[derive(Default)]
struct Inner {
    files: BTreeMap<String, (String, String)>,
    failing: HashSet<String>,
    commits: Vec<String>,
}

/// Repository kept in memory with the same sha rules as the contents API.
#[derive(Default)]
pub struct MemoryRepository {
    inner: Mutex<Inner>,
}

fn content_sha(text: &str) -> String {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

fn not_found(path: &str) -> Error {
    Error::api(404, format!("Not Found: {}", path))
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: &str, text: &str) -> Self {
        self.put(path, text);
        self
    }

    /// Stores the file directly, returns its sha.
    pub fn put(&self, path: &str, text: &str) -> String {
        let sha = content_sha(text);
        let mut inner = self.lock();
        inner.files.insert(path.to_string(), (text.to_string(), sha.clone()));
        sha
    }

    /// Reads of `path` fail with a server error from now on.
    pub fn fail_reads_of(&self, path: &str) {
        self.lock().failing.insert(path.to_string());
    }

    pub fn text_of(&self, path: &str) -> Option<String> {
        self.lock().files.get(path).map(|(text, _)| text.clone())
    }

    pub fn sha_of(&self, path: &str) -> Option<String> {
        self.lock().files.get(path).map(|(_, sha)| sha.clone())
    }

    /// Commit messages in the order they were made.
    pub fn commits(&self) -> Vec<String> {
        self.lock().commits.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ContentRepository for MemoryRepository {
    async fn read(&self, path: &str) -> Result<RepoFile> {
        let inner = self.lock();
        if inner.failing.contains(path) {
            return Err(Error::api(500, format!("Server Error: {}", path)));
        }
        let (text, sha) = inner.files.get(path).ok_or_else(|| not_found(path))?;
        Ok(RepoFile {
            content: encode_content(text),
            sha: sha.clone(),
        })
    }

    async fn write(&self, path: &str, text: &str, message: &str, sha: Option<&str>) -> Result<String> {
        let mut inner = self.lock();
        let current = inner.files.get(path).map(|(_, sha)| sha.as_str());
        match (current, sha) {
            (Some(_), None) => {
                return Err(Error::Conflict {
                    path: path.to_string(),
                    message: "\"sha\" wasn't supplied".to_string(),
                });
            }
            (Some(current), Some(sha)) if current != sha => {
                return Err(Error::Conflict {
                    path: path.to_string(),
                    message: format!("{} does not match {}", path, sha),
                });
            }
            (None, Some(_)) => return Err(not_found(path)),
            _ => {}
        }

        let new_sha = content_sha(text);
        inner.files.insert(path.to_string(), (text.to_string(), new_sha.clone()));
        inner.commits.push(message.to_string());
        Ok(new_sha)
    }

    async fn delete(&self, path: &str, message: &str, sha: &str) -> Result<()> {
        let mut inner = self.lock();
        let current = inner.files.get(path).map(|(_, sha)| sha.clone()).ok_or_else(|| not_found(path))?;
        if current != sha {
            return Err(Error::Conflict {
                path: path.to_string(),
                message: format!("{} does not match {}", path, sha),
            });
        }
        inner.files.remove(path);
        inner.commits.push(message.to_string());
        Ok(())
    }

    async fn list(&self, dir: &str) -> Result<Vec<RepoEntry>> {
        let inner = self.lock();
        let dir = dir.trim_matches('/');
        let prefix = if dir.is_empty() { String::new() } else { format!("{}/", dir) };

        let mut entries = vec![];
        let mut sub_dirs = BTreeSet::new();
        for (path, (_, sha)) in inner.files.iter() {
            let Some(rest) = path.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((sub_dir, _)) => {
                    sub_dirs.insert(sub_dir.to_string());
                }
                None => entries.push(RepoEntry {
                    name: rest.to_string(),
                    path: path.clone(),
                    sha: sha.clone(),
                    kind: "file".to_string(),
                }),
            }
        }

        if entries.is_empty() && sub_dirs.is_empty() {
            return Err(not_found(dir));
        }

        for sub_dir in sub_dirs {
            entries.push(RepoEntry {
                path: format!("{}{}", prefix, sub_dir),
                sha: content_sha(&sub_dir),
                name: sub_dir,
                kind: "dir".to_string(),
            });
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_without_token_on_existing_path() {
        let repo = MemoryRepository::new().with_file("posts/a.md", "one");
        let err = repo.write("posts/a.md", "two", "Update a.md", None).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(repo.text_of("posts/a.md").unwrap(), "one");
    }

    #[tokio::test]
    async fn test_write_refreshes_token() {
        let repo = MemoryRepository::new();
        let first = repo.write("posts/a.md", "one", "Create", None).await.unwrap();
        let second = repo.write("posts/a.md", "two", "Update", Some(&first)).await.unwrap();
        assert_ne!(first, second);

        let err = repo.write("posts/a.md", "three", "Update", Some(&first)).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(repo.commits(), vec!["Create", "Update"]);
    }

    #[tokio::test]
    async fn test_delete_and_list() {
        let repo = MemoryRepository::new()
            .with_file("posts/a.md", "a")
            .with_file("posts/b.md", "b")
            .with_file("posts/img/c.png", "c");

        let entries = repo.list("posts/").await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| (e.name.as_str(), e.kind.as_str())).collect();
        assert_eq!(names, vec![("a.md", "file"), ("b.md", "file"), ("img", "dir")]);

        let sha = repo.sha_of("posts/a.md").unwrap();
        assert!(repo.delete("posts/a.md", "Delete", "wrong").await.unwrap_err().is_conflict());
        repo.delete("posts/a.md", "Delete", &sha).await.unwrap();
        assert!(repo.text_of("posts/a.md").is_none());
        assert!(matches!(repo.read("posts/a.md").await, Err(Error::Api { status: 404, .. })));
    }
}
