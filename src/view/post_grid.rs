use std::cmp::Reverse;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use futures::future::try_join_all;
use spdlog::{info, warn};

use crate::content::frontmatter::decode_header;
use crate::context::{AppContext, Notifier};
use crate::error::{Error, Result};
use crate::repository::{ContentRepository, RepoEntry};
use crate::text_utils::parse_publish_date;

/// Frontmatter projection of a post, what the grid shows.
#[derive(Debug, Clone, PartialEq)]
pub struct GridEntry {
    pub name: String,
    pub path: String,
    pub sha: String,
    pub title: String,
    pub hero_image: String,
    pub publish_date: String,
    pub author: String,
}

#[derive(Debug, PartialEq)]
pub enum LoadOutcome {
    Loaded(Vec<GridEntry>),
    /// A newer load started before this one finished, its result was dropped.
    Stale,
}

/// Posts of the repository, cached after every load.
///
/// The cache is only ever replaced as a whole. Each load takes a generation
/// number and only the newest generation may write the cache.
pub struct PostGrid {
    repository: Arc<dyn ContentRepository>,
    notifier: Arc<dyn Notifier>,
    posts_path: String,
    can_delete: bool,
    cache: RwLock<Vec<GridEntry>>,
    generation: AtomicU64,
}

impl PostGrid {
    pub fn new(ctx: &AppContext) -> Self {
        PostGrid {
            repository: ctx.repository.clone(),
            notifier: ctx.notifier.clone(),
            posts_path: ctx.remote.posts_path.clone(),
            can_delete: ctx.is_admin(),
            cache: RwLock::new(vec![]),
            generation: AtomicU64::new(0),
        }
    }

    pub async fn load(&self) -> Result<LoadOutcome> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.fetch_entries().await;

        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        if self.generation.load(Ordering::SeqCst) != generation {
            info!("Dropping posts load #{}, a newer one is running", generation);
            return Ok(LoadOutcome::Stale);
        }

        match result {
            Ok(entries) => {
                info!("Loaded {} posts from {}", entries.len(), self.posts_path);
                *cache = entries.clone();
                Ok(LoadOutcome::Loaded(entries))
            }
            Err(e) => {
                cache.clear();
                drop(cache);
                warn!("Error loading posts: {}", e);
                self.notifier.error("Error loading posts");
                Err(e)
            }
        }
    }

    async fn fetch_entries(&self) -> Result<Vec<GridEntry>> {
        let files = self.repository.list(&self.posts_path).await?;
        let fetches = files.iter()
            .filter(|f| f.is_markdown())
            .map(|f| self.fetch_entry(f));

        let mut entries = try_join_all(fetches).await?;
        sort_by_date(&mut entries);
        Ok(entries)
    }

    async fn fetch_entry(&self, file: &RepoEntry) -> Result<GridEntry> {
        let (text, _) = self.repository.read_text(&file.path).await?;
        let header = decode_header(&text);
        Ok(GridEntry {
            name: file.name.clone(),
            path: file.path.clone(),
            sha: file.sha.clone(),
            title: header.title,
            hero_image: header.hero_image,
            publish_date: header.publish_date,
            author: header.author,
        })
    }

    /// Entries of the last successful load.
    pub fn entries(&self) -> Vec<GridEntry> {
        self.cache.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Case insensitive match on title or author over the cached entries.
    pub fn filter(&self, query: &str) -> Vec<GridEntry> {
        let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
        if query.is_empty() {
            return cache.clone();
        }
        let query = query.to_lowercase();

        cache.iter()
            .filter(|e| e.title.to_lowercase().contains(&query) || e.author.to_lowercase().contains(&query))
            .cloned()
            .collect()
    }

    pub fn find(&self, name: &str) -> Option<GridEntry> {
        let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
        cache.iter().find(|e| e.name == name || e.path == name).cloned()
    }

    /// Deletes the post and loads the grid again.
    pub async fn delete(&self, entry: &GridEntry) -> Result<LoadOutcome> {
        if !self.can_delete {
            return Err(Error::NotAllowed(format!("deleting {}", entry.path)));
        }

        let message = format!("[ADMIN] Delete {}", entry.path);
        if let Err(e) = self.repository.delete(&entry.path, &message, &entry.sha).await {
            warn!("Error deleting {}: {}", entry.path, e);
            self.notifier.error(&format!("Error: {}", e));
            return Err(e);
        }

        info!("Deleted {}", entry.path);
        self.notifier.success("Post deleted");
        self.load().await
    }
}

/// Newest first, posts without a readable date at the end.
fn sort_by_date(entries: &mut [GridEntry]) {
    entries.sort_by_cached_key(|e| Reverse(parse_publish_date(&e.publish_date).ok()));
}
