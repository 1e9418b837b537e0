use std::sync::Arc;

use serde::{Deserialize, Serialize};
use spdlog::{info, warn};

use crate::config::AuthorEntry;
use crate::content::slug::slugify;
use crate::context::{AppContext, Notifier};
use crate::error::{Error, Result};
use crate::repository::ContentRepository;

pub const AUTHORS_PATH: &str = "src/data/authors.json";
pub const DEFAULT_AVATAR: &str = "/images/default-avatar.jpg";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub slug: String,
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub avatar: String,
}

impl From<&AuthorEntry> for Author {
    fn from(entry: &AuthorEntry) -> Self {
        Author {
            slug: entry.slug.clone(),
            name: entry.name.clone(),
            role: entry.role.clone(),
            bio: String::new(),
            avatar: DEFAULT_AVATAR.to_string(),
        }
    }
}

/// Authors a post can be signed by, as published with the site.
pub struct AuthorDirectory {
    repository: Arc<dyn ContentRepository>,
    notifier: Arc<dyn Notifier>,
    authors: Vec<Author>,
}

impl AuthorDirectory {
    /// Reads the authors file of the site. When it can't be read or parsed the
    /// authors of the local configuration that have a slug are used.
    pub async fn load(ctx: &AppContext, fallback: &[AuthorEntry]) -> AuthorDirectory {
        let authors = match read_authors(ctx.repository.as_ref()).await {
            Ok(authors) => authors,
            Err(e) => {
                warn!("{} not available ({}), using the configured authors", AUTHORS_PATH, e);
                fallback.iter()
                    .filter(|a| !a.slug.is_empty())
                    .map(Author::from)
                    .collect()
            }
        };

        info!("{} authors", authors.len());
        AuthorDirectory {
            repository: ctx.repository.clone(),
            notifier: ctx.notifier.clone(),
            authors,
        }
    }

    pub fn authors(&self) -> &[Author] {
        &self.authors
    }

    pub fn find(&self, slug: &str) -> Option<&Author> {
        self.authors.iter().find(|a| a.slug == slug)
    }

    /// `Name (Role)`, the way the author selector shows it.
    pub fn label(author: &Author) -> String {
        format!("{} ({})", author.name, author.role)
    }

    /// Adds the author and writes the whole list back.
    pub async fn add_author(&mut self, name: &str, role: &str, bio: &str) -> Result<&Author> {
        let (name, role) = (name.trim(), role.trim());
        if name.is_empty() || role.is_empty() {
            self.notifier.error("Name and role are required");
            return Err(Error::Validation(vec!["Name and role are required".to_string()]));
        }

        let author = Author {
            slug: slugify(name),
            name: name.to_string(),
            role: role.to_string(),
            bio: bio.trim().to_string(),
            avatar: DEFAULT_AVATAR.to_string(),
        };

        let written = self.write_with(author, name).await;
        match written {
            Ok(authors) => {
                self.authors = authors;
                self.notifier.success(&format!("Author \"{}\" saved", name));
                Ok(&self.authors[self.authors.len() - 1])
            }
            Err(e) => {
                warn!("Error saving author {}: {}", name, e);
                self.notifier.error(&format!("Error saving author: {}", e));
                Err(e)
            }
        }
    }

    async fn write_with(&self, author: Author, name: &str) -> Result<Vec<Author>> {
        let sha = match self.repository.read(AUTHORS_PATH).await {
            Ok(file) => Some(file.sha),
            Err(Error::Api { status: 404, .. }) => None,
            Err(e) => return Err(e),
        };

        let mut authors = self.authors.clone();
        authors.push(author);
        let text = serde_json::to_string_pretty(&authors)?;
        self.repository.write(AUTHORS_PATH, &text, &format!("Add author: {}", name), sha.as_deref()).await?;
        Ok(authors)
    }
}

async fn read_authors(repository: &dyn ContentRepository) -> Result<Vec<Author>> {
    let (text, _) = repository.read_text(AUTHORS_PATH).await?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::context;
    use crate::context::RecordingNotifier;
    use crate::repository::MemoryRepository;
    use crate::store::MemoryStore;

    const AUTHORS: &str = r#"[
  {"slug": "laura", "name": "Laura", "role": "Editora", "bio": "Viaja", "avatar": "/images/laura.jpg"}
]"#;

    fn configured() -> Vec<AuthorEntry> {
        vec![
            AuthorEntry {
                email: "dani@example.com".to_string(),
                slug: "daniel".to_string(),
                name: "Daniel".to_string(),
                role: "Autor".to_string(),
            },
            AuthorEntry {
                email: "guest@example.com".to_string(),
                slug: String::new(),
                name: "Guest".to_string(),
                role: "Autor".to_string(),
            },
        ]
    }

    async fn directory(repo: Arc<MemoryRepository>) -> (AuthorDirectory, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let ctx = context(repo, Arc::new(MemoryStore::new()), notifier.clone());
        (AuthorDirectory::load(&ctx, &configured()).await, notifier)
    }

    #[tokio::test]
    async fn test_load_from_repository() {
        let repo = Arc::new(MemoryRepository::new().with_file(AUTHORS_PATH, AUTHORS));
        let (dir, _) = directory(repo).await;
        assert_eq!(dir.authors().len(), 1);
        assert_eq!(dir.find("laura").unwrap().bio, "Viaja");
        assert_eq!(AuthorDirectory::label(&dir.authors()[0]), "Laura (Editora)");
    }

    #[tokio::test]
    async fn test_load_falls_back_to_config() {
        let repo = Arc::new(MemoryRepository::new().with_file(AUTHORS_PATH, "not json"));
        let (dir, _) = directory(repo).await;
        assert_eq!(dir.authors().len(), 1);
        assert_eq!(dir.authors()[0].slug, "daniel");
        assert_eq!(dir.authors()[0].avatar, DEFAULT_AVATAR);
    }

    #[tokio::test]
    async fn test_add_author() {
        let repo = Arc::new(MemoryRepository::new().with_file(AUTHORS_PATH, AUTHORS));
        let (mut dir, notifier) = directory(repo.clone()).await;

        let author = dir.add_author(" María José Núñez ", "Fotógrafa", "").await.unwrap();
        assert_eq!(author.slug, "maria-jose-nunez");

        let stored: Vec<Author> = serde_json::from_str(&repo.text_of(AUTHORS_PATH).unwrap()).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].name, "María José Núñez");
        assert_eq!(stored[1].avatar, DEFAULT_AVATAR);
        assert_eq!(repo.commits(), vec!["Add author: María José Núñez"]);
        assert!(repo.text_of(AUTHORS_PATH).unwrap().contains("\n  {\n    \"slug\": \"laura\""));
        assert_eq!(notifier.errors().len(), 0);
    }

    #[tokio::test]
    async fn test_add_author_creates_file() {
        let repo = Arc::new(MemoryRepository::new());
        let (mut dir, _) = directory(repo.clone()).await;

        dir.add_author("Ana", "Autora", "Bio").await.unwrap();
        let stored: Vec<Author> = serde_json::from_str(&repo.text_of(AUTHORS_PATH).unwrap()).unwrap();
        let slugs: Vec<_> = stored.iter().map(|a| a.slug.as_str()).collect();
        assert_eq!(slugs, vec!["daniel", "ana"]);
    }

    #[tokio::test]
    async fn test_add_author_requires_name_and_role() {
        let repo = Arc::new(MemoryRepository::new().with_file(AUTHORS_PATH, AUTHORS));
        let (mut dir, notifier) = directory(repo.clone()).await;

        assert!(matches!(dir.add_author("Ana", " ", "").await, Err(Error::Validation(_))));
        assert_eq!(notifier.errors().len(), 1);
        assert!(repo.commits().is_empty());
        assert_eq!(dir.authors().len(), 1);
    }
}
