use std::sync::{Arc, Mutex};

use spdlog::{info, warn};

use crate::content::frontmatter::FrontmatterCodec;
use crate::content::html_to_markdown::html_to_markdown;
use crate::content::markdown_to_html::markdown_to_html;
use crate::content::ContentRecord;
use crate::context::{AppContext, Notifier};
use crate::error::{Error, Result};
use crate::repository::{ContentRepository, RepoEntry};
use crate::seo::{self, SeoReport, SeoInput};
use crate::text_utils::today;
use crate::view::preview_renderer::PreviewRenderer;

/// The rich text area of a front end. It holds the post body as HTML.
pub trait EditorSurface: Send + Sync {
    fn html(&self) -> String;

    fn set_html(&self, html: &str);
}

/// Surface backed by a string, for front ends without a rich text widget.
#[derive(Default)]
pub struct MemorySurface {
    html: Mutex<String>,
}

impl MemorySurface {
    pub fn new(html: &str) -> Self {
        MemorySurface {
            html: Mutex::new(html.to_string()),
        }
    }
}

impl EditorSurface for MemorySurface {
    fn html(&self) -> String {
        self.html.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_html(&self, html: &str) {
        *self.html.lock().unwrap_or_else(|e| e.into_inner()) = html.to_string();
    }
}

/// Lowercase, only `[a-z0-9-]` kept.
pub fn sanitize_tag(tag: &str) -> String {
    tag.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

/// One post being written. The header fields live in the record, the body in
/// the surface. Once published or loaded, the file name stays the same and the
/// sha follows every write.
pub struct Editor {
    repository: Arc<dyn ContentRepository>,
    notifier: Arc<dyn Notifier>,
    surface: Arc<dyn EditorSurface>,
    codec: FrontmatterCodec,
    posts_path: String,
    record: ContentRecord,
    file_name: Option<String>,
    sha: Option<String>,
    files: Vec<RepoEntry>,
}

impl Editor {
    pub fn new(ctx: &AppContext, surface: Arc<dyn EditorSurface>) -> Self {
        Editor {
            repository: ctx.repository.clone(),
            notifier: ctx.notifier.clone(),
            surface,
            codec: FrontmatterCodec::new(&ctx.layout),
            posts_path: ctx.remote.posts_path.clone(),
            record: ContentRecord {
                publish_date: today(),
                ..Default::default()
            },
            file_name: None,
            sha: None,
            files: vec![],
        }
    }

    pub fn record(&self) -> &ContentRecord {
        &self.record
    }

    /// Header fields for the front end to fill. Tags go through [`add_tag`](Self::add_tag).
    pub fn record_mut(&mut self) -> &mut ContentRecord {
        &mut self.record
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn sha(&self) -> Option<&str> {
        self.sha.as_deref()
    }

    pub fn surface(&self) -> &dyn EditorSurface {
        self.surface.as_ref()
    }

    /// Starts a new post dated today.
    pub fn new_post(&mut self, author: &str) {
        self.clear();
        self.record.author = author.to_string();
    }

    /// Empties every field but the author and forgets the loaded file.
    pub fn clear(&mut self) {
        let author = std::mem::take(&mut self.record.author);
        self.record = ContentRecord {
            publish_date: today(),
            author,
            ..Default::default()
        };
        self.surface.set_html("");
        self.file_name = None;
        self.sha = None;
    }

    /// Returns the tag as stored, `None` when it was empty or already there.
    pub fn add_tag(&mut self, tag: &str) -> Option<String> {
        let tag = sanitize_tag(tag.trim());
        if tag.is_empty() || self.record.tags.contains(&tag) {
            return None;
        }
        self.record.tags.push(tag.clone());
        Some(tag)
    }

    pub fn remove_tag(&mut self, tag: &str) {
        self.record.tags.retain(|t| t != tag);
    }

    /// Rules the post breaks, publishing is refused while any is left.
    pub fn validate(&self) -> Vec<String> {
        let title = self.record.title.trim().chars().count();
        let description = self.record.description.trim().chars().count();
        let content = self.surface.html().chars().count();

        let mut errors = vec![];
        if title < 10 {
            errors.push("The title needs at least 10 characters");
        }
        if title > 70 {
            errors.push("The title is too long (70 characters at most for SEO)");
        }
        if description < 50 {
            errors.push("The description needs at least 50 characters");
        }
        if description > 160 {
            errors.push("The description is too long (160 characters at most for SEO)");
        }
        if self.record.tags.is_empty() {
            errors.push("Add at least one tag");
        }
        if self.record.hero_image.trim().is_empty() {
            errors.push("Add a hero image");
        }
        if content < 100 {
            errors.push("The content is too short (100 characters at least)");
        }
        errors.into_iter().map(String::from).collect()
    }

    /// Markdown of the surface content.
    pub fn markdown(&self) -> Result<String> {
        html_to_markdown(&self.surface.html())
    }

    pub fn seo_report(&self) -> Result<SeoReport> {
        let content = self.markdown()?;
        Ok(seo::analyze(&SeoInput {
            title: &self.record.title,
            description: &self.record.description,
            content: &content,
            hero_image: &self.record.hero_image,
        }))
    }

    pub fn preview(&self, renderer: &PreviewRenderer) -> String {
        renderer.render(&self.record, &self.surface.html())
    }

    /// Writes the post with the message `Update <file name>`. Returns the file name.
    pub async fn publish(&mut self) -> Result<String> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(Error::Validation(errors));
        }

        let mut record = self.record.clone();
        record.body = match self.markdown() {
            Ok(body) => body,
            Err(e) => {
                warn!("Post body not published: {}", e);
                self.notifier.error(&format!("Error: {}", e));
                return Err(e);
            }
        };
        let text = self.codec.encode(&record);

        let file_name = self.file_name.clone().unwrap_or_else(|| record.file_name());
        let path = format!("{}{}", self.posts_path, file_name);
        let message = format!("Update {}", file_name);

        let sha = match self.repository.write(&path, &text, &message, self.sha.as_deref()).await {
            Ok(sha) => sha,
            Err(e) => {
                warn!("Error publishing {}: {}", path, e);
                self.notifier.error(&format!("Error: {}", e));
                return Err(e);
            }
        };

        info!("Published {} ({})", path, sha);
        self.record = record;
        self.sha = Some(sha);
        self.file_name = Some(file_name.clone());
        self.notifier.success("Published");
        Ok(file_name)
    }

    /// Opens a post of the posts directory. The surface gets the body as HTML.
    pub async fn load(&mut self, file_name: &str) -> Result<()> {
        match self.load_file(file_name).await {
            Ok(_) => {
                self.notifier.success(&format!("Post \"{}\" loaded", file_name));
                Ok(())
            }
            Err(e) => {
                warn!("Error loading {}: {}", file_name, e);
                self.notifier.error(&format!("Error loading post: {}", e));
                Err(e)
            }
        }
    }

    async fn load_file(&mut self, file_name: &str) -> Result<()> {
        let path = format!("{}{}", self.posts_path, file_name);
        let (text, sha) = self.repository.read_text(&path).await?;
        let record = self.codec.decode(&text)?;
        if record.title.is_empty() {
            warn!("{} has no title", path);
        }

        let html = markdown_to_html(&record.body)?;
        self.surface.set_html(&html);
        self.record = record;
        self.file_name = Some(file_name.to_string());
        self.sha = Some(sha);
        Ok(())
    }

    /// Markdown files of the posts directory.
    pub async fn list_files(&mut self) -> Result<Vec<RepoEntry>> {
        let files = match self.repository.list(&self.posts_path).await {
            Ok(files) => files,
            Err(e) => {
                self.notifier.error("Error loading posts");
                return Err(e);
            }
        };
        self.files = files.into_iter().filter(|f| f.is_markdown()).collect();
        Ok(self.files.clone())
    }

    /// Case insensitive match on the file name over the last listing.
    pub fn filter_files(&self, query: &str) -> Vec<RepoEntry> {
        let query = query.to_lowercase();
        self.files.iter()
            .filter(|f| query.is_empty() || f.name.to_lowercase().contains(&query))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::autosave::{AutoSaver, SaveStatus, DEFAULT_INTERVAL};
    use crate::context::testing::context;
    use crate::context::RecordingNotifier;
    use crate::repository::MemoryRepository;
    use crate::store::MemoryStore;

    const BODY_HTML: &str = "<h2>Cómo llegar</h2><p>Desde Buenos Aires hay vuelos diarios a Ushuaia, \
        la ciudad más austral del mundo, con escalas en El Calafate.</p>\
        <iframe src=\"https://www.youtube.com/embed/xyz\"></iframe>";

    struct Fixture {
        editor: Editor,
        repo: Arc<MemoryRepository>,
        notifier: Arc<RecordingNotifier>,
        surface: Arc<MemorySurface>,
    }

    fn fixture(repo: MemoryRepository) -> Fixture {
        let repo = Arc::new(repo);
        let notifier = Arc::new(RecordingNotifier::new());
        let surface = Arc::new(MemorySurface::default());
        let ctx = context(repo.clone(), Arc::new(MemoryStore::new()), notifier.clone());
        Fixture {
            editor: Editor::new(&ctx, surface.clone()),
            repo,
            notifier,
            surface,
        }
    }

    fn fill(editor: &mut Editor) {
        editor.new_post("laura");
        let record = editor.record_mut();
        record.title = "Ushuaia en invierno".to_string();
        record.description = "Qué hacer en la ciudad del fin del mundo cuando llega la nieve".to_string();
        record.publish_date = "2024-06-01".to_string();
        record.hero_image = "https://img.example.com/ushuaia.jpg".to_string();
        editor.add_tag("Argentina");
        editor.surface().set_html(BODY_HTML);
    }

    #[test]
    fn test_tags() {
        let mut f = fixture(MemoryRepository::new());
        assert_eq!(f.editor.add_tag(" Buenos Aires! "), Some("buenosaires".to_string()));
        assert_eq!(f.editor.add_tag("BUENOSAIRES"), None);
        assert_eq!(f.editor.add_tag("???"), None);
        assert_eq!(f.editor.add_tag("fin-del-mundo"), Some("fin-del-mundo".to_string()));
        f.editor.remove_tag("buenosaires");
        assert_eq!(f.editor.record().tags, vec!["fin-del-mundo"]);
    }

    #[test]
    fn test_validate() {
        let mut f = fixture(MemoryRepository::new());
        assert_eq!(f.editor.validate().len(), 5);

        fill(&mut f.editor);
        assert!(f.editor.validate().is_empty());

        f.editor.record_mut().title = "T".repeat(71);
        f.editor.record_mut().description = "D".repeat(161);
        let errors = f.editor.validate();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("The title is too long"));
    }

    #[tokio::test]
    async fn test_publish_refuses_too_long_title() {
        let mut f = fixture(MemoryRepository::new());
        fill(&mut f.editor);
        f.editor.record_mut().title = "Ushuaia ".repeat(10);

        let err = f.editor.publish().await.unwrap_err();
        assert!(matches!(err, Error::Validation(ref msgs) if msgs.len() == 1));
        assert!(f.repo.commits().is_empty());
    }

    #[tokio::test]
    async fn test_publish_refuses_unreadable_body() {
        let mut f = fixture(MemoryRepository::new());
        fill(&mut f.editor);
        f.editor.surface().set_html(&format!("{}<!-- draft <p>Tail</p>", BODY_HTML));

        let err = f.editor.publish().await.unwrap_err();
        assert!(matches!(err, Error::Html(_)));
        assert!(f.repo.commits().is_empty());
        assert_eq!(f.notifier.errors().len(), 1);
        assert!(f.editor.file_name().is_none());
    }

    #[tokio::test]
    async fn test_publish_refuses_invalid_post() {
        let mut f = fixture(MemoryRepository::new());
        f.editor.new_post("laura");
        let err = f.editor.publish().await.unwrap_err();
        assert!(matches!(err, Error::Validation(ref msgs) if msgs.len() == 5));
        assert!(f.repo.commits().is_empty());
    }

    #[tokio::test]
    async fn test_publish_then_update() {
        let mut f = fixture(MemoryRepository::new());
        fill(&mut f.editor);

        let name = f.editor.publish().await.unwrap();
        assert_eq!(name, "2024-06-01-ushuaia-en-invierno.md");
        let path = "src/content/blog/2024-06-01-ushuaia-en-invierno.md";
        let text = f.repo.text_of(path).unwrap();
        assert!(text.starts_with("---\ntitle: \"Ushuaia en invierno\"\n"));
        assert!(text.contains("tags: [\"argentina\"]\n---\n\n## Cómo llegar\n\n"));
        assert!(text.ends_with("\n\nhttps://www.youtube.com/embed/xyz"));
        assert_eq!(f.editor.sha(), f.repo.sha_of(path).as_deref());

        // The file name doesn't follow the title once published
        f.editor.record_mut().title = "Ushuaia en pleno invierno".to_string();
        let name = f.editor.publish().await.unwrap();
        assert_eq!(name, "2024-06-01-ushuaia-en-invierno.md");
        assert_eq!(f.repo.commits(), vec![format!("Update {}", name), format!("Update {}", name)]);
        assert!(f.repo.text_of(path).unwrap().contains("Ushuaia en pleno invierno"));
    }

    #[tokio::test]
    async fn test_publish_conflict_is_reported() {
        let mut f = fixture(MemoryRepository::new()
            .with_file("src/content/blog/2024-06-01-ushuaia-en-invierno.md", "someone else"));
        fill(&mut f.editor);

        let err = f.editor.publish().await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(f.notifier.errors().len(), 1);
        assert!(f.editor.sha().is_none());
        assert!(f.editor.file_name().is_none());
    }

    #[tokio::test]
    async fn test_load() {
        let text = "---\ntitle: \"Tapas en Sevilla\"\ndescription: \"d\"\npublishDate: \"2024-08-15\"\n\
                    author: \"daniel\"\nheroImage: \"h.jpg\"\ntags: [\"espana\", \"comida\"]\n---\n\n## Dónde\n\nEn **Triana**.";
        let mut f = fixture(MemoryRepository::new().with_file("src/content/blog/tapas.md", text));

        f.editor.load("tapas.md").await.unwrap();
        assert_eq!(f.editor.record().title, "Tapas en Sevilla");
        assert_eq!(f.editor.record().tags, vec!["espana", "comida"]);
        assert_eq!(f.editor.file_name(), Some("tapas.md"));
        assert_eq!(f.editor.sha(), f.repo.sha_of("src/content/blog/tapas.md").as_deref());
        let html = f.surface.html();
        assert!(html.contains("<h2>Dónde</h2>"));
        assert!(html.contains("<strong>Triana</strong>"));

        f.editor.clear();
        assert!(f.editor.file_name().is_none());
        assert_eq!(f.editor.record().author, "daniel");
        assert_eq!(f.surface.html(), "");
    }

    #[tokio::test]
    async fn test_load_malformed() {
        let mut f = fixture(MemoryRepository::new().with_file("src/content/blog/bad.md", "no header at all"));
        let err = f.editor.load("bad.md").await.unwrap_err();
        assert!(matches!(err, Error::MalformedFile(_)));
        assert_eq!(f.notifier.errors().len(), 1);
        assert!(f.editor.file_name().is_none());
    }

    #[tokio::test]
    async fn test_list_and_filter_files() {
        let mut f = fixture(MemoryRepository::new()
            .with_file("src/content/blog/2024-ushuaia.md", "x")
            .with_file("src/content/blog/2024-Sevilla.md", "x")
            .with_file("src/content/blog/notes.txt", "x"));

        let files = f.editor.list_files().await.unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(f.editor.filter_files("").len(), 2);
        let found = f.editor.filter_files("SEVILLA");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "2024-Sevilla.md");
        assert!(f.editor.filter_files(" sevilla").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_autosave_publishes_edits() {
        let Fixture { mut editor, repo, surface, .. } = fixture(MemoryRepository::new());
        fill(&mut editor);
        let editor = Arc::new(tokio::sync::Mutex::new(editor));

        let saving = editor.clone();
        let saver = AutoSaver::start(DEFAULT_INTERVAL, move || {
            let editor = saving.clone();
            async move { editor.lock().await.publish().await.map(|_| ()) }
        });

        saver.mark_dirty();
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(saver.status(), SaveStatus::Saved);
        assert_eq!(repo.commits().len(), 1);

        surface.set_html(&format!("{}<p>Más datos</p>", BODY_HTML));
        saver.mark_dirty();
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(repo.commits().len(), 2);
        let text = repo.text_of("src/content/blog/2024-06-01-ushuaia-en-invierno.md").unwrap();
        assert!(text.ends_with("Más datos"));
    }
}
