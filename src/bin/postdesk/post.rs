use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use postdesk::auth::Panel;
use postdesk::autosave::AutoSaver;
use postdesk::config::Config;
use postdesk::content::html_to_markdown::html_to_markdown;
use postdesk::content::ContentRecord;
use postdesk::context::AppContext;
use postdesk::editor::{Editor, EditorSurface, MemorySurface};
use postdesk::error::Error;
use postdesk::seo::{self, AlertKind, SeoInput, SeoReport};
use postdesk::text_utils::today;
use postdesk::util::os_helper::get_name;
use postdesk::view::preview_renderer::{PreviewRenderer, DEFAULT_PREVIEW_TEMPLATE};

use crate::{connect, Credentials, PostCmd, PostSource, SeoArgs};

/// Header fields of a post as written in the meta file. Fields left out keep
/// their current value when updating a post.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PostMeta {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    publish_date: Option<String>,
    author: Option<String>,
    #[serde(default)]
    hero_image: String,
    #[serde(default)]
    tags: Vec<String>,
    flight_destination: Option<String>,
    tour_city: Option<String>,
}

impl From<&ContentRecord> for PostMeta {
    fn from(record: &ContentRecord) -> Self {
        PostMeta {
            title: record.title.clone(),
            description: record.description.clone(),
            publish_date: Some(record.publish_date.clone()),
            author: Some(record.author.clone()),
            hero_image: record.hero_image.clone(),
            tags: record.tags.clone(),
            flight_destination: record.flight_destination.clone(),
            tour_city: record.tour_city.clone(),
        }
    }
}

fn read_source(source: &PostSource) -> Result<(PostMeta, String)> {
    let meta_src = fs::read_to_string(&source.meta)
        .with_context(|| format!("Error reading {}", source.meta.display()))?;
    let meta: PostMeta = toml::from_str(&meta_src)
        .with_context(|| format!("Error parsing {}", source.meta.display()))?;
    let html = fs::read_to_string(&source.html)
        .with_context(|| format!("Error reading {}", source.html.display()))?;
    Ok((meta, html))
}

fn record_from(meta: &PostMeta) -> ContentRecord {
    ContentRecord {
        title: meta.title.clone(),
        description: meta.description.clone(),
        publish_date: meta.publish_date.clone().unwrap_or_else(today),
        author: meta.author.clone().unwrap_or_default(),
        hero_image: meta.hero_image.clone(),
        tags: meta.tags.clone(),
        flight_destination: meta.flight_destination.clone(),
        tour_city: meta.tour_city.clone(),
        body: String::new(),
    }
}

fn set(field: &mut String, value: String) {
    if !value.trim().is_empty() {
        *field = value;
    }
}

fn apply_meta(editor: &mut Editor, meta: PostMeta) {
    let record = editor.record_mut();
    set(&mut record.title, meta.title);
    set(&mut record.description, meta.description);
    set(&mut record.hero_image, meta.hero_image);
    if let Some(date) = meta.publish_date {
        set(&mut record.publish_date, date);
    }
    if let Some(author) = meta.author {
        set(&mut record.author, author);
    }
    if meta.flight_destination.is_some() {
        record.flight_destination = meta.flight_destination;
    }
    if meta.tour_city.is_some() {
        record.tour_city = meta.tour_city;
    }

    if !meta.tags.is_empty() {
        editor.record_mut().tags.clear();
        for tag in meta.tags.iter() {
            editor.add_tag(tag);
        }
    }
}

/// Author of a new post: the one mapped to the signed in account, then the
/// configured default, then the OS user.
fn default_author(config: &Config, ctx: &AppContext) -> String {
    if let Some(author) = config.author_for(&ctx.session.email) {
        return author.slug.clone();
    }
    match config.defaults.author {
        Some(ref author) => author.clone(),
        None => get_name(),
    }
}

fn print_report(report: &SeoReport) {
    println!("SEO score: {}/100 ({})", report.score, report.label());
    for alert in report.alerts.iter() {
        let mark = match alert.kind {
            AlertKind::Error => "x",
            AlertKind::Warning => "!",
            AlertKind::Info => "i",
            AlertKind::Success => "v",
        };
        println!("  [{}] {}", mark, alert.message);
    }
    for suggestion in report.suggestions.iter() {
        println!("  - {}", suggestion);
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).with_context(|| format!("Error writing {}", path.display()))
}

pub async fn post_cmd(config: &Config, creds: &Credentials, cmd: PostCmd) -> Result<()> {
    match cmd {
        PostCmd::Load { name, out, meta_out } => {
            let ctx = connect(config, creds, Panel::Editor).await?;
            let surface = Arc::new(MemorySurface::default());
            let mut editor = Editor::new(&ctx, surface.clone());
            editor.load(&name).await?;

            write_file(&out, &surface.html())?;
            let meta = toml::to_string(&PostMeta::from(editor.record()))?;
            match meta_out {
                Some(path) => write_file(&path, &meta)?,
                None => print!("{}", meta),
            }
            Ok(())
        }
        PostCmd::Publish { source, name } => {
            let (meta, html) = read_source(&source)?;
            let ctx = connect(config, creds, Panel::Editor).await?;
            let surface = Arc::new(MemorySurface::default());
            let mut editor = Editor::new(&ctx, surface.clone());

            match name {
                Some(name) => editor.load(&name).await?,
                None => editor.new_post(&default_author(config, &ctx)),
            }
            apply_meta(&mut editor, meta);
            surface.set_html(&html);

            match editor.publish().await {
                Ok(file_name) => {
                    println!("Published {}", ctx.remote.post_path(&file_name));
                    print_report(&editor.seo_report()?);
                    Ok(())
                }
                Err(Error::Validation(errors)) => {
                    for error in errors.iter() {
                        eprintln!("  - {}", error);
                    }
                    bail!("The post is not ready to be published")
                }
                Err(e) => Err(e.into()),
            }
        }
        PostCmd::Watch { source, name } => watch_cmd(config, creds, source, name).await,
        PostCmd::Preview { source, out, template } => {
            let (meta, html) = read_source(&source)?;
            let template_src = match template {
                Some(ref path) => fs::read_to_string(path).with_context(|| format!("Error reading {}", path.display()))?,
                None => DEFAULT_PREVIEW_TEMPLATE.to_string(),
            };
            let renderer = PreviewRenderer::new(&template_src)?;
            write_file(&out, &renderer.render(&record_from(&meta), &html))?;
            println!("Preview written to {}", out.display());
            Ok(())
        }
    }
}

fn modified(source: &PostSource) -> Option<(SystemTime, SystemTime)> {
    let meta = fs::metadata(&source.meta).and_then(|m| m.modified()).ok()?;
    let html = fs::metadata(&source.html).and_then(|m| m.modified()).ok()?;
    Some((meta, html))
}

/// Publishes the files once they stop changing for the auto-save interval.
async fn watch_cmd(config: &Config, creds: &Credentials, source: PostSource, name: Option<String>) -> Result<()> {
    let ctx = connect(config, creds, Panel::Editor).await?;
    let mut editor = Editor::new(&ctx, Arc::new(MemorySurface::default()));
    match name {
        Some(name) => editor.load(&name).await?,
        None => editor.new_post(&default_author(config, &ctx)),
    }
    let editor = Arc::new(tokio::sync::Mutex::new(editor));

    let saving = (editor.clone(), source.clone());
    let saver = AutoSaver::start(config.autosave_interval(), move || {
        let (editor, source) = saving.clone();
        async move {
            let (meta, html) = read_source(&source).map_err(|e| Error::invalid_input(format!("{:#}", e)))?;
            let mut editor = editor.lock().await;
            apply_meta(&mut editor, meta);
            editor.surface().set_html(&html);
            let res = editor.publish().await.map(|_| ());
            if let Err(ref e) = res {
                eprintln!("{}", e);
            }
            res
        }
    });

    println!("Watching {} and {}, Ctrl-C to stop", source.meta.display(), source.html.display());
    let mut last = modified(&source);
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut status = saver.subscribe();
    let stop = tokio::signal::ctrl_c();
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let current = modified(&source);
                if current != last {
                    last = current;
                    saver.mark_dirty();
                }
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let label = status.borrow_and_update().label();
                if !label.is_empty() {
                    println!("{}", label);
                }
            }
            _ = &mut stop => break,
        }
    }

    if saver.is_dirty() {
        println!("Stopped with unsaved changes");
    }
    if let Some(file_name) = editor.lock().await.file_name() {
        println!("Last published as {}", ctx.remote.post_path(file_name));
    }
    Ok(())
}

pub fn seo_cmd(args: SeoArgs) -> Result<()> {
    let (meta, html) = read_source(&args.source)?;
    let content = html_to_markdown(&html)?;
    let report = seo::analyze(&SeoInput {
        title: &meta.title,
        description: &meta.description,
        content: &content,
        hero_image: &meta.hero_image,
    });
    print_report(&report);
    Ok(())
}
