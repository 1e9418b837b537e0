use std::fs;

use anyhow::{anyhow, bail, Context, Result};

use postdesk::auth::Panel;
use postdesk::config::Config;
use postdesk::view::grid_renderer::{GridRenderer, DEFAULT_GRID_TEMPLATE};
use postdesk::view::post_grid::{GridEntry, LoadOutcome, PostGrid};

use crate::{connect, Credentials, ListArgs, PostsCmd};

pub async fn posts_cmd(config: &Config, creds: &Credentials, cmd: PostsCmd) -> Result<()> {
    match cmd {
        PostsCmd::List(args) => list_cmd(config, creds, args).await,
        PostsCmd::Delete { name } => delete_cmd(config, creds, &name).await,
    }
}

fn print_entries(entries: &[GridEntry]) {
    for entry in entries {
        println!("{:<12} {:<50} {:<16} {}", entry.publish_date, entry.title, entry.author, entry.name);
    }
}

async fn list_cmd(config: &Config, creds: &Credentials, args: ListArgs) -> Result<()> {
    let ctx = connect(config, creds, Panel::Admin).await?;
    let grid = PostGrid::new(&ctx);
    grid.load().await?;

    let entries = grid.filter(args.filter.as_deref().unwrap_or_default());
    let Some(out) = args.html else {
        println!("{} posts", entries.len());
        print_entries(&entries);
        return Ok(());
    };

    let template_src = match args.template {
        Some(ref path) => fs::read_to_string(path).with_context(|| format!("Error reading {}", path.display()))?,
        None => DEFAULT_GRID_TEMPLATE.to_string(),
    };
    let renderer = GridRenderer::new(&template_src, ctx.page_size)?;
    let html = renderer.render(&entries, args.page, &ctx.remote)?;
    fs::write(&out, html).with_context(|| format!("Error writing {}", out.display()))?;
    println!("Page {} written to {}", args.page, out.display());
    Ok(())
}

async fn delete_cmd(config: &Config, creds: &Credentials, name: &str) -> Result<()> {
    let ctx = connect(config, creds, Panel::Admin).await?;
    let grid = PostGrid::new(&ctx);
    grid.load().await?;

    let entry = grid.find(name).ok_or_else(|| anyhow!("Post {} not found", name))?;
    match grid.delete(&entry).await? {
        LoadOutcome::Loaded(entries) => println!("{} deleted, {} posts left", entry.name, entries.len()),
        LoadOutcome::Stale => bail!("The grid changed while deleting {}", entry.name),
    }
    Ok(())
}
