use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use spdlog::{info, warn};

use postdesk::auth::{Panel, PasswordIdentity};
use postdesk::config::Config;
use postdesk::context::{AppContext, LogNotifier};
use postdesk::logger::configure_logger;

use crate::config::open_config;

mod config;
mod init;
mod post;
mod posts;
mod site;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Config path
    #[arg(short, long)]
    config_path: Option<String>,

    /// Account used to sign in
    #[arg(long, env = "POSTDESK_EMAIL", global = true)]
    email: Option<String>,

    #[arg(long, env = "POSTDESK_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Grid of the published posts
    #[command(subcommand)]
    Posts(PostsCmd),
    /// Write a single post
    #[command(subcommand)]
    Post(PostCmd),
    /// SEO score of a post, without publishing it
    Seo(SeoArgs),
    /// Affiliate tours per country
    #[command(subcommand)]
    Tours(ToursCmd),
    /// Maintenance switch of the public sites
    #[command(subcommand)]
    Maintenance(MaintenanceCmd),
    /// Authors a post can be signed by
    #[command(subcommand)]
    Authors(AuthorsCmd),
    /// Writes a sample configuration
    Init(InitArgs),
}

#[derive(Subcommand, Debug)]
enum PostsCmd {
    List(ListArgs),
    /// Deletes a post from the repository (admin only)
    Delete {
        /// File name of the post
        name: String,
    },
}

#[derive(ClapArgs, Debug)]
struct ListArgs {
    /// Case insensitive match on title or author
    #[arg(short, long)]
    filter: Option<String>,

    #[arg(short, long, default_value_t = 1)]
    page: u32,

    /// Writes the page as HTML instead of printing it
    #[arg(long)]
    html: Option<PathBuf>,

    /// Ramhorns template used with --html
    #[arg(long)]
    template: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum PostCmd {
    /// Fetches a post, the body is written as HTML and the header as TOML
    Load {
        name: String,
        #[arg(short, long)]
        out: PathBuf,
        #[arg(short, long)]
        meta_out: Option<PathBuf>,
    },
    /// Publishes a post, creating it unless --name is given
    Publish {
        #[command(flatten)]
        source: PostSource,
        /// Existing post to update
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Publishes the post again after every change to its files
    Watch {
        #[command(flatten)]
        source: PostSource,
        /// Existing post to update
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Renders the post as it will look once published
    Preview {
        #[command(flatten)]
        source: PostSource,
        #[arg(short, long)]
        out: PathBuf,
        #[arg(long)]
        template: Option<PathBuf>,
    },
}

#[derive(ClapArgs, Debug, Clone)]
struct PostSource {
    /// TOML file with the header fields
    #[arg(short, long)]
    meta: PathBuf,

    /// HTML file with the body
    #[arg(long)]
    html: PathBuf,
}

#[derive(ClapArgs, Debug)]
struct SeoArgs {
    #[command(flatten)]
    source: PostSource,
}

#[derive(Subcommand, Debug)]
enum ToursCmd {
    List {
        /// Only this country
        #[arg(long)]
        country: Option<String>,
    },
    /// Adds a tour, or replaces the one at --index
    Add(TourArgs),
    Remove {
        #[arg(long)]
        country: String,
        #[arg(long)]
        index: usize,
    },
    /// Replaces the Argentina tours with the default list
    Migrate,
}

#[derive(ClapArgs, Debug)]
struct TourArgs {
    #[arg(long)]
    country: String,
    #[arg(long)]
    index: Option<usize>,
    #[arg(long)]
    title: String,
    #[arg(long)]
    city: String,
    #[arg(long, default_value = "")]
    price: String,
    #[arg(long, default_value = "")]
    duration: String,
    #[arg(long, default_value = "")]
    image: String,
    #[arg(long, default_value = "")]
    link: String,
}

#[derive(Subcommand, Debug)]
enum MaintenanceCmd {
    Show,
    Set {
        country: String,
        state: Switch,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Switch {
    /// Site in maintenance
    On,
    /// Site active
    Off,
}

#[derive(Subcommand, Debug)]
enum AuthorsCmd {
    List,
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        role: String,
        #[arg(long, default_value = "")]
        bio: String,
    },
}

#[derive(ClapArgs, Debug)]
struct InitArgs {
    /// Directory where postdesk.toml is written
    #[arg(short, long, default_value = ".")]
    out_dir: String,
}

struct Credentials {
    email: Option<String>,
    password: Option<String>,
}

/// Signs in and builds the context for one command.
async fn connect(config: &Config, creds: &Credentials, panel: Panel) -> Result<AppContext> {
    let (Some(email), Some(password)) = (creds.email.as_deref(), creds.password.as_deref()) else {
        bail!("Credentials missing. Use --email and --password or POSTDESK_EMAIL and POSTDESK_PASSWORD");
    };

    let identity = PasswordIdentity::new(config.identity_url(), &config.identity.api_key);
    let ctx = AppContext::connect(config, &identity, panel, email, password, Arc::new(LogNotifier)).await?;
    Ok(ctx)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let command = match args.command {
        Command::Init(init_args) => return init::init_cmd(init_args),
        command => command,
    };

    let config = open_config(args.config_path.map(PathBuf::from))?;
    if let Err(err) = configure_logger(&config) {
        warn!("Error creating logger sinks. Using console instead. Desc={}", err);
    }
    info!("Starting postdesk =-=-=-=-=-=-=-=-=-=-=-=-=-=-=-");

    let creds = Credentials {
        email: args.email,
        password: args.password,
    };

    match command {
        Command::Posts(cmd) => posts::posts_cmd(&config, &creds, cmd).await,
        Command::Post(cmd) => post::post_cmd(&config, &creds, cmd).await,
        Command::Seo(seo_args) => post::seo_cmd(seo_args),
        Command::Tours(cmd) => site::tours_cmd(&config, &creds, cmd).await,
        Command::Maintenance(cmd) => site::maintenance_cmd(&config, &creds, cmd).await,
        Command::Authors(cmd) => site::authors_cmd(&config, &creds, cmd).await,
        Command::Init(_) => Ok(()),
    }
}
