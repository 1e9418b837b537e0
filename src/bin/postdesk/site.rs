use anyhow::Result;

use postdesk::auth::Panel;
use postdesk::authors::AuthorDirectory;
use postdesk::config::Config;
use postdesk::settings::MaintenanceSettings;
use postdesk::tours::{city_label, TourCatalog, TourDraft};

use crate::{connect, AuthorsCmd, Credentials, MaintenanceCmd, Switch, ToursCmd};

pub async fn tours_cmd(config: &Config, creds: &Credentials, cmd: ToursCmd) -> Result<()> {
    let ctx = connect(config, creds, Panel::Admin).await?;
    let mut catalog = TourCatalog::load(&ctx).await?;

    match cmd {
        ToursCmd::List { country } => {
            for c in catalog.countries() {
                if country.as_deref().is_some_and(|id| id != c.id) {
                    continue;
                }
                let tours = catalog.tours(c.id);
                println!("{} {} ({})", c.flag, c.name, tours.len());
                for (idx, tour) in tours.iter().enumerate() {
                    println!("  {:>2} {:<40} {:<14} {:<10} {}",
                             idx, tour.title, city_label(&tour.city), tour.price, tour.duration);
                }
            }
        }
        ToursCmd::Add(args) => {
            let draft = TourDraft {
                title: args.title,
                city: args.city,
                price: args.price,
                duration: args.duration,
                image: args.image,
                affiliate_link: args.link,
            };
            let tour = catalog.save_tour(&args.country, args.index, draft).await?;
            println!("Saved {} ({})", tour.title, tour.id);
        }
        ToursCmd::Remove { country, index } => {
            let tour = catalog.delete_tour(&country, index).await?;
            println!("Removed {}", tour.title);
        }
        ToursCmd::Migrate => {
            let count = catalog.migrate_defaults().await?;
            println!("{} Argentina tours migrated", count);
        }
    }
    Ok(())
}

pub async fn maintenance_cmd(config: &Config, creds: &Credentials, cmd: MaintenanceCmd) -> Result<()> {
    let ctx = connect(config, creds, Panel::Admin).await?;
    let mut settings = MaintenanceSettings::load(&ctx).await?;

    if let MaintenanceCmd::Set { country, state } = cmd {
        settings.set_maintenance(&country, matches!(state, Switch::On)).await?;
    }

    for (country, on) in settings.modes() {
        println!("{:<12} {}", country, if *on { "maintenance" } else { "active" });
    }
    println!("Message: {}", settings.message());
    Ok(())
}

pub async fn authors_cmd(config: &Config, creds: &Credentials, cmd: AuthorsCmd) -> Result<()> {
    let ctx = connect(config, creds, Panel::Editor).await?;
    let mut directory = AuthorDirectory::load(&ctx, &config.authors).await;

    if let AuthorsCmd::Add { name, role, bio } = cmd {
        let author = directory.add_author(&name, &role, &bio).await?;
        println!("Added {}", AuthorDirectory::label(author));
    }

    for author in directory.authors() {
        println!("{:<20} {}", author.slug, AuthorDirectory::label(author));
    }
    Ok(())
}
