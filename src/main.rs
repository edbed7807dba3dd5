use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pricewatch::app::AppContext;
use pricewatch::cli::{commands, Cli, Commands, UserAction, WebsiteAction};
use pricewatch::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Website { action } => match action {
            WebsiteAction::Add {
                name,
                url,
                owner,
                category,
                description,
                inactive,
            } => {
                commands::add_website(
                    &ctx,
                    &name,
                    &url,
                    owner,
                    &category,
                    &description,
                    !inactive,
                )?;
            }
            WebsiteAction::List { active, inactive } => {
                commands::list_websites(&ctx, WebsiteAction::list_filter(active, inactive))?;
            }
            WebsiteAction::Show { id } => {
                commands::show_website(&ctx, id)?;
            }
            WebsiteAction::Remove { ids } => {
                commands::remove_websites(&ctx, &ids)?;
            }
            WebsiteAction::Enable { id } => {
                commands::set_website_active(&ctx, id, true)?;
            }
            WebsiteAction::Disable { id } => {
                commands::set_website_active(&ctx, id, false)?;
            }
        },
        Commands::User { action } => match action {
            UserAction::Add { id, email } => {
                commands::add_user(&ctx, &id, &email)?;
            }
        },
        Commands::Scrape(args) => {
            commands::scrape(&ctx, args).await?;
        }
        Commands::Products(args) => {
            commands::list_products(&ctx, args)?;
        }
        Commands::Notifications { owner } => {
            commands::list_notifications(&ctx, &owner)?;
        }
    }

    Ok(())
}
