pub mod commands;

use clap::{Args, Parser, Subcommand};

use crate::domain::ScrapeMode;

#[derive(Parser)]
#[command(name = "pricewatch")]
#[command(about = "Multi-tenant product and price tracking", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage tracked websites
    Website {
        #[command(subcommand)]
        action: WebsiteAction,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Scrape a website now and store its products
    Scrape(ScrapeArgs),
    /// Browse stored products
    Products(ProductArgs),
    /// Show in-app notifications for an owner
    Notifications {
        #[arg(long)]
        owner: String,
    },
}

#[derive(Subcommand)]
pub enum WebsiteAction {
    /// Register a website
    Add {
        name: String,
        /// http(s) URL to scrape
        url: String,
        #[arg(long)]
        owner: Option<String>,
        #[arg(long, default_value = "general")]
        category: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Register without scheduling it for scrapes
        #[arg(long)]
        inactive: bool,
    },
    /// List registered websites
    List {
        /// Only active websites
        #[arg(long, conflicts_with = "inactive")]
        active: bool,
        /// Only inactive websites
        #[arg(long)]
        inactive: bool,
    },
    /// Show a website's status and last snapshot
    Show { id: i64 },
    /// Remove websites and their products
    Remove {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Allow scrapes for a website again
    Enable { id: i64 },
    /// Refuse scrapes for a website
    Disable { id: i64 },
}

impl WebsiteAction {
    /// Activity filter for `list`. `None` lists everything.
    pub fn list_filter(active: bool, inactive: bool) -> Option<bool> {
        match (active, inactive) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Subcommand)]
pub enum UserAction {
    /// Add a user, or update their email
    Add { id: String, email: String },
}

#[derive(Args)]
pub struct ScrapeArgs {
    pub website_id: i64,

    /// static, headless (alias: selenium)
    #[arg(long, default_value = "static")]
    pub mode: ScrapeMode,

    /// Owner whose product partition receives the results
    #[arg(long)]
    pub owner: Option<String>,

    /// Scrape this URL instead of the website's own
    #[arg(long)]
    pub url: Option<String>,

    #[arg(long)]
    pub min_price: Option<f64>,
    #[arg(long)]
    pub max_price: Option<f64>,
    #[arg(long)]
    pub name_filter: Option<String>,
    #[arg(long)]
    pub reference_filter: Option<String>,
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// Email the first result to this address
    #[arg(long)]
    pub email_to: Option<String>,
    /// Send the first result to this WhatsApp number
    #[arg(long)]
    pub whatsapp_to: Option<String>,
}

#[derive(Args)]
pub struct ProductArgs {
    #[arg(long)]
    pub owner: Option<String>,
    /// Show a single product
    #[arg(long)]
    pub id: Option<i64>,
    #[arg(long)]
    pub min_price: Option<f64>,
    #[arg(long)]
    pub max_price: Option<f64>,
    /// Case-insensitive name substring
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub website: Option<i64>,
    #[arg(long)]
    pub domain: Option<String>,
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, default_value_t = 20)]
    pub limit: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_scrape() {
        let cli = Cli::try_parse_from([
            "pricewatch", "scrape", "3", "--mode", "selenium", "--owner", "alice",
            "--max-price", "50", "--email-to", "a@example.com",
        ])
        .unwrap();

        let Commands::Scrape(args) = cli.command else {
            panic!("expected scrape");
        };
        assert_eq!(args.website_id, 3);
        assert_eq!(args.mode, ScrapeMode::Headless);
        assert_eq!(args.owner.as_deref(), Some("alice"));
        assert_eq!(args.max_price, Some(50.0));
        assert_eq!(args.email_to.as_deref(), Some("a@example.com"));
    }

    #[test]
    fn test_parse_website_remove() {
        let cli = Cli::try_parse_from(["pricewatch", "website", "remove", "3", "7"]).unwrap();
        let Commands::Website {
            action: WebsiteAction::Remove { ids },
        } = cli.command
        else {
            panic!("expected website remove");
        };
        assert_eq!(ids, vec![3, 7]);

        assert!(Cli::try_parse_from(["pricewatch", "website", "remove"]).is_err());
    }

    #[test]
    fn test_parse_website_show_and_add_inactive() {
        let cli = Cli::try_parse_from(["pricewatch", "website", "show", "5"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Website {
                action: WebsiteAction::Show { id: 5 }
            }
        ));

        let cli = Cli::try_parse_from([
            "pricewatch", "website", "add", "Shop", "https://shop.example", "--inactive",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Website {
                action: WebsiteAction::Add { inactive: true, .. }
            }
        ));
    }

    #[test]
    fn test_website_list_filter() {
        assert_eq!(WebsiteAction::list_filter(false, false), None);
        assert_eq!(WebsiteAction::list_filter(true, false), Some(true));
        assert_eq!(WebsiteAction::list_filter(false, true), Some(false));
        assert!(Cli::try_parse_from([
            "pricewatch", "website", "list", "--active", "--inactive",
        ])
        .is_err());
    }

    #[test]
    fn test_bad_mode_rejected() {
        assert!(Cli::try_parse_from(["pricewatch", "scrape", "1", "--mode", "curl"]).is_err());
    }
}
