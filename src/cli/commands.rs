use crate::app::{AppContext, PricewatchError, Result};
use crate::cli::{ProductArgs, ScrapeArgs};
use crate::domain::{
    Product, ProductQuery, ScrapeFilters, ScrapeRequest, User, Website, WebsiteUpdate,
};
use crate::notify::{ShareDetails, ShareTargets};
use crate::pipeline::ScrapeSummary;
use crate::store::{
    get_product_for, product_page, NotificationStore, UserStore, WebsiteStore,
};

pub fn add_website(
    ctx: &AppContext,
    name: &str,
    url: &str,
    owner: Option<String>,
    category: &str,
    description: &str,
    active: bool,
) -> Result<i64> {
    let mut website = Website::new(name.trim(), url.trim());
    website.owner_id = owner;
    website.category = category.to_string();
    website.description = description.to_string();
    website.is_active = active;
    website.validate()?;

    let id = ctx.store.add_website(&website)?;
    println!("Added website {}: {} ({})", id, website.name, website.url);
    Ok(id)
}

pub fn list_websites(ctx: &AppContext, active: Option<bool>) -> Result<()> {
    let websites = ctx.store.list_websites(active)?;

    if websites.is_empty() {
        println!("No websites");
        return Ok(());
    }

    for website in websites {
        let last = website
            .last_scraped
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{:>4}  {} [{}] {}  status: {}  last scraped: {}{}",
            website.id,
            website.name,
            website.category,
            website.url,
            website.last_scrape_status,
            last,
            if website.is_active { "" } else { "  (inactive)" }
        );
    }
    Ok(())
}

pub fn show_website(ctx: &AppContext, id: i64) -> Result<Website> {
    let website = ctx
        .store
        .get_website(id)?
        .ok_or(PricewatchError::WebsiteNotFound(id))?;

    println!("{} (#{})", website.name, website.id);
    println!("  URL:          {}", website.url);
    println!("  Category:     {}", website.category);
    if !website.description.is_empty() {
        println!("  Description:  {}", website.description);
    }
    if let Some(owner) = &website.owner_id {
        println!("  Owner:        {}", owner);
    }
    println!("  Active:       {}", if website.is_active { "yes" } else { "no" });
    println!("  Status:       {}", website.last_scrape_status);
    match website.last_scraped {
        Some(t) => println!("  Last scraped: {}", t.format("%Y-%m-%d %H:%M")),
        None => println!("  Last scraped: never"),
    }
    if let Some(snapshot) = &website.scraped_data {
        println!();
        println!("{}", serde_json::to_string_pretty(snapshot)?);
    }
    Ok(website)
}

/// Returns the ids that existed and were removed.
pub fn remove_websites(ctx: &AppContext, ids: &[i64]) -> Result<Vec<i64>> {
    let mut removed = Vec::new();
    for &id in ids {
        if ctx.store.remove_website(id)? {
            println!("Removed website {}", id);
            removed.push(id);
        } else {
            eprintln!("Website not found: {}", id);
        }
    }
    Ok(removed)
}

pub fn set_website_active(ctx: &AppContext, id: i64, active: bool) -> Result<Website> {
    let update = WebsiteUpdate {
        is_active: Some(active),
        ..Default::default()
    };
    let website = ctx.store.update_website(id, &update)?;
    println!(
        "Website {} is now {}",
        website.id,
        if website.is_active { "active" } else { "inactive" }
    );
    Ok(website)
}

pub fn add_user(ctx: &AppContext, id: &str, email: &str) -> Result<()> {
    ctx.store
        .add_user(&User::new(id, Some(email.trim().to_string())))?;
    println!("Saved user {} <{}>", id, email.trim());
    Ok(())
}

pub async fn scrape(ctx: &AppContext, args: ScrapeArgs) -> Result<ScrapeSummary> {
    let website = ctx
        .store
        .get_website(args.website_id)?
        .ok_or(PricewatchError::WebsiteNotFound(args.website_id))?;

    let target_url = args.url.clone().unwrap_or_else(|| website.url.clone());
    let filters = ScrapeFilters {
        min_price: args.min_price,
        max_price: args.max_price,
        name_filter: args.name_filter,
        reference_filter: args.reference_filter,
        max_pages: args.max_pages,
    };
    let request = ScrapeRequest::new(args.website_id, args.mode, target_url)
        .with_filters(filters)
        .with_owner(args.owner.or_else(|| website.owner_id.clone()));

    println!("Scraping {} ({}) in {} mode...", website.name, request.target_url, request.mode);
    let summary = ctx.pipeline.run_scrape(&request).await?;

    println!(
        "Scraping ({}) completed: {} saved ({} new, {} updated), {} skipped, {} failed",
        request.mode,
        summary.report.saved,
        summary.report.created,
        summary.report.updated,
        summary.report.skipped,
        summary.report.failures.len()
    );
    for failure in &summary.report.failures {
        eprintln!("  Failed to save {}: {}", failure.name, failure.error);
    }
    if let Some(report) = &summary.notifications {
        println!("Notifications: in-app {}, email {}", report.in_app, report.email);
    }

    let targets = ShareTargets {
        email_to: args.email_to,
        whatsapp_to: args.whatsapp_to,
    };
    if !targets.is_empty() {
        let details = ShareDetails::from_result(&summary.result, &summary.website);
        let status = ctx
            .share
            .share(&summary.website.name, &details, &targets)
            .await;
        println!("Shared: email {}, whatsapp {}", status.email, status.whatsapp);
    }

    Ok(summary)
}

pub fn list_products(ctx: &AppContext, args: ProductArgs) -> Result<()> {
    if let Some(id) = args.id {
        let product = get_product_for(ctx.store.as_ref(), args.owner.as_deref(), id)?;
        print_product_detail(&product);
        return Ok(());
    }

    let query = ProductQuery {
        owner_id: args.owner,
        min_price: args.min_price,
        max_price: args.max_price,
        name: args.name,
        category: args.category,
        website_id: args.website,
        domain: args.domain,
        page: args.page,
        limit: args.limit,
    };
    let page = product_page(ctx.store.as_ref(), &query)?;

    if page.products.is_empty() {
        println!("No products");
        return Ok(());
    }

    for product in &page.products {
        println!(
            "{:>5}  {}  {}  {}",
            product.id, product.name, product.price, product.url
        );
    }
    println!(
        "Page {}/{} ({} products)",
        page.page,
        page.total_pages.max(1),
        page.total
    );
    Ok(())
}

fn print_product_detail(product: &Product) {
    println!("{} (#{})", product.name, product.id);
    println!("  Price:     {} ({})", product.price, product.price_amount);
    if let Some(reference) = &product.reference {
        println!("  Reference: {}", reference);
    }
    if let Some(category) = &product.category {
        println!("  Category:  {}", category);
    }
    if let Some(domain) = &product.domain {
        println!("  Domain:    {}", domain);
    }
    println!("  URL:       {}", product.url);
    println!("  Scraped:   {}", product.scraped_at.format("%Y-%m-%d %H:%M"));
    if let Some(overview) = &product.overview {
        println!();
        println!("{}", overview);
    }
}

pub fn list_notifications(ctx: &AppContext, owner: &str) -> Result<()> {
    let notifications = ctx.store.list_notifications(owner)?;

    if notifications.is_empty() {
        println!("No notifications");
        return Ok(());
    }

    for n in notifications {
        println!(
            "{}  [{}] {}: {}",
            n.created_at.format("%Y-%m-%d %H:%M"),
            n.kind,
            n.title,
            n.message
        );
    }
    Ok(())
}
