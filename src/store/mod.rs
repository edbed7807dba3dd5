pub mod memory;
pub mod sqlite;

use crate::app::{PricewatchError, Result};
use crate::domain::{
    Notification, Product, ProductDraft, ProductPage, ProductQuery, User, Website, WebsiteUpdate,
};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Product persistence keyed by the (url, owner) identity.
pub trait ProductStore {
    /// `owner_id == None` matches only unowned products.
    fn find_product_by_key(&self, url: &str, owner_id: Option<&str>) -> Result<Option<Product>>;
    fn create_product(&self, draft: &ProductDraft) -> Result<Product>;
    fn update_product(&self, id: i64, draft: &ProductDraft) -> Result<Product>;
    fn get_product(&self, id: i64) -> Result<Option<Product>>;
    fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>>;
    fn count_products(&self, query: &ProductQuery) -> Result<u64>;
}

pub trait WebsiteStore {
    fn add_website(&self, website: &Website) -> Result<i64>;
    fn get_website(&self, id: i64) -> Result<Option<Website>>;
    /// `active` filters on `is_active`; `None` lists everything.
    fn list_websites(&self, active: Option<bool>) -> Result<Vec<Website>>;
    /// Applies every present field in one write.
    fn update_website(&self, id: i64, update: &WebsiteUpdate) -> Result<Website>;
    /// Deletes the website and its products. `false` if it did not exist.
    fn remove_website(&self, id: i64) -> Result<bool>;
}

pub trait NotificationStore {
    fn create_notification(&self, notification: &Notification) -> Result<i64>;
    fn list_notifications(&self, owner_id: &str) -> Result<Vec<Notification>>;
}

pub trait UserStore {
    fn add_user(&self, user: &User) -> Result<()>;
    fn find_user_email(&self, owner_id: &str) -> Result<Option<String>>;
}

/// Everything the pipeline and the CLI need from a backend.
pub trait Store: ProductStore + WebsiteStore + NotificationStore + UserStore {}

impl<T> Store for T where T: ProductStore + WebsiteStore + NotificationStore + UserStore {}

/// One page of the owner's products plus the total match count.
pub fn product_page<P>(store: &P, query: &ProductQuery) -> Result<ProductPage>
where
    P: ProductStore + ?Sized,
{
    let products = store.list_products(query)?;
    let total = store.count_products(query)?;
    Ok(ProductPage::new(products, total, query))
}

/// Fetch a product on behalf of `owner_id`. Products owned by someone else
/// are refused; unowned products are readable by anyone.
pub fn get_product_for<P>(store: &P, owner_id: Option<&str>, id: i64) -> Result<Product>
where
    P: ProductStore + ?Sized,
{
    let product = store
        .get_product(id)?
        .ok_or(PricewatchError::ProductNotFound(id))?;

    match product.owner_id.as_deref() {
        Some(owner) if Some(owner) != owner_id => Err(PricewatchError::AccessDenied),
        _ => Ok(product),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tokio_test::assert_ok;

    fn draft(url: &str, owner: Option<&str>, price: f64) -> ProductDraft {
        ProductDraft {
            website_id: 1,
            owner_id: owner.map(str::to_string),
            name: format!("item {}", url),
            price: format!("${}", price),
            price_amount: price,
            reference: None,
            overview: None,
            category: None,
            url: url.to_string(),
            image: None,
            domain: None,
            scraped_at: Utc::now(),
        }
    }

    #[test]
    fn test_get_product_for_enforces_owner() {
        let store = MemoryStore::new();
        let mine = store.create_product(&draft("https://a/1", Some("alice"), 1.0)).unwrap();
        let global = store.create_product(&draft("https://a/2", None, 1.0)).unwrap();

        assert_ok!(get_product_for(&store, Some("alice"), mine.id));
        assert!(matches!(
            get_product_for(&store, Some("bob"), mine.id),
            Err(PricewatchError::AccessDenied)
        ));
        assert!(matches!(
            get_product_for(&store, None, mine.id),
            Err(PricewatchError::AccessDenied)
        ));
        assert_ok!(get_product_for(&store, Some("bob"), global.id));
        assert!(matches!(
            get_product_for(&store, Some("alice"), 999),
            Err(PricewatchError::ProductNotFound(999))
        ));
    }

    #[test]
    fn test_product_page_totals() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .create_product(&draft(&format!("https://a/{}", i), Some("alice"), i as f64))
                .unwrap();
        }
        store.create_product(&draft("https://a/x", Some("bob"), 1.0)).unwrap();

        let mut query = ProductQuery::for_owner(Some("alice".into()));
        query.limit = 2;
        query.page = 3;

        let page = product_page(&store, &query).unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.products.len(), 1);
    }
}
