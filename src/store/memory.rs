//! Map-backed store with the same semantics as [`SqliteStore`](super::SqliteStore).
//!
//! Products are keyed by their identity digest, the way a document store
//! would hold them under a unique compound index.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use crate::app::{PricewatchError, Result};
use crate::domain::{
    Notification, Product, ProductDraft, ProductQuery, User, Website, WebsiteUpdate,
};
use crate::store::{NotificationStore, ProductStore, UserStore, WebsiteStore};

#[derive(Default)]
struct Tables {
    next_id: i64,
    products: HashMap<String, Product>,
    websites: HashMap<i64, Website>,
    notifications: Vec<Notification>,
    users: HashMap<String, User>,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|e| PricewatchError::Other(format!("memory store poisoned: {}", e)))
    }
}

impl ProductStore for MemoryStore {
    fn find_product_by_key(&self, url: &str, owner_id: Option<&str>) -> Result<Option<Product>> {
        let tables = self.tables()?;
        Ok(tables
            .products
            .get(&Product::identity_key(url, owner_id))
            .cloned())
    }

    fn create_product(&self, draft: &ProductDraft) -> Result<Product> {
        let mut tables = self.tables()?;
        let key = draft.identity_key();
        if tables.products.contains_key(&key) {
            return Err(PricewatchError::DuplicateProduct(draft.url.clone()));
        }

        let product = Product::from_draft(tables.allocate_id(), draft);
        tables.products.insert(key, product.clone());
        Ok(product)
    }

    fn update_product(&self, id: i64, draft: &ProductDraft) -> Result<Product> {
        let mut tables = self.tables()?;
        let product = tables
            .products
            .values_mut()
            .find(|p| p.id == id)
            .ok_or(PricewatchError::ProductNotFound(id))?;

        product.apply(draft);
        Ok(product.clone())
    }

    fn get_product(&self, id: i64) -> Result<Option<Product>> {
        let tables = self.tables()?;
        Ok(tables.products.values().find(|p| p.id == id).cloned())
    }

    fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>> {
        let tables = self.tables()?;
        let mut products: Vec<Product> = tables
            .products
            .values()
            .filter(|p| query.matches(p))
            .cloned()
            .collect();

        products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(products
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(query.limit() as usize)
            .collect())
    }

    fn count_products(&self, query: &ProductQuery) -> Result<u64> {
        let tables = self.tables()?;
        Ok(tables.products.values().filter(|p| query.matches(p)).count() as u64)
    }
}

impl WebsiteStore for MemoryStore {
    fn add_website(&self, website: &Website) -> Result<i64> {
        let mut tables = self.tables()?;
        let id = tables.allocate_id();
        let mut website = website.clone();
        website.id = id;
        tables.websites.insert(id, website);
        Ok(id)
    }

    fn get_website(&self, id: i64) -> Result<Option<Website>> {
        let tables = self.tables()?;
        Ok(tables.websites.get(&id).cloned())
    }

    fn list_websites(&self, active: Option<bool>) -> Result<Vec<Website>> {
        let tables = self.tables()?;
        let mut websites: Vec<Website> = tables
            .websites
            .values()
            .filter(|w| active.map_or(true, |a| w.is_active == a))
            .cloned()
            .collect();
        websites.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(websites)
    }

    fn update_website(&self, id: i64, update: &WebsiteUpdate) -> Result<Website> {
        let mut tables = self.tables()?;
        let website = tables
            .websites
            .get_mut(&id)
            .ok_or(PricewatchError::WebsiteNotFound(id))?;
        if update.is_empty() {
            return Ok(website.clone());
        }

        if let Some(ref data) = update.scraped_data {
            website.scraped_data = Some(data.clone());
        }
        if let Some(last_scraped) = update.last_scraped {
            website.last_scraped = Some(last_scraped);
        }
        if let Some(status) = update.status {
            website.last_scrape_status = status;
        }
        if let Some(active) = update.is_active {
            website.is_active = active;
        }
        website.updated_at = Utc::now();

        Ok(website.clone())
    }

    fn remove_website(&self, id: i64) -> Result<bool> {
        let mut tables = self.tables()?;
        if tables.websites.remove(&id).is_none() {
            return Ok(false);
        }
        tables.products.retain(|_, p| p.website_id != id);
        Ok(true)
    }
}

impl NotificationStore for MemoryStore {
    fn create_notification(&self, notification: &Notification) -> Result<i64> {
        let mut tables = self.tables()?;
        let mut notification = notification.clone();
        notification.id = tables.allocate_id();
        let id = notification.id;
        tables.notifications.push(notification);
        Ok(id)
    }

    fn list_notifications(&self, owner_id: &str) -> Result<Vec<Notification>> {
        let tables = self.tables()?;
        Ok(tables
            .notifications
            .iter()
            .rev()
            .filter(|n| n.owner_id == owner_id)
            .cloned()
            .collect())
    }
}

impl UserStore for MemoryStore {
    fn add_user(&self, user: &User) -> Result<()> {
        let mut tables = self.tables()?;
        tables.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    fn find_user_email(&self, owner_id: &str) -> Result<Option<String>> {
        let tables = self.tables()?;
        Ok(tables
            .users
            .get(owner_id)
            .and_then(|u| u.email.clone())
            .filter(|e| !e.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Item, ScrapeStatus};

    fn draft(url: &str, owner: Option<&str>, name: &str) -> ProductDraft {
        let item = Item {
            name: Some(name.into()),
            ..Default::default()
        };
        ProductDraft::from_item(&item, url.into(), 1, owner, None, Utc::now())
    }

    #[test]
    fn test_partitions_and_update() {
        let store = MemoryStore::new();

        let global = store.create_product(&draft("u", None, "G")).unwrap();
        let alice = store.create_product(&draft("u", Some("alice"), "A")).unwrap();
        assert_ne!(global.id, alice.id);

        let updated = store.update_product(alice.id, &draft("u", Some("alice"), "A2")).unwrap();
        assert_eq!(updated.id, alice.id);
        assert_eq!(
            store.find_product_by_key("u", Some("alice")).unwrap().unwrap().name,
            "A2"
        );
        assert_eq!(store.find_product_by_key("u", None).unwrap().unwrap().name, "G");
    }

    #[test]
    fn test_duplicate_create_rejected() {
        let store = MemoryStore::new();
        store.create_product(&draft("u", None, "G")).unwrap();
        assert!(matches!(
            store.create_product(&draft("u", None, "G")),
            Err(PricewatchError::DuplicateProduct(_))
        ));
    }

    #[test]
    fn test_update_website_and_missing() {
        let store = MemoryStore::new();
        let id = store.add_website(&Website::new("Shop", "https://s.example")).unwrap();

        let website = store
            .update_website(
                id,
                &WebsiteUpdate {
                    status: Some(ScrapeStatus::InProgress),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(website.last_scrape_status, ScrapeStatus::InProgress);
        assert!(website.scraped_data.is_none());

        assert!(matches!(
            store.update_website(id + 100, &WebsiteUpdate::default()),
            Err(PricewatchError::WebsiteNotFound(_))
        ));
    }

    #[test]
    fn test_remove_website_drops_its_products() {
        let store = MemoryStore::new();
        let keep = store.add_website(&Website::new("Keep", "https://k.example")).unwrap();
        let gone = store.add_website(&Website::new("Gone", "https://g.example")).unwrap();

        let mut kept = draft("https://k.example/1", None, "K");
        kept.website_id = keep;
        store.create_product(&kept).unwrap();
        let mut dropped = draft("https://g.example/1", None, "G");
        dropped.website_id = gone;
        store.create_product(&dropped).unwrap();

        assert!(store.remove_website(gone).unwrap());
        assert!(!store.remove_website(gone).unwrap());
        assert!(store.get_website(gone).unwrap().is_none());
        assert!(store.find_product_by_key("https://g.example/1", None).unwrap().is_none());
        assert!(store.find_product_by_key("https://k.example/1", None).unwrap().is_some());
    }

    #[test]
    fn test_list_websites_by_activity() {
        let store = MemoryStore::new();
        let on = store.add_website(&Website::new("On", "https://on.example")).unwrap();
        let off = store.add_website(&Website::new("Off", "https://off.example")).unwrap();
        store
            .update_website(
                off,
                &WebsiteUpdate {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(store.list_websites(None).unwrap().len(), 2);
        let active = store.list_websites(Some(true)).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, on);
        assert_eq!(store.list_websites(Some(false)).unwrap()[0].id, off);
    }

    #[test]
    fn test_empty_update_is_a_no_op() {
        let store = MemoryStore::new();
        let id = store.add_website(&Website::new("Shop", "https://s.example")).unwrap();
        let before = store.get_website(id).unwrap().unwrap();

        let after = store.update_website(id, &WebsiteUpdate::default()).unwrap();
        assert_eq!(after.updated_at, before.updated_at);
    }

    #[test]
    fn test_huge_page_is_empty_not_a_panic() {
        let store = MemoryStore::new();
        store.create_product(&draft("u", Some("alice"), "A")).unwrap();

        let query = ProductQuery {
            page: u32::MAX,
            limit: 20,
            ..ProductQuery::for_owner(Some("alice".into()))
        };
        let page = crate::store::product_page(&store, &query).unwrap();
        assert!(page.products.is_empty());
        assert_eq!(page.total, 1);
    }

    #[test]
    fn test_notifications_newest_first() {
        let store = MemoryStore::new();
        for title in ["first", "second"] {
            store
                .create_notification(&Notification::new(
                    "alice",
                    title,
                    "",
                    crate::domain::NotificationKind::Info,
                ))
                .unwrap();
        }
        let list = store.list_notifications("alice").unwrap();
        assert_eq!(list[0].title, "second");
        assert_eq!(list[1].title, "first");
    }
}
