use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::Item;

pub const DEFAULT_NAME: &str = "Unknown";
pub const DEFAULT_PRICE: &str = "Not found";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub website_id: i64,
    pub owner_id: Option<String>,
    pub name: String,
    pub price: String,
    pub price_amount: f64,
    pub reference: Option<String>,
    pub overview: Option<String>,
    pub category: Option<String>,
    pub url: String,
    pub image: Option<String>,
    pub domain: Option<String>,
    pub scraped_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Deterministic digest of the (url, owner) identity. The unowned
    /// partition hashes differently from every named owner.
    pub fn identity_key(url: &str, owner_id: Option<&str>) -> String {
        let mut hasher = Sha256::new();
        match owner_id {
            Some(owner) => {
                hasher.update(b"owner:");
                hasher.update(owner.as_bytes());
            }
            None => hasher.update(b"global"),
        }
        hasher.update([0u8]);
        hasher.update(url.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Materialize a freshly created record from its write payload.
    pub fn from_draft(id: i64, draft: &ProductDraft) -> Self {
        Self {
            id,
            website_id: draft.website_id,
            owner_id: draft.owner_id.clone(),
            name: draft.name.clone(),
            price: draft.price.clone(),
            price_amount: draft.price_amount,
            reference: draft.reference.clone(),
            overview: draft.overview.clone(),
            category: draft.category.clone(),
            url: draft.url.clone(),
            image: draft.image.clone(),
            domain: draft.domain.clone(),
            scraped_at: draft.scraped_at,
            created_at: draft.scraped_at,
            updated_at: draft.scraped_at,
        }
    }

    /// Overwrite the scraped fields in place, keeping id and creation time.
    pub fn apply(&mut self, draft: &ProductDraft) {
        self.website_id = draft.website_id;
        self.name = draft.name.clone();
        self.price = draft.price.clone();
        self.price_amount = draft.price_amount;
        self.reference = draft.reference.clone();
        self.overview = draft.overview.clone();
        self.category = draft.category.clone();
        self.image = draft.image.clone();
        self.domain = draft.domain.clone();
        self.scraped_at = draft.scraped_at;
        self.updated_at = draft.scraped_at;
    }
}

/// Normalized write payload for one scraped item. All defaulting of raw
/// worker values happens in [`ProductDraft::from_item`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub website_id: i64,
    pub owner_id: Option<String>,
    pub name: String,
    pub price: String,
    pub price_amount: f64,
    pub reference: Option<String>,
    pub overview: Option<String>,
    pub category: Option<String>,
    pub url: String,
    pub image: Option<String>,
    pub domain: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

impl ProductDraft {
    pub fn from_item(
        item: &Item,
        url: String,
        website_id: i64,
        owner_id: Option<&str>,
        batch_domain: Option<&str>,
        scraped_at: DateTime<Utc>,
    ) -> Self {
        let domain = item
            .domain
            .clone()
            .filter(|d| !d.is_empty())
            .or_else(|| batch_domain.map(str::to_string))
            .or_else(|| host_of(&url));

        Self {
            website_id,
            owner_id: owner_id.map(str::to_string),
            name: item
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_NAME.to_string()),
            price: item
                .price
                .clone()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PRICE.to_string()),
            price_amount: item.price_amount.unwrap_or(0.0),
            reference: item.reference.clone(),
            overview: item.overview.clone(),
            category: item.category.clone(),
            url,
            image: item.image.clone(),
            domain,
            scraped_at,
        }
    }

    pub fn identity_key(&self) -> String {
        Product::identity_key(&self.url, self.owner_id.as_deref())
    }
}

fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

/// Read-side filter over one owner partition.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductQuery {
    pub owner_id: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub website_id: Option<i64>,
    pub domain: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            owner_id: None,
            min_price: None,
            max_price: None,
            name: None,
            category: None,
            website_id: None,
            domain: None,
            page: 1,
            limit: 20,
        }
    }
}

impl ProductQuery {
    pub fn for_owner(owner_id: Option<String>) -> Self {
        Self {
            owner_id,
            ..Default::default()
        }
    }

    pub fn page(&self) -> u32 {
        self.page.max(1)
    }

    pub fn limit(&self) -> u32 {
        if self.limit == 0 {
            20
        } else {
            self.limit
        }
    }

    /// Rows to skip. Widened so any page/limit pair from the CLI is valid.
    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1).saturating_mul(u64::from(self.limit()))
    }

    pub fn name_filter(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn category_filter(&self) -> Option<&str> {
        self.category.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn domain_filter(&self) -> Option<&str> {
        self.domain.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Filter semantics shared by adapters that evaluate in process.
    pub fn matches(&self, product: &Product) -> bool {
        if product.owner_id != self.owner_id {
            return false;
        }
        if self.min_price.is_some_and(|min| product.price_amount < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price_amount > max) {
            return false;
        }
        if let Some(name) = self.name_filter() {
            if !product.name.to_lowercase().contains(&name.to_lowercase()) {
                return false;
            }
        }
        if let Some(category) = self.category_filter() {
            if product.category.as_deref() != Some(category) {
                return false;
            }
        }
        if self.website_id.is_some_and(|id| product.website_id != id) {
            return false;
        }
        if let Some(domain) = self.domain_filter() {
            if product.domain.as_deref() != Some(domain) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl ProductPage {
    pub fn new(products: Vec<Product>, total: u64, query: &ProductQuery) -> Self {
        let limit = query.limit();
        Self {
            products,
            total,
            page: query.page(),
            limit,
            total_pages: total.div_ceil(u64::from(limit)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn test_identity_key_partitions() {
        let a = Product::identity_key("https://x.example/p", Some("alice"));
        let b = Product::identity_key("https://x.example/p", Some("bob"));
        let global = Product::identity_key("https://x.example/p", None);

        assert_eq!(a, Product::identity_key("https://x.example/p", Some("alice")));
        assert_ne!(a, b);
        assert_ne!(a, global);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_identity_key_owner_named_global() {
        // A user literally called "global" must not land in the unowned partition.
        assert_ne!(
            Product::identity_key("u", Some("global")),
            Product::identity_key("u", None)
        );
    }

    #[test]
    fn test_draft_defaults() {
        let draft = ProductDraft::from_item(
            &Item::default(),
            "https://shop.example.com/p/1".into(),
            3,
            None,
            None,
            now(),
        );

        assert_eq!(draft.name, DEFAULT_NAME);
        assert_eq!(draft.price, DEFAULT_PRICE);
        assert_eq!(draft.price_amount, 0.0);
        assert_eq!(draft.domain.as_deref(), Some("shop.example.com"));
    }

    #[test]
    fn test_draft_domain_precedence() {
        let mut item = Item::default();
        let url = "https://cdn.example.com/p".to_string();

        let draft = ProductDraft::from_item(&item, url.clone(), 1, None, Some("batch.example"), now());
        assert_eq!(draft.domain.as_deref(), Some("batch.example"));

        item.domain = Some("item.example".into());
        let draft = ProductDraft::from_item(&item, url, 1, None, Some("batch.example"), now());
        assert_eq!(draft.domain.as_deref(), Some("item.example"));
    }

    #[test]
    fn test_apply_keeps_identity() {
        let t0 = now();
        let first = ProductDraft::from_item(&Item::default(), "u".into(), 1, Some("a"), None, t0);
        let mut product = Product::from_draft(9, &first);

        let mut item = Item::default();
        item.name = Some("Renamed".into());
        let t1 = t0 + chrono::Duration::seconds(5);
        product.apply(&ProductDraft::from_item(&item, "u".into(), 1, Some("a"), None, t1));

        assert_eq!(product.id, 9);
        assert_eq!(product.name, "Renamed");
        assert_eq!(product.created_at, t0);
        assert_eq!(product.scraped_at, t1);
    }

    #[test]
    fn test_query_matches() {
        let mut item = Item::default();
        item.name = Some("Brass Desk Lamp".into());
        item.price_amount = Some(25.0);
        item.category = Some("lighting".into());
        let product = Product::from_draft(
            1,
            &ProductDraft::from_item(&item, "https://s.example/l".into(), 4, Some("alice"), None, now()),
        );

        let mut query = ProductQuery::for_owner(Some("alice".into()));
        assert!(query.matches(&product));

        query.name = Some("desk".into());
        query.min_price = Some(20.0);
        query.max_price = Some(30.0);
        query.category = Some("lighting".into());
        query.website_id = Some(4);
        query.domain = Some("s.example".into());
        assert!(query.matches(&product));

        query.max_price = Some(24.99);
        assert!(!query.matches(&product));

        assert!(!ProductQuery::for_owner(None).matches(&product));
        assert!(!ProductQuery::for_owner(Some("bob".into())).matches(&product));
    }

    #[test]
    fn test_page_math() {
        let query = ProductQuery {
            page: 3,
            limit: 10,
            ..Default::default()
        };
        assert_eq!(query.offset(), 20);

        let page = ProductPage::new(vec![], 21, &query);
        assert_eq!(page.total_pages, 3);

        let zero = ProductQuery {
            page: 0,
            limit: 0,
            ..Default::default()
        };
        assert_eq!(zero.page(), 1);
        assert_eq!(zero.limit(), 20);
        assert_eq!(zero.offset(), 0);

        let huge = ProductQuery {
            page: u32::MAX,
            limit: u32::MAX,
            ..Default::default()
        };
        assert_eq!(huge.offset(), u64::from(u32::MAX - 1) * u64::from(u32::MAX));
    }
}
