use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{PricewatchError, Result};
use crate::domain::{
    Notification, Product, ProductDraft, ProductQuery, ScrapeStatus, User, Website, WebsiteUpdate,
};
use crate::store::{NotificationStore, ProductStore, UserStore, WebsiteStore};

const PRODUCT_COLUMNS: &str = "id, website_id, owner_id, name, price, price_amount, reference, \
     overview, category, url, image, domain, scraped_at, created_at, updated_at";

const WEBSITE_COLUMNS: &str = "id, name, url, description, category, owner_id, is_active, \
     scraped_data, last_scraped, last_scrape_status, created_at, updated_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;

        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations
            .to_latest(&mut conn)
            .map_err(|_| PricewatchError::Database(rusqlite::Error::InvalidQuery))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            PricewatchError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    fn required_datetime(row: &Row<'_>, idx: usize) -> DateTime<Utc> {
        row.get::<_, String>(idx)
            .ok()
            .and_then(|s| Self::parse_datetime(&s))
            .unwrap_or_else(Utc::now)
    }

    fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
        Ok(Product {
            id: row.get(0)?,
            website_id: row.get(1)?,
            owner_id: row.get(2)?,
            name: row.get(3)?,
            price: row.get(4)?,
            price_amount: row.get(5)?,
            reference: row.get(6)?,
            overview: row.get(7)?,
            category: row.get(8)?,
            url: row.get(9)?,
            image: row.get(10)?,
            domain: row.get(11)?,
            scraped_at: Self::required_datetime(row, 12),
            created_at: Self::required_datetime(row, 13),
            updated_at: Self::required_datetime(row, 14),
        })
    }

    fn website_from_row(row: &Row<'_>) -> rusqlite::Result<Website> {
        Ok(Website {
            id: row.get(0)?,
            name: row.get(1)?,
            url: row.get(2)?,
            description: row.get(3)?,
            category: row.get(4)?,
            owner_id: row.get(5)?,
            is_active: row.get::<_, i32>(6)? != 0,
            scraped_data: row
                .get::<_, Option<String>>(7)?
                .and_then(|s| serde_json::from_str(&s).ok()),
            last_scraped: row
                .get::<_, Option<String>>(8)?
                .and_then(|s| Self::parse_datetime(&s)),
            last_scrape_status: row
                .get::<_, String>(9)?
                .parse::<ScrapeStatus>()
                .unwrap_or_default(),
            created_at: Self::required_datetime(row, 10),
            updated_at: Self::required_datetime(row, 11),
        })
    }

    /// WHERE clause and bound values shared by list and count.
    fn product_filter(query: &ProductQuery) -> (String, Vec<SqlValue>) {
        let mut clauses = vec!["owner_id IS ?".to_string()];
        let mut values = vec![match &query.owner_id {
            Some(owner) => SqlValue::Text(owner.clone()),
            None => SqlValue::Null,
        }];

        if let Some(min) = query.min_price {
            clauses.push("price_amount >= ?".into());
            values.push(SqlValue::Real(min));
        }
        if let Some(max) = query.max_price {
            clauses.push("price_amount <= ?".into());
            values.push(SqlValue::Real(max));
        }
        if let Some(name) = query.name_filter() {
            clauses.push("instr(lower(name), ?) > 0".into());
            values.push(SqlValue::Text(name.to_lowercase()));
        }
        if let Some(category) = query.category_filter() {
            clauses.push("category = ?".into());
            values.push(SqlValue::Text(category.to_string()));
        }
        if let Some(website_id) = query.website_id {
            clauses.push("website_id = ?".into());
            values.push(SqlValue::Integer(website_id));
        }
        if let Some(domain) = query.domain_filter() {
            clauses.push("domain = ?".into());
            values.push(SqlValue::Text(domain.to_string()));
        }

        (clauses.join(" AND "), values)
    }
}

impl ProductStore for SqliteStore {
    fn find_product_by_key(&self, url: &str, owner_id: Option<&str>) -> Result<Option<Product>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE identity_key = ?1"),
                params![Product::identity_key(url, owner_id)],
                Self::product_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn create_product(&self, draft: &ProductDraft) -> Result<Product> {
        let conn = self.conn()?;
        let now = draft.scraped_at.to_rfc3339();

        conn.execute(
            "INSERT INTO products (identity_key, website_id, owner_id, name, price, price_amount,
                 reference, overview, category, url, image, domain, scraped_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13, ?13)",
            params![
                draft.identity_key(),
                draft.website_id,
                draft.owner_id,
                draft.name,
                draft.price,
                draft.price_amount,
                draft.reference,
                draft.overview,
                draft.category,
                draft.url,
                draft.image,
                draft.domain,
                now
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(ref failure, _)
                if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                PricewatchError::DuplicateProduct(draft.url.clone())
            }
            other => PricewatchError::Database(other),
        })?;

        Ok(Product::from_draft(conn.last_insert_rowid(), draft))
    }

    fn update_product(&self, id: i64, draft: &ProductDraft) -> Result<Product> {
        let conn = self.conn()?;

        let changed = conn.execute(
            "UPDATE products SET website_id = ?1, name = ?2, price = ?3, price_amount = ?4,
                 reference = ?5, overview = ?6, category = ?7, image = ?8, domain = ?9,
                 scraped_at = ?10, updated_at = ?10
             WHERE id = ?11",
            params![
                draft.website_id,
                draft.name,
                draft.price,
                draft.price_amount,
                draft.reference,
                draft.overview,
                draft.category,
                draft.image,
                draft.domain,
                draft.scraped_at.to_rfc3339(),
                id
            ],
        )?;

        if changed == 0 {
            return Err(PricewatchError::ProductNotFound(id));
        }

        let product = conn.query_row(
            &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"),
            params![id],
            Self::product_from_row,
        )?;

        Ok(product)
    }

    fn get_product(&self, id: i64) -> Result<Option<Product>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"),
                params![id],
                Self::product_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>> {
        let conn = self.conn()?;
        let (filter, mut values) = Self::product_filter(query);
        values.push(SqlValue::Integer(i64::from(query.limit())));
        values.push(SqlValue::Integer(
            i64::try_from(query.offset()).unwrap_or(i64::MAX),
        ));

        let mut stmt = conn.prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE {filter}
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        ))?;

        let products = stmt
            .query_map(params_from_iter(values), Self::product_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(products)
    }

    fn count_products(&self, query: &ProductQuery) -> Result<u64> {
        let conn = self.conn()?;
        let (filter, values) = Self::product_filter(query);

        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM products WHERE {filter}"),
            params_from_iter(values),
            |row| row.get(0),
        )?;

        Ok(count.max(0) as u64)
    }
}

impl WebsiteStore for SqliteStore {
    fn add_website(&self, website: &Website) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO websites (name, url, description, category, owner_id, is_active,
                 last_scrape_status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                website.name,
                website.url,
                website.description,
                website.category,
                website.owner_id,
                website.is_active as i32,
                website.last_scrape_status.as_str(),
                website.created_at.to_rfc3339(),
                website.updated_at.to_rfc3339()
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn get_website(&self, id: i64) -> Result<Option<Website>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                &format!("SELECT {WEBSITE_COLUMNS} FROM websites WHERE id = ?1"),
                params![id],
                Self::website_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn list_websites(&self, active: Option<bool>) -> Result<Vec<Website>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {WEBSITE_COLUMNS} FROM websites
             WHERE ?1 IS NULL OR is_active = ?1
             ORDER BY created_at DESC, id DESC"
        ))?;

        let websites = stmt
            .query_map(params![active.map(i32::from)], Self::website_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(websites)
    }

    fn update_website(&self, id: i64, update: &WebsiteUpdate) -> Result<Website> {
        if update.is_empty() {
            return self
                .get_website(id)?
                .ok_or(PricewatchError::WebsiteNotFound(id));
        }

        let conn = self.conn()?;

        let mut sets = vec!["updated_at = ?".to_string()];
        let mut values = vec![SqlValue::Text(Utc::now().to_rfc3339())];

        if let Some(ref data) = update.scraped_data {
            sets.push("scraped_data = ?".into());
            values.push(SqlValue::Text(serde_json::to_string(data)?));
        }
        if let Some(ref last_scraped) = update.last_scraped {
            sets.push("last_scraped = ?".into());
            values.push(SqlValue::Text(last_scraped.to_rfc3339()));
        }
        if let Some(status) = update.status {
            sets.push("last_scrape_status = ?".into());
            values.push(SqlValue::Text(status.as_str().to_string()));
        }
        if let Some(active) = update.is_active {
            sets.push("is_active = ?".into());
            values.push(SqlValue::Integer(i64::from(active)));
        }
        values.push(SqlValue::Integer(id));

        let changed = conn.execute(
            &format!("UPDATE websites SET {} WHERE id = ?", sets.join(", ")),
            params_from_iter(values),
        )?;

        if changed == 0 {
            return Err(PricewatchError::WebsiteNotFound(id));
        }

        let website = conn.query_row(
            &format!("SELECT {WEBSITE_COLUMNS} FROM websites WHERE id = ?1"),
            params![id],
            Self::website_from_row,
        )?;

        Ok(website)
    }

    /// Products go with the website through `ON DELETE CASCADE`.
    fn remove_website(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM websites WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}

impl NotificationStore for SqliteStore {
    fn create_notification(&self, notification: &Notification) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO notifications (owner_id, title, message, kind, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                notification.owner_id,
                notification.title,
                notification.message,
                notification.kind.as_str(),
                notification.created_at.to_rfc3339()
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn list_notifications(&self, owner_id: &str) -> Result<Vec<Notification>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, owner_id, title, message, kind, created_at
             FROM notifications WHERE owner_id = ?1 ORDER BY created_at DESC, id DESC",
        )?;

        let notifications = stmt
            .query_map(params![owner_id], |row| {
                let kind: String = row.get(4)?;
                Ok(Notification {
                    id: row.get(0)?,
                    owner_id: row.get(1)?,
                    title: row.get(2)?,
                    message: row.get(3)?,
                    kind: kind
                        .parse()
                        .unwrap_or(crate::domain::NotificationKind::Info),
                    created_at: Self::required_datetime(row, 5),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(notifications)
    }
}

impl UserStore for SqliteStore {
    fn add_user(&self, user: &User) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO users (id, email, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET email = ?2",
            params![user.id, user.email, user.created_at.to_rfc3339()],
        )?;

        Ok(())
    }

    fn find_user_email(&self, owner_id: &str) -> Result<Option<String>> {
        let conn = self.conn()?;

        let email = conn
            .query_row(
                "SELECT email FROM users WHERE id = ?1",
                params![owner_id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten()
            .filter(|e| !e.trim().is_empty());

        Ok(email)
    }
}
