pub mod item;
pub mod notification;
pub mod product;
pub mod request;
pub mod result;
pub mod user;
pub mod website;

pub use item::Item;
pub use notification::{Notification, NotificationKind};
pub use product::{Product, ProductDraft, ProductPage, ProductQuery};
pub use request::{ScrapeFilters, ScrapeMode, ScrapeRequest};
pub use result::ScrapeResult;
pub use user::User;
pub use website::{ScrapeStatus, Website, WebsiteUpdate};
