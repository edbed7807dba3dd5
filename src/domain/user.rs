use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The slice of a user account this service needs: where to send mail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: impl Into<String>, email: Option<String>) -> Self {
        Self {
            id: id.into(),
            email,
            created_at: Utc::now(),
        }
    }
}
