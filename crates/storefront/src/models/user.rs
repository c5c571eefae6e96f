//! User domain types.

use chrono::{DateTime, Utc};

use comptoir_core::{Email, UserId};

/// A storefront account (domain type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login email, normalized to lowercase.
    pub email: Email,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}
