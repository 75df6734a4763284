//! Collection (user shelf) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Collection record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Collection {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

/// Reference to a collection a book gets attached to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CollectionRef {
    pub id: i64,
    pub name: String,
}

impl From<Collection> for CollectionRef {
    fn from(c: Collection) -> Self {
        Self { id: c.id, name: c.name }
    }
}

/// Create collection request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCollection {
    pub name: String,
    pub icon: String,
    pub color: String,
}
