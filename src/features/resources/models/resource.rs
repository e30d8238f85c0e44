use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for an extractable resource
#[derive(Debug, Clone, FromRow)]
pub struct Resource {
    pub id: Uuid,
    pub name: String,
    pub is_available: bool,
    pub density: Option<Decimal>,
    pub is_toxic: bool,
    pub demand_level: Option<i32>,
    pub place: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Monthly production figure of a resource
#[derive(Debug, Clone, FromRow)]
pub struct ResourceProduction {
    pub id: Uuid,
    pub resource_id: Uuid,
    /// `YYYY-MM`
    pub month: String,
    pub quantity: Decimal,
    pub created_at: DateTime<Utc>,
}
