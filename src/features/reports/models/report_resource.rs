use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// Association of one resource to one report, with its plan and fact
#[derive(Debug, Clone, FromRow)]
pub struct ReportResourceLink {
    pub id: Uuid,
    pub report_id: Uuid,
    pub resource_id: Uuid,
    /// Joined from `resources.name`
    pub resource_name: String,
    pub plan: Option<Decimal>,
    /// Filled in by the measurement service after approval
    pub fact: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

/// Catalog entry as seen by the link reconciler
#[derive(Debug, Clone, FromRow)]
pub struct ResourceRef {
    pub id: Uuid,
    pub name: String,
    pub place: Option<String>,
    pub is_available: bool,
}
