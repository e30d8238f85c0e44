use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::reports::models::{
    Report, ReportResourceLink, ReportStatus, ResourceRef, TransitionEffects,
};

/// Values for a freshly created draft
#[derive(Debug, Clone)]
pub struct NewDraft {
    pub client_id: Uuid,
    pub moderator_id: Uuid,
    pub place: Option<String>,
}

/// Report listing filter; empty `statuses` matches every status
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub statuses: Vec<ReportStatus>,
    pub client_id: Option<Uuid>,
    pub moderator_id: Option<Uuid>,
    pub created_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound
    pub created_to: Option<DateTime<Utc>>,
}

impl ReportFilter {
    pub fn matches(&self, report: &Report) -> bool {
        (self.statuses.is_empty() || self.statuses.contains(&report.status))
            && self.client_id.is_none_or(|id| id == report.client_id)
            && self.moderator_id.is_none_or(|id| id == report.moderator_id)
            && self.created_from.is_none_or(|from| report.created_at >= from)
            && self.created_to.is_none_or(|to| report.created_at < to)
    }
}

/// Result of a committed status change
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub report: Report,
    /// Resources still linked when the status was written; only collected
    /// when the effects request facts
    pub linked_resource_ids: Vec<Uuid>,
}

/// Persistence seam for reports and their resource links
#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn find_draft(&self, client_id: Uuid) -> Result<Option<Report>>;

    /// Insert a draft unless the client already has one; returns whichever
    /// draft exists afterwards and whether it was created by this call
    async fn create_draft(&self, draft: NewDraft) -> Result<(Report, bool)>;

    async fn list_moderator_ids(&self) -> Result<Vec<Uuid>>;

    async fn get_report(&self, id: Uuid) -> Result<Option<Report>>;

    /// Newest first
    async fn list_reports(&self, filter: &ReportFilter) -> Result<Vec<Report>>;

    /// Place and month of a draft; `None` when the report is not a draft
    async fn update_details(
        &self,
        id: Uuid,
        place: Option<String>,
        month: Option<String>,
    ) -> Result<Option<Report>>;

    /// Look up catalog entries by normalized name; unknown names are omitted
    async fn resolve_resources(&self, names: &[String]) -> Result<Vec<ResourceRef>>;

    async fn list_links(&self, report_id: Uuid) -> Result<Vec<ReportResourceLink>>;

    /// Remove and add links in one transaction. Fails with `ReportClosed`
    /// if the report became terminal in the meantime.
    async fn apply_link_changes(
        &self,
        report_id: Uuid,
        remove: &[Uuid],
        add: &[Uuid],
    ) -> Result<()>;

    /// `false` when no such link exists
    async fn delete_link(&self, report_id: Uuid, resource_id: Uuid) -> Result<bool>;

    /// Move the report from `from` to `to` together with `effects`, in one
    /// transaction. `None` when the report is no longer in `from`.
    async fn transition(
        &self,
        id: Uuid,
        from: ReportStatus,
        to: ReportStatus,
        effects: TransitionEffects,
    ) -> Result<Option<TransitionOutcome>>;

    /// `false` when no such link exists
    async fn set_plan(&self, report_id: Uuid, resource_id: Uuid, plan: Decimal) -> Result<bool>;

    /// `false` when no such link exists
    async fn set_fact(&self, report_id: Uuid, resource_id: Uuid, fact: Decimal) -> Result<bool>;

    /// Links whose fact is unset or zero
    async fn count_pending_facts(&self) -> Result<i64>;
}
