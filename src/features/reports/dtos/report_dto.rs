use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::reports::models::{Report, ReportResourceLink, ReportStatus};
use crate::features::reports::services::ReportDetail;
use crate::shared::validation::{quantity_to_f64, MONTH_REGEX};

/// Query params for listing reports
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ListReportsQuery {
    /// Earliest creation date, inclusive (`YYYY-MM-DD`)
    pub date_from: Option<NaiveDate>,

    /// Latest creation date, inclusive (`YYYY-MM-DD`)
    pub date_to: Option<NaiveDate>,
}

/// Draft details; absent fields are left unchanged
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateReportDetailsDto {
    #[validate(length(min = 1, max = 255, message = "Place must be 1-255 characters"))]
    pub place: Option<String>,

    /// Month in `YYYY-MM` format
    #[validate(regex(path = *MONTH_REGEX, message = "Month must be in YYYY-MM format"))]
    pub month: Option<String>,
}

/// Desired set of linked resources, by name
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SetReportResourcesDto {
    #[validate(length(max = 100, message = "At most 100 resources per report"))]
    pub resources: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateReportStatusDto {
    /// One of `draft`, `under_review`, `deleted`, `rejected`, `approved`
    pub status: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SetPlanDto {
    #[validate(range(min = 0.0, message = "Plan must be non-negative"))]
    pub plan: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportResponseDto {
    pub id: Uuid,
    pub status: ReportStatus,
    pub client_id: Uuid,
    pub moderator_id: Uuid,
    pub place: Option<String>,
    pub month: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<Report> for ReportResponseDto {
    fn from(r: Report) -> Self {
        Self {
            id: r.id,
            status: r.status,
            client_id: r.client_id,
            moderator_id: r.moderator_id,
            place: r.place,
            month: r.month,
            created_at: r.created_at,
            processed_at: r.processed_at,
            finished_at: r.finished_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportLinkResponseDto {
    pub resource_id: Uuid,
    pub resource_name: String,
    pub plan: Option<f64>,
    pub fact: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl From<ReportResourceLink> for ReportLinkResponseDto {
    fn from(l: ReportResourceLink) -> Self {
        Self {
            resource_id: l.resource_id,
            resource_name: l.resource_name,
            plan: l.plan.map(quantity_to_f64),
            fact: l.fact.map(quantity_to_f64),
            created_at: l.created_at,
        }
    }
}

/// Report with its linked resources
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportDetailResponseDto {
    #[serde(flatten)]
    pub report: ReportResponseDto,
    pub resources: Vec<ReportLinkResponseDto>,
}

impl From<ReportDetail> for ReportDetailResponseDto {
    fn from(d: ReportDetail) -> Self {
        Self {
            report: d.report.into(),
            resources: d.links.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PendingFactsResponseDto {
    /// Links whose fact is unset or zero
    pub pending: i64,
}
