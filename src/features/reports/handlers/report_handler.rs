use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, AppQuery};
use crate::features::auth::guards::{RequireClient, RequireModerator};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::reports::dtos::{
    ListReportsQuery, PendingFactsResponseDto, ReportDetailResponseDto, ReportLinkResponseDto,
    ReportResponseDto, SetPlanDto, SetReportResourcesDto, UpdateReportDetailsDto,
    UpdateReportStatusDto,
};
use crate::features::reports::models::Report;
use crate::features::reports::services::{LedgerService, LinkReconciler, ReportService};
use crate::shared::types::{ApiResponse, Meta};

/// State for report handlers
#[derive(Clone)]
pub struct ReportState {
    pub report_service: Arc<ReportService>,
    pub link_reconciler: Arc<LinkReconciler>,
    pub ledger_service: Arc<LedgerService>,
}

fn report_list(reports: Vec<Report>) -> ApiResponse<Vec<ReportResponseDto>> {
    let total = reports.len() as i64;
    let dtos: Vec<ReportResponseDto> = reports.into_iter().map(Into::into).collect();
    ApiResponse::success(Some(dtos), None, Some(Meta { total }))
}

/// Get or create the caller's draft report
#[utoipa::path(
    post,
    path = "/api/reports/draft",
    responses(
        (status = 200, description = "The caller's draft", body = ApiResponse<ReportResponseDto>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Client access required"),
        (status = 500, description = "No moderator available")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn create_draft(
    RequireClient(user): RequireClient,
    State(state): State<ReportState>,
) -> Result<Json<ApiResponse<ReportResponseDto>>> {
    let report = state.report_service.create_or_get_draft(user.user_id).await?;
    Ok(Json(ApiResponse::success(Some(report.into()), None, None)))
}

/// Add a resource to the caller's draft, creating the draft if needed
#[utoipa::path(
    post,
    path = "/api/resources/{name}/attach",
    params(
        ("name" = String, Path, description = "Resource name (case-insensitive)")
    ),
    responses(
        (status = 200, description = "Draft with the resource attached", body = ApiResponse<ReportDetailResponseDto>),
        (status = 400, description = "Resource not available"),
        (status = 403, description = "Client access required"),
        (status = 404, description = "Resource not found")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn attach_resource(
    RequireClient(user): RequireClient,
    State(state): State<ReportState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<ReportDetailResponseDto>>> {
    let detail = state.report_service.attach_resource(&user, &name).await?;
    Ok(Json(ApiResponse::success(Some(detail.into()), None, None)))
}

/// List open reports
///
/// Moderators see reports under review; clients see drafts and reports under review.
#[utoipa::path(
    get,
    path = "/api/reports",
    params(ListReportsQuery),
    responses(
        (status = 200, description = "List of reports", body = ApiResponse<Vec<ReportResponseDto>>),
        (status = 400, description = "Invalid date range"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn list_reports(
    user: AuthenticatedUser,
    State(state): State<ReportState>,
    AppQuery(query): AppQuery<ListReportsQuery>,
) -> Result<Json<ApiResponse<Vec<ReportResponseDto>>>> {
    let reports = state
        .report_service
        .list_reports(user.role, query.date_from, query.date_to)
        .await?;
    Ok(Json(report_list(reports)))
}

/// List reports the caller is bound to, in any status
#[utoipa::path(
    get,
    path = "/api/reports/mine",
    responses(
        (status = 200, description = "Caller's reports", body = ApiResponse<Vec<ReportResponseDto>>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn list_my_reports(
    user: AuthenticatedUser,
    State(state): State<ReportState>,
) -> Result<Json<ApiResponse<Vec<ReportResponseDto>>>> {
    let reports = state.report_service.list_own_reports(&user).await?;
    Ok(Json(report_list(reports)))
}

/// Count links still waiting for a measured fact (moderator only)
#[utoipa::path(
    get,
    path = "/api/reports/pending-facts",
    responses(
        (status = 200, description = "Pending fact count", body = ApiResponse<PendingFactsResponseDto>),
        (status = 403, description = "Moderator access required")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn count_pending_facts(
    RequireModerator(_user): RequireModerator,
    State(state): State<ReportState>,
) -> Result<Json<ApiResponse<PendingFactsResponseDto>>> {
    let pending = state.ledger_service.count_pending_facts().await?;
    Ok(Json(ApiResponse::success(
        Some(PendingFactsResponseDto { pending }),
        None,
        None,
    )))
}

/// Get a report with its resources
#[utoipa::path(
    get,
    path = "/api/reports/{id}",
    params(
        ("id" = Uuid, Path, description = "Report ID")
    ),
    responses(
        (status = 200, description = "Report found", body = ApiResponse<ReportDetailResponseDto>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Report not found")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn get_report(
    user: AuthenticatedUser,
    State(state): State<ReportState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReportDetailResponseDto>>> {
    let detail = state.report_service.get_report(id, &user).await?;
    Ok(Json(ApiResponse::success(Some(detail.into()), None, None)))
}

/// Set place and month of a draft
#[utoipa::path(
    patch,
    path = "/api/reports/{id}",
    params(
        ("id" = Uuid, Path, description = "Report ID")
    ),
    request_body = UpdateReportDetailsDto,
    responses(
        (status = 200, description = "Report updated", body = ApiResponse<ReportResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Report not found"),
        (status = 409, description = "Report is no longer a draft")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn update_report(
    RequireClient(user): RequireClient,
    State(state): State<ReportState>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateReportDetailsDto>,
) -> Result<Json<ApiResponse<ReportResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let report = state
        .report_service
        .update_details(id, &user, dto.place, dto.month)
        .await?;
    Ok(Json(ApiResponse::success(Some(report.into()), None, None)))
}

/// Replace the set of resources linked to a report
///
/// Links to resources kept in the set retain their plan and fact.
#[utoipa::path(
    put,
    path = "/api/reports/{id}/resources",
    params(
        ("id" = Uuid, Path, description = "Report ID")
    ),
    request_body = SetReportResourcesDto,
    responses(
        (status = 200, description = "Resulting links", body = ApiResponse<Vec<ReportLinkResponseDto>>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Report or resource not found"),
        (status = 409, description = "Report is closed")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn set_report_resources(
    RequireClient(user): RequireClient,
    State(state): State<ReportState>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<SetReportResourcesDto>,
) -> Result<Json<ApiResponse<Vec<ReportLinkResponseDto>>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let links = state
        .link_reconciler
        .set_report_resources(id, &user, &dto.resources)
        .await?;
    let dtos: Vec<ReportLinkResponseDto> = links.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(Some(dtos), None, None)))
}

/// Remove one resource from a report
#[utoipa::path(
    delete,
    path = "/api/reports/{id}/resources/{resource_id}",
    params(
        ("id" = Uuid, Path, description = "Report ID"),
        ("resource_id" = Uuid, Path, description = "Resource ID")
    ),
    responses(
        (status = 200, description = "Link removed"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Report or link not found"),
        (status = 409, description = "Report is closed")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn remove_report_resource(
    RequireClient(user): RequireClient,
    State(state): State<ReportState>,
    Path((id, resource_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<()>>> {
    state
        .link_reconciler
        .remove_link(id, &user, resource_id)
        .await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Resource removed from report".to_string()),
        None,
    )))
}

/// Move a report to a new status
///
/// Clients submit (`under_review`) or delete their drafts; the assigned
/// moderator approves or rejects reports under review.
#[utoipa::path(
    patch,
    path = "/api/reports/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Report ID")
    ),
    request_body = UpdateReportStatusDto,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<ReportResponseDto>),
        (status = 400, description = "Unknown status"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Report not found"),
        (status = 409, description = "Status changed concurrently")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn update_report_status(
    user: AuthenticatedUser,
    State(state): State<ReportState>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateReportStatusDto>,
) -> Result<Json<ApiResponse<ReportResponseDto>>> {
    let report = state
        .report_service
        .transition_status(id, &user, &dto.status)
        .await?;
    Ok(Json(ApiResponse::success(Some(report.into()), None, None)))
}

/// Set the planned quantity of one linked resource (moderator only)
#[utoipa::path(
    put,
    path = "/api/reports/{id}/resources/{resource_id}/plan",
    params(
        ("id" = Uuid, Path, description = "Report ID"),
        ("resource_id" = Uuid, Path, description = "Resource ID")
    ),
    request_body = SetPlanDto,
    responses(
        (status = 200, description = "Plan stored"),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Moderator access required"),
        (status = 404, description = "Report or link not found"),
        (status = 409, description = "Report is closed")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn set_plan(
    RequireModerator(_user): RequireModerator,
    State(state): State<ReportState>,
    Path((id, resource_id)): Path<(Uuid, Uuid)>,
    AppJson(dto): AppJson<SetPlanDto>,
) -> Result<Json<ApiResponse<()>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    state
        .ledger_service
        .set_plan(id, resource_id, dto.plan)
        .await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Plan updated".to_string()),
        None,
    )))
}
