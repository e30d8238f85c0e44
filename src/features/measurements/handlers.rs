use std::sync::Arc;

use axum::{extract::State, Json};
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::measurements::dto::{RecordFactDto, RecordFactResponseDto};
use crate::features::reports::LedgerService;
use crate::shared::types::ApiResponse;
use crate::shared::validation::quantity_to_f64;

/// Store a measured fact (measurement service callback)
///
/// Authenticated with the shared secret in `X-Measurement-Secret`.
#[utoipa::path(
    put,
    path = "/api/measurements/facts",
    request_body = RecordFactDto,
    responses(
        (status = 200, description = "Fact recorded", body = ApiResponse<RecordFactResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Missing or invalid shared secret"),
        (status = 404, description = "Link not found")
    ),
    security(("measurement_secret" = [])),
    tag = "measurements"
)]
pub async fn record_fact(
    State(ledger): State<Arc<LedgerService>>,
    AppJson(dto): AppJson<RecordFactDto>,
) -> Result<Json<ApiResponse<RecordFactResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let stored = ledger
        .record_fact(dto.report_id, dto.resource_id, dto.fact)
        .await?;

    Ok(Json(ApiResponse::success(
        Some(RecordFactResponseDto {
            report_id: dto.report_id,
            resource_id: dto.resource_id,
            fact: quantity_to_f64(stored),
        }),
        None,
        None,
    )))
}
