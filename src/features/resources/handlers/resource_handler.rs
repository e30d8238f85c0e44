use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use tracing::debug;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, AppQuery};
use crate::features::auth::guards::RequireModerator;
use crate::features::resources::dtos::{
    AddProductionDto, CreateResourceDto, ProductionResponseDto, ResourceDetailResponseDto,
    ResourceListQuery, ResourceResponseDto, UpdateResourceDto, UploadImageDto,
};
use crate::features::resources::services::ResourceService;
use crate::shared::constants::{ALLOWED_IMAGE_TYPES, MAX_IMAGE_SIZE};
use crate::shared::types::{ApiResponse, Meta};

/// List the resource catalog
#[utoipa::path(
    get,
    path = "/api/resources",
    params(ResourceListQuery),
    responses(
        (status = 200, description = "List of resources", body = ApiResponse<Vec<ResourceResponseDto>>),
        (status = 400, description = "Invalid query parameters")
    ),
    tag = "resources"
)]
pub async fn list_resources(
    State(service): State<Arc<ResourceService>>,
    AppQuery(query): AppQuery<ResourceListQuery>,
) -> Result<Json<ApiResponse<Vec<ResourceResponseDto>>>> {
    let (resources, total) = service.list(&query).await?;
    Ok(Json(ApiResponse::success(
        Some(resources),
        None,
        Some(Meta { total }),
    )))
}

/// Get a resource by name, with its monthly production
#[utoipa::path(
    get,
    path = "/api/resources/{name}",
    params(
        ("name" = String, Path, description = "Resource name (case-insensitive)")
    ),
    responses(
        (status = 200, description = "Resource found", body = ApiResponse<ResourceDetailResponseDto>),
        (status = 404, description = "Resource not found")
    ),
    tag = "resources"
)]
pub async fn get_resource(
    State(service): State<Arc<ResourceService>>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<ResourceDetailResponseDto>>> {
    let resource = service.get_by_name(&name).await?;
    Ok(Json(ApiResponse::success(Some(resource), None, None)))
}

/// Create a resource (moderator only)
#[utoipa::path(
    post,
    path = "/api/resources",
    request_body = CreateResourceDto,
    responses(
        (status = 201, description = "Resource created", body = ApiResponse<ResourceResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Moderator access required"),
        (status = 409, description = "Name already taken")
    ),
    security(("bearer_auth" = [])),
    tag = "resources"
)]
pub async fn create_resource(
    RequireModerator(_user): RequireModerator,
    State(service): State<Arc<ResourceService>>,
    AppJson(dto): AppJson<CreateResourceDto>,
) -> Result<(StatusCode, Json<ApiResponse<ResourceResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let resource = service.create(dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(resource),
            Some("Resource created successfully".to_string()),
            None,
        )),
    ))
}

/// Edit a resource (moderator only)
#[utoipa::path(
    put,
    path = "/api/resources/{name}",
    params(
        ("name" = String, Path, description = "Resource name (case-insensitive)")
    ),
    request_body = UpdateResourceDto,
    responses(
        (status = 200, description = "Resource updated", body = ApiResponse<ResourceResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Moderator access required"),
        (status = 404, description = "Resource not found"),
        (status = 409, description = "Name already taken")
    ),
    security(("bearer_auth" = [])),
    tag = "resources"
)]
pub async fn update_resource(
    RequireModerator(_user): RequireModerator,
    State(service): State<Arc<ResourceService>>,
    Path(name): Path<String>,
    AppJson(dto): AppJson<UpdateResourceDto>,
) -> Result<Json<ApiResponse<ResourceResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let resource = service.update(&name, dto).await?;
    Ok(Json(ApiResponse::success(
        Some(resource),
        Some("Resource updated successfully".to_string()),
        None,
    )))
}

/// Toggle whether a resource can be requested (moderator only)
#[utoipa::path(
    post,
    path = "/api/resources/{name}/availability",
    params(
        ("name" = String, Path, description = "Resource name (case-insensitive)")
    ),
    responses(
        (status = 200, description = "Availability toggled", body = ApiResponse<ResourceResponseDto>),
        (status = 403, description = "Moderator access required"),
        (status = 404, description = "Resource not found")
    ),
    security(("bearer_auth" = [])),
    tag = "resources"
)]
pub async fn toggle_availability(
    RequireModerator(_user): RequireModerator,
    State(service): State<Arc<ResourceService>>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<ResourceResponseDto>>> {
    let resource = service.toggle_availability(&name).await?;
    Ok(Json(ApiResponse::success(Some(resource), None, None)))
}

/// Record the production of one month (moderator only)
#[utoipa::path(
    post,
    path = "/api/resources/{name}/production",
    params(
        ("name" = String, Path, description = "Resource name (case-insensitive)")
    ),
    request_body = AddProductionDto,
    responses(
        (status = 201, description = "Production recorded", body = ApiResponse<ProductionResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Moderator access required"),
        (status = 404, description = "Resource not found"),
        (status = 409, description = "Month already recorded")
    ),
    security(("bearer_auth" = [])),
    tag = "resources"
)]
pub async fn add_production(
    RequireModerator(_user): RequireModerator,
    State(service): State<Arc<ResourceService>>,
    Path(name): Path<String>,
    AppJson(dto): AppJson<AddProductionDto>,
) -> Result<(StatusCode, Json<ApiResponse<ProductionResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let production = service.add_production(&name, dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(production), None, None)),
    ))
}

/// Upload or replace the resource image (moderator only)
///
/// Accepts multipart/form-data with a single `file` field.
#[utoipa::path(
    post,
    path = "/api/resources/{name}/image",
    params(
        ("name" = String, Path, description = "Resource name (case-insensitive)")
    ),
    request_body(
        content = UploadImageDto,
        content_type = "multipart/form-data",
        description = "Image file",
    ),
    responses(
        (status = 200, description = "Image stored", body = ApiResponse<ResourceResponseDto>),
        (status = 400, description = "Missing, oversized or unsupported file"),
        (status = 403, description = "Moderator access required"),
        (status = 404, description = "Resource not found")
    ),
    security(("bearer_auth" = [])),
    tag = "resources"
)]
pub async fn upload_image(
    RequireModerator(_user): RequireModerator,
    State(service): State<Arc<ResourceService>>,
    Path(name): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<ResourceResponseDto>>> {
    let mut image: Option<(Vec<u8>, String)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        if field.name() != Some("file") {
            debug!("Ignoring unknown field: {:?}", field.name());
            continue;
        }

        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let data = field.bytes().await.map_err(|e| {
            debug!("Failed to read file bytes: {}", e);
            AppError::BadRequest(format!("Failed to read file data: {}", e))
        })?;

        image = Some((data.to_vec(), content_type));
    }

    let (data, content_type) =
        image.ok_or_else(|| AppError::BadRequest("File is required".to_string()))?;

    if data.len() > MAX_IMAGE_SIZE {
        return Err(AppError::BadRequest(format!(
            "File too large. Maximum size is {} MB",
            MAX_IMAGE_SIZE / 1024 / 1024
        )));
    }

    if !ALLOWED_IMAGE_TYPES.contains(&content_type.as_str()) {
        return Err(AppError::BadRequest(format!(
            "File type '{}' is not allowed. Allowed types: {}",
            content_type,
            ALLOWED_IMAGE_TYPES.join(", ")
        )));
    }

    let resource = service.upload_image(&name, data, &content_type).await?;
    Ok(Json(ApiResponse::success(
        Some(resource),
        Some("Image uploaded successfully".to_string()),
        None,
    )))
}

/// Remove the resource image (moderator only)
#[utoipa::path(
    delete,
    path = "/api/resources/{name}/image",
    params(
        ("name" = String, Path, description = "Resource name (case-insensitive)")
    ),
    responses(
        (status = 200, description = "Image removed", body = ApiResponse<ResourceResponseDto>),
        (status = 403, description = "Moderator access required"),
        (status = 404, description = "Resource or image not found")
    ),
    security(("bearer_auth" = [])),
    tag = "resources"
)]
pub async fn delete_image(
    RequireModerator(_user): RequireModerator,
    State(service): State<Arc<ResourceService>>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<ResourceResponseDto>>> {
    let resource = service.delete_image(&name).await?;
    Ok(Json(ApiResponse::success(Some(resource), None, None)))
}
