use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::core::middleware::MEASUREMENT_SECRET_HEADER;
use crate::features::auth;
use crate::features::measurements::{dto as measurements_dto, handlers as measurements_handlers};
use crate::features::reports::{
    dtos as reports_dtos, handlers as reports_handlers, models as reports_models,
};
use crate::features::resources::{dtos as resources_dtos, handlers as resources_handlers};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth
        auth::handlers::get_me,
        // Resources (public reads, moderator writes)
        resources_handlers::list_resources,
        resources_handlers::get_resource,
        resources_handlers::create_resource,
        resources_handlers::update_resource,
        resources_handlers::toggle_availability,
        resources_handlers::add_production,
        resources_handlers::upload_image,
        resources_handlers::delete_image,
        // Reports
        reports_handlers::create_draft,
        reports_handlers::attach_resource,
        reports_handlers::list_reports,
        reports_handlers::list_my_reports,
        reports_handlers::count_pending_facts,
        reports_handlers::get_report,
        reports_handlers::update_report,
        reports_handlers::set_report_resources,
        reports_handlers::remove_report_resource,
        reports_handlers::update_report_status,
        reports_handlers::set_plan,
        // Measurement callback
        measurements_handlers::record_fact,
    ),
    components(
        schemas(
            Meta,
            auth::model::Role,
            auth::dto::MeResponseDto,
            ApiResponse<auth::dto::MeResponseDto>,
            // Resources
            resources_dtos::CreateResourceDto,
            resources_dtos::UpdateResourceDto,
            resources_dtos::AddProductionDto,
            resources_dtos::UploadImageDto,
            resources_dtos::ResourceResponseDto,
            resources_dtos::ProductionResponseDto,
            resources_dtos::ResourceDetailResponseDto,
            ApiResponse<resources_dtos::ResourceResponseDto>,
            ApiResponse<Vec<resources_dtos::ResourceResponseDto>>,
            ApiResponse<resources_dtos::ResourceDetailResponseDto>,
            ApiResponse<resources_dtos::ProductionResponseDto>,
            // Reports
            reports_models::ReportStatus,
            reports_dtos::UpdateReportDetailsDto,
            reports_dtos::SetReportResourcesDto,
            reports_dtos::UpdateReportStatusDto,
            reports_dtos::SetPlanDto,
            reports_dtos::ReportResponseDto,
            reports_dtos::ReportLinkResponseDto,
            reports_dtos::ReportDetailResponseDto,
            reports_dtos::PendingFactsResponseDto,
            ApiResponse<reports_dtos::ReportResponseDto>,
            ApiResponse<Vec<reports_dtos::ReportResponseDto>>,
            ApiResponse<reports_dtos::ReportDetailResponseDto>,
            ApiResponse<Vec<reports_dtos::ReportLinkResponseDto>>,
            ApiResponse<reports_dtos::PendingFactsResponseDto>,
            // Measurements
            measurements_dto::RecordFactDto,
            measurements_dto::RecordFactResponseDto,
            ApiResponse<measurements_dto::RecordFactResponseDto>,
        )
    ),
    tags(
        (name = "auth", description = "Caller identity"),
        (name = "resources", description = "Catalog of extractable resources"),
        (name = "reports", description = "Extraction reports, their resources and plans"),
        (name = "measurements", description = "Callbacks from the measurement service"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Resource Extraction API",
        version = "0.1.0",
        description = "API documentation for the resource extraction tracker",
    )
)]
pub struct ApiDoc;

/// Adds the bearer JWT and measurement shared-secret schemes
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "measurement_secret",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(
                    MEASUREMENT_SECRET_HEADER,
                ))),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
