use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Measured quantity for one linked resource, pushed by the measurement service
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RecordFactDto {
    pub report_id: Uuid,
    pub resource_id: Uuid,
    #[validate(range(min = 0.0, message = "Fact must be non-negative"))]
    pub fact: f64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecordFactResponseDto {
    pub report_id: Uuid,
    pub resource_id: Uuid,
    pub fact: f64,
}
