use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::resources::models::{Resource, ResourceProduction};
use crate::shared::types::PaginationQuery;
use crate::shared::validation::{quantity_to_f64, MONTH_REGEX, RESOURCE_NAME_REGEX};

// Query params for listing resources
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ResourceListQuery {
    /// Case-insensitive substring of the resource name
    pub search: Option<String>,

    /// Include resources switched off by a moderator (default: false)
    #[serde(default)]
    pub include_unavailable: bool,

    /// Page number (1-indexed, default: 1)
    #[param(minimum = 1)]
    pub page: Option<i64>,

    /// Items per page (default: 20, max: 100)
    #[param(minimum = 1, maximum = 100)]
    pub page_size: Option<i64>,
}

impl ResourceListQuery {
    pub fn pagination(&self) -> PaginationQuery {
        let defaults = PaginationQuery::default();
        PaginationQuery {
            page: self.page.unwrap_or(defaults.page),
            page_size: self.page_size.unwrap_or(defaults.page_size),
        }
    }

    /// Trimmed, non-empty search term
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateResourceDto {
    #[validate(
        length(min = 2, max = 255, message = "Name must be 2-255 characters"),
        regex(
            path = *RESOURCE_NAME_REGEX,
            message = "Name may only contain letters, digits, single spaces and hyphens"
        )
    )]
    pub name: String,

    #[validate(range(min = 0.0, message = "Density must be non-negative"))]
    pub density: Option<f64>,

    #[serde(default)]
    pub is_toxic: bool,

    #[validate(range(min = 0, max = 10, message = "Demand level must be between 0 and 10"))]
    pub demand_level: Option<i32>,

    #[validate(length(max = 255, message = "Place must be at most 255 characters"))]
    pub place: Option<String>,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,
}

/// Partial update; absent fields keep their current value
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateResourceDto {
    #[validate(
        length(min = 2, max = 255, message = "Name must be 2-255 characters"),
        regex(
            path = *RESOURCE_NAME_REGEX,
            message = "Name may only contain letters, digits, single spaces and hyphens"
        )
    )]
    pub name: Option<String>,

    #[validate(range(min = 0.0, message = "Density must be non-negative"))]
    pub density: Option<f64>,

    pub is_toxic: Option<bool>,

    #[validate(range(min = 0, max = 10, message = "Demand level must be between 0 and 10"))]
    pub demand_level: Option<i32>,

    #[validate(length(max = 255, message = "Place must be at most 255 characters"))]
    pub place: Option<String>,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddProductionDto {
    /// Month in `YYYY-MM` format
    #[validate(regex(path = *MONTH_REGEX, message = "Month must be in YYYY-MM format"))]
    pub month: String,

    #[validate(range(min = 0.0, message = "Quantity must be non-negative"))]
    pub quantity: f64,
}

/// Multipart form for image upload (OpenAPI only)
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadImageDto {
    /// Image file (jpeg, png, webp or gif)
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResourceResponseDto {
    pub id: Uuid,
    pub name: String,
    pub is_available: bool,
    pub density: Option<f64>,
    pub is_toxic: bool,
    pub demand_level: Option<i32>,
    pub place: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Resource> for ResourceResponseDto {
    fn from(r: Resource) -> Self {
        Self {
            id: r.id,
            name: r.name,
            is_available: r.is_available,
            density: r.density.map(quantity_to_f64),
            is_toxic: r.is_toxic,
            demand_level: r.demand_level,
            place: r.place,
            image_url: r.image_url,
            description: r.description,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductionResponseDto {
    pub month: String,
    pub quantity: f64,
}

impl From<ResourceProduction> for ProductionResponseDto {
    fn from(p: ResourceProduction) -> Self {
        Self {
            month: p.month,
            quantity: quantity_to_f64(p.quantity),
        }
    }
}

/// Resource with its production history, oldest month first
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResourceDetailResponseDto {
    #[serde(flatten)]
    pub resource: ResourceResponseDto,
    pub productions: Vec<ProductionResponseDto>,
}
