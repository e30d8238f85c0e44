use std::borrow::Cow;
use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::resources::dtos::{
    AddProductionDto, CreateResourceDto, ProductionResponseDto, ResourceDetailResponseDto,
    ResourceListQuery, ResourceResponseDto, UpdateResourceDto,
};
use crate::features::resources::models::{Resource, ResourceProduction};
use crate::modules::storage::MinIOClient;
use crate::shared::constants::{image_extension, RESOURCE_IMAGE_FOLDER};
use crate::shared::validation::{density_from_f64, normalize_resource_name, quantity_from_f64};

const RESOURCE_COLUMNS: &str = "id, name, is_available, density, is_toxic, demand_level, \
                                place, image_url, description, created_at, updated_at";

/// Map unique violations to `Conflict` with a caller-facing message
fn handle_db_error(e: sqlx::Error, conflict_message: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code() == Some(Cow::Borrowed("23505")) {
            return AppError::Conflict(conflict_message.to_string());
        }
    }

    tracing::error!("Resource query failed: {:?}", e);
    AppError::Database(e)
}

/// Catalog of extractable resources
pub struct ResourceService {
    pool: PgPool,
    storage: Arc<MinIOClient>,
}

impl ResourceService {
    pub fn new(pool: PgPool, storage: Arc<MinIOClient>) -> Self {
        Self { pool, storage }
    }

    /// List resources, optionally filtered by a name substring
    pub async fn list(&self, query: &ResourceListQuery) -> Result<(Vec<ResourceResponseDto>, i64)> {
        let pagination = query.pagination();
        let pattern = query.search_term().map(|s| substring_pattern(&s));

        let resources = sqlx::query_as::<_, Resource>(&format!(
            r#"
            SELECT {RESOURCE_COLUMNS}
            FROM resources
            WHERE ($1::text IS NULL OR LOWER(name) LIKE $1 ESCAPE '\')
              AND ($2 OR is_available = TRUE)
            ORDER BY name
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(&pattern)
        .bind(query.include_unavailable)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list resources: {:?}", e);
            AppError::Database(e)
        })?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM resources
            WHERE ($1::text IS NULL OR LOWER(name) LIKE $1 ESCAPE '\')
              AND ($2 OR is_available = TRUE)
            "#,
        )
        .bind(&pattern)
        .bind(query.include_unavailable)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to count resources: {:?}", e);
            AppError::Database(e)
        })?;

        Ok((resources.into_iter().map(Into::into).collect(), total))
    }

    /// Case-insensitive lookup by name
    pub async fn find_by_name(&self, name: &str) -> Result<Resource> {
        let normalized = normalize_resource_name(name);

        sqlx::query_as::<_, Resource>(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources WHERE LOWER(name) = $1"
        ))
        .bind(&normalized)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get resource by name: {:?}", e);
            AppError::Database(e)
        })?
        .ok_or_else(|| AppError::NotFound(format!("Resource '{}' not found", name)))
    }

    /// Resource with its monthly production figures
    pub async fn get_by_name(&self, name: &str) -> Result<ResourceDetailResponseDto> {
        let resource = self.find_by_name(name).await?;

        let productions = sqlx::query_as::<_, ResourceProduction>(
            r#"
            SELECT id, resource_id, month, quantity, created_at
            FROM resource_productions
            WHERE resource_id = $1
            ORDER BY month
            "#,
        )
        .bind(resource.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list productions: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(ResourceDetailResponseDto {
            resource: resource.into(),
            productions: productions.into_iter().map(Into::into).collect(),
        })
    }

    pub async fn create(&self, dto: CreateResourceDto) -> Result<ResourceResponseDto> {
        let density = dto
            .density
            .map(density_from_f64)
            .transpose()?;

        let resource = sqlx::query_as::<_, Resource>(&format!(
            r#"
            INSERT INTO resources (name, density, is_toxic, demand_level, place, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {RESOURCE_COLUMNS}
            "#
        ))
        .bind(dto.name.trim())
        .bind(density)
        .bind(dto.is_toxic)
        .bind(dto.demand_level)
        .bind(&dto.place)
        .bind(&dto.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| handle_db_error(e, "A resource with this name already exists"))?;

        tracing::info!("Created resource '{}' ({})", resource.name, resource.id);
        Ok(resource.into())
    }

    pub async fn update(&self, name: &str, dto: UpdateResourceDto) -> Result<ResourceResponseDto> {
        let existing = self.find_by_name(name).await?;
        let density = dto
            .density
            .map(density_from_f64)
            .transpose()?;

        let resource = sqlx::query_as::<_, Resource>(&format!(
            r#"
            UPDATE resources
            SET name = COALESCE($2, name),
                density = COALESCE($3, density),
                is_toxic = COALESCE($4, is_toxic),
                demand_level = COALESCE($5, demand_level),
                place = COALESCE($6, place),
                description = COALESCE($7, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {RESOURCE_COLUMNS}
            "#
        ))
        .bind(existing.id)
        .bind(dto.name.as_deref().map(str::trim))
        .bind(density)
        .bind(dto.is_toxic)
        .bind(dto.demand_level)
        .bind(&dto.place)
        .bind(&dto.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| handle_db_error(e, "A resource with this name already exists"))?;

        Ok(resource.into())
    }

    /// Flip the availability flag; resources are never hard-deleted
    pub async fn toggle_availability(&self, name: &str) -> Result<ResourceResponseDto> {
        let existing = self.find_by_name(name).await?;

        let resource = sqlx::query_as::<_, Resource>(&format!(
            r#"
            UPDATE resources
            SET is_available = NOT is_available, updated_at = NOW()
            WHERE id = $1
            RETURNING {RESOURCE_COLUMNS}
            "#
        ))
        .bind(existing.id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to toggle resource availability: {:?}", e);
            AppError::Database(e)
        })?;

        tracing::info!(
            "Resource '{}' is now {}",
            resource.name,
            if resource.is_available {
                "available"
            } else {
                "unavailable"
            }
        );
        Ok(resource.into())
    }

    pub async fn add_production(
        &self,
        name: &str,
        dto: AddProductionDto,
    ) -> Result<ProductionResponseDto> {
        let resource = self.find_by_name(name).await?;
        let quantity = quantity_from_f64(dto.quantity, "quantity")?;

        let production = sqlx::query_as::<_, ResourceProduction>(
            r#"
            INSERT INTO resource_productions (resource_id, month, quantity)
            VALUES ($1, $2, $3)
            RETURNING id, resource_id, month, quantity, created_at
            "#,
        )
        .bind(resource.id)
        .bind(&dto.month)
        .bind(quantity)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            handle_db_error(
                e,
                &format!("Production for {} is already recorded", dto.month),
            )
        })?;

        Ok(production.into())
    }

    /// Store a new image and point the resource at it.
    ///
    /// The previous object, if any, is removed after the row is updated.
    pub async fn upload_image(
        &self,
        name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<ResourceResponseDto> {
        let existing = self.find_by_name(name).await?;
        let extension = image_extension(content_type).ok_or_else(|| {
            AppError::BadRequest(format!("Unsupported image type '{}'", content_type))
        })?;

        let path = format!(
            "{}/{}/{}.{}",
            RESOURCE_IMAGE_FOLDER,
            existing.id,
            Uuid::now_v7(),
            extension
        );
        let url = self.storage.upload_public(&path, data, content_type).await?;

        let resource = self.set_image_url(existing.id, Some(&url)).await?;

        if let Some(old_url) = existing.image_url {
            self.remove_object(&old_url).await;
        }

        Ok(resource.into())
    }

    pub async fn delete_image(&self, name: &str) -> Result<ResourceResponseDto> {
        let existing = self.find_by_name(name).await?;
        let Some(old_url) = existing.image_url.clone() else {
            return Err(AppError::NotFound(format!(
                "Resource '{}' has no image",
                existing.name
            )));
        };

        let resource = self.set_image_url(existing.id, None).await?;
        self.remove_object(&old_url).await;

        Ok(resource.into())
    }

    async fn set_image_url(&self, id: Uuid, url: Option<&str>) -> Result<Resource> {
        sqlx::query_as::<_, Resource>(&format!(
            r#"
            UPDATE resources
            SET image_url = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {RESOURCE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update resource image: {:?}", e);
            AppError::Database(e)
        })
    }

    /// Delete failures are logged and ignored
    async fn remove_object(&self, url: &str) {
        if let Err(e) = self.storage.delete_by_url(url).await {
            tracing::warn!("Failed to delete image '{}': {}", url, e);
        }
    }
}

/// `LIKE` pattern matching `term` literally anywhere in the value
fn substring_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_pattern_escapes_wildcards() {
        assert_eq!(substring_pattern("iron"), "%iron%");
        assert_eq!(substring_pattern("100%"), "%100\\%%");
        assert_eq!(substring_pattern("he_3"), "%he\\_3%");
        assert_eq!(substring_pattern("a\\b"), "%a\\\\b%");
    }
}
