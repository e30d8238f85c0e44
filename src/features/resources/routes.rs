use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::features::resources::handlers;
use crate::features::resources::services::ResourceService;
use crate::shared::constants::MAX_IMAGE_SIZE;

/// Public catalog reads
pub fn public_routes(service: Arc<ResourceService>) -> Router {
    Router::new()
        .route("/api/resources", get(handlers::list_resources))
        .route("/api/resources/{name}", get(handlers::get_resource))
        .with_state(service)
}

/// Catalog management; handlers require the moderator role
pub fn routes(service: Arc<ResourceService>) -> Router {
    Router::new()
        .route("/api/resources", post(handlers::create_resource))
        .route("/api/resources/{name}", put(handlers::update_resource))
        .route(
            "/api/resources/{name}/availability",
            post(handlers::toggle_availability),
        )
        .route(
            "/api/resources/{name}/production",
            post(handlers::add_production),
        )
        .route(
            "/api/resources/{name}/image",
            // Leave room for multipart framing on top of the image itself
            post(handlers::upload_image)
                .delete(handlers::delete_image)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_SIZE + 1024 * 1024)),
        )
        .with_state(service)
}
