use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::config::MeasurementConfig;
use crate::core::error::AppError;
use crate::core::middleware::MEASUREMENT_SECRET_HEADER;

/// Outbound payload asking the service to measure one (report, resource) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactRequest {
    pub report_id: Uuid,
    pub resource_id: Uuid,
}

/// Delivery seam used by the fact-request dispatcher
#[async_trait]
pub trait FactRequestSender: Send + Sync {
    async fn send(&self, request: &FactRequest) -> Result<(), AppError>;
}

pub struct MeasurementClient {
    http_client: Client,
    requests_url: String,
    shared_secret: String,
}

impl MeasurementClient {
    pub fn new(config: &MeasurementConfig) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            requests_url: format!("{}/facts/requests", config.base_url),
            shared_secret: config.shared_secret.clone(),
        })
    }
}

#[async_trait]
impl FactRequestSender for MeasurementClient {
    async fn send(&self, request: &FactRequest) -> Result<(), AppError> {
        let response = self
            .http_client
            .post(&self.requests_url)
            .header(MEASUREMENT_SECRET_HEADER, &self.shared_secret)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::DeliveryFailure(format!("Measurement request failed: {}", e)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(AppError::DeliveryFailure(format!(
                "Measurement service returned {}: {}",
                status, body
            )))
        }
    }
}
