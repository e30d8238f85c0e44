use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::reports::models::ReportStatus;
use crate::features::reports::repositories::ReportRepository;
use crate::features::reports::services::FactRequestQueue;
use crate::modules::measurement::FactRequest;
use crate::shared::validation::quantity_from_f64;

/// Planned and measured quantities per report link
pub struct LedgerService {
    repo: Arc<dyn ReportRepository>,
    queue: FactRequestQueue,
}

impl LedgerService {
    pub fn new(repo: Arc<dyn ReportRepository>, queue: FactRequestQueue) -> Self {
        Self { repo, queue }
    }

    /// Set the moderator's target quantity for one link
    pub async fn set_plan(&self, report_id: Uuid, resource_id: Uuid, quantity: f64) -> Result<()> {
        let plan = quantity_from_f64(quantity, "plan")?;

        let report = self
            .repo
            .get_report(report_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", report_id)))?;

        if matches!(report.status, ReportStatus::Deleted | ReportStatus::Rejected) {
            return Err(AppError::ReportClosed(format!(
                "Report {} is {}",
                report_id, report.status
            )));
        }

        if !self.repo.set_plan(report_id, resource_id, plan).await? {
            return Err(link_not_found(report_id, resource_id));
        }

        tracing::debug!(
            "Set plan {} for report {} resource {}",
            plan,
            report_id,
            resource_id
        );
        Ok(())
    }

    /// Store a measured quantity; later measurements overwrite earlier ones.
    /// Returns the value as stored.
    pub async fn record_fact(
        &self,
        report_id: Uuid,
        resource_id: Uuid,
        quantity: f64,
    ) -> Result<Decimal> {
        let fact = quantity_from_f64(quantity, "fact")?;

        if !self.repo.set_fact(report_id, resource_id, fact).await? {
            return Err(link_not_found(report_id, resource_id));
        }

        tracing::info!(
            "Recorded fact {} for report {} resource {}",
            fact,
            report_id,
            resource_id
        );
        Ok(fact)
    }

    /// Ask the measurement service for a fact without waiting for delivery
    pub fn request_fact(&self, report_id: Uuid, resource_id: Uuid) -> bool {
        self.queue.enqueue(FactRequest {
            report_id,
            resource_id,
        })
    }

    pub async fn count_pending_facts(&self) -> Result<i64> {
        self.repo.count_pending_facts().await
    }
}

fn link_not_found(report_id: Uuid, resource_id: Uuid) -> AppError {
    AppError::NotFound(format!(
        "Resource {} is not linked to report {}",
        resource_id, report_id
    ))
}
