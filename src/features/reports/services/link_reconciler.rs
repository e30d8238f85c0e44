use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::reports::models::{Report, ReportResourceLink};
use crate::features::reports::repositories::ReportRepository;
use crate::shared::validation::normalize_resource_name;

/// Delta between the current and the desired links of a report, by resource id
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LinkChanges {
    pub to_add: Vec<Uuid>,
    pub to_remove: Vec<Uuid>,
    pub to_keep: Vec<Uuid>,
}

impl LinkChanges {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Compute the minimal delta turning `existing` into `target`.
///
/// Duplicates in either input are ignored; output follows input order.
pub fn plan_link_changes(existing: &[Uuid], target: &[Uuid]) -> LinkChanges {
    let existing_set: HashSet<Uuid> = existing.iter().copied().collect();
    let target_set: HashSet<Uuid> = target.iter().copied().collect();

    let mut changes = LinkChanges::default();
    let mut seen = HashSet::new();

    for id in existing.iter().filter(|id| seen.insert(**id)) {
        if target_set.contains(id) {
            changes.to_keep.push(*id);
        } else {
            changes.to_remove.push(*id);
        }
    }

    for id in target {
        if !existing_set.contains(id) && seen.insert(*id) {
            changes.to_add.push(*id);
        }
    }

    changes
}

/// Syncs a report's resource links to a requested set of names
pub struct LinkReconciler {
    repo: Arc<dyn ReportRepository>,
}

impl LinkReconciler {
    pub fn new(repo: Arc<dyn ReportRepository>) -> Self {
        Self { repo }
    }

    /// Replace the report's links with `names`.
    ///
    /// Kept links retain their plan and fact. An unknown name fails the whole
    /// call before anything is written.
    pub async fn set_report_resources(
        &self,
        report_id: Uuid,
        caller: &AuthenticatedUser,
        names: &[String],
    ) -> Result<Vec<ReportResourceLink>> {
        self.load_open_report(report_id, caller).await?;

        let target = self.resolve_names(names).await?;
        let existing: Vec<Uuid> = self
            .repo
            .list_links(report_id)
            .await?
            .into_iter()
            .map(|link| link.resource_id)
            .collect();

        let changes = plan_link_changes(&existing, &target);
        if !changes.is_empty() {
            self.repo
                .apply_link_changes(report_id, &changes.to_remove, &changes.to_add)
                .await?;

            tracing::info!(
                "Report {} links: +{} -{} ={}",
                report_id,
                changes.to_add.len(),
                changes.to_remove.len(),
                changes.to_keep.len()
            );
        }

        self.repo.list_links(report_id).await
    }

    pub async fn remove_link(
        &self,
        report_id: Uuid,
        caller: &AuthenticatedUser,
        resource_id: Uuid,
    ) -> Result<()> {
        self.load_open_report(report_id, caller).await?;

        if !self.repo.delete_link(report_id, resource_id).await? {
            return Err(AppError::NotFound(format!(
                "Resource {} is not linked to report {}",
                resource_id, report_id
            )));
        }

        Ok(())
    }

    /// The report, if `caller` is its client and it is not terminal
    async fn load_open_report(&self, report_id: Uuid, caller: &AuthenticatedUser) -> Result<Report> {
        let report = self
            .repo
            .get_report(report_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", report_id)))?;

        if report.client_id != caller.user_id {
            return Err(AppError::NotResponsible(format!(
                "User {} is not the client of report {}",
                caller.user_id, report_id
            )));
        }

        if report.status.is_terminal() {
            return Err(AppError::ReportClosed(format!(
                "Report {} is {}",
                report_id, report.status
            )));
        }

        Ok(report)
    }

    /// Resource ids for `names`, de-duplicated case-insensitively
    async fn resolve_names(&self, names: &[String]) -> Result<Vec<Uuid>> {
        let mut normalized: Vec<String> = Vec::with_capacity(names.len());
        for name in names.iter().map(|n| normalize_resource_name(n)) {
            if !normalized.contains(&name) {
                normalized.push(name);
            }
        }

        if normalized.is_empty() {
            return Ok(Vec::new());
        }

        let resolved = self.repo.resolve_resources(&normalized).await?;

        normalized
            .iter()
            .map(|name| {
                resolved
                    .iter()
                    .find(|r| normalize_resource_name(&r.name) == *name)
                    .map(|r| r.id)
                    .ok_or_else(|| AppError::NotFound(format!("Resource '{}' not found", name)))
            })
            .collect()
    }
}
