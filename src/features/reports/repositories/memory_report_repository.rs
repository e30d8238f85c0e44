use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::reports::models::{
    Report, ReportResourceLink, ReportStatus, ResourceRef, TransitionEffects,
};
use crate::features::reports::repositories::{
    NewDraft, ReportFilter, ReportRepository, TransitionOutcome,
};
use crate::shared::validation::normalize_resource_name;

#[derive(Default)]
struct State {
    reports: Vec<Report>,
    links: Vec<ReportResourceLink>,
    resources: Vec<ResourceRef>,
    moderators: Vec<Uuid>,
    fail_link_reads: bool,
}

/// In-process [`ReportRepository`] for service and handler tests
#[derive(Default)]
pub struct MemoryReportRepository {
    state: Mutex<State>,
}

impl MemoryReportRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_moderator(&self, id: Uuid) {
        self.lock().moderators.push(id);
    }

    pub fn add_resource(&self, name: &str, place: Option<&str>) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().resources.push(ResourceRef {
            id,
            name: name.to_string(),
            place: place.map(String::from),
            is_available: true,
        });
        id
    }

    pub fn set_resource_available(&self, id: Uuid, available: bool) {
        if let Some(resource) = self.lock().resources.iter_mut().find(|r| r.id == id) {
            resource.is_available = available;
        }
    }

    /// Overwrite a stored status, bypassing the transition rules
    pub fn force_status(&self, id: Uuid, status: ReportStatus) {
        if let Some(report) = self.lock().reports.iter_mut().find(|r| r.id == id) {
            report.status = status;
        }
    }

    pub fn link(&self, report_id: Uuid, resource_id: Uuid) -> Option<ReportResourceLink> {
        self.lock()
            .links
            .iter()
            .find(|l| l.report_id == report_id && l.resource_id == resource_id)
            .cloned()
    }

    /// Make every later `list_links` call fail as if the store went away
    pub fn fail_link_reads(&self) {
        self.lock().fail_link_reads = true;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }
}

fn check_open(state: &State, report_id: Uuid) -> Result<()> {
    match state.reports.iter().find(|r| r.id == report_id) {
        None => Err(AppError::NotFound(format!("Report {} not found", report_id))),
        Some(r) if r.status.is_terminal() => Err(AppError::ReportClosed(format!(
            "Report {} is {}",
            report_id, r.status
        ))),
        Some(_) => Ok(()),
    }
}

fn update_link(
    state: &mut State,
    report_id: Uuid,
    resource_id: Uuid,
    apply: impl FnOnce(&mut ReportResourceLink),
) -> bool {
    match state
        .links
        .iter_mut()
        .find(|l| l.report_id == report_id && l.resource_id == resource_id)
    {
        Some(link) => {
            apply(link);
            true
        }
        None => false,
    }
}

#[async_trait]
impl ReportRepository for MemoryReportRepository {
    async fn find_draft(&self, client_id: Uuid) -> Result<Option<Report>> {
        Ok(self
            .lock()
            .reports
            .iter()
            .find(|r| r.client_id == client_id && r.status == ReportStatus::Draft)
            .cloned())
    }

    async fn create_draft(&self, draft: NewDraft) -> Result<(Report, bool)> {
        let mut state = self.lock();

        if let Some(existing) = state
            .reports
            .iter()
            .find(|r| r.client_id == draft.client_id && r.status == ReportStatus::Draft)
        {
            return Ok((existing.clone(), false));
        }

        let now = Utc::now();
        let report = Report {
            id: Uuid::new_v4(),
            status: ReportStatus::Draft,
            client_id: draft.client_id,
            moderator_id: draft.moderator_id,
            place: draft.place,
            month: None,
            created_at: now,
            processed_at: None,
            finished_at: None,
            updated_at: now,
        };
        state.reports.push(report.clone());

        Ok((report, true))
    }

    async fn list_moderator_ids(&self) -> Result<Vec<Uuid>> {
        Ok(self.lock().moderators.clone())
    }

    async fn get_report(&self, id: Uuid) -> Result<Option<Report>> {
        Ok(self.lock().reports.iter().find(|r| r.id == id).cloned())
    }

    async fn list_reports(&self, filter: &ReportFilter) -> Result<Vec<Report>> {
        let mut reports: Vec<Report> = self
            .lock()
            .reports
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reports)
    }

    async fn update_details(
        &self,
        id: Uuid,
        place: Option<String>,
        month: Option<String>,
    ) -> Result<Option<Report>> {
        let mut state = self.lock();
        let Some(report) = state
            .reports
            .iter_mut()
            .find(|r| r.id == id && r.status == ReportStatus::Draft)
        else {
            return Ok(None);
        };

        if place.is_some() {
            report.place = place;
        }
        if month.is_some() {
            report.month = month;
        }
        report.updated_at = Utc::now();

        Ok(Some(report.clone()))
    }

    async fn resolve_resources(&self, names: &[String]) -> Result<Vec<ResourceRef>> {
        let normalized: Vec<String> = names.iter().map(|n| normalize_resource_name(n)).collect();

        Ok(self
            .lock()
            .resources
            .iter()
            .filter(|r| normalized.contains(&normalize_resource_name(&r.name)))
            .cloned()
            .collect())
    }

    async fn list_links(&self, report_id: Uuid) -> Result<Vec<ReportResourceLink>> {
        let state = self.lock();
        if state.fail_link_reads {
            return Err(AppError::Internal("store unreachable".to_string()));
        }

        Ok(state
            .links
            .iter()
            .filter(|l| l.report_id == report_id)
            .cloned()
            .collect())
    }

    async fn apply_link_changes(
        &self,
        report_id: Uuid,
        remove: &[Uuid],
        add: &[Uuid],
    ) -> Result<()> {
        let mut state = self.lock();
        check_open(&state, report_id)?;

        state
            .links
            .retain(|l| !(l.report_id == report_id && remove.contains(&l.resource_id)));

        for resource_id in add {
            let exists = state
                .links
                .iter()
                .any(|l| l.report_id == report_id && l.resource_id == *resource_id);
            if exists {
                continue;
            }

            let resource_name = state
                .resources
                .iter()
                .find(|r| r.id == *resource_id)
                .map(|r| r.name.clone())
                .ok_or_else(|| AppError::NotFound(format!("Resource {} not found", resource_id)))?;

            state.links.push(ReportResourceLink {
                id: Uuid::new_v4(),
                report_id,
                resource_id: *resource_id,
                resource_name,
                plan: None,
                fact: None,
                created_at: Utc::now(),
            });
        }

        Ok(())
    }

    async fn delete_link(&self, report_id: Uuid, resource_id: Uuid) -> Result<bool> {
        let mut state = self.lock();
        check_open(&state, report_id)?;

        let before = state.links.len();
        state
            .links
            .retain(|l| !(l.report_id == report_id && l.resource_id == resource_id));
        Ok(state.links.len() < before)
    }

    async fn transition(
        &self,
        id: Uuid,
        from: ReportStatus,
        to: ReportStatus,
        effects: TransitionEffects,
    ) -> Result<Option<TransitionOutcome>> {
        let mut state = self.lock();

        let Some(index) = state
            .reports
            .iter()
            .position(|r| r.id == id && r.status == from)
        else {
            return Ok(None);
        };

        let linked_resource_ids = if effects.request_facts {
            state
                .links
                .iter()
                .filter(|l| l.report_id == id)
                .map(|l| l.resource_id)
                .collect()
        } else {
            Vec::new()
        };

        if effects.remove_links {
            state.links.retain(|l| l.report_id != id);
        }

        let now = Utc::now();
        let report = &mut state.reports[index];
        report.status = to;
        if effects.set_processed_at {
            report.processed_at = Some(now);
        }
        if effects.set_finished_at {
            report.finished_at = Some(now);
        }
        report.updated_at = now;

        Ok(Some(TransitionOutcome {
            report: report.clone(),
            linked_resource_ids,
        }))
    }

    async fn set_plan(&self, report_id: Uuid, resource_id: Uuid, plan: Decimal) -> Result<bool> {
        Ok(update_link(&mut self.lock(), report_id, resource_id, |l| {
            l.plan = Some(plan)
        }))
    }

    async fn set_fact(&self, report_id: Uuid, resource_id: Uuid, fact: Decimal) -> Result<bool> {
        Ok(update_link(&mut self.lock(), report_id, resource_id, |l| {
            l.fact = Some(fact)
        }))
    }

    async fn count_pending_facts(&self) -> Result<i64> {
        let pending = self
            .lock()
            .links
            .iter()
            .filter(|l| l.fact.is_none_or(|f| f.is_zero()))
            .count();
        Ok(pending as i64)
    }
}
