use std::sync::Arc;

use chrono::{Days, NaiveDate};
use rand::seq::SliceRandom;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::{AuthenticatedUser, Role};
use crate::features::reports::models::{
    allowed_targets, settable_by, Report, ReportResourceLink, ReportStatus, TransitionEffects,
};
use crate::features::reports::repositories::{NewDraft, ReportFilter, ReportRepository};
use crate::features::reports::services::LedgerService;

/// A report together with its resource links
#[derive(Debug, Clone)]
pub struct ReportDetail {
    pub report: Report,
    pub links: Vec<ReportResourceLink>,
}

/// Report lifecycle: drafts, reads and role-gated status transitions
pub struct ReportService {
    repo: Arc<dyn ReportRepository>,
    ledger: Arc<LedgerService>,
}

impl ReportService {
    pub fn new(repo: Arc<dyn ReportRepository>, ledger: Arc<LedgerService>) -> Self {
        Self { repo, ledger }
    }

    /// The client's open draft, created on first use
    pub async fn create_or_get_draft(&self, client_id: Uuid) -> Result<Report> {
        let (report, _) = self.get_or_create_draft(client_id, None).await?;
        Ok(report)
    }

    async fn get_or_create_draft(
        &self,
        client_id: Uuid,
        place: Option<String>,
    ) -> Result<(Report, bool)> {
        if let Some(draft) = self.repo.find_draft(client_id).await? {
            return Ok((draft, false));
        }

        let moderator_id = self.pick_moderator().await?;
        let (report, created) = self
            .repo
            .create_draft(NewDraft {
                client_id,
                moderator_id,
                place,
            })
            .await?;

        if created {
            tracing::info!(
                "Created draft report {} for client {} (moderator {})",
                report.id,
                client_id,
                report.moderator_id
            );
        }

        Ok((report, created))
    }

    /// Uniform pick among the current moderators
    async fn pick_moderator(&self) -> Result<Uuid> {
        let candidates = self.repo.list_moderator_ids().await?;
        candidates
            .choose(&mut rand::thread_rng())
            .copied()
            .ok_or(AppError::NoModeratorAvailable)
    }

    /// Get-or-create the caller's draft and link one resource to it.
    ///
    /// A newly created draft takes the resource's place.
    pub async fn attach_resource(
        &self,
        caller: &AuthenticatedUser,
        resource_name: &str,
    ) -> Result<ReportDetail> {
        let resource = self
            .repo
            .resolve_resources(&[resource_name.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("Resource '{}' not found", resource_name)))?;

        if !resource.is_available {
            return Err(AppError::BadRequest(format!(
                "Resource '{}' is not available",
                resource.name
            )));
        }

        let (report, _) = self
            .get_or_create_draft(caller.user_id, resource.place.clone())
            .await?;

        let already_linked = self
            .repo
            .list_links(report.id)
            .await?
            .iter()
            .any(|link| link.resource_id == resource.id);

        if !already_linked {
            self.repo
                .apply_link_changes(report.id, &[], &[resource.id])
                .await?;
            tracing::debug!("Attached resource {} to report {}", resource.id, report.id);
        }

        let links = self.repo.list_links(report.id).await?;
        Ok(ReportDetail { report, links })
    }

    pub async fn get_report(&self, id: Uuid, caller: &AuthenticatedUser) -> Result<ReportDetail> {
        let report = self.load_bound_report(id, caller).await?;
        let links = self.repo.list_links(id).await?;
        Ok(ReportDetail { report, links })
    }

    /// Moderators see reports under review; clients see every open report.
    ///
    /// Both dates are inclusive and compared against `created_at` in UTC.
    pub async fn list_reports(
        &self,
        role: Role,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<Vec<Report>> {
        if let (Some(from), Some(to)) = (date_from, date_to) {
            if from > to {
                return Err(AppError::BadRequest(
                    "date_from must not be after date_to".to_string(),
                ));
            }
        }

        let statuses = match role {
            Role::Moderator => vec![ReportStatus::UnderReview],
            Role::User => vec![ReportStatus::Draft, ReportStatus::UnderReview],
        };

        let filter = ReportFilter {
            statuses,
            created_from: date_from.map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc()),
            created_to: date_to
                .and_then(|d| d.checked_add_days(Days::new(1)))
                .map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc()),
            ..Default::default()
        };

        self.repo.list_reports(&filter).await
    }

    /// Reports the caller is bound to, in any status
    pub async fn list_own_reports(&self, caller: &AuthenticatedUser) -> Result<Vec<Report>> {
        let filter = match caller.role {
            Role::User => ReportFilter {
                client_id: Some(caller.user_id),
                ..Default::default()
            },
            Role::Moderator => ReportFilter {
                moderator_id: Some(caller.user_id),
                ..Default::default()
            },
        };

        self.repo.list_reports(&filter).await
    }

    /// Set place and month while the report is still a draft
    pub async fn update_details(
        &self,
        id: Uuid,
        caller: &AuthenticatedUser,
        place: Option<String>,
        month: Option<String>,
    ) -> Result<Report> {
        let report = self.load_bound_report(id, caller).await?;

        if report.status.is_terminal() {
            return Err(AppError::ReportClosed(format!(
                "Report {} is {}",
                id, report.status
            )));
        }

        self.repo
            .update_details(id, place, month)
            .await?
            .ok_or_else(|| AppError::Conflict(format!("Report {} is no longer a draft", id)))
    }

    /// Move a report to `new_status` on behalf of `caller`.
    ///
    /// Checks run in order: known status, role may ever set it, report
    /// exists, caller is bound to it, transition allowed from the current
    /// status. Fact requests for an approval are queued after the commit.
    pub async fn transition_status(
        &self,
        id: Uuid,
        caller: &AuthenticatedUser,
        new_status: &str,
    ) -> Result<Report> {
        let target: ReportStatus = new_status.parse()?;

        if !settable_by(caller.role).contains(&target) {
            return Err(AppError::PermissionDenied(format!(
                "Role {} cannot set status {}",
                caller.role, target
            )));
        }

        let report = self.load_bound_report(id, caller).await?;
        let from = report.status;

        if !allowed_targets(caller.role, from).contains(&target) {
            return Err(AppError::PermissionDenied(format!(
                "Role {} cannot move report {} from {} to {}",
                caller.role, id, from, target
            )));
        }

        let effects = TransitionEffects::entering(target);
        let outcome = self
            .repo
            .transition(id, from, target, effects)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!(
                    "Report {} changed status concurrently, please retry",
                    id
                ))
            })?;

        tracing::info!(
            "Report {} moved from {} to {} by {} {}",
            id,
            from,
            target,
            caller.role,
            caller.user_id
        );

        if effects.request_facts {
            let linked = &outcome.linked_resource_ids;
            let queued = linked
                .iter()
                .filter(|resource_id| self.ledger.request_fact(id, **resource_id))
                .count();
            tracing::debug!(
                "Queued {}/{} fact requests for report {}",
                queued,
                linked.len(),
                id
            );
        }

        Ok(outcome.report)
    }

    async fn load_bound_report(&self, id: Uuid, caller: &AuthenticatedUser) -> Result<Report> {
        let report = self
            .repo
            .get_report(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", id)))?;

        if !report.is_bound_to(caller) {
            return Err(AppError::NotResponsible(format!(
                "{} {} is not bound to report {}",
                caller.role, caller.user_id, id
            )));
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reports::repositories::MemoryReportRepository;
    use crate::features::reports::services::{FactRequestQueue, FactRequestReceiver, LinkReconciler};
    use crate::modules::measurement::FactRequest;
    use rust_decimal::Decimal;

    struct Fixture {
        repo: Arc<MemoryReportRepository>,
        service: ReportService,
        reconciler: LinkReconciler,
        ledger: Arc<LedgerService>,
        receiver: FactRequestReceiver,
        client: AuthenticatedUser,
        moderator: AuthenticatedUser,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(MemoryReportRepository::new());
        let moderator = AuthenticatedUser::new(Uuid::new_v4(), Role::Moderator);
        repo.add_moderator(moderator.user_id);
        repo.add_resource("titanium", Some("Mare Orientale"));
        repo.add_resource("thorium", None);

        let (queue, receiver) = FactRequestQueue::with_capacity(16);
        let ledger = Arc::new(LedgerService::new(repo.clone(), queue));

        Fixture {
            service: ReportService::new(repo.clone(), ledger.clone()),
            reconciler: LinkReconciler::new(repo.clone()),
            repo,
            ledger,
            receiver,
            client: AuthenticatedUser::new(Uuid::new_v4(), Role::User),
            moderator,
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_draft_is_singleton() {
        let f = fixture();

        let first = f.service.create_or_get_draft(f.client.user_id).await.unwrap();
        let second = f.service.create_or_get_draft(f.client.user_id).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.status, ReportStatus::Draft);
        assert_eq!(first.moderator_id, f.moderator.user_id);
        assert!(first.processed_at.is_none() && first.finished_at.is_none());
    }

    #[tokio::test]
    async fn test_draft_needs_a_moderator() {
        let repo = Arc::new(MemoryReportRepository::new());
        let (queue, _receiver) = FactRequestQueue::with_capacity(1);
        let ledger = Arc::new(LedgerService::new(repo.clone(), queue));
        let service = ReportService::new(repo, ledger);

        let result = service.create_or_get_draft(Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::NoModeratorAvailable)));
    }

    #[tokio::test]
    async fn test_moderator_pick_stays_within_candidates() {
        let f = fixture();
        let others: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        for id in &others {
            f.repo.add_moderator(*id);
        }

        for _ in 0..20 {
            let report = f.service.create_or_get_draft(Uuid::new_v4()).await.unwrap();
            assert!(
                report.moderator_id == f.moderator.user_id
                    || others.contains(&report.moderator_id)
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_status() {
        let f = fixture();
        let draft = f.service.create_or_get_draft(f.client.user_id).await.unwrap();

        let result = f.service.transition_status(draft.id, &f.client, "archived").await;
        assert!(matches!(result, Err(AppError::InvalidStatus(_))));
    }

    #[tokio::test]
    async fn test_user_can_never_approve() {
        let f = fixture();
        let draft = f.service.create_or_get_draft(f.client.user_id).await.unwrap();

        let result = f.service.transition_status(draft.id, &f.client, "approved").await;
        assert!(matches!(result, Err(AppError::PermissionDenied(_))));

        // Checked before the report is even looked up
        let result = f
            .service
            .transition_status(Uuid::new_v4(), &f.client, "approved")
            .await;
        assert!(matches!(result, Err(AppError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_transition_missing_report() {
        let f = fixture();

        let result = f
            .service
            .transition_status(Uuid::new_v4(), &f.client, "under_review")
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_transition_by_unbound_users() {
        let f = fixture();
        let draft = f.service.create_or_get_draft(f.client.user_id).await.unwrap();

        let stranger = AuthenticatedUser::new(Uuid::new_v4(), Role::User);
        let result = f
            .service
            .transition_status(draft.id, &stranger, "under_review")
            .await;
        assert!(matches!(result, Err(AppError::NotResponsible(_))));

        f.service
            .transition_status(draft.id, &f.client, "under_review")
            .await
            .unwrap();

        let other_moderator = AuthenticatedUser::new(Uuid::new_v4(), Role::Moderator);
        let result = f
            .service
            .transition_status(draft.id, &other_moderator, "approved")
            .await;
        assert!(matches!(result, Err(AppError::NotResponsible(_))));
    }

    #[tokio::test]
    async fn test_transition_not_allowed_from_current_status() {
        let f = fixture();
        let draft = f.service.create_or_get_draft(f.client.user_id).await.unwrap();

        // Moderator may approve in general, but not a draft
        let result = f
            .service
            .transition_status(draft.id, &f.moderator, "approved")
            .await;
        assert!(matches!(result, Err(AppError::PermissionDenied(_))));

        f.service
            .transition_status(draft.id, &f.client, "under_review")
            .await
            .unwrap();

        let result = f
            .service
            .transition_status(draft.id, &f.client, "deleted")
            .await;
        assert!(matches!(result, Err(AppError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_delete_cascades_links() {
        let f = fixture();
        let draft = f.service.create_or_get_draft(f.client.user_id).await.unwrap();
        f.reconciler
            .set_report_resources(draft.id, &f.client, &names(&["titanium", "thorium"]))
            .await
            .unwrap();

        let deleted = f
            .service
            .transition_status(draft.id, &f.client, "deleted")
            .await
            .unwrap();

        assert_eq!(deleted.status, ReportStatus::Deleted);
        assert!(deleted.finished_at.is_some());
        assert!(f.repo.list_links(draft.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reject_cascades_links() {
        let f = fixture();
        let draft = f.service.create_or_get_draft(f.client.user_id).await.unwrap();
        f.reconciler
            .set_report_resources(draft.id, &f.client, &names(&["titanium"]))
            .await
            .unwrap();
        f.service
            .transition_status(draft.id, &f.client, "under_review")
            .await
            .unwrap();

        let rejected = f
            .service
            .transition_status(draft.id, &f.moderator, "rejected")
            .await
            .unwrap();

        assert_eq!(rejected.status, ReportStatus::Rejected);
        assert!(f.repo.list_links(draft.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_new_draft_after_deletion() {
        let f = fixture();
        let first = f.service.create_or_get_draft(f.client.user_id).await.unwrap();
        f.service
            .transition_status(first.id, &f.client, "deleted")
            .await
            .unwrap();

        let second = f.service.create_or_get_draft(f.client.user_id).await.unwrap();
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let mut f = fixture();
        let draft = f.service.create_or_get_draft(f.client.user_id).await.unwrap();
        let links = f
            .reconciler
            .set_report_resources(draft.id, &f.client, &names(&["titanium", "thorium"]))
            .await
            .unwrap();
        assert_eq!(links.len(), 2);

        let submitted = f
            .service
            .transition_status(draft.id, &f.client, "under_review")
            .await
            .unwrap();
        assert_eq!(submitted.status, ReportStatus::UnderReview);
        assert!(submitted.processed_at.is_some());
        assert!(submitted.finished_at.is_none());

        let approved = f
            .service
            .transition_status(draft.id, &f.moderator, "approved")
            .await
            .unwrap();
        assert_eq!(approved.status, ReportStatus::Approved);
        assert!(approved.finished_at.is_some());

        let mut requested = Vec::new();
        for _ in 0..2 {
            requested.push(f.receiver.recv().await.unwrap());
        }
        assert!(f.receiver.try_recv().is_err());
        for link in &links {
            assert!(requested.contains(&FactRequest {
                report_id: draft.id,
                resource_id: link.resource_id,
            }));
        }

        f.ledger
            .set_plan(draft.id, links[0].resource_id, 50.0)
            .await
            .unwrap();
        assert_eq!(
            f.repo.link(draft.id, links[0].resource_id).unwrap().plan,
            Some(Decimal::from(50))
        );

        let unknown = f.ledger.set_plan(draft.id, Uuid::new_v4(), 50.0).await;
        assert!(matches!(unknown, Err(AppError::NotFound(_))));

        let closed = f
            .reconciler
            .set_report_resources(draft.id, &f.client, &[])
            .await;
        assert!(matches!(closed, Err(AppError::ReportClosed(_))));
    }

    #[tokio::test]
    async fn test_approval_queues_facts_without_rereading_links() {
        let mut f = fixture();
        let draft = f.service.create_or_get_draft(f.client.user_id).await.unwrap();
        let links = f
            .reconciler
            .set_report_resources(draft.id, &f.client, &names(&["titanium", "thorium"]))
            .await
            .unwrap();
        f.service
            .transition_status(draft.id, &f.client, "under_review")
            .await
            .unwrap();

        f.repo.fail_link_reads();

        let approved = f
            .service
            .transition_status(draft.id, &f.moderator, "approved")
            .await
            .unwrap();
        assert_eq!(approved.status, ReportStatus::Approved);

        let mut requested = Vec::new();
        for _ in 0..2 {
            requested.push(f.receiver.recv().await.unwrap());
        }
        for link in &links {
            assert!(requested.contains(&FactRequest {
                report_id: draft.id,
                resource_id: link.resource_id,
            }));
        }
    }

    #[tokio::test]
    async fn test_get_report_binding() {
        let f = fixture();
        let draft = f.service.create_or_get_draft(f.client.user_id).await.unwrap();

        let detail = f.service.get_report(draft.id, &f.client).await.unwrap();
        assert_eq!(detail.report.id, draft.id);
        assert!(detail.links.is_empty());

        f.service.get_report(draft.id, &f.moderator).await.unwrap();

        let stranger = AuthenticatedUser::new(Uuid::new_v4(), Role::User);
        let result = f.service.get_report(draft.id, &stranger).await;
        assert!(matches!(result, Err(AppError::NotResponsible(_))));
    }

    #[tokio::test]
    async fn test_list_reports_by_role() {
        let f = fixture();
        let draft = f.service.create_or_get_draft(f.client.user_id).await.unwrap();

        let other = AuthenticatedUser::new(Uuid::new_v4(), Role::User);
        let submitted = f.service.create_or_get_draft(other.user_id).await.unwrap();
        f.service
            .transition_status(submitted.id, &other, "under_review")
            .await
            .unwrap();

        let third = AuthenticatedUser::new(Uuid::new_v4(), Role::User);
        let deleted = f.service.create_or_get_draft(third.user_id).await.unwrap();
        f.service
            .transition_status(deleted.id, &third, "deleted")
            .await
            .unwrap();

        let for_moderator = f
            .service
            .list_reports(Role::Moderator, None, None)
            .await
            .unwrap();
        assert_eq!(
            for_moderator.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![submitted.id]
        );

        let for_user = f.service.list_reports(Role::User, None, None).await.unwrap();
        assert_eq!(for_user.len(), 2);
        assert!(for_user.iter().any(|r| r.id == draft.id));
        assert!(for_user.iter().all(|r| r.id != deleted.id));
    }

    #[tokio::test]
    async fn test_list_reports_date_range() {
        let f = fixture();
        f.service.create_or_get_draft(f.client.user_id).await.unwrap();
        let today = chrono::Utc::now().date_naive();
        let yesterday = today.pred_opt().unwrap();

        let hit = f
            .service
            .list_reports(Role::User, Some(today), Some(today))
            .await
            .unwrap();
        assert_eq!(hit.len(), 1);

        let miss = f
            .service
            .list_reports(Role::User, None, Some(yesterday))
            .await
            .unwrap();
        assert!(miss.is_empty());

        let inverted = f
            .service
            .list_reports(Role::User, Some(today), Some(yesterday))
            .await;
        assert!(matches!(inverted, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_list_own_reports() {
        let f = fixture();
        let draft = f.service.create_or_get_draft(f.client.user_id).await.unwrap();
        f.service
            .transition_status(draft.id, &f.client, "deleted")
            .await
            .unwrap();
        f.service.create_or_get_draft(f.client.user_id).await.unwrap();
        f.service.create_or_get_draft(Uuid::new_v4()).await.unwrap();

        let mine = f.service.list_own_reports(&f.client).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|r| r.client_id == f.client.user_id));

        let assigned = f.service.list_own_reports(&f.moderator).await.unwrap();
        assert_eq!(assigned.len(), 3);
    }

    #[tokio::test]
    async fn test_update_details_only_in_draft() {
        let f = fixture();
        let draft = f.service.create_or_get_draft(f.client.user_id).await.unwrap();

        let updated = f
            .service
            .update_details(
                draft.id,
                &f.client,
                Some("Oceanus Procellarum".to_string()),
                Some("2024-05".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(updated.place.as_deref(), Some("Oceanus Procellarum"));
        assert_eq!(updated.month.as_deref(), Some("2024-05"));

        f.service
            .transition_status(draft.id, &f.client, "under_review")
            .await
            .unwrap();
        let result = f
            .service
            .update_details(draft.id, &f.client, None, Some("2024-06".to_string()))
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_attach_resource_creates_draft_with_place() {
        let f = fixture();

        let detail = f.service.attach_resource(&f.client, "Titanium").await.unwrap();
        assert_eq!(detail.report.status, ReportStatus::Draft);
        assert_eq!(detail.report.place.as_deref(), Some("Mare Orientale"));
        assert_eq!(detail.links.len(), 1);

        // Idempotent, and an existing draft keeps its place
        let again = f.service.attach_resource(&f.client, "titanium").await.unwrap();
        assert_eq!(again.report.id, detail.report.id);
        assert_eq!(again.links.len(), 1);

        let more = f.service.attach_resource(&f.client, "thorium").await.unwrap();
        assert_eq!(more.report.id, detail.report.id);
        assert_eq!(more.links.len(), 2);
        assert_eq!(more.report.place.as_deref(), Some("Mare Orientale"));
    }

    #[tokio::test]
    async fn test_attach_unknown_or_unavailable_resource() {
        let f = fixture();

        let result = f.service.attach_resource(&f.client, "unobtainium").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let id = f.repo.add_resource("helium-3", None);
        f.repo.set_resource_available(id, false);
        let result = f.service.attach_resource(&f.client, "helium-3").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
