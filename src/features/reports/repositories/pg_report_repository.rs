use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::Role;
use crate::features::reports::models::{
    Report, ReportResourceLink, ReportStatus, ResourceRef, TransitionEffects,
};
use crate::features::reports::repositories::{
    NewDraft, ReportFilter, ReportRepository, TransitionOutcome,
};
use crate::shared::validation::normalize_resource_name;

const REPORT_COLUMNS: &str = "id, status, client_id, moderator_id, place, month, \
                              created_at, processed_at, finished_at, updated_at";

const LINK_SELECT: &str = r#"
    SELECT rr.id, rr.report_id, rr.resource_id, r.name AS resource_name,
           rr.plan, rr.fact, rr.created_at
    FROM report_resources rr
    JOIN resources r ON r.id = rr.resource_id
"#;

fn db_error(context: &str, e: sqlx::Error) -> AppError {
    tracing::error!("Failed to {}: {:?}", context, e);
    AppError::Database(e)
}

/// PostgreSQL-backed [`ReportRepository`]
pub struct PgReportRepository {
    pool: PgPool,
}

impl PgReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))
    }

    /// Lock the report row and reject writes on terminal reports
    async fn lock_open_report(tx: &mut Transaction<'_, Postgres>, report_id: Uuid) -> Result<()> {
        let status: Option<ReportStatus> =
            sqlx::query_scalar("SELECT status FROM reports WHERE id = $1 FOR UPDATE")
                .bind(report_id)
                .fetch_optional(&mut **tx)
                .await
                .map_err(|e| db_error("lock report", e))?;

        match status {
            None => Err(AppError::NotFound(format!("Report {} not found", report_id))),
            Some(status) if status.is_terminal() => Err(AppError::ReportClosed(format!(
                "Report {} is {}",
                report_id, status
            ))),
            Some(_) => Ok(()),
        }
    }
}

#[async_trait]
impl ReportRepository for PgReportRepository {
    async fn find_draft(&self, client_id: Uuid) -> Result<Option<Report>> {
        sqlx::query_as::<_, Report>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE client_id = $1 AND status = 'draft'"
        ))
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find draft", e))
    }

    async fn create_draft(&self, draft: NewDraft) -> Result<(Report, bool)> {
        // The partial unique index on (client_id) WHERE status = 'draft'
        // turns a concurrent second insert into a no-op
        let inserted = sqlx::query_as::<_, Report>(&format!(
            r#"
            INSERT INTO reports (status, client_id, moderator_id, place)
            VALUES ('draft', $1, $2, $3)
            ON CONFLICT (client_id) WHERE status = 'draft' DO NOTHING
            RETURNING {REPORT_COLUMNS}
            "#
        ))
        .bind(draft.client_id)
        .bind(draft.moderator_id)
        .bind(&draft.place)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("create draft", e))?;

        if let Some(report) = inserted {
            return Ok((report, true));
        }

        let existing = self.find_draft(draft.client_id).await?.ok_or_else(|| {
            AppError::Conflict("Draft was modified concurrently, please retry".to_string())
        })?;

        Ok((existing, false))
    }

    async fn list_moderator_ids(&self) -> Result<Vec<Uuid>> {
        sqlx::query_scalar("SELECT id FROM users WHERE role = $1")
            .bind(Role::Moderator)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list moderators", e))
    }

    async fn get_report(&self, id: Uuid) -> Result<Option<Report>> {
        sqlx::query_as::<_, Report>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get report", e))
    }

    async fn list_reports(&self, filter: &ReportFilter) -> Result<Vec<Report>> {
        let statuses: Vec<String> = filter
            .statuses
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();

        sqlx::query_as::<_, Report>(&format!(
            r#"
            SELECT {REPORT_COLUMNS}
            FROM reports
            WHERE (cardinality($1::text[]) = 0 OR status::text = ANY($1))
              AND ($2::uuid IS NULL OR client_id = $2)
              AND ($3::uuid IS NULL OR moderator_id = $3)
              AND ($4::timestamptz IS NULL OR created_at >= $4)
              AND ($5::timestamptz IS NULL OR created_at < $5)
            ORDER BY created_at DESC
            "#
        ))
        .bind(&statuses)
        .bind(filter.client_id)
        .bind(filter.moderator_id)
        .bind(filter.created_from)
        .bind(filter.created_to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list reports", e))
    }

    async fn update_details(
        &self,
        id: Uuid,
        place: Option<String>,
        month: Option<String>,
    ) -> Result<Option<Report>> {
        sqlx::query_as::<_, Report>(&format!(
            r#"
            UPDATE reports
            SET place = COALESCE($2, place),
                month = COALESCE($3, month),
                updated_at = NOW()
            WHERE id = $1 AND status = 'draft'
            RETURNING {REPORT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(place)
        .bind(month)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("update report details", e))
    }

    async fn resolve_resources(&self, names: &[String]) -> Result<Vec<ResourceRef>> {
        let normalized: Vec<String> = names.iter().map(|n| normalize_resource_name(n)).collect();

        sqlx::query_as::<_, ResourceRef>(
            r#"
            SELECT id, name, place, is_available
            FROM resources
            WHERE LOWER(name) = ANY($1)
            "#,
        )
        .bind(&normalized)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("resolve resources", e))
    }

    async fn list_links(&self, report_id: Uuid) -> Result<Vec<ReportResourceLink>> {
        sqlx::query_as::<_, ReportResourceLink>(&format!(
            "{LINK_SELECT} WHERE rr.report_id = $1 ORDER BY rr.created_at, r.name"
        ))
        .bind(report_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list report links", e))
    }

    async fn apply_link_changes(
        &self,
        report_id: Uuid,
        remove: &[Uuid],
        add: &[Uuid],
    ) -> Result<()> {
        let mut tx = self.begin().await?;
        Self::lock_open_report(&mut tx, report_id).await?;

        if !remove.is_empty() {
            sqlx::query("DELETE FROM report_resources WHERE report_id = $1 AND resource_id = ANY($2)")
                .bind(report_id)
                .bind(remove)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("remove report links", e))?;
        }

        if !add.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO report_resources (report_id, resource_id)
                SELECT $1, UNNEST($2::uuid[])
                ON CONFLICT (report_id, resource_id) DO NOTHING
                "#,
            )
            .bind(report_id)
            .bind(add)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("add report links", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("commit link changes", e))
    }

    async fn delete_link(&self, report_id: Uuid, resource_id: Uuid) -> Result<bool> {
        let mut tx = self.begin().await?;
        Self::lock_open_report(&mut tx, report_id).await?;

        let result =
            sqlx::query("DELETE FROM report_resources WHERE report_id = $1 AND resource_id = $2")
                .bind(report_id)
                .bind(resource_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("delete report link", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("commit link delete", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn transition(
        &self,
        id: Uuid,
        from: ReportStatus,
        to: ReportStatus,
        effects: TransitionEffects,
    ) -> Result<Option<TransitionOutcome>> {
        let mut tx = self.begin().await?;

        // Row lock serializes against link writers on the same report
        let current: Option<ReportStatus> =
            sqlx::query_scalar("SELECT status FROM reports WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| db_error("lock report", e))?;

        if current != Some(from) {
            tx.rollback()
                .await
                .map_err(|e| db_error("roll back status transition", e))?;
            return Ok(None);
        }

        let linked_resource_ids: Vec<Uuid> = if effects.request_facts {
            sqlx::query_scalar(
                "SELECT resource_id FROM report_resources WHERE report_id = $1 ORDER BY created_at",
            )
            .bind(id)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| db_error("list links for fact requests", e))?
        } else {
            Vec::new()
        };

        if effects.remove_links {
            let removed = sqlx::query("DELETE FROM report_resources WHERE report_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("remove links of report", e))?;
            tracing::debug!("Removed {} links of report {}", removed.rows_affected(), id);
        }

        // Status goes last so a lost race rolls back the cascade too
        let updated = sqlx::query_as::<_, Report>(&format!(
            r#"
            UPDATE reports
            SET status = $3,
                processed_at = CASE WHEN $4 THEN NOW() ELSE processed_at END,
                finished_at = CASE WHEN $5 THEN NOW() ELSE finished_at END,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {REPORT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(effects.set_processed_at)
        .bind(effects.set_finished_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("update report status", e))?;

        match updated {
            Some(report) => {
                tx.commit()
                    .await
                    .map_err(|e| db_error("commit status transition", e))?;
                Ok(Some(TransitionOutcome {
                    report,
                    linked_resource_ids,
                }))
            }
            None => {
                tx.rollback()
                    .await
                    .map_err(|e| db_error("roll back status transition", e))?;
                Ok(None)
            }
        }
    }

    async fn set_plan(&self, report_id: Uuid, resource_id: Uuid, plan: Decimal) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE report_resources SET plan = $3 WHERE report_id = $1 AND resource_id = $2",
        )
        .bind(report_id)
        .bind(resource_id)
        .bind(plan)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("set plan", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_fact(&self, report_id: Uuid, resource_id: Uuid, fact: Decimal) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE report_resources SET fact = $3 WHERE report_id = $1 AND resource_id = $2",
        )
        .bind(report_id)
        .bind(resource_id)
        .bind(fact)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("record fact", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_pending_facts(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM report_resources WHERE fact IS NULL OR fact = 0")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("count pending facts", e))
    }
}
