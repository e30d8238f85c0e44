use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::core::error::AppError;
use crate::features::auth::model::{AuthenticatedUser, Role};

/// Report status enum matching database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "report_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Draft,
    UnderReview,
    Deleted,
    Rejected,
    Approved,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 5] = [
        ReportStatus::Draft,
        ReportStatus::UnderReview,
        ReportStatus::Deleted,
        ReportStatus::Rejected,
        ReportStatus::Approved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Draft => "draft",
            ReportStatus::UnderReview => "under_review",
            ReportStatus::Deleted => "deleted",
            ReportStatus::Rejected => "rejected",
            ReportStatus::Approved => "approved",
        }
    }

    /// No transition leaves a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReportStatus::Deleted | ReportStatus::Rejected | ReportStatus::Approved
        )
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| AppError::InvalidStatus(format!("Unknown report status '{}'", s)))
    }
}

/// Database model for report
#[derive(Debug, Clone, FromRow)]
pub struct Report {
    pub id: Uuid,
    pub status: ReportStatus,
    pub client_id: Uuid,
    pub moderator_id: Uuid,
    pub place: Option<String>,
    /// `YYYY-MM`
    pub month: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Set when the client submits the draft for review
    pub processed_at: Option<DateTime<Utc>>,
    /// Set when the report reaches a terminal status
    pub finished_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Report {
    /// Clients are bound through `client_id`, moderators through `moderator_id`
    pub fn is_bound_to(&self, user: &AuthenticatedUser) -> bool {
        match user.role {
            Role::User => self.client_id == user.user_id,
            Role::Moderator => self.moderator_id == user.user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        for status in ReportStatus::ALL {
            assert_eq!(status.as_str().parse::<ReportStatus>().unwrap(), status);
        }

        assert!(matches!(
            "archived".parse::<ReportStatus>(),
            Err(AppError::InvalidStatus(_))
        ));
        assert!("Draft".parse::<ReportStatus>().is_err());
    }

    #[test]
    fn test_binding_follows_role() {
        let client = Uuid::new_v4();
        let moderator = Uuid::new_v4();
        let now = Utc::now();
        let report = Report {
            id: Uuid::new_v4(),
            status: ReportStatus::Draft,
            client_id: client,
            moderator_id: moderator,
            place: None,
            month: None,
            created_at: now,
            processed_at: None,
            finished_at: None,
            updated_at: now,
        };

        assert!(report.is_bound_to(&AuthenticatedUser::new(client, Role::User)));
        assert!(report.is_bound_to(&AuthenticatedUser::new(moderator, Role::Moderator)));
        // Right id, wrong role
        assert!(!report.is_bound_to(&AuthenticatedUser::new(client, Role::Moderator)));
        assert!(!report.is_bound_to(&AuthenticatedUser::new(Uuid::new_v4(), Role::User)));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!ReportStatus::Draft.is_terminal());
        assert!(!ReportStatus::UnderReview.is_terminal());
        assert!(ReportStatus::Deleted.is_terminal());
        assert!(ReportStatus::Rejected.is_terminal());
        assert!(ReportStatus::Approved.is_terminal());
    }
}
