//! Role-gated transition table of the report lifecycle.
//!
//! ```text
//! user:       draft -> under_review | deleted
//! moderator:  under_review -> approved | rejected
//! ```

use crate::features::auth::model::Role;
use crate::features::reports::models::ReportStatus;

/// Targets `role` may move a report to while it is in `from`
pub fn allowed_targets(role: Role, from: ReportStatus) -> &'static [ReportStatus] {
    use ReportStatus::*;

    match (role, from) {
        (Role::User, Draft) => &[UnderReview, Deleted],
        (Role::Moderator, UnderReview) => &[Approved, Rejected],
        _ => &[],
    }
}

/// Every target `role` can ever set, regardless of the current status
pub fn settable_by(role: Role) -> &'static [ReportStatus] {
    use ReportStatus::*;

    match role {
        Role::User => &[UnderReview, Deleted],
        Role::Moderator => &[Approved, Rejected],
    }
}

/// Writes that accompany entering a status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionEffects {
    pub set_processed_at: bool,
    pub set_finished_at: bool,
    /// Physically delete every link of the report
    pub remove_links: bool,
    /// Ask the measurement service for a fact per link
    pub request_facts: bool,
}

impl TransitionEffects {
    pub fn entering(status: ReportStatus) -> Self {
        Self {
            set_processed_at: status == ReportStatus::UnderReview,
            set_finished_at: status.is_terminal(),
            remove_links: matches!(status, ReportStatus::Deleted | ReportStatus::Rejected),
            request_facts: status == ReportStatus::Approved,
        }
    }
}
