mod report;
mod report_resource;
mod transition;

pub use report::{Report, ReportStatus};
pub use report_resource::{ReportResourceLink, ResourceRef};
pub use transition::{allowed_targets, settable_by, TransitionEffects};
