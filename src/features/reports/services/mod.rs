mod fact_request_queue;
mod ledger_service;
mod link_reconciler;
mod report_service;

pub use fact_request_queue::{FactRequestQueue, FactRequestReceiver};
pub use ledger_service::LedgerService;
pub use link_reconciler::{plan_link_changes, LinkChanges, LinkReconciler};
pub use report_service::{ReportDetail, ReportService};
