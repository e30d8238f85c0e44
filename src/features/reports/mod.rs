pub mod dtos;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod workers;

pub use repositories::{PgReportRepository, ReportRepository};
pub use services::{FactRequestQueue, LedgerService, LinkReconciler, ReportService};
pub use workers::FactRequestDispatcher;
