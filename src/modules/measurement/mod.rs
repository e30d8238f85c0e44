//! Client for the external extraction-measurement service
//!
//! After a report is approved the service is asked, once per linked resource,
//! to measure the actual extracted quantity. It answers later through the fact
//! callback endpoint.

mod client;

pub use client::{FactRequest, FactRequestSender, MeasurementClient};
