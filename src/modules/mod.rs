//! Modules layer - Infrastructure components for external integrations
//!
//! Contains clients for the object store and the extraction-measurement service.

pub mod measurement;
pub mod storage;
