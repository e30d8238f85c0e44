//! Storage module for resource images
//!
//! Provides a MinIO/S3-compatible client that uploads public objects and
//! deletes them by URL.

mod minio_client;

pub use minio_client::MinIOClient;
