pub mod auth;
pub mod measurements;
pub mod reports;
pub mod resources;
