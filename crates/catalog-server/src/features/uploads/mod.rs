//! Upload feature: CSV submission and upload history

pub mod commands;
pub mod queries;
mod routes;

pub use routes::uploads_routes;
