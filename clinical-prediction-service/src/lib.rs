pub mod config;
pub mod models;
pub mod service;
pub mod uploads;

pub use config::ServiceConfig;
pub use service::{AppState, create_app};
pub use uploads::StoredUpload;
pub use models::*;
