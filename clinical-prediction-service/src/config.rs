use std::path::PathBuf;

/// Runtime configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub model_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub allowed_origin: String,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(8000);

        let model_dir = std::env::var("MODEL_DIR")
            .unwrap_or_else(|_| "models".to_string())
            .into();

        let upload_dir = std::env::var("UPLOAD_DIR")
            .unwrap_or_else(|_| "uploads".to_string())
            .into();

        let allowed_origin =
            std::env::var("ALLOWED_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

        Self {
            port,
            model_dir,
            upload_dir,
            allowed_origin,
        }
    }
}
