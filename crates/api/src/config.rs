use dalma_meshy::orchestrator::PollConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    ///
    /// Note that the blocking `/wait` generation endpoint takes a longer
    /// per-route timeout derived from the poll budget.
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
        }
    }
}

/// Meshy generation service configuration.
#[derive(Debug, Clone)]
pub struct MeshyConfig {
    /// Bearer token for the generation API.
    pub api_key: String,
    /// Service base URL.
    pub base_url: String,
    /// Polling cadence and budget.
    pub poll: PollConfig,
}

impl MeshyConfig {
    /// Load from environment variables.
    ///
    /// | Env Var                  | Default                 |
    /// |--------------------------|-------------------------|
    /// | `MESHY_API_KEY`          | (required)              |
    /// | `MESHY_BASE_URL`         | `https://api.meshy.ai`  |
    /// | `MESHY_POLL_INTERVAL_SECS` | `5`                   |
    /// | `MESHY_POLL_MAX_ATTEMPTS`  | `60`                  |
    pub fn from_env() -> Self {
        let api_key = std::env::var("MESHY_API_KEY").expect("MESHY_API_KEY must be set");

        let base_url = std::env::var("MESHY_BASE_URL")
            .unwrap_or_else(|_| "https://api.meshy.ai".into());

        let interval_secs: u64 = std::env::var("MESHY_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("MESHY_POLL_INTERVAL_SECS must be a valid u64");

        let max_attempts: u32 = std::env::var("MESHY_POLL_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("MESHY_POLL_MAX_ATTEMPTS must be a valid u32");

        Self {
            api_key,
            base_url,
            poll: PollConfig {
                interval: std::time::Duration::from_secs(interval_secs),
                max_attempts,
            },
        }
    }
}

/// Cloudinary blob storage configuration.
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl CloudinaryConfig {
    /// Load from environment variables. All three are required.
    ///
    /// | Env Var                 |
    /// |-------------------------|
    /// | `CLOUDINARY_CLOUD_NAME` |
    /// | `CLOUDINARY_API_KEY`    |
    /// | `CLOUDINARY_API_SECRET` |
    pub fn from_env() -> Self {
        Self {
            cloud_name: std::env::var("CLOUDINARY_CLOUD_NAME")
                .expect("CLOUDINARY_CLOUD_NAME must be set"),
            api_key: std::env::var("CLOUDINARY_API_KEY")
                .expect("CLOUDINARY_API_KEY must be set"),
            api_secret: std::env::var("CLOUDINARY_API_SECRET")
                .expect("CLOUDINARY_API_SECRET must be set"),
        }
    }
}
