/// Configuration management for the API server
///
/// Configuration is read once at start-up from environment variables (and a
/// `.env` file in development).
///
/// # Environment Variables
///
/// - `API_HOST` / `API_PORT`: Bind address (default: 0.0.0.0:5000)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Secret key for token signing, at least 32 characters (required)
/// - `JWT_TTL_DAYS`: Session lifetime in days (default: 7)
/// - `TOKEN_TRANSPORT`: `cookie`, `bearer` or `both` (default: both)
/// - `APP_ENV`: `development` or `production` (default: development)
/// - `CORS_ORIGINS`: Comma-separated allowed origins, `*` for any (default: http://localhost:3000)
/// - `UPLOAD_DIR`: Upload root directory (default: uploads)
/// - `MAX_UPLOAD_BYTES`: Upload size limit (default: 314572800)
/// - `REQUEST_TIMEOUT_SECS`: Per-request timeout (default: 30)
/// - `RUST_LOG`: Log filter (default: inventory_api=debug,inventory_shared=info,tower_http=debug)
/// - `LOG_FORMAT`: `json` for JSON log lines
///
/// # Example
///
/// ```no_run
/// use inventory_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use inventory_shared::{
    assets::DEFAULT_MAX_UPLOAD_BYTES,
    auth::{cookie::CookieProfile, jwt::DEFAULT_SESSION_TTL_DAYS, middleware::TokenTransport},
};
use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf, str::FromStr};

/// Minimum accepted length of `JWT_SECRET`
const MIN_SECRET_LEN: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub uploads: UploadConfig,
}

/// Deployment environment
///
/// Production assumes the frontend is served from another origin over HTTPS:
/// cross-origin cookies and HSTS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentEnv {
    #[default]
    Development,
    Production,
}

impl DeploymentEnv {
    pub fn is_production(&self) -> bool {
        matches!(self, DeploymentEnv::Production)
    }

    /// Session cookie attributes for this environment
    pub fn cookie_profile(&self) -> CookieProfile {
        match self {
            DeploymentEnv::Development => CookieProfile::SameOrigin,
            DeploymentEnv::Production => CookieProfile::CrossOrigin,
        }
    }
}

impl FromStr for DeploymentEnv {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(DeploymentEnv::Development),
            "production" | "prod" => Ok(DeploymentEnv::Production),
            other => anyhow::bail!("Unknown APP_ENV: {}", other),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub environment: DeploymentEnv,

    /// Allowed CORS origins; `*` means any origin
    pub cors_origins: Vec<String>,

    pub request_timeout_seconds: u64,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Session token configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for HS256 signing
    ///
    /// Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Session lifetime in days
    pub ttl_days: i64,

    /// Where sessions tokens are accepted and delivered
    pub transport: TokenTransport,
}

impl JwtConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.ttl_days)
    }
}

/// Upload storage configuration
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Directory served under `/uploads`
    pub dir: PathBuf,

    /// Largest accepted upload in bytes
    pub max_bytes: u64,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` or `JWT_SECRET` is missing
    /// - `JWT_SECRET` is shorter than 32 characters
    /// - A numeric or enumerated variable does not parse
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`]
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = get("API_HOST", "0.0.0.0");
        let port = get("API_PORT", "5000")
            .parse::<u16>()
            .context("API_PORT must be a port number")?;

        let environment = get("APP_ENV", "development").parse::<DeploymentEnv>()?;

        let cors_origins: Vec<String> = get("CORS_ORIGINS", "http://localhost:3000")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let request_timeout_seconds = get("REQUEST_TIMEOUT_SECS", "30")
            .parse::<u64>()
            .context("REQUEST_TIMEOUT_SECS must be a whole number of seconds")?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = get("DATABASE_MAX_CONNECTIONS", "10")
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a number")?;

        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < MIN_SECRET_LEN {
            anyhow::bail!("JWT_SECRET must be at least {} characters long", MIN_SECRET_LEN);
        }

        let ttl_days = get("JWT_TTL_DAYS", &DEFAULT_SESSION_TTL_DAYS.to_string())
            .parse::<i64>()
            .context("JWT_TTL_DAYS must be a number")?;

        if ttl_days <= 0 {
            anyhow::bail!("JWT_TTL_DAYS must be positive");
        }

        let transport = get("TOKEN_TRANSPORT", "both")
            .parse::<TokenTransport>()
            .map_err(anyhow::Error::msg)?;

        let upload_dir = PathBuf::from(get("UPLOAD_DIR", "uploads"));
        let max_upload_bytes = get("MAX_UPLOAD_BYTES", &DEFAULT_MAX_UPLOAD_BYTES.to_string())
            .parse::<u64>()
            .context("MAX_UPLOAD_BYTES must be a number")?;

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                environment,
                cors_origins,
                request_timeout_seconds,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                ttl_days,
                transport,
            },
            uploads: UploadConfig {
                dir: upload_dir,
                max_bytes: max_upload_bytes,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
