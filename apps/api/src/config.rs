use anyhow::{anyhow, Context, Result};

use crate::content::validation::PAGE_LIMIT_MAX;
use crate::layout::raster::RasterBackend;
use crate::llm_client::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::storage::StoreBackend;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub xai_api_key: String,
    pub llm_base_url: String,
    pub llm_model: String,
    pub storage_backend: StoreBackend,
    pub output_dir: String,
    /// Present only when `storage_backend` is S3.
    pub s3: Option<S3Settings>,
    pub raster_backend: RasterBackend,
    /// Present only when both `EMAIL_USER` and `EMAIL_PASSWORD` are set.
    pub smtp: Option<SmtpSettings>,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

/// Settings the job pipeline needs, passed explicitly to the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub max_content_pages: usize,
    pub default_recipient: Option<String>,
    pub default_namespace: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_content_pages: 7,
            default_recipient: None,
            default_namespace: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let storage_backend: StoreBackend = env_or("STORAGE_BACKEND", "local")
            .parse()
            .map_err(|e: String| anyhow!(e))?;
        let s3 = match storage_backend {
            StoreBackend::S3 => Some(S3Settings {
                bucket: require_env("S3_BUCKET")?,
                endpoint: require_env("S3_ENDPOINT")?,
                access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
                secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            }),
            StoreBackend::Local => None,
        };

        let smtp = match (optional_env("EMAIL_USER"), optional_env("EMAIL_PASSWORD")) {
            (Some(user), Some(password)) => Some(SmtpSettings {
                host: env_or("SMTP_HOST", "smtp.gmail.com"),
                port: env_or("SMTP_PORT", "587")
                    .parse::<u16>()
                    .context("SMTP_PORT must be a valid port number")?,
                user,
                password,
            }),
            _ => None,
        };

        let max_content_pages = parse_max_content_pages(&env_or("MAX_CONTENT_PAGES", "7"))?;

        Ok(Config {
            port: env_or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
            xai_api_key: require_env("XAI_API_KEY")?,
            llm_base_url: env_or("LLM_BASE_URL", DEFAULT_BASE_URL),
            llm_model: env_or("LLM_MODEL", DEFAULT_MODEL),
            storage_backend,
            output_dir: env_or("OUTPUT_DIR", "output"),
            s3,
            raster_backend: env_or("RASTER_BACKEND", "resvg")
                .parse()
                .map_err(|e: String| anyhow!(e))?,
            smtp,
            pipeline: PipelineConfig {
                max_content_pages,
                default_recipient: optional_env("DEFAULT_RECIPIENT"),
                default_namespace: optional_env("OUTPUT_NAMESPACE"),
            },
        })
    }
}

/// Accepts 1..=`PAGE_LIMIT_MAX`; page numbers on the template are two digits.
fn parse_max_content_pages(raw: &str) -> Result<usize> {
    let pages = raw
        .trim()
        .parse::<usize>()
        .context("MAX_CONTENT_PAGES must be a positive integer")?;
    if !(1..=PAGE_LIMIT_MAX).contains(&pages) {
        return Err(anyhow!(
            "MAX_CONTENT_PAGES must be between 1 and {PAGE_LIMIT_MAX}, got {pages}"
        ));
    }
    Ok(pages)
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Reads `key`, treating unset and blank values alike.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}
