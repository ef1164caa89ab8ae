use std::env;

use sppg_core::{AppError, AppResult};
use tracing_subscriber::EnvFilter;
use url::Url;

const DEFAULT_HTTP_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub http_timeout_ms: u64,
    pub page_size: usize,
}

impl MonitorConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let api_base_url = lookup("SPPG_API_BASE_URL")
            .map(|value| value.trim().trim_end_matches('/').to_owned())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::Validation("SPPG_API_BASE_URL is required".to_owned()))?;
        Url::parse(api_base_url.as_str()).map_err(|error| {
            AppError::Config(format!(
                "invalid SPPG_API_BASE_URL value '{api_base_url}': {error}"
            ))
        })?;

        let api_token = lookup("SPPG_API_TOKEN")
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());
        let http_timeout_ms =
            parse_value(&lookup, "SPPG_HTTP_TIMEOUT_MS", DEFAULT_HTTP_TIMEOUT_MS)?;
        let page_size = parse_value(&lookup, "SPPG_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;

        if http_timeout_ms == 0 {
            return Err(AppError::Validation(
                "SPPG_HTTP_TIMEOUT_MS must be greater than zero".to_owned(),
            ));
        }

        if page_size == 0 {
            return Err(AppError::Validation(
                "SPPG_PAGE_SIZE must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            api_base_url,
            api_token,
            http_timeout_ms,
            page_size,
        })
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_value<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> AppResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(value) => value.trim().parse::<T>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}
