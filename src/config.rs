use std::env;
use std::net::IpAddr;

use anyhow::{Context, Result, bail};
use axum::http::{HeaderName, HeaderValue};

/// Connection settings for the Spanner-backed link table
#[derive(Debug, Clone)]
pub struct SpannerConfig {
    pub emulator_host: Option<String>,
    pub project: String,
    pub instance: String,
    pub database: String,
    pub table: String,
    /// Create missing instance, database and table at startup
    pub auto_provision: bool,
}

impl SpannerConfig {
    pub fn database_path(&self) -> String {
        format!(
            "projects/{}/instances/{}/databases/{}",
            self.project, self.instance, self.database
        )
    }
}

/// Which store holds the short links
#[derive(Debug, Clone)]
pub enum StoreBackend {
    Spanner(SpannerConfig),
    /// Process-local map, lost on restart. Meant for local runs.
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub home_page_url: String,
    pub allowed_caller_ip: IpAddr,
    pub caller_ip_header: Option<HeaderName>,
    pub store_backend: StoreBackend,
    pub service_port: u16,
    pub service_host: String,
}

const DEFAULT_TABLE: &str = "short_links";

impl Config {
    pub fn from_env() -> Result<Self> {
        let home_page_url = env::var("HOME_PAGE_URL")
            .context("HOME_PAGE_URL environment variable is required")?;
        HeaderValue::from_str(&home_page_url)
            .context("HOME_PAGE_URL must be usable as a Location header value")?;

        let allowed_caller_ip = env::var("ALLOWED_CALLER_IP")
            .context("ALLOWED_CALLER_IP environment variable is required")?
            .parse::<IpAddr>()
            .context("ALLOWED_CALLER_IP must be an IPv4 or IPv6 address")?
            .to_canonical();

        let caller_ip_header = env::var("CALLER_IP_HEADER")
            .ok()
            .map(|name| HeaderName::from_bytes(name.trim().as_bytes()))
            .transpose()
            .context("CALLER_IP_HEADER must be a valid HTTP header name")?;

        let store_backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "spanner".to_string())
            .as_str()
        {
            "spanner" => StoreBackend::Spanner(spanner_from_env()?),
            "memory" => StoreBackend::Memory,
            other => bail!("STORE_BACKEND must be 'spanner' or 'memory', got '{}'", other),
        };

        let service_port = env::var("SERVICE_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("SERVICE_PORT must be a valid port number (0-65535)")?;

        let service_host = env::var("SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        Ok(Config {
            home_page_url,
            allowed_caller_ip,
            caller_ip_header,
            store_backend,
            service_port,
            service_host,
        })
    }

    pub fn log_startup(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Home page: {}", self.home_page_url);
        tracing::info!("  Allowed caller: {}", self.allowed_caller_ip);
        tracing::info!(
            "  Caller identity from: {}",
            self.caller_ip_header
                .as_ref()
                .map_or("peer address", |h| h.as_str())
        );
        match &self.store_backend {
            StoreBackend::Spanner(spanner) => {
                tracing::info!(
                    "  Spanner emulator: {}",
                    spanner
                        .emulator_host
                        .as_deref()
                        .unwrap_or("disabled (using production)")
                );
                tracing::info!("  Spanner database: {}", spanner.database_path());
                tracing::info!("  Spanner table: {}", spanner.table);
                tracing::info!("  Spanner auto-provisioning: {}", spanner.auto_provision);
            }
            StoreBackend::Memory => {
                tracing::warn!("  Store: in-memory, links are lost on restart");
            }
        }
        tracing::info!(
            "  Service listening on: {}:{}",
            self.service_host,
            self.service_port
        );
    }
}

fn spanner_from_env() -> Result<SpannerConfig> {
    let emulator_host = env::var("SPANNER_EMULATOR_HOST").ok();

    let project = env::var("SPANNER_PROJECT")
        .context("SPANNER_PROJECT environment variable is required")?;

    let instance = env::var("SPANNER_INSTANCE")
        .context("SPANNER_INSTANCE environment variable is required")?;

    let database = env::var("SPANNER_DATABASE")
        .context("SPANNER_DATABASE environment variable is required")?;

    let table = env::var("SPANNER_TABLE").unwrap_or_else(|_| DEFAULT_TABLE.to_string());
    if !is_valid_table_name(&table) {
        bail!(
            "SPANNER_TABLE must start with a letter or underscore and contain only letters, digits and underscores, got '{}'",
            table
        );
    }

    let auto_provision = parse_auto_provision(
        env::var("SPANNER_AUTO_PROVISION").ok().as_deref(),
        emulator_host.is_some(),
    )?;

    Ok(SpannerConfig {
        emulator_host,
        project,
        instance,
        database,
        table,
        auto_provision,
    })
}

// Provisioning needs admin permissions and may create billed resources, so
// outside the emulator it has to be asked for.
fn parse_auto_provision(raw: Option<&str>, emulator: bool) -> Result<bool> {
    match raw.map(str::trim) {
        None => Ok(emulator),
        Some("true" | "1") => Ok(true),
        Some("false" | "0") => Ok(false),
        Some(other) => bail!(
            "SPANNER_AUTO_PROVISION must be 'true' or 'false', got '{}'",
            other
        ),
    }
}

// The table name is spliced into SQL and DDL, so it must be a plain identifier.
fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
impl Config {
    /// In-memory configuration used by handler tests
    pub fn for_tests(allowed_caller_ip: IpAddr) -> Self {
        Config {
            home_page_url: "https://home.example.org/".to_string(),
            allowed_caller_ip,
            caller_ip_header: None,
            store_backend: StoreBackend::Memory,
            service_port: 3000,
            service_host: "0.0.0.0".to_string(),
        }
    }
}
