//! Configuration loading and representation.
//!
//! Everything comes from environment variables; unset values fall back to
//! development defaults.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use aeroclub_invoicing::SupplierIdentity;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_IMPORT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// The club's own identifiers, excluded when picking client fields.
    pub supplier: SupplierIdentity,
    /// Postgres URL; `None` selects the in-memory gateway.
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    /// Upper bound on a single import request.
    pub import_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source (tests pass a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let supplier = SupplierIdentity::new(var("SUPPLIER_VAT_CODE"), var("SUPPLIER_EMAIL"));
        if supplier.vat_code.is_none() && supplier.email.is_none() {
            warn!("SUPPLIER_VAT_CODE/SUPPLIER_EMAIL not set; supplier fields may be mistaken for client fields");
        }

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                name: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let import_timeout = match var("IMPORT_TIMEOUT_SECS") {
            None => DEFAULT_IMPORT_TIMEOUT_SECS,
            Some(raw) => match raw.parse::<u64>() {
                Ok(0) => {
                    return Err(ConfigError::Invalid {
                        name: "IMPORT_TIMEOUT_SECS",
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Ok(secs) => secs,
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        name: "IMPORT_TIMEOUT_SECS",
                        reason: e.to_string(),
                    });
                }
            },
        };

        Ok(Self {
            supplier,
            database_url: var("DATABASE_URL"),
            bind_addr,
            import_timeout: Duration::from_secs(import_timeout),
        })
    }
}
