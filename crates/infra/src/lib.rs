//! Infrastructure layer: storage gateway, import orchestration, config.

pub mod config;
pub mod gateway;
pub mod import;

pub use config::{AppConfig, ConfigError};
pub use gateway::{GatewayError, InMemoryInvoiceGateway, InvoiceGateway, PostgresInvoiceGateway};
pub use import::{ImportDocument, ImportFailure, ImportResult, InvoiceImportService};
