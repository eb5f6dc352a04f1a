use std::sync::Arc;
use std::time::Duration;

use aeroclub_infra::{
    AppConfig, InMemoryInvoiceGateway, InvoiceGateway, InvoiceImportService,
    PostgresInvoiceGateway,
};
use aeroclub_invoicing::XmlInvoiceParser;

/// Gateway type shared by every handler; the backend is chosen at startup.
pub type SharedGateway = Arc<dyn InvoiceGateway>;

pub struct AppServices {
    pub importer: InvoiceImportService<SharedGateway>,
    /// Request-level bound on a single import.
    pub import_timeout: Duration,
}

impl AppServices {
    pub fn new(gateway: SharedGateway, parser: XmlInvoiceParser, import_timeout: Duration) -> Self {
        Self {
            importer: InvoiceImportService::new(gateway, parser),
            import_timeout,
        }
    }

    pub fn parser(&self) -> &XmlInvoiceParser {
        self.importer.parser()
    }
}

pub fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let gateway: SharedGateway = match &config.database_url {
        Some(url) => {
            tracing::info!("using postgres invoice store");
            Arc::new(PostgresInvoiceGateway::connect_lazy(url)?)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; imports are kept in memory only");
            Arc::new(InMemoryInvoiceGateway::new())
        }
    };

    Ok(AppServices::new(
        gateway,
        XmlInvoiceParser::new(config.supplier.clone()),
        config.import_timeout,
    ))
}
