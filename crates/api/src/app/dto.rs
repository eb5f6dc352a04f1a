use serde::{Deserialize, Serialize};

// -------------------------
// Request DTOs
// -------------------------

/// `POST /invoices/import/batch` body.
///
/// Entries stay raw JSON so each one is decoded (and can fail) on its own;
/// see `aeroclub_infra::ImportDocument::from_json`.
#[derive(Debug, Deserialize)]
pub struct BatchImportRequest {
    pub documents: Vec<serde_json::Value>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
