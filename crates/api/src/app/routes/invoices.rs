use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};

use aeroclub_infra::{ImportDocument, ImportResult};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/parse", post(parse_invoice))
        .route("/validate", post(validate_invoice))
        .route("/import", post(import_invoice))
        .route("/import/batch", post(import_batch))
}

/// Raw XML in, parsed invoice out (for the review screen).
pub async fn parse_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    body: String,
) -> axum::response::Response {
    match services.parser().parse(&body) {
        Ok(invoice) => (StatusCode::OK, Json(invoice)).into_response(),
        Err(e) => errors::json_error(StatusCode::UNPROCESSABLE_ENTITY, "parse_error", e.to_string()),
    }
}

pub async fn validate_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    body: String,
) -> axum::response::Response {
    Json(services.parser().validate(&body)).into_response()
}

/// Body: `{"xmlContent", "editedInvoice"?}`. Every outcome but a timeout
/// answers with an `ImportResult`.
pub async fn import_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> axum::response::Response {
    let doc = match body
        .map_err(|rejection| ImportResult::unreadable_request(rejection.body_text()))
        .and_then(|Json(value)| ImportDocument::from_json(value))
    {
        Ok(doc) => doc,
        Err(rejected) => return (errors::import_status(&rejected), Json(rejected)).into_response(),
    };
    let import = services.importer.import_document(doc);

    match tokio::time::timeout(services.import_timeout, import).await {
        Ok(result) => (errors::import_status(&result), Json(result)).into_response(),
        Err(_) => {
            tracing::error!(timeout = ?services.import_timeout, "invoice import timed out");
            errors::json_error(
                StatusCode::GATEWAY_TIMEOUT,
                "timeout",
                format!("import did not finish within {:?}", services.import_timeout),
            )
        }
    }
}

/// Sequential import; each entry reports its own outcome and gets its own
/// `import_timeout`.
pub async fn import_batch(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::BatchImportRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            return errors::json_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_body",
                rejection.body_text(),
            );
        }
    };
    let results = services
        .importer
        .import_batch(body.documents, services.import_timeout)
        .await;
    (StatusCode::OK, Json(results)).into_response()
}
