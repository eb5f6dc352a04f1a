use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use aeroclub_infra::{ImportFailure, ImportResult};

/// Status code for an import outcome.
pub fn import_status(result: &ImportResult) -> StatusCode {
    match result.failure {
        None => StatusCode::CREATED,
        Some(ImportFailure::Duplicate) => StatusCode::CONFLICT,
        Some(ImportFailure::Parse) | Some(ImportFailure::Validation) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        Some(ImportFailure::Persistence) => StatusCode::INTERNAL_SERVER_ERROR,
        Some(ImportFailure::Timeout) => StatusCode::GATEWAY_TIMEOUT,
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(failure: Option<ImportFailure>) -> ImportResult {
        ImportResult {
            success: failure.is_none(),
            invoice_id: None,
            user_id: None,
            company_id: None,
            flight_hours_id: None,
            is_ppl: None,
            ppl_hours_paid: None,
            message: String::new(),
            errors: vec![],
            skipped: vec![],
            failure,
        }
    }

    #[test]
    fn maps_failures_to_statuses() {
        assert_eq!(import_status(&outcome(None)), StatusCode::CREATED);
        assert_eq!(import_status(&outcome(Some(ImportFailure::Duplicate))), StatusCode::CONFLICT);
        assert_eq!(
            import_status(&outcome(Some(ImportFailure::Parse))),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            import_status(&outcome(Some(ImportFailure::Validation))),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            import_status(&outcome(Some(ImportFailure::Persistence))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            import_status(&outcome(Some(ImportFailure::Timeout))),
            StatusCode::GATEWAY_TIMEOUT
        );
    }
}
