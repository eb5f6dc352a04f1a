use std::time::Duration;

use serde::Serialize;

use aeroclub_core::{CompanyId, FlightHoursId, InvoiceRecordId, UserId};

/// Why an import did not go through.
///
/// Not serialized; callers (e.g. the HTTP layer) use it to choose a status.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ImportFailure {
    /// The invoice id is already imported. No writes happened.
    Duplicate,
    /// The XML could not be read as an invoice.
    Parse,
    /// The request or invoice was rejected before any write.
    Validation,
    /// The store failed while committing.
    Persistence,
    /// The import did not finish within its deadline.
    Timeout,
}

/// Line that did not produce a flight-hour credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedLine {
    pub line_id: u32,
    pub reason: SkipReason,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Unit is not an hour code.
    NonHourUnit,
    /// Hour line, but nobody to credit.
    NoUser,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NonHourUnit => "non_hour_unit",
            SkipReason::NoUser => "no_user",
        }
    }
}

/// Outcome of one invoice import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<InvoiceRecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<CompanyId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_hours_id: Option<FlightHoursId>,
    #[serde(rename = "isPPL", skip_serializing_if = "Option::is_none")]
    pub is_ppl: Option<bool>,
    #[serde(rename = "pplHoursPaid", skip_serializing_if = "Option::is_none")]
    pub ppl_hours_paid: Option<u32>,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedLine>,
    #[serde(skip)]
    pub failure: Option<ImportFailure>,
}

impl ImportResult {
    pub(crate) fn failed(failure: ImportFailure, message: String, errors: Vec<String>) -> Self {
        Self {
            success: false,
            invoice_id: None,
            user_id: None,
            company_id: None,
            flight_hours_id: None,
            is_ppl: None,
            ppl_hours_paid: None,
            message,
            errors,
            skipped: Vec::new(),
            failure: Some(failure),
        }
    }

    /// A request body that could not be decoded as an import document.
    pub fn unreadable_request(reason: String) -> Self {
        Self::failed(
            ImportFailure::Validation,
            "Import request could not be read".to_string(),
            vec![reason],
        )
    }

    pub fn timed_out(after: Duration) -> Self {
        Self::failed(
            ImportFailure::Timeout,
            format!("Import did not finish within {after:?}"),
            Vec::new(),
        )
    }

    pub(crate) fn duplicate(smartbill_id: &str) -> Self {
        Self::failed(
            ImportFailure::Duplicate,
            format!("Invoice {smartbill_id} already exists"),
            Vec::new(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_result_serializes_minimal_shape() {
        let json = serde_json::to_value(ImportResult::duplicate("CA0766")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": false,
                "message": "Invoice CA0766 already exists",
            })
        );
    }

    #[test]
    fn timed_out_result_names_the_deadline() {
        let result = ImportResult::timed_out(Duration::from_millis(50));
        assert_eq!(result.failure, Some(ImportFailure::Timeout));
        assert_eq!(result.message, "Import did not finish within 50ms");
        assert!(!result.success);
    }

    #[test]
    fn success_fields_use_wire_names() {
        let result = ImportResult {
            success: true,
            invoice_id: Some(InvoiceRecordId::new()),
            user_id: None,
            company_id: None,
            flight_hours_id: None,
            is_ppl: Some(true),
            ppl_hours_paid: Some(20),
            message: "ok".to_string(),
            errors: vec![],
            skipped: vec![SkippedLine {
                line_id: 2,
                reason: SkipReason::NonHourUnit,
            }],
            failure: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["isPPL"], true);
        assert_eq!(json["pplHoursPaid"], 20);
        assert!(json.get("invoiceId").is_some());
        assert!(json.get("userId").is_none());
        assert_eq!(json["skipped"][0]["lineId"], 2);
        assert_eq!(json["skipped"][0]["reason"], "non_hour_unit");
    }
}
