//! Structural pre-check for XML invoices.
//!
//! This is an editorial gate run before import (substring search, no parse);
//! the import itself never calls it. Every missing marker is reported.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

const ROOT_MARKERS: [&str; 4] = ["<Invoice", ":Invoice", "<invoice", "<factura"];

const REQUIRED_MARKERS: [(&[&str], &str); 4] = [
    (&["cbc:ID", "<ID>", "<ID "], "Missing invoice ID (cbc:ID)"),
    (&["IssueDate"], "Missing issue date (cbc:IssueDate)"),
    (&["LegalMonetaryTotal"], "Missing monetary totals (cac:LegalMonetaryTotal)"),
    (&["AccountingCustomerParty"], "Missing customer party (cac:AccountingCustomerParty)"),
];

pub fn validate(xml: &str) -> ValidationReport {
    let mut errors = Vec::new();

    if !ROOT_MARKERS.iter().any(|m| xml.contains(m)) {
        errors.push("Missing Invoice root element".to_string());
    }
    for (markers, message) in REQUIRED_MARKERS {
        if !markers.iter().any(|m| xml.contains(m)) {
            errors.push(message.to_string());
        }
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
    }
}
