//! Identity of the invoicing supplier (the club itself).
//!
//! Supplier and customer blocks of a UBL document use the same tags
//! (`CompanyID`, `ElectronicMail`), so the parser needs to know which values
//! belong to the supplier in order to discard them. Each deployment injects its
//! own identity.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierIdentity {
    pub vat_code: Option<String>,
    pub email: Option<String>,
}

impl SupplierIdentity {
    pub fn new(vat_code: Option<String>, email: Option<String>) -> Self {
        Self {
            vat_code: vat_code.filter(|v| !v.trim().is_empty()),
            email: email.filter(|e| !e.trim().is_empty()),
        }
    }

    pub fn is_supplier_email(&self, candidate: &str) -> bool {
        match &self.email {
            Some(own) => own.trim().eq_ignore_ascii_case(candidate.trim()),
            None => false,
        }
    }

    /// VAT codes compare without whitespace, case, or the `RO` country prefix,
    /// since the supplier's code shows up both as `RO123` and `123`.
    pub fn is_supplier_vat(&self, candidate: &str) -> bool {
        match &self.vat_code {
            Some(own) => normalize_vat(own) == normalize_vat(candidate),
            None => false,
        }
    }
}

fn normalize_vat(code: &str) -> String {
    let compact: String = code
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    match compact.strip_prefix("RO") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => compact,
    }
}
