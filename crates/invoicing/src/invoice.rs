use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use aeroclub_core::{DomainError, DomainResult};

pub const DEFAULT_STATUS: &str = "imported";
pub const DEFAULT_CURRENCY: &str = "RON";
pub const DEFAULT_COUNTRY: &str = "Romania";
pub const DEFAULT_UNIT: &str = "HUR";

/// Unit codes that denote flight hours rather than a flat fee.
pub const HOUR_UNIT_CODES: [&str; 3] = ["HUR", "HOUR", "H"];

/// Length of a personal fiscal code (CNP). Company VAT codes never have it.
pub const PERSONAL_CODE_LEN: usize = 13;

fn default_status() -> String {
    DEFAULT_STATUS.to_string()
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_country() -> String {
    DEFAULT_COUNTRY.to_string()
}

fn default_unit() -> String {
    DEFAULT_UNIT.to_string()
}

pub fn default_vat_rate() -> Decimal {
    Decimal::new(1900, 2)
}

/// Supplier invoice, as parsed from XML or as edited by a user before import.
///
/// Field names follow the JSON shape the review screen sends back, so an
/// edited invoice deserializes straight into this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    /// Full supplier invoice number (e.g. `CA0766`); the dedup key.
    pub id: String,
    pub series: String,
    pub number: String,
    pub date: NaiveDate,
    /// Absent means "due on issue".
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub total: Decimal,
    #[serde(default)]
    pub vat_total: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub client: Client,
    /// Order is significant: position + 1 becomes the persisted `line_id`.
    #[serde(default)]
    pub items: Vec<LineItem>,
}

impl Invoice {
    pub fn effective_due_date(&self) -> NaiveDate {
        self.due_date.unwrap_or(self.date)
    }

    /// Digits of `number`, or the raw value when it carries none.
    pub fn numeric_number(&self) -> String {
        let digits: String = self.number.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            self.number.clone()
        } else {
            digits
        }
    }

    /// Minimal sanity checks applied to user-edited invoices before import.
    pub fn check_importable(&self) -> DomainResult<()> {
        if self.id.trim().is_empty() {
            return Err(DomainError::validation("invoice id is required"));
        }
        if self.client.name.trim().is_empty() {
            return Err(DomainError::validation("client name is required"));
        }
        if let Some(pos) = self.items.iter().position(|i| i.quantity.is_sign_negative() && !i.quantity.is_zero()) {
            return Err(DomainError::validation(format!(
                "line {} has a negative quantity",
                pos + 1
            )));
        }
        Ok(())
    }
}

/// Customer block of an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Company VAT number or a 13-digit personal fiscal code.
    #[serde(default)]
    pub vat_code: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default = "default_country")]
    pub country: String,
}

impl Client {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: None,
            phone: None,
            vat_code: None,
            address: None,
            city: None,
            country: default_country(),
        }
    }

    /// Lower-cased, trimmed email; `None` when absent or blank.
    pub fn normalized_email(&self) -> Option<String> {
        self.email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
    }

    /// Trimmed VAT code; `None` when absent or blank.
    pub fn vat_code(&self) -> Option<&str> {
        self.vat_code.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    /// Whether the tax identifier is a personal fiscal code rather than a VAT number.
    pub fn is_personal_code(&self) -> bool {
        self.vat_code()
            .map(|c| c.chars().count() == PERSONAL_CODE_LEN)
            .unwrap_or(false)
    }
}

/// Invoice line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default = "default_unit")]
    pub unit: String,
    /// Unit price.
    #[serde(default)]
    pub price: Decimal,
    /// Line total.
    #[serde(default)]
    pub total: Decimal,
    /// VAT percent (e.g. 19.00).
    #[serde(default = "default_vat_rate")]
    pub vat_rate: Decimal,
}

impl LineItem {
    /// Whether the unit code bills flight hours.
    pub fn is_hour_unit(&self) -> bool {
        let unit = self.unit.trim();
        HOUR_UNIT_CODES.iter().any(|code| unit.eq_ignore_ascii_case(code))
    }

    /// Free hours: zero unit price, or explicitly labelled "promo".
    pub fn is_promotional(&self) -> bool {
        self.price.is_zero() || self.name.to_lowercase().contains("promo")
    }

    /// Name and description, lower-cased, for phrase matching.
    pub fn searchable_text(&self) -> String {
        match &self.description {
            Some(d) => format!("{} {}", self.name, d).to_lowercase(),
            None => self.name.to_lowercase(),
        }
    }
}
