//! UBL / SmartBill XML invoice parser.
//!
//! Extraction is two-phase. Header, party and line fields come from fixed
//! paths on the element tree. Client email and VAT code are then settled by
//! scanning the raw XML text, because supplier and customer blocks both carry
//! `ElectronicMail` and `CompanyID` and real exports reorder or malform them.
//! Missing optional fields fall back to defaults; only an unreadable document
//! or a missing invoice root is an error.

use std::sync::LazyLock;

use chrono::{NaiveDate, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::invoice::{
    Client, DEFAULT_COUNTRY, DEFAULT_CURRENCY, DEFAULT_STATUS, DEFAULT_UNIT, Invoice, LineItem,
    default_vat_rate,
};
use crate::numeric::{parse_amount, parse_optional_amount};
use crate::supplier::SupplierIdentity;
use crate::validation::{self, ValidationReport};
use crate::xml_tree::{XmlElement, XmlTreeError, parse_document};

/// Accepted root element names.
pub const INVOICE_ROOTS: [&str; 3] = ["Invoice", "invoice", "factura"];

pub const UNKNOWN_INVOICE_ID: &str = "UNKNOWN";
pub const UNKNOWN_CLIENT_NAME: &str = "Unknown";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The text could not be read as XML.
    #[error("invalid xml: {0}")]
    Xml(String),

    /// The document has no `Invoice`/`invoice`/`factura` root.
    #[error("no invoice root element found (found: {0})")]
    MissingRoot(String),
}

static SERIES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]+").expect("static regex"));
static TRAILING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)$").expect("static regex"));

static ELECTRONIC_MAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(?:[\w.-]+:)?ElectronicMail(?:\s[^>]*)?>\s*([^<]*?)\s*</").expect("static regex")
});

static COMPANY_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(?:[\w.-]+:)?CompanyID(?:\s[^>]*)?>\s*(?:<!--.*?-->\s*)?([^<]*?)\s*</")
        .expect("static regex")
});

static CUSTOMER_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(?:[\w.-]+:)?AccountingCustomerParty\b.*?</(?:[\w.-]+:)?AccountingCustomerParty>")
        .expect("static regex")
});

// BT-47 is the EN 16931 "buyer legal registration identifier".
static BT47_BEFORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*BT-47\s*-->\s*<(?:[\w.-]+:)?CompanyID(?:\s[^>]*)?>\s*([^<]*?)\s*</")
        .expect("static regex")
});
static BT47_INSIDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(?:[\w.-]+:)?CompanyID(?:\s[^>]*)?>\s*<!--\s*BT-47\s*-->\s*([^<]*?)\s*</")
        .expect("static regex")
});

/// Parses supplier XML invoices into [`Invoice`] values.
#[derive(Debug, Clone, Default)]
pub struct XmlInvoiceParser {
    supplier: SupplierIdentity,
}

impl XmlInvoiceParser {
    pub fn new(supplier: SupplierIdentity) -> Self {
        Self { supplier }
    }

    /// Cheap structural check, see [`validation::validate`].
    pub fn validate(&self, xml: &str) -> ValidationReport {
        validation::validate(xml)
    }

    pub fn parse(&self, xml: &str) -> Result<Invoice, ParseError> {
        let root = parse_document(xml).map_err(|e| match e {
            XmlTreeError::Empty => ParseError::MissingRoot("no elements".to_string()),
            XmlTreeError::Malformed(msg) => ParseError::Xml(msg),
        })?;

        if !INVOICE_ROOTS.iter().any(|r| *r == root.local_name()) {
            return Err(ParseError::MissingRoot(format!("<{}>", root.name)));
        }

        let id = root
            .text_at(&["ID"])
            .unwrap_or(UNKNOWN_INVOICE_ID)
            .to_string();
        let (series, number) = split_invoice_id(&id);

        let date = root
            .text_at(&["IssueDate"])
            .and_then(parse_date)
            .unwrap_or_else(|| Utc::now().date_naive());
        let due_date = root.text_at(&["DueDate"]).and_then(parse_date).unwrap_or(date);

        let total = amount_at(&root, &["LegalMonetaryTotal", "PayableAmount"]);
        let vat_total = amount_at(&root, &["TaxTotal", "TaxAmount"]);
        let currency = root
            .text_at(&["DocumentCurrencyCode"])
            .unwrap_or(DEFAULT_CURRENCY)
            .to_string();

        let client = self.extract_client(&root, xml);
        let items: Vec<LineItem> = root
            .children_named("InvoiceLine")
            .enumerate()
            .map(|(idx, line)| extract_item(idx + 1, line))
            .collect();

        debug!(
            invoice_id = %id,
            client = %client.name,
            item_count = items.len(),
            "parsed xml invoice"
        );

        Ok(Invoice {
            id,
            series,
            number,
            date,
            due_date: Some(due_date),
            status: DEFAULT_STATUS.to_string(),
            total,
            vat_total,
            currency,
            client,
            items,
        })
    }

    fn extract_client(&self, root: &XmlElement, xml: &str) -> Client {
        let party = root.find(&["AccountingCustomerParty", "Party"]);
        let text = |path: &[&str]| party.and_then(|p| p.text_at(path)).map(str::to_string);

        let name = text(&["PartyLegalEntity", "RegistrationName"])
            .or_else(|| text(&["PartyName", "Name"]))
            .unwrap_or_else(|| UNKNOWN_CLIENT_NAME.to_string());

        let structured_email = text(&["Contact", "ElectronicMail"]);
        let country = text(&["PostalAddress", "Country", "Name"])
            .or_else(|| {
                text(&["PostalAddress", "Country", "IdentificationCode"]).map(|code| country_name(&code))
            })
            .unwrap_or_else(|| DEFAULT_COUNTRY.to_string());

        Client {
            name,
            email: self.client_email(xml, structured_email),
            phone: text(&["Contact", "Telephone"]),
            vat_code: self.client_vat_code(xml, party),
            address: text(&["PostalAddress", "StreetName"]),
            city: text(&["PostalAddress", "CityName"]),
            country,
        }
    }

    /// First `ElectronicMail` in the document that is not the supplier's.
    fn client_email(&self, xml: &str, structured: Option<String>) -> Option<String> {
        ELECTRONIC_MAIL
            .captures_iter(xml)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim())
            .find(|e| !e.is_empty() && !self.supplier.is_supplier_email(e))
            .map(str::to_string)
            .or_else(|| structured.filter(|e| !self.supplier.is_supplier_email(e)))
    }

    fn client_vat_code(&self, xml: &str, party: Option<&XmlElement>) -> Option<String> {
        if let Some(marked) = self.marked_client_vat(xml) {
            return Some(marked);
        }

        let mut candidates: Vec<String> = Vec::new();
        for cap in COMPANY_ID.captures_iter(xml) {
            let Some(m) = cap.get(1) else { continue };
            let value = m.as_str().trim();
            if value.is_empty() || self.supplier.is_supplier_vat(value) {
                continue;
            }
            if !candidates.iter().any(|c| c == value) {
                candidates.push(value.to_string());
            }
        }

        if let Some(numeric) = candidates
            .iter()
            .find(|c| c.chars().all(|ch| ch.is_ascii_digit()))
        {
            return Some(numeric.clone());
        }
        if let Some(prefixed) = candidates
            .iter()
            .find(|c| c.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("RO")))
        {
            return Some(prefixed.clone());
        }
        if let Some(own) = party
            .and_then(|p| p.text_at(&["PartyTaxScheme", "CompanyID"]))
            .filter(|c| !self.supplier.is_supplier_vat(c))
        {
            return Some(own.to_string());
        }
        candidates.into_iter().next()
    }

    /// `CompanyID` tagged with a BT-47 comment inside the customer block.
    fn marked_client_vat(&self, xml: &str) -> Option<String> {
        let block = CUSTOMER_BLOCK.find(xml)?.as_str();
        BT47_BEFORE
            .captures(block)
            .or_else(|| BT47_INSIDE.captures(block))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim())
            .filter(|v| !v.is_empty() && !self.supplier.is_supplier_vat(v))
            .map(str::to_string)
    }
}

/// Split `CA0766` into series `CA` and number `0766`; each falls back to the raw id.
pub fn split_invoice_id(id: &str) -> (String, String) {
    let series = SERIES
        .find(id)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| id.to_string());
    let number = TRAILING_NUMBER
        .captures(id)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| id.to_string());
    (series, number)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn amount_at(node: &XmlElement, path: &[&str]) -> Decimal {
    node.text_at(path).map(parse_amount).unwrap_or(Decimal::ZERO)
}

fn country_name(code: &str) -> String {
    if code.eq_ignore_ascii_case("RO") {
        DEFAULT_COUNTRY.to_string()
    } else {
        code.to_string()
    }
}

fn extract_item(position: usize, line: &XmlElement) -> LineItem {
    let item = line.child("Item");
    let name = item.and_then(|i| i.text_at(&["Name"]));
    let description = item.and_then(|i| i.text_at(&["Description"]));
    let (name, description) = match (name, description) {
        (Some(n), Some(d)) => (n.to_string(), d.to_string()),
        (Some(n), None) => (n.to_string(), n.to_string()),
        (None, Some(d)) => (d.to_string(), d.to_string()),
        (None, None) => {
            let fallback = format!("Item {position}");
            (fallback.clone(), fallback)
        }
    };

    let quantity_node = line.child("InvoicedQuantity");
    let quantity = quantity_node
        .and_then(XmlElement::trimmed_text)
        .map(parse_amount)
        .unwrap_or(Decimal::ZERO);
    let unit = quantity_node
        .and_then(|q| q.attribute("unitCode"))
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or(DEFAULT_UNIT)
        .to_string();

    let vat_rate = line
        .text_at(&["TaxTotal", "TaxSubtotal", "TaxCategory", "Percent"])
        .or_else(|| item.and_then(|i| i.text_at(&["ClassifiedTaxCategory", "Percent"])))
        .and_then(parse_optional_amount)
        .unwrap_or_else(default_vat_rate);

    LineItem {
        name,
        description: Some(description),
        quantity,
        unit,
        price: amount_at(line, &["Price", "PriceAmount"]),
        total: amount_at(line, &["LineExtensionAmount"]),
        vat_rate,
    }
}
