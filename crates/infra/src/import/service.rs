//! Invoice import orchestration.
//!
//! ```text
//! xml / edited invoice
//!   ↓
//! 1. Source selection (edited invoice wins, raw XML always kept)
//!   ↓
//! 2. Idempotency check on smartbill_id
//!   ↓
//! 3+4. User and company resolution (concurrent, read-mostly)
//!   ↓
//! 5. Relationship assurance
//!   ↓
//! 6-10. Build one ImportBatch and commit it as a unit
//! ```
//!
//! Failures never escape as `Err`: they are folded into [`ImportResult`].

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{Span, error, field, info, instrument, warn};

use aeroclub_core::{CompanyId, FlightHoursId, InvoiceItemId, InvoiceRecordId, UserId};
use aeroclub_invoicing::{Invoice, XmlInvoiceParser, get_ppl_info};

use crate::gateway::{
    FlightHoursRow, GatewayError, ImportBatch, InvoiceClientRow, InvoiceGateway, InvoiceItemRow,
    InvoiceRow,
};

use super::company::resolve_company;
use super::result::{ImportFailure, ImportResult, SkipReason, SkippedLine};

/// One import request: the raw XML plus an optional user-edited invoice.
///
/// The edit stays raw JSON until the import runs, so a malformed one fails
/// only its own document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDocument {
    #[serde(default)]
    pub xml_content: String,
    #[serde(default)]
    pub edited_invoice: Option<serde_json::Value>,
}

impl ImportDocument {
    /// Decode one request body; anything that is not a document object
    /// becomes a failed result for that document alone.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ImportResult> {
        serde_json::from_value(value).map_err(|e| ImportResult::unreadable_request(e.to_string()))
    }
}

pub struct InvoiceImportService<G> {
    gateway: G,
    parser: XmlInvoiceParser,
}

impl<G> InvoiceImportService<G>
where
    G: InvoiceGateway,
{
    pub fn new(gateway: G, parser: XmlInvoiceParser) -> Self {
        Self { gateway, parser }
    }

    pub fn parser(&self) -> &XmlInvoiceParser {
        &self.parser
    }

    /// Import one supplier invoice.
    ///
    /// `edited` is the user-reviewed version of the same document; when given
    /// it is what gets persisted, while `xml_content` is still stored verbatim
    /// as the original.
    #[instrument(
        skip_all,
        fields(edited = edited.is_some(), smartbill_id = field::Empty)
    )]
    pub async fn import_invoice(&self, xml_content: &str, edited: Option<Invoice>) -> ImportResult {
        let (invoice, xml_snapshot) = match self.select_source(xml_content, edited) {
            Ok(selected) => selected,
            Err(result) => return result,
        };
        Span::current().record("smartbill_id", invoice.id.as_str());

        match self.gateway.find_invoice_by_smartbill_id(&invoice.id).await {
            Ok(Some(_)) => {
                info!("invoice already imported");
                return ImportResult::duplicate(&invoice.id);
            }
            Ok(None) => {}
            Err(e) => {
                error!(error = %e, "existence check failed");
                return ImportResult::failed(
                    ImportFailure::Persistence,
                    format!("Failed to import invoice {}", invoice.id),
                    vec![e.to_string()],
                );
            }
        }

        let (user_id, company_id) = tokio::join!(
            self.resolve_user(&invoice),
            resolve_company(&self.gateway, &invoice.client)
        );

        if let (Some(user_id), Some(company_id)) = (user_id, company_id) {
            if let Err(e) = self
                .gateway
                .ensure_user_company_relationship(user_id, company_id)
                .await
            {
                warn!(%user_id, %company_id, error = %e, "relationship assurance failed");
            }
        }

        let ppl = get_ppl_info(&invoice.items);
        let ppl_hours_paid = ppl.is_ppl.then_some(ppl.hours_paid);
        let (batch, skipped) = build_batch(
            &invoice,
            xml_content,
            xml_snapshot,
            user_id,
            company_id,
            ppl_hours_paid,
        );
        let invoice_id = batch.invoice.id;
        let flight_hours_id = batch.flight_hours.first().map(|f| f.id);
        let flight_rows = batch.flight_hours.len();

        match self.gateway.commit_import(batch).await {
            Ok(()) => {}
            Err(GatewayError::Duplicate(msg)) => {
                // Lost a race with a concurrent import of the same invoice.
                info!(reason = %msg, "invoice already imported");
                return ImportResult::duplicate(&invoice.id);
            }
            Err(e) => {
                error!(error = %e, "commit failed");
                return ImportResult::failed(
                    ImportFailure::Persistence,
                    format!("Failed to import invoice {}", invoice.id),
                    vec![e.to_string()],
                );
            }
        }

        info!(
            %invoice_id,
            user_id = ?user_id,
            company_id = ?company_id,
            flight_rows,
            is_ppl = ppl.is_ppl,
            "invoice imported"
        );

        ImportResult {
            success: true,
            invoice_id: Some(invoice_id),
            user_id,
            company_id,
            flight_hours_id,
            is_ppl: Some(ppl.is_ppl),
            ppl_hours_paid,
            message: format!("Invoice {} imported successfully", invoice.id),
            errors: Vec::new(),
            skipped,
            failure: None,
        }
    }

    /// Import one request document, decoding its edited invoice first.
    pub async fn import_document(&self, doc: ImportDocument) -> ImportResult {
        let edited = match doc
            .edited_invoice
            .map(serde_json::from_value::<Invoice>)
            .transpose()
        {
            Ok(edited) => edited,
            Err(e) => {
                warn!(error = %e, "edited invoice could not be decoded");
                return ImportResult::failed(
                    ImportFailure::Validation,
                    "Edited invoice could not be read".to_string(),
                    vec![e.to_string()],
                );
            }
        };
        self.import_invoice(&doc.xml_content, edited).await
    }

    /// Import documents one after another, in input order.
    ///
    /// Each document gets its own `per_document` deadline; one that misses it
    /// is reported as timed out and the batch moves on.
    pub async fn import_batch(
        &self,
        documents: Vec<serde_json::Value>,
        per_document: Duration,
    ) -> Vec<ImportResult> {
        let mut results = Vec::with_capacity(documents.len());
        for (position, raw) in documents.into_iter().enumerate() {
            let doc = match ImportDocument::from_json(raw) {
                Ok(doc) => doc,
                Err(rejected) => {
                    warn!(position, "batch entry is not an import document");
                    results.push(rejected);
                    continue;
                }
            };
            let result = match tokio::time::timeout(per_document, self.import_document(doc)).await {
                Ok(result) => result,
                Err(_) => {
                    error!(position, timeout = ?per_document, "batch document import timed out");
                    ImportResult::timed_out(per_document)
                }
            };
            results.push(result);
        }
        results
    }

    fn select_source(
        &self,
        xml_content: &str,
        edited: Option<Invoice>,
    ) -> Result<(Invoice, String), ImportResult> {
        match edited {
            Some(invoice) => {
                if let Err(e) = invoice.check_importable() {
                    warn!(error = %e, "edited invoice rejected");
                    return Err(ImportResult::failed(
                        ImportFailure::Validation,
                        "Edited invoice is not importable".to_string(),
                        vec![e.to_string()],
                    ));
                }
                let snapshot = serde_json::to_string(&invoice).map_err(|e| {
                    ImportResult::failed(
                        ImportFailure::Validation,
                        "Edited invoice could not be serialized".to_string(),
                        vec![e.to_string()],
                    )
                })?;
                Ok((invoice, snapshot))
            }
            None => {
                let invoice = self.parser.parse(xml_content).map_err(|e| {
                    warn!(error = %e, "xml invoice rejected");
                    ImportResult::failed(
                        ImportFailure::Parse,
                        "Failed to parse invoice XML".to_string(),
                        vec![e.to_string()],
                    )
                })?;
                // Parsed invoices obey the same rules as edits.
                if let Err(e) = invoice.check_importable() {
                    warn!(error = %e, "parsed invoice rejected");
                    return Err(ImportResult::failed(
                        ImportFailure::Validation,
                        "Invoice XML is not importable".to_string(),
                        vec![e.to_string()],
                    ));
                }
                Ok((invoice, xml_content.to_string()))
            }
        }
    }

    async fn resolve_user(&self, invoice: &Invoice) -> Option<UserId> {
        let email = invoice.client.normalized_email()?;
        match self.gateway.find_user_by_email(&email).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "user lookup failed");
                None
            }
        }
    }
}

fn build_batch(
    invoice: &Invoice,
    original_xml: &str,
    xml_snapshot: String,
    user_id: Option<UserId>,
    company_id: Option<CompanyId>,
    ppl_hours_paid: Option<u32>,
) -> (ImportBatch, Vec<SkippedLine>) {
    let invoice_id = InvoiceRecordId::new();
    let client = &invoice.client;

    let invoice_row = InvoiceRow {
        id: invoice_id,
        smartbill_id: invoice.id.clone(),
        series: invoice.series.clone(),
        number: invoice.numeric_number(),
        issue_date: invoice.date,
        due_date: invoice.effective_due_date(),
        status: invoice.status.clone(),
        total_amount: invoice.total,
        vat_amount: invoice.vat_total,
        currency: invoice.currency.clone(),
        is_ppl: false,
        ppl_hours_paid: None,
        xml_content: xml_snapshot,
        original_xml_content: original_xml.to_string(),
    };

    let client_row = InvoiceClientRow {
        invoice_id,
        name: client.name.clone(),
        email: client.email.clone(),
        phone: client.phone.clone(),
        vat_code: client.vat_code.clone(),
        address: client.address.clone(),
        city: client.city.clone(),
        country: client.country.clone(),
        user_id,
        company_id,
    };

    let mut items = Vec::with_capacity(invoice.items.len());
    let mut flight_hours = Vec::new();
    let mut skipped = Vec::new();

    for (idx, item) in invoice.items.iter().enumerate() {
        let line_id = idx as u32 + 1;
        let item_row = InvoiceItemRow {
            id: InvoiceItemId::new(),
            invoice_id,
            line_id,
            name: item.name.clone(),
            description: item.description.clone(),
            quantity: item.quantity,
            unit: item.unit.clone(),
            unit_price: item.price,
            total_amount: item.total,
            vat_rate: item.vat_rate,
        };

        let credit_to = if !item.is_hour_unit() {
            Err(SkipReason::NonHourUnit)
        } else {
            user_id.ok_or(SkipReason::NoUser)
        };

        match credit_to {
            Ok(user_id) => {
                let (hours_regular, hours_promotional) = if item.is_promotional() {
                    (Decimal::ZERO, item.quantity)
                } else {
                    (item.quantity, Decimal::ZERO)
                };
                flight_hours.push(FlightHoursRow {
                    id: FlightHoursId::new(),
                    invoice_id,
                    user_id,
                    company_id,
                    invoice_item_id: item_row.id,
                    flight_date: invoice.date,
                    hours_regular,
                    hours_promotional,
                    total_hours: item.quantity,
                    rate_per_hour: item.price,
                    total_amount: item.total,
                    notes: Some(item.name.clone()),
                });
            }
            Err(reason) => {
                info!(line_id, skip_reason = reason.as_str(), "line not credited as flight hours");
                skipped.push(SkippedLine { line_id, reason });
            }
        }

        items.push(item_row);
    }

    let batch = ImportBatch {
        invoice: invoice_row,
        client: client_row,
        items,
        flight_hours,
        ppl_hours_paid,
    };
    (batch, skipped)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use aeroclub_invoicing::{Client, LineItem, SupplierIdentity};

    use super::*;
    use crate::gateway::InMemoryInvoiceGateway;

    const SAMPLE: &str = include_str!("../../../invoicing/fixtures/ca0766.xml");

    fn service() -> (Arc<InMemoryInvoiceGateway>, InvoiceImportService<Arc<InMemoryInvoiceGateway>>) {
        let gw = Arc::new(InMemoryInvoiceGateway::new());
        let parser = XmlInvoiceParser::new(SupplierIdentity::new(
            Some("RO16522210".to_string()),
            Some("office@aeroclub-iasi.ro".to_string()),
        ));
        (gw.clone(), InvoiceImportService::new(gw, parser))
    }

    fn line(name: &str, unit: &str, quantity: Decimal, price: Decimal) -> LineItem {
        LineItem {
            name: name.to_string(),
            description: None,
            quantity,
            unit: unit.to_string(),
            price,
            total: quantity * price,
            vat_rate: dec!(19),
        }
    }

    fn edited(id: &str, client: Client, items: Vec<LineItem>) -> Invoice {
        Invoice {
            id: id.to_string(),
            series: "FZ".to_string(),
            number: id.trim_start_matches("FZ").to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            due_date: None,
            status: "imported".to_string(),
            total: items.iter().map(|i| i.total).sum(),
            vat_total: dec!(0),
            currency: "RON".to_string(),
            client,
            items,
        }
    }

    fn with_email(name: &str, email: &str) -> Client {
        let mut c = Client::named(name);
        c.email = Some(email.to_string());
        c
    }

    #[tokio::test]
    async fn sample_import_credits_regular_and_promotional_hours() {
        let (gw, svc) = service();
        let user = gw.add_user("s.avadanei@yahoo.com", "Ștefan", "Avădănei");

        let result = svc.import_invoice(SAMPLE, None).await;

        assert!(result.success, "{result:?}");
        assert_eq!(result.user_id, Some(user));
        assert_eq!(result.company_id, None);
        assert_eq!(result.is_ppl, Some(false));
        assert_eq!(result.message, "Invoice CA0766 imported successfully");

        let invoice = &gw.invoices()[0];
        assert_eq!(invoice.smartbill_id, "CA0766");
        assert_eq!(invoice.series, "CA");
        assert_eq!(invoice.number, "0766");
        assert_eq!(invoice.total_amount, dec!(19285.50));
        assert_eq!(invoice.vat_amount, dec!(3079.20));
        assert_eq!(invoice.xml_content, SAMPLE);
        assert_eq!(invoice.original_xml_content, SAMPLE);

        let hours = gw.flight_hours();
        assert_eq!(hours.len(), 2);
        assert_eq!(hours[0].hours_regular, dec!(25));
        assert_eq!(hours[0].hours_promotional, dec!(0));
        assert_eq!(hours[0].rate_per_hour, dec!(648.25));
        assert_eq!(hours[1].hours_regular, dec!(0));
        assert_eq!(hours[1].hours_promotional, dec!(5));
        assert_eq!(result.flight_hours_id, Some(hours[0].id));
        assert_eq!(hours[0].invoice_item_id, gw.items()[0].id);
        assert_eq!(hours[0].flight_date, NaiveDate::from_ymd_opt(2024, 5, 14).unwrap());
    }

    #[tokio::test]
    async fn personal_code_client_gets_no_company() {
        let (gw, svc) = service();
        let result = svc.import_invoice(SAMPLE, None).await;

        assert!(result.success);
        assert_eq!(result.company_id, None);
        assert!(gw.companies().is_empty());
        assert_eq!(gw.clients()[0].vat_code.as_deref(), Some("1900101226701"));
    }

    #[tokio::test]
    async fn second_import_is_a_no_op() {
        let (gw, svc) = service();
        assert!(svc.import_invoice(SAMPLE, None).await.success);
        let rows = gw.total_rows();

        let again = svc.import_invoice(SAMPLE, None).await;
        assert!(!again.success);
        assert_eq!(again.failure, Some(ImportFailure::Duplicate));
        assert_eq!(again.message, "Invoice CA0766 already exists");
        assert_eq!(gw.total_rows(), rows);
    }

    #[tokio::test]
    async fn hour_lines_without_user_are_skipped_not_failed() {
        let (gw, svc) = service();
        let result = svc.import_invoice(SAMPLE, None).await;

        assert!(result.success);
        assert!(result.errors.is_empty());
        assert!(gw.flight_hours().is_empty());
        assert_eq!(gw.items().len(), 2);
        assert_eq!(result.flight_hours_id, None);
        assert_eq!(
            result.skipped,
            vec![
                SkippedLine { line_id: 1, reason: SkipReason::NoUser },
                SkippedLine { line_id: 2, reason: SkipReason::NoUser },
            ]
        );
    }

    #[tokio::test]
    async fn line_ids_follow_invoice_order_and_only_hour_units_are_credited() {
        let (gw, svc) = service();
        gw.add_user("pilot@mail.ro", "Ana", "Pop");
        let invoice = edited(
            "FZ100",
            with_email("Ana Pop", " Pilot@Mail.ro "),
            vec![
                line("Taxa aterizare", "BUC", dec!(1), dec!(50)),
                line("Ore zbor", "hur", dec!(2), dec!(600)),
                line("Ore zbor PROMO", "H", dec!(1), dec!(600)),
            ],
        );

        let result = svc.import_invoice("<Invoice/>", Some(invoice)).await;
        assert!(result.success, "{result:?}");

        let items = gw.items();
        assert_eq!(items.iter().map(|i| i.line_id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(items[0].name, "Taxa aterizare");

        let hours = gw.flight_hours();
        assert_eq!(hours.len(), 2);
        assert_eq!(hours[0].invoice_item_id, items[1].id);
        assert_eq!(hours[0].hours_regular, dec!(2));
        assert_eq!(hours[1].hours_promotional, dec!(1));
        assert_eq!(
            result.skipped,
            vec![SkippedLine { line_id: 1, reason: SkipReason::NonHourUnit }]
        );
    }

    #[tokio::test]
    async fn edited_invoice_is_persisted_and_raw_xml_kept() {
        let (gw, svc) = service();
        let invoice = edited("FZ7", Client::named("Firma SRL"), vec![]);

        let result = svc.import_invoice(SAMPLE, Some(invoice.clone())).await;
        assert!(result.success, "{result:?}");

        let stored = &gw.invoices()[0];
        assert_eq!(stored.smartbill_id, "FZ7");
        assert_eq!(stored.original_xml_content, SAMPLE);
        let snapshot: Invoice = serde_json::from_str(&stored.xml_content).unwrap();
        assert_eq!(snapshot, invoice);
        assert_eq!(stored.due_date, invoice.date);
    }

    #[tokio::test]
    async fn invalid_edited_invoice_writes_nothing() {
        let (gw, svc) = service();
        let invoice = edited(
            "FZ8",
            Client::named("Firma SRL"),
            vec![line("Ore zbor", "HUR", dec!(-1), dec!(600))],
        );

        let result = svc.import_invoice(SAMPLE, Some(invoice)).await;
        assert!(!result.success);
        assert_eq!(result.failure, Some(ImportFailure::Validation));
        assert_eq!(gw.total_rows(), 0);
    }

    #[tokio::test]
    async fn unparseable_xml_reports_parse_failure() {
        let (gw, svc) = service();
        let result = svc.import_invoice("<Invoice><cbc:ID>", None).await;

        assert!(!result.success);
        assert_eq!(result.failure, Some(ImportFailure::Parse));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(gw.total_rows(), 0);
    }

    #[tokio::test]
    async fn ppl_invoice_is_tagged() {
        let (gw, svc) = service();
        let invoice = edited(
            "FZ9",
            Client::named("Ion Pop"),
            vec![line("Curs PPL(A) - transa 1", "BUC", dec!(1), dec!(5000))],
        );

        let result = svc.import_invoice("<Invoice/>", Some(invoice)).await;
        assert_eq!(result.is_ppl, Some(true));
        assert_eq!(result.ppl_hours_paid, Some(20));

        let stored = &gw.invoices()[0];
        assert!(stored.is_ppl);
        assert_eq!(stored.ppl_hours_paid, Some(20));
    }

    #[tokio::test]
    async fn commit_failure_leaves_no_partial_rows() {
        let (gw, svc) = service();
        gw.fail_commits(true);

        let result = svc.import_invoice(SAMPLE, None).await;
        assert!(!result.success);
        assert_eq!(result.failure, Some(ImportFailure::Persistence));
        assert_eq!(result.errors, vec!["storage error: commit failure injected".to_string()]);
        assert!(gw.invoices().is_empty());
        assert!(gw.clients().is_empty());
        assert!(gw.items().is_empty());
    }

    #[tokio::test]
    async fn failed_existence_check_aborts() {
        let (gw, svc) = service();
        gw.fail_lookups(true);

        let result = svc.import_invoice(SAMPLE, None).await;
        assert_eq!(result.failure, Some(ImportFailure::Persistence));
        assert_eq!(gw.total_rows(), 0);
    }

    #[tokio::test]
    async fn company_is_created_and_linked_once() {
        let (gw, svc) = service();
        let user = gw.add_user("office@firma.ro", "Ana", "Pop");
        let mut client = with_email("Firma SRL", "office@firma.ro");
        client.vat_code = Some("RO44556677".to_string());

        let first = svc
            .import_invoice("<Invoice/>", Some(edited("FZ10", client.clone(), vec![])))
            .await;
        let second = svc
            .import_invoice("<Invoice/>", Some(edited("FZ11", client, vec![])))
            .await;

        assert!(first.success && second.success);
        assert_eq!(first.user_id, Some(user));
        assert!(first.company_id.is_some());
        assert_eq!(first.company_id, second.company_id);
        assert_eq!(gw.companies().len(), 1);
        assert_eq!(gw.relationships().len(), 1);
        assert_eq!(gw.clients()[1].company_id, first.company_id);
    }

    #[tokio::test]
    async fn negative_quantity_in_xml_is_rejected_before_any_write() {
        let (gw, svc) = service();
        gw.add_user("s.avadanei@yahoo.com", "Ștefan", "Avădănei");
        let xml = SAMPLE.replacen(
            r#"<cbc:InvoicedQuantity unitCode="HUR">25</cbc:InvoicedQuantity>"#,
            r#"<cbc:InvoicedQuantity unitCode="HUR">-2</cbc:InvoicedQuantity>"#,
            1,
        );
        assert_ne!(xml, SAMPLE);

        let result = svc.import_invoice(&xml, None).await;
        assert!(!result.success);
        assert_eq!(result.failure, Some(ImportFailure::Validation));
        assert_eq!(result.errors, vec!["validation failed: line 1 has a negative quantity".to_string()]);
        assert!(gw.flight_hours().is_empty());
        assert_eq!(gw.total_rows(), 0);
    }

    #[tokio::test]
    async fn undecodable_edit_fails_as_validation() {
        let (gw, svc) = service();
        let doc = ImportDocument {
            xml_content: SAMPLE.to_string(),
            edited_invoice: Some(serde_json::json!({
                "id": "CA0767",
                "number": "0767",
                "date": "2024-05-20",
                "client": { "name": "Ion Pop" }
            })),
        };

        let result = svc.import_document(doc).await;
        assert_eq!(result.failure, Some(ImportFailure::Validation));
        assert_eq!(result.message, "Edited invoice could not be read");
        assert!(result.errors[0].contains("series"), "{:?}", result.errors);
        assert_eq!(gw.total_rows(), 0);
    }

    #[tokio::test]
    async fn null_edit_falls_back_to_xml() {
        let (gw, svc) = service();
        let doc = ImportDocument::from_json(serde_json::json!({
            "xmlContent": SAMPLE,
            "editedInvoice": null
        }))
        .unwrap();

        assert_eq!(doc.edited_invoice, None);
        assert!(svc.import_document(doc).await.success);
        assert_eq!(gw.invoices()[0].smartbill_id, "CA0766");
    }

    #[tokio::test]
    async fn batch_imports_in_order_and_dedups_within_batch() {
        let (gw, svc) = service();
        let doc = || serde_json::json!({ "xmlContent": SAMPLE });

        let results = svc.import_batch(vec![doc(), doc()], Duration::from_secs(5)).await;
        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert_eq!(results[1].failure, Some(ImportFailure::Duplicate));
        assert_eq!(gw.invoices().len(), 1);
    }

    #[tokio::test]
    async fn bad_batch_entries_fail_alone() {
        let (gw, svc) = service();
        let documents = vec![
            serde_json::json!({ "xmlContent": SAMPLE }),
            serde_json::json!({
                "xmlContent": SAMPLE,
                "editedInvoice": { "id": "CA0767", "series": "CA", "number": "0767", "date": "", "client": { "name": "Ion Pop" } }
            }),
            serde_json::json!(["not", "a", "document"]),
        ];

        let results = svc.import_batch(documents, Duration::from_secs(5)).await;
        assert_eq!(results.len(), 3);
        assert!(results[0].success, "{:?}", results[0]);
        assert_eq!(results[1].failure, Some(ImportFailure::Validation));
        assert_eq!(results[2].failure, Some(ImportFailure::Validation));
        assert_eq!(results[2].message, "Import request could not be read");
        assert_eq!(gw.invoices().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_imports_of_same_invoice_persist_once() {
        let (gw, svc) = service();
        let svc = Arc::new(svc);

        let a = tokio::spawn({
            let svc = svc.clone();
            async move { svc.import_invoice(SAMPLE, None).await }
        });
        let b = tokio::spawn({
            let svc = svc.clone();
            async move { svc.import_invoice(SAMPLE, None).await }
        });
        let results = [a.await.unwrap(), b.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.success).count(), 1);
        assert_eq!(gw.invoices().len(), 1);
        assert_eq!(gw.clients().len(), 1);
    }
}
