use std::sync::Arc;

use thiserror::Error;

use aeroclub_core::{CompanyId, InvoiceRecordId, RelationshipId, UserId};

use super::rows::{CompanyRow, ImportBatch, UserRow};

/// Gateway operation error.
///
/// These are **infrastructure errors** (storage, constraints) as opposed to
/// domain errors (validation).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// A unique constraint rejected the write (e.g. `invoices.smartbill_id`).
    #[error("duplicate record: {0}")]
    Duplicate(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Result of ensuring a user/company pairing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RelationshipOutcome {
    Created(RelationshipId),
    Existing(RelationshipId),
}

impl RelationshipOutcome {
    pub fn id(&self) -> RelationshipId {
        match self {
            RelationshipOutcome::Created(id) | RelationshipOutcome::Existing(id) => *id,
        }
    }
}

/// Lookup and persistence surface the invoice import depends on.
///
/// Lookups are read-only. The only writes outside [`commit_import`] are
/// company creation and relationship assurance, both of which happen while
/// identities are being resolved.
///
/// ## Implementation Requirements
///
/// - `find_user_by_email` matches exactly; callers pass a normalized email.
/// - `find_user_by_full_name` compares `first_name + " " + last_name`
///   case-insensitively.
/// - `ensure_user_company_relationship` is check-then-insert, guarded by a
///   unique `(user_id, company_id)` so concurrent imports never duplicate it.
/// - `commit_import` is all-or-nothing and must reject a second invoice with
///   the same `smartbill_id` with [`GatewayError::Duplicate`], even when two
///   imports race past the application-level existence check.
///
/// [`commit_import`]: InvoiceGateway::commit_import
#[async_trait::async_trait]
pub trait InvoiceGateway: Send + Sync {
    async fn find_invoice_by_smartbill_id(
        &self,
        smartbill_id: &str,
    ) -> Result<Option<InvoiceRecordId>, GatewayError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserId>, GatewayError>;

    async fn find_user_by_full_name(&self, name: &str) -> Result<Option<UserRow>, GatewayError>;

    async fn find_company_by_vat_code(&self, vat_code: &str)
    -> Result<Option<CompanyId>, GatewayError>;

    async fn find_company_by_name(&self, name: &str) -> Result<Option<CompanyId>, GatewayError>;

    async fn create_company(&self, company: CompanyRow) -> Result<CompanyId, GatewayError>;

    async fn ensure_user_company_relationship(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> Result<RelationshipOutcome, GatewayError>;

    /// Persist invoice, client, items and flight hours, then apply the PPL
    /// update, as one unit of work.
    async fn commit_import(&self, batch: ImportBatch) -> Result<(), GatewayError>;
}

#[async_trait::async_trait]
impl<G> InvoiceGateway for Arc<G>
where
    G: InvoiceGateway + ?Sized,
{
    async fn find_invoice_by_smartbill_id(
        &self,
        smartbill_id: &str,
    ) -> Result<Option<InvoiceRecordId>, GatewayError> {
        (**self).find_invoice_by_smartbill_id(smartbill_id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserId>, GatewayError> {
        (**self).find_user_by_email(email).await
    }

    async fn find_user_by_full_name(&self, name: &str) -> Result<Option<UserRow>, GatewayError> {
        (**self).find_user_by_full_name(name).await
    }

    async fn find_company_by_vat_code(
        &self,
        vat_code: &str,
    ) -> Result<Option<CompanyId>, GatewayError> {
        (**self).find_company_by_vat_code(vat_code).await
    }

    async fn find_company_by_name(&self, name: &str) -> Result<Option<CompanyId>, GatewayError> {
        (**self).find_company_by_name(name).await
    }

    async fn create_company(&self, company: CompanyRow) -> Result<CompanyId, GatewayError> {
        (**self).create_company(company).await
    }

    async fn ensure_user_company_relationship(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> Result<RelationshipOutcome, GatewayError> {
        (**self).ensure_user_company_relationship(user_id, company_id).await
    }

    async fn commit_import(&self, batch: ImportBatch) -> Result<(), GatewayError> {
        (**self).commit_import(batch).await
    }
}
