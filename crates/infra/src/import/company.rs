//! Company resolution policy.
//!
//! Conservative: failing to link a real company is preferred over
//! fabricating one from an individual's invoice. A company is only created
//! when every check below passes.

use tracing::{info, warn};

use aeroclub_core::CompanyId;
use aeroclub_invoicing::Client;

use crate::gateway::{CompanyRow, InvoiceGateway};

pub const COMPANY_STATUS_ACTIVE: &str = "Active";

/// Find or (rarely) create the company an invoice client belongs to.
///
/// 1. exact VAT code match
/// 2. exact name match
/// 3. create, only with a VAT code that is not a 13-char personal code and
///    a name that is not an existing user's full name
///
/// Lookup failures degrade to "not found"; a failed create yields no company.
pub async fn resolve_company<G>(gateway: &G, client: &Client) -> Option<CompanyId>
where
    G: InvoiceGateway + ?Sized,
{
    let vat_code = client.vat_code();

    if let Some(code) = vat_code {
        match gateway.find_company_by_vat_code(code).await {
            Ok(Some(id)) => return Some(id),
            Ok(None) => {}
            Err(e) => warn!(vat_code = code, error = %e, "company lookup by vat code failed"),
        }
    }

    match gateway.find_company_by_name(&client.name).await {
        Ok(Some(id)) => return Some(id),
        Ok(None) => {}
        Err(e) => warn!(client = %client.name, error = %e, "company lookup by name failed"),
    }

    let Some(code) = vat_code else {
        info!(client = %client.name, "no vat code; treating client as an individual");
        return None;
    };

    if client.is_personal_code() {
        info!(client = %client.name, "personal fiscal code; not creating a company");
        return None;
    }

    match gateway.find_user_by_full_name(&client.name).await {
        Ok(Some(user)) => {
            info!(client = %client.name, user_id = %user.id, "client name matches a user; not creating a company");
            return None;
        }
        Ok(None) => {}
        Err(e) => {
            warn!(client = %client.name, error = %e, "user name lookup failed; not creating a company");
            return None;
        }
    }

    let row = CompanyRow {
        id: CompanyId::new(),
        name: client.name.clone(),
        vat_code: Some(code.to_string()),
        email: client.email.clone(),
        phone: client.phone.clone(),
        address: client.address.clone(),
        city: client.city.clone(),
        country: client.country.clone(),
        status: COMPANY_STATUS_ACTIVE.to_string(),
    };

    match gateway.create_company(row).await {
        Ok(id) => {
            info!(company_id = %id, client = %client.name, "company created");
            Some(id)
        }
        Err(e) => {
            warn!(client = %client.name, error = %e, "company creation failed");
            None
        }
    }
}
