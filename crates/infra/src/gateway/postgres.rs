//! Postgres-backed invoice gateway.
//!
//! Schema: `crates/infra/migrations/0001_invoice_import.sql`.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | GatewayError | Scenario |
//! |------------|----------------------|--------------|----------|
//! | Database (unique violation) | `23505` | `Duplicate` | `smartbill_id` or `(user_id, company_id)` already present |
//! | Database (other) | Any other | `Storage` | FK/check violations, other database errors |
//! | RowNotFound | N/A | `NotFound` | Unexpected missing row |
//! | Other | N/A | `Storage` | Pool closed, network errors, etc. |
//!
//! ## Unit of work
//!
//! `commit_import` runs every insert plus the PPL update in one
//! `sqlx::Transaction`. Dropping the transaction on an early return rolls it
//! back, so a failure never leaves an invoice row without its client/items.

use std::sync::Arc;

use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use aeroclub_core::{CompanyId, InvoiceRecordId, RelationshipId, UserId};

use super::rows::{
    CompanyRow, FlightHoursRow, ImportBatch, InvoiceClientRow, InvoiceItemRow, InvoiceRow,
    UserCompanyRelationshipRow, UserRow,
};
use super::r#trait::{GatewayError, InvoiceGateway, RelationshipOutcome};

#[derive(Debug, Clone)]
pub struct PostgresInvoiceGateway {
    pool: Arc<PgPool>,
}

impl PostgresInvoiceGateway {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect lazily; the first query opens the connection.
    pub fn connect_lazy(database_url: &str) -> Result<Self, GatewayError> {
        let pool = PgPool::connect_lazy(database_url).map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    async fn find_id(
        &self,
        operation: &str,
        sql: &str,
        value: &str,
    ) -> Result<Option<Uuid>, GatewayError> {
        let row = sqlx::query(sql)
            .bind(value)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        row.map(|r| r.try_get::<Uuid, _>("id"))
            .transpose()
            .map_err(|e| map_sqlx_error(operation, e))
    }
}

#[async_trait::async_trait]
impl InvoiceGateway for PostgresInvoiceGateway {
    async fn find_invoice_by_smartbill_id(
        &self,
        smartbill_id: &str,
    ) -> Result<Option<InvoiceRecordId>, GatewayError> {
        let id = self
            .find_id(
                "find_invoice_by_smartbill_id",
                "SELECT id FROM invoices WHERE smartbill_id = $1 LIMIT 1",
                smartbill_id,
            )
            .await?;
        Ok(id.map(InvoiceRecordId::from_uuid))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserId>, GatewayError> {
        let id = self
            .find_id(
                "find_user_by_email",
                "SELECT id FROM users WHERE email = $1 LIMIT 1",
                email,
            )
            .await?;
        Ok(id.map(UserId::from_uuid))
    }

    async fn find_user_by_full_name(&self, name: &str) -> Result<Option<UserRow>, GatewayError> {
        let row = sqlx::query(
            r#"
            SELECT id, email, first_name, last_name
            FROM users
            WHERE lower(first_name || ' ' || last_name) = lower($1)
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_user_by_full_name", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let decode = |e| map_sqlx_error("find_user_by_full_name", e);
        Ok(Some(UserRow {
            id: UserId::from_uuid(row.try_get("id").map_err(decode)?),
            email: row.try_get("email").map_err(decode)?,
            first_name: row.try_get("first_name").map_err(decode)?,
            last_name: row.try_get("last_name").map_err(decode)?,
        }))
    }

    async fn find_company_by_vat_code(
        &self,
        vat_code: &str,
    ) -> Result<Option<CompanyId>, GatewayError> {
        let id = self
            .find_id(
                "find_company_by_vat_code",
                "SELECT id FROM companies WHERE vat_code = $1 LIMIT 1",
                vat_code,
            )
            .await?;
        Ok(id.map(CompanyId::from_uuid))
    }

    async fn find_company_by_name(&self, name: &str) -> Result<Option<CompanyId>, GatewayError> {
        let id = self
            .find_id(
                "find_company_by_name",
                "SELECT id FROM companies WHERE name = $1 LIMIT 1",
                name,
            )
            .await?;
        Ok(id.map(CompanyId::from_uuid))
    }

    #[instrument(skip(self, company), fields(company_id = %company.id), err)]
    async fn create_company(&self, company: CompanyRow) -> Result<CompanyId, GatewayError> {
        sqlx::query(
            r#"
            INSERT INTO companies (id, name, vat_code, email, phone, address, city, country, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(company.id.as_uuid())
        .bind(&company.name)
        .bind(&company.vat_code)
        .bind(&company.email)
        .bind(&company.phone)
        .bind(&company.address)
        .bind(&company.city)
        .bind(&company.country)
        .bind(&company.status)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_company", e))?;
        Ok(company.id)
    }

    #[instrument(skip(self), fields(user_id = %user_id, company_id = %company_id), err)]
    async fn ensure_user_company_relationship(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> Result<RelationshipOutcome, GatewayError> {
        let existing = find_relationship(&self.pool, user_id, company_id).await?;
        if let Some(id) = existing {
            return Ok(RelationshipOutcome::Existing(id));
        }

        let row = UserCompanyRelationshipRow::with_defaults(user_id, company_id);
        let inserted = sqlx::query(
            r#"
            INSERT INTO user_company_relationships (id, user_id, company_id, relationship_type, is_primary)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(row.id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(company_id.as_uuid())
        .bind(&row.relationship_type)
        .bind(row.is_primary)
        .execute(&*self.pool)
        .await;

        match inserted {
            Ok(_) => Ok(RelationshipOutcome::Created(row.id)),
            // A concurrent import inserted the pair between the check and the insert.
            Err(e) if is_unique_violation(&e) => find_relationship(&self.pool, user_id, company_id)
                .await?
                .map(RelationshipOutcome::Existing)
                .ok_or_else(|| {
                    GatewayError::NotFound("relationship vanished after conflict".to_string())
                }),
            Err(e) => Err(map_sqlx_error("ensure_user_company_relationship", e)),
        }
    }

    #[instrument(
        skip(self, batch),
        fields(smartbill_id = %batch.invoice.smartbill_id, items = batch.items.len()),
        err
    )]
    async fn commit_import(&self, batch: ImportBatch) -> Result<(), GatewayError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        insert_invoice(&mut tx, &batch.invoice).await?;
        insert_client(&mut tx, &batch.client).await?;
        for item in &batch.items {
            insert_item(&mut tx, item).await?;
        }
        for hours in &batch.flight_hours {
            insert_flight_hours(&mut tx, hours).await?;
        }
        if let Some(hours) = batch.ppl_hours_paid {
            sqlx::query("UPDATE invoices SET is_ppl = TRUE, ppl_hours_paid = $2 WHERE id = $1")
                .bind(batch.invoice.id.as_uuid())
                .bind(hours as i32)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("update_ppl", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

async fn find_relationship(
    pool: &PgPool,
    user_id: UserId,
    company_id: CompanyId,
) -> Result<Option<RelationshipId>, GatewayError> {
    let row = sqlx::query(
        "SELECT id FROM user_company_relationships WHERE user_id = $1 AND company_id = $2",
    )
    .bind(user_id.as_uuid())
    .bind(company_id.as_uuid())
    .fetch_optional(pool)
    .await
    .map_err(|e| map_sqlx_error("find_relationship", e))?;

    row.map(|r| r.try_get::<Uuid, _>("id").map(RelationshipId::from_uuid))
        .transpose()
        .map_err(|e| map_sqlx_error("find_relationship", e))
}

async fn insert_invoice(
    tx: &mut Transaction<'_, Postgres>,
    invoice: &InvoiceRow,
) -> Result<(), GatewayError> {
    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, smartbill_id, series, number, issue_date, due_date, status,
            total_amount, vat_amount, currency, is_ppl, ppl_hours_paid,
            xml_content, original_xml_content
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(invoice.id.as_uuid())
    .bind(&invoice.smartbill_id)
    .bind(&invoice.series)
    .bind(&invoice.number)
    .bind(invoice.issue_date)
    .bind(invoice.due_date)
    .bind(&invoice.status)
    .bind(invoice.total_amount)
    .bind(invoice.vat_amount)
    .bind(&invoice.currency)
    .bind(invoice.is_ppl)
    .bind(invoice.ppl_hours_paid.map(|h| h as i32))
    .bind(&invoice.xml_content)
    .bind(&invoice.original_xml_content)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_invoice", e))?;
    Ok(())
}

async fn insert_client(
    tx: &mut Transaction<'_, Postgres>,
    client: &InvoiceClientRow,
) -> Result<(), GatewayError> {
    sqlx::query(
        r#"
        INSERT INTO invoice_clients (
            invoice_id, name, email, phone, vat_code, address, city, country, user_id, company_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(client.invoice_id.as_uuid())
    .bind(&client.name)
    .bind(&client.email)
    .bind(&client.phone)
    .bind(&client.vat_code)
    .bind(&client.address)
    .bind(&client.city)
    .bind(&client.country)
    .bind(client.user_id.map(|id| *id.as_uuid()))
    .bind(client.company_id.map(|id| *id.as_uuid()))
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_client", e))?;
    Ok(())
}

async fn insert_item(
    tx: &mut Transaction<'_, Postgres>,
    item: &InvoiceItemRow,
) -> Result<(), GatewayError> {
    sqlx::query(
        r#"
        INSERT INTO invoice_items (
            id, invoice_id, line_id, name, description, quantity, unit,
            unit_price, total_amount, vat_rate
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(item.id.as_uuid())
    .bind(item.invoice_id.as_uuid())
    .bind(item.line_id as i32)
    .bind(&item.name)
    .bind(&item.description)
    .bind(item.quantity)
    .bind(&item.unit)
    .bind(item.unit_price)
    .bind(item.total_amount)
    .bind(item.vat_rate)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_item", e))?;
    Ok(())
}

async fn insert_flight_hours(
    tx: &mut Transaction<'_, Postgres>,
    row: &FlightHoursRow,
) -> Result<(), GatewayError> {
    sqlx::query(
        r#"
        INSERT INTO flight_hours (
            id, invoice_id, user_id, company_id, invoice_item_id, flight_date,
            hours_regular, hours_promotional, total_hours, rate_per_hour, total_amount, notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(row.id.as_uuid())
    .bind(row.invoice_id.as_uuid())
    .bind(row.user_id.as_uuid())
    .bind(row.company_id.map(|id| *id.as_uuid()))
    .bind(row.invoice_item_id.as_uuid())
    .bind(row.flight_date)
    .bind(row.hours_regular)
    .bind(row.hours_promotional)
    .bind(row.total_hours)
    .bind(row.rate_per_hour)
    .bind(row.total_amount)
    .bind(&row.notes)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_flight_hours", e))?;
    Ok(())
}

/// Map SQLx errors to GatewayError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> GatewayError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => GatewayError::Duplicate(msg),
                _ => GatewayError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            GatewayError::Storage(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::RowNotFound => {
            GatewayError::NotFound(format!("unexpected row not found in {}", operation))
        }
        _ => GatewayError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().as_deref() == Some("23505");
    }
    false
}
