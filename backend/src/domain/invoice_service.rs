//! Invoice service: billing members through the accounting backend.

use std::sync::Arc;

use mockable::Clock;
use pagination::PageRequest;
use tracing::{debug, info};

use crate::domain::invoice::CUSTOMER_ID_FIELD;
use crate::domain::ports::{ListParams, StorageManager};
use crate::domain::{
    Entity, EntityId, Error, Invoice, InvoiceStatus, LineItem, MembershipConfig, Response,
};

/// Business operations over invoices.
pub struct InvoiceManager<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: MembershipConfig,
}

impl<S> InvoiceManager<S> {
    /// Create a service over `store`.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: MembershipConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }
}

fn respond<T>(operation: &'static str, result: Result<T, Error>) -> Response<T> {
    match result {
        Ok(value) => Response::ok(value),
        Err(error) => {
            debug!(operation, code = ?error.code(), message = error.message(), "invoice operation failed");
            Response::failure(&error)
        }
    }
}

fn validate(invoice: &Invoice) -> Result<(), Error> {
    if invoice.customer_id.trim().is_empty() {
        return Err(Error::invalid_request("invoice needs a customer"));
    }
    if invoice.line_items.is_empty() {
        return Err(Error::invalid_request("invoice needs at least one line item"));
    }
    if invoice
        .line_items
        .iter()
        .any(|line| line.quantity == 0 || line.rate_cents < 0)
    {
        return Err(Error::invalid_request(
            "line items need a positive quantity and a non-negative rate",
        ));
    }
    Ok(())
}

impl<S> InvoiceManager<S>
where
    S: StorageManager<Invoice>,
{
    /// Issue `invoice`; an undated invoice is dated today.
    pub async fn create_invoice(&self, mut invoice: Invoice) -> Response<Entity<Invoice>> {
        let result = async {
            validate(&invoice)?;
            let now = self.clock.utc();
            invoice.date.get_or_insert(now.date_naive());
            let created = self
                .store
                .add(Entity::new(invoice, now))
                .await?
                .into_result()?;
            info!(
                id = ?created.id().map(EntityId::as_str),
                customer = %created.body().customer_id,
                total_cents = created.body().total_cents(),
                "invoice created"
            );
            Ok(created)
        }
        .await;
        respond("create_invoice", result)
    }

    /// Bill a customer for one year at `level`, priced from the configured
    /// thresholds. `reference` usually carries the member's email.
    pub async fn create_membership_invoice(
        &self,
        customer_id: &str,
        level: &str,
        reference: Option<&str>,
    ) -> Response<Entity<Invoice>> {
        let Some(rate_cents) = self.config.price_for_level(level) else {
            let error = Error::invalid_request(format!("unknown membership level `{level}`"));
            return respond("create_membership_invoice", Err(error));
        };
        let level = level.trim().to_lowercase();
        let line = LineItem {
            name: format!("{level} membership"),
            description: format!("Annual {level} membership"),
            rate_cents,
            quantity: 1,
            ..LineItem::default()
        };
        let mut invoice = Invoice::new(customer_id.trim(), vec![line]);
        invoice.reference = reference.map(str::to_owned);
        self.create_invoice(invoice).await
    }

    /// Fetch one invoice.
    pub async fn get_invoice(&self, id: &EntityId) -> Response<Entity<Invoice>> {
        self.store
            .get_by_id(id)
            .await
            .unwrap_or_else(Response::from_error)
    }

    /// One page of the invoices billed to `customer_id`.
    pub async fn list_invoices_for_customer(
        &self,
        customer_id: &str,
        page: PageRequest,
    ) -> Response<Vec<Entity<Invoice>>> {
        let wanted = customer_id.trim().to_owned();
        let params = ListParams::new()
            .with_page(page)
            .with_filter(CUSTOMER_ID_FIELD, wanted.as_str());
        let same_customer =
            |entity: &Entity<Invoice>| entity.body().customer_id.trim() == wanted;
        self.store
            .get_filtered(&same_customer, &params)
            .await
            .unwrap_or_else(Response::from_error)
    }

    /// Mark an invoice void. Voiding twice is harmless; a paid invoice
    /// cannot be voided.
    pub async fn void_invoice(&self, id: &EntityId) -> Response<Entity<Invoice>> {
        let result = async {
            let mut entity = self.store.get_by_id(id).await?.into_result()?;
            match entity.body().status {
                InvoiceStatus::Void => return Ok(entity),
                InvoiceStatus::Paid => {
                    return Err(Error::conflict(format!("invoice {id} is already paid")));
                }
                InvoiceStatus::Draft | InvoiceStatus::Sent | InvoiceStatus::Overdue => {}
            }
            entity.body_mut().status = InvoiceStatus::Void;
            entity.touch(self.clock.utc());
            let stored = self.store.update(id, entity).await?.into_result()?;
            info!(id = %id, "invoice voided");
            Ok(stored)
        }
        .await;
        respond("void_invoice", result)
    }
}

#[cfg(test)]
#[path = "invoice_service_tests.rs"]
mod tests;
