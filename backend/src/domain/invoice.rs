//! Invoices and their line items.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::entity::Mappable;
use crate::domain::mapping::{Fields, date_value};

pub(crate) const CUSTOMER_ID_FIELD: &str = "customerId";
pub(crate) const CUSTOMER_NAME_FIELD: &str = "customerName";
pub(crate) const INVOICE_NUMBER_FIELD: &str = "invoiceNumber";
pub(crate) const INVOICE_DATE_FIELD: &str = "date";
pub(crate) const DUE_DATE_FIELD: &str = "dueDate";
pub(crate) const INVOICE_STATUS_FIELD: &str = "status";
pub(crate) const LINE_ITEMS_FIELD: &str = "lineItems";
pub(crate) const TOTAL_FIELD: &str = "totalCents";
pub(crate) const REFERENCE_FIELD: &str = "reference";

pub(crate) const ITEM_ID_FIELD: &str = "itemId";
pub(crate) const NAME_FIELD: &str = "name";
pub(crate) const DESCRIPTION_FIELD: &str = "description";
pub(crate) const RATE_FIELD: &str = "rateCents";
pub(crate) const QUANTITY_FIELD: &str = "quantity";

/// Invoice lifecycle as reported by the accounting service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Not yet sent.
    #[default]
    Draft,
    /// Sent and awaiting payment.
    Sent,
    /// Settled.
    Paid,
    /// Past its due date.
    Overdue,
    /// Cancelled.
    Void,
}

impl InvoiceStatus {
    /// Wire spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::Void => "void",
        }
    }

    /// Parse the wire spelling; unknown values read as draft.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sent" => Self::Sent,
            "paid" => Self::Paid,
            "overdue" => Self::Overdue,
            "void" => Self::Void,
            _ => Self::Draft,
        }
    }
}

/// One billable line: a catalogue item, or a free-form charge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LineItem {
    /// Catalogue item this line bills for.
    pub item_id: Option<String>,
    /// Item name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Unit price in cents.
    pub rate_cents: i64,
    /// Units billed.
    pub quantity: u32,
}

impl LineItem {
    /// Line total in cents, saturating on overflow.
    pub fn total_cents(&self) -> i64 {
        self.rate_cents.saturating_mul(i64::from(self.quantity))
    }
}

impl Mappable for LineItem {
    const KIND: &'static str = "line item";

    fn to_fields(&self) -> Fields {
        let mut fields = Fields::new()
            .with(NAME_FIELD, self.name.as_str())
            .with(DESCRIPTION_FIELD, self.description.as_str())
            .with(RATE_FIELD, self.rate_cents)
            .with(QUANTITY_FIELD, self.quantity);
        fields.insert_opt(ITEM_ID_FIELD, self.item_id.clone());
        fields
    }

    fn from_fields(fields: &Fields) -> Self {
        Self {
            item_id: fields.opt_text(ITEM_ID_FIELD),
            name: fields.text(NAME_FIELD),
            description: fields.text(DESCRIPTION_FIELD),
            rate_cents: fields.integer(RATE_FIELD).unwrap_or_default(),
            quantity: fields.count(QUANTITY_FIELD).unwrap_or(1),
        }
    }
}

/// An invoice issued to a customer contact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Invoice {
    /// Accounting-service id of the billed contact.
    pub customer_id: String,
    /// Display name of the billed contact.
    pub customer_name: String,
    /// Number assigned by the accounting service.
    pub invoice_number: Option<String>,
    /// Issue date.
    pub date: Option<NaiveDate>,
    /// Payment due date.
    pub due_date: Option<NaiveDate>,
    /// Lifecycle status.
    pub status: InvoiceStatus,
    /// Caller reference, for example the member's email address.
    pub reference: Option<String>,
    /// Billed lines.
    pub line_items: Vec<LineItem>,
}

impl Invoice {
    /// Draft invoice for `customer_id`.
    pub fn new(customer_id: impl Into<String>, line_items: Vec<LineItem>) -> Self {
        Self {
            customer_id: customer_id.into(),
            line_items,
            ..Self::default()
        }
    }

    /// Sum of the line totals in cents.
    pub fn total_cents(&self) -> i64 {
        self.line_items
            .iter()
            .map(LineItem::total_cents)
            .fold(0_i64, i64::saturating_add)
    }
}

impl Mappable for Invoice {
    const KIND: &'static str = "invoice";

    fn to_fields(&self) -> Fields {
        let lines: Vec<serde_json::Value> = self
            .line_items
            .iter()
            .map(|line| line.to_fields().into_value())
            .collect();
        let mut fields = Fields::new()
            .with(CUSTOMER_ID_FIELD, self.customer_id.as_str())
            .with(CUSTOMER_NAME_FIELD, self.customer_name.as_str())
            .with(INVOICE_STATUS_FIELD, self.status.as_str())
            .with(LINE_ITEMS_FIELD, lines)
            .with(TOTAL_FIELD, self.total_cents());
        fields.insert_opt(INVOICE_NUMBER_FIELD, self.invoice_number.clone());
        fields.insert_opt(INVOICE_DATE_FIELD, self.date.as_ref().map(date_value));
        fields.insert_opt(DUE_DATE_FIELD, self.due_date.as_ref().map(date_value));
        fields.insert_opt(REFERENCE_FIELD, self.reference.clone());
        fields
    }

    fn from_fields(fields: &Fields) -> Self {
        Self {
            customer_id: fields.text(CUSTOMER_ID_FIELD),
            customer_name: fields.text(CUSTOMER_NAME_FIELD),
            invoice_number: fields.opt_text(INVOICE_NUMBER_FIELD),
            date: fields.date(INVOICE_DATE_FIELD),
            due_date: fields.date(DUE_DATE_FIELD),
            status: InvoiceStatus::parse(&fields.text(INVOICE_STATUS_FIELD)),
            reference: fields.opt_text(REFERENCE_FIELD),
            line_items: fields
                .records(LINE_ITEMS_FIELD)
                .iter()
                .map(LineItem::from_fields)
                .collect(),
        }
    }
}
