//! Tests for the invoice service.

use super::*;
use crate::domain::ErrorCode;
use crate::domain::ports::HttpMethod;
use crate::outbound::crm::{CrmStore, invoice_resource, invoice_table};
use crate::test_support::{MutableClock, RecordingTransport};
use chrono::{NaiveDate, TimeZone, Utc};
use rstest::{fixture, rstest};
use serde_json::{Value, json};

#[fixture]
fn clock() -> Arc<MutableClock> {
    Arc::new(MutableClock::new(
        Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0)
            .single()
            .expect("valid now"),
    ))
}

fn service(
    transport: Arc<RecordingTransport>,
    clock: Arc<MutableClock>,
) -> InvoiceManager<CrmStore<Invoice>> {
    let store = CrmStore::new(
        transport,
        invoice_resource(),
        invoice_table().expect("table"),
        clock.clone(),
    )
    .expect("store");
    InvoiceManager::new(Arc::new(store), clock, MembershipConfig::default())
}

fn stored_invoice(id: &str, customer: &str, status: &str) -> Value {
    json!({
        "invoice_id": id,
        "customer_id": customer,
        "status": status,
        "line_items": [{"name": "family membership", "rate": 45.0, "quantity": 1}],
        "total": 45.0
    })
}

#[rstest]
#[tokio::test]
async fn membership_invoices_are_priced_from_the_level(clock: Arc<MutableClock>) {
    let transport = Arc::new(RecordingTransport::new().reply(json!({
        "code": 0,
        "invoice": stored_invoice("inv-1", "cust-7", "draft")
    })));
    let invoices = service(transport.clone(), clock);

    let response = invoices
        .create_membership_invoice("cust-7", "Family", Some("ada@example.org"))
        .await;

    let created = response.into_result().expect("created");
    assert_eq!(created.id().map(EntityId::as_str), Some("inv-1"));
    assert_eq!(created.body().total_cents(), 4_500);

    let request = transport.last_request();
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.path, "invoices");
    let body = request.body.expect("body");
    assert_eq!(body.get("customer_id"), Some(&json!("cust-7")));
    assert_eq!(body.get("reference_number"), Some(&json!("ada@example.org")));
    assert_eq!(body.get("date"), Some(&json!("2026-03-14")));
    assert_eq!(
        body.pointer("/line_items/0/name"),
        Some(&json!("family membership"))
    );
    assert_eq!(body.pointer("/line_items/0/rate"), Some(&json!(45.0)));
}

#[rstest]
#[tokio::test]
async fn unknown_levels_are_rejected_without_a_request(clock: Arc<MutableClock>) {
    let transport = Arc::new(RecordingTransport::new());
    let invoices = service(transport.clone(), clock);

    let response = invoices.create_membership_invoice("cust-7", "gold", None).await;

    assert_eq!(response.error(), Some(ErrorCode::InvalidRequest));
    assert!(transport.requests().is_empty());
}

#[rstest]
#[case::no_customer(Invoice::new(" ", vec![LineItem { quantity: 1, ..LineItem::default() }]))]
#[case::no_lines(Invoice::new("cust-7", Vec::new()))]
#[case::zero_quantity(Invoice::new("cust-7", vec![LineItem::default()]))]
#[tokio::test]
async fn malformed_invoices_are_rejected(clock: Arc<MutableClock>, #[case] invoice: Invoice) {
    let transport = Arc::new(RecordingTransport::new());
    let invoices = service(transport.clone(), clock);

    let response = invoices.create_invoice(invoice).await;

    assert_eq!(response.error(), Some(ErrorCode::InvalidRequest));
    assert!(transport.requests().is_empty());
}

#[rstest]
#[tokio::test]
async fn explicit_dates_are_kept(clock: Arc<MutableClock>) {
    let transport = Arc::new(RecordingTransport::new().reply(json!({
        "invoice": stored_invoice("inv-2", "cust-7", "draft")
    })));
    let invoices = service(transport.clone(), clock);
    let mut invoice = Invoice::new(
        "cust-7",
        vec![LineItem {
            name: "Paddle session".into(),
            rate_cents: 2_500,
            quantity: 2,
            ..LineItem::default()
        }],
    );
    invoice.date = NaiveDate::from_ymd_opt(2026, 1, 31);

    invoices.create_invoice(invoice).await;

    let body = transport.last_request().body.expect("body");
    assert_eq!(body.get("date"), Some(&json!("2026-01-31")));
    assert_eq!(body.get("total"), Some(&json!(50.0)));
}

#[rstest]
#[tokio::test]
async fn customer_listing_filters_on_the_server_and_locally(clock: Arc<MutableClock>) {
    let transport = Arc::new(RecordingTransport::new().reply(json!({
        "code": 0,
        "invoices": [
            stored_invoice("inv-1", "cust-7", "sent"),
            stored_invoice("inv-9", "cust-8", "sent")
        ],
        "page_context": {"page": 1, "per_page": 200, "has_more_page": false}
    })));
    let invoices = service(transport.clone(), clock);

    let response = invoices
        .list_invoices_for_customer("cust-7", PageRequest::first())
        .await;

    let ids: Vec<_> = response
        .data()
        .map(|list| {
            list.iter()
                .filter_map(|entity| entity.id().map(|id| id.as_str().to_owned()))
                .collect()
        })
        .unwrap_or_default();
    assert_eq!(ids, ["inv-1"]);
    assert!(response.page().is_some_and(|page| !page.has_more()));
    let request = transport.last_request();
    assert_eq!(request.query_value("customer_id"), Some("cust-7"));
}

#[rstest]
#[tokio::test]
async fn voiding_updates_the_status(clock: Arc<MutableClock>) {
    let transport = Arc::new(
        RecordingTransport::new()
            .reply(json!({"invoice": stored_invoice("inv-1", "cust-7", "sent")}))
            .reply(json!({"invoice": stored_invoice("inv-1", "cust-7", "void")})),
    );
    let invoices = service(transport.clone(), clock);

    let response = invoices.void_invoice(&EntityId::new("inv-1")).await;

    assert_eq!(
        response.data().map(|entity| entity.body().status),
        Some(InvoiceStatus::Void)
    );
    let request = transport.last_request();
    assert_eq!(request.method, HttpMethod::Put);
    assert_eq!(request.path, "invoices/inv-1");
    let body = request.body.expect("body");
    assert_eq!(body.get("status"), Some(&json!("void")));
    assert!(body.get("invoice_id").is_none());
}

#[rstest]
#[case::paid("paid", Some(ErrorCode::Conflict), 1)]
#[case::already_void("void", None, 1)]
#[tokio::test]
async fn voiding_settled_invoices_sends_no_update(
    clock: Arc<MutableClock>,
    #[case] status: &str,
    #[case] error: Option<ErrorCode>,
    #[case] requests: usize,
) {
    let transport = Arc::new(
        RecordingTransport::new()
            .reply(json!({"invoice": stored_invoice("inv-1", "cust-7", status)})),
    );
    let invoices = service(transport.clone(), clock);

    let response = invoices.void_invoice(&EntityId::new("inv-1")).await;

    assert_eq!(response.error(), error);
    assert_eq!(transport.requests().len(), requests);
}

#[rstest]
#[tokio::test]
async fn missing_invoices_are_not_found(clock: Arc<MutableClock>) {
    let transport = Arc::new(
        RecordingTransport::new()
            .fail(crate::domain::ports::TransportError::status(404_u16, "gone")),
    );
    let invoices = service(transport, clock);

    assert!(invoices.get_invoice(&EntityId::new("inv-404")).await.is_not_found());
}
