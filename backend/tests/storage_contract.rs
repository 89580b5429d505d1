//! The storage contract holds for each backend: ids assigned on add are
//! usable for reads, lookups ignore case, and listings carry a page.
use std::sync::Arc;

use chrono::Utc;
use membership::domain::ports::{HttpMethod, ListParams, StorageManager};
use membership::domain::{EMAIL_FIELD, Entity, EntityId, Member, MemberProfile};
use membership::outbound::crm::{CrmStore, contact_resource, contact_table};
use membership::outbound::sheet::{InMemorySpreadsheet, SheetStore, member_table};
use membership::test_support::{MutableClock, RecordingTransport};
use pagination::{PageMarker, PageRequest};
use rstest::{fixture, rstest};
use serde_json::json;

#[fixture]
fn clock() -> Arc<MutableClock> {
    Arc::new(MutableClock::new(Utc::now()))
}

fn member(email: &str, first_name: &str) -> Entity<Member> {
    let body = Member::new(email, "basic").with_profile(MemberProfile {
        first_name: first_name.into(),
        ..MemberProfile::default()
    });
    Entity::new(body, Utc::now())
}

/// Add, read back by id, then look up by email with different casing.
async fn assert_round_trip<S: StorageManager<Member>>(store: &S) -> EntityId {
    let added = store
        .add(member("Lin@Example.org", "Lin"))
        .await
        .expect("add")
        .into_result()
        .expect("added");
    let id = added.id().cloned().expect("assigned id");

    let fetched = store
        .get_by_id(&id)
        .await
        .expect("get")
        .into_result()
        .expect("found");
    assert_eq!(fetched.id(), Some(&id));
    assert_eq!(fetched.body().email_address().as_str(), "lin@example.org");

    let matches = store
        .get_by_key_value(EMAIL_FIELD, " LIN@example.org ")
        .await
        .expect("lookup")
        .into_result()
        .expect("listed");
    assert_eq!(matches.len(), 1);
    id
}

#[rstest]
#[tokio::test]
async fn sheet_backend_honours_the_contract(clock: Arc<MutableClock>) {
    let sheet = Arc::new(
        InMemorySpreadsheet::new(["memberId", "email", "firstName", "loginStatus"])
            .with_id_formula("memberId", "M-"),
    );
    let store = SheetStore::connect(sheet, member_table().expect("table"), clock)
        .await
        .expect("connects");

    let id = assert_round_trip(&store).await;

    assert!(store.delete(&id).await.expect("delete"));
    assert!(!store.delete(&id).await.expect("second delete"));
    let missing = store.get_by_id(&id).await.expect("get");
    assert!(missing.is_not_found());
}

#[rstest]
#[tokio::test]
async fn crm_backend_honours_the_contract(clock: Arc<MutableClock>) {
    let contact = json!({
        "contact_id": "4600001",
        "email": "lin@example.org",
        "first_name": "Lin",
        "custom_fields": [{"api_name": "cf_member", "value": true}]
    });
    let transport = Arc::new(
        RecordingTransport::new()
            .reply(json!({"code": 0, "contact": contact.clone()}))
            .reply(json!({"code": 0, "contact": contact.clone()}))
            .reply(json!({
                "code": 0,
                "contacts": [contact],
                "page_context": {"page": 1, "per_page": 200, "has_more_page": false}
            })),
    );
    let store = CrmStore::new(
        transport.clone(),
        contact_resource(),
        contact_table().expect("table"),
        clock,
    )
    .expect("store");

    let id = assert_round_trip(&store).await;

    assert_eq!(id.as_str(), "4600001");
    let lookup = transport.last_request();
    assert_eq!(lookup.method, HttpMethod::Get);
    assert_eq!(lookup.query_value("email"), Some("LIN@example.org"));
    assert_eq!(lookup.query_value("contact_type"), Some("customer"));
}

#[rstest]
#[tokio::test]
async fn crm_pages_expose_markers(clock: Arc<MutableClock>) {
    let transport = Arc::new(RecordingTransport::new().reply(json!({
        "code": 0,
        "contacts": [],
        "page_context": {"page": 2, "per_page": 50, "has_more_page": true}
    })));
    let store: CrmStore<Member> = CrmStore::new(
        transport.clone(),
        contact_resource(),
        contact_table().expect("table"),
        clock,
    )
    .expect("store");
    let params = ListParams::new()
        .with_page(PageRequest::at(PageMarker::from_number(2)).with_size(50));

    let response = store.get_all(&params).await.expect("listed");

    let page = response.page().expect("page");
    assert!(page.has_more());
    assert_eq!(page.current_page_marker().as_str(), "2");
    assert_eq!(page.next_page_marker().map(|m| m.as_str().to_owned()), Some("3".to_owned()));
    assert_eq!(
        page.previous_page_marker().map(|m| m.as_str().to_owned()),
        Some("1".to_owned())
    );
    assert_eq!(transport.last_request().query_value("per_page"), Some("50"));
}
