//! Behavioural tests for the member lifecycle over the sheet backend.
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use membership::domain::ports::ListParams;
use membership::domain::{
    Entity, LoginStatus, Member, MemberProfile, MembershipConfig, MembershipManager,
    RegistrationStatus,
};
use membership::outbound::sheet::{InMemorySpreadsheet, SheetStore, member_table};
use membership::test_support::{
    FixedTokenSource, MutableClock, RecordingNotifier, StaticWaiverRenderer,
};
use rstest::{fixture, rstest};

const EMAIL: &str = "grace@example.org";
const COLUMNS: [&str; 18] = [
    "memberId",
    "created",
    "updated",
    "email",
    "firstName",
    "lastName",
    "phone",
    "address",
    "interests",
    "loginStatus",
    "authToken",
    "authExpires",
    "loginErrors",
    "level",
    "registrationStatus",
    "waiverSigned",
    "waiverDate",
    "waiverPdf",
];

struct World {
    service: MembershipManager<SheetStore<Member>>,
    sheet: Arc<InMemorySpreadsheet>,
    notifier: Arc<RecordingNotifier>,
    clock: Arc<MutableClock>,
}

#[fixture]
fn clock() -> Arc<MutableClock> {
    Arc::new(MutableClock::new(
        Utc.with_ymd_and_hms(2026, 6, 1, 8, 30, 0)
            .single()
            .expect("valid instant"),
    ))
}

async fn world(clock: Arc<MutableClock>) -> World {
    let sheet = Arc::new(InMemorySpreadsheet::new(COLUMNS).with_id_formula("memberId", "row-"));
    let store = SheetStore::connect(sheet.clone(), member_table().expect("table"), clock.clone())
        .await
        .expect("sheet connects");
    let notifier = Arc::new(RecordingNotifier::default());
    let service = MembershipManager::new(
        Arc::new(store),
        notifier.clone(),
        Arc::new(StaticWaiverRenderer),
        clock.clone(),
        MembershipConfig::default(),
    )
    .with_token_source(Arc::new(FixedTokenSource::new(["424242", "515151"])));
    World {
        service,
        sheet,
        notifier,
        clock,
    }
}

fn registration_status(member: &Entity<Member>) -> RegistrationStatus {
    member.body().registration().status()
}

#[rstest]
#[tokio::test]
async fn a_new_contact_becomes_a_registered_member(clock: Arc<MutableClock>) {
    let w = world(clock).await;

    let requested = w.service.request_login(EMAIL).await.into_result().expect("login");
    assert_eq!(requested.body().login().status(), LoginStatus::Verifying);
    assert!(
        w.notifier
            .last_body()
            .is_some_and(|body| body.contains("424242"))
    );

    w.clock.advance_minutes(3);
    let verified = w
        .service
        .verify_token(EMAIL, "424242")
        .await
        .into_result()
        .expect("verified");
    assert_eq!(verified.body().login().status(), LoginStatus::Verified);

    let profile = MemberProfile {
        first_name: "Grace".into(),
        last_name: "Hopper".into(),
        interests: vec!["sailing".into(), "orienteering".into()],
        ..MemberProfile::default()
    };
    let applied = w
        .service
        .submit_registration(EMAIL, profile)
        .await
        .into_result()
        .expect("submitted");
    assert_eq!(registration_status(&applied), RegistrationStatus::Applied);

    let pending = w.service.sign_waiver(EMAIL).await.into_result().expect("waiver");
    assert_eq!(registration_status(&pending), RegistrationStatus::Pending);

    let registered = w
        .service
        .record_payment(EMAIL, 10_000)
        .await
        .into_result()
        .expect("payment");
    assert_eq!(registration_status(&registered), RegistrationStatus::Registered);
    assert_eq!(registered.body().registration().level(), "supporting");
    assert_eq!(registered.body().full_name(), "Grace Hopper");

    let reloaded = w
        .service
        .find_member_by_email(EMAIL)
        .await
        .into_result()
        .expect("stored");
    assert_eq!(reloaded.id(), registered.id());
    assert_eq!(
        reloaded.body().profile().interests,
        ["sailing", "orienteering"]
    );
    assert!(w.sheet.flush_count() > 0);
}

#[rstest]
#[tokio::test]
async fn a_registered_member_with_a_live_session_skips_the_token(clock: Arc<MutableClock>) {
    let w = world(clock).await;
    w.service.request_login(EMAIL).await;
    w.service.verify_token(EMAIL, "424242").await;
    w.service
        .set_registration_status(EMAIL, RegistrationStatus::Registered)
        .await;
    let sent_before = w.notifier.sent().len();

    let again = w.service.request_login(EMAIL).await.into_result().expect("login");

    assert_eq!(again.body().login().status(), LoginStatus::Verified);
    assert_eq!(w.notifier.sent().len(), sent_before);
    assert!(again.body().redacted().login().authentication().is_none());
}

#[rstest]
#[tokio::test]
async fn listing_returns_one_complete_page(clock: Arc<MutableClock>) {
    let w = world(clock).await;
    for email in ["a@example.org", "b@example.org", "c@example.org"] {
        w.service
            .add_member(email, MemberProfile::default())
            .await
            .into_result()
            .expect("added");
    }

    let listed = w.service.list_members(&ListParams::new()).await;

    assert_eq!(listed.data().map(Vec::len), Some(3));
    let page = listed.page().expect("page");
    assert!(!page.has_more());
    assert_eq!(page.page_size(), 3);
    assert!(page.next_page_marker().is_none());
}
