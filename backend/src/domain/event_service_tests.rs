//! Tests for the event service.

use std::collections::BTreeMap;
use std::sync::Mutex;

use super::*;
use crate::domain::ErrorCode;
use crate::domain::EventItem;
use crate::domain::ports::{StorageError, StorageManager, StorageResult};
use crate::test_support::MutableClock;
use async_trait::async_trait;
use chrono::{TimeDelta, TimeZone};
use pagination::Page;
use rstest::{fixture, rstest};

/// Calendar keeping events in memory, one occurrence per event.
#[derive(Default)]
struct FakeCalendar {
    events: Mutex<BTreeMap<String, Entity<Event>>>,
    listed: Mutex<Vec<ListParams>>,
    attendee_writes: Mutex<usize>,
    offline: bool,
}

impl FakeCalendar {
    fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    fn seed(&self, id: &str, event: Event) {
        let entity = Entity::new(event, Utc::now()).with_id(EntityId::new(id));
        self.events
            .lock()
            .expect("events")
            .insert(id.to_owned(), entity);
    }

    fn attendee_writes(&self) -> usize {
        *self.attendee_writes.lock().expect("writes")
    }

    fn check(&self) -> StorageResult<()> {
        if self.offline {
            Err(StorageError::transport("calendar unreachable"))
        } else {
            Ok(())
        }
    }

    fn edit(
        &self,
        id: &EntityId,
        start: DateTime<Utc>,
        change: impl FnOnce(&mut Event),
    ) -> StorageResult<Response<Entity<Event>>> {
        self.check()?;
        let mut events = self.events.lock().expect("events");
        match events.get_mut(id.as_str()) {
            Some(entity) if entity.body().start == start => {
                change(entity.body_mut());
                *self.attendee_writes.lock().expect("writes") += 1;
                Ok(Response::ok(entity.clone()))
            }
            _ => Ok(Response::not_found(format!("no occurrence of {id} at {start}"))),
        }
    }
}

#[async_trait]
impl StorageManager<Event> for FakeCalendar {
    async fn add(&self, mut entity: Entity<Event>) -> StorageResult<Response<Entity<Event>>> {
        self.check()?;
        let mut events = self.events.lock().expect("events");
        let id = format!("evt{}", events.len() + 1);
        entity.set_id(EntityId::new(id.as_str()));
        events.insert(id, entity.clone());
        Ok(Response::ok(entity))
    }

    async fn get_by_id(&self, id: &EntityId) -> StorageResult<Response<Entity<Event>>> {
        self.check()?;
        Ok(self
            .events
            .lock()
            .expect("events")
            .get(id.as_str())
            .cloned()
            .map_or_else(|| Response::not_found(format!("event {id} not found")), Response::ok))
    }

    async fn update(
        &self,
        id: &EntityId,
        entity: Entity<Event>,
    ) -> StorageResult<Response<Entity<Event>>> {
        self.check()?;
        let mut events = self.events.lock().expect("events");
        if !events.contains_key(id.as_str()) {
            return Ok(Response::not_found(format!("event {id} not found")));
        }
        let stored = entity.with_id(id.clone());
        events.insert(id.as_str().to_owned(), stored.clone());
        Ok(Response::ok(stored))
    }

    async fn delete(&self, id: &EntityId) -> StorageResult<bool> {
        self.check()?;
        Ok(self
            .events
            .lock()
            .expect("events")
            .remove(id.as_str())
            .is_some())
    }

    async fn get_all(&self, params: &ListParams) -> StorageResult<Response<Vec<Entity<Event>>>> {
        self.check()?;
        self.listed.lock().expect("listed").push(params.clone());
        let events: Vec<_> = self.events.lock().expect("events").values().cloned().collect();
        let size = u32::try_from(events.len()).unwrap_or(u32::MAX);
        Ok(Response::ok_page(events, Page::single(size)))
    }
}

#[async_trait]
impl OccurrenceAttendees for FakeCalendar {
    async fn get_occurrence(
        &self,
        event_id: &EntityId,
        start: DateTime<Utc>,
    ) -> StorageResult<Response<Entity<Event>>> {
        self.check()?;
        // Let a competing registration run between the read and the write.
        tokio::task::yield_now().await;
        Ok(self
            .events
            .lock()
            .expect("events")
            .get(event_id.as_str())
            .filter(|entity| entity.body().start == start)
            .cloned()
            .map_or_else(|| Response::not_found("no such occurrence"), Response::ok))
    }

    async fn add_attendee(
        &self,
        event_id: &EntityId,
        start: DateTime<Utc>,
        email: &str,
    ) -> StorageResult<Response<Entity<Event>>> {
        self.edit(event_id, start, |event| event.attendees.push(email.to_owned()))
    }

    async fn remove_attendee(
        &self,
        event_id: &EntityId,
        start: DateTime<Utc>,
        email: &str,
    ) -> StorageResult<Response<Entity<Event>>> {
        self.edit(event_id, start, |event| {
            event
                .attendees
                .retain(|attendee| !attendee.eq_ignore_ascii_case(email));
        })
    }
}

fn saturday() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 2, 9, 0, 0)
        .single()
        .expect("valid start")
}

fn paddle(capacity: Option<u32>) -> Event {
    let mut event = Event::new("Harbour paddle", saturday(), saturday() + TimeDelta::hours(3));
    event.item = EventItem {
        name: "Paddle session".into(),
        price_cents: 2_500,
        capacity,
        ..EventItem::default()
    };
    event
}

#[fixture]
fn clock() -> Arc<MutableClock> {
    Arc::new(MutableClock::new(
        Utc.with_ymd_and_hms(2026, 4, 1, 12, 0, 0)
            .single()
            .expect("valid now"),
    ))
}

fn service(calendar: Arc<FakeCalendar>, clock: Arc<MutableClock>) -> EventManager<FakeCalendar> {
    EventManager::new(calendar, clock, MembershipConfig::default())
}

#[rstest]
#[tokio::test]
async fn upcoming_listing_uses_the_configured_window(clock: Arc<MutableClock>) {
    let calendar = Arc::new(FakeCalendar::default());
    calendar.seed("evt1", paddle(None));
    let events = service(calendar.clone(), clock.clone());

    let response = events.list_upcoming(PageRequest::first()).await;

    assert_eq!(response.data().map(Vec::len), Some(1));
    let listed = calendar.listed.lock().expect("listed").clone();
    let params = listed.first().expect("one listing");
    assert_eq!(params.time_min, Some(clock.utc()));
    assert_eq!(params.time_max, Some(clock.utc() + TimeDelta::days(90)));
}

#[rstest]
#[tokio::test]
async fn create_then_fetch(clock: Arc<MutableClock>) {
    let events = service(Arc::new(FakeCalendar::default()), clock);

    let created = events.create_event(paddle(Some(10))).await;
    let id = created.data().and_then(Entity::id).cloned().expect("id");

    let fetched = events.get_event(&id).await;
    assert_eq!(
        fetched.data().map(|entity| entity.body().item.capacity),
        Some(Some(10))
    );
}

#[rstest]
#[case::blank_summary("  ", 1)]
#[case::ends_before_start("Paddle", -1)]
#[tokio::test]
async fn invalid_events_are_rejected(
    clock: Arc<MutableClock>,
    #[case] summary: &str,
    #[case] hours: i64,
) {
    let events = service(Arc::new(FakeCalendar::default()), clock);
    let event = Event::new(summary, saturday(), saturday() + TimeDelta::hours(hours));
    let response = events.create_event(event).await;
    assert_eq!(response.error(), Some(ErrorCode::InvalidRequest));
}

#[rstest]
#[tokio::test]
async fn update_replaces_the_details(clock: Arc<MutableClock>) {
    let calendar = Arc::new(FakeCalendar::default());
    calendar.seed("evt1", paddle(None));
    let events = service(calendar, clock);

    let mut changed = paddle(None);
    changed.location = "North jetty".into();
    let response = events.update_event(&EntityId::new("evt1"), changed).await;

    assert_eq!(
        response.data().map(|entity| entity.body().location.clone()),
        Some("North jetty".to_owned())
    );
    assert!(
        events
            .update_event(&EntityId::new("missing"), paddle(None))
            .await
            .is_not_found()
    );
}

#[rstest]
#[tokio::test]
async fn cancel_reports_missing_events(clock: Arc<MutableClock>) {
    let calendar = Arc::new(FakeCalendar::default());
    calendar.seed("evt1", paddle(None));
    let events = service(calendar, clock);

    assert_eq!(events.cancel_event(&EntityId::new("evt1")).await.data(), Some(&true));
    assert!(events.cancel_event(&EntityId::new("evt1")).await.is_not_found());
}

#[rstest]
#[tokio::test]
async fn registration_is_idempotent(clock: Arc<MutableClock>) {
    let calendar = Arc::new(FakeCalendar::default());
    calendar.seed("evt1", paddle(Some(5)));
    let events = service(calendar.clone(), clock);
    let id = EntityId::new("evt1");

    events.register_attendee(&id, saturday(), "Ada@Example.org").await;
    let again = events.register_attendee(&id, saturday(), "ada@example.org").await;

    assert_eq!(
        again.data().map(|entity| entity.body().attendees.clone()),
        Some(vec!["ada@example.org".to_owned()])
    );
    assert_eq!(calendar.attendee_writes(), 1);
}

#[rstest]
#[tokio::test]
async fn full_occurrences_reject_newcomers(clock: Arc<MutableClock>) {
    let calendar = Arc::new(FakeCalendar::default());
    let mut event = paddle(Some(1));
    event.attendees = vec!["grace@example.org".into()];
    calendar.seed("evt1", event);
    let events = service(calendar.clone(), clock);
    let id = EntityId::new("evt1");

    let response = events.register_attendee(&id, saturday(), "ada@example.org").await;
    assert_eq!(response.error(), Some(ErrorCode::Conflict));

    let existing = events.register_attendee(&id, saturday(), "grace@example.org").await;
    assert!(existing.is_success());
    assert_eq!(calendar.attendee_writes(), 0);
}

#[rstest]
#[tokio::test]
async fn concurrent_registrations_cannot_share_the_last_seat(clock: Arc<MutableClock>) {
    let calendar = Arc::new(FakeCalendar::default());
    calendar.seed("evt1", paddle(Some(1)));
    let events = service(calendar.clone(), clock);
    let id = EntityId::new("evt1");

    let (ada, grace) = tokio::join!(
        events.register_attendee(&id, saturday(), "ada@example.org"),
        events.register_attendee(&id, saturday(), "grace@example.org"),
    );

    assert!(ada.is_success());
    assert_eq!(grace.error(), Some(ErrorCode::Conflict));
    assert_eq!(calendar.attendee_writes(), 1);
    let stored = events.get_event(&id).await;
    assert_eq!(
        stored.data().map(|entity| entity.body().attendees.clone()),
        Some(vec!["ada@example.org".to_owned()])
    );
}

#[rstest]
#[tokio::test]
async fn registration_needs_the_exact_occurrence(clock: Arc<MutableClock>) {
    let calendar = Arc::new(FakeCalendar::default());
    calendar.seed("evt1", paddle(None));
    let events = service(calendar, clock);

    let response = events
        .register_attendee(
            &EntityId::new("evt1"),
            saturday() + TimeDelta::days(7),
            "ada@example.org",
        )
        .await;
    assert!(response.is_not_found());
}

#[rstest]
#[tokio::test]
async fn unregister_removes_the_attendee(clock: Arc<MutableClock>) {
    let calendar = Arc::new(FakeCalendar::default());
    let mut event = paddle(None);
    event.attendees = vec!["ada@example.org".into(), "grace@example.org".into()];
    calendar.seed("evt1", event);
    let events = service(calendar, clock);

    let response = events
        .unregister_attendee(&EntityId::new("evt1"), saturday(), "ADA@example.org")
        .await;

    assert_eq!(
        response.data().map(|entity| entity.body().attendees.clone()),
        Some(vec!["grace@example.org".to_owned()])
    );
}

#[rstest]
#[tokio::test]
async fn storage_failures_become_failure_responses(clock: Arc<MutableClock>) {
    let events = service(Arc::new(FakeCalendar::offline()), clock);

    let listing = events.list_upcoming(PageRequest::first()).await;
    assert_eq!(listing.error(), Some(ErrorCode::ServiceUnavailable));

    let registration = events
        .register_attendee(&EntityId::new("evt1"), saturday(), "ada@example.org")
        .await;
    assert_eq!(registration.error(), Some(ErrorCode::ServiceUnavailable));
}
