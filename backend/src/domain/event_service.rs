//! Event service: calendar listings and per-occurrence attendance.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;
use pagination::PageRequest;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::member::EmailAddress;
use crate::domain::ports::{ListParams, OccurrenceAttendees};
use crate::domain::{Entity, EntityId, Error, Event, MembershipConfig, Response};

/// Business operations over events held in a calendar store.
pub struct EventManager<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: MembershipConfig,
    // Serialises the capacity check and the attendee write so two in-process
    // registrations cannot both take the last seat.
    seat_lock: Mutex<()>,
}

impl<S> EventManager<S> {
    /// Create a service over `store`.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: MembershipConfig) -> Self {
        Self {
            store,
            clock,
            config,
            seat_lock: Mutex::new(()),
        }
    }
}

fn respond<T>(operation: &'static str, result: Result<T, Error>) -> Response<T> {
    match result {
        Ok(value) => Response::ok(value),
        Err(error) => {
            debug!(operation, code = ?error.code(), message = error.message(), "event operation failed");
            Response::failure(&error)
        }
    }
}

fn validate(event: &Event) -> Result<(), Error> {
    if event.summary.trim().is_empty() {
        return Err(Error::invalid_request("event summary must not be empty"));
    }
    if event.end < event.start {
        return Err(Error::invalid_request("event must not end before it starts"));
    }
    Ok(())
}

impl<S> EventManager<S>
where
    S: OccurrenceAttendees,
{
    /// Occurrences starting within the configured window from now.
    pub async fn list_upcoming(&self, page: PageRequest) -> Response<Vec<Entity<Event>>> {
        let now = self.clock.utc();
        let params = ListParams::new()
            .with_page(page)
            .with_window(now, now + self.config.calendar_window());
        self.store
            .get_all(&params)
            .await
            .unwrap_or_else(Response::from_error)
    }

    /// Fetch one event or occurrence by id.
    pub async fn get_event(&self, id: &EntityId) -> Response<Entity<Event>> {
        self.store
            .get_by_id(id)
            .await
            .unwrap_or_else(Response::from_error)
    }

    /// Schedule a new event.
    pub async fn create_event(&self, event: Event) -> Response<Entity<Event>> {
        let result = async {
            validate(&event)?;
            let created = self
                .store
                .add(Entity::new(event, self.clock.utc()))
                .await?
                .into_result()?;
            info!(id = ?created.id().map(EntityId::as_str), summary = %created.body().summary, "event created");
            Ok(created)
        }
        .await;
        respond("create_event", result)
    }

    /// Replace an event's details.
    pub async fn update_event(&self, id: &EntityId, event: Event) -> Response<Entity<Event>> {
        let result = async {
            validate(&event)?;
            let mut entity = self.store.get_by_id(id).await?.into_result()?;
            entity.replace_body(event, self.clock.utc());
            let stored = self.store.update(id, entity).await?.into_result()?;
            info!(id = %id, "event updated");
            Ok(stored)
        }
        .await;
        respond("update_event", result)
    }

    /// Cancel an event, or a whole series when `id` names one.
    pub async fn cancel_event(&self, id: &EntityId) -> Response<bool> {
        let result = async {
            if self.store.delete(id).await? {
                info!(id = %id, "event cancelled");
                Ok(true)
            } else {
                Err(Error::not_found(format!("event {id} not found")))
            }
        }
        .await;
        respond("cancel_event", result)
    }

    /// Put `email` on the attendee list of the occurrence starting at
    /// `start`.
    ///
    /// Registering twice is a no-op. A full occurrence rejects newcomers
    /// with a conflict.
    pub async fn register_attendee(
        &self,
        id: &EntityId,
        start: DateTime<Utc>,
        email: &str,
    ) -> Response<Entity<Event>> {
        let result = async {
            let email = EmailAddress::parse(email)
                .map_err(|err| Error::invalid_request(err.to_string()))?;
            let _guard = self.seat_lock.lock().await;
            let occurrence = self
                .store
                .get_occurrence(id, start)
                .await?
                .into_result()?;
            let event = occurrence.body();
            if event.is_attending(email.as_str()) {
                debug!(id = %id, email = %email, "already registered");
                return Ok(occurrence);
            }
            if !event.has_room() {
                return Err(Error::conflict(format!("{} is full", event.summary)));
            }
            let updated = self
                .store
                .add_attendee(id, start, email.as_str())
                .await?
                .into_result()?;
            info!(id = %id, email = %email, start = %start, "attendee registered");
            Ok(updated)
        }
        .await;
        respond("register_attendee", result)
    }

    /// Take `email` off the attendee list of the occurrence starting at
    /// `start`. Removing someone who is not registered succeeds unchanged.
    pub async fn unregister_attendee(
        &self,
        id: &EntityId,
        start: DateTime<Utc>,
        email: &str,
    ) -> Response<Entity<Event>> {
        let result = async {
            let email = EmailAddress::parse(email)
                .map_err(|err| Error::invalid_request(err.to_string()))?;
            let updated = self
                .store
                .remove_attendee(id, start, email.as_str())
                .await?
                .into_result()?;
            info!(id = %id, email = %email, start = %start, "attendee unregistered");
            Ok(updated)
        }
        .await;
        respond("unregister_attendee", result)
    }
}

#[cfg(test)]
#[path = "event_service_tests.rs"]
mod tests;
