//! Membership service: member records, login tokens and registration
//! progress.
//!
//! Login state machine:
//!
//! ```text
//! UNVERIFIED --request_login--> VERIFYING --verify_token--> VERIFIED
//!      ^                             ^                        |
//!      |                             +----request_login-------+ (session expired)
//!      +------------logout-------------------------------------+
//! VERIFIED --session lapses--> TOKEN_EXPIRED --verify_token--> VERIFIED
//! any --revoke_access--> REMOVE (terminal)
//! ```
//!
//! Every operation returns a [`Response`]; storage failures are converted at
//! this boundary and never reach callers as raw errors.

use std::sync::Arc;

use mockable::Clock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::login::{Authentication, LoginStatus, RandomTokenSource, TokenSource};
use crate::domain::member::{EMAIL_FIELD, EmailAddress, Member, MemberProfile};
use crate::domain::ports::{ListParams, Notifier, NotifyError, StorageManager, WaiverRenderer};
use crate::domain::registration::RegistrationStatus;
use crate::domain::{Entity, EntityId, Error, MembershipConfig, Response};

const LOGIN_SUBJECT: &str = "Your login code";

/// Business operations over members held in one storage backend.
pub struct MembershipManager<S> {
    store: Arc<S>,
    notifier: Arc<dyn Notifier>,
    waivers: Arc<dyn WaiverRenderer>,
    tokens: Arc<dyn TokenSource>,
    clock: Arc<dyn Clock>,
    config: MembershipConfig,
    // Serialises lookup-then-add so two in-process adds for one email
    // resolve to the first record. Other processes are not covered.
    add_lock: Mutex<()>,
}

impl<S> MembershipManager<S> {
    /// Create a service over `store` with random login tokens.
    pub fn new(
        store: Arc<S>,
        notifier: Arc<dyn Notifier>,
        waivers: Arc<dyn WaiverRenderer>,
        clock: Arc<dyn Clock>,
        config: MembershipConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            waivers,
            tokens: Arc::new(RandomTokenSource),
            clock,
            config,
            add_lock: Mutex::new(()),
        }
    }

    /// Replace the token source.
    pub fn with_token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Configuration in force.
    pub fn config(&self) -> &MembershipConfig {
        &self.config
    }
}

fn parse_email(raw: &str) -> Result<EmailAddress, Error> {
    EmailAddress::parse(raw).map_err(|err| Error::invalid_request(err.to_string()))
}

fn respond<T>(operation: &'static str, result: Result<T, Error>) -> Response<T> {
    match result {
        Ok(value) => Response::ok(value),
        Err(error) => {
            debug!(operation, code = ?error.code(), message = error.message(), "membership operation failed");
            Response::failure(&error)
        }
    }
}

fn require_id(entity: &Entity<Member>) -> Result<EntityId, Error> {
    entity
        .id()
        .cloned()
        .ok_or_else(|| Error::internal("stored member has no id"))
}

impl<S> MembershipManager<S>
where
    S: StorageManager<Member>,
{
    async fn find(&self, email: &EmailAddress) -> Result<Option<Entity<Member>>, Error> {
        let matches = self
            .store
            .get_by_key_value(EMAIL_FIELD, email.as_str())
            .await?
            .into_result()?;
        if matches.len() > 1 {
            warn!(email = %email, count = matches.len(), "several members share one email; using the first");
        }
        Ok(matches.into_iter().next())
    }

    async fn require(&self, email: &EmailAddress) -> Result<Entity<Member>, Error> {
        self.find(email)
            .await?
            .ok_or_else(|| Error::not_found(format!("no member registered for {email}")))
    }

    async fn persist(&self, mut entity: Entity<Member>) -> Result<Entity<Member>, Error> {
        let id = require_id(&entity)?;
        entity.touch(self.clock.utc());
        let stored = self.store.update(&id, entity).await?.into_result()?;
        Ok(stored)
    }

    async fn find_or_add(
        &self,
        email: &EmailAddress,
        profile: Option<MemberProfile>,
    ) -> Result<Entity<Member>, Error> {
        let _guard = self.add_lock.lock().await;
        if let Some(existing) = self.find(email).await? {
            return Ok(existing);
        }
        let mut member = Member::new(email.as_str(), self.config.default_level());
        if let Some(profile) = profile {
            member.set_profile(profile);
        }
        let created = self
            .store
            .add(Entity::new(member, self.clock.utc()))
            .await?
            .into_result()?;
        info!(email = %email, id = ?created.id().map(EntityId::as_str), "member added");
        Ok(created)
    }

    /// Add a member, or return the existing record for the same email.
    ///
    /// Repeated calls with one email yield the same id and no duplicate
    /// record, provided they go through this service instance.
    pub async fn add_member(&self, email: &str, profile: MemberProfile) -> Response<Entity<Member>> {
        let result = async {
            let email = parse_email(email)?;
            self.find_or_add(&email, Some(profile)).await
        }
        .await;
        respond("add_member", result)
    }

    /// Fetch a member by id.
    pub async fn get_member(&self, id: &EntityId) -> Response<Entity<Member>> {
        self.store
            .get_by_id(id)
            .await
            .unwrap_or_else(Response::from_error)
    }

    /// Fetch a member by email.
    pub async fn find_member_by_email(&self, email: &str) -> Response<Entity<Member>> {
        let result = async {
            let email = parse_email(email)?;
            self.require(&email).await
        }
        .await;
        respond("find_member_by_email", result)
    }

    /// Replace a member's contact details.
    pub async fn update_member(
        &self,
        id: &EntityId,
        profile: MemberProfile,
    ) -> Response<Entity<Member>> {
        let result = async {
            let mut entity = self.store.get_by_id(id).await?.into_result()?;
            entity.body_mut().set_profile(profile);
            self.persist(entity).await
        }
        .await;
        respond("update_member", result)
    }

    /// Delete a member record.
    pub async fn remove_member(&self, id: &EntityId) -> Response<bool> {
        let result = async {
            if self.store.delete(id).await? {
                info!(id = %id, "member removed");
                Ok(true)
            } else {
                Err(Error::not_found(format!("member {id} not found")))
            }
        }
        .await;
        respond("remove_member", result)
    }

    /// List one page of members.
    pub async fn list_members(&self, params: &ListParams) -> Response<Vec<Entity<Member>>> {
        self.store
            .get_all(params)
            .await
            .unwrap_or_else(Response::from_error)
    }

    /// Issue a fresh login token, creating the member on first contact.
    ///
    /// A member whose previous token is still live and whose registration is
    /// complete is signed straight in; everyone else moves to VERIFYING and
    /// is sent the token. A failed delivery does not fail the request; it is
    /// recorded in the login's error list. The returned member carries the
    /// token; strip it with [`Member::redacted`] before showing it to a
    /// client.
    pub async fn request_login(&self, email: &str) -> Response<Entity<Member>> {
        let result = async {
            let email = parse_email(email)?;
            let mut entity = self.find_or_add(&email, None).await?;
            if entity.body().login().status() == LoginStatus::Remove {
                return Err(Error::forbidden("access denied"));
            }

            let now = self.clock.utc();
            let expired = entity.body().login().is_expired_at(now);
            let registered =
                entity.body().registration().status() == RegistrationStatus::Registered;
            let status = if !expired && registered {
                LoginStatus::Verified
            } else {
                LoginStatus::Verifying
            };

            let login = entity.body_mut().login_mut();
            login.set_authentication(Authentication::new(
                self.tokens.next_token(),
                now + self.config.token_lifetime(),
            ));
            login.set_status(status);
            login.clear_errors();

            let mut stored = self.persist(entity).await?;
            info!(email = %email, status = %status, "login requested");
            if status == LoginStatus::Verifying {
                if let Err(error) = self.send_token(&stored).await {
                    warn!(email = %email, error = %error, "login token notification failed");
                    stored.body_mut().login_mut().record_error(error.to_string());
                    stored = self.persist(stored).await?;
                }
            }
            Ok(stored)
        }
        .await;
        respond("request_login", result)
    }

    async fn send_token(&self, entity: &Entity<Member>) -> Result<(), NotifyError> {
        let member = entity.body();
        let Some(auth) = member.login().authentication() else {
            return Ok(());
        };
        let body = format!(
            "Your login code is {}. It expires in {} minutes.",
            auth.token().as_str(),
            self.config.token_lifetime().num_minutes()
        );
        self.notifier
            .notify(member.email_address().as_str(), LOGIN_SUBJECT, &body)
            .await
    }

    /// Check a supplied token and start a session.
    ///
    /// A wrong or expired token fails without touching stored state. A
    /// successful check from VERIFYING or TOKEN_EXPIRED moves to VERIFIED and
    /// extends the same token's expiry to the session window.
    pub async fn verify_token(&self, email: &str, token: &str) -> Response<Entity<Member>> {
        let result = async {
            let email = parse_email(email)?;
            let mut entity = self.require(&email).await?;
            let now = self.clock.utc();
            let login = entity.body().login();

            if login.status() == LoginStatus::Remove {
                return Err(Error::forbidden("access denied"));
            }
            let auth = login
                .authentication()
                .ok_or_else(|| Error::unauthorized("no login has been requested"))?;
            if auth.is_expired_at(now) {
                return Err(Error::unauthorized("token expired"));
            }
            if !auth.token().matches(token) {
                debug!(email = %email, "token mismatch");
                return Err(Error::unauthorized("invalid token"));
            }

            match login.status() {
                LoginStatus::Verifying | LoginStatus::TokenExpired => {
                    let extended = auth.extended_until(now + self.config.session_extension());
                    let login = entity.body_mut().login_mut();
                    login.set_authentication(extended);
                    login.set_status(LoginStatus::Verified);
                    let stored = self.persist(entity).await?;
                    info!(email = %email, "login verified");
                    Ok(stored)
                }
                LoginStatus::Verified => Ok(entity),
                LoginStatus::Unverified | LoginStatus::Remove => {
                    Err(Error::unauthorized("no login has been requested"))
                }
            }
        }
        .await;
        respond("verify_token", result)
    }

    /// End the member's session. Repeating it is harmless; an access
    /// revocation is left in place.
    pub async fn logout(&self, email: &str) -> Response<Entity<Member>> {
        let result = async {
            let email = parse_email(email)?;
            let mut entity = self.require(&email).await?;
            if entity.body().login().status() == LoginStatus::Remove {
                return Ok(entity);
            }
            entity.body_mut().login_mut().set_status(LoginStatus::Unverified);
            let stored = self.persist(entity).await?;
            info!(email = %email, "logged out");
            Ok(stored)
        }
        .await;
        respond("logout", result)
    }

    /// Resolve a live session.
    ///
    /// Succeeds only for a VERIFIED member presenting their unexpired token.
    /// A VERIFIED session found past its expiry is stored as TOKEN_EXPIRED.
    pub async fn authenticate(&self, email: &str, token: &str) -> Response<Entity<Member>> {
        let result = async {
            let email = parse_email(email)?;
            let mut entity = self.require(&email).await?;
            let now = self.clock.utc();
            let login = entity.body().login();
            if login.status() == LoginStatus::Remove {
                return Err(Error::forbidden("access denied"));
            }
            if login.status() != LoginStatus::Verified {
                return Err(Error::unauthorized("not signed in"));
            }
            let valid_token = login
                .authentication()
                .is_some_and(|auth| auth.token().matches(token));
            if !valid_token {
                return Err(Error::unauthorized("invalid token"));
            }
            if login.is_expired_at(now) {
                entity.body_mut().login_mut().set_status(LoginStatus::TokenExpired);
                self.persist(entity).await?;
                info!(email = %email, "session expired");
                return Err(Error::unauthorized("session expired"));
            }
            Ok(entity)
        }
        .await;
        respond("authenticate", result)
    }

    /// Whether `token` opens a live session for `email`.
    pub async fn is_authenticated(&self, email: &str, token: &str) -> bool {
        self.authenticate(email, token).await.is_success()
    }

    /// Record a submitted registration form.
    ///
    /// This is where the login and registration state machines meet: a
    /// member who is VERIFIED when submitting is promoted to APPLIED in the
    /// same write.
    pub async fn submit_registration(
        &self,
        email: &str,
        profile: MemberProfile,
    ) -> Response<Entity<Member>> {
        let result = async {
            let email = parse_email(email)?;
            let mut entity = self.require(&email).await?;
            let member = entity.body_mut();
            member.set_profile(profile);
            let promoted = promote_on_submission(member);
            let stored = self.persist(entity).await?;
            info!(email = %email, promoted, "registration submitted");
            Ok(stored)
        }
        .await;
        respond("submit_registration", result)
    }

    /// Render and record the member's signed waiver; an APPLIED registration
    /// moves to PENDING.
    pub async fn sign_waiver(&self, email: &str) -> Response<Entity<Member>> {
        let result = async {
            let email = parse_email(email)?;
            let mut entity = self.require(&email).await?;
            let now = self.clock.utc();
            let link = self.waivers.render(&entity, now).await?;
            let registration = entity.body_mut().registration_mut();
            registration.record_waiver(now, link);
            if registration.status() == RegistrationStatus::Applied {
                registration.escalate_to(RegistrationStatus::Pending);
            }
            let stored = self.persist(entity).await?;
            info!(email = %email, "waiver signed");
            Ok(stored)
        }
        .await;
        respond("sign_waiver", result)
    }

    /// Record a membership payment of `amount_cents`.
    ///
    /// The level becomes the highest tier the amount reaches. The
    /// registration moves to REGISTERED when the waiver is signed and to
    /// PENDING otherwise; it never moves backwards.
    pub async fn record_payment(&self, email: &str, amount_cents: i64) -> Response<Entity<Member>> {
        let result = async {
            if amount_cents < 0 {
                return Err(Error::invalid_request("payment amount must not be negative"));
            }
            let email = parse_email(email)?;
            let mut entity = self.require(&email).await?;
            let level = self.config.level_for_amount(amount_cents).to_owned();
            let registration = entity.body_mut().registration_mut();
            registration.set_level(level.as_str());
            let target = if registration.waiver_signed() {
                RegistrationStatus::Registered
            } else {
                RegistrationStatus::Pending
            };
            registration.escalate_to(target);
            let stored = self.persist(entity).await?;
            info!(email = %email, level = %level, "payment recorded");
            Ok(stored)
        }
        .await;
        respond("record_payment", result)
    }

    /// Administrative write of the registration status, bypassing the
    /// forward-only rule.
    pub async fn set_registration_status(
        &self,
        email: &str,
        status: RegistrationStatus,
    ) -> Response<Entity<Member>> {
        let result = async {
            let email = parse_email(email)?;
            let mut entity = self.require(&email).await?;
            entity.body_mut().registration_mut().set_status(status);
            let stored = self.persist(entity).await?;
            info!(email = %email, status = %status, "registration status set");
            Ok(stored)
        }
        .await;
        respond("set_registration_status", result)
    }

    /// Lock the member out permanently.
    pub async fn revoke_access(&self, email: &str) -> Response<Entity<Member>> {
        let result = async {
            let email = parse_email(email)?;
            let mut entity = self.require(&email).await?;
            entity.body_mut().login_mut().set_status(LoginStatus::Remove);
            let stored = self.persist(entity).await?;
            info!(email = %email, "access revoked");
            Ok(stored)
        }
        .await;
        respond("revoke_access", result)
    }
}

/// Promote a VERIFIED member's registration to APPLIED.
///
/// Returns whether the registration status changed.
fn promote_on_submission(member: &mut Member) -> bool {
    if member.login().status() == LoginStatus::Verified {
        member
            .registration_mut()
            .escalate_to(RegistrationStatus::Applied)
    } else {
        false
    }
}

#[cfg(test)]
#[path = "membership_service_tests.rs"]
mod tests;
