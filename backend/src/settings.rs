//! Runtime settings loaded via OrthoConfig.
//!
//! Values come from `MEMBERSHIP_*` environment variables, configuration
//! files and command-line flags. Unset values fall back to the defaults in
//! [`crate::domain::config`].

use std::time::Duration;

use chrono::TimeDelta;
use ortho_config::OrthoConfig;
use reqwest::Url;
use serde::Deserialize;

use crate::domain::config::{
    ConfigError, DEFAULT_CALENDAR_WINDOW_DAYS, DEFAULT_LEVEL, DEFAULT_LEVEL_THRESHOLDS,
    DEFAULT_SESSION_EXTENSION_MINUTES, DEFAULT_TOKEN_LIFETIME_MINUTES, MembershipConfig,
    parse_level_thresholds,
};
use crate::outbound::http::ReqwestTransport;

const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Errors raised while turning settings into runtime collaborators.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Business rules are invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A base URL setting does not parse.
    #[error("{setting} is not a valid URL: {source}")]
    InvalidUrl {
        /// Setting name.
        setting: &'static str,
        /// Parser failure.
        source: url::ParseError,
    },
    /// The HTTP client could not be built.
    #[error("HTTP client setup failed: {0}")]
    Client(#[from] reqwest::Error),
}

/// Membership settings.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "MEMBERSHIP")]
pub struct MembershipSettings {
    /// Minutes a login token stays valid.
    pub token_lifetime_minutes: Option<i64>,
    /// Minutes a verified session lasts.
    pub session_extension_minutes: Option<i64>,
    /// Days ahead covered by event listings.
    pub calendar_window_days: Option<i64>,
    /// Tier given to new members.
    pub default_level: Option<String>,
    /// Tier price list as `level:cents` pairs separated by commas.
    pub level_thresholds: Option<String>,
    /// Accounting service API root.
    pub crm_base_url: Option<String>,
    /// Accounting organisation, sent with every CRM request.
    pub crm_organization_id: Option<String>,
    /// Accounting service access token.
    pub crm_access_token: Option<String>,
    /// Calendar service API root.
    pub calendar_base_url: Option<String>,
    /// Calendar holding the organisation's events.
    pub calendar_id: Option<String>,
    /// Resource directory API root.
    pub directory_base_url: Option<String>,
    /// Calendar and directory access token.
    pub calendar_access_token: Option<String>,
    /// Per-request timeout for remote calls.
    pub request_timeout_seconds: Option<u64>,
}

impl MembershipSettings {
    /// Login token lifetime in minutes.
    pub fn token_lifetime_minutes(&self) -> i64 {
        self.token_lifetime_minutes
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_MINUTES)
    }

    /// Session length in minutes.
    pub fn session_extension_minutes(&self) -> i64 {
        self.session_extension_minutes
            .unwrap_or(DEFAULT_SESSION_EXTENSION_MINUTES)
    }

    /// Event listing window in days.
    pub fn calendar_window_days(&self) -> i64 {
        self.calendar_window_days
            .unwrap_or(DEFAULT_CALENDAR_WINDOW_DAYS)
    }

    /// Tier for new members.
    pub fn default_level(&self) -> &str {
        self.default_level.as_deref().unwrap_or(DEFAULT_LEVEL)
    }

    /// Raw tier price list.
    pub fn level_thresholds(&self) -> &str {
        self.level_thresholds
            .as_deref()
            .unwrap_or(DEFAULT_LEVEL_THRESHOLDS)
    }

    /// Calendar to read, `primary` when unset.
    pub fn calendar_id(&self) -> &str {
        self.calendar_id.as_deref().unwrap_or("primary")
    }

    /// Timeout applied to every remote request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_seconds
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECONDS),
        )
    }

    /// Transport for the accounting service, when it is configured.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] for an unparsable URL or a client that
    /// cannot be built.
    pub fn crm_transport(&self) -> Result<Option<ReqwestTransport>, SettingsError> {
        let Some(base) = parse_url("crm_base_url", self.crm_base_url.as_deref())? else {
            return Ok(None);
        };
        let mut transport = ReqwestTransport::new(base, self.request_timeout())?;
        if let Some(token) = &self.crm_access_token {
            transport = transport.with_bearer_token(token);
        }
        if let Some(organization) = &self.crm_organization_id {
            transport = transport.with_default_query("organization_id", organization.as_str());
        }
        Ok(Some(transport))
    }

    /// Transport for the calendar service, when it is configured.
    ///
    /// # Errors
    ///
    /// As for [`MembershipSettings::crm_transport`].
    pub fn calendar_transport(&self) -> Result<Option<ReqwestTransport>, SettingsError> {
        self.bearer_transport("calendar_base_url", self.calendar_base_url.as_deref())
    }

    /// Transport for the resource directory, when it is configured.
    ///
    /// # Errors
    ///
    /// As for [`MembershipSettings::crm_transport`].
    pub fn directory_transport(&self) -> Result<Option<ReqwestTransport>, SettingsError> {
        self.bearer_transport("directory_base_url", self.directory_base_url.as_deref())
    }

    fn bearer_transport(
        &self,
        setting: &'static str,
        raw: Option<&str>,
    ) -> Result<Option<ReqwestTransport>, SettingsError> {
        let Some(base) = parse_url(setting, raw)? else {
            return Ok(None);
        };
        let mut transport = ReqwestTransport::new(base, self.request_timeout())?;
        if let Some(token) = &self.calendar_access_token {
            transport = transport.with_bearer_token(token);
        }
        Ok(Some(transport))
    }
}

fn parse_url(setting: &'static str, raw: Option<&str>) -> Result<Option<Url>, SettingsError> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            Url::parse(value).map_err(|source| SettingsError::InvalidUrl { setting, source })
        })
        .transpose()
}

fn minutes(setting: &'static str, value: i64) -> Result<TimeDelta, ConfigError> {
    TimeDelta::try_minutes(value).ok_or(ConfigError::OutOfRange { setting })
}

impl MembershipConfig {
    /// Build the service configuration from loaded settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for malformed thresholds and for durations
    /// that are not positive or do not fit a time span.
    pub fn from_settings(settings: &MembershipSettings) -> Result<Self, ConfigError> {
        let calendar_window = TimeDelta::try_days(settings.calendar_window_days()).ok_or(
            ConfigError::OutOfRange {
                setting: "calendar window",
            },
        )?;
        Self::new(
            minutes("token lifetime", settings.token_lifetime_minutes())?,
            minutes("session extension", settings.session_extension_minutes())?,
            calendar_window,
            settings.default_level().trim(),
            parse_level_thresholds(settings.level_thresholds())?,
        )
    }
}
