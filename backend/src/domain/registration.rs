//! Membership registration state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entity::Mappable;
use crate::domain::mapping::{Fields, timestamp_value};

pub(crate) const LEVEL_FIELD: &str = "level";
pub(crate) const REGISTRATION_STATUS_FIELD: &str = "registrationStatus";
pub(crate) const WAIVER_SIGNED_FIELD: &str = "waiverSigned";
pub(crate) const WAIVER_DATE_FIELD: &str = "waiverDate";
pub(crate) const WAIVER_PDF_LINK_FIELD: &str = "waiverPdfLink";

/// Registration progress, ordered from first contact to full membership.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    /// Contact known, nothing submitted.
    #[default]
    New,
    /// Application submitted.
    Applied,
    /// Waiver or payment outstanding.
    Pending,
    /// Full member.
    Registered,
}

impl RegistrationStatus {
    /// Stored spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Applied => "APPLIED",
            Self::Pending => "PENDING",
            Self::Registered => "REGISTERED",
        }
    }

    /// Parse a stored status, ignoring case.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "NEW" => Some(Self::New),
            "APPLIED" => Some(Self::Applied),
            "PENDING" => Some(Self::Pending),
            "REGISTERED" => Some(Self::Registered),
            _ => None,
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A member's registration: tier, progress and waiver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    level: String,
    status: RegistrationStatus,
    waiver_signed: bool,
    waiver_date: Option<DateTime<Utc>>,
    waiver_pdf_link: Option<String>,
}

impl Registration {
    /// Fresh registration at `level`.
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Self::default()
        }
    }

    /// Membership tier.
    pub fn level(&self) -> &str {
        &self.level
    }

    /// Current registration stage.
    pub fn status(&self) -> RegistrationStatus {
        self.status
    }

    /// Whether the liability waiver is signed.
    pub fn waiver_signed(&self) -> bool {
        self.waiver_signed
    }

    /// When the waiver was signed.
    pub fn waiver_date(&self) -> Option<DateTime<Utc>> {
        self.waiver_date
    }

    /// Link to the rendered waiver.
    pub fn waiver_pdf_link(&self) -> Option<&str> {
        self.waiver_pdf_link.as_deref()
    }

    /// Move forward to `target`; earlier targets are ignored.
    ///
    /// Returns whether the status changed.
    pub fn escalate_to(&mut self, target: RegistrationStatus) -> bool {
        if target > self.status {
            self.status = target;
            true
        } else {
            false
        }
    }

    /// Administrative write, bypassing the forward-only rule.
    pub fn set_status(&mut self, status: RegistrationStatus) {
        self.status = status;
    }

    /// Change the membership tier.
    pub fn set_level(&mut self, level: impl Into<String>) {
        self.level = level.into();
    }

    /// Record a signed waiver and its rendered document.
    pub fn record_waiver(&mut self, signed_at: DateTime<Utc>, pdf_link: impl Into<String>) {
        self.waiver_signed = true;
        self.waiver_date = Some(signed_at);
        self.waiver_pdf_link = Some(pdf_link.into());
    }
}

impl Mappable for Registration {
    const KIND: &'static str = "registration";

    fn to_fields(&self) -> Fields {
        let mut fields = Fields::new()
            .with(LEVEL_FIELD, self.level.as_str())
            .with(REGISTRATION_STATUS_FIELD, self.status.as_str())
            .with(WAIVER_SIGNED_FIELD, self.waiver_signed);
        fields.insert_opt(WAIVER_DATE_FIELD, self.waiver_date.as_ref().map(timestamp_value));
        fields.insert_opt(WAIVER_PDF_LINK_FIELD, self.waiver_pdf_link.clone());
        fields
    }

    fn from_fields(fields: &Fields) -> Self {
        Self {
            level: fields.text(LEVEL_FIELD),
            status: RegistrationStatus::parse(&fields.text(REGISTRATION_STATUS_FIELD))
                .unwrap_or_default(),
            waiver_signed: fields.flag(WAIVER_SIGNED_FIELD),
            waiver_date: fields.timestamp(WAIVER_DATE_FIELD),
            waiver_pdf_link: fields.opt_text(WAIVER_PDF_LINK_FIELD),
        }
    }
}
