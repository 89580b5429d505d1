//! Member entity body: contact details plus login and registration state.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::entity::Mappable;
use crate::domain::login::Login;
use crate::domain::mapping::Fields;
use crate::domain::registration::Registration;

/// Local field name of the member's email address.
pub const EMAIL_FIELD: &str = "emailAddress";
pub(crate) const FIRST_NAME_FIELD: &str = "firstName";
pub(crate) const LAST_NAME_FIELD: &str = "lastName";
pub(crate) const PHONE_FIELD: &str = "phoneNumber";
pub(crate) const ADDRESS_FIELD: &str = "address";
pub(crate) const INTERESTS_FIELD: &str = "interests";

/// Validation errors returned by [`EmailAddress::parse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemberValidationError {
    /// The address was blank once trimmed.
    #[error("email address must not be empty")]
    EmptyEmail,
    /// The address does not look like `local@domain.tld`.
    #[error("email address is malformed: {0}")]
    MalformedEmail(String),
}

// Loose on purpose: one `@`, no whitespace, a dot in the domain.
const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

/// Compiled [`EMAIL_PATTERN`].
///
/// # Panics
///
/// Only if the constant pattern fails to compile, which the unit tests rule
/// out.
fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("valid email regex"))
}

/// Normalised email address.
///
/// Construction through [`EmailAddress::new`] never fails: malformed input
/// yields a blank address, which callers check with
/// [`EmailAddress::is_blank`]. Use [`EmailAddress::parse`] when a typed
/// rejection is needed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Trim and lowercase `raw`, blanking it when it is not an address.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self::parse(raw).unwrap_or_default()
    }

    /// Strict constructor.
    ///
    /// # Errors
    ///
    /// Returns [`MemberValidationError`] when `raw` is blank or malformed.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, MemberValidationError> {
        let normalized = raw.as_ref().trim().to_lowercase();
        if normalized.is_empty() {
            return Err(MemberValidationError::EmptyEmail);
        }
        if !email_regex().is_match(&normalized) {
            return Err(MemberValidationError::MalformedEmail(normalized));
        }
        Ok(Self(normalized))
    }

    /// Borrow the address text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Whether the address was rejected or never set.
    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for EmailAddress {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Contact details a member supplies when registering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemberProfile {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact phone number, free-form.
    pub phone_number: String,
    /// Postal address, free-form.
    pub address: String,
    /// Activity interests.
    pub interests: Vec<String>,
}

/// A member of the organisation.
///
/// ## Invariants
/// - `email_address` is lowercase and either blank or well formed.
/// - Login state only changes through the membership service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    email_address: EmailAddress,
    #[serde(flatten)]
    profile: MemberProfile,
    login: Login,
    registration: Registration,
}

impl Member {
    /// New member at the default `level`, with a fresh login.
    pub fn new(email: impl AsRef<str>, level: impl Into<String>) -> Self {
        Self {
            email_address: EmailAddress::new(email),
            profile: MemberProfile::default(),
            login: Login::default(),
            registration: Registration::new(level),
        }
    }

    /// Email address; blank when the supplied value was malformed.
    pub fn email_address(&self) -> &EmailAddress {
        &self.email_address
    }

    /// Contact details.
    pub fn profile(&self) -> &MemberProfile {
        &self.profile
    }

    /// Replace the contact details.
    pub fn set_profile(&mut self, profile: MemberProfile) {
        self.profile = profile;
    }

    /// Builder form of [`Member::set_profile`].
    pub fn with_profile(mut self, profile: MemberProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Login state.
    pub fn login(&self) -> &Login {
        &self.login
    }

    pub(crate) fn login_mut(&mut self) -> &mut Login {
        &mut self.login
    }

    /// Registration state.
    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    /// Mutable registration state.
    pub fn registration_mut(&mut self) -> &mut Registration {
        &mut self.registration
    }

    /// `"first last"`, skipping blank parts.
    pub fn full_name(&self) -> String {
        [self.profile.first_name.trim(), self.profile.last_name.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Copy safe to hand to clients: the login token is removed.
    pub fn redacted(&self) -> Self {
        Self {
            login: self.login.redacted(),
            ..self.clone()
        }
    }
}

impl Mappable for Member {
    const KIND: &'static str = "member";

    fn to_fields(&self) -> Fields {
        let mut fields = Fields::new()
            .with(EMAIL_FIELD, self.email_address.as_str())
            .with(FIRST_NAME_FIELD, self.profile.first_name.as_str())
            .with(LAST_NAME_FIELD, self.profile.last_name.as_str())
            .with(PHONE_FIELD, self.profile.phone_number.as_str())
            .with(ADDRESS_FIELD, self.profile.address.as_str())
            .with(INTERESTS_FIELD, self.profile.interests.clone());
        fields.merge(self.login.to_fields());
        fields.merge(self.registration.to_fields());
        fields
    }

    fn from_fields(fields: &Fields) -> Self {
        Self {
            email_address: EmailAddress::new(fields.text(EMAIL_FIELD)),
            profile: MemberProfile {
                first_name: fields.text(FIRST_NAME_FIELD),
                last_name: fields.text(LAST_NAME_FIELD),
                phone_number: fields.text(PHONE_FIELD),
                address: fields.text(ADDRESS_FIELD),
                interests: fields.list(INTERESTS_FIELD),
            },
            login: Login::from_fields(fields),
            registration: Registration::from_fields(fields),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::login::{Authentication, LoginStatus, LoginToken};
    use chrono::Utc;
    use rstest::rstest;

    #[test]
    fn email_pattern_compiles() {
        assert!(Regex::new(EMAIL_PATTERN).is_ok());
    }

    #[rstest]
    #[case(" Ada@Example.ORG ", "ada@example.org")]
    #[case("not-an-address", "")]
    #[case("two@@signs.org", "")]
    #[case("missing@tld", "")]
    #[case("", "")]
    fn email_is_normalised_or_blanked(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(EmailAddress::new(raw).as_str(), expected);
    }

    #[rstest]
    #[case("", MemberValidationError::EmptyEmail)]
    #[case("nope", MemberValidationError::MalformedEmail("nope".into()))]
    fn strict_parse_reports_the_reason(#[case] raw: &str, #[case] expected: MemberValidationError) {
        assert_eq!(EmailAddress::parse(raw), Err(expected));
    }

    fn sample_member() -> Member {
        let mut member = Member::new("a@b.org", "basic").with_profile(MemberProfile {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            phone_number: "555-0100".into(),
            address: "12 Analytical Row".into(),
            interests: vec!["hiking".into(), "paddling".into()],
        });
        member.login_mut().set_status(LoginStatus::Verifying);
        member.login_mut().set_authentication(Authentication::new(
            LoginToken::new("123456").expect("token"),
            Utc::now(),
        ));
        member
    }

    #[test]
    fn fields_round_trip() {
        let member = sample_member();
        assert_eq!(Member::from_fields(&member.to_fields()), member);
    }

    #[test]
    fn redaction_keeps_status_but_drops_token() {
        let redacted = sample_member().redacted();
        assert_eq!(redacted.login().status(), LoginStatus::Verifying);
        assert!(redacted.login().authentication().is_none());
        assert_eq!(redacted.full_name(), "Ada Lovelace");
    }

    #[test]
    fn full_name_skips_blank_parts() {
        let member = Member::new("a@b.org", "basic").with_profile(MemberProfile {
            last_name: "Hopper".into(),
            ..MemberProfile::default()
        });
        assert_eq!(member.full_name(), "Hopper");
    }
}
