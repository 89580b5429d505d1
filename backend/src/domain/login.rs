//! Member login state: status, one-time token and its expiry.
//!
//! The status only changes through
//! [`MembershipManager`](crate::domain::MembershipManager); the mutators here
//! are crate-private for that reason.

use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::entity::Mappable;
use crate::domain::mapping::{Fields, timestamp_value};

pub(crate) const LOGIN_STATUS_FIELD: &str = "loginStatus";
pub(crate) const AUTH_TOKEN_FIELD: &str = "authToken";
pub(crate) const AUTH_EXPIRATION_FIELD: &str = "authExpiration";
pub(crate) const LOGIN_ERRORS_FIELD: &str = "loginErrors";

/// Login status of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoginStatus {
    /// No login in progress.
    #[default]
    Unverified,
    /// A token was sent and awaits verification.
    Verifying,
    /// The member proved control of their address.
    Verified,
    /// The session outlived its token.
    TokenExpired,
    /// Administrative lockout.
    Remove,
}

impl LoginStatus {
    /// Stored spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unverified => "UNVERIFIED",
            Self::Verifying => "VERIFYING",
            Self::Verified => "VERIFIED",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::Remove => "REMOVE",
        }
    }

    /// Parse a stored status, ignoring case and surrounding whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "UNVERIFIED" => Some(Self::Unverified),
            "VERIFYING" => Some(Self::Verifying),
            "VERIFIED" => Some(Self::Verified),
            "TOKEN_EXPIRED" => Some(Self::TokenExpired),
            "REMOVE" => Some(Self::Remove),
            _ => None,
        }
    }
}

impl fmt::Display for LoginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a token is not six ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("login token must be six digits")]
pub struct LoginTokenError;

/// Six-digit numeric one-time token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LoginToken(String);

impl LoginToken {
    /// Validate a token.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, LoginTokenError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.len() == 6 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(trimmed.to_owned()))
        } else {
            Err(LoginTokenError)
        }
    }

    /// Token digits.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Compare with a caller-supplied token.
    pub fn matches(&self, supplied: &str) -> bool {
        self.0 == supplied.trim()
    }
}

impl TryFrom<String> for LoginToken {
    type Error = LoginTokenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LoginToken> for String {
    fn from(value: LoginToken) -> Self {
        value.0
    }
}

/// Source of fresh login tokens.
pub trait TokenSource: Send + Sync {
    /// Issue a token.
    fn next_token(&self) -> LoginToken;
}

/// Uniformly random tokens in `100000..=999999`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomTokenSource;

impl TokenSource for RandomTokenSource {
    fn next_token(&self) -> LoginToken {
        let value: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
        LoginToken(value.to_string())
    }
}

/// A token together with the instant it stops being valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Authentication {
    token: LoginToken,
    expiration_time: DateTime<Utc>,
}

impl Authentication {
    /// Pair `token` with its expiration instant.
    pub fn new(token: LoginToken, expiration_time: DateTime<Utc>) -> Self {
        Self {
            token,
            expiration_time,
        }
    }

    /// Issued token.
    pub fn token(&self) -> &LoginToken {
        &self.token
    }

    /// Instant the token stops being valid.
    pub fn expiration_time(&self) -> DateTime<Utc> {
        self.expiration_time
    }

    /// Live validity check; a token is expired from its expiration instant
    /// onward.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration_time
    }

    /// Same token, new expiration.
    pub fn extended_until(&self, expiration_time: DateTime<Utc>) -> Self {
        Self {
            token: self.token.clone(),
            expiration_time,
        }
    }
}

/// Login state held by a member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Login {
    status: LoginStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    authentication: Option<Authentication>,
    errors: Vec<String>,
}

impl Login {
    /// Current login state.
    pub fn status(&self) -> LoginStatus {
        self.status
    }

    /// Outstanding token, if one was issued.
    pub fn authentication(&self) -> Option<&Authentication> {
        self.authentication.as_ref()
    }

    /// Failed verification attempts since the last success.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Whether no unexpired token exists at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.authentication
            .as_ref()
            .is_none_or(|auth| auth.is_expired_at(now))
    }

    /// Copy without the token.
    pub fn redacted(&self) -> Self {
        Self {
            status: self.status,
            authentication: None,
            errors: self.errors.clone(),
        }
    }

    pub(crate) fn set_status(&mut self, status: LoginStatus) {
        self.status = status;
    }

    pub(crate) fn set_authentication(&mut self, authentication: Authentication) {
        self.authentication = Some(authentication);
    }

    pub(crate) fn record_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub(crate) fn clear_errors(&mut self) {
        self.errors.clear();
    }
}

impl Mappable for Login {
    const KIND: &'static str = "login";

    fn to_fields(&self) -> Fields {
        let mut fields = Fields::new().with(LOGIN_STATUS_FIELD, self.status.as_str());
        if let Some(auth) = &self.authentication {
            fields.insert(AUTH_TOKEN_FIELD, auth.token.as_str());
            fields.insert(AUTH_EXPIRATION_FIELD, timestamp_value(&auth.expiration_time));
        }
        fields.insert(
            LOGIN_ERRORS_FIELD,
            serde_json::Value::from(self.errors.clone()),
        );
        fields
    }

    fn from_fields(fields: &Fields) -> Self {
        let token = LoginToken::new(fields.text(AUTH_TOKEN_FIELD)).ok();
        let expiration = fields.timestamp(AUTH_EXPIRATION_FIELD);
        Self {
            status: LoginStatus::parse(&fields.text(LOGIN_STATUS_FIELD)).unwrap_or_default(),
            authentication: token
                .zip(expiration)
                .map(|(token, expiration)| Authentication::new(token, expiration)),
            errors: fields.list(LOGIN_ERRORS_FIELD),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use chrono::TimeDelta;
    use rstest::rstest;

    #[rstest]
    #[case("123456", true)]
    #[case(" 654321 ", true)]
    #[case("12345", false)]
    #[case("12345a", false)]
    #[case("", false)]
    fn tokens_must_be_six_digits(#[case] raw: &str, #[case] valid: bool) {
        assert_eq!(LoginToken::new(raw).is_ok(), valid);
    }

    #[test]
    fn random_tokens_stay_in_range() {
        let source = RandomTokenSource;
        for _ in 0..200 {
            let token = source.next_token();
            let value: u32 = token.as_str().parse().expect("numeric token");
            assert!((100_000..=999_999).contains(&value));
        }
    }

    #[test]
    fn expiry_is_exclusive_of_the_expiration_instant() {
        let now = Utc::now();
        let auth = Authentication::new(LoginToken::new("123456").expect("token"), now);
        assert!(!auth.is_expired_at(now - TimeDelta::seconds(1)));
        assert!(auth.is_expired_at(now));
        assert!(auth.is_expired_at(now + TimeDelta::seconds(1)));
    }

    #[test]
    fn missing_authentication_counts_as_expired() {
        assert!(Login::default().is_expired_at(Utc::now()));
    }

    #[test]
    fn fields_round_trip() {
        let mut login = Login::default();
        login.set_status(LoginStatus::Verifying);
        login.set_authentication(Authentication::new(
            LoginToken::new("123456").expect("token"),
            Utc::now(),
        ));
        login.record_error("invalid token");
        assert_eq!(Login::from_fields(&login.to_fields()), login);
    }

    #[rstest]
    #[case("verified", Some(LoginStatus::Verified))]
    #[case(" TOKEN_EXPIRED ", Some(LoginStatus::TokenExpired))]
    #[case("bogus", None)]
    fn status_parsing_is_lenient_about_case(
        #[case] raw: &str,
        #[case] expected: Option<LoginStatus>,
    ) {
        assert_eq!(LoginStatus::parse(raw), expected);
    }

    #[test]
    fn redaction_drops_token() {
        let mut login = Login::default();
        login.set_authentication(Authentication::new(
            LoginToken::new("123456").expect("token"),
            Utc::now(),
        ));
        assert!(login.redacted().authentication().is_none());
    }
}
