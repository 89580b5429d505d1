//! Explicit configuration handed to the business services.
//!
//! There is no shared global settings object: callers build one
//! [`MembershipConfig`] (usually from
//! [`MembershipSettings`](crate::settings::MembershipSettings)) and pass it to
//! each service at construction.

use std::str::FromStr;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Default lifetime of a freshly issued login token.
pub const DEFAULT_TOKEN_LIFETIME_MINUTES: i64 = 15;
/// Default session length granted once a token is verified.
pub const DEFAULT_SESSION_EXTENSION_MINUTES: i64 = 240;
/// Default look-ahead window for event listings.
pub const DEFAULT_CALENDAR_WINDOW_DAYS: i64 = 90;
/// Default membership tier for new members.
pub const DEFAULT_LEVEL: &str = "basic";
/// Default tier price list, `level:minimum_cents` pairs.
pub const DEFAULT_LEVEL_THRESHOLDS: &str = "basic:0,family:4500,supporting:10000";

/// Errors raised while building a [`MembershipConfig`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A threshold entry is not `level:cents`.
    #[error("malformed level threshold `{entry}`; expected `level:cents`")]
    MalformedThreshold {
        /// Offending entry.
        entry: String,
    },
    /// The same level was listed twice.
    #[error("level `{level}` is listed more than once")]
    DuplicateLevel {
        /// Repeated level.
        level: String,
    },
    /// A duration setting was zero or negative.
    #[error("{setting} must be positive")]
    NonPositive {
        /// Setting name.
        setting: &'static str,
    },
    /// A duration setting does not fit a time span.
    #[error("{setting} is out of range")]
    OutOfRange {
        /// Setting name.
        setting: &'static str,
    },
}

/// Minimum payment, in cents, that qualifies for a membership level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelThreshold {
    /// Tier name.
    pub level: String,
    /// Lowest qualifying payment in cents.
    pub minimum_cents: i64,
}

impl FromStr for LevelThreshold {
    type Err = ConfigError;

    fn from_str(entry: &str) -> Result<Self, Self::Err> {
        let malformed = || ConfigError::MalformedThreshold {
            entry: entry.trim().to_owned(),
        };
        let (level, cents) = entry.split_once(':').ok_or_else(malformed)?;
        let level = level.trim();
        if level.is_empty() {
            return Err(malformed());
        }
        let minimum_cents: i64 = cents.trim().parse().map_err(|_| malformed())?;
        if minimum_cents < 0 {
            return Err(malformed());
        }
        Ok(Self {
            level: level.to_owned(),
            minimum_cents,
        })
    }
}

/// Parse a comma-separated `level:cents` list, ordered by ascending price.
///
/// # Errors
///
/// Returns [`ConfigError`] for malformed entries or repeated levels.
pub fn parse_level_thresholds(raw: &str) -> Result<Vec<LevelThreshold>, ConfigError> {
    let mut thresholds = raw
        .split(',')
        .filter(|entry| !entry.trim().is_empty())
        .map(LevelThreshold::from_str)
        .collect::<Result<Vec<_>, _>>()?;
    thresholds.sort_by_key(|threshold| threshold.minimum_cents);
    for (index, threshold) in thresholds.iter().enumerate() {
        if thresholds
            .iter()
            .skip(index + 1)
            .any(|other| other.level == threshold.level)
        {
            return Err(ConfigError::DuplicateLevel {
                level: threshold.level.clone(),
            });
        }
    }
    Ok(thresholds)
}

/// Business rules for login sessions, event listings and membership tiers.
///
/// # Examples
/// ```
/// use membership::domain::MembershipConfig;
///
/// let config = MembershipConfig::default();
/// assert_eq!(config.level_for_amount(5_000), "family");
/// assert_eq!(config.price_for_level("supporting"), Some(10_000));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipConfig {
    token_lifetime: TimeDelta,
    session_extension: TimeDelta,
    calendar_window: TimeDelta,
    default_level: String,
    level_thresholds: Vec<LevelThreshold>,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            token_lifetime: TimeDelta::minutes(DEFAULT_TOKEN_LIFETIME_MINUTES),
            session_extension: TimeDelta::minutes(DEFAULT_SESSION_EXTENSION_MINUTES),
            calendar_window: TimeDelta::days(DEFAULT_CALENDAR_WINDOW_DAYS),
            default_level: DEFAULT_LEVEL.to_owned(),
            level_thresholds: parse_level_thresholds(DEFAULT_LEVEL_THRESHOLDS)
                .unwrap_or_default(),
        }
    }
}

impl MembershipConfig {
    /// Build a configuration from explicit values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NonPositive`] when a duration is not positive.
    pub fn new(
        token_lifetime: TimeDelta,
        session_extension: TimeDelta,
        calendar_window: TimeDelta,
        default_level: impl Into<String>,
        mut level_thresholds: Vec<LevelThreshold>,
    ) -> Result<Self, ConfigError> {
        for (setting, value) in [
            ("token lifetime", token_lifetime),
            ("session extension", session_extension),
            ("calendar window", calendar_window),
        ] {
            if value <= TimeDelta::zero() {
                return Err(ConfigError::NonPositive { setting });
            }
        }
        level_thresholds.sort_by_key(|threshold| threshold.minimum_cents);
        Ok(Self {
            token_lifetime,
            session_extension,
            calendar_window,
            default_level: default_level.into(),
            level_thresholds,
        })
    }

    /// Lifetime of a freshly issued login token.
    pub fn token_lifetime(&self) -> TimeDelta {
        self.token_lifetime
    }

    /// Session length granted once a token is verified.
    pub fn session_extension(&self) -> TimeDelta {
        self.session_extension
    }

    /// Look-ahead window for event listings.
    pub fn calendar_window(&self) -> TimeDelta {
        self.calendar_window
    }

    /// Tier assigned to new members.
    pub fn default_level(&self) -> &str {
        &self.default_level
    }

    /// Tier price list, cheapest first.
    pub fn level_thresholds(&self) -> &[LevelThreshold] {
        &self.level_thresholds
    }

    /// Highest level whose minimum `amount_cents` reaches; the default level
    /// when none does.
    pub fn level_for_amount(&self, amount_cents: i64) -> &str {
        self.level_thresholds
            .iter()
            .rev()
            .find(|threshold| amount_cents >= threshold.minimum_cents)
            .map_or(self.default_level.as_str(), |threshold| {
                threshold.level.as_str()
            })
    }

    /// Minimum price of `level`, if it is a configured tier.
    pub fn price_for_level(&self, level: &str) -> Option<i64> {
        self.level_thresholds
            .iter()
            .find(|threshold| threshold.level.eq_ignore_ascii_case(level.trim()))
            .map(|threshold| threshold.minimum_cents)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[test]
    fn defaults_match_documented_values() {
        let config = MembershipConfig::default();
        assert_eq!(config.token_lifetime(), TimeDelta::minutes(15));
        assert_eq!(config.session_extension(), TimeDelta::hours(4));
        assert_eq!(config.calendar_window(), TimeDelta::days(90));
        assert_eq!(config.level_thresholds().len(), 3);
    }

    #[rstest]
    #[case(0, "basic")]
    #[case(4_499, "basic")]
    #[case(4_500, "family")]
    #[case(25_000, "supporting")]
    #[case(-5, "basic")]
    fn amounts_select_the_highest_reached_level(#[case] cents: i64, #[case] level: &str) {
        assert_eq!(MembershipConfig::default().level_for_amount(cents), level);
    }

    #[rstest]
    #[case("basic")]
    #[case("gold:")]
    #[case(":100")]
    #[case("gold:-1")]
    #[case("gold:ten")]
    fn malformed_thresholds_are_rejected(#[case] raw: &str) {
        assert!(matches!(
            parse_level_thresholds(raw),
            Err(ConfigError::MalformedThreshold { .. })
        ));
    }

    #[test]
    fn thresholds_are_sorted_by_price() {
        let thresholds = parse_level_thresholds("gold:900, bronze:100 ,silver:500").expect("valid");
        let levels: Vec<_> = thresholds.iter().map(|t| t.level.as_str()).collect();
        assert_eq!(levels, ["bronze", "silver", "gold"]);
    }

    #[test]
    fn duplicate_levels_are_rejected() {
        assert_eq!(
            parse_level_thresholds("gold:1,gold:2"),
            Err(ConfigError::DuplicateLevel {
                level: "gold".into()
            })
        );
    }

    #[test]
    fn non_positive_durations_are_rejected() {
        let result = MembershipConfig::new(
            TimeDelta::zero(),
            TimeDelta::hours(4),
            TimeDelta::days(1),
            "basic",
            Vec::new(),
        );
        assert_eq!(
            result,
            Err(ConfigError::NonPositive {
                setting: "token lifetime"
            })
        );
    }

    #[test]
    fn unknown_level_has_no_price() {
        assert_eq!(MembershipConfig::default().price_for_level("platinum"), None);
    }
}
