//! User-selected predicates
//!
//! A [`FilterState`] is an immutable value. Changing the selection means
//! building a new state; nothing patches an existing one in place.

use crate::types::EntityId;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// The current set of active predicates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    /// Keep only users whose account flag equals this value
    #[serde(
        default,
        deserialize_with = "deserialize_flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub has_account: Option<bool>,

    /// Keep only users in this age band
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_band: Option<AgeBand>,

    /// Keep only check-ins (and their users' redemptions) at this activation
    #[serde(
        default,
        rename = "selectedActivationId",
        skip_serializing_if = "Option::is_none"
    )]
    pub selected_activation: Option<EntityId>,
}

impl FilterState {
    /// Create an empty filter state (no predicates)
    pub fn new() -> Self {
        Self::default()
    }

    /// Same as [`FilterState::new`]; reads better at call sites that reset
    pub fn cleared() -> Self {
        Self::default()
    }

    /// Builder method: set or clear the account predicate
    pub fn with_has_account(mut self, has_account: Option<bool>) -> Self {
        self.has_account = has_account;
        self
    }

    /// Builder method: set or clear the age band predicate
    pub fn with_age_band(mut self, age_band: Option<AgeBand>) -> Self {
        self.age_band = age_band;
        self
    }

    /// Builder method: set or clear the selected activation
    pub fn with_selected_activation(mut self, activation: Option<EntityId>) -> Self {
        self.selected_activation = activation;
        self
    }

    /// Select an activation, or clear the selection if it is already selected
    pub fn toggle_activation(self, activation: EntityId) -> Self {
        if self.selected_activation == Some(activation) {
            self.with_selected_activation(None)
        } else {
            self.with_selected_activation(Some(activation))
        }
    }

    /// True if any user-dimension predicate is set
    pub fn has_user_predicate(&self) -> bool {
        self.has_account.is_some() || self.age_band.is_some()
    }

    /// Number of active predicates
    pub fn active_count(&self) -> usize {
        [
            self.has_account.is_some(),
            self.age_band.is_some(),
            self.selected_activation.is_some(),
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }

    /// True if any predicate is set
    pub fn is_active(&self) -> bool {
        self.active_count() > 0
    }
}

/// Accept `true`/`false` as JSON booleans or strings; empty string means unset
fn deserialize_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawFlag {
        Bool(bool),
        Text(String),
    }

    match Option::<RawFlag>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawFlag::Bool(value)) => Ok(Some(value)),
        Some(RawFlag::Text(text)) => match text.trim() {
            "" => Ok(None),
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            other => Err(serde::de::Error::custom(format!(
                "expected true or false, got {:?}",
                other
            ))),
        },
    }
}

/// Age bands users are classified into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgeBand {
    #[serde(rename = "under18")]
    Under18,
    #[serde(rename = "18to24")]
    From18To24,
    #[serde(rename = "25to40")]
    From25To40,
    #[serde(rename = "41to59")]
    From41To59,
    #[serde(rename = "60plus")]
    SixtyPlus,
    /// No usable birth date
    #[serde(rename = "unknown")]
    Unknown,
}

impl AgeBand {
    pub const ALL: [AgeBand; 6] = [
        AgeBand::Under18,
        AgeBand::From18To24,
        AgeBand::From25To40,
        AgeBand::From41To59,
        AgeBand::SixtyPlus,
        AgeBand::Unknown,
    ];

    /// Band for an age in whole years
    pub fn from_age(age: i32) -> Self {
        match age {
            i32::MIN..=17 => AgeBand::Under18,
            18..=24 => AgeBand::From18To24,
            25..=40 => AgeBand::From25To40,
            41..=59 => AgeBand::From41To59,
            _ => AgeBand::SixtyPlus,
        }
    }

    /// Band of someone born on `birth_date`, evaluated on `as_of`
    pub fn classify(birth_date: Option<NaiveDate>, as_of: NaiveDate) -> Self {
        match birth_date {
            Some(birth) => Self::from_age(age_on(birth, as_of)),
            None => AgeBand::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AgeBand::Under18 => "under18",
            AgeBand::From18To24 => "18to24",
            AgeBand::From25To40 => "25to40",
            AgeBand::From41To59 => "41to59",
            AgeBand::SixtyPlus => "60plus",
            AgeBand::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AgeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AgeBand {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        AgeBand::ALL
            .into_iter()
            .find(|band| band.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown age band {:?} (expected one of under18, 18to24, 25to40, 41to59, 60plus, unknown)",
                    s
                )
            })
    }
}

/// Whole years between `birth` and `as_of`
///
/// One year is subtracted while this year's birthday has not been reached.
pub fn age_on(birth: NaiveDate, as_of: NaiveDate) -> i32 {
    let mut age = as_of.year() - birth.year();
    if (as_of.month(), as_of.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}
