//! Core domain types for the Civy ledger.
//!
//! This module defines the fundamental types used throughout the system:
//! - Resources and holdings (the balance fields of an account)
//! - Accounts and the ledger that keys them by user
//! - Requests and typed outcomes exchanged with the dispatch front end

use crate::Error;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Resource Types
// ============================================================================

/// A resource that can be mined or claimed
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Wood,
    Stone,
    Iron,
}

impl Resource {
    pub const ALL: [Resource; 3] = [Resource::Wood, Resource::Stone, Resource::Iron];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Wood => "wood",
            Resource::Stone => "stone",
            Resource::Iron => "iron",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = Error;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "wood" => Ok(Resource::Wood),
            "stone" => Ok(Resource::Stone),
            "iron" => Ok(Resource::Iron),
            _ => Err(Error::InvalidResource(s.to_string())),
        }
    }
}

/// Any balance field of an account
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Holding {
    Gold,
    Wood,
    Stone,
    Iron,
}

impl Holding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Holding::Gold => "gold",
            Holding::Wood => "wood",
            Holding::Stone => "stone",
            Holding::Iron => "iron",
        }
    }
}

impl From<Resource> for Holding {
    fn from(resource: Resource) -> Self {
        match resource {
            Resource::Wood => Holding::Wood,
            Resource::Stone => Holding::Stone,
            Resource::Iron => Holding::Iron,
        }
    }
}

impl fmt::Display for Holding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Holding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("gold") {
            return Ok(Holding::Gold);
        }
        s.parse::<Resource>().map(Holding::from)
    }
}

// ============================================================================
// Account and Ledger
// ============================================================================

/// Balances held by a single user
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Account {
    #[serde(default)]
    pub gold: u64,
    #[serde(default)]
    pub wood: u64,
    #[serde(default)]
    pub stone: u64,
    #[serde(default)]
    pub iron: u64,
    #[serde(
        default,
        alias = "lastDailyClaim",
        deserialize_with = "crate::types::timestamp::deserialize_opt"
    )]
    pub last_daily: Option<DateTime<Utc>>,
}

impl Account {
    /// A fresh account with the given starting gold and no resources
    pub fn new(starting_gold: u64) -> Self {
        Self {
            gold: starting_gold,
            ..Self::default()
        }
    }

    pub fn balance(&self, holding: Holding) -> u64 {
        match holding {
            Holding::Gold => self.gold,
            Holding::Wood => self.wood,
            Holding::Stone => self.stone,
            Holding::Iron => self.iron,
        }
    }

    pub(crate) fn balance_mut(&mut self, holding: Holding) -> &mut u64 {
        match holding {
            Holding::Gold => &mut self.gold,
            Holding::Wood => &mut self.wood,
            Holding::Stone => &mut self.stone,
            Holding::Iron => &mut self.iron,
        }
    }
}

/// Every account, keyed by user identifier
///
/// Backed by a `BTreeMap` so that equal ledgers always serialize to the
/// same bytes.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Ledger {
    accounts: BTreeMap<String, Account>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: &str) -> Option<&Account> {
        self.accounts.get(user_id)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Account)> {
        self.accounts.iter()
    }

    pub(crate) fn accounts_mut(&mut self) -> &mut BTreeMap<String, Account> {
        &mut self.accounts
    }
}

// ============================================================================
// Requests and Outcomes
// ============================================================================

/// Actions understood by the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Balance,
    QuickMine,
    Daily,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Balance => "balance",
            Action::QuickMine => "quickmine",
            Action::Daily => "daily",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "balance" => Some(Action::Balance),
            "quickmine" => Some(Action::QuickMine),
            "daily" => Some(Action::Daily),
            _ => None,
        }
    }
}

/// An already-parsed command delivered by the dispatch front end
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub action: String,
    pub user_id: String,
    pub argument: Option<String>,
}

impl Request {
    pub fn new(
        action: impl Into<String>,
        user_id: impl Into<String>,
        argument: Option<String>,
    ) -> Self {
        Self {
            action: action.into(),
            user_id: user_id.into(),
            argument,
        }
    }
}

/// Immutable read of an account's balances
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BalanceSnapshot {
    pub gold: u64,
    pub wood: u64,
    pub stone: u64,
    pub iron: u64,
    pub last_daily: Option<DateTime<Utc>>,
}

impl From<&Account> for BalanceSnapshot {
    fn from(account: &Account) -> Self {
        Self {
            gold: account.gold,
            wood: account.wood,
            stone: account.stone,
            iron: account.iron,
            last_daily: account.last_daily,
        }
    }
}

/// Result of a quick mine request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MineOutcome {
    Mined {
        resource: Resource,
        amount: u64,
        new_total: u64,
    },
    InvalidResource {
        argument: String,
    },
    CooldownActive {
        remaining: Duration,
    },
}

/// Result of a daily claim request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DailyOutcome {
    Claimed {
        resource: Resource,
        amount: u64,
        new_total: u64,
    },
    InvalidResource {
        argument: String,
    },
    AlreadyClaimed {
        available_at: DateTime<Utc>,
    },
}

/// Outcome of handling a [`Request`]
///
/// The front end renders these; the core never produces user-facing text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Balance(BalanceSnapshot),
    Mine(MineOutcome),
    Daily(DailyOutcome),
    MissingArgument { action: Action },
    UnknownAction { name: String },
    /// The action did not take effect (persistence or balance error)
    Failed,
}

// ============================================================================
// Timestamp compatibility
// ============================================================================

pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    /// Accepts RFC 3339 timestamps and naive ISO-8601 ones (read as UTC).
    pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) => parse(&s).map(Some).map_err(serde::de::Error::custom),
        }
    }

    pub fn parse(s: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|e| format!("invalid timestamp {:?}: {}", s, e))
    }
}
