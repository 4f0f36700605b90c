// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Monthly usage quotas.
//!
//! Each actor (doctor or hospital) has one usage record per calendar month,
//! keyed by `YYYY-MM`. A limit of [`UNLIMITED`] disables the cap.

use crate::calendar::format_date;
use crate::error::DomainError;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Sentinel limit meaning "no cap".
pub const UNLIMITED: i32 = -1;

/// Which kind of party a quota belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    Doctor,
    Hospital,
}

impl ActorKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Doctor => "doctor",
            Self::Hospital => "hospital",
        }
    }
}

impl FromStr for ActorKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "doctor" => Ok(Self::Doctor),
            "hospital" => Ok(Self::Hospital),
            _ => Err(DomainError::InvalidActorKind(s.to_string())),
        }
    }
}

impl std::fmt::Display for ActorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Subscription plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Free,
    Basic,
    Premium,
    Enterprise,
}

impl PlanTier {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Basic => "basic",
            Self::Premium => "premium",
            Self::Enterprise => "enterprise",
        }
    }
}

impl FromStr for PlanTier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Self::Free),
            "basic" => Ok(Self::Basic),
            "premium" => Ok(Self::Premium),
            "enterprise" => Ok(Self::Enterprise),
            _ => Err(DomainError::InvalidPlanTier(s.to_string())),
        }
    }
}

/// Subscription lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "cancelled" => Ok(Self::Cancelled),
            "expired" => Ok(Self::Expired),
            _ => Err(DomainError::InvalidSubscriptionStatus(s.to_string())),
        }
    }
}

/// The resolved plan data for one actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSubscription {
    pub actor_id: i64,
    pub actor_kind: ActorKind,
    pub tier: PlanTier,
    pub status: SubscriptionStatus,
    /// Explicit feature limit; overrides the tier default when set.
    pub max_assignments_per_month: Option<i32>,
}

/// A calendar month key (`YYYY-MM`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Creates a month key.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidMonthKey` if the month is not 1-12.
    pub fn new(year: i32, month: u32) -> Result<Self, DomainError> {
        if !(1..=12).contains(&month) || !(1..=9999).contains(&year) {
            return Err(DomainError::InvalidMonthKey(format!("{year:04}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    /// Returns the month containing `date`.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month
    }

    /// Returns the following month.
    #[must_use]
    pub const fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Returns the first day of this month.
    ///
    /// # Errors
    ///
    /// Returns an error if the date is outside chrono's range.
    pub fn first_day(&self) -> Result<NaiveDate, DomainError> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).ok_or_else(|| {
            DomainError::DateArithmeticOverflow {
                operation: format!("computing first day of {self}"),
            }
        })
    }

    /// Returns the date the counter for this month resets (first of next month).
    ///
    /// # Errors
    ///
    /// Returns an error if the date is outside chrono's range.
    pub fn reset_date(&self) -> Result<NaiveDate, DomainError> {
        self.next().first_day()
    }

    /// Returns the reset date formatted for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the date is outside chrono's range.
    pub fn reset_date_string(&self) -> Result<String, DomainError> {
        Ok(format_date(self.reset_date()?))
    }
}

impl FromStr for MonthKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::InvalidMonthKey(s.to_string());
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl std::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// How close an actor is to their monthly limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageBand {
    /// Below 60%.
    Ok,
    /// 60% to 79%.
    Warning,
    /// 80% to 99%.
    Critical,
    /// Limit reached.
    Reached,
}

impl UsageBand {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Reached => "reached",
        }
    }
}

/// One actor's counter for one month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    pub actor_id: i64,
    pub actor_kind: ActorKind,
    pub month: MonthKey,
    pub count: i32,
    /// Effective limit, or [`UNLIMITED`].
    pub limit: i32,
}

impl UsageRecord {
    /// Creates a fresh record with a zero count.
    #[must_use]
    pub const fn fresh(actor_id: i64, actor_kind: ActorKind, month: MonthKey, limit: i32) -> Self {
        Self {
            actor_id,
            actor_kind,
            month,
            count: 0,
            limit,
        }
    }

    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        self.limit == UNLIMITED
    }

    /// Fails if one more assignment would exceed the limit.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::QuotaExceeded` when `count >= limit`.
    pub const fn check_capacity(&self) -> Result<(), DomainError> {
        if !self.is_unlimited() && self.count >= self.limit {
            return Err(DomainError::QuotaExceeded {
                used: self.count,
                limit: self.limit,
            });
        }
        Ok(())
    }

    /// Remaining capacity, or [`UNLIMITED`].
    #[must_use]
    pub fn remaining(&self) -> i32 {
        if self.is_unlimited() {
            UNLIMITED
        } else {
            (self.limit - self.count).max(0)
        }
    }

    /// Usage as a whole percentage, rounded half up; 0 when unlimited.
    #[must_use]
    pub fn percentage(&self) -> i32 {
        if self.is_unlimited() {
            return 0;
        }
        if self.limit <= 0 {
            return 100;
        }
        let count: i64 = i64::from(self.count.max(0));
        let limit: i64 = i64::from(self.limit);
        let rounded: i64 = (count * 200 + limit) / (limit * 2);
        i32::try_from(rounded).unwrap_or(i32::MAX)
    }

    /// The usage band.
    #[must_use]
    pub fn band(&self) -> UsageBand {
        if self.is_unlimited() {
            return UsageBand::Ok;
        }
        if self.count >= self.limit {
            return UsageBand::Reached;
        }
        match self.percentage() {
            p if p >= 80 => UsageBand::Critical,
            p if p >= 60 => UsageBand::Warning,
            _ => UsageBand::Ok,
        }
    }
}
