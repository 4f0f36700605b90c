// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Recurring availability templates and their firing rules.
//!
//! A template fires on a date when the date is inside its validity window
//! and the recurrence pattern matches:
//!
//! - `daily`: every date.
//! - `weekly` / `custom`: the date's weekday tag is in the template's days.
//! - `monthly`: the day-of-month equals `valid_from`'s day-of-month.
//!
//! Weekday tags are the lowercase three-letter names `sun`..`sat`.

use crate::calendar::format_date;
use crate::error::DomainError;
use crate::slot::TimeRange;
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a template repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrencePattern {
    Daily,
    Weekly,
    Monthly,
    Custom,
}

impl RecurrencePattern {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Custom => "custom",
        }
    }

    /// Returns true if the pattern selects dates by weekday tag.
    #[must_use]
    pub const fn uses_days(&self) -> bool {
        matches!(self, Self::Weekly | Self::Custom)
    }
}

impl FromStr for RecurrencePattern {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "custom" => Ok(Self::Custom),
            _ => Err(DomainError::InvalidRecurrencePattern(s.to_string())),
        }
    }
}

/// Returns the weekday tag for a weekday.
#[must_use]
pub const fn weekday_tag(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "sun",
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
    }
}

/// Parses a weekday tag, ignoring case and surrounding whitespace.
///
/// # Errors
///
/// Returns `DomainError::InvalidWeekdayTag` if the tag is not `sun`..`sat`.
pub fn parse_weekday_tag(tag: &str) -> Result<Weekday, DomainError> {
    match tag.trim().to_lowercase().as_str() {
        "sun" => Ok(Weekday::Sun),
        "mon" => Ok(Weekday::Mon),
        "tue" => Ok(Weekday::Tue),
        "wed" => Ok(Weekday::Wed),
        "thu" => Ok(Weekday::Thu),
        "fri" => Ok(Weekday::Fri),
        "sat" => Ok(Weekday::Sat),
        _ => Err(DomainError::InvalidWeekdayTag(tag.to_string())),
    }
}

/// Parses a comma-separated list of weekday tags.
///
/// Empty entries are skipped; duplicates collapse.
///
/// # Errors
///
/// Returns an error on the first unrecognized tag.
pub fn parse_recurrence_days(value: &str) -> Result<Vec<Weekday>, DomainError> {
    let mut days: Vec<Weekday> = Vec::new();
    for tag in value.split(',').filter(|t| !t.trim().is_empty()) {
        let day: Weekday = parse_weekday_tag(tag)?;
        if !days.contains(&day) {
            days.push(day);
        }
    }
    Ok(days)
}

/// Formats weekday tags for storage.
#[must_use]
pub fn format_recurrence_days(days: &[Weekday]) -> String {
    days.iter()
        .map(|d| weekday_tag(*d))
        .collect::<Vec<&str>>()
        .join(",")
}

/// A doctor's recurring availability rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityTemplate {
    /// Canonical identifier, `None` before persistence.
    pub template_id: Option<i64>,
    pub doctor_id: i64,
    pub name: String,
    pub pattern: RecurrencePattern,
    /// Weekdays used by `weekly` and `custom` patterns.
    pub days: Vec<Weekday>,
    pub range: TimeRange,
    pub valid_from: NaiveDate,
    /// Inclusive last date; `None` is open-ended.
    pub valid_until: Option<NaiveDate>,
    /// Inactive templates are ignored by expansion.
    pub is_active: bool,
}

impl AvailabilityTemplate {
    /// Creates a new active template.
    ///
    /// # Arguments
    ///
    /// * `doctor_id` - The owning doctor
    /// * `name` - Display name, must not be blank
    /// * `pattern` - The recurrence pattern
    /// * `days` - Weekdays for `weekly`/`custom` patterns
    /// * `range` - The wall-clock range each generated slot covers
    /// * `valid_from` - First date the template applies
    /// * `valid_until` - Optional last date the template applies
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank, the validity window is inverted,
    /// or a day-based pattern has no days.
    pub fn new(
        doctor_id: i64,
        name: &str,
        pattern: RecurrencePattern,
        days: Vec<Weekday>,
        range: TimeRange,
        valid_from: NaiveDate,
        valid_until: Option<NaiveDate>,
    ) -> Result<Self, DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::InvalidTemplateName(String::from(
                "Template name cannot be empty",
            )));
        }

        if let Some(until) = valid_until
            && until < valid_from
        {
            return Err(DomainError::InvalidValidityRange {
                valid_from: format_date(valid_from),
                valid_until: format_date(until),
            });
        }

        if pattern.uses_days() && days.is_empty() {
            return Err(DomainError::MissingRecurrenceDays);
        }

        Ok(Self {
            template_id: None,
            doctor_id,
            name: name.trim().to_string(),
            pattern,
            days,
            range,
            valid_from,
            valid_until,
            is_active: true,
        })
    }

    /// Returns the canonical ID, or 0 for an unpersisted template.
    #[must_use]
    pub fn id(&self) -> i64 {
        self.template_id.unwrap_or_default()
    }

    /// Returns true if `date` is inside the validity window.
    #[must_use]
    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        date >= self.valid_from && self.valid_until.is_none_or(|until| date <= until)
    }

    /// Returns true if the validity window intersects `[start, end]`.
    #[must_use]
    pub fn intersects(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.valid_from <= end && self.valid_until.is_none_or(|until| until >= start)
    }

    /// Returns true if the template generates a slot on `date`.
    #[must_use]
    pub fn fires_on(&self, date: NaiveDate) -> bool {
        if !self.is_valid_on(date) {
            return false;
        }

        match self.pattern {
            RecurrencePattern::Daily => true,
            RecurrencePattern::Weekly | RecurrencePattern::Custom => {
                self.days.contains(&date.weekday())
            }
            RecurrencePattern::Monthly => date.day() == self.valid_from.day(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::calendar::parse_date;

    fn template(pattern: RecurrencePattern, days: &str) -> AvailabilityTemplate {
        AvailabilityTemplate::new(
            7,
            "Morning clinic",
            pattern,
            parse_recurrence_days(days).unwrap(),
            TimeRange::parse("09:00", "12:00").unwrap(),
            parse_date("2024-11-01").unwrap(),
            Some(parse_date("2024-12-31").unwrap()),
        )
        .unwrap()
    }

    #[test]
    fn test_weekday_tags_are_case_insensitive() {
        assert_eq!(
            parse_recurrence_days("Mon, WED,fri,").unwrap(),
            vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]
        );
        assert_eq!(
            format_recurrence_days(&[Weekday::Sun, Weekday::Sat]),
            "sun,sat"
        );
        assert!(parse_recurrence_days("monday").is_err());
    }

    #[test]
    fn test_weekly_fires_only_on_listed_days() {
        let t = template(RecurrencePattern::Weekly, "fri");
        // 2024-11-15 is a Friday.
        assert!(t.fires_on(parse_date("2024-11-15").unwrap()));
        assert!(!t.fires_on(parse_date("2024-11-16").unwrap()));
    }

    #[test]
    fn test_monthly_fires_on_valid_from_day_of_month() {
        let t = template(RecurrencePattern::Monthly, "");
        assert!(t.fires_on(parse_date("2024-12-01").unwrap()));
        assert!(!t.fires_on(parse_date("2024-12-02").unwrap()));
    }

    #[test]
    fn test_template_does_not_fire_outside_validity() {
        let t = template(RecurrencePattern::Daily, "");
        assert!(!t.fires_on(parse_date("2024-10-31").unwrap()));
        assert!(t.fires_on(parse_date("2024-12-31").unwrap()));
        assert!(!t.fires_on(parse_date("2025-01-01").unwrap()));
        assert!(t.intersects(
            parse_date("2024-12-30").unwrap(),
            parse_date("2025-01-05").unwrap()
        ));
        assert!(!t.intersects(
            parse_date("2025-01-01").unwrap(),
            parse_date("2025-01-05").unwrap()
        ));
    }

    #[test]
    fn test_weekly_template_requires_days() {
        let result = AvailabilityTemplate::new(
            7,
            "Empty",
            RecurrencePattern::Custom,
            Vec::new(),
            TimeRange::parse("09:00", "12:00").unwrap(),
            parse_date("2024-11-01").unwrap(),
            None,
        );
        assert_eq!(result, Err(DomainError::MissingRecurrenceDays));
    }
}
