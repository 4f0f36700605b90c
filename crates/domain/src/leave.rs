// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Doctor leave records. Template expansion skips every date a leave covers.

use crate::calendar::format_date;
use crate::error::DomainError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveType {
    Sick,
    Vacation,
    Personal,
    Emergency,
    Other,
}

impl LeaveType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sick => "sick",
            Self::Vacation => "vacation",
            Self::Personal => "personal",
            Self::Emergency => "emergency",
            Self::Other => "other",
        }
    }
}

impl FromStr for LeaveType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sick" => Ok(Self::Sick),
            "vacation" => Ok(Self::Vacation),
            "personal" => Ok(Self::Personal),
            "emergency" => Ok(Self::Emergency),
            "other" => Ok(Self::Other),
            _ => Err(DomainError::InvalidLeaveType(s.to_string())),
        }
    }
}

/// An inclusive span of dates a doctor is unavailable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveRecord {
    pub leave_id: Option<i64>,
    pub doctor_id: i64,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
}

impl LeaveRecord {
    /// Creates a leave record.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidLeaveRange` if `end_date < start_date`.
    pub fn new(
        doctor_id: i64,
        leave_type: LeaveType,
        start_date: NaiveDate,
        end_date: NaiveDate,
        reason: Option<String>,
    ) -> Result<Self, DomainError> {
        if end_date < start_date {
            return Err(DomainError::InvalidLeaveRange {
                start_date: format_date(start_date),
                end_date: format_date(end_date),
            });
        }
        Ok(Self {
            leave_id: None,
            doctor_id,
            leave_type,
            start_date,
            end_date,
            reason,
        })
    }

    #[must_use]
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::calendar::parse_date;

    #[test]
    fn test_leave_covers_both_ends() {
        let leave = LeaveRecord::new(
            3,
            LeaveType::Vacation,
            parse_date("2024-12-23").unwrap(),
            parse_date("2024-12-27").unwrap(),
            None,
        )
        .unwrap();
        assert!(leave.covers(parse_date("2024-12-23").unwrap()));
        assert!(leave.covers(parse_date("2024-12-27").unwrap()));
        assert!(!leave.covers(parse_date("2024-12-28").unwrap()));
    }

    #[test]
    fn test_inverted_leave_is_rejected() {
        let result = LeaveRecord::new(
            3,
            LeaveType::Sick,
            parse_date("2024-12-27").unwrap(),
            parse_date("2024-12-23").unwrap(),
            None,
        );
        assert!(matches!(result, Err(DomainError::InvalidLeaveRange { .. })));
    }
}
