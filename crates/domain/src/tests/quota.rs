// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::{ActorKind, DomainError, MonthKey, UNLIMITED, UsageBand, UsageRecord, parse_date};

fn record(count: i32, limit: i32) -> UsageRecord {
    UsageRecord {
        actor_id: 9,
        actor_kind: ActorKind::Doctor,
        month: MonthKey::new(2024, 11).unwrap(),
        count,
        limit,
    }
}

#[test]
fn test_month_key_parses_and_formats() {
    let key: MonthKey = "2024-03".parse().unwrap();
    assert_eq!(key.year(), 2024);
    assert_eq!(key.month(), 3);
    assert_eq!(key.to_string(), "2024-03");

    assert!("2024-3".parse::<MonthKey>().is_err());
    assert!("2024-00".parse::<MonthKey>().is_err());
    assert!("24-03".parse::<MonthKey>().is_err());
}

#[test]
fn test_reset_date_rolls_over_year() {
    let key: MonthKey = MonthKey::new(2024, 12).unwrap();
    assert_eq!(key.reset_date().unwrap(), parse_date("2025-01-01").unwrap());
    assert_eq!(key.reset_date_string().unwrap(), "2025-01-01");
}

#[test]
fn test_month_key_from_date() {
    let key: MonthKey = MonthKey::from_date(parse_date("2024-02-29").unwrap());
    assert_eq!(key.to_string(), "2024-02");
}

#[test]
fn test_capacity_check_at_limit() {
    assert!(record(4, 5).check_capacity().is_ok());
    assert_eq!(
        record(5, 5).check_capacity(),
        Err(DomainError::QuotaExceeded { used: 5, limit: 5 })
    );
    assert!(record(10_000, UNLIMITED).check_capacity().is_ok());
}

#[test]
fn test_usage_bands() {
    assert_eq!(record(0, 5).band(), UsageBand::Ok);
    assert_eq!(record(2, 5).band(), UsageBand::Ok);
    assert_eq!(record(3, 5).band(), UsageBand::Warning);
    assert_eq!(record(4, 5).band(), UsageBand::Critical);
    assert_eq!(record(5, 5).band(), UsageBand::Reached);
    assert_eq!(record(50, UNLIMITED).band(), UsageBand::Ok);
}

#[test]
fn test_percentage_rounds_half_up() {
    assert_eq!(record(1, 3).percentage(), 33);
    assert_eq!(record(2, 3).percentage(), 67);
    assert_eq!(record(1, 8).percentage(), 13);
    assert_eq!(record(7, UNLIMITED).percentage(), 0);
}

#[test]
fn test_remaining_never_negative() {
    assert_eq!(record(3, 5).remaining(), 2);
    assert_eq!(record(7, 5).remaining(), 0);
    assert_eq!(record(7, UNLIMITED).remaining(), UNLIMITED);
}
