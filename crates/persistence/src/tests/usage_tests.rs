// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Tests for quota counters, plan subscriptions, and the monthly reset.

use consult_sched::{EngineConfig, MonthlyResetSummary, UsageStatus};
use consult_sched_domain::{
    ActorKind, DomainError, MonthKey, PlanSubscription, PlanTier, SubscriptionStatus, UNLIMITED,
    UsageBand,
};
use time::OffsetDateTime;
use time::macros::datetime;

use crate::tests::{DOCTOR_ID, HOSPITAL_ID, test_config, test_now};
use crate::{Persistence, PersistenceError};

fn subscription(tier: PlanTier, status: SubscriptionStatus) -> PlanSubscription {
    PlanSubscription {
        actor_id: DOCTOR_ID,
        actor_kind: ActorKind::Doctor,
        tier,
        status,
        max_assignments_per_month: None,
    }
}

fn status(persistence: &mut Persistence, month: MonthKey) -> UsageStatus {
    persistence
        .usage_status(&test_config(), ActorKind::Doctor, DOCTOR_ID, month)
        .unwrap()
}

fn november() -> MonthKey {
    MonthKey::new(2024, 11).unwrap()
}

fn december() -> MonthKey {
    MonthKey::new(2024, 12).unwrap()
}

#[test]
fn test_reservations_stop_at_default_limit() {
    let mut persistence = Persistence::new_in_memory().unwrap();
    let config: EngineConfig = test_config();

    for expected in 1..=config.default_doctor_limit {
        let record = persistence
            .check_and_reserve(&config, ActorKind::Doctor, DOCTOR_ID, test_now())
            .unwrap();
        assert_eq!(record.count, expected);
    }

    let result = persistence.check_and_reserve(&config, ActorKind::Doctor, DOCTOR_ID, test_now());
    assert_eq!(
        result,
        Err(PersistenceError::Domain(DomainError::QuotaExceeded { used: 5, limit: 5 }))
    );

    let current: UsageStatus = status(&mut persistence, november());
    assert_eq!(current.used, 5);
    assert_eq!(current.remaining, 0);
    assert_eq!(current.percentage, 100);
    assert_eq!(current.band, UsageBand::Reached);
}

#[test]
fn test_unknown_actor_reports_empty_usage_without_writing() {
    let mut persistence = Persistence::new_in_memory().unwrap();

    let current: UsageStatus = status(&mut persistence, november());

    assert_eq!(current.used, 0);
    assert_eq!(current.limit, 5);
    assert_eq!(current.remaining, 5);
    assert_eq!(current.reset_date, "2024-12-01");

    let summary: MonthlyResetSummary = persistence
        .reset_monthly_usage(&test_config(), december(), test_now())
        .unwrap();
    assert_eq!(summary.actors_reset, 0);
}

#[test]
fn test_unlimited_tier_never_blocks() {
    let mut persistence = Persistence::new_in_memory().unwrap();
    let config: EngineConfig = test_config();
    let limit: i32 = persistence
        .set_subscription(
            &config,
            &subscription(PlanTier::Premium, SubscriptionStatus::Active),
            test_now(),
        )
        .unwrap();
    assert_eq!(limit, UNLIMITED);

    for _ in 0..50 {
        persistence
            .check_and_reserve(&config, ActorKind::Doctor, DOCTOR_ID, test_now())
            .unwrap();
    }

    let current: UsageStatus = status(&mut persistence, november());
    assert_eq!(current.used, 50);
    assert_eq!(current.limit, UNLIMITED);
    assert_eq!(current.remaining, UNLIMITED);
    assert_eq!(current.percentage, 0);
}

#[test]
fn test_upgrade_raises_current_month_limit() {
    let mut persistence = Persistence::new_in_memory().unwrap();
    let config: EngineConfig = test_config();
    for _ in 0..5 {
        persistence
            .check_and_reserve(&config, ActorKind::Doctor, DOCTOR_ID, test_now())
            .unwrap();
    }

    persistence
        .set_subscription(
            &config,
            &subscription(PlanTier::Basic, SubscriptionStatus::Active),
            test_now(),
        )
        .unwrap();

    let current: UsageStatus = status(&mut persistence, november());
    assert_eq!(current.limit, 20);
    assert_eq!(current.remaining, 15);
    assert!(
        persistence
            .check_and_reserve(&config, ActorKind::Doctor, DOCTOR_ID, test_now())
            .is_ok()
    );
}

#[test]
fn test_inactive_subscription_uses_kind_default() {
    let mut persistence = Persistence::new_in_memory().unwrap();
    let config: EngineConfig = test_config();

    let limit: i32 = persistence
        .set_subscription(
            &config,
            &subscription(PlanTier::Enterprise, SubscriptionStatus::Cancelled),
            test_now(),
        )
        .unwrap();

    assert_eq!(limit, config.default_doctor_limit);
}

#[test]
fn test_monthly_reset_opens_next_month_and_keeps_history() {
    let mut persistence = Persistence::new_in_memory().unwrap();
    let config: EngineConfig = test_config();
    persistence
        .check_and_reserve(&config, ActorKind::Doctor, DOCTOR_ID, test_now())
        .unwrap();
    persistence
        .check_and_reserve(&config, ActorKind::Hospital, HOSPITAL_ID, test_now())
        .unwrap();

    let reset_at: OffsetDateTime = datetime!(2024-12-01 00:05 UTC);
    let summary: MonthlyResetSummary = persistence
        .reset_monthly_usage(&config, december(), reset_at)
        .unwrap();

    assert_eq!(summary.month, "2024-12");
    assert_eq!(summary.actors_reset, 2);
    assert_eq!(summary.records_created, 2);
    assert_eq!(status(&mut persistence, december()).used, 0);
    assert_eq!(status(&mut persistence, november()).used, 1);
}

#[test]
fn test_reset_zeroes_counts_taken_in_the_month() {
    let mut persistence = Persistence::new_in_memory().unwrap();
    let config: EngineConfig = test_config();
    for hour in [9, 10, 11] {
        persistence
            .check_and_reserve(
                &config,
                ActorKind::Doctor,
                DOCTOR_ID,
                datetime!(2024-12-02 00:00 UTC) + time::Duration::hours(hour),
            )
            .unwrap();
    }
    assert_eq!(status(&mut persistence, december()).used, 3);

    let summary: MonthlyResetSummary = persistence
        .reset_monthly_usage(&config, december(), datetime!(2024-12-02 12:00 UTC))
        .unwrap();

    assert_eq!(summary.actors_reset, 1);
    assert_eq!(summary.records_created, 0);
    let after: UsageStatus = status(&mut persistence, december());
    assert_eq!(after.used, 0);
    assert_eq!(after.remaining, after.limit);
}

#[test]
fn test_reset_refreshes_limit_from_current_plan() {
    let mut persistence = Persistence::new_in_memory().unwrap();
    let config: EngineConfig = test_config();
    persistence
        .check_and_reserve(&config, ActorKind::Doctor, DOCTOR_ID, datetime!(2024-12-02 10:00 UTC))
        .unwrap();
    // Dated in November, so only November's record picks up the new limit.
    persistence
        .set_subscription(
            &config,
            &subscription(PlanTier::Basic, SubscriptionStatus::Active),
            test_now(),
        )
        .unwrap();
    assert_eq!(status(&mut persistence, december()).limit, 5);

    persistence
        .reset_monthly_usage(&config, december(), datetime!(2024-12-02 11:00 UTC))
        .unwrap();

    assert_eq!(status(&mut persistence, december()).limit, 20);
}
