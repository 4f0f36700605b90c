// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::EngineConfig;
use consult_sched_domain::{
    ActorKind, PlanSubscription, PlanTier, Priority, SubscriptionStatus, UNLIMITED,
};
use time::Duration;

fn subscription(
    kind: ActorKind,
    tier: PlanTier,
    status: SubscriptionStatus,
    explicit: Option<i32>,
) -> PlanSubscription {
    PlanSubscription {
        actor_id: 1,
        actor_kind: kind,
        tier,
        status,
        max_assignments_per_month: explicit,
    }
}

#[test]
fn test_default_response_windows() {
    let config: EngineConfig = EngineConfig::default();
    assert_eq!(
        config.response_window(Priority::Routine),
        Some(Duration::hours(24))
    );
    assert_eq!(
        config.response_window(Priority::Urgent),
        Some(Duration::hours(6))
    );
    assert_eq!(
        config.response_window(Priority::Emergency),
        Some(Duration::hours(1))
    );
}

#[test]
fn test_limit_without_subscription_uses_kind_default() {
    let config: EngineConfig = EngineConfig::default();
    assert_eq!(config.effective_limit(ActorKind::Doctor, None), 5);
    assert_eq!(config.effective_limit(ActorKind::Hospital, None), 20);
}

#[test]
fn test_limit_uses_tier_default() {
    let config: EngineConfig = EngineConfig::default();
    let basic = subscription(
        ActorKind::Hospital,
        PlanTier::Basic,
        SubscriptionStatus::Active,
        None,
    );
    let premium = subscription(
        ActorKind::Doctor,
        PlanTier::Premium,
        SubscriptionStatus::Active,
        None,
    );
    assert_eq!(config.effective_limit(ActorKind::Hospital, Some(&basic)), 100);
    assert_eq!(
        config.effective_limit(ActorKind::Doctor, Some(&premium)),
        UNLIMITED
    );
}

#[test]
fn test_explicit_limit_overrides_tier() {
    let config: EngineConfig = EngineConfig::default();
    let sub = subscription(
        ActorKind::Doctor,
        PlanTier::Free,
        SubscriptionStatus::Active,
        Some(12),
    );
    assert_eq!(config.effective_limit(ActorKind::Doctor, Some(&sub)), 12);
}

#[test]
fn test_inactive_subscription_falls_back_to_default() {
    let config: EngineConfig = EngineConfig {
        default_doctor_limit: 3,
        ..EngineConfig::default()
    };
    let sub = subscription(
        ActorKind::Doctor,
        PlanTier::Enterprise,
        SubscriptionStatus::Expired,
        Some(500),
    );
    assert_eq!(config.effective_limit(ActorKind::Doctor, Some(&sub)), 3);
}
