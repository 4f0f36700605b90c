// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Engine configuration.
//!
//! Defaults that would otherwise be ambient (response windows, fallback
//! quotas, the operational timezone) are carried here and passed to every
//! operation that needs them.

use chrono_tz::Tz;
use consult_sched_domain::{
    ActorKind, PlanSubscription, PlanTier, Priority, SubscriptionStatus, UNLIMITED,
};
use time::Duration;

/// Monthly assignment limits per plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierLimits {
    pub free: i32,
    pub basic: i32,
    pub premium: i32,
    pub enterprise: i32,
}

impl TierLimits {
    #[must_use]
    pub const fn limit_for(&self, tier: PlanTier) -> i32 {
        match tier {
            PlanTier::Free => self.free,
            PlanTier::Basic => self.basic,
            PlanTier::Premium => self.premium,
            PlanTier::Enterprise => self.enterprise,
        }
    }
}

/// Configuration for the scheduling engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Timezone slot dates and wall-clock times are interpreted in.
    pub timezone: Tz,
    /// Response window for routine requests; `None` disables auto-expiry.
    pub routine_window: Option<Duration>,
    /// Response window for urgent requests.
    pub urgent_window: Option<Duration>,
    /// Response window for emergency requests.
    pub emergency_window: Option<Duration>,
    /// Limit for doctors without an active subscription.
    pub default_doctor_limit: i32,
    /// Limit for hospitals without an active subscription.
    pub default_hospital_limit: i32,
    pub doctor_tier_limits: TierLimits,
    pub hospital_tier_limits: TierLimits,
    /// Minimum notice for a participant to cancel before the slot starts.
    pub cancellation_notice_hours: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            routine_window: Some(Duration::hours(24)),
            urgent_window: Some(Duration::hours(6)),
            emergency_window: Some(Duration::hours(1)),
            default_doctor_limit: 5,
            default_hospital_limit: 20,
            doctor_tier_limits: TierLimits {
                free: 5,
                basic: 20,
                premium: UNLIMITED,
                enterprise: UNLIMITED,
            },
            hospital_tier_limits: TierLimits {
                free: 20,
                basic: 100,
                premium: UNLIMITED,
                enterprise: UNLIMITED,
            },
            cancellation_notice_hours: 24,
        }
    }
}

impl EngineConfig {
    /// Returns the response window for a priority.
    #[must_use]
    pub const fn response_window(&self, priority: Priority) -> Option<Duration> {
        match priority {
            Priority::Routine => self.routine_window,
            Priority::Urgent => self.urgent_window,
            Priority::Emergency => self.emergency_window,
        }
    }

    /// Returns the cancellation notice as a duration.
    #[must_use]
    pub fn cancellation_notice(&self) -> Duration {
        Duration::hours(i64::from(self.cancellation_notice_hours))
    }

    /// Resolves an actor's effective monthly limit.
    ///
    /// Resolution order:
    /// 1. The active subscription's explicit feature limit
    /// 2. The tier default for the active subscription
    /// 3. The actor-kind default when no subscription is active
    ///
    /// # Arguments
    ///
    /// * `kind` - Doctor or hospital
    /// * `subscription` - The actor's subscription, if one is on file
    #[must_use]
    pub fn effective_limit(&self, kind: ActorKind, subscription: Option<&PlanSubscription>) -> i32 {
        let Some(sub) = subscription.filter(|s| s.status == SubscriptionStatus::Active) else {
            return match kind {
                ActorKind::Doctor => self.default_doctor_limit,
                ActorKind::Hospital => self.default_hospital_limit,
            };
        };

        if let Some(explicit) = sub.max_assignments_per_month {
            // Any negative limit means unlimited.
            return explicit.max(UNLIMITED);
        }

        match kind {
            ActorKind::Doctor => self.doctor_tier_limits.limit_for(sub.tier),
            ActorKind::Hospital => self.hospital_tier_limits.limit_for(sub.tier),
        }
    }
}
