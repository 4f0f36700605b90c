// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Caller identity and role-based authorization.
//!
//! The identity collaborator resolves every caller to an `(id, role)` pair
//! before a request reaches this crate. The pair is trusted here; what this
//! module decides is whether that caller may act on a given entity.

use consult_sched::Command;
use consult_sched_audit::Actor;
use consult_sched_domain::{ActorKind, Assignment, AvailabilitySlot, CancelledBy};

use crate::error::AuthError;

/// Caller roles for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// A hospital requesting consultations.
    ///
    /// Hospitals may:
    /// - create assignments and reserve sub-slots for themselves
    /// - cancel or complete their own assignments
    /// - view their own usage
    Hospital,
    /// A doctor offering availability.
    ///
    /// Doctors may:
    /// - manage their own slots, templates, and leaves
    /// - expand their own templates
    /// - accept, decline, cancel, or complete their own assignments
    Doctor,
    /// An operator with authority over every entity.
    ///
    /// Admins run expansion and sweeps, reset usage, record subscriptions,
    /// read the audit trail, and act as the system when cancelling.
    Admin,
}

impl Role {
    /// Returns the wire name of this role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hospital => "hospital",
            Self::Doctor => "doctor",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hospital" => Ok(Self::Hospital),
            "doctor" => Ok(Self::Doctor),
            "admin" => Ok(Self::Admin),
            _ => Err(AuthError::AuthenticationFailed {
                reason: format!("Unknown role: {s}"),
            }),
        }
    }
}

/// A caller resolved by the identity collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedActor {
    /// The hospital, doctor, or operator ID.
    pub id: i64,
    /// The role assigned to this caller.
    pub role: Role,
}

impl AuthenticatedActor {
    /// Creates a new authenticated actor.
    #[must_use]
    pub const fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }

    /// Converts this caller into an audit `Actor`.
    ///
    /// The audit ID is `"<role>:<id>"` so hospital 3 and doctor 3 stay distinct.
    #[must_use]
    pub fn to_audit_actor(&self) -> Actor {
        Actor::new(
            format!("{}:{}", self.role.as_str(), self.id),
            self.role.as_str().to_string(),
        )
    }

    /// Returns who a cancellation by this caller is attributed to.
    ///
    /// Admins cancel as the system and bypass the notice window.
    #[must_use]
    pub const fn cancelled_by(&self) -> CancelledBy {
        match self.role {
            Role::Hospital => CancelledBy::Hospital,
            Role::Doctor => CancelledBy::Doctor,
            Role::Admin => CancelledBy::System,
        }
    }
}

/// Resolves a caller from the identity pair carried by a request.
///
/// # Errors
///
/// Returns `AuthenticationFailed` if the ID is not positive or the role is unknown.
pub fn authenticate(actor_id: i64, actor_role: &str) -> Result<AuthenticatedActor, AuthError> {
    if actor_id <= 0 {
        return Err(AuthError::AuthenticationFailed {
            reason: format!("Invalid actor id: {actor_id}"),
        });
    }
    let role: Role = actor_role.parse()?;
    Ok(AuthenticatedActor::new(actor_id, role))
}

fn unauthorized(action: &str, required_role: &str) -> AuthError {
    AuthError::Unauthorized {
        action: action.to_string(),
        required_role: required_role.to_string(),
    }
}

/// Authorization service for enforcing role- and ownership-based access.
pub struct AuthorizationService;

impl AuthorizationService {
    /// Checks that the caller is an admin.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for every other role.
    pub fn authorize_admin(actor: &AuthenticatedActor, action: &str) -> Result<(), AuthError> {
        match actor.role {
            Role::Admin => Ok(()),
            Role::Hospital | Role::Doctor => Err(unauthorized(action, "Admin")),
        }
    }

    /// Checks that the caller manages `doctor_id`'s schedule.
    ///
    /// Slots, templates, and leaves belong to the doctor; admins may manage any.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` unless the caller is that doctor or an admin.
    pub fn authorize_doctor_schedule(
        actor: &AuthenticatedActor,
        doctor_id: i64,
        action: &str,
    ) -> Result<(), AuthError> {
        match actor.role {
            Role::Admin => Ok(()),
            Role::Doctor if actor.id == doctor_id => Ok(()),
            Role::Doctor | Role::Hospital => Err(unauthorized(action, "the owning Doctor or Admin")),
        }
    }

    /// Checks that the caller books on behalf of `hospital_id`.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` unless the caller is that hospital or an admin.
    pub fn authorize_hospital_booking(
        actor: &AuthenticatedActor,
        hospital_id: i64,
        action: &str,
    ) -> Result<(), AuthError> {
        match actor.role {
            Role::Admin => Ok(()),
            Role::Hospital if actor.id == hospital_id => Ok(()),
            Role::Hospital | Role::Doctor => {
                Err(unauthorized(action, "the booking Hospital or Admin"))
            }
        }
    }

    /// Checks that the caller may view an actor's usage.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` unless the caller is that actor or an admin.
    pub fn authorize_view_usage(
        actor: &AuthenticatedActor,
        actor_kind: ActorKind,
        actor_id: i64,
    ) -> Result<(), AuthError> {
        let is_self: bool = match (actor.role, actor_kind) {
            (Role::Doctor, ActorKind::Doctor) | (Role::Hospital, ActorKind::Hospital) => {
                actor.id == actor_id
            }
            (Role::Admin, _) => true,
            _ => false,
        };
        if is_self {
            Ok(())
        } else {
            Err(unauthorized("get_usage", "the same actor or Admin"))
        }
    }

    /// Checks that the caller is a participant of the assignment.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` unless the caller is its hospital, its doctor, or an admin.
    pub fn authorize_view_assignment(
        actor: &AuthenticatedActor,
        assignment: &Assignment,
    ) -> Result<(), AuthError> {
        if Self::is_participant(actor, assignment) {
            Ok(())
        } else {
            Err(unauthorized("get_assignment", "a participant or Admin"))
        }
    }

    /// Checks that the caller may apply `command` to the assignment.
    ///
    /// Only the doctor answers a request. Either participant may cancel or
    /// complete. Admins may do anything.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` when the role or ownership does not allow it.
    pub fn authorize_transition(
        actor: &AuthenticatedActor,
        assignment: &Assignment,
        command: &Command,
    ) -> Result<(), AuthError> {
        let action: &'static str = command.action_name();
        if !Self::is_participant(actor, assignment) {
            return Err(unauthorized(action, "a participant or Admin"));
        }
        match (actor.role, command) {
            (Role::Admin | Role::Doctor, _)
            | (Role::Hospital, Command::Cancel { .. } | Command::Complete { .. }) => Ok(()),
            (Role::Hospital, Command::Accept | Command::Decline { .. } | Command::Expire) => {
                Err(unauthorized(action, "the assigned Doctor or Admin"))
            }
        }
    }

    /// Checks that the caller may release a slot.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` unless the caller owns the slot, holds its
    /// booking, or is an admin.
    pub fn authorize_release_slot(
        actor: &AuthenticatedActor,
        slot: &AvailabilitySlot,
    ) -> Result<(), AuthError> {
        let allowed: bool = match actor.role {
            Role::Admin => true,
            Role::Doctor => actor.id == slot.doctor_id,
            Role::Hospital => slot.booked_by_hospital_id == Some(actor.id),
        };
        if allowed {
            Ok(())
        } else {
            Err(unauthorized(
                "release_slot",
                "the owning Doctor, the booking Hospital, or Admin",
            ))
        }
    }

    fn is_participant(actor: &AuthenticatedActor, assignment: &Assignment) -> bool {
        match actor.role {
            Role::Admin => true,
            Role::Doctor => actor.id == assignment.doctor_id,
            Role::Hospital => actor.id == assignment.hospital_id,
        }
    }
}
