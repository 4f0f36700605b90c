// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all
)]

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Represents the entity performing an action.
///
/// An actor is a hospital, a doctor, an administrator, or the system itself
/// (for example the expiry sweep).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// The unique identifier for this actor.
    pub id: String,
    /// The type of actor (e.g., "hospital", "doctor", "system").
    pub actor_type: String,
}

impl Actor {
    /// Creates a new Actor.
    ///
    /// # Arguments
    ///
    /// * `id` - The unique identifier for this actor
    /// * `actor_type` - The type of actor
    #[must_use]
    pub const fn new(id: String, actor_type: String) -> Self {
        Self { id, actor_type }
    }

    /// The actor used for automated transitions.
    #[must_use]
    pub fn system() -> Self {
        Self::new(String::from("system"), String::from("system"))
    }
}

/// Represents the reason or trigger for an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cause {
    /// A unique identifier for this cause (e.g., request ID, sweep run ID).
    pub id: String,
    /// A description of the cause.
    pub description: String,
}

impl Cause {
    /// Creates a new Cause.
    ///
    /// # Arguments
    ///
    /// * `id` - The unique identifier for this cause
    /// * `description` - A description of what triggered this action
    #[must_use]
    pub const fn new(id: String, description: String) -> Self {
        Self { id, description }
    }
}

/// Represents the specific action performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// The name of the action (e.g., "`CreateAssignment`", "`ExpireAssignment`").
    pub name: String,
    /// Optional additional details about the action.
    pub details: Option<String>,
}

impl Action {
    /// Creates a new Action.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the action
    /// * `details` - Optional additional details
    #[must_use]
    pub const fn new(name: String, details: Option<String>) -> Self {
        Self { name, details }
    }
}

/// A serialized view of an entity at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub data: String,
}

impl StateSnapshot {
    #[must_use]
    pub const fn new(data: String) -> Self {
        Self { data }
    }

    /// An empty snapshot, used as `before` for creations.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            data: String::new(),
        }
    }
}

/// The kinds of entity an audit event can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Slot,
    Template,
    Assignment,
    Leave,
    Usage,
    Subscription,
}

impl EntityType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Slot => "slot",
            Self::Template => "template",
            Self::Assignment => "assignment",
            Self::Leave => "leave",
            Self::Usage => "usage",
            Self::Subscription => "subscription",
        }
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "slot" => Ok(Self::Slot),
            "template" => Ok(Self::Template),
            "assignment" => Ok(Self::Assignment),
            "leave" => Ok(Self::Leave),
            "usage" => Ok(Self::Usage),
            "subscription" => Ok(Self::Subscription),
            _ => Err(format!("Unknown entity type: {s}")),
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifies the entity an audit event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: EntityType,
    pub entity_id: i64,
}

impl EntityRef {
    #[must_use]
    pub const fn new(entity_type: EntityType, entity_id: i64) -> Self {
        Self {
            entity_type,
            entity_id,
        }
    }
}

/// An immutable audit event representing a state transition.
///
/// Every successful state change produces exactly one audit event capturing:
/// - Who performed the action (actor)
/// - Why it was performed (cause)
/// - What action was performed (action)
/// - Which entity it touched (entity)
/// - The entity before and after the transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Storage identifier, `None` until persisted.
    pub event_id: Option<i64>,
    /// The actor who initiated this state change.
    pub actor: Actor,
    /// The cause or reason for this state change.
    pub cause: Cause,
    /// The action that was performed.
    pub action: Action,
    /// The entity the action touched.
    pub entity: EntityRef,
    /// The state before the transition.
    pub before: StateSnapshot,
    /// The state after the transition.
    pub after: StateSnapshot,
    /// RFC 3339 timestamp, assigned when persisted.
    pub recorded_at: Option<String>,
}

impl AuditEvent {
    /// Creates a new `AuditEvent`.
    ///
    /// # Arguments
    ///
    /// * `actor` - The actor who initiated the change
    /// * `cause` - The reason for the change
    /// * `action` - The action that was performed
    /// * `entity` - The entity the action touched
    /// * `before` - The state before the transition
    /// * `after` - The state after the transition
    #[must_use]
    pub const fn new(
        actor: Actor,
        cause: Cause,
        action: Action,
        entity: EntityRef,
        before: StateSnapshot,
        after: StateSnapshot,
    ) -> Self {
        Self {
            event_id: None,
            actor,
            cause,
            action,
            entity,
            before,
            after,
            recorded_at: None,
        }
    }

    /// Returns a copy pointing at a different entity ID.
    ///
    /// Used when the entity ID is only known after insertion.
    #[must_use]
    pub fn with_entity_id(mut self, entity_id: i64) -> Self {
        self.entity.entity_id = entity_id;
        self
    }
}
