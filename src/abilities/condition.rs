//! Ability conditions.
//!
//! A condition is checked against the event being handled, the world, and
//! the binding of the ability that owns it. Only when it holds do the
//! ability's effects run.

use serde::{Deserialize, Serialize};

use super::binding::Binding;
use crate::cards::Side;
use crate::combat::lanes;
use crate::core::World;
use crate::events::{EventContext, EventKind};

/// A condition an event must meet for an ability to fire.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbilityCondition {
    /// No filter.
    #[default]
    Always,

    /// Disabled ability.
    Never,

    // === Entity filters ===

    /// The event's source is the ability's own combatant.
    SourceIsSelf,

    /// The event's target is the ability's own combatant.
    TargetIsSelf,

    /// The event's source stands directly across from the ability's combatant.
    SourceAcross,

    // === Side filters ===

    /// The event's owner is the ability's side.
    OwnerIsSelf,

    /// The event's owner is the other side.
    OwnerIsOpponent,

    // === State filters ===

    /// The ability's combatant is a card showing this face. Never holds for
    /// slots.
    SelfFacing(Side),

    /// The event's phase tag equals this string.
    PhaseIs(String),

    // === Combinators ===

    All(Vec<AbilityCondition>),

    Any(Vec<AbilityCondition>),

    Not(Box<AbilityCondition>),
}

impl AbilityCondition {
    pub fn phase(phase: impl Into<String>) -> Self {
        Self::PhaseIs(phase.into())
    }

    /// Create an AND condition.
    pub fn all(conditions: impl IntoIterator<Item = AbilityCondition>) -> Self {
        Self::All(conditions.into_iter().collect())
    }

    /// Create an OR condition.
    pub fn any(conditions: impl IntoIterator<Item = AbilityCondition>) -> Self {
        Self::Any(conditions.into_iter().collect())
    }

    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Add another condition with AND.
    #[must_use]
    pub fn and(self, other: AbilityCondition) -> Self {
        match self {
            Self::Always => other,
            Self::All(mut conditions) => {
                conditions.push(other);
                Self::All(conditions)
            }
            _ => Self::All(vec![self, other]),
        }
    }

    /// Check the condition for one event.
    #[must_use]
    pub fn evaluate(
        &self,
        world: &World,
        binding: &Binding,
        kind: EventKind,
        ctx: &EventContext,
    ) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::SourceIsSelf => ctx.source_id() == Some(binding.source),
            Self::TargetIsSelf => ctx.target_id() == Some(binding.source),
            Self::SourceAcross => ctx
                .source_id()
                .is_some_and(|source| lanes::is_across(world, binding.source, source)),
            Self::OwnerIsSelf => ctx.owner == Some(binding.owner),
            Self::OwnerIsOpponent => ctx.owner == Some(binding.opponent),
            Self::SelfFacing(side) => world
                .card(binding.source)
                .is_some_and(|card| card.side() == *side),
            Self::PhaseIs(phase) => ctx.phase == *phase,
            Self::All(conditions) => conditions
                .iter()
                .all(|c| c.evaluate(world, binding, kind, ctx)),
            Self::Any(conditions) => conditions
                .iter()
                .any(|c| c.evaluate(world, binding, kind, ctx)),
            Self::Not(inner) => !inner.evaluate(world, binding, kind, ctx),
        }
    }
}
