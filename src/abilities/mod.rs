//! Abilities: per-combatant behaviors that react to bus events.
//!
//! ## Key Types
//!
//! - `Ability`: the trait an ability implements to (un)subscribe itself
//! - `AbilityBinding`: owns an ability and unbinds it exactly once
//! - `AbilitySpec`: ability as data (triggers, condition, effects)
//! - `SpecAbility`: the `Ability` that runs an `AbilitySpec`
//!
//! Abilities never call each other. A flip strike, for example, reacts to a
//! `Flip`, declares an attack, and any shield on the target reacts to that
//! `AttackDeclared` on its own.

pub mod binding;
pub mod condition;
pub mod spec;

pub use binding::{Ability, AbilityBinding, Binding};
pub use condition::AbilityCondition;
pub use spec::{AbilityEffect, AbilitySpec, SpecAbility, ABILITY_PRIORITY};
