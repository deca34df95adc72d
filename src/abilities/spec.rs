//! Data-driven abilities.
//!
//! An `AbilitySpec` names the event kinds it listens to, a condition, and a
//! list of effects. `SpecAbility` turns a spec into a bus subscription for one
//! combatant. Every stock ability is a spec built by one of the constructors
//! below, so new ones can be written in data:
//!
//! ```
//! use bifronte::abilities::{AbilityCondition, AbilityEffect, AbilitySpec};
//! use bifronte::events::EventKind;
//!
//! let thorns = AbilitySpec::new("Thorns")
//!     .on(EventKind::AttackDeclared)
//!     .when(AbilityCondition::TargetIsSelf)
//!     .then(AbilityEffect::BonusBlock(1))
//!     .then(AbilityEffect::Hint("Thorns".into()));
//!
//! assert_eq!(thorns.effects.len(), 2);
//! ```

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use super::binding::{Ability, AbilityBinding, Binding};
use super::condition::AbilityCondition;
use crate::cards::{Card, Combatant, HitModifiers, Side};
use crate::combat::protocol::{self, Retry};
use crate::core::error::HandlerError;
use crate::core::{EntityId, PlayerId, World};
use crate::events::{
    EventBus, EventContext, EventHandler, EventKind, Subscription, PHASE_SLOT_EFFECT,
};

/// Priority band of ability handlers.
pub const ABILITY_PRIORITY: i32 = 0;

/// One thing an ability does when it fires.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbilityEffect {
    /// Publish a presentation hint about the source.
    Hint(String),

    // === Incoming-hit modifiers ===
    //
    // Only valid while handling an `AttackDeclared` aimed at the source.

    /// Incoming damage becomes zero.
    NullifyIncoming,

    /// Incoming damage becomes this value.
    OverrideIncoming(i32),

    /// Extra block against this hit only.
    BonusBlock(i32),

    // === Strikes ===

    /// Attack the lane across from the source for a fixed amount.
    StrikeAcross { damage: i32 },

    /// Attack every opposing lane; empty lanes hit the opposing side directly.
    StrikeEveryLane { damage: i32 },

    /// Damage the opposing side's hp. Follows the direct-damage policy.
    DamageEnemyPlayer { amount: i32 },

    // === Self buffs ===

    /// Set the source's front damage to its baseline plus `per_ally` for every
    /// other living same-faction card showing its back. A back-facing source
    /// falls back to its baseline.
    RallyFromBack { per_ally: i32 },
}

/// A complete ability description.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilitySpec {
    pub name: String,

    /// Event kinds the ability listens to.
    pub triggers: SmallVec<[EventKind; 2]>,

    #[serde(default)]
    pub condition: AbilityCondition,

    pub effects: Vec<AbilityEffect>,
}

impl AbilitySpec {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            triggers: SmallVec::new(),
            condition: AbilityCondition::Always,
            effects: Vec::new(),
        }
    }

    /// Listen to one more event kind.
    #[must_use]
    pub fn on(mut self, kind: EventKind) -> Self {
        if !self.triggers.contains(&kind) {
            self.triggers.push(kind);
        }
        self
    }

    /// AND another condition onto the current one.
    #[must_use]
    pub fn when(mut self, condition: AbilityCondition) -> Self {
        self.condition = self.condition.and(condition);
        self
    }

    #[must_use]
    pub fn then(mut self, effect: AbilityEffect) -> Self {
        self.effects.push(effect);
        self
    }

    // === Stock abilities ===

    /// Nullify every hit aimed at this combatant.
    #[must_use]
    pub fn shield() -> Self {
        Self::new("Shield")
            .on(EventKind::AttackDeclared)
            .when(AbilityCondition::TargetIsSelf)
            .then(AbilityEffect::NullifyIncoming)
            .then(AbilityEffect::Hint("Shield: blocked".into()))
    }

    /// Strike across whenever this card flips; optionally only when it turns
    /// to its front.
    #[must_use]
    pub fn flip_strike(damage: i32, only_to_front: bool) -> Self {
        let spec = Self::new("Flip Strike")
            .on(EventKind::Flip)
            .when(AbilityCondition::SourceIsSelf);
        let spec = if only_to_front {
            spec.when(AbilityCondition::SelfFacing(Side::Front))
        } else {
            spec
        };
        spec.then(AbilityEffect::StrikeAcross { damage })
    }

    /// Gain `per_ally` front damage per other back-facing ally of the same
    /// faction, recomputed on every flip.
    #[must_use]
    pub fn back_rally(per_ally: i32) -> Self {
        Self::new("Back Rally")
            .on(EventKind::Flip)
            .then(AbilityEffect::RallyFromBack { per_ally })
            .then(AbilityEffect::Hint("Back Bonus".into()))
    }

    /// At the end of its owner's turn, a front-facing card strikes every
    /// opposing lane.
    #[must_use]
    pub fn end_turn_barrage(damage: i32) -> Self {
        Self::new("Barrage")
            .on(EventKind::TurnEnd)
            .when(AbilityCondition::OwnerIsSelf)
            .when(AbilityCondition::SelfFacing(Side::Front))
            .then(AbilityEffect::Hint("Turn End Damage".into()))
            .then(AbilityEffect::StrikeEveryLane { damage })
    }

    /// A slot's lane effect: strike across when the driver triggers it.
    #[must_use]
    pub fn slot_strike(damage: i32) -> Self {
        Self::new("Slot Strike")
            .on(EventKind::Custom)
            .when(AbilityCondition::SourceIsSelf)
            .when(AbilityCondition::phase(PHASE_SLOT_EFFECT))
            .then(AbilityEffect::StrikeAcross { damage })
            .then(AbilityEffect::Hint("Strike!".into()))
    }
}

/// Binds an `AbilitySpec` to the bus.
#[derive(Debug)]
pub struct SpecAbility {
    spec: AbilitySpec,
    subscription: Option<Subscription>,
}

impl SpecAbility {
    #[must_use]
    pub fn new(spec: AbilitySpec) -> Self {
        Self {
            spec,
            subscription: None,
        }
    }

    #[must_use]
    pub fn spec(&self) -> &AbilitySpec {
        &self.spec
    }

    /// Bind every spec for one combatant.
    pub fn bind_all(
        specs: &[AbilitySpec],
        bus: &EventBus,
        world: &World,
        source: EntityId,
        owner: PlayerId,
    ) -> Vec<AbilityBinding> {
        specs
            .iter()
            .map(|spec| {
                let mut binding = AbilityBinding::new(SpecAbility::new(spec.clone()));
                binding.bind(bus, world, source, owner, owner.opponent());
                binding
            })
            .collect()
    }
}

impl Ability for SpecAbility {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn register(&mut self, bus: &EventBus, world: &World, binding: Binding) {
        let handler = SpecHandler {
            spec: self.spec.clone(),
            binding,
            baseline: world.card(binding.source).map(Card::front_damage),
        };
        self.subscription = Some(bus.scoped(&self.spec.triggers, ABILITY_PRIORITY, Rc::new(handler)));
    }

    fn unregister(&mut self, _bus: &EventBus) {
        self.subscription = None;
    }
}

/// The subscribed half of a `SpecAbility`.
struct SpecHandler {
    spec: AbilitySpec,
    binding: Binding,
    /// Front damage of the source when it was bound. `None` for slots.
    baseline: Option<i32>,
}

impl SpecHandler {
    fn incoming<'w>(
        &self,
        world: &'w mut World,
        kind: EventKind,
        ctx: &EventContext,
    ) -> Result<&'w mut HitModifiers, HandlerError> {
        if kind != EventKind::AttackDeclared || ctx.target_id() != Some(self.binding.source) {
            return Err(HandlerError::MisplacedModifier(kind));
        }
        world
            .combatant_mut(self.binding.source)
            .map(Combatant::modifiers_mut)
            .ok_or(HandlerError::MisplacedModifier(kind))
    }

    fn apply(
        &self,
        effect: &AbilityEffect,
        bus: &EventBus,
        world: &mut World,
        kind: EventKind,
        ctx: &EventContext,
    ) -> Result<(), HandlerError> {
        let source = self.binding.source;
        let phase = self.spec.name.as_str();
        match effect {
            AbilityEffect::Hint(message) => {
                if let Some(reference) = world.combatant(source).map(Combatant::to_ref) {
                    bus.publish(world, EventKind::Info, &EventContext::hint(reference, message));
                }
            }
            AbilityEffect::NullifyIncoming => {
                self.incoming(world, kind, ctx)?.incoming_damage_override = Some(0);
            }
            AbilityEffect::OverrideIncoming(amount) => {
                self.incoming(world, kind, ctx)?.incoming_damage_override = Some(*amount);
            }
            AbilityEffect::BonusBlock(amount) => {
                self.incoming(world, kind, ctx)?.temp_block_bonus += *amount;
            }
            AbilityEffect::StrikeAcross { damage } => {
                protocol::strike_across(bus, world, source, *damage, phase, Retry::Allowed);
            }
            AbilityEffect::StrikeEveryLane { damage } => {
                let lanes = world.player(self.binding.opponent).lanes().to_vec();
                for occupant in lanes {
                    if !world.is_alive(source) {
                        break;
                    }
                    match occupant.filter(|id| world.is_alive(*id)) {
                        Some(target) => {
                            protocol::declare(bus, world, source, target, *damage, phase);
                        }
                        None => {
                            protocol::direct_damage(bus, world, source, *damage, phase);
                        }
                    }
                }
            }
            AbilityEffect::DamageEnemyPlayer { amount } => {
                protocol::direct_damage(bus, world, source, *amount, phase);
            }
            AbilityEffect::RallyFromBack { per_ally } => {
                let baseline = self.baseline.ok_or(HandlerError::NotACard(source))?;
                let card = world.card(source).ok_or(HandlerError::NotACard(source))?;
                let value = if card.is_back() {
                    baseline
                } else {
                    let allies = world
                        .allied_back_cards(card.owner(), card.definition().faction)
                        .filter(|ally| ally.id() != source)
                        .count();
                    baseline + per_ally * i32::try_from(allies).unwrap_or(i32::MAX)
                };
                if let Some(card) = world.card_mut(source) {
                    card.set_front_damage(value);
                }
                debug!(%source, value, "rally recomputed");
            }
        }
        Ok(())
    }
}

impl EventHandler for SpecHandler {
    fn handle(
        &self,
        bus: &EventBus,
        world: &mut World,
        kind: EventKind,
        ctx: &EventContext,
    ) -> Result<(), HandlerError> {
        if !world.is_alive(self.binding.source) {
            return Ok(());
        }
        if !self.spec.condition.evaluate(world, &self.binding, kind, ctx) {
            return Ok(());
        }
        debug!(ability = %self.spec.name, source = %self.binding.source, ?kind, "ability fired");
        for effect in &self.spec.effects {
            self.apply(effect, bus, world, kind, ctx)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{CardDefinition, CardId, CombatantRef, FactionId};
    use crate::core::MatchConfig;

    fn world_with_card() -> (World, EntityId) {
        let mut world = World::from_config(&MatchConfig::default());
        let def = CardDefinition::new(CardId::new(1), "Duelist", FactionId::new(0))
            .with_health(5)
            .attacker(2);
        let id = world
            .place(Card::new(def, PlayerId::HUMAN, Side::Front).into(), 0)
            .unwrap();
        (world, id)
    }

    fn handler(spec: AbilitySpec, world: &World, source: EntityId) -> SpecHandler {
        SpecHandler {
            baseline: world.card(source).map(Card::front_damage),
            spec,
            binding: Binding {
                source,
                owner: PlayerId::HUMAN,
                opponent: PlayerId::AI,
            },
        }
    }

    #[test]
    fn test_modifier_outside_declare_is_an_error() {
        let (mut world, id) = world_with_card();
        let bus = EventBus::new();
        let spec = AbilitySpec::new("Bad").on(EventKind::Flip).then(AbilityEffect::NullifyIncoming);
        let h = handler(spec, &world, id);

        let ctx = EventContext::new().with_source(CombatantRef::Card(id));
        assert_eq!(
            h.handle(&bus, &mut world, EventKind::Flip, &ctx),
            Err(HandlerError::MisplacedModifier(EventKind::Flip))
        );
        assert!(world.combatant(id).unwrap().modifiers().is_clear());
    }

    #[test]
    fn test_modifier_on_declare_against_self() {
        let (mut world, id) = world_with_card();
        let bus = EventBus::new();
        let h = handler(AbilitySpec::shield(), &world, id);

        let ctx = EventContext::between(PlayerId::AI, PlayerId::HUMAN)
            .with_source(CombatantRef::Slot(EntityId(999)))
            .with_target(CombatantRef::Card(id))
            .with_amount(5);
        h.handle(&bus, &mut world, EventKind::AttackDeclared, &ctx).unwrap();

        assert_eq!(
            world.combatant(id).unwrap().modifiers().incoming_damage_override,
            Some(0)
        );
    }

    #[test]
    fn test_dead_source_does_nothing() {
        let (mut world, id) = world_with_card();
        let bus = EventBus::new();
        world.combatant_mut(id).unwrap().take_damage(5);
        let spec = AbilitySpec::new("Bad").on(EventKind::Flip).then(AbilityEffect::NullifyIncoming);
        let h = handler(spec, &world, id);

        assert_eq!(
            h.handle(&bus, &mut world, EventKind::Flip, &EventContext::new()),
            Ok(())
        );
    }

    #[test]
    fn test_stock_specs_shape() {
        assert_eq!(AbilitySpec::shield().triggers.as_slice(), &[EventKind::AttackDeclared]);
        assert_eq!(
            AbilitySpec::flip_strike(2, true).condition,
            AbilityCondition::All(vec![
                AbilityCondition::SourceIsSelf,
                AbilityCondition::SelfFacing(Side::Front),
            ])
        );
        assert_eq!(AbilitySpec::flip_strike(2, false).condition, AbilityCondition::SourceIsSelf);
        assert_eq!(
            AbilitySpec::slot_strike(3).effects,
            vec![
                AbilityEffect::StrikeAcross { damage: 3 },
                AbilityEffect::Hint("Strike!".into()),
            ]
        );
    }

    #[test]
    fn test_spec_serializes() {
        let spec = AbilitySpec::end_turn_barrage(1);
        let json = serde_json::to_string(&spec).unwrap();
        let back: AbilitySpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }

    #[test]
    fn test_unregister_detaches() {
        let (world, id) = world_with_card();
        let bus = EventBus::new();
        let mut bindings = SpecAbility::bind_all(
            &[AbilitySpec::shield(), AbilitySpec::back_rally(1)],
            &bus,
            &world,
            id,
            PlayerId::HUMAN,
        );
        assert_eq!(bus.subscriber_count(EventKind::AttackDeclared), 1);
        assert_eq!(bus.subscriber_count(EventKind::Flip), 1);

        for binding in &mut bindings {
            binding.unbind();
        }
        assert_eq!(bus.subscriber_count(EventKind::AttackDeclared), 0);
        assert_eq!(bus.subscriber_count(EventKind::Flip), 0);
    }
}
