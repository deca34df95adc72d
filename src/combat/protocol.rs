//! Attack protocol: declare, then resolve.
//!
//! 1. The attacker computes a *proposed damage*: its front damage plus the
//!    damage bonus of every living same-faction ally showing its back.
//! 2. `AttackDeclared{source, target, amount = proposed}` is published. This
//!    is the only window in which abilities may write the defender's
//!    `HitModifiers`.
//! 3. The defender's own `ResolutionHandler`, subscribed in the lowest
//!    priority band so it runs after every ability, takes the modifiers and
//!    computes `final = max(0, max(0, override ?? proposed) - block)`.
//! 4. `final` is applied to health (floored at zero) and
//!    `AttackResolved{amount = hp removed}` is published. A zero hit also
//!    publishes a "No damage" hint.
//!
//! A declared attack cannot be cancelled, only neutralized by zeroing the
//! incoming damage. An attack that finds no living unit across its lane hits
//! the opposing side's hp instead and resolves with `target = None`.
//! Destruction is not a separate event: observers check `alive` after
//! `AttackResolved`.

use std::rc::Rc;

use tracing::debug;

use super::lanes::{self, LaneLookup};
use crate::cards::Combatant;
use crate::core::error::HandlerError;
use crate::core::state::DeferredStrike;
use crate::core::{DirectDamagePolicy, EntityId, PlayerId, World};
use crate::events::{EventBus, EventContext, EventHandler, EventKind, Subscription};

/// Priority band of resolution handlers: after every other subscriber.
pub const RESOLUTION_PRIORITY: i32 = i32::MIN;

/// Phase tag of ordinary attacks.
pub const PHASE_COMBAT: &str = "Combat";

/// What happened to a strike.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrikeOutcome {
    /// `AttackDeclared` was published against this combatant.
    Declared(EntityId),
    /// The opposing side's hp took this much damage.
    Direct(i32),
    /// The opposing board was rebuilding; the strike waits for the next tick.
    Deferred,
    /// Nothing happened (dead attacker, dead target, or off the board).
    Aborted,
}

/// Whether a strike that meets a rebuilding board may be deferred.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Retry {
    Allowed,
    Exhausted,
}

/// Damage a living front-facing card would propose right now.
///
/// `None` for slots, back-facing cards and dead or absent attackers.
#[must_use]
pub fn proposed_damage(world: &World, attacker: EntityId) -> Option<i32> {
    let combatant = world.combatant(attacker)?;
    let card = combatant.as_card()?;
    if !combatant.alive() || !card.is_front() {
        return None;
    }
    let bonus: i32 = world
        .allied_back_cards(card.owner(), card.definition().faction)
        .map(|ally| ally.definition().back_damage_bonus)
        .sum();
    Some((card.front_damage() + bonus).max(0))
}

/// Block a defender applies against one hit.
///
/// Cards: their own front block if they show a blocker face, plus every
/// same-faction back-facing ally's block bonus. Slots: their flat block.
/// A negative `temp_block_bonus` counts as zero; the total is never negative.
#[must_use]
pub fn block_value(world: &World, defender: EntityId, temp_block_bonus: i32) -> i32 {
    let base = match world.combatant(defender) {
        Some(Combatant::Card(card)) => {
            let own = if card.is_front_blocker() {
                card.definition().front_block
            } else {
                0
            };
            let auras: i32 = world
                .allied_back_cards(card.owner(), card.definition().faction)
                .map(|ally| ally.definition().back_block_bonus)
                .sum();
            own + auras
        }
        Some(Combatant::Slot(slot)) => slot.definition().block,
        None => 0,
    };
    (base + temp_block_bonus.max(0)).max(0)
}

/// Total block of a side's living front-facing blockers, each with the
/// block auras of its same-faction back row.
#[must_use]
pub fn front_line_block(world: &World, side: PlayerId) -> i32 {
    world
        .board(side)
        .filter(|combatant| combatant.alive())
        .filter_map(Combatant::as_card)
        .filter(|card| card.is_front_blocker())
        .map(|card| {
            let auras: i32 = world
                .allied_back_cards(side, card.definition().faction)
                .map(|ally| ally.definition().back_block_bonus)
                .sum();
            card.definition().front_block + auras
        })
        .sum()
}

/// Publish `AttackDeclared` from `attacker` against `target`.
///
/// Returns `false`, publishing nothing, if either is dead or absent.
pub fn declare(
    bus: &EventBus,
    world: &mut World,
    attacker: EntityId,
    target: EntityId,
    amount: i32,
    phase: &str,
) -> bool {
    let (Some(a), Some(t)) = (world.combatant(attacker), world.combatant(target)) else {
        return false;
    };
    if !a.alive() || !t.alive() {
        return false;
    }
    let ctx = EventContext::between(a.owner(), t.owner())
        .with_source(a.to_ref())
        .with_target(t.to_ref())
        .with_amount(amount)
        .with_phase(phase);
    bus.publish(world, EventKind::AttackDeclared, &ctx);
    true
}

/// Damage the side opposing `attacker` directly and publish
/// `AttackResolved{target: None}`.
///
/// Returns the hp removed, or `None` if the attacker is not in the world.
pub fn direct_damage(
    bus: &EventBus,
    world: &mut World,
    attacker: EntityId,
    amount: i32,
    phase: &str,
) -> Option<i32> {
    let combatant = world.combatant(attacker)?;
    let (owner, source) = (combatant.owner(), combatant.to_ref());
    let opponent = owner.opponent();

    let block = match world.direct_damage() {
        DirectDamagePolicy::Full => 0,
        DirectDamagePolicy::NetOfBlock => front_line_block(world, opponent),
    };
    let final_damage = (amount.max(0) - block).max(0);
    let removed = world.player_mut(opponent).take_damage(final_damage);

    let ctx = EventContext::between(owner, opponent)
        .with_source(source)
        .with_amount(removed)
        .with_phase(phase);
    bus.publish(world, EventKind::AttackResolved, &ctx);
    Some(removed)
}

/// Strike whatever stands across from `attacker` for `amount`.
///
/// Falls back to direct damage when the lane is vacant. When the opposing
/// board is rebuilding, the strike is queued for one retry if `retry`
/// allows it and dropped otherwise.
pub fn strike_across(
    bus: &EventBus,
    world: &mut World,
    attacker: EntityId,
    amount: i32,
    phase: &str,
    retry: Retry,
) -> StrikeOutcome {
    if !world.is_alive(attacker) {
        return StrikeOutcome::Aborted;
    }
    match lanes::opposing(&*world, attacker) {
        LaneLookup::Occupied(target) => {
            if declare(bus, world, attacker, target, amount, phase) {
                StrikeOutcome::Declared(target)
            } else {
                StrikeOutcome::Aborted
            }
        }
        LaneLookup::Vacant => direct_damage(bus, world, attacker, amount, phase)
            .map_or(StrikeOutcome::Aborted, StrikeOutcome::Direct),
        LaneLookup::Rebuilding => match retry {
            Retry::Allowed => {
                debug!(%attacker, amount, phase, "opposing board rebuilding, strike deferred");
                world.defer(DeferredStrike {
                    attacker,
                    amount,
                    phase: phase.to_string(),
                });
                StrikeOutcome::Deferred
            }
            Retry::Exhausted => {
                debug!(%attacker, amount, phase, "opposing board still rebuilding, strike dropped");
                StrikeOutcome::Aborted
            }
        },
        LaneLookup::Unplaced => StrikeOutcome::Aborted,
    }
}

/// Ordinary attack: proposed damage against the lane across.
pub fn attack(bus: &EventBus, world: &mut World, attacker: EntityId) -> StrikeOutcome {
    match proposed_damage(world, attacker) {
        Some(amount) => strike_across(bus, world, attacker, amount, PHASE_COMBAT, Retry::Allowed),
        None => StrikeOutcome::Aborted,
    }
}

/// Attack a chosen target with the attacker's proposed damage.
pub fn attack_target(
    bus: &EventBus,
    world: &mut World,
    attacker: EntityId,
    target: EntityId,
) -> StrikeOutcome {
    let Some(amount) = proposed_damage(world, attacker) else {
        return StrikeOutcome::Aborted;
    };
    if declare(bus, world, attacker, target, amount, PHASE_COMBAT) {
        StrikeOutcome::Declared(target)
    } else {
        StrikeOutcome::Aborted
    }
}

/// Retry every deferred strike once. Returns how many landed.
pub fn run_deferred(bus: &EventBus, world: &mut World) -> usize {
    let mut landed = 0;
    for strike in world.take_deferred() {
        match strike_across(bus, world, strike.attacker, strike.amount, &strike.phase, Retry::Exhausted) {
            StrikeOutcome::Declared(_) | StrikeOutcome::Direct(_) => landed += 1,
            StrikeOutcome::Deferred | StrikeOutcome::Aborted => {
                debug!(attacker = %strike.attacker, "deferred strike gave up");
            }
        }
    }
    landed
}

/// A combatant's own resolution step for incoming attacks.
#[derive(Clone, Copy, Debug)]
pub struct ResolutionHandler {
    entity: EntityId,
}

impl ResolutionHandler {
    #[must_use]
    pub fn new(entity: EntityId) -> Self {
        Self { entity }
    }

    /// Subscribe a resolution handler for `entity` in the resolution band.
    /// Dropping the guard detaches it.
    #[must_use]
    pub fn attach(bus: &EventBus, entity: EntityId) -> Subscription {
        bus.scoped(
            &[EventKind::AttackDeclared],
            RESOLUTION_PRIORITY,
            Rc::new(Self::new(entity)),
        )
    }
}

impl EventHandler for ResolutionHandler {
    fn handle(
        &self,
        bus: &EventBus,
        world: &mut World,
        kind: EventKind,
        ctx: &EventContext,
    ) -> Result<(), HandlerError> {
        if kind != EventKind::AttackDeclared || ctx.target_id() != Some(self.entity) {
            return Ok(());
        }

        let modifiers = match world.combatant_mut(self.entity) {
            Some(defender) if defender.alive() => defender.take_modifiers(),
            Some(defender) => {
                defender.take_modifiers();
                return Ok(());
            }
            None => return Ok(()),
        };

        let incoming = modifiers
            .incoming_damage_override
            .unwrap_or(ctx.amount)
            .max(0);
        let block = block_value(world, self.entity, modifiers.temp_block_bonus);
        let final_damage = (incoming - block).max(0);

        let Some(defender) = world.combatant_mut(self.entity) else {
            return Ok(());
        };
        let removed = defender.take_damage(final_damage);
        let defender_ref = defender.to_ref();
        debug!(
            defender = %self.entity,
            proposed = ctx.amount,
            incoming,
            block,
            removed,
            "attack resolved"
        );

        if final_damage == 0 {
            bus.publish(world, EventKind::Info, &EventContext::hint(defender_ref, "No damage"));
        }
        bus.publish(
            world,
            EventKind::AttackResolved,
            &ctx.clone().with_amount(removed),
        );

        // Writes made while the outcome was published belong to this hit.
        if let Some(defender) = world.combatant_mut(self.entity) {
            defender.take_modifiers();
        }
        Ok(())
    }
}
