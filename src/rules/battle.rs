//! Turn/phase driver.
//!
//! `Battle` owns the world, the bus, and every subscription made on it, and
//! walks a match through its phases:
//!
//! ```text
//! Setup ──start──▶ PlayerTurn ──attack_all──▶ AwaitingEndTurn
//!                      │                            │
//!                      └────────────end_turn────────┘
//!                                   │
//!                                   ▼
//!                    AiTurn (executor) ──▶ PlayerTurn (turn + 1)
//!
//!         any hp at 0, or any TurnEnd at the turn limit ──▶ Finished
//! ```
//!
//! Every operation validates first and changes nothing when it is refused.
//! A refusal is returned as `Err(Rejection)` and also published as
//! `Info "Rejected: <reason>"` so presentation layers can show it.
//!
//! After every operation the driver sweeps destroyed combatants off the
//! board (dropping their abilities and resolution handler) and checks
//! whether the match is over.

use im::Vector;
use rustc_hash::FxHashMap;
use tracing::debug;

use super::outcome::{GameResult, MatchSummary};
use super::policy::{RandomizeLayout, SlotSweep, TurnExecutor, TurnStartPolicy};
use crate::abilities::{Ability, AbilityBinding, SpecAbility};
use crate::cards::{
    Card, CardId, CardRegistry, Combatant, CombatantRef, DeckEntry, Side, Slot, SlotId,
};
use crate::combat::protocol::{self, ResolutionHandler, StrikeOutcome};
use crate::core::{
    Action, ActionRecord, ConfigError, EntityId, GameRng, MatchConfig, PlayerId, PlayerMap,
    Rejection, World,
};
use crate::events::{
    EventBus, EventContext, EventKind, Subscription, PHASE_LANE_REBUILD, PHASE_SLOT_EFFECT,
    PHASE_TURN_START_RANDOMIZE,
};

/// Published when the opponent's lanes have been rebuilt.
pub const INFO_ENEMY_SHUFFLE: &str = "EnemyTurnEndShuffle";

pub const INFO_MATCH_START: &str = "=== MATCH START ===";

pub const INFO_MATCH_END: &str = "=== MATCH END ===";

/// Where the match is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TurnPhase {
    /// Board and hands are being prepared; `start` has not been called.
    #[default]
    Setup,
    PlayerTurn,
    /// The player used the mass attack and can only end the turn.
    AwaitingEndTurn,
    AiTurn,
    Finished,
}

/// A match in progress.
pub struct Battle {
    config: MatchConfig,
    registry: CardRegistry,
    bus: EventBus,
    world: World,
    rng: GameRng,
    phase: TurnPhase,
    turn: u32,
    resolution: FxHashMap<EntityId, Subscription>,
    abilities: FxHashMap<EntityId, Vec<AbilityBinding>>,
    hands: PlayerMap<Vec<CardId>>,
    decks: PlayerMap<Vec<CardId>>,
    history: Vector<ActionRecord>,
    result: Option<GameResult>,
    layout: Box<dyn TurnStartPolicy>,
    executor: Option<Box<dyn TurnExecutor>>,
}

impl Battle {
    /// Create a battle with empty boards.
    ///
    /// Defaults to `RandomizeLayout` at the player's turn start and
    /// `SlotSweep` for the opponent's turn.
    pub fn new(config: MatchConfig, registry: CardRegistry) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            world: World::from_config(&config),
            rng: GameRng::new(config.seed),
            config,
            registry,
            bus: EventBus::new(),
            phase: TurnPhase::Setup,
            turn: 0,
            resolution: FxHashMap::default(),
            abilities: FxHashMap::default(),
            hands: PlayerMap::default(),
            decks: PlayerMap::default(),
            history: Vector::new(),
            result: None,
            layout: Box::new(RandomizeLayout::default()),
            executor: Some(Box::new(SlotSweep)),
        })
    }

    #[must_use]
    pub fn with_layout_policy(mut self, policy: impl TurnStartPolicy + 'static) -> Self {
        self.layout = Box::new(policy);
        self
    }

    #[must_use]
    pub fn with_executor(mut self, executor: impl TurnExecutor + 'static) -> Self {
        self.executor = Some(Box::new(executor));
        self
    }

    // === Accessors ===

    #[must_use]
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &CardRegistry {
        &self.registry
    }

    /// The bus. Clone it to subscribe presentation sinks.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct world access for scenario setup.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    #[must_use]
    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    #[must_use]
    pub fn turn(&self) -> u32 {
        self.turn
    }

    #[must_use]
    pub fn result(&self) -> Option<GameResult> {
        self.result
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase == TurnPhase::Finished
    }

    #[must_use]
    pub fn hand(&self, side: PlayerId) -> &[CardId] {
        &self.hands[side]
    }

    #[must_use]
    pub fn deck_len(&self, side: PlayerId) -> usize {
        self.decks[side].len()
    }

    /// Every accepted action, oldest first. O(1) to clone.
    #[must_use]
    pub fn history(&self) -> &Vector<ActionRecord> {
        &self.history
    }

    /// Abilities currently bound to `unit`.
    #[must_use]
    pub fn abilities_of(&self, unit: EntityId) -> &[AbilityBinding] {
        self.abilities.get(&unit).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of bound abilities across the board.
    #[must_use]
    pub fn bound_ability_count(&self) -> usize {
        self.abilities
            .values()
            .flatten()
            .filter(|binding| binding.is_bound())
            .count()
    }

    /// Does `unit` still have its resolution handler?
    #[must_use]
    pub fn has_resolution(&self, unit: EntityId) -> bool {
        self.resolution.contains_key(&unit)
    }

    /// Side whose turn it is, if the match is running.
    #[must_use]
    pub fn active_side(&self) -> Option<PlayerId> {
        match self.phase {
            TurnPhase::PlayerTurn | TurnPhase::AwaitingEndTurn => Some(PlayerId::HUMAN),
            TurnPhase::AiTurn => Some(PlayerId::AI),
            TurnPhase::Setup | TurnPhase::Finished => None,
        }
    }

    #[must_use]
    pub fn summary(&self) -> Option<MatchSummary> {
        self.result
            .map(|result| MatchSummary::new(result, &self.world, self.turn, self.history.len()))
    }

    // === Setup ===

    /// Put a registered card on `owner`'s board and bind its abilities.
    pub fn spawn_card(
        &mut self,
        owner: PlayerId,
        lane: usize,
        card: CardId,
        side: Side,
    ) -> Result<EntityId, Rejection> {
        let definition = self
            .registry
            .card(card)
            .ok_or(Rejection::UnknownDefinition(card.raw()))?
            .clone();
        self.enter(Card::new(definition, owner, side).into(), lane)
    }

    /// Put a registered slot on the opponent's board and bind its abilities.
    pub fn spawn_slot(&mut self, lane: usize, slot: SlotId) -> Result<EntityId, Rejection> {
        let definition = self
            .registry
            .slot(slot)
            .ok_or(Rejection::UnknownDefinition(slot.raw()))?
            .clone();
        self.enter(Slot::new(definition, PlayerId::AI).into(), lane)
    }

    /// Bind an extra ability to a unit already on the board.
    pub fn attach_ability(
        &mut self,
        unit: EntityId,
        ability: impl Ability + 'static,
    ) -> Result<(), Rejection> {
        let owner = self
            .world
            .combatant(unit)
            .ok_or(Rejection::UnknownEntity(unit))?
            .owner();
        let mut binding = AbilityBinding::new(ability);
        binding.bind(&self.bus, &self.world, unit, owner, owner.opponent());
        self.abilities.entry(unit).or_default().push(binding);
        Ok(())
    }

    /// Replace a side's deck with the expansion of `entries`.
    pub fn set_deck(&mut self, side: PlayerId, entries: &[DeckEntry]) {
        self.decks[side] = self.registry.expand_deck(entries);
    }

    /// Draw the configured starting hand without spending action points.
    /// Returns how many cards were drawn.
    pub fn deal_starting_hand(&mut self, side: PlayerId) -> usize {
        let mut dealt = 0;
        while dealt < self.config.starting_hand_size
            && self.hands[side].len() < self.config.max_hand_size
        {
            let Some(card) = self.take_from_deck(side) else {
                break;
            };
            self.hands[side].push(card);
            dealt += 1;
        }
        debug!(%side, dealt, "starting hand dealt");
        dealt
    }

    fn enter(&mut self, combatant: Combatant, lane: usize) -> Result<EntityId, Rejection> {
        let specs = match &combatant {
            Combatant::Card(card) => card.definition().abilities.clone(),
            Combatant::Slot(slot) => slot.definition().abilities.clone(),
        };
        let owner = combatant.owner();
        let id = self.world.place(combatant, lane)?;
        self.resolution
            .insert(id, ResolutionHandler::attach(&self.bus, id));
        let bindings = SpecAbility::bind_all(&specs, &self.bus, &self.world, id, owner);
        self.abilities.insert(id, bindings);
        debug!(unit = %id, %owner, lane, "unit entered the board");
        Ok(id)
    }

    fn take_from_deck(&mut self, side: PlayerId) -> Option<CardId> {
        let index = self.rng.index(self.decks[side].len())?;
        Some(self.decks[side].remove(index))
    }

    // === Operations ===

    /// Open the match and start the player's first turn.
    pub fn start(&mut self) -> Result<(), Rejection> {
        let checked = match self.phase {
            TurnPhase::Setup => Ok(()),
            TurnPhase::Finished => Err(Rejection::MatchOver),
            _ => Err(Rejection::AlreadyStarted),
        };
        self.refuse(checked)?;

        self.info(INFO_MATCH_START);
        self.turn = 1;
        self.begin_turn(PlayerId::HUMAN);
        Ok(())
    }

    /// Attack the lane across from `attacker`. 1 AP.
    pub fn attack(&mut self, attacker: EntityId) -> Result<StrikeOutcome, Rejection> {
        let side = self.acting_side();
        let checked = self
            .ensure_can_act(side)
            .and_then(|()| self.ensure_attacker(side, attacker))
            .and_then(|()| self.ensure_action_point(side));
        self.refuse(checked)?;

        self.world.player_mut(side).spend_action_point();
        let outcome = protocol::attack(&self.bus, &mut self.world, attacker);
        self.record(side, Action::Attack { attacker });
        self.settle();
        Ok(outcome)
    }

    /// Attack a chosen living enemy. 1 AP.
    pub fn attack_target(
        &mut self,
        attacker: EntityId,
        target: EntityId,
    ) -> Result<StrikeOutcome, Rejection> {
        let side = self.acting_side();
        let checked = self
            .ensure_can_act(side)
            .and_then(|()| self.ensure_attacker(side, attacker))
            .and_then(|()| self.ensure_enemy(side, attacker, target))
            .and_then(|()| self.ensure_action_point(side));
        self.refuse(checked)?;

        self.world.player_mut(side).spend_action_point();
        let outcome = protocol::attack_target(&self.bus, &mut self.world, attacker, target);
        self.record(side, Action::AttackTarget { attacker, target });
        self.settle();
        Ok(outcome)
    }

    /// Every living front-facing card attacks across, in lane order. On the
    /// player's turn this leaves only `end_turn`.
    pub fn attack_all(&mut self) -> Result<Vec<StrikeOutcome>, Rejection> {
        let side = self.acting_side();
        let checked = self.ensure_can_act(side);
        self.refuse(checked)?;

        let attackers: Vec<EntityId> = self
            .world
            .board(side)
            .filter_map(Combatant::as_card)
            .filter(|card| card.is_front())
            .map(Card::id)
            .collect();
        let mut outcomes = Vec::with_capacity(attackers.len());
        for attacker in attackers {
            outcomes.push(protocol::attack(&self.bus, &mut self.world, attacker));
        }

        self.record(side, Action::AttackAll);
        if side == PlayerId::HUMAN {
            self.set_phase(TurnPhase::AwaitingEndTurn);
        }
        self.settle();
        Ok(outcomes)
    }

    /// Turn one of the acting side's cards over. 1 AP.
    pub fn flip(&mut self, unit: EntityId) -> Result<Side, Rejection> {
        let side = self.acting_side();
        let checked = self
            .ensure_can_act(side)
            .and_then(|()| self.ensure_own(side, unit))
            .and_then(|combatant| {
                combatant
                    .as_card()
                    .map(|_| ())
                    .ok_or(Rejection::NotFlippable(unit))
            })
            .and_then(|()| self.ensure_action_point(side));
        self.refuse(checked)?;

        self.world.player_mut(side).spend_action_point();
        let facing = self.turn_over(side, unit, "");
        self.record(side, Action::Flip { unit });
        self.settle();
        Ok(facing.unwrap_or_default())
    }

    /// Exchange the lanes of two of the acting side's units. 1 AP.
    pub fn swap(&mut self, a: EntityId, b: EntityId) -> Result<(), Rejection> {
        let side = self.acting_side();
        let checked = self
            .ensure_can_act(side)
            .and_then(|()| self.ensure_own(side, a).map(|_| ()))
            .and_then(|()| self.ensure_own(side, b).map(|_| ()))
            .and_then(|()| if a == b { Err(Rejection::SameUnit(a)) } else { Ok(()) })
            .and_then(|()| self.ensure_action_point(side));
        self.refuse(checked)?;

        let board = self.world.player(side);
        let (Some(la), Some(lb)) = (board.lane_of(a), board.lane_of(b)) else {
            return self.refuse(Err(Rejection::UnknownEntity(a)));
        };
        self.world.player_mut(side).spend_action_point();
        self.world.swap_lanes(side, la, lb);
        self.info_for(side, format!("[Swap] L{} <-> L{}", la + 1, lb + 1));
        self.record(side, Action::Swap { a, b });
        self.settle();
        Ok(())
    }

    /// Take a random card from the deck into the hand. 1 AP.
    pub fn draw(&mut self) -> Result<CardId, Rejection> {
        let side = self.acting_side();
        let checked = self.ensure_can_act(side).and_then(|()| {
            if self.hands[side].len() >= self.config.max_hand_size {
                Err(Rejection::HandFull)
            } else if self.decks[side].is_empty() {
                Err(Rejection::DeckEmpty)
            } else {
                self.ensure_action_point(side)
            }
        });
        self.refuse(checked)?;

        let Some(card) = self.take_from_deck(side) else {
            return self.refuse(Err(Rejection::DeckEmpty));
        };
        self.world.player_mut(side).spend_action_point();
        self.hands[side].push(card);
        let name = self
            .registry
            .card(card)
            .map_or_else(|| card.to_string(), |def| def.name.clone());
        self.info_for(side, format!("[Draw] {name}"));
        self.record(side, Action::Draw);
        self.settle();
        Ok(card)
    }

    /// Put a hand card into an empty lane, face up.
    pub fn play(&mut self, hand_index: usize, lane: usize) -> Result<EntityId, Rejection> {
        let side = self.acting_side();
        let checked = self.ensure_can_act(side).and_then(|()| {
            let card = *self.hands[side]
                .get(hand_index)
                .ok_or(Rejection::NoSuchHandCard(hand_index))?;
            let board = self.world.player(side);
            if lane >= board.lane_count() {
                return Err(Rejection::LaneOutOfRange(lane));
            }
            if board.lane(lane).is_some() {
                return Err(Rejection::LaneOccupied(lane));
            }
            match self.registry.card(card) {
                Some(_) => Ok(()),
                None => Err(Rejection::UnknownDefinition(card.raw())),
            }
        });
        self.refuse(checked)?;

        let card = self.hands[side].remove(hand_index);
        let id = self.spawn_card(side, lane, card, Side::Front)?;
        let ctx = EventContext::for_side(side).with_source(CombatantRef::Card(id));
        self.bus.publish(&mut self.world, EventKind::CardPlayed, &ctx);
        self.record(side, Action::Play { hand_index, lane });
        self.settle();
        Ok(id)
    }

    /// End the player's turn, play the opponent's turn, and start the next
    /// round unless the match ended on the way.
    pub fn end_turn(&mut self) -> Result<(), Rejection> {
        let checked = match self.phase {
            TurnPhase::PlayerTurn | TurnPhase::AwaitingEndTurn => Ok(()),
            TurnPhase::Finished => Err(Rejection::MatchOver),
            TurnPhase::Setup | TurnPhase::AiTurn => Err(Rejection::NotYourTurn(PlayerId::HUMAN)),
        };
        self.refuse(checked)?;
        self.record(PlayerId::HUMAN, Action::EndTurn);

        self.finish_turn(PlayerId::HUMAN);
        if self.is_finished() {
            return Ok(());
        }

        self.begin_turn(PlayerId::AI);
        if !self.is_finished() {
            self.run_executor();
        }
        if !self.is_finished() {
            self.finish_turn(PlayerId::AI);
        }
        if !self.is_finished() {
            self.turn += 1;
            self.begin_turn(PlayerId::HUMAN);
        }
        Ok(())
    }

    /// Fire the lane effect of the opponent's slot in `lane`. Only during the
    /// opponent's turn.
    pub fn trigger_slot_effect(&mut self, lane: usize) -> Result<(), Rejection> {
        let checked = match self.phase {
            TurnPhase::AiTurn => {
                let board = self.world.player(PlayerId::AI);
                if lane >= board.lane_count() {
                    Err(Rejection::LaneOutOfRange(lane))
                } else {
                    board
                        .lane(lane)
                        .and_then(|id| self.world.combatant(id))
                        .filter(|c| c.alive() && matches!(c, Combatant::Slot(_)))
                        .map(|_| ())
                        .ok_or(Rejection::NoSlot(lane))
                }
            }
            TurnPhase::Finished => Err(Rejection::MatchOver),
            _ => Err(Rejection::NotYourTurn(PlayerId::AI)),
        };
        self.refuse(checked)?;

        let Some(slot) = self.world.player(PlayerId::AI).lane(lane) else {
            return self.refuse(Err(Rejection::NoSlot(lane)));
        };
        self.info_for(PlayerId::AI, format!("[SlotEffect] Lane {}", lane + 1));
        let ctx = EventContext::for_side(PlayerId::AI)
            .with_source(CombatantRef::Slot(slot))
            .with_phase(PHASE_SLOT_EFFECT);
        self.bus.publish(&mut self.world, EventKind::Custom, &ctx);
        self.settle();
        Ok(())
    }

    /// Retry deferred strikes once. Returns how many landed.
    pub fn tick(&mut self) -> usize {
        let landed = protocol::run_deferred(&self.bus, &mut self.world);
        self.settle();
        landed
    }

    /// Perform `action` for `player`.
    pub fn apply(&mut self, player: PlayerId, action: Action) -> Result<(), Rejection> {
        if !self.is_finished() && self.active_side() != Some(player) {
            return self.refuse(Err(Rejection::NotYourTurn(player)));
        }
        match action {
            Action::Attack { attacker } => self.attack(attacker).map(|_| ()),
            Action::AttackTarget { attacker, target } => {
                self.attack_target(attacker, target).map(|_| ())
            }
            Action::AttackAll => self.attack_all().map(|_| ()),
            Action::Flip { unit } => self.flip(unit).map(|_| ()),
            Action::Swap { a, b } => self.swap(a, b),
            Action::Draw => self.draw().map(|_| ()),
            Action::Play { hand_index, lane } => self.play(hand_index, lane).map(|_| ()),
            Action::EndTurn => self.end_turn(),
        }
    }

    /// Actions `player` could take right now.
    #[must_use]
    pub fn legal_actions(&self, player: PlayerId) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.active_side() != Some(player) {
            return actions;
        }
        if self.phase == TurnPhase::AwaitingEndTurn {
            actions.push(Action::EndTurn);
            return actions;
        }

        let has_ap = self.world.player(player).action_points > 0;
        let own: Vec<&Combatant> = self.world.board(player).filter(|c| c.alive()).collect();
        let enemies: Vec<EntityId> = self
            .world
            .board(player.opponent())
            .filter(|c| c.alive())
            .map(Combatant::id)
            .collect();

        if has_ap {
            for unit in &own {
                let Some(card) = unit.as_card() else {
                    continue;
                };
                if card.is_front() {
                    actions.push(Action::Attack { attacker: card.id() });
                    actions.extend(enemies.iter().map(|&target| Action::AttackTarget {
                        attacker: card.id(),
                        target,
                    }));
                }
                actions.push(Action::Flip { unit: card.id() });
            }
            for (i, a) in own.iter().enumerate() {
                for b in &own[i + 1..] {
                    actions.push(Action::Swap { a: a.id(), b: b.id() });
                }
            }
            if self.hands[player].len() < self.config.max_hand_size && !self.decks[player].is_empty() {
                actions.push(Action::Draw);
            }
        }

        let board = self.world.player(player);
        for hand_index in 0..self.hands[player].len() {
            for lane in (0..board.lane_count()).filter(|&lane| board.lane(lane).is_none()) {
                actions.push(Action::Play { hand_index, lane });
            }
        }

        actions.push(Action::AttackAll);
        if player == PlayerId::HUMAN {
            actions.push(Action::EndTurn);
        }
        actions
    }

    // === Validation ===

    fn acting_side(&self) -> PlayerId {
        self.active_side().unwrap_or(PlayerId::HUMAN)
    }

    fn ensure_can_act(&self, side: PlayerId) -> Result<(), Rejection> {
        match self.phase {
            TurnPhase::Finished => Err(Rejection::MatchOver),
            TurnPhase::AwaitingEndTurn => Err(Rejection::AwaitingEndTurn),
            _ if self.active_side() != Some(side) => Err(Rejection::NotYourTurn(side)),
            _ => Ok(()),
        }
    }

    fn ensure_action_point(&self, side: PlayerId) -> Result<(), Rejection> {
        if self.world.player(side).action_points > 0 {
            Ok(())
        } else {
            Err(Rejection::NoActionPoints)
        }
    }

    fn ensure_own(&self, side: PlayerId, unit: EntityId) -> Result<&Combatant, Rejection> {
        let combatant = self
            .world
            .combatant(unit)
            .ok_or(Rejection::UnknownEntity(unit))?;
        if !combatant.alive() {
            return Err(Rejection::Destroyed(unit));
        }
        if combatant.owner() != side {
            return Err(Rejection::NotOwned(unit, side));
        }
        Ok(combatant)
    }

    fn ensure_attacker(&self, side: PlayerId, attacker: EntityId) -> Result<(), Rejection> {
        let card = self
            .ensure_own(side, attacker)?
            .as_card()
            .ok_or(Rejection::CannotAttack(attacker))?;
        if card.is_back() {
            return Err(Rejection::BackFacing(attacker));
        }
        Ok(())
    }

    fn ensure_enemy(
        &self,
        side: PlayerId,
        attacker: EntityId,
        target: EntityId,
    ) -> Result<(), Rejection> {
        let combatant = self
            .world
            .combatant(target)
            .ok_or(Rejection::UnknownEntity(target))?;
        if !combatant.alive() {
            return Err(Rejection::Destroyed(target));
        }
        if combatant.owner() == side {
            return Err(Rejection::NotAnEnemy(target, attacker));
        }
        Ok(())
    }

    /// Report a refusal on the bus and hand it back.
    fn refuse<T>(&mut self, checked: Result<T, Rejection>) -> Result<T, Rejection> {
        if let Err(rejection) = &checked {
            debug!(%rejection, phase = ?self.phase, "action rejected");
            self.info(format!("Rejected: {rejection}"));
        }
        checked
    }

    // === Turn flow ===

    fn set_phase(&mut self, phase: TurnPhase) {
        debug!(from = ?self.phase, to = ?phase, turn = self.turn, "phase change");
        self.phase = phase;
    }

    fn begin_turn(&mut self, side: PlayerId) {
        self.set_phase(if side == PlayerId::HUMAN {
            TurnPhase::PlayerTurn
        } else {
            TurnPhase::AiTurn
        });

        let base = if side == PlayerId::HUMAN {
            self.config.player_base_ap
        } else {
            self.config.ai_base_ap
        };
        let bonus = self.world.passive_ap_bonus(side);
        self.world.player_mut(side).action_points = base + bonus;

        let ctx = EventContext::for_side(side).with_phase(format!("TURN {}", self.turn));
        self.bus.publish(&mut self.world, EventKind::TurnStart, &ctx);

        if side == PlayerId::HUMAN {
            self.rearrange_player_board();
        }
        self.settle();
    }

    fn rearrange_player_board(&mut self) {
        let side = PlayerId::HUMAN;
        self.layout
            .arrange(&mut self.rng, self.world.player_mut(side).lanes_mut());

        let units: Vec<EntityId> = self.world.player(side).occupants().collect();
        for unit in units {
            let flip = match self.world.combatant(unit) {
                Some(combatant) if combatant.alive() => combatant
                    .as_card()
                    .is_some_and(|card| self.layout.should_flip(&mut self.rng, card)),
                _ => false,
            };
            if flip {
                self.turn_over(side, unit, PHASE_TURN_START_RANDOMIZE);
            }
        }
    }

    fn run_executor(&mut self) {
        if let Some(mut executor) = self.executor.take() {
            executor.execute_turn(self);
            if self.executor.is_none() {
                self.executor = Some(executor);
            }
        }
    }

    fn finish_turn(&mut self, side: PlayerId) {
        let ctx = EventContext::for_side(side).with_phase(format!("TURN {}", self.turn));
        self.bus.publish(&mut self.world, EventKind::TurnEnd, &ctx);
        self.settle();

        if side == PlayerId::AI && !self.is_finished() {
            self.rebuild_enemy_lanes();
        }
        self.check_terminal(true);
    }

    fn rebuild_enemy_lanes(&mut self) {
        let side = PlayerId::AI;
        self.world.set_rebuilding(side, true);
        self.world.shuffle_lanes(side, &mut self.rng);
        self.info_for(side, PHASE_LANE_REBUILD);
        self.world.set_rebuilding(side, false);
        self.info_for(side, INFO_ENEMY_SHUFFLE);
        self.tick();
    }

    // === Bookkeeping ===

    fn turn_over(&mut self, side: PlayerId, unit: EntityId, phase: &str) -> Option<Side> {
        let facing = self.world.card_mut(unit)?.flip();
        let ctx = EventContext::for_side(side)
            .with_source(CombatantRef::Card(unit))
            .with_phase(phase);
        self.bus.publish(&mut self.world, EventKind::Flip, &ctx);
        Some(facing)
    }

    fn record(&mut self, player: PlayerId, action: Action) {
        let sequence = u32::try_from(self.history.len()).unwrap_or(u32::MAX);
        self.history
            .push_back(ActionRecord::new(player, action, self.turn, sequence));
    }

    fn info(&mut self, message: impl Into<String>) {
        let ctx = EventContext::new().with_phase(message);
        self.bus.publish(&mut self.world, EventKind::Info, &ctx);
    }

    fn info_for(&mut self, side: PlayerId, message: impl Into<String>) {
        let ctx = EventContext::for_side(side).with_phase(message);
        self.bus.publish(&mut self.world, EventKind::Info, &ctx);
    }

    fn settle(&mut self) {
        self.sweep_destroyed();
        self.check_terminal(false);
    }

    fn sweep_destroyed(&mut self) {
        for unit in self.world.destroyed() {
            if let Some(mut bindings) = self.abilities.remove(&unit) {
                for binding in &mut bindings {
                    binding.unbind();
                }
            }
            self.resolution.remove(&unit);
            let label = self
                .world
                .combatant(unit)
                .map_or_else(|| unit.to_string(), Combatant::label);
            let Some(removed) = self.world.remove(unit) else {
                continue;
            };
            debug!(%unit, owner = %removed.owner(), "destroyed unit swept");
            let ctx = EventContext::for_side(removed.owner())
                .with_source(removed.to_ref())
                .with_phase(format!("[Destroyed] {label}"));
            self.bus.publish(&mut self.world, EventKind::Info, &ctx);
        }
    }

    fn check_terminal(&mut self, round_end: bool) {
        if self.result.is_some() {
            return;
        }
        let human = self.world.player(PlayerId::HUMAN).hp;
        let ai = self.world.player(PlayerId::AI).hp;
        let out_of_turns = round_end && self.turn >= self.config.turn_limit;
        if human > 0 && ai > 0 && !out_of_turns {
            return;
        }
        self.finish(GameResult::from_hp(human, ai));
    }

    fn finish(&mut self, result: GameResult) {
        self.result = Some(result);
        self.set_phase(TurnPhase::Finished);
        self.world.take_deferred();
        self.info(INFO_MATCH_END);
        if let Some(summary) = self.summary() {
            self.info(summary.score_line());
        }
        // Bindings unbind on drop.
        self.abilities.clear();
        self.resolution.clear();
        debug!(%result, turn = self.turn, "match finished");
    }
}

impl std::fmt::Debug for Battle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Battle")
            .field("phase", &self.phase)
            .field("turn", &self.turn)
            .field("result", &self.result)
            .field("world", &self.world)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{CardDefinition, FactionId, SlotDefinition};
    use crate::events::EventJournal;
    use crate::rules::policy::{KeepLayout, Passive};

    const DUELIST: CardId = CardId::new(1);
    const WARD: SlotId = SlotId::new(1);

    fn registry() -> CardRegistry {
        let mut registry = CardRegistry::new();
        registry.register_card(
            CardDefinition::new(DUELIST, "Duelist", FactionId::new(0))
                .with_health(5)
                .attacker(3),
        );
        registry.register_slot(
            SlotDefinition::new(WARD, "Ward", FactionId::new(9))
                .with_health(4)
                .with_block(1),
        );
        registry
    }

    fn battle() -> Battle {
        Battle::new(MatchConfig::default(), registry())
            .unwrap()
            .with_layout_policy(KeepLayout)
            .with_executor(Passive)
    }

    #[test]
    fn test_new_rejects_bad_config() {
        let err = Battle::new(MatchConfig::default().with_lanes(0), registry()).unwrap_err();
        assert_eq!(err, ConfigError::NoLanes);
    }

    #[test]
    fn test_start_sets_turn_and_ap() {
        let mut b = battle();
        let journal = EventJournal::attach(b.bus());
        b.start().unwrap();

        assert_eq!(b.phase(), TurnPhase::PlayerTurn);
        assert_eq!(b.turn(), 1);
        assert_eq!(b.world().player(PlayerId::HUMAN).action_points, 3);
        assert_eq!(journal.lines()[0], "[INFO] === MATCH START ===");
        assert_eq!(b.start(), Err(Rejection::AlreadyStarted));
    }

    #[test]
    fn test_actions_before_start_are_rejected() {
        let mut b = battle();
        let card = b.spawn_card(PlayerId::HUMAN, 0, DUELIST, Side::Front).unwrap();
        assert_eq!(b.attack(card), Err(Rejection::NotYourTurn(PlayerId::HUMAN)));
    }

    #[test]
    fn test_attack_spends_ap_and_records() {
        let mut b = battle();
        let card = b.spawn_card(PlayerId::HUMAN, 0, DUELIST, Side::Front).unwrap();
        let ward = b.spawn_slot(0, WARD).unwrap();
        b.start().unwrap();

        assert_eq!(b.attack(card), Ok(StrikeOutcome::Declared(ward)));
        assert_eq!(b.world().player(PlayerId::HUMAN).action_points, 2);
        assert_eq!(b.world().combatant(ward).unwrap().health(), 2);
        assert_eq!(b.history().len(), 1);
        assert_eq!(b.history()[0].action, Action::Attack { attacker: card });
    }

    #[test]
    fn test_destroyed_unit_is_swept() {
        let mut b = battle();
        let card = b.spawn_card(PlayerId::HUMAN, 0, DUELIST, Side::Front).unwrap();
        let ward = b.spawn_slot(0, WARD).unwrap();
        let journal = EventJournal::attach(b.bus());
        b.start().unwrap();

        b.attack(card).unwrap();
        b.attack(card).unwrap();

        assert!(b.world().combatant(ward).is_none());
        assert!(!b.has_resolution(ward));
        assert_eq!(b.world().player(PlayerId::AI).lane(0), None);
        assert!(journal
            .lines()
            .iter()
            .any(|line| line == &format!("[INFO] [Destroyed] Slot{ward} Ward")));
    }

    #[test]
    fn test_flip_slot_is_rejected() {
        let mut b = battle();
        b.spawn_card(PlayerId::HUMAN, 0, DUELIST, Side::Front).unwrap();
        let ward = b.spawn_slot(0, WARD).unwrap();
        b.start().unwrap();

        assert_eq!(b.flip(ward), Err(Rejection::NotOwned(ward, PlayerId::HUMAN)));
        assert_eq!(b.world().player(PlayerId::HUMAN).action_points, 3);
    }

    #[test]
    fn test_legal_actions_awaiting_end_turn() {
        let mut b = battle();
        b.spawn_card(PlayerId::HUMAN, 0, DUELIST, Side::Front).unwrap();
        b.start().unwrap();
        b.attack_all().unwrap();

        assert_eq!(b.phase(), TurnPhase::AwaitingEndTurn);
        assert_eq!(b.legal_actions(PlayerId::HUMAN), vec![Action::EndTurn]);
        assert!(b.legal_actions(PlayerId::AI).is_empty());
    }

    #[test]
    fn test_apply_checks_side() {
        let mut b = battle();
        b.start().unwrap();
        assert_eq!(
            b.apply(PlayerId::AI, Action::Draw),
            Err(Rejection::NotYourTurn(PlayerId::AI))
        );
    }
}
