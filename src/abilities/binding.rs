//! Ability binding lifecycle.
//!
//! An `Ability` knows how to subscribe itself to the bus for one source
//! combatant. An `AbilityBinding` owns one ability and remembers where it is
//! bound, so it can be unbound exactly once: explicitly, when its combatant
//! leaves the board, or when the binding is dropped.

use std::fmt;

use crate::core::{EntityId, PlayerId, World};
use crate::events::EventBus;

/// Who an ability acts for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Binding {
    /// The combatant carrying the ability.
    pub source: EntityId,
    pub owner: PlayerId,
    pub opponent: PlayerId,
}

/// A per-combatant behavior that reacts to events.
pub trait Ability {
    fn name(&self) -> &str;

    /// Subscribe to the bus on behalf of `binding.source`.
    fn register(&mut self, bus: &EventBus, world: &World, binding: Binding);

    /// Drop every subscription made by `register`.
    fn unregister(&mut self, bus: &EventBus);
}

/// Owns one ability and its registration.
pub struct AbilityBinding {
    ability: Box<dyn Ability>,
    bound: Option<(Binding, EventBus)>,
}

impl AbilityBinding {
    #[must_use]
    pub fn new(ability: impl Ability + 'static) -> Self {
        Self::from_box(Box::new(ability))
    }

    #[must_use]
    pub fn from_box(ability: Box<dyn Ability>) -> Self {
        Self {
            ability,
            bound: None,
        }
    }

    /// Register the ability for `source`. A binding that is already bound is
    /// unbound first.
    pub fn bind(
        &mut self,
        bus: &EventBus,
        world: &World,
        source: EntityId,
        owner: PlayerId,
        opponent: PlayerId,
    ) {
        self.unbind();
        let binding = Binding {
            source,
            owner,
            opponent,
        };
        self.ability.register(bus, world, binding);
        self.bound = Some((binding, bus.clone()));
    }

    /// Unregister the ability. Does nothing if it is not bound.
    pub fn unbind(&mut self) {
        if let Some((_, bus)) = self.bound.take() {
            self.ability.unregister(&bus);
        }
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    #[must_use]
    pub fn binding(&self) -> Option<Binding> {
        self.bound.as_ref().map(|(binding, _)| *binding)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.ability.name()
    }
}

impl Drop for AbilityBinding {
    fn drop(&mut self) {
        self.unbind();
    }
}

impl fmt::Debug for AbilityBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbilityBinding")
            .field("ability", &self.name())
            .field("binding", &self.binding())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::core::MatchConfig;

    /// Counts register/unregister calls.
    struct Probe {
        registered: Rc<Cell<u32>>,
        unregistered: Rc<Cell<u32>>,
    }

    impl Ability for Probe {
        fn name(&self) -> &str {
            "Probe"
        }

        fn register(&mut self, _bus: &EventBus, _world: &World, _binding: Binding) {
            self.registered.set(self.registered.get() + 1);
        }

        fn unregister(&mut self, _bus: &EventBus) {
            self.unregistered.set(self.unregistered.get() + 1);
        }
    }

    fn probe() -> (AbilityBinding, Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let registered = Rc::new(Cell::new(0));
        let unregistered = Rc::new(Cell::new(0));
        let binding = AbilityBinding::new(Probe {
            registered: Rc::clone(&registered),
            unregistered: Rc::clone(&unregistered),
        });
        (binding, registered, unregistered)
    }

    #[test]
    fn test_unbind_is_idempotent() {
        let bus = EventBus::new();
        let world = World::from_config(&MatchConfig::default());
        let (mut binding, registered, unregistered) = probe();

        binding.bind(&bus, &world, EntityId(7), PlayerId::HUMAN, PlayerId::AI);
        assert!(binding.is_bound());
        assert_eq!(binding.binding().map(|b| b.source), Some(EntityId(7)));

        binding.unbind();
        binding.unbind();
        assert!(!binding.is_bound());
        assert_eq!(registered.get(), 1);
        assert_eq!(unregistered.get(), 1);
    }

    #[test]
    fn test_drop_unbinds_once() {
        let bus = EventBus::new();
        let world = World::from_config(&MatchConfig::default());
        let (mut binding, _, unregistered) = probe();

        binding.bind(&bus, &world, EntityId(7), PlayerId::HUMAN, PlayerId::AI);
        drop(binding);
        assert_eq!(unregistered.get(), 1);

        let (unbound, _, never) = probe();
        drop(unbound);
        assert_eq!(never.get(), 0);
    }

    #[test]
    fn test_rebind_unbinds_first() {
        let bus = EventBus::new();
        let world = World::from_config(&MatchConfig::default());
        let (mut binding, registered, unregistered) = probe();

        binding.bind(&bus, &world, EntityId(1), PlayerId::HUMAN, PlayerId::AI);
        binding.bind(&bus, &world, EntityId(2), PlayerId::AI, PlayerId::HUMAN);

        assert_eq!(registered.get(), 2);
        assert_eq!(unregistered.get(), 1);
        assert_eq!(binding.binding().map(|b| b.owner), Some(PlayerId::AI));
    }
}
