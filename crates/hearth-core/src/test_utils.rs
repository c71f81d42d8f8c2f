//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::clock::{Clock, TICKS_IN_HOUR, Ticks};
use crate::config::HearthConfig;
use crate::device::{CalendarTickable, Device, UpdateContext};
use crate::event::EventBus;
use crate::fuel::FuelItem;
use crate::id::*;
use crate::item::FluidStack;
use crate::recipe::{FluidIngredient, ItemIngredient, ItemOutput, RecipeDuration, SealedRecipe};
use crate::registry::{FuelDef, Registry, RegistryBuilder};
use crate::world::World;

// ===========================================================================
// Fuel
// ===========================================================================

/// Clean-burning fuel with the given burn time and temperature.
pub fn fuel(duration: i32, temperature: f32) -> FuelItem {
    FuelItem {
        fuel: FuelId(0),
        burn_duration: duration,
        burn_temperature: temperature,
        purity: 1.0,
    }
}

// ===========================================================================
// Pickling registry
// ===========================================================================

/// Ids in the registry built by [`pickling_registry`].
#[derive(Debug, Clone, Copy)]
pub struct PicklingIds {
    pub cucumber: ItemTypeId,
    pub grain: ItemTypeId,
    pub charcoal: ItemTypeId,
    pub salt_water: FluidId,
    pub brine: FluidId,
    pub vinegar: FluidId,
    pub brined: TraitId,
    pub pickled: TraitId,
    pub preserved: TraitId,
    pub charcoal_fuel: FuelId,
    pub log_fuel: FuelId,
}

fn cucumbers(required: Vec<TraitId>, forbidden: Vec<TraitId>, ids: &PicklingIds) -> ItemIngredient {
    ItemIngredient {
        items: vec![ids.cucumber],
        required_traits: required,
        forbidden_traits: forbidden,
        count: 1,
    }
}

/// Brining (1 hour) feeds pickling (2 hours), which feeds vinegar
/// preservation (infinite). Mash turns grain and salt water into brine.
pub fn pickling_registry() -> (Registry, PicklingIds) {
    let mut b = RegistryBuilder::new();
    let charcoal = b.register_item("charcoal", 64);
    let log = b.register_item("log", 16);
    let mut ids = PicklingIds {
        cucumber: b.register_item("cucumber", 64),
        grain: b.register_item("grain", 64),
        charcoal,
        salt_water: b.register_fluid("salt_water"),
        brine: b.register_fluid("brine"),
        vinegar: b.register_fluid("vinegar"),
        brined: b.register_trait("brined"),
        pickled: b.register_trait("pickled"),
        preserved: b.register_trait("preserved"),
        charcoal_fuel: FuelId(0),
        log_fuel: FuelId(0),
    };
    ids.charcoal_fuel = b.register_fuel(FuelDef {
        name: "charcoal".into(),
        item: Some(charcoal),
        burn_duration: 1800,
        burn_temperature: 1350.0,
        purity: 0.95,
    });
    ids.log_fuel = b.register_fuel(FuelDef {
        name: "log".into(),
        item: Some(log),
        burn_duration: 1500,
        burn_temperature: 750.0,
        purity: 0.6,
    });

    b.register_sealed_recipe(SealedRecipe {
        name: "brining".into(),
        input_item: Some(cucumbers(vec![], vec![ids.brined], &ids)),
        input_fluid: Some(FluidIngredient {
            fluid: ids.brine,
            amount: 100,
        }),
        output_item: ItemOutput::CopyInput {
            add_traits: vec![ids.brined],
            remove_traits: vec![],
        },
        output_fluid: None,
        duration: RecipeDuration::Finite(TICKS_IN_HOUR),
        on_seal: vec![],
        on_unseal: vec![],
    });
    b.register_sealed_recipe(SealedRecipe {
        name: "pickling".into(),
        input_item: Some(cucumbers(vec![ids.brined], vec![ids.pickled], &ids)),
        input_fluid: Some(FluidIngredient {
            fluid: ids.vinegar,
            amount: 100,
        }),
        output_item: ItemOutput::CopyInput {
            add_traits: vec![ids.pickled],
            remove_traits: vec![],
        },
        output_fluid: None,
        duration: RecipeDuration::Finite(2 * TICKS_IN_HOUR),
        on_seal: vec![],
        on_unseal: vec![],
    });
    b.register_sealed_recipe(SealedRecipe {
        name: "vinegar".into(),
        input_item: Some(cucumbers(vec![ids.pickled], vec![], &ids)),
        input_fluid: Some(FluidIngredient {
            fluid: ids.vinegar,
            amount: 1,
        }),
        output_item: ItemOutput::CopyInput {
            add_traits: vec![],
            remove_traits: vec![],
        },
        output_fluid: None,
        duration: RecipeDuration::Infinite,
        on_seal: vec![ids.preserved],
        on_unseal: vec![ids.preserved],
    });
    b.register_sealed_recipe(SealedRecipe {
        name: "mash".into(),
        input_item: Some(ItemIngredient {
            items: vec![ids.grain],
            required_traits: vec![],
            forbidden_traits: vec![],
            count: 5,
        }),
        input_fluid: Some(FluidIngredient {
            fluid: ids.salt_water,
            amount: 500,
        }),
        output_item: ItemOutput::Empty,
        output_fluid: Some(FluidStack::new(ids.brine, 500)),
        duration: RecipeDuration::Finite(500),
        on_seal: vec![],
        on_unseal: vec![],
    });

    let registry = b.build().expect("pickling registry is valid");
    (registry, ids)
}

// ===========================================================================
// Device harness
// ===========================================================================

/// Everything a single device needs to update outside of a [`World`].
pub struct Harness {
    pub clock: Clock,
    pub registry: Registry,
    pub config: HearthConfig,
    pub events: EventBus,
    pub raining: bool,
    pub device: DeviceId,
    ids: PicklingIds,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        let (registry, ids) = pickling_registry();
        Self {
            clock: Clock::new(),
            registry,
            config: HearthConfig::default(),
            events: EventBus::default(),
            raining: false,
            device: DeviceId::default(),
            ids,
        }
    }

    pub fn with_config(config: HearthConfig) -> Self {
        Self {
            config,
            ..Self::new()
        }
    }

    pub fn pickling_ids(&self) -> PicklingIds {
        self.ids
    }

    pub fn ctx(&mut self) -> UpdateContext<'_> {
        UpdateContext {
            device: self.device,
            clock: &mut self.clock,
            lookup: &self.registry,
            config: &self.config,
            events: &mut self.events,
            raining: self.raining,
        }
    }

    /// Tick `device` live for `ticks` consecutive ticks.
    pub fn run_live(&mut self, device: &mut impl CalendarTickable, ticks: Ticks) {
        for _ in 0..ticks {
            device.tick(&mut self.ctx());
            self.clock.advance(1);
        }
    }

    /// Let `ticks` pass without touching `device`, then reconcile the gap.
    pub fn run_unloaded(&mut self, device: &mut impl CalendarTickable, ticks: Ticks) {
        self.clock.advance(ticks);
        device.check_for_calendar_update(&mut self.ctx());
    }
}

// ===========================================================================
// Worlds
// ===========================================================================

/// A world over [`pickling_registry`] with default tuning.
pub fn pickling_world() -> (World, PicklingIds) {
    let (registry, ids) = pickling_registry();
    (World::new(registry, HearthConfig::default()), ids)
}

/// Compare two devices' observable state with a temperature tolerance.
pub fn assert_devices_close(a: &Device, b: &Device, tolerance: f32) {
    assert_eq!(a.kind(), b.kind());
    match (a.temperature(), b.temperature()) {
        (Some(x), Some(y)) => assert!(
            (x - y).abs() <= tolerance,
            "temperatures differ: {x} vs {y}"
        ),
        (None, None) => {}
        other => panic!("temperature presence differs: {other:?}"),
    }
    assert_eq!(a.ledger(), b.ledger());
    assert_eq!(a.chain(), b.chain());
    assert_eq!(
        a.as_barrel().map(|b| b.contents()),
        b.as_barrel().map(|b| b.contents())
    );
}
