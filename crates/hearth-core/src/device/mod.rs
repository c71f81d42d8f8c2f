//! Stateful world devices and the calendar update contract they share.
//!
//! A device is ticked once per tick while its region is loaded and left
//! alone while it is not. On the next tick after a reload it sees that
//! `now - last_update_tick` is larger than zero and reconciles the whole gap
//! in one [`CalendarTickable::on_calendar_update`] call, in time bounded by
//! the number of state transitions in the gap rather than its length.
//!
//! Capabilities are small traits ([`HasTemperature`], [`HasFuelLedger`],
//! [`HasRecipeChain`]) implemented by the concrete device types. The
//! [`Device`] enum is what the world stores.

pub mod barrel;
pub mod blast_furnace;
pub mod crucible;
pub mod firepit;
pub mod forge;
pub mod heater;

pub use barrel::{Barrel, BarrelError};
pub use blast_furnace::BlastFurnace;
pub use crucible::Crucible;
pub use firepit::Firepit;
pub use forge::Forge;
pub use heater::{FuelHeater, HeaterError};

use crate::clock::{Clock, Ticks};
use crate::config::HearthConfig;
use crate::event::{Event, EventBus};
use crate::fuel::{FuelItem, FuelLedger, LedgerError};
use crate::id::DeviceId;
use crate::item::{FluidStack, ItemStack};
use crate::recipe::{RecipeChain, RecipeLookup};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Update context
// ---------------------------------------------------------------------------

/// Everything a device may touch while it updates: the clock (for
/// retroactive transactions), the recipe lookup, tuning, and the event bus.
pub struct UpdateContext<'a> {
    pub device: DeviceId,
    pub clock: &'a mut Clock,
    pub lookup: &'a dyn RecipeLookup,
    pub config: &'a HearthConfig,
    pub events: &'a mut EventBus,
    /// Whether it is raining on the device right now.
    pub raining: bool,
}

impl UpdateContext<'_> {
    pub fn now(&self) -> Ticks {
        self.clock.now()
    }

    pub fn emit(&mut self, event: Event) {
        self.events.emit(event);
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

pub trait HasTemperature {
    fn temperature(&self) -> f32;
}

pub trait HasFuelLedger {
    fn ledger(&self) -> &FuelLedger;
    fn ledger_mut(&mut self) -> &mut FuelLedger;
}

pub trait HasRecipeChain {
    fn chain(&self) -> &RecipeChain;
}

/// The calendar update contract.
///
/// `last_update_tick` is the first tick the device has not simulated yet.
/// A live tick at `now` simulates tick `now` and leaves it at `now + 1`, so
/// a device that was ticked every tick never sees a gap.
pub trait CalendarTickable {
    fn last_update_tick(&self) -> Ticks;

    fn set_last_update_tick(&mut self, tick: Ticks);

    /// Reconcile `elapsed > 0` ticks that were not simulated. Must not fail.
    fn on_calendar_update(&mut self, elapsed: Ticks, ctx: &mut UpdateContext<'_>);

    /// Simulate the single tick starting at `ctx.now()`.
    fn tick_once(&mut self, ctx: &mut UpdateContext<'_>);

    /// Catch up to `ctx.now()` if the device fell behind. Returns the gap
    /// that was reconciled (0 if none).
    fn check_for_calendar_update(&mut self, ctx: &mut UpdateContext<'_>) -> Ticks {
        let now = ctx.now();
        let elapsed = now - self.last_update_tick();
        if elapsed <= 0 {
            return 0;
        }
        self.on_calendar_update(elapsed, ctx);
        self.set_last_update_tick(now);
        ctx.emit(Event::CalendarUpdated {
            device: ctx.device,
            elapsed,
            tick: now,
        });
        elapsed
    }

    /// One live tick: reconcile any gap first, then simulate `ctx.now()`.
    fn tick(&mut self, ctx: &mut UpdateContext<'_>) {
        self.check_for_calendar_update(ctx);
        self.tick_once(ctx);
        self.set_last_update_tick(ctx.now() + 1);
    }
}

// ---------------------------------------------------------------------------
// Device enum
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    Firepit,
    Forge,
    BlastFurnace,
    Barrel,
    Crucible,
}

/// Whatever a removed device had in it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ejected {
    pub items: Vec<ItemStack>,
    pub fuel: Vec<FuelItem>,
    pub fluid: Option<FluidStack>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeviceError {
    #[error("{kind:?} does not burn fuel")]
    NotAHeater { kind: DeviceKind },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Device {
    Firepit(Firepit),
    Forge(Forge),
    BlastFurnace(BlastFurnace),
    Barrel(Barrel),
    Crucible(Crucible),
}

macro_rules! dispatch {
    ($self:expr, $d:ident => $body:expr) => {
        match $self {
            Device::Firepit($d) => $body,
            Device::Forge($d) => $body,
            Device::BlastFurnace($d) => $body,
            Device::Barrel($d) => $body,
            Device::Crucible($d) => $body,
        }
    };
}

impl Device {
    /// A fresh device of `kind`, placed at `now`.
    pub fn new(kind: DeviceKind, config: &HearthConfig, now: Ticks) -> Self {
        match kind {
            DeviceKind::Firepit => Device::Firepit(Firepit::new(&config.firepit, now)),
            DeviceKind::Forge => Device::Forge(Forge::new(&config.forge, now)),
            DeviceKind::BlastFurnace => {
                Device::BlastFurnace(BlastFurnace::new(&config.blast_furnace, now))
            }
            DeviceKind::Barrel => Device::Barrel(Barrel::new(&config.barrel, now)),
            DeviceKind::Crucible => Device::Crucible(Crucible::new(now)),
        }
    }

    pub fn kind(&self) -> DeviceKind {
        match self {
            Device::Firepit(_) => DeviceKind::Firepit,
            Device::Forge(_) => DeviceKind::Forge,
            Device::BlastFurnace(_) => DeviceKind::BlastFurnace,
            Device::Barrel(_) => DeviceKind::Barrel,
            Device::Crucible(_) => DeviceKind::Crucible,
        }
    }

    /// `None` for devices without a temperature (barrels).
    pub fn temperature(&self) -> Option<f32> {
        match self {
            Device::Firepit(d) => Some(d.temperature()),
            Device::Forge(d) => Some(d.temperature()),
            Device::BlastFurnace(d) => Some(d.temperature()),
            Device::Crucible(d) => Some(d.temperature()),
            Device::Barrel(_) => None,
        }
    }

    pub fn ledger(&self) -> Option<&FuelLedger> {
        self.heater().map(FuelHeater::ledger)
    }

    pub fn heater(&self) -> Option<&FuelHeater> {
        match self {
            Device::Firepit(d) => Some(d.heater()),
            Device::Forge(d) => Some(d.heater()),
            Device::BlastFurnace(d) => Some(d.heater()),
            Device::Barrel(_) | Device::Crucible(_) => None,
        }
    }

    pub fn chain(&self) -> Option<&RecipeChain> {
        match self {
            Device::Barrel(b) => Some(b.chain()),
            _ => None,
        }
    }

    pub fn as_firepit_mut(&mut self) -> Option<&mut Firepit> {
        match self {
            Device::Firepit(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_forge_mut(&mut self) -> Option<&mut Forge> {
        match self {
            Device::Forge(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_blast_furnace_mut(&mut self) -> Option<&mut BlastFurnace> {
        match self {
            Device::BlastFurnace(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_barrel(&self) -> Option<&Barrel> {
        match self {
            Device::Barrel(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_barrel_mut(&mut self) -> Option<&mut Barrel> {
        match self {
            Device::Barrel(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_crucible_mut(&mut self) -> Option<&mut Crucible> {
        match self {
            Device::Crucible(d) => Some(d),
            _ => None,
        }
    }

    /// Queue fuel in a fuel-burning device.
    pub fn add_fuel(&mut self, item: FuelItem) -> Result<(), DeviceError> {
        match self {
            Device::Firepit(d) => d.add_fuel(item)?,
            Device::Forge(d) => d.add_fuel(item)?,
            Device::BlastFurnace(d) => d.add_fuel(item)?,
            Device::Barrel(_) | Device::Crucible(_) => {
                return Err(DeviceError::NotAHeater { kind: self.kind() });
            }
        }
        Ok(())
    }

    /// Empty the device for removal.
    pub fn eject(&mut self) -> Ejected {
        match self {
            Device::Firepit(d) => Ejected {
                fuel: d.eject(),
                ..Ejected::default()
            },
            Device::Forge(d) => Ejected {
                fuel: d.eject(),
                ..Ejected::default()
            },
            Device::BlastFurnace(d) => Ejected {
                fuel: d.eject(),
                ..Ejected::default()
            },
            Device::Barrel(d) => {
                let (items, fluid) = d.eject();
                Ejected {
                    items,
                    fluid,
                    ..Ejected::default()
                }
            }
            Device::Crucible(_) => Ejected::default(),
        }
    }
}

impl CalendarTickable for Device {
    fn last_update_tick(&self) -> Ticks {
        dispatch!(self, d => d.last_update_tick())
    }

    fn set_last_update_tick(&mut self, tick: Ticks) {
        dispatch!(self, d => d.set_last_update_tick(tick))
    }

    fn on_calendar_update(&mut self, elapsed: Ticks, ctx: &mut UpdateContext<'_>) {
        dispatch!(self, d => d.on_calendar_update(elapsed, ctx))
    }

    fn tick_once(&mut self, ctx: &mut UpdateContext<'_>) {
        dispatch!(self, d => d.tick_once(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::test_utils::{Harness, fuel};

    #[test]
    fn zero_gap_is_a_no_op() {
        let mut h = Harness::new();
        let mut device = Device::new(DeviceKind::Firepit, &h.config, 0);
        device.add_fuel(fuel(100, 600.0)).unwrap();
        let before = device.clone();
        assert_eq!(device.check_for_calendar_update(&mut h.ctx()), 0);
        assert_eq!(device, before);
        assert_eq!(h.events.buffered_count(EventKind::CalendarUpdated), 0);
    }

    #[test]
    fn gap_is_stamped_after_update() {
        let mut h = Harness::new();
        let mut device = Device::new(DeviceKind::Crucible, &h.config, 0);
        h.clock.advance(250);
        assert_eq!(device.check_for_calendar_update(&mut h.ctx()), 250);
        assert_eq!(device.last_update_tick(), 250);
        assert_eq!(device.check_for_calendar_update(&mut h.ctx()), 0);
    }

    #[test]
    fn live_tick_leaves_no_gap() {
        let mut h = Harness::new();
        let mut device = Device::new(DeviceKind::Forge, &h.config, 0);
        for _ in 0..10 {
            device.tick(&mut h.ctx());
            h.clock.advance(1);
        }
        assert_eq!(device.last_update_tick(), 10);
        assert_eq!(h.events.buffered_count(EventKind::CalendarUpdated), 0);
    }

    #[test]
    fn barrels_have_no_fuel_or_temperature() {
        let h = Harness::new();
        let mut barrel = Device::new(DeviceKind::Barrel, &h.config, 0);
        assert_eq!(barrel.temperature(), None);
        assert!(barrel.ledger().is_none());
        assert_eq!(
            barrel.add_fuel(fuel(10, 100.0)),
            Err(DeviceError::NotAHeater {
                kind: DeviceKind::Barrel
            })
        );
        assert!(barrel.chain().is_some());
    }

    #[test]
    fn eject_returns_fuel() {
        let h = Harness::new();
        let mut pit = Device::new(DeviceKind::Firepit, &h.config, 0);
        pit.add_fuel(fuel(10, 100.0)).unwrap();
        pit.add_fuel(fuel(20, 100.0)).unwrap();
        let ejected = pit.eject();
        assert_eq!(ejected.fuel.len(), 2);
        assert!(ejected.items.is_empty());
    }
}
