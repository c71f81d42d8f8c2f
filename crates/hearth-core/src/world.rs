//! The world: owns the clock, the registry and every placed device, and
//! decides which devices tick.
//!
//! # Loading model
//!
//! A device is either loaded (ticked by every [`World::step`]) or unloaded
//! (left alone while time moves on). Loading a device reconciles its gap
//! right away; a loaded device that somehow fell behind reconciles it at the
//! start of its next tick. Either way nothing is ever simulated tick by tick
//! while unloaded.
//!
//! Interactions ([`World::interact`], [`World::add_fuel`], ...) always bring
//! the device up to date first, so they never act on stale state.

use crate::clock::{Clock, Ticks};
use crate::config::HearthConfig;
use crate::device::{
    BarrelError, CalendarTickable, Device, DeviceError, DeviceKind, Ejected, HeaterError,
    UpdateContext,
};
use crate::event::{Event, EventBus, EventKind, PassiveListener};
use crate::fuel::FuelItem;
use crate::id::{DeviceId, ItemTypeId};
use crate::registry::Registry;
use slotmap::{SecondaryMap, SlotMap};

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

pub struct World {
    pub(crate) clock: Clock,
    pub(crate) registry: Registry,
    pub(crate) config: HearthConfig,
    /// Allocated ids and their kinds.
    pub(crate) slots: SlotMap<DeviceId, DeviceKind>,
    pub(crate) devices: SecondaryMap<DeviceId, Device>,
    /// Devices whose region is loaded.
    pub(crate) loaded: SecondaryMap<DeviceId, ()>,
    pub(crate) raining: bool,
    pub event_bus: EventBus,
}

impl World {
    pub fn new(registry: Registry, config: HearthConfig) -> Self {
        Self::starting_at(registry, config, 0)
    }

    pub fn starting_at(registry: Registry, config: HearthConfig, tick: Ticks) -> Self {
        Self {
            clock: Clock::starting_at(tick),
            registry,
            config,
            slots: SlotMap::with_key(),
            devices: SecondaryMap::new(),
            loaded: SecondaryMap::new(),
            raining: false,
            event_bus: EventBus::default(),
        }
    }

    pub fn now(&self) -> Ticks {
        self.clock.now()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &HearthConfig {
        &self.config
    }

    pub fn is_raining(&self) -> bool {
        self.raining
    }

    pub fn set_raining(&mut self, raining: bool) {
        self.raining = raining;
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(id)
    }

    pub fn devices(&self) -> impl Iterator<Item = (DeviceId, &Device)> {
        self.devices.iter()
    }

    pub fn device_count(&self) -> usize {
        self.slots.len()
    }

    pub fn is_loaded(&self, id: DeviceId) -> bool {
        self.loaded.contains_key(id)
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    pub fn suppress_event(&mut self, kind: EventKind) {
        self.event_bus.suppress(kind);
    }

    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.event_bus.on_passive(kind, listener);
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Place a new device. It starts loaded, with its clock at `now`.
    pub fn place(&mut self, kind: DeviceKind) -> DeviceId {
        let now = self.clock.now();
        let id = self.slots.insert(kind);
        self.devices.insert(id, Device::new(kind, &self.config, now));
        self.loaded.insert(id, ());
        self.event_bus.emit(Event::DevicePlaced { device: id, tick: now });
        tracing::debug!(?id, ?kind, now, "device placed");
        id
    }

    /// Put a device back into the world (e.g. from a snapshot) without
    /// touching its state. It starts unloaded.
    pub fn insert(&mut self, device: Device) -> DeviceId {
        let id = self.slots.insert(device.kind());
        self.devices.insert(id, device);
        id
    }

    /// Mark a device loaded and reconcile its gap. Returns the ticks that
    /// were caught up.
    pub fn load(&mut self, id: DeviceId) -> Result<Ticks, WorldError> {
        let elapsed = self.catch_up(id)?;
        self.loaded.insert(id, ());
        Ok(elapsed)
    }

    /// Stop ticking a device. Its state is left exactly as it is.
    pub fn unload(&mut self, id: DeviceId) -> Result<(), WorldError> {
        if !self.slots.contains_key(id) {
            return Err(WorldError::UnknownDevice(id));
        }
        self.loaded.remove(id);
        Ok(())
    }

    /// Remove a device from the world, returning what was in it. The device
    /// is caught up first so the contents are current.
    pub fn remove(&mut self, id: DeviceId) -> Result<Ejected, WorldError> {
        self.catch_up(id)?;
        self.loaded.remove(id);
        self.slots.remove(id);
        let mut device = self.devices.remove(id).ok_or(WorldError::UnknownDevice(id))?;
        let now = self.clock.now();
        self.event_bus.emit(Event::DeviceRemoved { device: id, tick: now });
        Ok(device.eject())
    }

    // -----------------------------------------------------------------------
    // Time
    // -----------------------------------------------------------------------

    /// One world tick: every loaded device ticks, then the clock moves on and
    /// buffered events are delivered.
    pub fn step(&mut self) {
        for (id, device) in self.devices.iter_mut() {
            if !self.loaded.contains_key(id) {
                continue;
            }
            let mut ctx = UpdateContext {
                device: id,
                clock: &mut self.clock,
                lookup: &self.registry,
                config: &self.config,
                events: &mut self.event_bus,
                raining: self.raining,
            };
            device.tick(&mut ctx);
        }
        self.clock.advance(1);
        self.event_bus.deliver();
    }

    /// Run `ticks` world ticks.
    pub fn run(&mut self, ticks: Ticks) {
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Move the clock forward without ticking anything, as if every device
    /// were unloaded for `ticks`. Loaded devices reconcile on their next tick.
    pub fn advance_unloaded(&mut self, ticks: Ticks) {
        self.clock.advance(ticks.max(0));
        tracing::debug!(ticks, now = self.clock.now(), "clock skipped ahead");
    }

    /// Tick a single device once at the current time, loaded or not.
    pub fn tick(&mut self, id: DeviceId) -> Result<(), WorldError> {
        let (device, mut ctx) = self.parts(id)?;
        device.tick(&mut ctx);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Interaction
    // -----------------------------------------------------------------------

    /// Run `f` against an up-to-date device with a live update context.
    pub fn interact<R>(
        &mut self,
        id: DeviceId,
        f: impl FnOnce(&mut Device, &mut UpdateContext<'_>) -> R,
    ) -> Result<R, WorldError> {
        self.catch_up(id)?;
        let (device, mut ctx) = self.parts(id)?;
        Ok(f(device, &mut ctx))
    }

    pub fn add_fuel(&mut self, id: DeviceId, item: FuelItem) -> Result<(), WorldError> {
        self.interact(id, |device, _| device.add_fuel(item))?
            .map_err(|e| {
                tracing::warn!(?id, error = %e, "fuel rejected");
                WorldError::Device(e)
            })
    }

    /// Add one unit of a registered fuel item.
    pub fn add_fuel_item(&mut self, id: DeviceId, item: ItemTypeId) -> Result<(), WorldError> {
        let fuel = self
            .registry
            .fuel_for_item(item)
            .and_then(|f| self.registry.fuel_item(f))
            .ok_or(WorldError::NotAFuel(item))?;
        self.add_fuel(id, fuel)
    }

    /// Light a fuel-burning device.
    pub fn ignite(&mut self, id: DeviceId) -> Result<(), WorldError> {
        self.interact(id, |device, ctx| match device {
            Device::Firepit(d) => d.ignite(ctx).map_err(WorldError::from),
            Device::Forge(d) => d.ignite(ctx).map_err(WorldError::from),
            Device::BlastFurnace(d) => d.ignite(ctx).map_err(WorldError::from),
            other => Err(WorldError::WrongKind {
                id,
                found: other.kind(),
            }),
        })?
    }

    /// Pump bellows air into a fuel-burning device.
    pub fn intake_air(&mut self, id: DeviceId, amount: i32) -> Result<(), WorldError> {
        self.interact(id, |device, ctx| match device {
            Device::Firepit(d) => {
                d.intake_air(amount, &ctx.config.firepit);
                Ok(())
            }
            Device::Forge(d) => {
                d.intake_air(amount, &ctx.config.forge);
                Ok(())
            }
            Device::BlastFurnace(d) => {
                d.intake_air(amount, &ctx.config.blast_furnace);
                Ok(())
            }
            other => Err(WorldError::WrongKind {
                id,
                found: other.kind(),
            }),
        })?
    }

    /// Heat a crucible from below.
    pub fn heat_crucible(&mut self, id: DeviceId, temperature: f32) -> Result<(), WorldError> {
        self.interact(id, |device, ctx| match device {
            Device::Crucible(c) => {
                c.set_target(temperature, &ctx.config.crucible);
                Ok(())
            }
            other => Err(WorldError::WrongKind {
                id,
                found: other.kind(),
            }),
        })?
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn catch_up(&mut self, id: DeviceId) -> Result<Ticks, WorldError> {
        let (device, mut ctx) = self.parts(id)?;
        let kind = device.kind();
        let elapsed = device.check_for_calendar_update(&mut ctx);
        if elapsed > 0 {
            tracing::debug!(?id, ?kind, elapsed, "calendar update");
        }
        Ok(elapsed)
    }

    fn parts(&mut self, id: DeviceId) -> Result<(&mut Device, UpdateContext<'_>), WorldError> {
        let device = self
            .devices
            .get_mut(id)
            .ok_or(WorldError::UnknownDevice(id))?;
        let ctx = UpdateContext {
            device: id,
            clock: &mut self.clock,
            lookup: &self.registry,
            config: &self.config,
            events: &mut self.event_bus,
            raining: self.raining,
        };
        Ok((device, ctx))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("no device {0:?}")]
    UnknownDevice(DeviceId),
    #[error("device {id:?} is a {found:?}")]
    WrongKind { id: DeviceId, found: DeviceKind },
    #[error("item {0:?} is not a fuel")]
    NotAFuel(ItemTypeId),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Heater(#[from] HeaterError),
    #[error(transparent)]
    Barrel(#[from] BarrelError),
}
