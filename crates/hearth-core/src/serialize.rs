//! Snapshot persistence for devices and whole worlds.
//!
//! Binary serialization via `bitcode` with a versioned header. Devices are
//! stored as they are except for barrels, whose active recipe is written by
//! name and looked up again on load: recipe ids are only stable within one
//! registry build, names survive data changes. A name that no longer
//! resolves leaves the barrel idle.
//!
//! The event bus is never persisted (it holds closures). A deserialized
//! world starts with an empty one.

use crate::clock::Ticks;
use crate::config::HearthConfig;
use crate::device::{Barrel, BlastFurnace, Crucible, Device, DeviceKind, Firepit, Forge};
use crate::event::EventBus;
use crate::id::DeviceId;
use crate::item::BarrelContents;
use crate::recipe::{RecipeChain, RecipeLookup};
use crate::registry::Registry;
use crate::world::World;
use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a Hearth snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0x4EA7_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during serialization.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

/// Errors that can occur during deserialization.
#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

/// Header prepended to every serialized snapshot. Enables format detection
/// and version checking before the payload is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Clock reading when the snapshot was taken.
    pub tick: Ticks,
}

impl SnapshotHeader {
    pub fn new(tick: Ticks) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            tick,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Device snapshots
// ---------------------------------------------------------------------------

/// Persisted barrel. The recipe is kept by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarrelSnapshot {
    pub contents: BarrelContents,
    pub sealed: bool,
    pub recipe: Option<String>,
    pub start_tick: Ticks,
    pub last_update_tick: Ticks,
}

impl BarrelSnapshot {
    pub fn capture(barrel: &Barrel, lookup: &dyn RecipeLookup) -> Self {
        use crate::device::{CalendarTickable, HasRecipeChain};
        let chain = barrel.chain();
        Self {
            contents: barrel.contents().clone(),
            sealed: barrel.is_sealed(),
            recipe: chain
                .active()
                .and_then(|id| lookup.sealed(id))
                .map(|r| r.name.clone()),
            start_tick: chain.start_tick(),
            last_update_tick: barrel.last_update_tick(),
        }
    }

    pub fn restore(self, lookup: &dyn RecipeLookup) -> Barrel {
        let active = self.recipe.as_deref().and_then(|name| {
            let id = lookup.sealed_by_name(name);
            if id.is_none() {
                tracing::warn!(recipe = name, "persisted barrel recipe no longer exists");
            }
            id
        });
        Barrel::from_parts(
            self.contents,
            self.sealed,
            RecipeChain::from_parts(active, self.start_tick),
            self.last_update_tick,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeviceSnapshot {
    Firepit(Firepit),
    Forge(Forge),
    BlastFurnace(BlastFurnace),
    Barrel(BarrelSnapshot),
    Crucible(Crucible),
}

impl DeviceSnapshot {
    pub fn capture(device: &Device, lookup: &dyn RecipeLookup) -> Self {
        match device {
            Device::Firepit(d) => DeviceSnapshot::Firepit(d.clone()),
            Device::Forge(d) => DeviceSnapshot::Forge(d.clone()),
            Device::BlastFurnace(d) => DeviceSnapshot::BlastFurnace(d.clone()),
            Device::Barrel(d) => DeviceSnapshot::Barrel(BarrelSnapshot::capture(d, lookup)),
            Device::Crucible(d) => DeviceSnapshot::Crucible(d.clone()),
        }
    }

    pub fn restore(self, lookup: &dyn RecipeLookup) -> Device {
        match self {
            DeviceSnapshot::Firepit(d) => Device::Firepit(d),
            DeviceSnapshot::Forge(d) => Device::Forge(d),
            DeviceSnapshot::BlastFurnace(d) => Device::BlastFurnace(d),
            DeviceSnapshot::Barrel(d) => Device::Barrel(d.restore(lookup)),
            DeviceSnapshot::Crucible(d) => Device::Crucible(d),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct DeviceRecord {
    header: SnapshotHeader,
    device: DeviceSnapshot,
}

/// Serialize a single device, e.g. for storage with the chunk it sits in.
pub fn serialize_device(
    device: &Device,
    now: Ticks,
    lookup: &dyn RecipeLookup,
) -> Result<Vec<u8>, SerializeError> {
    let record = DeviceRecord {
        header: SnapshotHeader::new(now),
        device: DeviceSnapshot::capture(device, lookup),
    };
    bitcode::serialize(&record).map_err(|e| SerializeError::Encode(e.to_string()))
}

/// Deserialize a single device. The device is not caught up: its
/// `last_update_tick` is whatever it was when saved.
pub fn deserialize_device(data: &[u8], lookup: &dyn RecipeLookup) -> Result<Device, DeserializeError> {
    let record: DeviceRecord =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    record.header.validate()?;
    Ok(record.device.restore(lookup))
}

// ---------------------------------------------------------------------------
// World snapshots
// ---------------------------------------------------------------------------

/// The serializable portion of a world. Excludes the registry and config
/// (rebuilt from data files) and the event bus.
#[derive(Debug, Serialize, Deserialize)]
struct WorldSnapshot {
    header: SnapshotHeader,
    real_tick: Ticks,
    slots: SlotMap<DeviceId, DeviceKind>,
    devices: SecondaryMap<DeviceId, DeviceSnapshot>,
    loaded: SecondaryMap<DeviceId, ()>,
    #[serde(default)]
    raining: bool,
}

/// Read the header of a world snapshot without restoring it.
pub fn read_snapshot_header(data: &[u8]) -> Result<SnapshotHeader, DeserializeError> {
    let snapshot: WorldSnapshot =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    Ok(snapshot.header)
}

impl World {
    /// Serialize the world state to a binary blob via bitcode.
    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        let mut devices = SecondaryMap::new();
        for (id, device) in self.devices.iter() {
            devices.insert(id, DeviceSnapshot::capture(device, &self.registry));
        }
        let snapshot = WorldSnapshot {
            header: SnapshotHeader::new(self.clock.now()),
            real_tick: self.clock.real_now(),
            slots: self.slots.clone(),
            devices,
            loaded: self.loaded.clone(),
            raining: self.raining,
        };
        let bytes =
            bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))?;
        tracing::info!(
            tick = snapshot.header.tick,
            devices = self.slots.len(),
            bytes = bytes.len(),
            "world saved"
        );
        Ok(bytes)
    }

    /// Deserialize a world against `registry` and `config`.
    ///
    /// Devices come back exactly as saved; none is caught up until it is
    /// loaded or ticked.
    pub fn deserialize(
        data: &[u8],
        registry: Registry,
        config: HearthConfig,
    ) -> Result<Self, DeserializeError> {
        let snapshot: WorldSnapshot =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.header.validate()?;

        let mut devices = SecondaryMap::new();
        for (id, device) in snapshot.devices {
            if snapshot.slots.contains_key(id) {
                devices.insert(id, device.restore(&registry));
            }
        }
        tracing::info!(
            tick = snapshot.header.tick,
            devices = devices.len(),
            "world loaded"
        );
        Ok(World {
            clock: crate::clock::Clock::starting_at(snapshot.real_tick),
            registry,
            config,
            slots: snapshot.slots,
            devices,
            loaded: snapshot.loaded,
            raining: snapshot.raining,
            event_bus: EventBus::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::CalendarTickable;
    use crate::item::{FluidStack, ItemStack};
    use crate::test_utils::{fuel, pickling_registry, pickling_world};

    fn sealed_barrel_world() -> (World, DeviceId) {
        let (mut world, ids) = pickling_world();
        let barrel = world.place(DeviceKind::Barrel);
        world
            .interact(barrel, |device, ctx| {
                let b = device.as_barrel_mut().unwrap();
                b.insert_item(ItemStack::new(ids.cucumber, 3), ctx).unwrap();
                let _ = b.fill(FluidStack::new(ids.brine, 1_000), ctx).unwrap();
                b.seal(ctx);
            })
            .unwrap();
        (world, barrel)
    }

    #[test]
    fn header_validation() {
        let mut header = SnapshotHeader::new(5);
        assert!(header.validate().is_ok());
        header.version = FORMAT_VERSION + 1;
        assert!(matches!(header.validate(), Err(DeserializeError::FutureVersion(_))));
        header.version = 0;
        assert!(matches!(header.validate(), Err(DeserializeError::UnsupportedVersion(0))));
        header.version = FORMAT_VERSION;
        header.magic = 0xDEAD_BEEF;
        assert!(matches!(header.validate(), Err(DeserializeError::InvalidMagic(0xDEAD_BEEF))));
    }

    #[test]
    fn world_round_trip_is_exact() {
        let (mut world, barrel) = sealed_barrel_world();
        let pit = world.place(DeviceKind::Firepit);
        world.add_fuel(pit, fuel(500, 700.0)).unwrap();
        world.ignite(pit).unwrap();
        world.run(37);
        world.unload(barrel).unwrap();

        let bytes = world.serialize().unwrap();
        let (registry, _) = pickling_registry();
        let restored = World::deserialize(&bytes, registry, HearthConfig::default()).unwrap();
        assert_eq!(restored.now(), world.now());
        assert_eq!(restored.device_count(), 2);
        assert_eq!(restored.device(pit), world.device(pit));
        assert_eq!(restored.device(barrel), world.device(barrel));
        assert!(restored.is_loaded(pit));
        assert!(!restored.is_loaded(barrel));
    }

    #[test]
    fn unknown_recipe_degrades_to_idle() {
        let (world, barrel) = sealed_barrel_world();
        let device = world.device(barrel).unwrap();
        let mut snapshot = DeviceSnapshot::capture(device, world.registry());
        if let DeviceSnapshot::Barrel(b) = &mut snapshot {
            assert_eq!(b.recipe.as_deref(), Some("brining"));
            b.recipe = Some("retired_recipe".into());
        }
        let restored = snapshot.restore(world.registry());
        assert_eq!(restored.chain().and_then(|c| c.active()), None);
        assert_eq!(
            restored.as_barrel().map(|b| b.contents()),
            device.as_barrel().map(|b| b.contents())
        );
    }

    #[test]
    fn single_device_round_trip() {
        let (world, barrel) = sealed_barrel_world();
        let device = world.device(barrel).unwrap();
        let bytes = serialize_device(device, world.now(), world.registry()).unwrap();
        let back = deserialize_device(&bytes, world.registry()).unwrap();
        assert_eq!(&back, device);
        assert_eq!(back.last_update_tick(), device.last_update_tick());
    }

    #[test]
    fn restored_world_catches_up_on_load() {
        let (mut world, barrel) = sealed_barrel_world();
        world.unload(barrel).unwrap();
        let bytes = world.serialize().unwrap();
        let (registry, ids) = pickling_registry();
        let mut restored = World::deserialize(&bytes, registry, HearthConfig::default()).unwrap();
        restored.advance_unloaded(10_000);
        assert_eq!(restored.load(barrel).unwrap(), 10_000);
        let item = restored.device(barrel).unwrap().as_barrel().unwrap().contents().item.clone();
        assert!(item.unwrap().has_trait(ids.brined));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let (registry, _) = pickling_registry();
        assert!(matches!(
            World::deserialize(&[], registry, HearthConfig::default()),
            Err(DeserializeError::Decode(_))
        ));
        let (registry, _) = pickling_registry();
        assert!(deserialize_device(&[1, 2, 3], &registry).is_err());
    }
}
