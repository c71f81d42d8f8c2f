//! Save, restore, and catch up.
//!
//! A device saved at tick `t` and restored later must end up in the same
//! place as one that was never saved at all.

use hearth_core::config::HearthConfig;
use hearth_core::device::*;
use hearth_core::event::EventKind;
use hearth_core::item::{FluidStack, ItemStack};
use hearth_core::serialize::{deserialize_device, read_snapshot_header, serialize_device};
use hearth_core::test_utils::*;
use hearth_core::world::World;

fn busy_world() -> (World, [hearth_core::id::DeviceId; 3]) {
    let (mut world, ids) = pickling_world();
    let pit = world.place(DeviceKind::Firepit);
    world.add_fuel(pit, fuel(1_200, 900.0)).unwrap();
    world.add_fuel(pit, fuel(1_200, 700.0)).unwrap();
    world.ignite(pit).unwrap();

    let barrel = world.place(DeviceKind::Barrel);
    world
        .interact(barrel, |device, ctx| {
            let barrel = device.as_barrel_mut().unwrap();
            barrel
                .insert_item(ItemStack::new(ids.cucumber, 12), ctx)
                .unwrap();
            barrel.fill(FluidStack::new(ids.brine, 2_000), ctx).unwrap();
            barrel.seal(ctx);
        })
        .unwrap();

    let crucible = world.place(DeviceKind::Crucible);
    world.heat_crucible(crucible, 1_400.0).unwrap();

    world.run(300);
    (world, [pit, barrel, crucible])
}

#[test]
fn restored_world_tracks_the_original() {
    let (mut original, ids) = busy_world();
    let bytes = original.serialize().unwrap();
    let (registry, _) = pickling_registry();
    let mut restored = World::deserialize(&bytes, registry, HearthConfig::default()).unwrap();

    assert_eq!(restored.now(), original.now());
    assert_eq!(restored.device_count(), 3);
    for id in ids {
        assert_eq!(restored.device(id), original.device(id));
        assert!(restored.is_loaded(id));
    }

    original.run(700);
    restored.run(700);
    for id in ids {
        assert_devices_close(original.device(id).unwrap(), restored.device(id).unwrap(), 1e-3);
    }
}

#[test]
fn save_unloaded_then_catch_up_later() {
    let (mut world, [pit, barrel, _]) = busy_world();
    world.unload(pit).unwrap();
    world.unload(barrel).unwrap();
    let bytes = world.serialize().unwrap();
    assert_eq!(read_snapshot_header(&bytes).unwrap().tick, 300);

    let (registry, _) = pickling_registry();
    let mut restored = World::deserialize(&bytes, registry, HearthConfig::default()).unwrap();
    assert!(!restored.is_loaded(barrel));

    restored.advance_unloaded(5_000);
    assert_eq!(restored.load(barrel).unwrap(), 5_000);
    assert_eq!(restored.load(pit).unwrap(), 5_000);

    let completed: Vec<_> = restored.event_bus.events(EventKind::RecipeCompleted).collect();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].tick(), 1_000);
    assert!(completed[0].is_retroactive());

    let pit = restored.device(pit).unwrap();
    assert_eq!(pit.temperature(), Some(0.0));
    assert!(pit.ledger().is_some_and(|l| l.is_empty()));
}

#[test]
fn device_moves_between_worlds() {
    let (mut world, [_, barrel, _]) = busy_world();
    let device = world.device(barrel).unwrap();
    let bytes = serialize_device(device, world.now(), world.registry()).unwrap();

    let (mut other, _) = pickling_world();
    other.advance_unloaded(world.now() + 2_000);
    let restored = deserialize_device(&bytes, other.registry()).unwrap();
    assert_eq!(restored.last_update_tick(), 300);
    let moved = other.insert(restored);
    assert_eq!(other.load(moved).unwrap(), 2_000);

    world.unload(barrel).unwrap();
    world.advance_unloaded(2_000);
    world.load(barrel).unwrap();
    assert_devices_close(world.device(barrel).unwrap(), other.device(moved).unwrap(), 0.0);
}
