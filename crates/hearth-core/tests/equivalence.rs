//! Live ticking versus calendar catch-up.
//!
//! Each test clones a device, ticks one copy `k` times and lets the other
//! sit unloaded for the same `k` ticks before reconciling. Discrete state
//! (fuel, recipes, contents) must match exactly and temperatures within
//! floating tolerance.

use hearth_core::clock::TICKS_IN_HOUR;
use hearth_core::config::HearthConfig;
use hearth_core::device::*;
use hearth_core::event::{Event, EventKind};
use hearth_core::item::{FluidStack, ItemStack};
use hearth_core::test_utils::*;

const TOLERANCE: f32 = 0.05;

fn lit_firepit(h: &mut Harness, fuels: &[(i32, f32)]) -> Device {
    let mut device = Device::new(DeviceKind::Firepit, &h.config, h.clock.now());
    for &(duration, temperature) in fuels {
        device.add_fuel(fuel(duration, temperature)).unwrap();
    }
    device.as_firepit_mut().unwrap().ignite(&mut h.ctx()).unwrap();
    device
}

fn fuel_consumed_ticks(h: &Harness) -> Vec<i64> {
    h.events
        .events(EventKind::FuelConsumed)
        .map(Event::tick)
        .collect()
}

#[test]
fn single_item_burn() {
    let mut h = Harness::new();
    let mut live = lit_firepit(&mut h, &[(5_000, 800.0)]);
    let mut caught = live.clone();
    h.run_live(&mut live, 1_234);
    caught.check_for_calendar_update(&mut h.ctx());
    assert_devices_close(&live, &caught, TOLERANCE);
}

#[test]
fn burn_across_several_items() {
    let mut h = Harness::new();
    let fuels = [(300, 600.0), (250, 900.0), (400, 700.0), (1_000, 1_100.0)];
    let mut live = lit_firepit(&mut h, &fuels);
    let mut caught = live.clone();
    h.events.clear_all();

    h.run_live(&mut live, 1_500);
    let live_ticks = fuel_consumed_ticks(&h);
    h.events.clear_all();

    caught.check_for_calendar_update(&mut h.ctx());
    let caught_ticks = fuel_consumed_ticks(&h);

    assert_devices_close(&live, &caught, TOLERANCE);
    assert_eq!(live_ticks, vec![300, 550, 950]);
    assert_eq!(live_ticks, caught_ticks);
    assert!(h.events.events(EventKind::FuelConsumed).all(Event::is_retroactive));
}

#[test]
fn exact_exhaustion_keeps_heat() {
    // Burning out on the very last tick of the gap is the one exhaustion
    // case where nothing has had time to cool.
    let mut h = Harness::new();
    let mut live = lit_firepit(&mut h, &[(400, 650.0)]);
    let mut caught = live.clone();
    h.run_live(&mut live, 400);
    caught.check_for_calendar_update(&mut h.ctx());
    assert_devices_close(&live, &caught, TOLERANCE);
    assert!(caught.heater().is_some_and(|heater| !heater.is_lit()));
}

#[test]
fn forge_seed_burn_with_queue() {
    let mut h = Harness::new();
    let mut live = Device::new(DeviceKind::Forge, &h.config, 0);
    live.add_fuel(fuel(1_800, 1_350.0)).unwrap();
    live.add_fuel(fuel(1_800, 1_350.0)).unwrap();
    let mut caught = live.clone();
    h.run_live(&mut live, 3_000);
    caught.check_for_calendar_update(&mut h.ctx());
    assert_devices_close(&live, &caught, TOLERANCE);
}

#[test]
fn blast_furnace_in_the_rain() {
    // Rain never reaches a blast furnace, so it stays exact while raining.
    let mut h = Harness::new();
    h.raining = true;
    let mut live = Device::new(DeviceKind::BlastFurnace, &h.config, 0);
    for _ in 0..3 {
        live.add_fuel(fuel(700, 1_500.0)).unwrap();
    }
    live.as_blast_furnace_mut()
        .unwrap()
        .ignite(&mut h.ctx())
        .unwrap();
    let mut caught = live.clone();
    h.run_live(&mut live, 2_000);
    caught.check_for_calendar_update(&mut h.ctx());
    assert_devices_close(&live, &caught, TOLERANCE);
}

#[test]
fn barrel_recipe_chain() {
    let mut h = Harness::new();
    let ids = h.pickling_ids();
    let mut live = Device::new(DeviceKind::Barrel, &h.config, 0);
    {
        let mut ctx = h.ctx();
        let barrel = live.as_barrel_mut().unwrap();
        barrel
            .insert_item(ItemStack::new(ids.cucumber, 6).with_trait(ids.brined), &mut ctx)
            .unwrap();
        let _ = barrel
            .fill(FluidStack::new(ids.vinegar, 2_000), &mut ctx)
            .unwrap();
        barrel.seal(&mut ctx);
    }
    let mut caught = live.clone();
    h.events.clear_all();

    h.run_live(&mut live, 3 * TICKS_IN_HOUR);
    let live_completed: Vec<_> = h.events.events(EventKind::RecipeCompleted).cloned().collect();
    h.events.clear_all();

    caught.check_for_calendar_update(&mut h.ctx());
    let caught_completed: Vec<_> = h.events.events(EventKind::RecipeCompleted).cloned().collect();

    assert_devices_close(&live, &caught, TOLERANCE);
    assert_eq!(live_completed.len(), 1);
    assert_eq!(live_completed[0].tick(), caught_completed[0].tick());
    let item = caught.as_barrel().unwrap().contents().item.clone().unwrap();
    assert!(item.has_trait(ids.pickled));
    assert!(item.has_trait(ids.preserved));
}

#[test]
fn mash_then_brine() {
    // Two batches of mash use up all the grain and leave nothing to brine.
    let mut h = Harness::new();
    let ids = h.pickling_ids();
    let mut live = Device::new(DeviceKind::Barrel, &h.config, 0);
    {
        let mut ctx = h.ctx();
        let barrel = live.as_barrel_mut().unwrap();
        barrel
            .insert_item(ItemStack::new(ids.grain, 10), &mut ctx)
            .unwrap();
        let _ = barrel
            .fill(FluidStack::new(ids.salt_water, 1_000), &mut ctx)
            .unwrap();
        barrel.seal(&mut ctx);
    }
    let mut caught = live.clone();
    h.run_live(&mut live, 2_000);
    caught.check_for_calendar_update(&mut h.ctx());
    assert_devices_close(&live, &caught, TOLERANCE);
    let contents = caught.as_barrel().unwrap().contents();
    assert_eq!(contents.fluid, Some(FluidStack::new(ids.brine, 1_000)));
    assert!(contents.item.is_none());
}

#[test]
fn zero_gap_changes_nothing() {
    let mut h = Harness::with_config(HearthConfig::default());
    for kind in [
        DeviceKind::Firepit,
        DeviceKind::Forge,
        DeviceKind::BlastFurnace,
        DeviceKind::Barrel,
        DeviceKind::Crucible,
    ] {
        let mut device = Device::new(kind, &h.config, h.clock.now());
        let before = device.clone();
        assert_eq!(device.check_for_calendar_update(&mut h.ctx()), 0);
        assert_eq!(device, before);
    }
}
