//! Hearth Core -- calendar catch-up simulation for stateful world devices.
//!
//! Firepits, forges, blast furnaces, barrels and crucibles keep changing
//! while nobody is looking. When a device's region is reloaded after `N`
//! ticks, this crate brings it to the state it would have reached by being
//! ticked `N` times, in time proportional to the number of state
//! transitions in the gap (fuel items burned, recipes completed) and never
//! to `N` itself.
//!
//! # Calendar Update Flow
//!
//! 1. The world marks a device loaded (or ticks a loaded one).
//! 2. [`device::CalendarTickable::check_for_calendar_update`] computes
//!    `elapsed = now - last_update_tick` and skips a zero gap.
//! 3. The device reconciles the gap: the [`fuel::FuelLedger`] retires whole
//!    fuel items, [`heat`] integrates the temperature in closed form per
//!    burn segment, and [`recipe::RecipeChain`] jumps from recipe end to
//!    recipe end under a retroactive [`clock::ClockTransaction`].
//! 4. `last_update_tick` is stamped with `now`.
//!
//! Events produced along the way carry the tick they actually happened at
//! and a `retroactive` flag, so presentation code can skip sounds for things
//! that finished while the player was away.
//!
//! # Key Types
//!
//! - [`world::World`] -- Owns the clock, registry and devices; loads,
//!   unloads, steps.
//! - [`device::Device`] -- Enum over the concrete device kinds.
//! - [`clock::Clock`] -- Global tick counter with scoped time shifts.
//! - [`registry::Registry`] -- Immutable items, fluids, fuels and sealed
//!   recipes (frozen at startup).
//! - [`event::EventBus`] -- Buffered device events for passive listeners.
//! - [`serialize`] -- Versioned snapshots via bitcode.

pub mod clock;
pub mod config;
pub mod device;
pub mod event;
pub mod fuel;
pub mod heat;
pub mod id;
pub mod item;
pub mod recipe;
pub mod registry;
pub mod serialize;
pub mod world;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
